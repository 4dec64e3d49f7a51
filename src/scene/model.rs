use std::collections::HashMap;

use crate::foundation::core::{Canvas, Fps, FrameRange, PixelRect, Transform2D};
use crate::foundation::error::{EvaError, EvaResult};

/// Frame rate used when the descriptor does not carry one.
pub const DEFAULT_FPS: Fps = Fps { num: 30, den: 1 };

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Plain descriptor data as handed over by the external descriptor parser.
///
/// This is the serde-facing shape. It becomes a [`SceneDescriptor`] only through
/// [`SceneDescriptor::new`], which validates it as a whole.
pub struct DescriptorData {
    /// Output canvas dimensions.
    pub canvas: Canvas,
    /// Dimensions of the decoded video frames backing the animation.
    pub native_video: Canvas,
    /// Animation frame rate, if the producer recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<Fps>,
    /// Static description of every source referenced by effects.
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    /// Effects in z-order (later entries are drawn on top).
    #[serde(default)]
    pub effects: Vec<Effect>,
    /// Per-instance value substitutions.
    #[serde(default)]
    pub data_bindings: Vec<DataBinding>,
    /// Alpha/RGB split of the backing video; `Some` enables mix mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mix: Option<MixRegions>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Where the alpha mask and the color data live inside one packed video frame.
pub struct MixRegions {
    /// Alpha mask region, in native video pixels.
    pub alpha: PixelRect,
    /// Color region, in native video pixels.
    pub rgb: PixelRect,
}

impl MixRegions {
    /// Check the regions against the native video size.
    ///
    /// Both regions must be non-empty, lie inside the frame, not overlap, and have the same size
    /// so that every color texel has exactly one alpha texel.
    pub fn validate(&self, native_video: Canvas) -> EvaResult<()> {
        if !self.alpha.fits_within(native_video) {
            return Err(EvaError::mix_regions(format!(
                "alpha region {:?} is outside the {}x{} video frame",
                self.alpha, native_video.width, native_video.height
            )));
        }
        if !self.rgb.fits_within(native_video) {
            return Err(EvaError::mix_regions(format!(
                "rgb region {:?} is outside the {}x{} video frame",
                self.rgb, native_video.width, native_video.height
            )));
        }
        if !self.alpha.same_size(self.rgb) {
            return Err(EvaError::mix_regions(format!(
                "alpha region is {}x{} but rgb region is {}x{}",
                self.alpha.w, self.alpha.h, self.rgb.w, self.rgb.h
            )));
        }
        if self.alpha.overlaps(self.rgb) {
            return Err(EvaError::mix_regions("alpha and rgb regions overlap"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// How source pixels map into a destination rectangle of a different aspect ratio.
pub enum FitMode {
    /// Scale both axes independently to fill the rectangle.
    #[default]
    StretchToFill,
    /// Uniform scale covering the rectangle; the source is cropped around its center.
    CenterCoverCropped,
    /// Uniform scale fitting inside the rectangle; the destination shrinks around its center.
    CenterFitContained,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Where an image source was loaded from. Informational for the external loader.
pub enum LoadOrigin {
    /// Not recorded.
    #[default]
    Unknown,
    /// Fetched over the network.
    Network,
    /// Read from local storage.
    Local,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Text weight.
pub enum TextStyle {
    /// Regular weight.
    #[default]
    Regular,
    /// Bold weight.
    Bold,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Static properties of a text source.
pub struct TextSpec {
    /// Literal text.
    pub text: String,
    /// Font size in pixels.
    pub font_size: u32,
    /// Color as `#RRGGBB` or `#AARRGGBB`.
    #[serde(default = "default_font_color")]
    pub font_color: String,
    /// Weight.
    #[serde(default)]
    pub style: TextStyle,
}

fn default_font_color() -> String {
    "#FFFFFF".to_string()
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Source kind as declared by the descriptor.
pub enum SourceKindSpec {
    /// Bitmap supplied by the asset loader.
    Image,
    /// Dynamic text rasterized on upload.
    Text(TextSpec),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Descriptor entry for one renderable source.
pub struct SourceSpec {
    /// Source identifier, unique within the descriptor.
    pub id: String,
    /// Image or text.
    pub kind: SourceKindSpec,
    /// Intrinsic width in pixels.
    pub width: u32,
    /// Intrinsic height in pixels.
    pub height: u32,
    /// Aspect handling inside the effect rectangle.
    #[serde(default)]
    pub fit: FitMode,
    /// Load origin hint.
    #[serde(default)]
    pub load_origin: LoadOrigin,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// A timed, positioned reference to a source.
pub struct Effect {
    /// Effect identifier, for diagnostics.
    pub id: String,
    /// Referenced source id.
    pub source_id: String,
    /// Active frames `[start, end)`.
    pub range: FrameRange,
    /// Destination rectangle in canvas pixels.
    pub rect: PixelRect,
    /// Extra placement applied around the rectangle.
    #[serde(default, skip_serializing_if = "Transform2D::is_identity")]
    pub transform: Transform2D,
    /// Optional data binding supplying a substitution value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_binding_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Substitution value carried by a data binding.
pub enum BindingValue {
    /// Replaces the text of a text source.
    Text(String),
    /// Replacement image location, consumed by the external loader.
    ImageUrl(String),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Per-instance value keyed by binding id.
pub struct DataBinding {
    /// Binding identifier referenced from effects.
    pub id: String,
    /// Bound value.
    pub value: BindingValue,
}

/// Immutable, validated model of one animation.
///
/// Constructed once per session and shared read-only (typically behind an `Arc`). All accessors
/// borrow; producing a different scene means building a new descriptor.
#[derive(Clone, Debug)]
pub struct SceneDescriptor {
    canvas: Canvas,
    native_video: Canvas,
    fps: Fps,
    sources: Vec<SourceSpec>,
    effects: Vec<Effect>,
    data_bindings: Vec<DataBinding>,
    mix: Option<MixRegions>,
    is_default_config: bool,

    source_idx_by_id: HashMap<String, usize>,
    binding_idx_by_id: HashMap<String, usize>,
}

impl SceneDescriptor {
    /// Validate `data` and build the descriptor, using [`DEFAULT_FPS`] when no fps is present.
    pub fn new(data: DescriptorData) -> EvaResult<Self> {
        Self::with_default_fps(data, DEFAULT_FPS)
    }

    /// Validate `data` and build the descriptor, using `default_fps` when no fps is present.
    pub fn with_default_fps(data: DescriptorData, default_fps: Fps) -> EvaResult<Self> {
        Self::build(data, default_fps, false)
    }

    pub(crate) fn build(
        data: DescriptorData,
        default_fps: Fps,
        is_default_config: bool,
    ) -> EvaResult<Self> {
        let DescriptorData {
            canvas,
            native_video,
            fps,
            sources,
            effects,
            data_bindings,
            mix,
        } = data;

        if !canvas.is_valid() {
            return Err(EvaError::validation("canvas width/height must be > 0"));
        }
        if !native_video.is_valid() {
            return Err(EvaError::validation("native video width/height must be > 0"));
        }
        let fps = fps.unwrap_or(default_fps);
        Fps::new(fps.num, fps.den)?;

        let mut source_idx_by_id = HashMap::with_capacity(sources.len());
        for (idx, s) in sources.iter().enumerate() {
            if s.id.is_empty() {
                return Err(EvaError::validation("source id must be non-empty"));
            }
            if source_idx_by_id.insert(s.id.clone(), idx).is_some() {
                return Err(EvaError::validation(format!(
                    "duplicate source id '{}'",
                    s.id
                )));
            }
        }

        let mut binding_idx_by_id = HashMap::with_capacity(data_bindings.len());
        for (idx, b) in data_bindings.iter().enumerate() {
            if binding_idx_by_id.insert(b.id.clone(), idx).is_some() {
                return Err(EvaError::validation(format!(
                    "duplicate data binding id '{}'",
                    b.id
                )));
            }
        }

        for e in &effects {
            if e.range.start.0 >= e.range.end.0 {
                return Err(EvaError::validation(format!(
                    "effect '{}' must have start < end (got [{}, {}))",
                    e.id, e.range.start.0, e.range.end.0
                )));
            }
        }

        if let Some(mix) = &mix {
            mix.validate(native_video)?;
        }

        Ok(Self {
            canvas,
            native_video,
            fps,
            sources,
            effects,
            data_bindings,
            mix,
            is_default_config,
            source_idx_by_id,
            binding_idx_by_id,
        })
    }

    /// Output canvas dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Native dimensions of the backing video.
    pub fn native_video(&self) -> Canvas {
        self.native_video
    }

    /// Animation frame rate.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Effects in z-order.
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Data bindings in descriptor order.
    pub fn data_bindings(&self) -> &[DataBinding] {
        &self.data_bindings
    }

    /// Source specs in descriptor order.
    pub fn sources(&self) -> &[SourceSpec] {
        &self.sources
    }

    /// Lookup a source spec by id.
    pub fn source_spec(&self, id: &str) -> Option<&SourceSpec> {
        self.source_idx_by_id.get(id).map(|&i| &self.sources[i])
    }

    pub(crate) fn binding_by_id(&self, id: &str) -> Option<&DataBinding> {
        self.binding_idx_by_id
            .get(id)
            .map(|&i| &self.data_bindings[i])
    }

    /// Mix regions, when the backing video packs alpha next to color.
    pub fn mix(&self) -> Option<&MixRegions> {
        self.mix.as_ref()
    }

    /// `true` when the backing video carries a separate alpha region.
    pub fn is_mix_mode(&self) -> bool {
        self.mix.is_some()
    }

    /// `true` when synthesized by [`SceneDescriptor::default_config`].
    pub fn is_default_config(&self) -> bool {
        self.is_default_config
    }

    /// One past the last frame any effect is active on.
    pub fn duration_frames(&self) -> u64 {
        self.effects
            .iter()
            .map(|e| e.range.end.0)
            .max()
            .unwrap_or(0)
    }

    /// Copy the descriptor back into its serde-facing shape.
    pub fn to_data(&self) -> DescriptorData {
        DescriptorData {
            canvas: self.canvas,
            native_video: self.native_video,
            fps: Some(self.fps),
            sources: self.sources.clone(),
            effects: self.effects.clone(),
            data_bindings: self.data_bindings.clone(),
            mix: self.mix,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
