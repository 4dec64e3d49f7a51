use std::path::PathBuf;

use crate::assets::bitmap::Bitmap;
use crate::foundation::error::{EvaError, EvaResult};
use crate::gpu::handles::TextureId;
use crate::scene::model::{FitMode, LoadOrigin, SourceKindSpec, SourceSpec, TextStyle};

/// Image payload. Pixels are dropped once uploaded; `persisted_path` lets them be reloaded.
#[derive(Clone, Debug, Default)]
pub struct ImageContent {
    pub(crate) pixels: Option<Bitmap>,
    pub(crate) persisted_path: Option<PathBuf>,
}

impl ImageContent {
    /// Pixels waiting for upload.
    pub fn pixels(&self) -> Option<&Bitmap> {
        self.pixels.as_ref()
    }

    /// Where the decoded image was saved, if anywhere.
    pub fn persisted_path(&self) -> Option<&std::path::Path> {
        self.persisted_path.as_deref()
    }
}

/// Text payload handed to the [`TextRasterizer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextContent {
    /// Current text, after data-binding substitution.
    pub text: String,
    /// Font size in pixels.
    pub font_size: u32,
    /// Straight-alpha RGBA color.
    pub font_color: [u8; 4],
    /// Weight.
    pub style: TextStyle,
}

/// Image or text.
#[derive(Clone, Debug)]
pub enum SourceContent {
    /// Bitmap supplied by the asset loader.
    Image(ImageContent),
    /// Text rasterized on upload.
    Text(TextContent),
}

/// One renderable resource and its GPU texture.
#[derive(Clone, Debug)]
pub struct Source {
    pub(crate) id: String,
    pub(crate) content: SourceContent,
    pub(crate) load_origin: LoadOrigin,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) fit: FitMode,
    pub(crate) texture: TextureId,
    pub(crate) dirty: bool,
}

impl Source {
    /// Build an empty source from its descriptor entry.
    pub fn from_spec(spec: &SourceSpec) -> EvaResult<Self> {
        let content = match &spec.kind {
            SourceKindSpec::Image => SourceContent::Image(ImageContent::default()),
            SourceKindSpec::Text(text) => SourceContent::Text(TextContent {
                text: text.text.clone(),
                font_size: text.font_size,
                font_color: parse_hex_color(&text.font_color).map_err(|err| {
                    EvaError::validation(format!("source '{}': {err}", spec.id))
                })?,
                style: text.style,
            }),
        };
        Ok(Self {
            id: spec.id.clone(),
            content,
            load_origin: spec.load_origin,
            width: spec.width,
            height: spec.height,
            fit: spec.fit,
            texture: TextureId::NONE,
            dirty: false,
        })
    }

    /// Source id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Payload.
    pub fn content(&self) -> &SourceContent {
        &self.content
    }

    /// Load origin hint.
    pub fn load_origin(&self) -> LoadOrigin {
        self.load_origin
    }

    /// Intrinsic size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Aspect handling inside the effect rectangle.
    pub fn fit(&self) -> FitMode {
        self.fit
    }

    /// Uploaded texture, or [`TextureId::NONE`].
    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// `true` when the texture is live and matches the content.
    pub fn is_resident(&self) -> bool {
        self.texture.is_set() && !self.dirty
    }
}

/// Turns text content into premultiplied pixels. Implemented outside this crate.
pub trait TextRasterizer {
    /// Rasterize `text` into a `width` x `height` bitmap.
    fn rasterize(&mut self, text: &TextContent, width: u32, height: u32) -> EvaResult<Bitmap>;
}

/// Parse `#RRGGBB` or `#AARRGGBB` into straight RGBA.
pub fn parse_hex_color(s: &str) -> EvaResult<[u8; 4]> {
    let hex = s
        .strip_prefix('#')
        .ok_or_else(|| EvaError::validation(format!("color '{s}' must start with '#'")))?;
    let value = u32::from_str_radix(hex, 16)
        .map_err(|_| EvaError::validation(format!("color '{s}' is not hexadecimal")))?;
    let [b0, b1, b2, b3] = value.to_be_bytes();
    match hex.len() {
        6 => Ok([b1, b2, b3, 255]),
        8 => Ok([b1, b2, b3, b0]),
        _ => Err(EvaError::validation(format!(
            "color '{s}' must have 6 or 8 hex digits"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
