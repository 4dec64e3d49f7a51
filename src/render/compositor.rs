use std::sync::Arc;

use crate::assets::registry::{SourceRegistry, VideoTexture};
use crate::assets::source::SourceContent;
use crate::foundation::core::{Affine, Canvas, Fps, FrameIndex, Point, Rgba8Premul, Vec2};
use crate::foundation::error::{EvaError, EvaResult};
use crate::gpu::handles::OutputTarget;
use crate::gpu::platform::{GpuCommands, GpuPlatform, MixQuad, PlatformError, TexturedQuad};
use crate::gpu::surface_manager::{CurrentContext, PresentOutcome, SurfaceManager};
use crate::render::geometry::fit_source;
use crate::scene::defaults::VideoMode;
use crate::scene::model::{BindingValue, Effect, FitMode, MixRegions, SceneDescriptor};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// Options for [`FrameCompositor`].
pub struct CompositorOpts {
    /// Premultiplied color the surface is cleared to each frame.
    pub clear_rgba: [u8; 4],
    /// Packing layout to use instead of the descriptor's mix regions.
    pub video_mode: Option<VideoMode>,
}

impl Default for CompositorOpts {
    fn default() -> Self {
        Self {
            clear_rgba: Rgba8Premul::transparent().to_array(),
            video_mode: None,
        }
    }
}

/// Frame to render and its presentation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTime {
    /// Animation frame.
    pub index: FrameIndex,
    /// Presentation time in nanoseconds.
    pub pts_ns: u64,
}

impl FrameTime {
    /// Time of `index` at a constant `fps`.
    pub fn at(index: FrameIndex, fps: Fps) -> Self {
        Self {
            index,
            pts_ns: fps.frame_to_nanos(index),
        }
    }
}

/// Effect left out of a frame.
#[derive(Debug)]
pub struct SkippedEffect {
    /// Effect id.
    pub effect_id: String,
    /// Why it was skipped.
    pub error: EvaError,
}

/// What one [`FrameCompositor::render_frame`] call did.
#[derive(Debug)]
pub struct FrameReport {
    /// Rendered frame.
    pub frame: FrameIndex,
    /// Surface the frame went to.
    pub target: OutputTarget,
    /// The backing video layer was drawn.
    pub video_drawn: bool,
    /// Ids of drawn effects, bottom to top.
    pub drawn: Vec<String>,
    /// Effects that could not be drawn.
    pub skipped: Vec<SkippedEffect>,
    /// Result of presenting.
    pub present: PresentOutcome,
}

/// Outcome of one quad draw that got as far as the GPU.
enum QuadDraw {
    Drawn,
    /// The platform no longer knows the texture.
    Lost(PlatformError),
}

fn lost_texture(err: PlatformError) -> bool {
    matches!(err, PlatformError::BadTexture | PlatformError::ContextLost)
}

/// Forget what the lost draw referenced so the next resolve uploads again.
fn forget_lost(registry: &mut SourceRegistry, source_id: Option<&str>, err: PlatformError) {
    match (err, source_id) {
        (PlatformError::BadTexture, Some(id)) => {
            if let Err(e) = registry.forget_texture(id) {
                tracing::warn!(source = id, %e, "texture could not be forgotten");
            }
        }
        (PlatformError::BadTexture, None) => registry.forget_video_texture(),
        _ => registry.invalidate_textures(),
    }
}

/// Draws one frame of a descriptor: the backing video, then every active effect in z-order.
///
/// A draw whose texture the platform no longer knows (lost objects, lost context) is retried
/// once after re-uploading.
#[derive(Clone, Debug)]
pub struct FrameCompositor {
    descriptor: Arc<SceneDescriptor>,
    opts: CompositorOpts,
}

impl FrameCompositor {
    /// Compositor over a shared descriptor.
    pub fn new(descriptor: Arc<SceneDescriptor>, opts: CompositorOpts) -> Self {
        Self { descriptor, opts }
    }

    /// Descriptor being rendered.
    pub fn descriptor(&self) -> &Arc<SceneDescriptor> {
        &self.descriptor
    }

    /// Options in use.
    pub fn opts(&self) -> &CompositorOpts {
        &self.opts
    }

    /// Replace the packing layout override; `None` falls back to the descriptor's regions.
    pub fn set_video_mode(&mut self, mode: Option<VideoMode>) {
        self.opts.video_mode = mode;
    }

    /// Mix regions in effect: the explicit video mode when set, otherwise the descriptor's.
    pub fn mix_regions(&self) -> Option<MixRegions> {
        match self.opts.video_mode {
            Some(mode) => mode.mix_regions(self.descriptor.native_video()),
            None => self.descriptor.mix().copied(),
        }
    }

    /// Render `time.index` into `target` and present it.
    ///
    /// Mix regions are checked before anything is drawn. Effects whose source cannot be resolved
    /// are skipped and reported; only setup-level failures return an error.
    #[tracing::instrument(skip(self, manager, registry), fields(frame = time.index.0))]
    pub fn render_frame<P: GpuPlatform>(
        &self,
        manager: &mut SurfaceManager<P>,
        registry: &mut SourceRegistry,
        target: OutputTarget,
        time: FrameTime,
    ) -> EvaResult<FrameReport> {
        let mix = self.mix_regions();
        if let Some(mix) = &mix {
            mix.validate(self.descriptor.native_video())?;
        }

        let ctx = manager.make_current(target)?;
        let gpu = manager.platform_mut();
        gpu.clear(ctx.context(), self.opts.clear_rgba)
            .map_err(|err| EvaError::gpu(format!("clear failed: {err}")))?;

        let video_drawn = self.draw_video(gpu, registry, &ctx, mix.as_ref());

        let mut drawn = Vec::new();
        let mut skipped = Vec::new();
        for active in self.descriptor.iter_active(time.index) {
            let effect = active.effect;
            let mut result = self.draw_effect(gpu, registry, &ctx, effect);
            if let Ok(QuadDraw::Lost(err)) = result {
                tracing::warn!(effect = %effect.id, %err, "texture lost, uploading again");
                forget_lost(registry, Some(effect.source_id.as_str()), err);
                result = self.draw_effect(gpu, registry, &ctx, effect);
            }
            let result = result.and_then(|draw| match draw {
                QuadDraw::Drawn => Ok(()),
                QuadDraw::Lost(err) => Err(EvaError::gpu(format!(
                    "draw of '{}' failed: {err}",
                    effect.id
                ))),
            });
            match result {
                Ok(()) => drawn.push(effect.id.clone()),
                Err(error) => {
                    tracing::warn!(effect = %effect.id, %error, "effect skipped");
                    skipped.push(SkippedEffect {
                        effect_id: effect.id.clone(),
                        error,
                    });
                }
            }
        }

        let pts = match target {
            OutputTarget::Encoder => Some(time.pts_ns),
            OutputTarget::Display => None,
        };
        let present = manager.present_frame(pts);

        Ok(FrameReport {
            frame: time.index,
            target,
            video_drawn,
            drawn,
            skipped,
            present,
        })
    }

    fn draw_video<G: GpuCommands + ?Sized>(
        &self,
        gpu: &mut G,
        registry: &mut SourceRegistry,
        ctx: &CurrentContext,
        mix: Option<&MixRegions>,
    ) -> bool {
        let mut retried = false;
        loop {
            let video = match registry.resolve_video_texture(gpu, ctx) {
                Ok(Some(video)) => video,
                Ok(None) => return false,
                Err(err) => {
                    tracing::warn!(%err, "video layer skipped");
                    return false;
                }
            };
            let native = self.descriptor.native_video();
            if Canvas::new(video.width, video.height) != native {
                tracing::warn!(
                    width = video.width,
                    height = video.height,
                    native_width = native.width,
                    native_height = native.height,
                    "video frame size differs from the native size, layer skipped"
                );
                return false;
            }

            let drawn = match mix {
                Some(mix) => self.draw_mix_video(gpu, ctx, video, mix),
                None => self.draw_plain_video(gpu, ctx, video),
            };
            match drawn {
                Ok(drawn) => return drawn,
                Err(err) if lost_texture(err) && !retried => {
                    tracing::warn!(%err, "video texture lost, uploading again");
                    forget_lost(registry, None, err);
                    retried = true;
                }
                Err(err) => {
                    tracing::warn!(%err, "video layer draw failed");
                    return false;
                }
            }
        }
    }

    fn draw_plain_video<G: GpuCommands + ?Sized>(
        &self,
        gpu: &mut G,
        ctx: &CurrentContext,
        video: VideoTexture,
    ) -> Result<bool, PlatformError> {
        let canvas = self.descriptor.canvas().to_rect();
        let Some(placement) =
            fit_source(video.width, video.height, canvas, FitMode::CenterFitContained)
        else {
            return Ok(false);
        };
        let quad = TexturedQuad {
            texture: video.texture,
            src: placement.src,
            dest: placement.dest,
            transform: Affine::IDENTITY,
            opacity: 1.0,
        };
        gpu.draw_quad(ctx.context(), &quad)?;
        Ok(true)
    }

    fn draw_mix_video<G: GpuCommands + ?Sized>(
        &self,
        gpu: &mut G,
        ctx: &CurrentContext,
        video: VideoTexture,
        mix: &MixRegions,
    ) -> Result<bool, PlatformError> {
        let canvas = self.descriptor.canvas().to_rect();
        let Some(placement) =
            fit_source(mix.rgb.w, mix.rgb.h, canvas, FitMode::CenterFitContained)
        else {
            return Ok(false);
        };
        let rgb_origin = Vec2::new(f64::from(mix.rgb.x), f64::from(mix.rgb.y));
        let quad = MixQuad {
            texture: video.texture,
            rgb_src: placement.src + rgb_origin,
            alpha_offset: Vec2::new(
                f64::from(mix.alpha.x) - f64::from(mix.rgb.x),
                f64::from(mix.alpha.y) - f64::from(mix.rgb.y),
            ),
            dest: placement.dest,
            transform: Affine::IDENTITY,
        };
        gpu.draw_mix_quad(ctx.context(), &quad)?;
        Ok(true)
    }

    fn draw_effect<G: GpuCommands + ?Sized>(
        &self,
        gpu: &mut G,
        registry: &mut SourceRegistry,
        ctx: &CurrentContext,
        effect: &Effect,
    ) -> EvaResult<QuadDraw> {
        if let Some(binding) = self.descriptor.resolve_data_binding(effect) {
            match &binding.value {
                BindingValue::Text(text) => {
                    let is_text = registry
                        .get(&effect.source_id)
                        .is_some_and(|s| matches!(s.content(), SourceContent::Text(_)));
                    if is_text {
                        registry.set_text(&effect.source_id, text)?;
                    }
                }
                BindingValue::ImageUrl(url) => {
                    tracing::debug!(effect = %effect.id, %url, "image binding left to the loader");
                }
            }
        }

        let texture = registry.resolve_texture(gpu, ctx, &effect.source_id)?;
        let source = registry
            .get(&effect.source_id)
            .ok_or_else(|| EvaError::source_resolution(&effect.source_id, "unknown source"))?;
        let (w, h) = source.size();
        let rect = effect.rect.to_rect();
        let placement = fit_source(w, h, rect, source.fit()).ok_or_else(|| {
            EvaError::source_resolution(&effect.source_id, "source or effect rectangle is empty")
        })?;

        let quad = TexturedQuad {
            texture,
            src: placement.src,
            dest: placement.dest,
            transform: effect.transform.to_affine_at(Point::new(rect.x0, rect.y0)),
            opacity: 1.0,
        };
        match gpu.draw_quad(ctx.context(), &quad) {
            Ok(()) => Ok(QuadDraw::Drawn),
            Err(err) if lost_texture(err) => Ok(QuadDraw::Lost(err)),
            Err(err) => Err(EvaError::gpu(format!(
                "draw of '{}' failed: {err}",
                effect.id
            ))),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
