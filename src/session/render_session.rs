use std::sync::Arc;

use crate::assets::registry::{SourceRegistry, VideoFrame};
use crate::foundation::core::{Fps, FrameIndex, FrameRange};
use crate::foundation::error::{EvaError, EvaResult};
use crate::gpu::handles::{ContextHandle, ContextState, NativeWindow, OutputTarget};
use crate::gpu::platform::GpuPlatform;
use crate::gpu::surface_manager::{PresentOutcome, SurfaceManager, SurfaceManagerOpts};
use crate::gpu::teardown::TeardownReport;
use crate::render::compositor::{CompositorOpts, FrameCompositor, FrameReport, FrameTime};
use crate::scene::defaults::{VideoMode, detect_video_mode};
use crate::scene::model::{DEFAULT_FPS, DescriptorData, SceneDescriptor};
use crate::session::clock::{FixedRateClock, PlaybackClock};

/// How the session picks the packing layout of the backing video.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeSelection {
    /// Use the descriptor's mix regions.
    #[default]
    Descriptor,
    /// Always use this layout.
    Fixed(VideoMode),
    /// Probe the first video frame that arrives.
    Auto,
}

/// Options for [`RenderSession`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SessionOpts {
    /// Frame rate for descriptors that carry none.
    pub default_fps: Fps,
    /// Compositor options.
    pub compositor: CompositorOpts,
    /// Client versions for the display and encoder contexts.
    pub surfaces: SurfaceManagerOpts,
    /// Packing layout selection.
    pub mode: ModeSelection,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            default_fps: DEFAULT_FPS,
            compositor: CompositorOpts::default(),
            surfaces: SurfaceManagerOpts::default(),
            mode: ModeSelection::default(),
        }
    }
}

/// Range render statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames in the requested range.
    pub frames_total: u64,
    /// Frames handed to the encoder surface.
    pub frames_presented: u64,
    /// Effects skipped across all frames.
    pub effects_skipped: u64,
}

/// One playback session: a descriptor, its sources, and the surfaces it renders into.
///
/// `start` brings up the display side, `start_recording` adds the encoder side sharing the
/// display context's objects. Dropping the session releases everything.
pub struct RenderSession<P: GpuPlatform> {
    descriptor: Arc<SceneDescriptor>,
    manager: SurfaceManager<P>,
    registry: SourceRegistry,
    compositor: FrameCompositor,
    clock: Box<dyn PlaybackClock>,
    mode: ModeSelection,
    primary: Option<ContextHandle>,
}

impl<P: GpuPlatform> RenderSession<P> {
    /// Validate `data` and build a session over `platform`.
    pub fn new(platform: P, data: DescriptorData, opts: SessionOpts) -> EvaResult<Self> {
        let descriptor = SceneDescriptor::with_default_fps(data, opts.default_fps)?;
        Self::from_descriptor(platform, Arc::new(descriptor), opts)
    }

    /// Session over an already built descriptor.
    pub fn from_descriptor(
        platform: P,
        descriptor: Arc<SceneDescriptor>,
        opts: SessionOpts,
    ) -> EvaResult<Self> {
        let registry = SourceRegistry::from_descriptor(&descriptor)?;
        let mut compositor_opts = opts.compositor;
        if let ModeSelection::Fixed(mode) = opts.mode {
            compositor_opts.video_mode = Some(mode);
        }
        Ok(Self {
            manager: SurfaceManager::new(platform, opts.surfaces),
            registry,
            compositor: FrameCompositor::new(Arc::clone(&descriptor), compositor_opts),
            clock: Box::new(FixedRateClock::new(descriptor.fps())),
            mode: opts.mode,
            primary: None,
            descriptor,
        })
    }

    /// Replace the fixed-rate clock derived from the descriptor.
    pub fn with_clock(mut self, clock: impl PlaybackClock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Descriptor being played.
    pub fn descriptor(&self) -> &Arc<SceneDescriptor> {
        &self.descriptor
    }

    /// Sources and the current video frame.
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Registry access for the asset loader.
    pub fn registry_mut(&mut self) -> &mut SourceRegistry {
        &mut self.registry
    }

    /// Display and encoder surfaces.
    pub fn manager(&self) -> &SurfaceManager<P> {
        &self.manager
    }

    /// Borrow the platform.
    pub fn platform(&self) -> &P {
        self.manager.platform()
    }

    /// Mutably borrow the platform, e.g. to mint windows.
    pub fn platform_mut(&mut self) -> &mut P {
        self.manager.platform_mut()
    }

    /// Packing layout override currently applied, if any.
    pub fn video_mode(&self) -> Option<VideoMode> {
        self.compositor.opts().video_mode
    }

    /// Bring up the display context and surface on `display`.
    #[tracing::instrument(skip(self, window), fields(display = ?window))]
    pub fn start(&mut self, window: NativeWindow) -> EvaResult<()> {
        if self.primary.is_some() {
            return Err(EvaError::validation("session already started"));
        }
        let primary = self.manager.build_primary(window)?;
        self.primary = Some(primary);
        tracing::debug!(?primary, "display ready");
        Ok(())
    }

    /// Add the encoder surface; its context shares objects with the display context.
    #[tracing::instrument(skip(self))]
    pub fn start_recording(&mut self, encoder: NativeWindow) -> EvaResult<()> {
        let primary = self
            .primary
            .ok_or_else(|| EvaError::validation("recording needs a started display"))?;
        if self.is_recording() {
            return Err(EvaError::validation("already recording"));
        }
        self.manager.build_secondary_context(primary, encoder)?;
        Ok(())
    }

    /// `true` while the encoder surface is built.
    pub fn is_recording(&self) -> bool {
        matches!(
            self.manager.state(OutputTarget::Encoder),
            ContextState::Configured | ContextState::Current
        )
    }

    /// Tear down the encoder side only; the display keeps running.
    pub fn stop_recording(&mut self) -> TeardownReport {
        self.manager.release_secondary()
    }

    /// Hand the next decoded video frame to the registry.
    ///
    /// With [`ModeSelection::Auto`] the first frame that yields a layout fixes it for the rest
    /// of the session.
    pub fn set_video_frame(&mut self, frame: VideoFrame) {
        if self.mode == ModeSelection::Auto && self.video_mode().is_none() {
            match detect_video_mode(&frame.pixels) {
                Some(mode) => {
                    tracing::info!(%mode, "video mode detected");
                    self.compositor.set_video_mode(Some(mode));
                }
                None => tracing::debug!("video mode not detected from this frame"),
            }
        }
        self.registry.set_video_frame(frame);
    }

    /// Render whatever the clock places at `position_ns` into `target`.
    pub fn tick(&mut self, target: OutputTarget, position_ns: u64) -> EvaResult<FrameReport> {
        let time = self.clock.frame_at(position_ns);
        self.render(target, time)
    }

    /// Render `frame` into `target`, stamped with the frame's start time.
    pub fn render_frame(
        &mut self,
        target: OutputTarget,
        frame: FrameIndex,
    ) -> EvaResult<FrameReport> {
        let time = FrameTime {
            index: frame,
            pts_ns: self.clock.start_of(frame),
        };
        self.render(target, time)
    }

    /// Render `range` to the encoder surface in order.
    ///
    /// `video` supplies the backing frame for each index; `None` keeps the previous one.
    #[tracing::instrument(skip(self, video))]
    pub fn record_range(
        &mut self,
        range: FrameRange,
        mut video: impl FnMut(FrameIndex) -> Option<VideoFrame>,
    ) -> EvaResult<RenderStats> {
        if range.start.0 >= range.end.0 {
            return Err(EvaError::validation("record range must be non-empty"));
        }
        if !self.is_recording() {
            return Err(EvaError::validation("record_range needs start_recording first"));
        }

        let mut stats = RenderStats::default();
        for f in range.start.0..range.end.0 {
            let frame = FrameIndex(f);
            if let Some(v) = video(frame) {
                self.set_video_frame(v);
            }
            let report = self.render_frame(OutputTarget::Encoder, frame)?;
            stats.frames_total += 1;
            stats.effects_skipped += report.skipped.len() as u64;
            if matches!(report.present, PresentOutcome::Presented { .. }) {
                stats.frames_presented += 1;
            }
        }
        Ok(stats)
    }

    fn render(&mut self, target: OutputTarget, time: FrameTime) -> EvaResult<FrameReport> {
        self.compositor
            .render_frame(&mut self.manager, &mut self.registry, target, time)
    }

    /// Delete source textures, then release every context, surface and window.
    ///
    /// Safe to call at any point and more than once.
    #[tracing::instrument(skip(self))]
    pub fn release(&mut self) -> TeardownReport {
        if self.primary.take().is_some() {
            match self.manager.make_current(OutputTarget::Display) {
                Ok(ctx) => self
                    .registry
                    .release_textures(self.manager.platform_mut(), &ctx),
                Err(err) => tracing::warn!(%err, "textures left to context teardown"),
            }
        }
        self.manager.release()
    }
}

impl<P: GpuPlatform> Drop for RenderSession<P> {
    fn drop(&mut self) {
        let report = self.release();
        if !report.is_clean() {
            tracing::warn!(failures = report.failures.len(), "session teardown incomplete");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
