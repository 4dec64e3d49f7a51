use crate::foundation::error::{EvaError, EvaResult};
use crate::gpu::config::ConfigProfile;
use crate::gpu::handles::{
    ConfigHandle, ContextHandle, ContextState, DisplayHandle, DriverVersion, NativeWindow,
    OutputTarget, SurfaceHandle,
};
use crate::gpu::platform::{GpuPlatform, PlatformError, PresentationTimeExt};
use crate::gpu::teardown::{TeardownReport, TeardownStep, run_steps};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// Options for [`SurfaceManager`].
pub struct SurfaceManagerOpts {
    /// Client API version requested for the unshared display context.
    pub primary_client_version: u32,
    /// Client API version requested for the shared encoder context.
    pub secondary_client_version: u32,
    /// Fall back to the legacy 5-6-5 config when no 8-8-8-8 display config exists.
    #[serde(default)]
    pub low_color_fallback: bool,
}

impl Default for SurfaceManagerOpts {
    fn default() -> Self {
        Self {
            primary_client_version: 3,
            secondary_client_version: 2,
            low_color_fallback: false,
        }
    }
}

/// Result of opening the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayInfo {
    /// Display connection.
    pub display: DisplayHandle,
    /// Driver version reported at initialization.
    pub version: DriverVersion,
}

/// Proof that a target's context is current on the calling thread.
///
/// Draw and upload calls take this token instead of relying on ambient thread state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentContext {
    target: OutputTarget,
    context: ContextHandle,
    surface: SurfaceHandle,
}

impl CurrentContext {
    /// Target the context drives.
    pub fn target(&self) -> OutputTarget {
        self.target
    }

    /// Context handle for GPU commands.
    pub fn context(&self) -> ContextHandle {
        self.context
    }

    /// Surface draws land in.
    pub fn surface(&self) -> SurfaceHandle {
        self.surface
    }
}

/// What happened to one present request. Presenting never fails the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Buffer handed to the consumer.
    Presented {
        /// A presentation timestamp was attached.
        timestamped: bool,
    },
    /// Nothing was bound; no buffer was produced.
    Skipped,
    /// The swap itself failed; the frame is lost.
    Failed(PlatformError),
}

#[derive(Debug, Default)]
struct ContextSlot {
    state: ContextState,
    config: Option<ConfigHandle>,
    context: Option<ContextHandle>,
    surface: Option<SurfaceHandle>,
    window: Option<NativeWindow>,
}

impl ContextSlot {
    fn is_empty(&self) -> bool {
        self.context.is_none() && self.surface.is_none() && self.window.is_none()
    }

    fn reset_released(&mut self) {
        let state = if self.state == ContextState::Uninitialized && self.is_empty() {
            ContextState::Uninitialized
        } else {
            ContextState::Released
        };
        *self = Self {
            state,
            ..Self::default()
        };
    }
}

/// Owns the display connection and the primary/secondary context pairs.
///
/// The primary context renders to the live window; the secondary shares its object namespace
/// and renders to the encoder input surface. Every native handle created here is destroyed by
/// [`SurfaceManager::release`], which tolerates partial initialization and repeated calls.
pub struct SurfaceManager<P: GpuPlatform> {
    platform: P,
    opts: SurfaceManagerOpts,
    display: Option<DisplayHandle>,
    info: Option<DisplayInfo>,
    primary: ContextSlot,
    secondary: ContextSlot,
    orphans: Vec<ContextHandle>,
    current: Option<OutputTarget>,
    presentation_time: Option<PresentationTimeExt>,
}

impl<P: GpuPlatform> SurfaceManager<P> {
    /// Manager over `platform`; nothing is opened yet.
    pub fn new(platform: P, opts: SurfaceManagerOpts) -> Self {
        Self {
            platform,
            opts,
            display: None,
            info: None,
            primary: ContextSlot::default(),
            secondary: ContextSlot::default(),
            orphans: Vec::new(),
            current: None,
            presentation_time: None,
        }
    }

    /// Borrow the platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Mutably borrow the platform, e.g. to mint windows or upload textures.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Acquire and initialize the default display. Returns the cached info once open.
    pub fn open_display(&mut self) -> EvaResult<DisplayInfo> {
        if let Some(info) = self.info {
            return Ok(info);
        }
        let display = self
            .platform
            .default_display()
            .ok_or_else(|| EvaError::DisplayUnavailable("no default display".to_string()))?;
        let version = self.platform.initialize(display).map_err(|err| {
            EvaError::DisplayUnavailable(format!("display initialization failed: {err}"))
        })?;

        let info = DisplayInfo { display, version };
        self.display = Some(display);
        self.info = Some(info);
        tracing::debug!(major = version.major, minor = version.minor, "display open");
        Ok(info)
    }

    /// Pick the best config for `profile`. Zero matches is an error, never a silent default.
    pub fn choose_config(&mut self, profile: &ConfigProfile) -> EvaResult<ConfigHandle> {
        let display = self.require_display()?;
        let configs = self
            .platform
            .choose_configs(display, profile)
            .map_err(|err| EvaError::NoMatchingConfig(format!("config query failed: {err}")))?;
        configs.first().copied().ok_or_else(|| {
            EvaError::NoMatchingConfig(format!(
                "no config offers {}-{}-{}-{} color for {:?} surfaces{}",
                profile.red,
                profile.green,
                profile.blue,
                profile.alpha,
                profile.surface,
                if profile.recordable { " (recordable)" } else { "" }
            ))
        })
    }

    /// Create a context on `config`. With `share`, the new context joins its object namespace
    /// and requests the secondary client version; otherwise the primary one.
    pub fn create_context(
        &mut self,
        config: ConfigHandle,
        share: Option<ContextHandle>,
    ) -> EvaResult<ContextHandle> {
        let display = self.require_display()?;
        let version = match share {
            Some(_) => self.opts.secondary_client_version,
            None => self.opts.primary_client_version,
        };
        let context = self
            .platform
            .create_context(display, config, share, version)
            .map_err(|err| {
                EvaError::ContextCreationFailed(format!("client version {version}: {err}"))
            })?;
        self.orphans.push(context);
        tracing::debug!(?context, version, shared = share.is_some(), "context created");
        Ok(context)
    }

    /// Create a window surface for `target` and make it current.
    ///
    /// The context and window are recorded on the target's slot before anything can fail, so a
    /// later [`release`](Self::release) cleans them up.
    pub fn bind_window_surface(
        &mut self,
        target: OutputTarget,
        config: ConfigHandle,
        context: ContextHandle,
        window: NativeWindow,
    ) -> EvaResult<SurfaceHandle> {
        let display = self.require_display()?;
        let slot = self.slot_mut(target);
        if slot.context.is_some() {
            return Err(EvaError::validation(format!(
                "{target} context is already bound"
            )));
        }
        slot.config = Some(config);
        slot.context = Some(context);
        slot.window = Some(window);
        slot.state = ContextState::Configured;
        self.orphans.retain(|c| *c != context);

        let surface_error = |err: PlatformError| {
            tracing::error!(%target, %err, "window surface creation failed");
            EvaError::SurfaceCreationFailed {
                reason: err.surface_failure(),
            }
        };
        let visual = self
            .platform
            .native_visual_id(display, config)
            .map_err(surface_error)?;
        self.platform
            .set_buffers_geometry(window, visual)
            .map_err(surface_error)?;
        let surface = self
            .platform
            .create_window_surface(display, config, window)
            .map_err(surface_error)?;
        self.slot_mut(target).surface = Some(surface);

        self.make_current(target)?;
        Ok(surface)
    }

    /// Open the display and build the display context on `window`.
    ///
    /// With [`SurfaceManagerOpts::low_color_fallback`] a display without 8-8-8-8 configs gets
    /// the legacy 5-6-5 context instead of [`EvaError::NoMatchingConfig`]. On failure everything
    /// created so far is released before the error is returned.
    #[tracing::instrument(skip(self))]
    pub fn build_primary(&mut self, window: NativeWindow) -> EvaResult<ContextHandle> {
        let mut profiles = vec![ConfigProfile::display()];
        if self.opts.low_color_fallback {
            profiles.push(ConfigProfile::low_color_offscreen());
        }
        self.build_primary_from(window, &profiles)
    }

    /// Build the display context on the legacy 5-6-5 config: no alpha channel, still presented
    /// through a window surface on `window`.
    #[tracing::instrument(skip(self))]
    pub fn build_legacy_primary(&mut self, window: NativeWindow) -> EvaResult<ContextHandle> {
        self.build_primary_from(window, &[ConfigProfile::low_color_offscreen()])
    }

    fn build_primary_from(
        &mut self,
        window: NativeWindow,
        profiles: &[ConfigProfile],
    ) -> EvaResult<ContextHandle> {
        if !self.primary.is_empty() {
            return Err(EvaError::validation("display context is already built"));
        }
        self.primary.window = Some(window);

        let mut result = Err(EvaError::NoMatchingConfig("no display profile".to_string()));
        for profile in profiles {
            result = self.try_build_primary(window, profile);
            match &result {
                Err(EvaError::NoMatchingConfig(reason)) => {
                    tracing::warn!(%reason, "display profile unavailable");
                }
                _ => break,
            }
        }
        result.inspect_err(|err| {
            tracing::error!(%err, "primary setup failed");
            let _ = self.release();
        })
    }

    fn try_build_primary(
        &mut self,
        window: NativeWindow,
        profile: &ConfigProfile,
    ) -> EvaResult<ContextHandle> {
        self.open_display()?;
        let config = self.choose_config(profile)?;
        let context = self.create_context(config, None)?;
        self.bind_window_surface(OutputTarget::Display, config, context, window)?;
        Ok(context)
    }

    /// Build the encoder context sharing `primary`'s objects, bound to `window`.
    ///
    /// Resolves the presentation-time extension; without it encoder frames go out untimestamped.
    /// On failure only the encoder side is released.
    #[tracing::instrument(skip(self))]
    pub fn build_secondary_context(
        &mut self,
        primary: ContextHandle,
        window: NativeWindow,
    ) -> EvaResult<ContextHandle> {
        if !self.secondary.is_empty() {
            return Err(EvaError::validation("encoder context is already built"));
        }
        self.secondary.window = Some(window);
        self.try_build_secondary(primary, window).inspect_err(|err| {
            tracing::error!(%err, "encoder setup failed");
            let _ = self.release_secondary();
        })
    }

    fn try_build_secondary(
        &mut self,
        primary: ContextHandle,
        window: NativeWindow,
    ) -> EvaResult<ContextHandle> {
        self.open_display()?;
        let config = self.choose_config(&ConfigProfile::recordable())?;
        let context = self.create_context(config, Some(primary))?;
        self.bind_window_surface(OutputTarget::Encoder, config, context, window)?;

        self.presentation_time = self.platform.presentation_time_ext();
        if self.presentation_time.is_none() {
            tracing::warn!(
                "presentation-time extension unavailable, encoder frames carry no timestamps"
            );
        }
        Ok(context)
    }

    /// Bind `target`'s context and surface to the calling thread.
    pub fn make_current(&mut self, target: OutputTarget) -> EvaResult<CurrentContext> {
        let display = self
            .display
            .ok_or_else(|| EvaError::MakeCurrentFailed("display not open".to_string()))?;
        let slot = self.slot(target);
        let (Some(context), Some(surface)) = (slot.context, slot.surface) else {
            return Err(EvaError::MakeCurrentFailed(format!(
                "{target} context is not built"
            )));
        };

        self.platform
            .make_current(display, Some((surface, context)))
            .map_err(|err| EvaError::MakeCurrentFailed(format!("{target}: {err}")))?;

        if let Some(prev) = self.current
            && prev != target
        {
            let prev_slot = self.slot_mut(prev);
            if prev_slot.state == ContextState::Current {
                prev_slot.state = ContextState::Configured;
            }
        }
        self.slot_mut(target).state = ContextState::Current;
        self.current = Some(target);
        Ok(CurrentContext {
            target,
            context,
            surface,
        })
    }

    /// Token for whatever is current, if anything.
    pub fn current(&self) -> Option<CurrentContext> {
        let target = self.current?;
        let slot = self.slot(target);
        Some(CurrentContext {
            target,
            context: slot.context?,
            surface: slot.surface?,
        })
    }

    /// Swap the current surface, attaching `timestamp_ns` when supplied and supported.
    pub fn present_frame(&mut self, timestamp_ns: Option<u64>) -> PresentOutcome {
        let (Some(display), Some(target)) = (self.display, self.current) else {
            tracing::warn!("present requested with nothing bound");
            return PresentOutcome::Skipped;
        };
        let Some(surface) = self.slot(target).surface else {
            tracing::warn!(%target, "present requested without a surface");
            return PresentOutcome::Skipped;
        };

        let mut timestamped = false;
        if let (Some(nanos), Some(ext)) = (timestamp_ns, &self.presentation_time) {
            match self
                .platform
                .set_presentation_time(ext, display, surface, nanos)
            {
                Ok(()) => timestamped = true,
                Err(err) => tracing::warn!(%target, %err, "presentation time not applied"),
            }
        }

        match self.platform.swap_buffers(display, surface) {
            Ok(()) => PresentOutcome::Presented { timestamped },
            Err(err) => {
                tracing::warn!(%target, %err, "swap failed, frame dropped");
                PresentOutcome::Failed(err)
            }
        }
    }

    /// Tear down every native handle in order. Each step is attempted even when an earlier one
    /// failed; calling again after a full release does nothing.
    #[tracing::instrument(skip(self))]
    pub fn release(&mut self) -> TeardownReport {
        let mut steps = Vec::new();
        if self.display.is_some() {
            steps.push(TeardownStep::UnbindCurrent);
            for target in [OutputTarget::Encoder, OutputTarget::Display] {
                let slot = self.slot(target);
                if slot.surface.is_some() {
                    steps.push(TeardownStep::DestroySurface(target));
                }
                if slot.context.is_some() {
                    steps.push(TeardownStep::DestroyContext(target));
                }
            }
            if !self.orphans.is_empty() {
                steps.push(TeardownStep::DestroyOrphanContext);
            }
            steps.push(TeardownStep::TerminateDisplay);
            steps.push(TeardownStep::ReleaseThread);
        }
        for target in [OutputTarget::Encoder, OutputTarget::Display] {
            if self.slot(target).window.is_some() {
                steps.push(TeardownStep::ReleaseWindow(target));
            }
        }

        let report = run_steps(&steps, |step| self.exec_step(step));

        self.primary.reset_released();
        self.secondary.reset_released();
        self.orphans.clear();
        self.display = None;
        self.info = None;
        self.current = None;
        self.presentation_time = None;
        if !report.is_noop() {
            tracing::debug!(
                steps = report.attempted.len(),
                failures = report.failures.len(),
                "surfaces released"
            );
        }
        report
    }

    /// Tear down only the encoder side, leaving the display context alive.
    ///
    /// When the encoder was current, the display context is made current again.
    #[tracing::instrument(skip(self))]
    pub fn release_secondary(&mut self) -> TeardownReport {
        let encoder_was_current = self.current == Some(OutputTarget::Encoder);
        let mut steps = Vec::new();
        if self.display.is_some() {
            if encoder_was_current {
                steps.push(TeardownStep::UnbindCurrent);
            }
            if self.secondary.surface.is_some() {
                steps.push(TeardownStep::DestroySurface(OutputTarget::Encoder));
            }
            if self.secondary.context.is_some() {
                steps.push(TeardownStep::DestroyContext(OutputTarget::Encoder));
            }
        }
        if self.secondary.window.is_some() {
            steps.push(TeardownStep::ReleaseWindow(OutputTarget::Encoder));
        }

        let mut report = run_steps(&steps, |step| self.exec_step(step));
        self.secondary.reset_released();
        self.presentation_time = None;
        if encoder_was_current {
            self.current = None;
            if self.primary.surface.is_some()
                && let Err(err) = self.make_current(OutputTarget::Display)
            {
                tracing::warn!(%err, "display context could not be made current again");
                report.failures.push(err);
            }
        }
        report
    }

    fn exec_step(&mut self, step: TeardownStep) -> Result<(), PlatformError> {
        match step {
            TeardownStep::UnbindCurrent => {
                let display = self.display.ok_or(PlatformError::NotInitialized)?;
                self.platform.make_current(display, None)
            }
            TeardownStep::DestroySurface(target) => {
                let display = self.display.ok_or(PlatformError::NotInitialized)?;
                match self.slot_mut(target).surface.take() {
                    Some(surface) => self.platform.destroy_surface(display, surface),
                    None => Ok(()),
                }
            }
            TeardownStep::DestroyContext(target) => {
                let display = self.display.ok_or(PlatformError::NotInitialized)?;
                match self.slot_mut(target).context.take() {
                    Some(context) => self.platform.destroy_context(display, context),
                    None => Ok(()),
                }
            }
            TeardownStep::DestroyOrphanContext => {
                let display = self.display.ok_or(PlatformError::NotInitialized)?;
                let mut result = Ok(());
                for context in std::mem::take(&mut self.orphans) {
                    if let Err(err) = self.platform.destroy_context(display, context) {
                        result = Err(err);
                    }
                }
                result
            }
            TeardownStep::TerminateDisplay => {
                let display = self.display.ok_or(PlatformError::NotInitialized)?;
                self.platform.terminate(display)
            }
            TeardownStep::ReleaseThread => self.platform.release_thread(),
            TeardownStep::ReleaseWindow(target) => match self.slot_mut(target).window.take() {
                Some(window) => self.platform.release_window(window),
                None => Ok(()),
            },
        }
    }

    /// Lifecycle state of `target`'s slot.
    pub fn state(&self, target: OutputTarget) -> ContextState {
        self.slot(target).state
    }

    /// Display info once open.
    pub fn display_info(&self) -> Option<DisplayInfo> {
        self.info
    }

    /// `true` when encoder frames can carry presentation timestamps.
    pub fn has_presentation_time(&self) -> bool {
        self.presentation_time.is_some()
    }

    /// Context handle of `target`, if built.
    pub fn context(&self, target: OutputTarget) -> Option<ContextHandle> {
        self.slot(target).context
    }

    fn require_display(&self) -> EvaResult<DisplayHandle> {
        self.display
            .ok_or_else(|| EvaError::DisplayUnavailable("display not open".to_string()))
    }

    fn slot(&self, target: OutputTarget) -> &ContextSlot {
        match target {
            OutputTarget::Display => &self.primary,
            OutputTarget::Encoder => &self.secondary,
        }
    }

    fn slot_mut(&mut self, target: OutputTarget) -> &mut ContextSlot {
        match target {
            OutputTarget::Display => &mut self.primary,
            OutputTarget::Encoder => &mut self.secondary,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/surface_manager.rs"]
mod tests;
