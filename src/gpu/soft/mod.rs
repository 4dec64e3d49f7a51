//! In-process software implementation of the display and GPU command traits.
//!
//! Follows the native display API closely enough to exercise the surface manager and the
//! compositor without hardware: configs are matched by attribute, contexts live in share groups,
//! current bindings are tracked per thread, and every window owns a bounded queue of presented
//! buffers that tests and the CLI read back.

use std::collections::{HashMap, VecDeque};
use std::thread::{self, ThreadId};

use crate::assets::bitmap::Bitmap;
use crate::gpu::config::{ConfigDesc, ConfigProfile, RenderableApi, SurfaceKind};
use crate::gpu::handles::{
    ConfigHandle, ContextHandle, DisplayHandle, DriverVersion, NativeWindow, SurfaceHandle,
    TextureId,
};
use crate::gpu::platform::{
    DisplayApi, GpuCommands, MixQuad, PlatformError, PresentationTimeExt, TexturedQuad,
};

pub(crate) mod raster;

/// Pixel format id for 8-8-8-8 window buffers.
pub const FORMAT_RGBA_8888: i32 = 1;
/// Pixel format id for 5-6-5 window buffers.
pub const FORMAT_RGB_565: i32 = 4;

const PRESENTATION_TIME_ENTRY_POINT: &str = "eglPresentationTimeANDROID";

#[derive(Clone, Debug)]
/// Construction options for [`SoftPlatform`].
pub struct SoftPlatformOpts {
    /// Version reported by `initialize`.
    pub driver_version: DriverVersion,
    /// Buffers a window holds before the oldest is dropped.
    pub max_queued_buffers: usize,
    /// Whether the presentation-time extension resolves.
    pub presentation_time_ext: bool,
    /// Configs the display offers, in preference order for equal matches.
    pub configs: Vec<ConfigDesc>,
    /// Whether a default display exists at all.
    pub has_display: bool,
}

impl Default for SoftPlatformOpts {
    fn default() -> Self {
        Self {
            driver_version: DriverVersion { major: 1, minor: 5 },
            max_queued_buffers: 3,
            presentation_time_ext: true,
            configs: default_configs(),
            has_display: true,
        }
    }
}

/// Configs of a typical mobile display.
pub fn default_configs() -> Vec<ConfigDesc> {
    let rgba8888 = ConfigDesc {
        red: 8,
        green: 8,
        blue: 8,
        alpha: 8,
        depth: 0,
        stencil: 0,
        renderable: vec![RenderableApi::Gles2, RenderableApi::Gles3],
        surfaces: vec![SurfaceKind::Window, SurfaceKind::Pbuffer],
        recordable: false,
        native_visual: FORMAT_RGBA_8888,
    };
    vec![
        ConfigDesc {
            depth: 24,
            stencil: 8,
            ..rgba8888.clone()
        },
        rgba8888.clone(),
        ConfigDesc {
            recordable: true,
            surfaces: vec![SurfaceKind::Window],
            ..rgba8888
        },
        ConfigDesc {
            red: 5,
            green: 6,
            blue: 5,
            alpha: 0,
            depth: 0,
            stencil: 0,
            renderable: vec![RenderableApi::Gles2, RenderableApi::Gles3],
            surfaces: vec![SurfaceKind::Window, SurfaceKind::Pbuffer],
            recordable: false,
            native_visual: FORMAT_RGB_565,
        },
    ]
}

/// Operations that can be made to fail once with [`SoftPlatform::fail_next`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum SoftOp {
    Initialize,
    CreateContext,
    CreateSurface,
    MakeCurrent,
    SwapBuffers,
    DestroySurface,
    DestroyContext,
    Terminate,
    ReleaseThread,
    ReleaseWindow,
    CreateTexture,
}

/// One buffer handed to a window's consumer.
#[derive(Clone, Debug)]
pub struct PresentedBuffer {
    /// Premultiplied surface contents at swap time.
    pub frame: Bitmap,
    /// Presentation timestamp attached before the swap.
    pub timestamp_ns: Option<u64>,
    /// 1-based swap count on this window.
    pub sequence: u64,
}

struct SoftContext {
    config: ConfigHandle,
    share_group: u64,
    client_version: u32,
    current_on: Option<ThreadId>,
}

#[derive(Default)]
struct ShareGroup {
    textures: HashMap<TextureId, Bitmap>,
    next_texture: u32,
    members: usize,
}

struct SoftSurface {
    window: NativeWindow,
    config: ConfigHandle,
    width: u32,
    height: u32,
    back: Vec<u8>,
    pending_pts: Option<u64>,
}

struct SoftWindow {
    width: u32,
    height: u32,
    format: Option<i32>,
    surface: Option<SurfaceHandle>,
    released: bool,
    queue: VecDeque<PresentedBuffer>,
    presented: u64,
    dropped: u64,
}

/// Software display plus GPU.
pub struct SoftPlatform {
    opts: SoftPlatformOpts,
    display: DisplayHandle,
    initialized: bool,
    next_handle: u64,
    configs: Vec<(ConfigHandle, ConfigDesc)>,
    contexts: HashMap<ContextHandle, SoftContext>,
    share_groups: HashMap<u64, ShareGroup>,
    surfaces: HashMap<SurfaceHandle, SoftSurface>,
    windows: HashMap<NativeWindow, SoftWindow>,
    bindings: HashMap<ThreadId, (SurfaceHandle, ContextHandle)>,
    faults: HashMap<SoftOp, PlatformError>,
    texture_uploads: u64,
    draw_calls: u64,
}

impl Default for SoftPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftPlatform {
    /// Platform with default options.
    pub fn new() -> Self {
        Self::with_opts(SoftPlatformOpts::default())
    }

    /// Platform with explicit options.
    pub fn with_opts(opts: SoftPlatformOpts) -> Self {
        let configs = opts
            .configs
            .iter()
            .enumerate()
            .map(|(i, desc)| (ConfigHandle::from_raw(0x100 + i as u64), desc.clone()))
            .collect();
        Self {
            opts,
            display: DisplayHandle::from_raw(1),
            initialized: false,
            next_handle: 0x1000,
            configs,
            contexts: HashMap::new(),
            share_groups: HashMap::new(),
            surfaces: HashMap::new(),
            windows: HashMap::new(),
            bindings: HashMap::new(),
            faults: HashMap::new(),
            texture_uploads: 0,
            draw_calls: 0,
        }
    }

    /// Options the platform was built with.
    pub fn opts(&self) -> &SoftPlatformOpts {
        &self.opts
    }

    /// Mint a native window of the given size, as a window provider would.
    pub fn create_window(&mut self, width: u32, height: u32) -> NativeWindow {
        let window = NativeWindow::from_raw(self.mint());
        self.windows.insert(
            window,
            SoftWindow {
                width,
                height,
                format: None,
                surface: None,
                released: false,
                queue: VecDeque::new(),
                presented: 0,
                dropped: 0,
            },
        );
        window
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&mut self, op: SoftOp, err: PlatformError) {
        self.faults.insert(op, err);
    }

    /// Pop the oldest queued buffer, as the window's consumer would.
    pub fn acquire_frame(&mut self, window: NativeWindow) -> Option<PresentedBuffer> {
        self.windows.get_mut(&window)?.queue.pop_front()
    }

    /// Most recently presented buffer still in the queue.
    pub fn latest_frame(&self, window: NativeWindow) -> Option<&PresentedBuffer> {
        self.windows.get(&window)?.queue.back()
    }

    /// Buffers waiting for the consumer.
    pub fn queued_frames(&self, window: NativeWindow) -> usize {
        self.windows.get(&window).map_or(0, |w| w.queue.len())
    }

    /// Buffers discarded because the consumer fell behind.
    pub fn dropped_frames(&self, window: NativeWindow) -> u64 {
        self.windows.get(&window).map_or(0, |w| w.dropped)
    }

    /// Swaps performed on `window`.
    pub fn presented_count(&self, window: NativeWindow) -> u64 {
        self.windows.get(&window).map_or(0, |w| w.presented)
    }

    /// Buffer format set through `set_buffers_geometry`.
    pub fn window_format(&self, window: NativeWindow) -> Option<i32> {
        self.windows.get(&window)?.format
    }

    /// `true` once `release_window` succeeded.
    pub fn is_window_released(&self, window: NativeWindow) -> bool {
        self.windows.get(&window).is_some_and(|w| w.released)
    }

    /// `true` between `initialize` and `terminate`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Contexts not yet destroyed.
    pub fn live_contexts(&self) -> usize {
        self.contexts.len()
    }

    /// Surfaces not yet destroyed.
    pub fn live_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    /// Client version a live context was created with.
    pub fn context_client_version(&self, context: ContextHandle) -> Option<u32> {
        self.contexts.get(&context).map(|c| c.client_version)
    }

    /// `true` when both contexts see the same texture namespace.
    pub fn shares_objects(&self, a: ContextHandle, b: ContextHandle) -> bool {
        match (self.contexts.get(&a), self.contexts.get(&b)) {
            (Some(a), Some(b)) => a.share_group == b.share_group,
            _ => false,
        }
    }

    /// Texture uploads (creates and updates) since construction.
    pub fn texture_uploads(&self) -> u64 {
        self.texture_uploads
    }

    /// Quad draws since construction.
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    /// Drop every texture in every share group, as a lost context would.
    pub fn lose_textures(&mut self) {
        for group in self.share_groups.values_mut() {
            group.textures.clear();
        }
    }

    fn mint(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn take_fault(&mut self, op: SoftOp) -> Result<(), PlatformError> {
        match self.faults.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_display(&self, display: DisplayHandle) -> Result<(), PlatformError> {
        if display != self.display || !self.opts.has_display {
            return Err(PlatformError::BadDisplay);
        }
        if !self.initialized {
            return Err(PlatformError::NotInitialized);
        }
        Ok(())
    }

    fn config_desc(&self, config: ConfigHandle) -> Result<&ConfigDesc, PlatformError> {
        self.configs
            .iter()
            .find(|(h, _)| *h == config)
            .map(|(_, d)| d)
            .ok_or(PlatformError::BadConfig)
    }

    fn unbind_thread(&mut self, thread: ThreadId) {
        if let Some((_, ctx)) = self.bindings.remove(&thread)
            && let Some(c) = self.contexts.get_mut(&ctx)
        {
            c.current_on = None;
        }
    }

    /// Share group and surface the calling thread draws into with `context`.
    fn current_target(
        &self,
        context: ContextHandle,
    ) -> Result<(u64, SurfaceHandle), PlatformError> {
        let ctx = self.contexts.get(&context).ok_or(PlatformError::BadContext)?;
        match self.bindings.get(&thread::current().id()) {
            Some(&(surface, bound)) if bound == context => Ok((ctx.share_group, surface)),
            _ => Err(PlatformError::BadCurrentSurface),
        }
    }
}

impl DisplayApi for SoftPlatform {
    fn default_display(&mut self) -> Option<DisplayHandle> {
        self.opts.has_display.then_some(self.display)
    }

    fn initialize(&mut self, display: DisplayHandle) -> Result<DriverVersion, PlatformError> {
        if display != self.display || !self.opts.has_display {
            return Err(PlatformError::BadDisplay);
        }
        self.take_fault(SoftOp::Initialize)?;
        self.initialized = true;
        Ok(self.opts.driver_version)
    }

    fn choose_configs(
        &mut self,
        display: DisplayHandle,
        profile: &ConfigProfile,
    ) -> Result<Vec<ConfigHandle>, PlatformError> {
        self.check_display(display)?;
        let mut matches: Vec<(u32, usize, ConfigHandle)> = self
            .configs
            .iter()
            .enumerate()
            .filter(|(_, (_, desc))| desc.satisfies(profile))
            .map(|(i, (h, desc))| (desc.excess_bits(profile), i, *h))
            .collect();
        matches.sort_unstable();
        Ok(matches.into_iter().map(|(_, _, h)| h).collect())
    }

    fn native_visual_id(
        &self,
        display: DisplayHandle,
        config: ConfigHandle,
    ) -> Result<i32, PlatformError> {
        self.check_display(display)?;
        Ok(self.config_desc(config)?.native_visual)
    }

    fn create_context(
        &mut self,
        display: DisplayHandle,
        config: ConfigHandle,
        share: Option<ContextHandle>,
        client_version: u32,
    ) -> Result<ContextHandle, PlatformError> {
        self.check_display(display)?;
        self.take_fault(SoftOp::CreateContext)?;
        let max_version = self
            .config_desc(config)?
            .renderable
            .iter()
            .map(|api| api.max_client_version())
            .max()
            .unwrap_or(0);
        if client_version == 0 || client_version > max_version {
            return Err(PlatformError::BadMatch);
        }

        let share_group = match share {
            Some(other) => {
                self.contexts
                    .get(&other)
                    .ok_or(PlatformError::BadContext)?
                    .share_group
            }
            None => self.mint(),
        };
        let group = self.share_groups.entry(share_group).or_default();
        group.members += 1;

        let handle = ContextHandle::from_raw(self.mint());
        self.contexts.insert(
            handle,
            SoftContext {
                config,
                share_group,
                client_version,
                current_on: None,
            },
        );
        Ok(handle)
    }

    fn destroy_context(
        &mut self,
        display: DisplayHandle,
        context: ContextHandle,
    ) -> Result<(), PlatformError> {
        self.check_display(display)?;
        self.take_fault(SoftOp::DestroyContext)?;
        let ctx = self
            .contexts
            .remove(&context)
            .ok_or(PlatformError::BadContext)?;
        self.bindings.retain(|_, (_, c)| *c != context);
        if let Some(group) = self.share_groups.get_mut(&ctx.share_group) {
            group.members = group.members.saturating_sub(1);
            if group.members == 0 {
                self.share_groups.remove(&ctx.share_group);
            }
        }
        Ok(())
    }

    fn set_buffers_geometry(
        &mut self,
        window: NativeWindow,
        format: i32,
    ) -> Result<(), PlatformError> {
        let w = self
            .windows
            .get_mut(&window)
            .filter(|w| !w.released)
            .ok_or(PlatformError::BadNativeWindow)?;
        w.format = Some(format);
        Ok(())
    }

    fn create_window_surface(
        &mut self,
        display: DisplayHandle,
        config: ConfigHandle,
        window: NativeWindow,
    ) -> Result<SurfaceHandle, PlatformError> {
        self.check_display(display)?;
        self.take_fault(SoftOp::CreateSurface)?;
        let desc = self.config_desc(config)?;
        if !desc.surfaces.contains(&SurfaceKind::Window) {
            return Err(PlatformError::BadMatch);
        }
        let native_visual = desc.native_visual;

        let w = self
            .windows
            .get(&window)
            .filter(|w| !w.released)
            .ok_or(PlatformError::BadNativeWindow)?;
        if w.surface.is_some() {
            return Err(PlatformError::BadAlloc);
        }
        if w.width == 0 || w.height == 0 {
            return Err(PlatformError::BadParameter);
        }
        if w.format.is_some_and(|f| f != native_visual) {
            return Err(PlatformError::BadMatch);
        }
        let (width, height) = (w.width, w.height);

        let handle = SurfaceHandle::from_raw(self.mint());
        self.surfaces.insert(
            handle,
            SoftSurface {
                window,
                config,
                width,
                height,
                back: vec![0; (width as usize) * (height as usize) * 4],
                pending_pts: None,
            },
        );
        if let Some(w) = self.windows.get_mut(&window) {
            w.surface = Some(handle);
        }
        Ok(handle)
    }

    fn destroy_surface(
        &mut self,
        display: DisplayHandle,
        surface: SurfaceHandle,
    ) -> Result<(), PlatformError> {
        self.check_display(display)?;
        self.take_fault(SoftOp::DestroySurface)?;
        let s = self
            .surfaces
            .remove(&surface)
            .ok_or(PlatformError::BadSurface)?;
        if let Some(w) = self.windows.get_mut(&s.window) {
            w.surface = None;
        }
        let stale: Vec<ThreadId> = self
            .bindings
            .iter()
            .filter(|(_, (bound, _))| *bound == surface)
            .map(|(t, _)| *t)
            .collect();
        for t in stale {
            self.unbind_thread(t);
        }
        Ok(())
    }

    fn make_current(
        &mut self,
        display: DisplayHandle,
        binding: Option<(SurfaceHandle, ContextHandle)>,
    ) -> Result<(), PlatformError> {
        self.check_display(display)?;
        self.take_fault(SoftOp::MakeCurrent)?;
        let me = thread::current().id();

        let Some((surface, context)) = binding else {
            self.unbind_thread(me);
            return Ok(());
        };

        let ctx = self.contexts.get(&context).ok_or(PlatformError::BadContext)?;
        let surf = self.surfaces.get(&surface).ok_or(PlatformError::BadSurface)?;
        if ctx.config != surf.config {
            return Err(PlatformError::BadMatch);
        }
        if ctx.current_on.is_some_and(|t| t != me) {
            return Err(PlatformError::BadAccess);
        }
        if self
            .bindings
            .iter()
            .any(|(t, (s, _))| *t != me && *s == surface)
        {
            return Err(PlatformError::BadAccess);
        }

        self.unbind_thread(me);
        self.bindings.insert(me, (surface, context));
        if let Some(c) = self.contexts.get_mut(&context) {
            c.current_on = Some(me);
        }
        Ok(())
    }

    fn presentation_time_ext(&mut self) -> Option<PresentationTimeExt> {
        self.opts
            .presentation_time_ext
            .then(|| PresentationTimeExt::resolved(PRESENTATION_TIME_ENTRY_POINT))
    }

    fn set_presentation_time(
        &mut self,
        ext: &PresentationTimeExt,
        display: DisplayHandle,
        surface: SurfaceHandle,
        nanos: u64,
    ) -> Result<(), PlatformError> {
        self.check_display(display)?;
        if !self.opts.presentation_time_ext || ext.name() != PRESENTATION_TIME_ENTRY_POINT {
            return Err(PlatformError::BadParameter);
        }
        let s = self
            .surfaces
            .get_mut(&surface)
            .ok_or(PlatformError::BadSurface)?;
        s.pending_pts = Some(nanos);
        Ok(())
    }

    fn swap_buffers(
        &mut self,
        display: DisplayHandle,
        surface: SurfaceHandle,
    ) -> Result<(), PlatformError> {
        self.check_display(display)?;
        self.take_fault(SoftOp::SwapBuffers)?;
        let bound = self
            .bindings
            .get(&thread::current().id())
            .map(|(s, _)| *s);
        if bound != Some(surface) {
            return Err(PlatformError::BadSurface);
        }

        let s = self
            .surfaces
            .get_mut(&surface)
            .ok_or(PlatformError::BadSurface)?;
        let frame = Bitmap::from_premul(s.width, s.height, s.back.clone())
            .map_err(|_| PlatformError::BadAlloc)?;
        let timestamp_ns = s.pending_pts.take();

        let max = self.opts.max_queued_buffers.max(1);
        let w = self
            .windows
            .get_mut(&s.window)
            .filter(|w| !w.released)
            .ok_or(PlatformError::BadNativeWindow)?;
        w.presented += 1;
        w.queue.push_back(PresentedBuffer {
            frame,
            timestamp_ns,
            sequence: w.presented,
        });
        while w.queue.len() > max {
            w.queue.pop_front();
            w.dropped += 1;
        }
        Ok(())
    }

    fn terminate(&mut self, display: DisplayHandle) -> Result<(), PlatformError> {
        if display != self.display || !self.opts.has_display {
            return Err(PlatformError::BadDisplay);
        }
        self.take_fault(SoftOp::Terminate)?;
        if !self.initialized {
            return Ok(());
        }
        self.bindings.clear();
        self.contexts.clear();
        self.share_groups.clear();
        self.surfaces.clear();
        for w in self.windows.values_mut() {
            w.surface = None;
        }
        self.initialized = false;
        Ok(())
    }

    fn release_thread(&mut self) -> Result<(), PlatformError> {
        self.take_fault(SoftOp::ReleaseThread)?;
        self.unbind_thread(thread::current().id());
        Ok(())
    }

    fn release_window(&mut self, window: NativeWindow) -> Result<(), PlatformError> {
        self.take_fault(SoftOp::ReleaseWindow)?;
        let w = self
            .windows
            .get_mut(&window)
            .filter(|w| !w.released)
            .ok_or(PlatformError::BadNativeWindow)?;
        w.released = true;
        Ok(())
    }
}

impl GpuCommands for SoftPlatform {
    fn create_texture(
        &mut self,
        context: ContextHandle,
        pixels: &Bitmap,
    ) -> Result<TextureId, PlatformError> {
        let (group_id, _) = self.current_target(context)?;
        self.take_fault(SoftOp::CreateTexture)?;
        let group = self
            .share_groups
            .get_mut(&group_id)
            .ok_or(PlatformError::BadContext)?;
        group.next_texture += 1;
        let id = TextureId(group.next_texture);
        group.textures.insert(id, pixels.clone());
        self.texture_uploads += 1;
        Ok(id)
    }

    fn update_texture(
        &mut self,
        context: ContextHandle,
        texture: TextureId,
        pixels: &Bitmap,
    ) -> Result<(), PlatformError> {
        let (group_id, _) = self.current_target(context)?;
        let slot = self
            .share_groups
            .get_mut(&group_id)
            .and_then(|g| g.textures.get_mut(&texture))
            .ok_or(PlatformError::BadTexture)?;
        *slot = pixels.clone();
        self.texture_uploads += 1;
        Ok(())
    }

    fn delete_texture(
        &mut self,
        context: ContextHandle,
        texture: TextureId,
    ) -> Result<(), PlatformError> {
        let (group_id, _) = self.current_target(context)?;
        self.share_groups
            .get_mut(&group_id)
            .and_then(|g| g.textures.remove(&texture))
            .map(|_| ())
            .ok_or(PlatformError::BadTexture)
    }

    fn clear(
        &mut self,
        context: ContextHandle,
        rgba_premul: [u8; 4],
    ) -> Result<(), PlatformError> {
        let (_, surface) = self.current_target(context)?;
        let s = self
            .surfaces
            .get_mut(&surface)
            .ok_or(PlatformError::BadSurface)?;
        raster::Target {
            width: s.width,
            height: s.height,
            data: &mut s.back,
        }
        .clear(rgba_premul);
        Ok(())
    }

    fn draw_quad(
        &mut self,
        context: ContextHandle,
        quad: &TexturedQuad,
    ) -> Result<(), PlatformError> {
        let (group_id, surface) = self.current_target(context)?;
        let texture = self
            .share_groups
            .get(&group_id)
            .and_then(|g| g.textures.get(&quad.texture))
            .ok_or(PlatformError::BadTexture)?;
        let s = self
            .surfaces
            .get_mut(&surface)
            .ok_or(PlatformError::BadSurface)?;
        let mut target = raster::Target {
            width: s.width,
            height: s.height,
            data: &mut s.back,
        };
        raster::draw_quad(&mut target, texture, quad);
        self.draw_calls += 1;
        Ok(())
    }

    fn draw_mix_quad(
        &mut self,
        context: ContextHandle,
        quad: &MixQuad,
    ) -> Result<(), PlatformError> {
        let (group_id, surface) = self.current_target(context)?;
        let texture = self
            .share_groups
            .get(&group_id)
            .and_then(|g| g.textures.get(&quad.texture))
            .ok_or(PlatformError::BadTexture)?;
        let s = self
            .surfaces
            .get_mut(&surface)
            .ok_or(PlatformError::BadSurface)?;
        let mut target = raster::Target {
            width: s.width,
            height: s.height,
            data: &mut s.back,
        };
        raster::draw_mix_quad(&mut target, texture, quad);
        self.draw_calls += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/gpu/soft.rs"]
mod tests;
