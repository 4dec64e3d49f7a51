use crate::assets::bitmap::Bitmap;
use crate::foundation::core::{Affine, Rect, Vec2};
use crate::foundation::error::SurfaceFailure;
use crate::gpu::config::ConfigProfile;
use crate::gpu::handles::{
    ConfigHandle, ContextHandle, DisplayHandle, DriverVersion, NativeWindow, SurfaceHandle,
    TextureId,
};

/// Error codes reported by the display and GPU command layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum PlatformError {
    /// Display not initialized, or already terminated.
    #[error("display not initialized")]
    NotInitialized,
    /// Resource is bound to another thread.
    #[error("resource is in use by another thread")]
    BadAccess,
    /// Out of resources.
    #[error("allocation failed")]
    BadAlloc,
    /// Unsupported attribute value.
    #[error("bad attribute")]
    BadAttribute,
    /// Unknown config handle.
    #[error("bad config")]
    BadConfig,
    /// Unknown context handle.
    #[error("bad context")]
    BadContext,
    /// No valid current surface.
    #[error("bad current surface")]
    BadCurrentSurface,
    /// Unknown display handle.
    #[error("bad display")]
    BadDisplay,
    /// Arguments are individually valid but inconsistent.
    #[error("bad match")]
    BadMatch,
    /// Native window is invalid or already released.
    #[error("bad native window")]
    BadNativeWindow,
    /// Invalid parameter value.
    #[error("bad parameter")]
    BadParameter,
    /// Unknown surface handle.
    #[error("bad surface")]
    BadSurface,
    /// Unknown texture name in the current share group.
    #[error("bad texture")]
    BadTexture,
    /// Context was lost; all GPU objects are gone.
    #[error("context lost")]
    ContextLost,
}

impl PlatformError {
    /// Numeric code in the display API's error range.
    pub fn code(self) -> u32 {
        match self {
            Self::NotInitialized => 0x3001,
            Self::BadAccess => 0x3002,
            Self::BadAlloc => 0x3003,
            Self::BadAttribute => 0x3004,
            Self::BadConfig => 0x3005,
            Self::BadContext => 0x3006,
            Self::BadCurrentSurface => 0x3007,
            Self::BadDisplay => 0x3008,
            Self::BadMatch => 0x3009,
            Self::BadNativeWindow => 0x300B,
            Self::BadParameter => 0x300C,
            Self::BadSurface => 0x300D,
            Self::ContextLost => 0x300E,
            Self::BadTexture => 0x0501,
        }
    }

    /// Map a window-surface creation error onto the distinguished failure reasons.
    pub fn surface_failure(self) -> SurfaceFailure {
        match self {
            Self::BadAlloc => SurfaceFailure::OutOfResources,
            Self::BadConfig => SurfaceFailure::InvalidConfig,
            Self::BadParameter => SurfaceFailure::InvalidDimensions,
            Self::BadMatch => SurfaceFailure::WindowConfigMismatch,
            other => SurfaceFailure::Other(other.code()),
        }
    }
}

/// Resolved presentation-time entry point.
///
/// Only obtainable from [`DisplayApi::presentation_time_ext`]; holding one means timestamps can
/// be attached to presented buffers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresentationTimeExt {
    name: &'static str,
}

impl PresentationTimeExt {
    /// Wrap a resolved entry point name. Platform implementations call this once resolution
    /// succeeded.
    pub fn resolved(name: &'static str) -> Self {
        Self { name }
    }

    /// Entry point name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Display, config, context and surface management.
///
/// Mirrors a native display API: every call is explicit about the display it acts on, and
/// current-context binding is per calling thread.
pub trait DisplayApi {
    /// Default display connection, if the platform has one.
    fn default_display(&mut self) -> Option<DisplayHandle>;

    /// Initialize `display`, returning the driver version.
    fn initialize(&mut self, display: DisplayHandle) -> Result<DriverVersion, PlatformError>;

    /// Every config satisfying `profile`, best match first.
    fn choose_configs(
        &mut self,
        display: DisplayHandle,
        profile: &ConfigProfile,
    ) -> Result<Vec<ConfigHandle>, PlatformError>;

    /// Native pixel format windows must use with `config`.
    fn native_visual_id(
        &self,
        display: DisplayHandle,
        config: ConfigHandle,
    ) -> Result<i32, PlatformError>;

    /// Create a context, sharing objects with `share` when given.
    fn create_context(
        &mut self,
        display: DisplayHandle,
        config: ConfigHandle,
        share: Option<ContextHandle>,
        client_version: u32,
    ) -> Result<ContextHandle, PlatformError>;

    /// Destroy a context; it is unbound from every thread.
    fn destroy_context(
        &mut self,
        display: DisplayHandle,
        context: ContextHandle,
    ) -> Result<(), PlatformError>;

    /// Set the window's buffer pixel format ahead of surface creation.
    fn set_buffers_geometry(
        &mut self,
        window: NativeWindow,
        format: i32,
    ) -> Result<(), PlatformError>;

    /// Create a surface drawing into `window`.
    fn create_window_surface(
        &mut self,
        display: DisplayHandle,
        config: ConfigHandle,
        window: NativeWindow,
    ) -> Result<SurfaceHandle, PlatformError>;

    /// Destroy a surface; contexts bound to it are unbound.
    fn destroy_surface(
        &mut self,
        display: DisplayHandle,
        surface: SurfaceHandle,
    ) -> Result<(), PlatformError>;

    /// Bind `(surface, context)` to the calling thread, or unbind with `None`.
    fn make_current(
        &mut self,
        display: DisplayHandle,
        binding: Option<(SurfaceHandle, ContextHandle)>,
    ) -> Result<(), PlatformError>;

    /// Resolve the presentation-time extension.
    fn presentation_time_ext(&mut self) -> Option<PresentationTimeExt>;

    /// Attach a timestamp to the next buffer `surface` presents.
    fn set_presentation_time(
        &mut self,
        ext: &PresentationTimeExt,
        display: DisplayHandle,
        surface: SurfaceHandle,
        nanos: u64,
    ) -> Result<(), PlatformError>;

    /// Hand the back buffer to the window's consumer.
    fn swap_buffers(
        &mut self,
        display: DisplayHandle,
        surface: SurfaceHandle,
    ) -> Result<(), PlatformError>;

    /// Destroy every object of `display` and mark it uninitialized.
    fn terminate(&mut self, display: DisplayHandle) -> Result<(), PlatformError>;

    /// Drop per-thread state for the calling thread.
    fn release_thread(&mut self) -> Result<(), PlatformError>;

    /// Give the window back to its provider.
    fn release_window(&mut self, window: NativeWindow) -> Result<(), PlatformError>;
}

/// Textured quad in canvas space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TexturedQuad {
    /// Texture to sample.
    pub texture: TextureId,
    /// Sampled sub-rectangle, in texels.
    pub src: Rect,
    /// Destination rectangle before `transform`.
    pub dest: Rect,
    /// Applied to `dest`.
    pub transform: Affine,
    /// Multiplies the sampled color.
    pub opacity: f32,
}

/// Quad whose color and alpha come from two regions of one texture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixQuad {
    /// Packed video texture.
    pub texture: TextureId,
    /// Sampled sub-rectangle of the color region, in texels.
    pub rgb_src: Rect,
    /// Alpha texel = color texel + this offset.
    pub alpha_offset: Vec2,
    /// Destination rectangle before `transform`.
    pub dest: Rect,
    /// Applied to `dest`.
    pub transform: Affine,
}

/// Commands issued against the context current on the calling thread.
///
/// Every call names the context it expects to be current; a mismatch is an error rather than
/// a silent draw into the wrong surface.
pub trait GpuCommands {
    /// Upload premultiplied pixels into a new texture in the context's share group.
    fn create_texture(
        &mut self,
        context: ContextHandle,
        pixels: &Bitmap,
    ) -> Result<TextureId, PlatformError>;

    /// Replace the contents of `texture`; dimensions may change.
    fn update_texture(
        &mut self,
        context: ContextHandle,
        texture: TextureId,
        pixels: &Bitmap,
    ) -> Result<(), PlatformError>;

    /// Delete `texture` from the context's share group.
    fn delete_texture(
        &mut self,
        context: ContextHandle,
        texture: TextureId,
    ) -> Result<(), PlatformError>;

    /// Fill the bound surface with one premultiplied color.
    fn clear(&mut self, context: ContextHandle, rgba_premul: [u8; 4])
    -> Result<(), PlatformError>;

    /// Source-over draw of a textured quad into the bound surface.
    fn draw_quad(&mut self, context: ContextHandle, quad: &TexturedQuad)
    -> Result<(), PlatformError>;

    /// Source-over draw of a packed color/alpha quad into the bound surface.
    fn draw_mix_quad(&mut self, context: ContextHandle, quad: &MixQuad)
    -> Result<(), PlatformError>;
}

/// Everything the surface manager and compositor need from a platform.
pub trait GpuPlatform: DisplayApi + GpuCommands {}

impl<T: DisplayApi + GpuCommands> GpuPlatform for T {}

#[cfg(test)]
#[path = "../../tests/unit/gpu/platform.rs"]
mod tests;
