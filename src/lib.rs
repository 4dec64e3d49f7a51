//! evaframe renders animated overlays on top of a backing video.
//!
//! A [`SceneDescriptor`] lists image and text sources and the effects that place them on a
//! canvas over frame ranges. A [`RenderSession`] owns the descriptor, the [`SourceRegistry`]
//! holding the decoded inputs, and a [`SurfaceManager`] driving two output targets:
//!
//! - the display surface, for live preview
//! - the encoder surface, sharing the display context's textures, for capture with
//!   presentation timestamps
//!
//! The backing video may pack an alpha mask next to its color ([`VideoMode`]); the compositor
//! rebuilds the alpha channel from the mask's luminance.
//!
//! GPU access goes through the [`GpuPlatform`] traits. [`SoftPlatform`] implements them in
//! software and backs the CLI and the tests.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;
mod gpu;
mod render;
mod scene;
mod session;

pub use crate::foundation::core::{
    Affine, Canvas, Fps, FrameIndex, FrameRange, PixelRect, Point, Rect, Rgba8Premul, Transform2D,
    Vec2,
};
pub use crate::foundation::error::{EvaError, EvaResult, SurfaceFailure};

pub use crate::assets::bitmap::Bitmap;
pub use crate::assets::decode::{
    decode_image, decode_image_file, decode_video_frame_file, write_png,
};
pub use crate::assets::registry::{SourceRegistry, VideoFrame, VideoTexture};
pub use crate::assets::source::{
    ImageContent, Source, SourceContent, TextContent, TextRasterizer, parse_hex_color,
};

pub use crate::gpu::config::{ConfigDesc, ConfigProfile, RenderableApi, SurfaceKind};
pub use crate::gpu::handles::{
    ConfigHandle, ContextHandle, ContextState, DisplayHandle, DriverVersion, NativeWindow,
    OutputTarget, SurfaceHandle, TextureId,
};
pub use crate::gpu::platform::{
    DisplayApi, GpuCommands, GpuPlatform, MixQuad, PlatformError, PresentationTimeExt,
    TexturedQuad,
};
pub use crate::gpu::soft::{
    FORMAT_RGB_565, FORMAT_RGBA_8888, PresentedBuffer, SoftOp, SoftPlatform, SoftPlatformOpts,
    default_configs,
};
pub use crate::gpu::surface_manager::{
    CurrentContext, DisplayInfo, PresentOutcome, SurfaceManager, SurfaceManagerOpts,
};
pub use crate::gpu::teardown::{TeardownReport, TeardownStep};

pub use crate::render::compositor::{
    CompositorOpts, FrameCompositor, FrameReport, FrameTime, SkippedEffect,
};
pub use crate::render::geometry::{Placement, fit_source};

pub use crate::scene::defaults::{VideoMode, detect_video_mode};
pub use crate::scene::embedded::{descriptor_from_embedded, embedded_descriptor_json};
pub use crate::scene::model::{
    BindingValue, DEFAULT_FPS, DataBinding, DescriptorData, Effect, FitMode, LoadOrigin,
    MixRegions, SceneDescriptor, SourceKindSpec, SourceSpec, TextSpec, TextStyle,
};
pub use crate::scene::timeline::{ActiveEffects, EffectRef};

pub use crate::session::clock::{FixedRateClock, PlaybackClock};
pub use crate::session::render_session::{ModeSelection, RenderSession, RenderStats, SessionOpts};
