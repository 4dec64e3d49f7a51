/// Client API a config must be renderable with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RenderableApi {
    /// OpenGL ES 2.x.
    Gles2,
    /// OpenGL ES 3.x.
    Gles3,
}

impl RenderableApi {
    /// Highest client version a context may request on this API.
    pub fn max_client_version(self) -> u32 {
        match self {
            Self::Gles2 => 2,
            Self::Gles3 => 3,
        }
    }
}

/// Kind of drawable a config is requested for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SurfaceKind {
    /// On-screen window or encoder input surface.
    Window,
    /// Offscreen pixel buffer.
    Pbuffer,
}

/// Requirement set passed to config selection.
///
/// Channel, depth and stencil sizes are minimums. `None` for the renderable API leaves it
/// unconstrained.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfigProfile {
    /// Red bits.
    pub red: u8,
    /// Green bits.
    pub green: u8,
    /// Blue bits.
    pub blue: u8,
    /// Alpha bits.
    pub alpha: u8,
    /// Depth bits.
    pub depth: u8,
    /// Stencil bits.
    pub stencil: u8,
    /// Required client API.
    pub renderable: Option<RenderableApi>,
    /// Required drawable kind.
    pub surface: SurfaceKind,
    /// Buffers must be consumable by a video encoder.
    pub recordable: bool,
}

impl ConfigProfile {
    /// Live display: 8-8-8-8 color, no depth/stencil, GLES3 window surfaces.
    pub fn display() -> Self {
        Self {
            red: 8,
            green: 8,
            blue: 8,
            alpha: 8,
            depth: 0,
            stencil: 0,
            renderable: Some(RenderableApi::Gles3),
            surface: SurfaceKind::Window,
            recordable: false,
        }
    }

    /// Encoder input: the display profile plus the recordable flag.
    pub fn recordable() -> Self {
        Self {
            recordable: true,
            ..Self::display()
        }
    }

    /// Legacy low-color offscreen buffering: 5-6-5 color into a pbuffer.
    pub fn low_color_offscreen() -> Self {
        Self {
            red: 5,
            green: 6,
            blue: 5,
            alpha: 0,
            depth: 0,
            stencil: 0,
            renderable: None,
            surface: SurfaceKind::Pbuffer,
            recordable: false,
        }
    }
}

/// Attributes of one config a display offers.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfigDesc {
    /// Red bits.
    pub red: u8,
    /// Green bits.
    pub green: u8,
    /// Blue bits.
    pub blue: u8,
    /// Alpha bits.
    pub alpha: u8,
    /// Depth bits.
    pub depth: u8,
    /// Stencil bits.
    pub stencil: u8,
    /// Client APIs contexts on this config may use.
    pub renderable: Vec<RenderableApi>,
    /// Drawable kinds this config supports.
    pub surfaces: Vec<SurfaceKind>,
    /// Encoder-consumable buffers.
    pub recordable: bool,
    /// Native pixel format windows must use with this config.
    pub native_visual: i32,
}

impl ConfigDesc {
    /// `true` when every requirement of `profile` is met.
    pub fn satisfies(&self, profile: &ConfigProfile) -> bool {
        self.red >= profile.red
            && self.green >= profile.green
            && self.blue >= profile.blue
            && self.alpha >= profile.alpha
            && self.depth >= profile.depth
            && self.stencil >= profile.stencil
            && profile
                .renderable
                .is_none_or(|api| self.renderable.contains(&api))
            && self.surfaces.contains(&profile.surface)
            && (!profile.recordable || self.recordable)
    }

    /// Bits beyond what `profile` asks for; lower sorts first.
    pub fn excess_bits(&self, profile: &ConfigProfile) -> u32 {
        let d = |have: u8, want: u8| u32::from(have.saturating_sub(want));
        d(self.red, profile.red)
            + d(self.green, profile.green)
            + d(self.blue, profile.blue)
            + d(self.alpha, profile.alpha)
            + d(self.depth, profile.depth)
            + d(self.stencil, profile.stencil)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/config.rs"]
mod tests;
