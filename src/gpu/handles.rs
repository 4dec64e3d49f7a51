macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw platform value.
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Raw platform value.
            pub fn as_raw(self) -> u64 {
                self.0
            }
        }
    };
}

opaque_handle!(
    /// Connection to a native display.
    DisplayHandle
);
opaque_handle!(
    /// One framebuffer configuration offered by a display.
    ConfigHandle
);
opaque_handle!(
    /// Rendering context.
    ContextHandle
);
opaque_handle!(
    /// Window-backed drawing surface.
    SurfaceHandle
);
opaque_handle!(
    /// Native window or encoder input surface, borrowed from the window provider.
    NativeWindow
);

/// GPU texture name. `0` means "not uploaded".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u32);

impl TextureId {
    /// The unset texture name.
    pub const NONE: TextureId = TextureId(0);

    /// `true` for a live texture name.
    pub fn is_set(self) -> bool {
        self.0 != 0
    }
}

/// Version reported by display initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DriverVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

/// Which of the two output surfaces a context drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OutputTarget {
    /// Primary context bound to the live window.
    Display,
    /// Secondary, shared context bound to the encoder input surface.
    Encoder,
}

impl std::fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Display => f.write_str("display"),
            Self::Encoder => f.write_str("encoder"),
        }
    }
}

/// Lifecycle of one context slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ContextState {
    /// Nothing created yet.
    #[default]
    Uninitialized,
    /// Context and surface exist but are not bound to the calling thread.
    Configured,
    /// Bound to the calling thread.
    Current,
    /// Torn down.
    Released,
}
