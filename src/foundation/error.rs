/// Convenience result type used across evaframe.
pub type EvaResult<T> = Result<T, EvaError>;

/// Why a window surface could not be created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SurfaceFailure {
    /// The platform ran out of resources for another surface.
    OutOfResources,
    /// The config handle is not valid for this display.
    InvalidConfig,
    /// The window reports unusable dimensions.
    InvalidDimensions,
    /// Window pixel format and config attributes disagree.
    WindowConfigMismatch,
    /// Any other platform error code.
    Other(u32),
}

impl std::fmt::Display for SurfaceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfResources => f.write_str("not enough resources available"),
            Self::InvalidConfig => f.write_str("provided config is invalid"),
            Self::InvalidDimensions => f.write_str("window width/height is invalid"),
            Self::WindowConfigMismatch => f.write_str("window and config attributes do not match"),
            Self::Other(code) => write!(f, "platform error 0x{code:04x}"),
        }
    }
}

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum EvaError {
    /// No display connection, or it failed to initialize.
    #[error("display unavailable: {0}")]
    DisplayUnavailable(String),

    /// No framebuffer configuration satisfies the requested profile.
    #[error("no matching config: {0}")]
    NoMatchingConfig(String),

    /// Rendering context could not be created.
    #[error("context creation failed: {0}")]
    ContextCreationFailed(String),

    /// Window surface could not be created.
    #[error("surface creation failed: {reason}")]
    SurfaceCreationFailed {
        /// Distinguished platform cause.
        reason: SurfaceFailure,
    },

    /// Binding a context and surface to the calling thread failed.
    #[error("make current failed: {0}")]
    MakeCurrentFailed(String),

    /// Alpha/RGB regions of a mix-mode descriptor are unusable.
    #[error("invalid mix regions: {0}")]
    InvalidMixRegions(String),

    /// A source could not be turned into a texture this frame.
    #[error("source '{source_id}' could not be resolved: {reason}")]
    SourceResolutionFailed {
        /// Offending source id.
        source_id: String,
        /// Human readable cause.
        reason: String,
    },

    /// A single teardown step failed; teardown continued.
    #[error("teardown step '{step}' failed: {reason}")]
    TeardownStepFailed {
        /// Step name.
        step: String,
        /// Platform cause.
        reason: String,
    },

    /// Invalid user-provided or descriptor data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A GPU command failed after setup.
    #[error("gpu error: {0}")]
    Gpu(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EvaError {
    /// Build a [`EvaError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`EvaError::InvalidMixRegions`] value.
    pub fn mix_regions(msg: impl Into<String>) -> Self {
        Self::InvalidMixRegions(msg.into())
    }

    /// Build a [`EvaError::Gpu`] value.
    pub fn gpu(msg: impl Into<String>) -> Self {
        Self::Gpu(msg.into())
    }

    /// Build a [`EvaError::SourceResolutionFailed`] value.
    pub fn source_resolution(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceResolutionFailed {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    /// `true` for conditions that only cost one effect or one frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SourceResolutionFailed { .. } | Self::TeardownStepFailed { .. }
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
