use crate::foundation::error::EvaError;
use crate::gpu::handles::OutputTarget;
use crate::gpu::platform::PlatformError;

/// One independently attempted teardown action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TeardownStep {
    /// Unbind whatever is current on the calling thread.
    UnbindCurrent,
    /// Destroy the surface of a target.
    DestroySurface(OutputTarget),
    /// Destroy the context of a target.
    DestroyContext(OutputTarget),
    /// Destroy a context that never got a surface.
    DestroyOrphanContext,
    /// Terminate the display connection.
    TerminateDisplay,
    /// Drop the calling thread's per-thread state.
    ReleaseThread,
    /// Give a window back to its provider.
    ReleaseWindow(OutputTarget),
}

impl std::fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnbindCurrent => f.write_str("unbind current"),
            Self::DestroySurface(t) => write!(f, "destroy {t} surface"),
            Self::DestroyContext(t) => write!(f, "destroy {t} context"),
            Self::DestroyOrphanContext => f.write_str("destroy orphan context"),
            Self::TerminateDisplay => f.write_str("terminate display"),
            Self::ReleaseThread => f.write_str("release thread"),
            Self::ReleaseWindow(t) => write!(f, "release {t} window"),
        }
    }
}

/// Outcome of a teardown run.
///
/// Every planned step is attempted; failures are collected rather than stopping the run.
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Steps in the order they ran.
    pub attempted: Vec<TeardownStep>,
    /// One `TeardownStepFailed` per failed step.
    pub failures: Vec<EvaError>,
}

impl TeardownReport {
    /// `true` when no step failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// `true` when nothing was left to tear down.
    pub fn is_noop(&self) -> bool {
        self.attempted.is_empty()
    }
}

/// Run `steps` in order, attempting each regardless of earlier failures.
pub(crate) fn run_steps(
    steps: &[TeardownStep],
    mut exec: impl FnMut(TeardownStep) -> Result<(), PlatformError>,
) -> TeardownReport {
    let mut report = TeardownReport::default();
    for &step in steps {
        report.attempted.push(step);
        match exec(step) {
            Ok(()) => tracing::debug!(%step, "teardown step done"),
            Err(err) => {
                tracing::warn!(%step, %err, "teardown step failed");
                report.failures.push(EvaError::TeardownStepFailed {
                    step: step.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }
    report
}

#[cfg(test)]
#[path = "../../tests/unit/gpu/teardown.rs"]
mod tests;
