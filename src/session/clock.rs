use crate::foundation::core::{Fps, FrameIndex};
use crate::render::compositor::FrameTime;

/// Maps media time to the frame shown at that time.
pub trait PlaybackClock: Send {
    /// Frame on screen at `position_ns`, stamped with that media time.
    fn frame_at(&self, position_ns: u64) -> FrameTime;

    /// First media time at which `frame` is shown.
    fn start_of(&self, frame: FrameIndex) -> u64;
}

/// Constant frame rate clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedRateClock {
    fps: Fps,
}

impl FixedRateClock {
    /// Clock ticking at `fps`.
    pub fn new(fps: Fps) -> Self {
        Self { fps }
    }

    /// Frame rate.
    pub fn fps(&self) -> Fps {
        self.fps
    }
}

impl PlaybackClock for FixedRateClock {
    fn frame_at(&self, position_ns: u64) -> FrameTime {
        FrameTime {
            index: self.fps.nanos_to_frame(position_ns),
            pts_ns: position_ns,
        }
    }

    fn start_of(&self, frame: FrameIndex) -> u64 {
        // Ceiling, so that frame_at(start_of(f)) == f.
        let num = u128::from(self.fps.num);
        let n = u128::from(frame.0) * u128::from(self.fps.den) * 1_000_000_000u128;
        n.div_ceil(num).min(u128::from(u64::MAX)) as u64
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/clock.rs"]
mod tests;
