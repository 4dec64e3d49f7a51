use std::str::FromStr;

use crate::assets::bitmap::Bitmap;
use crate::foundation::core::{Canvas, Fps, PixelRect};
use crate::foundation::error::{EvaError, EvaResult};
use crate::foundation::math::channel_spread;
use crate::scene::model::{DescriptorData, MixRegions, SceneDescriptor};

/// Packing layout of a video that ships without a descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoMode {
    /// Ordinary video; every pixel is color and fully opaque.
    Plain,
    /// Alpha mask on the left half, color on the right half.
    #[default]
    SplitHorizontal,
    /// Alpha mask on the top half, color on the bottom half.
    SplitVertical,
    /// Color on the left half, alpha mask on the right half.
    SplitHorizontalReverse,
    /// Color on the top half, alpha mask on the bottom half.
    SplitVerticalReverse,
}

impl VideoMode {
    /// All modes, in a stable order.
    pub const ALL: [VideoMode; 5] = [
        VideoMode::Plain,
        VideoMode::SplitHorizontal,
        VideoMode::SplitVertical,
        VideoMode::SplitHorizontalReverse,
        VideoMode::SplitVerticalReverse,
    ];

    /// Stable kebab-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::SplitHorizontal => "split-horizontal",
            Self::SplitVertical => "split-vertical",
            Self::SplitHorizontalReverse => "split-horizontal-reverse",
            Self::SplitVerticalReverse => "split-vertical-reverse",
        }
    }

    /// Mix regions this layout implies for a `video`-sized frame.
    ///
    /// Odd dimensions drop the last column/row so both halves have equal size.
    pub fn mix_regions(self, video: Canvas) -> Option<MixRegions> {
        let (hw, hh) = (video.width / 2, video.height / 2);
        let (w, h) = (video.width, video.height);
        let (alpha, rgb) = match self {
            Self::Plain => return None,
            Self::SplitHorizontal => (PixelRect::new(0, 0, hw, h), PixelRect::new(hw, 0, hw, h)),
            Self::SplitVertical => (PixelRect::new(0, 0, w, hh), PixelRect::new(0, hh, w, hh)),
            Self::SplitHorizontalReverse => {
                (PixelRect::new(hw, 0, hw, h), PixelRect::new(0, 0, hw, h))
            }
            Self::SplitVerticalReverse => {
                (PixelRect::new(0, hh, w, hh), PixelRect::new(0, 0, w, hh))
            }
        };
        Some(MixRegions { alpha, rgb })
    }
}

impl std::fmt::Display for VideoMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoMode {
    type Err = EvaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| EvaError::validation(format!("unknown video mode '{s}'")))
    }
}

impl SceneDescriptor {
    /// Minimal descriptor for a video that ships without one.
    ///
    /// The canvas takes the video dimensions and the effect list is empty, so the renderer always
    /// has a valid scene. Split modes also set the matching mix regions.
    pub fn default_config(
        video_width: u32,
        video_height: u32,
        mode: VideoMode,
        fps: Fps,
    ) -> EvaResult<Self> {
        let video = Canvas::new(video_width, video_height);
        let data = DescriptorData {
            canvas: video,
            native_video: video,
            fps: Some(fps),
            sources: Vec::new(),
            effects: Vec::new(),
            data_bindings: Vec::new(),
            mix: mode.mix_regions(video),
        };
        Self::build(data, fps, true)
    }
}

const GRAY_SPREAD_MAX: u8 = 10;
const MIDLINE_INSET: u32 = 3;

/// Guess the packing layout of a decoded video frame.
///
/// Each quadrant is probed on a 3x3 grid plus points just inside the center lines; a quadrant is
/// gray when every probe has channel spread <= 10. Returns `None` when the gray/color pattern does
/// not match any known layout, or the frame is too small to probe.
pub fn detect_video_mode(frame: &Bitmap) -> Option<VideoMode> {
    let (w, h) = (frame.width(), frame.height());
    if w < 16 || h < 16 {
        return None;
    }
    let (mx, my) = (w / 2, h / 2);

    let lt = quadrant_is_gray(frame, 0, 0);
    let rt = quadrant_is_gray(frame, mx, 0);
    let lb = quadrant_is_gray(frame, 0, my);
    let rb = quadrant_is_gray(frame, mx, my);
    tracing::debug!(lt, rt, lb, rb, "video mode probe");

    match (lt, rt, lb, rb) {
        (false, false, false, false) => Some(VideoMode::Plain),
        (true, false, true, false) => Some(VideoMode::SplitHorizontal),
        (false, true, false, true) => Some(VideoMode::SplitHorizontalReverse),
        (true, true, false, false) => Some(VideoMode::SplitVertical),
        (false, false, true, true) => Some(VideoMode::SplitVerticalReverse),
        _ => None,
    }
}

fn quadrant_is_gray(frame: &Bitmap, x0: u32, y0: u32) -> bool {
    let (w, h) = (frame.width(), frame.height());
    let (mx, my) = (w / 2, h / 2);
    let (sx, sy) = (w / 8, h / 8);
    let left = x0 < mx;
    let top = y0 < my;

    let near_mid_y = if top { my - MIDLINE_INSET } else { my + MIDLINE_INSET };
    let near_mid_x = if left { mx - MIDLINE_INSET } else { mx + MIDLINE_INSET };

    let mut probes = Vec::with_capacity(16);
    for j in 1..=3 {
        for i in 1..=3 {
            probes.push((x0 + sx * i, y0 + sy * j));
        }
    }
    for i in 1..=3 {
        probes.push((x0 + sx * i, near_mid_y));
    }
    for j in 1..=3 {
        probes.push((near_mid_x, y0 + sy * j));
    }
    probes.push((near_mid_x, near_mid_y));

    probes.into_iter().all(|(x, y)| {
        let [r, g, b, _] = frame.pixel(x.min(w - 1), y.min(h - 1));
        channel_spread(r, g, b) <= GRAY_SPREAD_MAX
    })
}

#[cfg(test)]
#[path = "../../tests/unit/scene/defaults.rs"]
mod tests;
