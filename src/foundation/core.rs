use crate::foundation::error::{EvaError, EvaResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
/// Zero-based animation frame index.
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Half-open frame range `[start, end)`.
pub struct FrameRange {
    /// First frame included in the range.
    pub start: FrameIndex,
    /// First frame past the range.
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> EvaResult<Self> {
        if start.0 > end.0 {
            return Err(EvaError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames covered.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// `true` when the range covers no frame.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// `start <= f < end`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Rational frame rate.
pub struct Fps {
    /// Numerator.
    pub num: u32,
    /// Denominator, must be > 0.
    pub den: u32,
}

impl Fps {
    /// Build a frame rate, rejecting zero parts.
    pub fn new(num: u32, den: u32) -> EvaResult<Self> {
        if den == 0 {
            return Err(EvaError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(EvaError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Presentation time of frame `frame` in nanoseconds.
    pub fn frame_to_nanos(self, frame: FrameIndex) -> u64 {
        let n = u128::from(frame.0) * u128::from(self.den) * 1_000_000_000u128;
        (n / u128::from(self.num)).min(u128::from(u64::MAX)) as u64
    }

    /// Frame shown at media time `nanos` (floor).
    pub fn nanos_to_frame(self, nanos: u64) -> FrameIndex {
        let n = u128::from(nanos) * u128::from(self.num);
        let d = u128::from(self.den) * 1_000_000_000u128;
        FrameIndex((n / d).min(u128::from(u64::MAX)) as u64)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Pixel dimensions of an output or video stream.
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Convenience constructor.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` when both sides are non-zero.
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Full canvas as a float rectangle.
    pub fn to_rect(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
/// Integer rectangle `(x, y, w, h)` in pixel space.
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl PixelRect {
    /// Convenience constructor.
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge.
    pub fn right(self) -> u64 {
        u64::from(self.x) + u64::from(self.w)
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> u64 {
        u64::from(self.y) + u64::from(self.h)
    }

    /// `true` when either side is zero.
    pub fn is_empty(self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// `true` when both rectangles have the same width and height.
    pub fn same_size(self, other: Self) -> bool {
        self.w == other.w && self.h == other.h
    }

    /// `true` when the rectangle lies fully inside `[0, bounds.width) x [0, bounds.height)`.
    pub fn fits_within(self, bounds: Canvas) -> bool {
        !self.is_empty()
            && self.right() <= u64::from(bounds.width)
            && self.bottom() <= u64::from(bounds.height)
    }

    /// `true` when the two rectangles share at least one pixel.
    pub fn overlaps(self, other: Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        u64::from(self.x) < other.right()
            && u64::from(other.x) < self.right()
            && u64::from(self.y) < other.bottom()
            && u64::from(other.y) < self.bottom()
    }

    /// Float rectangle covering the same pixels.
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            self.right() as f64,
            self.bottom() as f64,
        )
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Premultiply a straight-alpha color.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Channels as an array, in RGBA order.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// 2D placement applied to an effect's destination rectangle.
pub struct Transform2D {
    /// Translation in canvas pixels.
    pub translate: Vec2,
    /// Rotation in radians around `anchor`.
    pub rotation_rad: f64,
    /// Scale around `anchor`.
    pub scale: Vec2, // default (1,1)
    /// Pivot relative to the destination rectangle's top-left corner.
    pub anchor: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            rotation_rad: 0.0,
            scale: Vec2::new(1.0, 1.0),
            anchor: Vec2::ZERO,
        }
    }
}

impl Transform2D {
    /// `true` for the default transform.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Affine matrix in canvas space for a destination rectangle whose top-left is `origin`.
    pub fn to_affine_at(self, origin: Point) -> Affine {
        let pivot = origin.to_vec2() + self.anchor;
        let t_translate = Affine::translate(self.translate);
        let t_anchor = Affine::translate(pivot);
        let t_unanchor = Affine::translate(-pivot);
        let t_rotate = Affine::rotate(self.rotation_rad);
        let t_scale = Affine::scale_non_uniform(self.scale.x, self.scale.y);

        // T(translate) * T(pivot) * R(rot) * S(scale) * T(-pivot)
        t_translate * t_anchor * t_rotate * t_scale * t_unanchor
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
