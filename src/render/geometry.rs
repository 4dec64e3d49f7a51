use crate::foundation::core::Rect;
use crate::scene::model::FitMode;

/// Where a source lands: the sampled source rectangle (texels) and the destination rectangle
/// (canvas pixels) it is stretched onto.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Sampled region of the source.
    pub src: Rect,
    /// Destination region in the canvas.
    pub dest: Rect,
}

/// Map a `src_w` x `src_h` source into `rect` according to `fit`.
///
/// Returns `None` for degenerate sizes, which draw nothing.
pub fn fit_source(src_w: u32, src_h: u32, rect: Rect, fit: FitMode) -> Option<Placement> {
    let (sw, sh) = (f64::from(src_w), f64::from(src_h));
    let (rw, rh) = (rect.width(), rect.height());
    if sw <= 0.0 || sh <= 0.0 || rw <= 0.0 || rh <= 0.0 {
        return None;
    }
    let full = Rect::new(0.0, 0.0, sw, sh);

    let placement = match fit {
        FitMode::StretchToFill => Placement {
            src: full,
            dest: rect,
        },
        FitMode::CenterCoverCropped => {
            let scale = (rw / sw).max(rh / sh);
            let (vw, vh) = (rw / scale, rh / scale);
            let x0 = (sw - vw) / 2.0;
            let y0 = (sh - vh) / 2.0;
            Placement {
                src: Rect::new(x0, y0, x0 + vw, y0 + vh),
                dest: rect,
            }
        }
        FitMode::CenterFitContained => {
            let scale = (rw / sw).min(rh / sh);
            let (dw, dh) = (sw * scale, sh * scale);
            let x0 = rect.x0 + (rw - dw) / 2.0;
            let y0 = rect.y0 + (rh - dh) / 2.0;
            Placement {
                src: full,
                dest: Rect::new(x0, y0, x0 + dw, y0 + dh),
            }
        }
    };
    Some(placement)
}

#[cfg(test)]
#[path = "../../tests/unit/render/geometry.rs"]
mod tests;
