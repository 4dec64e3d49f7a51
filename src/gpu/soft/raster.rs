use crate::assets::bitmap::Bitmap;
use crate::foundation::core::{Affine, Point, Rect};
use crate::foundation::math::{luma_u8, mul_div255_u8};
use crate::gpu::platform::{MixQuad, TexturedQuad};

pub(crate) type PremulRgba8 = [u8; 4];

/// Premultiplied source-over with an extra opacity factor.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Opaque color texel masked by the luminance of an alpha texel, premultiplied.
pub(crate) fn mix_pixel(rgb: PremulRgba8, alpha: PremulRgba8) -> PremulRgba8 {
    let a = luma_u8(alpha[0], alpha[1], alpha[2]);
    let a16 = u16::from(a);
    [
        mul_div255_u8(u16::from(rgb[0]), a16),
        mul_div255_u8(u16::from(rgb[1]), a16),
        mul_div255_u8(u16::from(rgb[2]), a16),
        a,
    ]
}

/// Render target view over a surface back buffer.
pub(crate) struct Target<'a> {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) data: &'a mut [u8],
}

impl Target<'_> {
    pub(crate) fn clear(&mut self, rgba: PremulRgba8) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    fn blend(&mut self, x: u32, y: u32, src: PremulRgba8, opacity: f32) {
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = &mut self.data[idx..idx + 4];
        let out = over([px[0], px[1], px[2], px[3]], src, opacity);
        px.copy_from_slice(&out);
    }
}

/// Device pixels covered by `dest` under `transform`, clipped to the target.
fn device_bounds(
    dest: Rect,
    transform: Affine,
    width: u32,
    height: u32,
) -> Option<(u32, u32, u32, u32)> {
    let corners = [
        Point::new(dest.x0, dest.y0),
        Point::new(dest.x1, dest.y0),
        Point::new(dest.x0, dest.y1),
        Point::new(dest.x1, dest.y1),
    ]
    .map(|p| transform * p);

    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    let x0 = min_x.floor().max(0.0) as u32;
    let y0 = min_y.floor().max(0.0) as u32;
    let x1 = max_x.ceil().min(f64::from(width)).max(0.0) as u32;
    let y1 = max_y.ceil().min(f64::from(height)).max(0.0) as u32;
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

/// Walk device pixels whose centers land inside `dest`, yielding the matching texel coordinate
/// within `src` (nearest sampling).
fn for_each_texel(
    dest: Rect,
    src: Rect,
    transform: Affine,
    width: u32,
    height: u32,
    mut f: impl FnMut(u32, u32, u32, u32),
) {
    if dest.width() <= 0.0 || dest.height() <= 0.0 || src.width() <= 0.0 || src.height() <= 0.0 {
        return;
    }
    if transform.determinant().abs() < 1e-12 {
        return;
    }
    let Some((x0, y0, x1, y1)) = device_bounds(dest, transform, width, height) else {
        return;
    };
    let inv = transform.inverse();
    let sx = src.width() / dest.width();
    let sy = src.height() / dest.height();
    let max_u = (src.x1.ceil() - 1.0).max(src.x0.floor());
    let max_v = (src.y1.ceil() - 1.0).max(src.y0.floor());

    for y in y0..y1 {
        for x in x0..x1 {
            let p = inv * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if p.x < dest.x0 || p.x >= dest.x1 || p.y < dest.y0 || p.y >= dest.y1 {
                continue;
            }
            let u = (src.x0 + (p.x - dest.x0) * sx).floor().clamp(src.x0.floor(), max_u);
            let v = (src.y0 + (p.y - dest.y0) * sy).floor().clamp(src.y0.floor(), max_v);
            f(x, y, u as u32, v as u32);
        }
    }
}

pub(crate) fn draw_quad(target: &mut Target<'_>, texture: &Bitmap, quad: &TexturedQuad) {
    let (w, h) = (target.width, target.height);
    let src = quad
        .src
        .intersect(Rect::new(0.0, 0.0, f64::from(texture.width()), f64::from(texture.height())));
    for_each_texel(quad.dest, src, quad.transform, w, h, |x, y, u, v| {
        target.blend(x, y, texture.pixel(u, v), quad.opacity);
    });
}

pub(crate) fn draw_mix_quad(target: &mut Target<'_>, texture: &Bitmap, quad: &MixQuad) {
    let (w, h) = (target.width, target.height);
    let bounds = Rect::new(0.0, 0.0, f64::from(texture.width()), f64::from(texture.height()));
    let src = quad.rgb_src.intersect(bounds);
    let (dx, dy) = (quad.alpha_offset.x, quad.alpha_offset.y);
    for_each_texel(quad.dest, src, quad.transform, w, h, |x, y, u, v| {
        let au = f64::from(u) + dx;
        let av = f64::from(v) + dy;
        if au < 0.0 || av < 0.0 || au >= bounds.x1 || av >= bounds.y1 {
            return;
        }
        let px = mix_pixel(texture.pixel(u, v), texture.pixel(au as u32, av as u32));
        target.blend(x, y, px, 1.0);
    });
}

#[cfg(test)]
#[path = "../../../tests/unit/gpu/raster.rs"]
mod tests;
