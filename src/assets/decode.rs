use std::path::Path;

use anyhow::Context;

use crate::assets::bitmap::{Bitmap, unpremultiply_rgba8_in_place};
use crate::foundation::error::EvaResult;

/// Decode an encoded image (PNG, JPEG, ...) into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> EvaResult<Bitmap> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Bitmap::from_straight(width, height, rgba.into_raw())
}

/// Read and decode an image file.
pub fn decode_image_file(path: &Path) -> EvaResult<Bitmap> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_image(&bytes)
}

/// Decode a still of a packed video frame. Alpha in the file is ignored.
pub fn decode_video_frame_file(path: &Path) -> EvaResult<Bitmap> {
    let dyn_img = image::open(path).with_context(|| format!("open frame '{}'", path.display()))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Bitmap::from_video_rgba(width, height, rgba.into_raw())
}

/// Write a bitmap as PNG, converting back to straight alpha.
pub fn write_png(bitmap: &Bitmap, path: &Path) -> EvaResult<()> {
    let mut data = bitmap.data().to_vec();
    unpremultiply_rgba8_in_place(&mut data);
    let img = image::RgbaImage::from_raw(bitmap.width(), bitmap.height(), data)
        .context("bitmap buffer does not match its dimensions")?;
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
