use crate::foundation::error::{EvaError, EvaResult};

/// Tightly packed, row-major, premultiplied RGBA8 pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl Bitmap {
    /// Wrap premultiplied RGBA8 bytes, checking the length against the dimensions.
    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> EvaResult<Self> {
        Self::checked(width, height, data)
    }

    /// Wrap straight-alpha RGBA8 bytes and premultiply them.
    pub fn from_straight(width: u32, height: u32, mut data: Vec<u8>) -> EvaResult<Self> {
        premultiply_rgba8_in_place(&mut data);
        Self::checked(width, height, data)
    }

    /// Wrap opaque video-frame bytes. Alpha is ignored by consumers; it is forced to 255.
    pub fn from_video_rgba(width: u32, height: u32, mut data: Vec<u8>) -> EvaResult<Self> {
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self::checked(width, height, data)
    }

    /// Solid color bitmap, premultiplied.
    pub fn solid(width: u32, height: u32, premul_rgba: [u8; 4]) -> Self {
        let px = (width as usize) * (height as usize);
        Self {
            width,
            height,
            data: premul_rgba.repeat(px),
        }
    }

    fn checked(width: u32, height: u32, data: Vec<u8>) -> EvaResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| EvaError::validation("bitmap size overflow"))?;
        if data.len() != expected {
            return Err(EvaError::validation(format!(
                "bitmap {}x{} expects {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Consume into raw bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/bitmap.rs"]
mod tests;
