pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// BT.601 luma of an RGB triple, integer weights summing to 256.
pub(crate) fn luma_u8(r: u8, g: u8, b: u8) -> u8 {
    let y = 77 * u32::from(r) + 150 * u32::from(g) + 29 * u32::from(b);
    ((y + 128) >> 8).min(255) as u8
}

/// Largest pairwise channel difference; 0 for a perfect gray.
pub(crate) fn channel_spread(r: u8, g: u8, b: u8) -> u8 {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    max - min
}
