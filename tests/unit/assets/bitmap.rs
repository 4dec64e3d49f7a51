use super::*;

#[test]
fn straight_input_is_premultiplied() {
    let bmp = Bitmap::from_straight(1, 1, vec![200, 100, 50, 128]).unwrap();
    assert_eq!(bmp.pixel(0, 0), [100, 50, 25, 128]);
}

#[test]
fn transparent_pixels_lose_color() {
    let bmp = Bitmap::from_straight(1, 1, vec![200, 100, 50, 0]).unwrap();
    assert_eq!(bmp.pixel(0, 0), [0, 0, 0, 0]);
}

#[test]
fn video_frames_are_opaque() {
    let bmp = Bitmap::from_video_rgba(2, 1, vec![1, 2, 3, 0, 4, 5, 6, 7]).unwrap();
    assert_eq!(bmp.pixel(0, 0), [1, 2, 3, 255]);
    assert_eq!(bmp.pixel(1, 0), [4, 5, 6, 255]);
}

#[test]
fn length_must_match_dimensions() {
    assert!(Bitmap::from_premul(2, 2, vec![0; 15]).is_err());
    assert!(Bitmap::from_premul(2, 2, vec![0; 16]).is_ok());
}

#[test]
fn unpremultiply_restores_opaque_and_scales_partial() {
    let mut px = vec![100, 50, 25, 128, 10, 20, 30, 255];
    unpremultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[4..], &[10, 20, 30, 255]);
    assert_eq!(px[3], 128);
    assert!((i16::from(px[0]) - 199).abs() <= 1);
}
