use super::*;

#[test]
fn frame_range_contains_boundaries() {
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert!(!r.contains(FrameIndex(1)));
    assert!(r.contains(FrameIndex(2)));
    assert!(r.contains(FrameIndex(4)));
    assert!(!r.contains(FrameIndex(5)));
    assert_eq!(r.len_frames(), 3);
}

#[test]
fn frame_range_rejects_inverted_bounds() {
    assert!(FrameRange::new(FrameIndex(3), FrameIndex(2)).is_err());
}

#[test]
fn fps_nanos_mapping_is_floor_consistent() {
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.frame_to_nanos(FrameIndex(0)), 0);
    assert_eq!(fps.frame_to_nanos(FrameIndex(30)), 1_000_000_000);
    assert_eq!(fps.nanos_to_frame(999_999_999), FrameIndex(29));
    assert_eq!(fps.nanos_to_frame(1_000_000_000), FrameIndex(30));

    let ntsc = Fps::new(30000, 1001).unwrap();
    let t = ntsc.frame_to_nanos(FrameIndex(123));
    assert_eq!(ntsc.nanos_to_frame(t + 1), FrameIndex(123));
}

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn pixel_rect_bounds_and_overlap() {
    let video = Canvas::new(200, 100);
    let left = PixelRect::new(0, 0, 100, 100);
    let right = PixelRect::new(100, 0, 100, 100);
    assert!(left.fits_within(video));
    assert!(right.fits_within(video));
    assert!(!left.overlaps(right));
    assert!(left.same_size(right));

    let spill = PixelRect::new(150, 0, 100, 100);
    assert!(!spill.fits_within(video));
    assert!(spill.overlaps(right));
    assert!(!PixelRect::new(0, 0, 0, 10).fits_within(video));
}

#[test]
fn transform_identity_and_translation() {
    let t = Transform2D::default();
    assert!(t.is_identity());
    assert_eq!(t.to_affine_at(Point::new(10.0, 20.0)), Affine::IDENTITY);

    let t = Transform2D {
        translate: Vec2::new(10.0, -2.5),
        ..Transform2D::default()
    };
    assert_eq!(
        t.to_affine_at(Point::ORIGIN),
        Affine::translate(Vec2::new(10.0, -2.5))
    );
}

#[test]
fn transform_scales_around_rect_origin() {
    let t = Transform2D {
        scale: Vec2::new(2.0, 2.0),
        ..Transform2D::default()
    };
    let m = t.to_affine_at(Point::new(10.0, 10.0));
    assert_eq!(m * Point::new(10.0, 10.0), Point::new(10.0, 10.0));
    assert_eq!(m * Point::new(11.0, 12.0), Point::new(12.0, 14.0));
}

#[test]
fn straight_to_premul_rounds() {
    let c = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(c.to_array(), [128, 64, 0, 128]);
}
