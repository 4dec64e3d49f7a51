use super::*;

#[test]
fn frame_boundaries_at_thirty_fps() {
    let clock = FixedRateClock::new(Fps { num: 30, den: 1 });
    assert_eq!(clock.frame_at(0).index, FrameIndex(0));
    assert_eq!(clock.frame_at(33_333_333).index, FrameIndex(0));
    assert_eq!(clock.frame_at(33_333_334).index, FrameIndex(1));
    assert_eq!(clock.frame_at(1_000_000_000).index, FrameIndex(30));
}

#[test]
fn pts_is_the_media_time_not_the_frame_start() {
    let clock = FixedRateClock::new(Fps { num: 30, den: 1 });
    let t = clock.frame_at(50_000_000);
    assert_eq!(t.index, FrameIndex(1));
    assert_eq!(t.pts_ns, 50_000_000);
    assert_eq!(clock.start_of(FrameIndex(1)), 33_333_334);
}

#[test]
fn ntsc_rate_rounds_down() {
    let clock = FixedRateClock::new(Fps {
        num: 30_000,
        den: 1_001,
    });
    let start = clock.start_of(FrameIndex(100));
    assert_eq!(start, 3_336_666_667);
    assert_eq!(clock.frame_at(start).index, FrameIndex(100));
    assert_eq!(clock.frame_at(start - 1).index, FrameIndex(99));
}
