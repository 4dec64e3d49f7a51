use super::*;

fn fps30() -> Fps {
    Fps::new(30, 1).unwrap()
}

/// Packed frame: `gray` marks (lt, rt, lb, rb) quadrants as gray, others saturated color.
fn packed_frame(w: u32, h: u32, gray: (bool, bool, bool, bool)) -> Bitmap {
    let mut data = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        for x in 0..w {
            let left = x < w / 2;
            let top = y < h / 2;
            let is_gray = match (left, top) {
                (true, true) => gray.0,
                (false, true) => gray.1,
                (true, false) => gray.2,
                (false, false) => gray.3,
            };
            if is_gray {
                let v = ((x + y) % 256) as u8;
                data.extend_from_slice(&[v, v, v, 255]);
            } else {
                data.extend_from_slice(&[220, 40, 90, 255]);
            }
        }
    }
    Bitmap::from_video_rgba(w, h, data).unwrap()
}

#[test]
fn default_config_uses_video_dimensions_and_no_effects() {
    let d = SceneDescriptor::default_config(1080, 1920, VideoMode::Plain, fps30()).unwrap();
    assert_eq!(d.canvas(), Canvas::new(1080, 1920));
    assert_eq!(d.native_video(), Canvas::new(1080, 1920));
    assert!(d.effects().is_empty());
    assert!(d.is_default_config());
    assert!(!d.is_mix_mode());
}

#[test]
fn default_config_canvas_is_video_size_for_every_mode() {
    for mode in VideoMode::ALL {
        let d = SceneDescriptor::default_config(1080, 1920, mode, fps30()).unwrap();
        assert_eq!(d.canvas(), Canvas::new(1080, 1920), "{mode}");
        assert!(d.effects().is_empty());
        assert_eq!(d.is_mix_mode(), mode != VideoMode::Plain);
    }
}

#[test]
fn split_modes_place_alpha_and_rgb_halves() {
    let video = Canvas::new(1080, 1920);

    let h = VideoMode::SplitHorizontal.mix_regions(video).unwrap();
    assert_eq!(h.alpha, PixelRect::new(0, 0, 540, 1920));
    assert_eq!(h.rgb, PixelRect::new(540, 0, 540, 1920));

    let v = VideoMode::SplitVertical.mix_regions(video).unwrap();
    assert_eq!(v.alpha, PixelRect::new(0, 0, 1080, 960));
    assert_eq!(v.rgb, PixelRect::new(0, 960, 1080, 960));

    let hr = VideoMode::SplitHorizontalReverse.mix_regions(video).unwrap();
    assert_eq!(hr.rgb, PixelRect::new(0, 0, 540, 1920));
    assert_eq!(hr.alpha, PixelRect::new(540, 0, 540, 1920));

    let vr = VideoMode::SplitVerticalReverse.mix_regions(video).unwrap();
    assert_eq!(vr.rgb, PixelRect::new(0, 0, 1080, 960));
    assert_eq!(vr.alpha, PixelRect::new(0, 960, 1080, 960));

    assert!(VideoMode::Plain.mix_regions(video).is_none());
}

#[test]
fn odd_widths_still_produce_valid_regions() {
    let d = SceneDescriptor::default_config(1081, 1919, VideoMode::SplitVertical, fps30()).unwrap();
    let mix = d.mix().unwrap();
    assert!(mix.alpha.same_size(mix.rgb));
}

#[test]
fn video_mode_names_roundtrip() {
    for mode in VideoMode::ALL {
        assert_eq!(mode.as_str().parse::<VideoMode>().unwrap(), mode);
    }
    assert!("diagonal".parse::<VideoMode>().is_err());
}

#[test]
fn detection_recognizes_each_layout() {
    let cases = [
        ((false, false, false, false), Some(VideoMode::Plain)),
        ((true, false, true, false), Some(VideoMode::SplitHorizontal)),
        ((false, true, false, true), Some(VideoMode::SplitHorizontalReverse)),
        ((true, true, false, false), Some(VideoMode::SplitVertical)),
        ((false, false, true, true), Some(VideoMode::SplitVerticalReverse)),
        ((true, false, false, false), None),
    ];
    for (gray, expected) in cases {
        let frame = packed_frame(64, 48, gray);
        assert_eq!(detect_video_mode(&frame), expected, "{gray:?}");
    }
}

#[test]
fn detection_rejects_tiny_frames() {
    let frame = Bitmap::solid(8, 8, [0, 0, 0, 255]);
    assert_eq!(detect_video_mode(&frame), None);
}

#[test]
fn serde_and_cli_spellings_agree() {
    for mode in VideoMode::ALL {
        let json = serde_json::to_string(&mode).unwrap();
        assert_eq!(json, format!("\"{mode}\""));
        let back: VideoMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mode);
    }

    let selection =
        crate::session::render_session::ModeSelection::Fixed(VideoMode::SplitVertical);
    assert_eq!(
        serde_json::to_string(&selection).unwrap(),
        r#"{"fixed":"split-vertical"}"#
    );
}
