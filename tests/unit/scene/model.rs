use super::*;
use crate::foundation::core::FrameIndex;

fn effect(id: &str, source: &str, start: u64, end: u64) -> Effect {
    Effect {
        id: id.to_string(),
        source_id: source.to_string(),
        range: FrameRange {
            start: FrameIndex(start),
            end: FrameIndex(end),
        },
        rect: PixelRect::new(0, 0, 10, 10),
        transform: Transform2D::default(),
        data_binding_id: None,
    }
}

fn base_data() -> DescriptorData {
    DescriptorData {
        canvas: Canvas::new(720, 1280),
        native_video: Canvas::new(1440, 1280),
        fps: None,
        sources: vec![SourceSpec {
            id: "logo".to_string(),
            kind: SourceKindSpec::Image,
            width: 100,
            height: 200,
            fit: FitMode::CenterFitContained,
            load_origin: LoadOrigin::Local,
        }],
        effects: vec![effect("e0", "logo", 0, 30)],
        data_bindings: vec![],
        mix: Some(MixRegions {
            alpha: PixelRect::new(0, 0, 720, 1280),
            rgb: PixelRect::new(720, 0, 720, 1280),
        }),
    }
}

#[test]
fn valid_descriptor_builds_with_default_fps() {
    let d = SceneDescriptor::new(base_data()).unwrap();
    assert_eq!(d.canvas(), Canvas::new(720, 1280));
    assert_eq!(d.fps(), DEFAULT_FPS);
    assert!(d.is_mix_mode());
    assert!(!d.is_default_config());
    assert_eq!(d.duration_frames(), 30);
    assert_eq!(d.source_spec("logo").unwrap().width, 100);
    assert!(d.source_spec("missing").is_none());
}

#[test]
fn zero_canvas_is_rejected() {
    let mut data = base_data();
    data.canvas = Canvas::new(0, 1280);
    assert!(matches!(
        SceneDescriptor::new(data),
        Err(EvaError::Validation(_))
    ));
}

#[test]
fn empty_effect_range_is_rejected() {
    let mut data = base_data();
    data.effects.push(effect("e1", "logo", 5, 5));
    assert!(matches!(
        SceneDescriptor::new(data),
        Err(EvaError::Validation(_))
    ));
}

#[test]
fn duplicate_source_ids_are_rejected() {
    let mut data = base_data();
    let dup = data.sources[0].clone();
    data.sources.push(dup);
    assert!(SceneDescriptor::new(data).is_err());
}

#[test]
fn effect_with_unknown_source_is_accepted() {
    let mut data = base_data();
    data.effects.push(effect("e1", "not-declared", 0, 1));
    assert!(SceneDescriptor::new(data).is_ok());
}

#[test]
fn mismatched_mix_regions_are_rejected() {
    let mut data = base_data();
    data.mix = Some(MixRegions {
        alpha: PixelRect::new(0, 0, 700, 1280),
        rgb: PixelRect::new(720, 0, 720, 1280),
    });
    assert!(matches!(
        SceneDescriptor::new(data),
        Err(EvaError::InvalidMixRegions(_))
    ));
}

#[test]
fn overlapping_or_out_of_frame_mix_regions_are_rejected() {
    let native = Canvas::new(1440, 1280);
    let overlapping = MixRegions {
        alpha: PixelRect::new(0, 0, 720, 1280),
        rgb: PixelRect::new(700, 0, 720, 1280),
    };
    assert!(matches!(
        overlapping.validate(native),
        Err(EvaError::InvalidMixRegions(_))
    ));

    let outside = MixRegions {
        alpha: PixelRect::new(0, 0, 720, 1280),
        rgb: PixelRect::new(721, 0, 720, 1280),
    };
    assert!(matches!(
        outside.validate(native),
        Err(EvaError::InvalidMixRegions(_))
    ));
}

#[test]
fn descriptor_data_roundtrips_through_json() {
    let d = SceneDescriptor::new(base_data()).unwrap();
    let json = serde_json::to_string(&d.to_data()).unwrap();
    let back: DescriptorData = serde_json::from_str(&json).unwrap();
    assert_eq!(back.effects, d.effects());
    assert_eq!(back.mix, d.mix().copied());
    assert!(!json.contains("transform"));
}
