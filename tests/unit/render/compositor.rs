use super::*;
use crate::assets::bitmap::Bitmap;
use crate::assets::registry::VideoFrame;
use crate::assets::source::{TextContent, TextRasterizer};
use crate::foundation::core::{FrameRange, PixelRect, Transform2D};
use crate::gpu::handles::NativeWindow;
use crate::gpu::soft::SoftPlatform;
use crate::gpu::surface_manager::SurfaceManagerOpts;
use crate::scene::model::{
    DataBinding, DescriptorData, LoadOrigin, SourceKindSpec, SourceSpec, TextSpec, TextStyle,
};

const BLUE: [u8; 4] = [0, 0, 255, 255];
const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const CLEAR: [u8; 4] = [0, 0, 0, 0];

struct Rig {
    manager: SurfaceManager<SoftPlatform>,
    display: NativeWindow,
    encoder: NativeWindow,
    registry: SourceRegistry,
    compositor: FrameCompositor,
}

impl Rig {
    fn new(data: DescriptorData, opts: CompositorOpts) -> Self {
        let descriptor = Arc::new(SceneDescriptor::new(data).unwrap());
        let canvas = descriptor.canvas();
        let mut manager = SurfaceManager::new(SoftPlatform::new(), SurfaceManagerOpts::default());
        let display = manager
            .platform_mut()
            .create_window(canvas.width, canvas.height);
        let encoder = manager
            .platform_mut()
            .create_window(canvas.width, canvas.height);
        let primary = manager.build_primary(display).unwrap();
        manager.build_secondary_context(primary, encoder).unwrap();
        let registry = SourceRegistry::from_descriptor(&descriptor).unwrap();
        Self {
            manager,
            display,
            encoder,
            registry,
            compositor: FrameCompositor::new(descriptor, opts),
        }
    }

    fn render(&mut self, target: OutputTarget, frame: u64) -> FrameReport {
        let fps = self.compositor.descriptor().fps();
        self.compositor
            .render_frame(
                &mut self.manager,
                &mut self.registry,
                target,
                FrameTime::at(FrameIndex(frame), fps),
            )
            .unwrap()
    }

    fn display_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.manager
            .platform()
            .latest_frame(self.display)
            .unwrap()
            .frame
            .pixel(x, y)
    }
}

fn image(id: &str, w: u32, h: u32, fit: FitMode) -> SourceSpec {
    SourceSpec {
        id: id.to_string(),
        kind: SourceKindSpec::Image,
        width: w,
        height: h,
        fit,
        load_origin: LoadOrigin::Local,
    }
}

fn effect(id: &str, source: &str, start: u64, end: u64, rect: PixelRect) -> Effect {
    Effect {
        id: id.to_string(),
        source_id: source.to_string(),
        range: FrameRange {
            start: FrameIndex(start),
            end: FrameIndex(end),
        },
        rect,
        transform: Transform2D::default(),
        data_binding_id: None,
    }
}

fn data(canvas: Canvas, sources: Vec<SourceSpec>, effects: Vec<Effect>) -> DescriptorData {
    DescriptorData {
        canvas,
        native_video: canvas,
        fps: None,
        sources,
        effects,
        data_bindings: vec![],
        mix: None,
    }
}

#[test]
fn portrait_scenario_follows_the_effect_range() {
    let canvas = Canvas::new(720, 1280);
    let mut rig = Rig::new(
        data(
            canvas,
            vec![image("img", 100, 200, FitMode::CenterFitContained)],
            vec![effect("e", "img", 0, 30, PixelRect::new(0, 0, 720, 1280))],
        ),
        CompositorOpts::default(),
    );
    rig.registry
        .attach_bitmap("img", Bitmap::solid(100, 200, BLUE))
        .unwrap();

    for frame in [0, 29] {
        let report = rig.render(OutputTarget::Display, frame);
        assert_eq!(report.drawn, ["e"], "frame {frame}");
        assert_eq!(rig.display_pixel(360, 640), BLUE);
        // Contained fit leaves 40px bars left and right.
        assert_eq!(rig.display_pixel(20, 640), CLEAR);
        assert_eq!(rig.display_pixel(700, 640), CLEAR);
    }

    let report = rig.render(OutputTarget::Display, 30);
    assert!(report.drawn.is_empty());
    assert_eq!(rig.display_pixel(360, 640), CLEAR);
}

#[test]
fn later_effects_draw_on_top() {
    let canvas = Canvas::new(8, 8);
    let full = PixelRect::new(0, 0, 8, 8);
    let mut rig = Rig::new(
        data(
            canvas,
            vec![
                image("red", 1, 1, FitMode::StretchToFill),
                image("green", 1, 1, FitMode::StretchToFill),
            ],
            vec![
                effect("bottom", "red", 0, 10, full),
                effect("top", "green", 0, 10, PixelRect::new(0, 0, 4, 8)),
            ],
        ),
        CompositorOpts::default(),
    );
    rig.registry.attach_bitmap("red", Bitmap::solid(1, 1, RED)).unwrap();
    rig.registry
        .attach_bitmap("green", Bitmap::solid(1, 1, GREEN))
        .unwrap();

    let report = rig.render(OutputTarget::Display, 0);
    assert_eq!(report.drawn, ["bottom", "top"]);
    assert_eq!(rig.display_pixel(1, 1), GREEN);
    assert_eq!(rig.display_pixel(6, 1), RED);
}

#[test]
fn unresolvable_source_skips_only_that_effect() {
    let canvas = Canvas::new(4, 4);
    let full = PixelRect::new(0, 0, 4, 4);
    let mut rig = Rig::new(
        data(
            canvas,
            vec![
                image("ok", 1, 1, FitMode::StretchToFill),
                image("empty", 1, 1, FitMode::StretchToFill),
            ],
            vec![
                effect("a", "ok", 0, 1, full),
                effect("b", "empty", 0, 1, full),
                effect("c", "ghost", 0, 1, full),
            ],
        ),
        CompositorOpts::default(),
    );
    rig.registry.attach_bitmap("ok", Bitmap::solid(1, 1, RED)).unwrap();

    let report = rig.render(OutputTarget::Display, 0);
    assert_eq!(report.drawn, ["a"]);
    let skipped: Vec<&str> = report.skipped.iter().map(|s| s.effect_id.as_str()).collect();
    assert_eq!(skipped, ["b", "c"]);
    assert!(report.skipped.iter().all(|s| s.error.is_recoverable()));
    assert_eq!(report.present, PresentOutcome::Presented { timestamped: false });
    assert_eq!(rig.display_pixel(2, 2), RED);
}

#[test]
fn invalid_mix_regions_fail_before_any_draw() {
    // A one pixel wide video cannot be split in halves.
    let canvas = Canvas::new(1, 8);
    let mut rig = Rig::new(
        data(canvas, vec![], vec![]),
        CompositorOpts {
            video_mode: Some(VideoMode::SplitHorizontal),
            ..CompositorOpts::default()
        },
    );
    let fps = rig.compositor.descriptor().fps();
    let err = rig
        .compositor
        .render_frame(
            &mut rig.manager,
            &mut rig.registry,
            OutputTarget::Display,
            FrameTime::at(FrameIndex(0), fps),
        )
        .unwrap_err();
    assert!(matches!(err, EvaError::InvalidMixRegions(_)), "{err}");
    assert_eq!(rig.manager.platform().draw_calls(), 0);
    assert_eq!(rig.manager.platform().presented_count(rig.display), 0);
}

#[test]
fn mix_video_takes_color_and_luminance_alpha() {
    let white = [255, 255, 255, 255];
    let black = [0, 0, 0, 255];
    let yellow = [255, 255, 0, 255];
    // Alpha on the left half, color on the right half.
    let rows = [[white, black, RED, GREEN], [black, white, BLUE, yellow]];
    let pixels: Vec<u8> = rows.iter().flatten().flatten().copied().collect();

    let canvas = Canvas::new(4, 2);
    let mut d = data(canvas, vec![], vec![]);
    d.mix = VideoMode::SplitHorizontal.mix_regions(canvas);
    let mut rig = Rig::new(d, CompositorOpts::default());
    rig.registry.set_video_frame(VideoFrame {
        pixels: Bitmap::from_video_rgba(4, 2, pixels).unwrap(),
        pts_ns: None,
    });

    let report = rig.render(OutputTarget::Display, 0);
    assert!(report.video_drawn);
    // 2x2 color region is centered in the 4x2 canvas.
    assert_eq!(rig.display_pixel(0, 0), CLEAR);
    assert_eq!(rig.display_pixel(1, 0), RED);
    assert_eq!(rig.display_pixel(2, 0), CLEAR);
    assert_eq!(rig.display_pixel(1, 1), CLEAR);
    assert_eq!(rig.display_pixel(2, 1), yellow);
}

#[test]
fn plain_video_is_drawn_opaque_under_effects() {
    let canvas = Canvas::new(4, 4);
    let mut rig = Rig::new(
        data(
            canvas,
            vec![image("dot", 1, 1, FitMode::StretchToFill)],
            vec![effect("e", "dot", 0, 1, PixelRect::new(0, 0, 1, 1))],
        ),
        CompositorOpts::default(),
    );
    rig.registry.attach_bitmap("dot", Bitmap::solid(1, 1, RED)).unwrap();
    rig.registry.set_video_frame(VideoFrame {
        pixels: Bitmap::solid(4, 4, BLUE),
        pts_ns: None,
    });

    let report = rig.render(OutputTarget::Display, 0);
    assert!(report.video_drawn);
    assert_eq!(rig.display_pixel(0, 0), RED);
    assert_eq!(rig.display_pixel(3, 3), BLUE);
}

#[test]
fn mismatched_video_frame_is_skipped() {
    let canvas = Canvas::new(4, 4);
    let mut rig = Rig::new(data(canvas, vec![], vec![]), CompositorOpts::default());
    rig.registry.set_video_frame(VideoFrame {
        pixels: Bitmap::solid(2, 2, BLUE),
        pts_ns: None,
    });
    let report = rig.render(OutputTarget::Display, 0);
    assert!(!report.video_drawn);
    assert_eq!(rig.display_pixel(1, 1), CLEAR);
}

#[test]
fn only_encoder_frames_carry_timestamps() {
    let canvas = Canvas::new(2, 2);
    let mut rig = Rig::new(data(canvas, vec![], vec![]), CompositorOpts::default());

    let report = rig.render(OutputTarget::Encoder, 3);
    assert_eq!(report.present, PresentOutcome::Presented { timestamped: true });
    let frame = rig.manager.platform().latest_frame(rig.encoder).unwrap();
    assert_eq!(frame.timestamp_ns, Some(100_000_000));

    let report = rig.render(OutputTarget::Display, 3);
    assert_eq!(report.present, PresentOutcome::Presented { timestamped: false });
    let frame = rig.manager.platform().latest_frame(rig.display).unwrap();
    assert_eq!(frame.timestamp_ns, None);
}

struct LengthText;

impl TextRasterizer for LengthText {
    fn rasterize(&mut self, text: &TextContent, width: u32, height: u32) -> EvaResult<Bitmap> {
        let px = [text.text.len() as u8, 0, 0, 255];
        Ok(Bitmap::solid(width, height, px))
    }
}

#[test]
fn text_binding_replaces_source_text() {
    let canvas = Canvas::new(4, 4);
    let mut d = data(
        canvas,
        vec![SourceSpec {
            id: "name".to_string(),
            kind: SourceKindSpec::Text(TextSpec {
                text: "placeholder".to_string(),
                font_size: 10,
                font_color: "#FFFFFF".to_string(),
                style: TextStyle::Regular,
            }),
            width: 4,
            height: 4,
            fit: FitMode::StretchToFill,
            load_origin: LoadOrigin::Unknown,
        }],
        vec![Effect {
            data_binding_id: Some("user".to_string()),
            ..effect("label", "name", 0, 1, PixelRect::new(0, 0, 4, 4))
        }],
    );
    d.data_bindings = vec![DataBinding {
        id: "user".to_string(),
        value: BindingValue::Text("Ada".to_string()),
    }];
    let mut rig = Rig::new(d, CompositorOpts::default());
    rig.registry.set_rasterizer(Box::new(LengthText));

    let report = rig.render(OutputTarget::Display, 0);
    assert_eq!(report.drawn, ["label"]);
    assert_eq!(rig.display_pixel(0, 0), [3, 0, 0, 255]);
}

#[test]
fn lost_textures_are_uploaded_again() {
    let dir = std::env::temp_dir().join(format!("evaframe-lost-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let dot_path = dir.join("dot.png");
    crate::assets::decode::write_png(&Bitmap::solid(1, 1, RED), &dot_path).unwrap();

    let canvas = Canvas::new(4, 4);
    let mut rig = Rig::new(
        data(
            canvas,
            vec![image("dot", 1, 1, FitMode::StretchToFill)],
            vec![effect("e", "dot", 0, 10, PixelRect::new(0, 0, 1, 1))],
        ),
        CompositorOpts::default(),
    );
    rig.registry.set_persisted_path("dot", &dot_path).unwrap();
    rig.registry.set_video_frame(VideoFrame {
        pixels: Bitmap::solid(4, 4, BLUE),
        pts_ns: None,
    });

    let report = rig.render(OutputTarget::Display, 0);
    assert_eq!(report.drawn, ["e"]);
    assert_eq!(rig.manager.platform().texture_uploads(), 2);

    rig.manager.platform_mut().lose_textures();
    for frame in 1..4 {
        let report = rig.render(OutputTarget::Display, frame);
        assert!(report.video_drawn, "frame {frame}");
        assert_eq!(report.drawn, ["e"], "frame {frame}");
        assert!(report.skipped.is_empty(), "frame {frame}");
        assert_eq!(rig.display_pixel(0, 0), RED);
        assert_eq!(rig.display_pixel(3, 3), BLUE);
    }
    // One re-upload each for the source and the video frame.
    assert_eq!(rig.manager.platform().texture_uploads(), 4);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn lost_texture_without_a_reload_path_is_skipped() {
    let canvas = Canvas::new(4, 4);
    let mut rig = Rig::new(
        data(
            canvas,
            vec![image("dot", 1, 1, FitMode::StretchToFill)],
            vec![effect("e", "dot", 0, 10, PixelRect::new(0, 0, 1, 1))],
        ),
        CompositorOpts::default(),
    );
    rig.registry.attach_bitmap("dot", Bitmap::solid(1, 1, RED)).unwrap();
    assert_eq!(rig.render(OutputTarget::Display, 0).drawn, ["e"]);

    rig.manager.platform_mut().lose_textures();
    let report = rig.render(OutputTarget::Display, 1);
    assert!(report.drawn.is_empty());
    assert!(matches!(
        report.skipped[0].error,
        EvaError::SourceResolutionFailed { .. }
    ));
    assert!(!rig.registry.get("dot").unwrap().texture().is_set());
}

#[test]
fn default_clear_is_transparent() {
    assert_eq!(CompositorOpts::default().clear_rgba, CLEAR);
}
