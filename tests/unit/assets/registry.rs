use super::*;
use crate::assets::source::TextContent;
use crate::foundation::core::Canvas;
use crate::gpu::handles::OutputTarget;
use crate::gpu::soft::SoftPlatform;
use crate::gpu::surface_manager::{SurfaceManager, SurfaceManagerOpts};
use crate::scene::model::{
    DescriptorData, FitMode, LoadOrigin, SourceKindSpec, SourceSpec, TextSpec, TextStyle,
};

struct SolidText;

impl TextRasterizer for SolidText {
    fn rasterize(&mut self, text: &TextContent, width: u32, height: u32) -> EvaResult<Bitmap> {
        let [r, g, b, a] = text.font_color;
        let mut data = [r, g, b, a].repeat((width * height) as usize);
        // Encode the text length into the first texel so re-rasterization is observable.
        data[0] = text.text.len() as u8;
        Bitmap::from_straight(width, height, data)
    }
}

fn image_spec(id: &str) -> SourceSpec {
    SourceSpec {
        id: id.to_string(),
        kind: SourceKindSpec::Image,
        width: 2,
        height: 2,
        fit: FitMode::StretchToFill,
        load_origin: LoadOrigin::Local,
    }
}

fn text_spec(id: &str) -> SourceSpec {
    SourceSpec {
        id: id.to_string(),
        kind: SourceKindSpec::Text(TextSpec {
            text: "Hi".to_string(),
            font_size: 12,
            font_color: "#FF0000".to_string(),
            style: TextStyle::Regular,
        }),
        width: 4,
        height: 2,
        fit: FitMode::CenterFitContained,
        load_origin: LoadOrigin::Unknown,
    }
}

fn setup(
    sources: Vec<SourceSpec>,
) -> (SurfaceManager<SoftPlatform>, CurrentContext, SourceRegistry) {
    let descriptor = SceneDescriptor::new(DescriptorData {
        canvas: Canvas::new(8, 8),
        native_video: Canvas::new(8, 8),
        fps: None,
        sources,
        effects: vec![],
        data_bindings: vec![],
        mix: None,
    })
    .unwrap();
    let mut m = SurfaceManager::new(SoftPlatform::new(), SurfaceManagerOpts::default());
    let window = m.platform_mut().create_window(8, 8);
    m.build_primary(window).unwrap();
    let ctx = m.make_current(OutputTarget::Display).unwrap();
    let registry = SourceRegistry::from_descriptor(&descriptor).unwrap();
    (m, ctx, registry)
}

#[test]
fn image_uploads_once_and_drops_pixels() {
    let (mut m, ctx, mut reg) = setup(vec![image_spec("logo")]);
    reg.attach_bitmap("logo", Bitmap::solid(2, 2, [0, 0, 255, 255]))
        .unwrap();

    let first = reg.resolve_texture(m.platform_mut(), &ctx, "logo").unwrap();
    let second = reg.resolve_texture(m.platform_mut(), &ctx, "logo").unwrap();
    assert_eq!(first, second);
    assert_eq!(m.platform().texture_uploads(), 1);

    let src = reg.get("logo").unwrap();
    assert!(src.is_resident());
    match src.content() {
        SourceContent::Image(image) => assert!(image.pixels().is_none()),
        SourceContent::Text(_) => panic!("expected image"),
    }
}

#[test]
fn missing_inputs_fail_resolution_recoverably() {
    let (mut m, ctx, mut reg) = setup(vec![image_spec("logo"), text_spec("title")]);

    for id in ["logo", "title", "nope"] {
        let err = reg.resolve_texture(m.platform_mut(), &ctx, id).unwrap_err();
        assert!(
            matches!(&err, EvaError::SourceResolutionFailed { source_id, .. } if source_id == id),
            "{err}"
        );
        assert!(err.is_recoverable());
    }
}

#[test]
fn invalidated_image_reloads_from_persisted_path() {
    let dir = std::env::temp_dir().join(format!("evaframe-registry-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("logo.png");
    let pixels = Bitmap::solid(2, 2, [0, 255, 0, 255]);
    crate::assets::decode::write_png(&pixels, &path).unwrap();

    let (mut m, ctx, mut reg) = setup(vec![image_spec("logo")]);
    reg.attach_bitmap("logo", pixels).unwrap();
    reg.set_persisted_path("logo", &path).unwrap();
    reg.resolve_texture(m.platform_mut(), &ctx, "logo").unwrap();

    m.platform_mut().lose_textures();
    reg.invalidate_textures();
    assert!(!reg.get("logo").unwrap().is_resident());

    let tex = reg.resolve_texture(m.platform_mut(), &ctx, "logo").unwrap();
    assert!(tex.is_set());
    assert_eq!(m.platform().texture_uploads(), 2);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn invalidated_image_without_path_cannot_reload() {
    let (mut m, ctx, mut reg) = setup(vec![image_spec("logo")]);
    reg.attach_bitmap("logo", Bitmap::solid(2, 2, [9, 9, 9, 255]))
        .unwrap();
    reg.resolve_texture(m.platform_mut(), &ctx, "logo").unwrap();
    reg.invalidate_textures();
    assert!(reg.resolve_texture(m.platform_mut(), &ctx, "logo").is_err());
}

#[test]
fn text_rerasterizes_only_when_text_changes() {
    let (mut m, ctx, mut reg) = setup(vec![text_spec("title")]);
    reg.set_rasterizer(Box::new(SolidText));

    let tex = reg.resolve_texture(m.platform_mut(), &ctx, "title").unwrap();
    reg.set_text("title", "Hi").unwrap();
    assert_eq!(reg.resolve_texture(m.platform_mut(), &ctx, "title").unwrap(), tex);
    assert_eq!(m.platform().texture_uploads(), 1);

    reg.set_text("title", "Hello").unwrap();
    assert_eq!(reg.resolve_texture(m.platform_mut(), &ctx, "title").unwrap(), tex);
    assert_eq!(m.platform().texture_uploads(), 2);
}

#[test]
fn kind_mismatches_are_rejected() {
    let (_m, _ctx, mut reg) = setup(vec![image_spec("logo"), text_spec("title")]);
    assert!(reg.attach_bitmap("title", Bitmap::solid(1, 1, [0; 4])).is_err());
    assert!(reg.set_text("logo", "x").is_err());
    assert!(reg.set_persisted_path("title", "/tmp/x.png").is_err());
    assert!(reg.attach_bitmap("missing", Bitmap::solid(1, 1, [0; 4])).is_err());
}

#[test]
fn video_frame_uploads_per_new_frame() {
    let (mut m, ctx, mut reg) = setup(vec![]);
    assert_eq!(reg.resolve_video_texture(m.platform_mut(), &ctx).unwrap(), None);

    reg.set_video_frame(VideoFrame {
        pixels: Bitmap::solid(8, 8, [1, 2, 3, 255]),
        pts_ns: Some(0),
    });
    let first = reg.resolve_video_texture(m.platform_mut(), &ctx).unwrap().unwrap();
    assert_eq!((first.width, first.height), (8, 8));
    reg.resolve_video_texture(m.platform_mut(), &ctx).unwrap();
    assert_eq!(m.platform().texture_uploads(), 1);

    reg.set_video_frame(VideoFrame {
        pixels: Bitmap::solid(8, 8, [4, 5, 6, 255]),
        pts_ns: Some(33_333_333),
    });
    let second = reg.resolve_video_texture(m.platform_mut(), &ctx).unwrap().unwrap();
    assert_eq!(second.texture, first.texture);
    assert_eq!(m.platform().texture_uploads(), 2);
}

#[test]
fn evict_and_release_delete_textures() {
    let (mut m, ctx, mut reg) = setup(vec![image_spec("a"), image_spec("b")]);
    for id in ["a", "b"] {
        reg.attach_bitmap(id, Bitmap::solid(2, 2, [0, 0, 0, 255])).unwrap();
        reg.resolve_texture(m.platform_mut(), &ctx, id).unwrap();
    }
    reg.evict(m.platform_mut(), &ctx, "a").unwrap();
    assert!(!reg.get("a").unwrap().texture().is_set());

    let b = reg.get("b").unwrap().texture();
    reg.release_textures(m.platform_mut(), &ctx);
    assert!(!reg.get("b").unwrap().texture().is_set());
    assert!(m.platform_mut().delete_texture(ctx.context(), b).is_err());
}
