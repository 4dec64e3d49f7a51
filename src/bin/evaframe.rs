use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use evaframe::{
    CompositorOpts, DEFAULT_FPS, DescriptorData, Fps, FrameIndex, ModeSelection, OutputTarget,
    RenderSession, Rgba8Premul, SceneDescriptor, SessionOpts, SoftPlatform, SourceKindSpec,
    VideoFrame, VideoMode,
};

#[derive(Parser, Debug)]
#[command(name = "evaframe", version)]
struct Cli {
    /// Log lifecycle details.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the descriptor used for a video that ships without one, as JSON.
    DefaultConfig(DefaultConfigArgs),
    /// Guess the packing layout of a decoded video frame.
    DetectMode(DetectModeArgs),
    /// Print the descriptor JSON embedded in a video container.
    ExtractDescriptor(ExtractDescriptorArgs),
    /// Composite one frame over a packed video frame and write it as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct DefaultConfigArgs {
    /// Video width in pixels.
    #[arg(long)]
    width: u32,

    /// Video height in pixels.
    #[arg(long)]
    height: u32,

    /// Packing layout (plain, split-horizontal, split-vertical, ...).
    #[arg(long, default_value = "split-horizontal")]
    mode: VideoMode,

    /// Frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,
}

#[derive(Parser, Debug)]
struct DetectModeArgs {
    /// Video frame image.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct ExtractDescriptorArgs {
    /// Video container file.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Packed video frame image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Scene descriptor JSON. Without it the default descriptor for the frame is used.
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Directory holding `<source id>.png` for image sources.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Packing layout, or `auto` to probe the frame.
    #[arg(long, default_value = "auto")]
    mode: String,

    /// Animation frame to render (0-based).
    #[arg(long, default_value_t = 0)]
    frame: u64,

    /// Background color, `#RRGGBB` or `#AARRGGBB`.
    #[arg(long)]
    background: Option<String>,

    /// Render through the encoder surface instead of the display surface.
    #[arg(long, default_value_t = false)]
    record: bool,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::DefaultConfig(args) => cmd_default_config(args),
        Command::DetectMode(args) => cmd_detect_mode(args),
        Command::ExtractDescriptor(args) => cmd_extract_descriptor(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn cmd_default_config(args: DefaultConfigArgs) -> anyhow::Result<()> {
    let fps = Fps::new(args.fps, 1)?;
    let descriptor = SceneDescriptor::default_config(args.width, args.height, args.mode, fps)?;
    let json = serde_json::to_string_pretty(&descriptor.to_data())
        .context("serialize descriptor")?;
    println!("{json}");
    Ok(())
}

fn cmd_detect_mode(args: DetectModeArgs) -> anyhow::Result<()> {
    let frame = evaframe::decode_video_frame_file(&args.in_path)?;
    let mode = evaframe::detect_video_mode(&frame).with_context(|| {
        format!(
            "no known packing layout in '{}' ({}x{})",
            args.in_path.display(),
            frame.width(),
            frame.height()
        )
    })?;
    println!("{mode}");
    Ok(())
}

fn cmd_extract_descriptor(args: ExtractDescriptorArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read container '{}'", args.in_path.display()))?;
    let json = evaframe::embedded_descriptor_json(&bytes)?.with_context(|| {
        format!("no embedded descriptor in '{}'", args.in_path.display())
    })?;
    println!("{json}");
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let video = evaframe::decode_video_frame_file(&args.in_path)?;

    let mode = match args.mode.as_str() {
        "auto" => ModeSelection::Auto,
        other => ModeSelection::Fixed(other.parse()?),
    };
    let data = match &args.scene {
        Some(path) => load_scene(path)?,
        None => {
            let default_mode = match mode {
                ModeSelection::Fixed(m) => m,
                _ => VideoMode::Plain,
            };
            SceneDescriptor::default_config(
                video.width(),
                video.height(),
                default_mode,
                DEFAULT_FPS,
            )?
            .to_data()
        }
    };

    let mut compositor = CompositorOpts::default();
    if let Some(hex) = &args.background {
        let [r, g, b, a] = evaframe::parse_hex_color(hex)?;
        compositor.clear_rgba = Rgba8Premul::from_straight_rgba(r, g, b, a).to_array();
    }
    let opts = SessionOpts {
        compositor,
        mode,
        ..SessionOpts::default()
    };

    let mut session = RenderSession::new(SoftPlatform::new(), data, opts)?;
    if let Some(dir) = &args.assets {
        load_image_sources(&mut session, dir)?;
    }

    let canvas = session.descriptor().canvas();
    let display = session
        .platform_mut()
        .create_window(canvas.width, canvas.height);
    session.start(display)?;

    let (target, window) = if args.record {
        let encoder = session
            .platform_mut()
            .create_window(canvas.width, canvas.height);
        session.start_recording(encoder)?;
        (OutputTarget::Encoder, encoder)
    } else {
        (OutputTarget::Display, display)
    };

    session.set_video_frame(VideoFrame {
        pixels: video,
        pts_ns: None,
    });
    let report = session.render_frame(target, FrameIndex(args.frame))?;
    for skipped in &report.skipped {
        tracing::warn!(effect = %skipped.effect_id, error = %skipped.error, "effect skipped");
    }
    tracing::info!(
        frame = args.frame,
        %target,
        video = report.video_drawn,
        drawn = report.drawn.len(),
        skipped = report.skipped.len(),
        "frame rendered"
    );

    let presented = session
        .platform_mut()
        .acquire_frame(window)
        .context("no frame was presented")?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    evaframe::write_png(&presented.frame, &args.out)?;

    let teardown = session.release();
    if !teardown.is_clean() {
        tracing::warn!(failures = teardown.failures.len(), "teardown incomplete");
    }

    match presented.timestamp_ns {
        Some(pts) => eprintln!("wrote {} (pts {pts} ns)", args.out.display()),
        None => eprintln!("wrote {}", args.out.display()),
    }
    Ok(())
}

fn load_scene(path: &Path) -> anyhow::Result<DescriptorData> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read scene '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse scene '{}'", path.display()))
}

fn load_image_sources(
    session: &mut RenderSession<SoftPlatform>,
    dir: &Path,
) -> anyhow::Result<()> {
    let ids: Vec<String> = session
        .descriptor()
        .sources()
        .iter()
        .filter(|s| matches!(s.kind, SourceKindSpec::Image))
        .map(|s| s.id.clone())
        .collect();
    for id in ids {
        let path = dir.join(format!("{id}.png"));
        if !path.is_file() {
            tracing::warn!(source = %id, path = %path.display(), "image source not found");
            continue;
        }
        let bitmap = evaframe::decode_image_file(&path)?;
        let registry = session.registry_mut();
        registry.attach_bitmap(&id, bitmap)?;
        registry.set_persisted_path(&id, &path)?;
    }
    Ok(())
}
