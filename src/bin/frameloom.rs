use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use sha2::Digest as _;
use tracing_subscriber::EnvFilter;

use frameloom::{
    EditorSnapshot, ExportFormat, ExportOutcome, ExportProgress, Exporter, FrameIndex,
    PixmapSurfaceProvider, TracingEvents, VideoProfile, read_archive,
};

#[derive(Parser, Debug)]
#[command(name = "frameloom", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame of a project as a PNG.
    Frame(FrameArgs),
    /// Export a project as a video, GIF, or frame archive.
    Export(ExportArgs),
    /// Extract the frames of a `.flar` archive.
    Unpack(UnpackArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[arg(long, value_enum)]
    format: FormatChoice,

    /// Output directory.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// GIF palette size.
    #[arg(long, value_parser = ["2", "4"])]
    palette_steps: Option<String>,

    /// GIF error-diffusion strength in [0, 1].
    #[arg(long)]
    dither: Option<f32>,

    /// Video codec profile.
    #[arg(long, value_enum)]
    profile: Option<ProfileChoice>,

    /// Print the SHA-256 of the exported payload.
    #[arg(long)]
    digest: bool,
}

#[derive(Parser, Debug)]
struct UnpackArgs {
    /// Input `.flar` archive.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Video,
    Gif,
    Archive,
}

impl From<FormatChoice> for ExportFormat {
    fn from(c: FormatChoice) -> Self {
        match c {
            FormatChoice::Video => Self::Video,
            FormatChoice::Gif => Self::Gif,
            FormatChoice::Archive => Self::Archive,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileChoice {
    Vp9,
    Vp8,
    H264,
}

impl From<ProfileChoice> for VideoProfile {
    fn from(c: ProfileChoice) -> Self {
        match c {
            ProfileChoice::Vp9 => Self::Vp9,
            ProfileChoice::Vp8 => Self::Vp8,
            ProfileChoice::H264 => Self::H264,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("frameloom=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
        Command::Unpack(args) => cmd_unpack(args),
    }
}

fn read_project(path: &Path) -> anyhow::Result<EditorSnapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("open project '{}'", path.display()))?;
    let snap = EditorSnapshot::from_json(&json).with_context(|| "parse project JSON")?;
    Ok(snap)
}

fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create output dir '{}'", dir.display()))
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let snap = read_project(&args.in_path)?;
    let png = snap.render_png(FrameIndex(args.frame), Arc::new(TracingEvents))?;

    if let Some(parent) = args.out.parent() {
        ensure_dir(parent)?;
    }
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let snap = read_project(&args.in_path)?;

    let mut cfg = snap.export_config(args.format.into());
    if let Some(steps) = args.palette_steps.as_deref() {
        cfg.gif.palette_steps = steps.parse().with_context(|| "parse --palette-steps")?;
    }
    if let Some(strength) = args.dither {
        cfg.gif.dither_strength = strength;
    }
    if let Some(profile) = args.profile {
        cfg.video.profile = profile.into();
    }

    let events = Arc::new(TracingEvents);
    let timeline = snap.build_timeline(events.clone());
    let mut renderer = snap.renderer()?;
    let exporter = Exporter::new(&timeline, &snap.params)
        .seed(&snap.seed)
        .events(events);

    let mut last_pct = None;
    let outcome = exporter.export(
        &cfg,
        &mut PixmapSurfaceProvider::new(),
        &mut renderer,
        &mut |p| match p {
            ExportProgress::Frame { done, total } => {
                let pct = done * 100 / total;
                if last_pct != Some(pct) {
                    last_pct = Some(pct);
                    eprint!("\rrendering {done}/{total} ({pct}%)");
                    let _ = std::io::stderr().flush();
                }
            }
            ExportProgress::Finalizing { percent, .. } => {
                eprint!("\rfinalizing {percent:.0}%          ");
                let _ = std::io::stderr().flush();
            }
        },
    )?;
    eprintln!();

    let result = match outcome {
        ExportOutcome::Done(result) => result,
        ExportOutcome::Cancelled => {
            eprintln!("export cancelled");
            return Ok(());
        }
    };

    ensure_dir(&args.out)?;
    let path = args.out.join(&result.filename);
    std::fs::write(&path, &result.payload)
        .with_context(|| format!("write export '{}'", path.display()))?;

    if args.digest {
        let digest = sha2::Sha256::digest(&result.payload);
        println!("sha256 {}", hex(&digest));
    }
    eprintln!(
        "wrote {} ({}, {} bytes)",
        path.display(),
        result.mime_type,
        result.payload.len()
    );
    Ok(())
}

fn cmd_unpack(args: UnpackArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("open archive '{}'", args.in_path.display()))?;
    let entries = read_archive(&bytes).with_context(|| "decode archive")?;

    ensure_dir(&args.out)?;
    for (name, data) in &entries {
        // Entry names are flat; refuse anything that would escape the output dir.
        if name.contains(['/', '\\']) || name == ".." {
            anyhow::bail!("refusing archive entry name '{name}'");
        }
        let path = args.out.join(name);
        std::fs::write(&path, data).with_context(|| format!("write '{}'", path.display()))?;
    }
    eprintln!("unpacked {} entries into {}", entries.len(), args.out.display());
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
