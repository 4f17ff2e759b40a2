use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "arena-recap", version)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Log warnings and errors only.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every replay in a batch to MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single output frame of one replay as a PNG.
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Input replay batch JSON (an array of replays).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Recap configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Agent-to-model roster JSON.
    #[arg(long)]
    roster: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output directory for videos and `manifest.json`.
    #[arg(long)]
    out_dir: PathBuf,

    /// Render replays concurrently.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Replay position within the batch (0-based).
    #[arg(long, default_value_t = 0)]
    replay: usize,

    /// Output frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else if quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn load_context(input: &InputArgs) -> anyhow::Result<arena_recap::RenderContext> {
    let config = match &input.config {
        Some(path) => arena_recap::RecapConfig::from_path(path)?,
        None => arena_recap::RecapConfig::default(),
    };
    let roster = match &input.roster {
        Some(path) => arena_recap::AgentRoster::from_path(path)?,
        None => arena_recap::AgentRoster::arena_default(),
    };
    Ok(arena_recap::RenderContext::new(config, roster)?)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let ctx = load_context(&args.input)?;
    let entries = arena_recap::load_replays(&args.input.in_path)?;
    let loaded = entries.iter().filter(|e| e.is_loaded()).count();
    if loaded == 0 {
        anyhow::bail!("no valid replays found in '{}'", args.input.in_path.display());
    }
    tracing::info!(replays = entries.len(), loaded, "loaded replay batch");

    let encoder = arena_recap::FfmpegEncoder::new(ctx.config.encode.clone())?;
    let opts = arena_recap::BatchOpts {
        parallel: args.parallel,
        threads: args.threads,
    };
    let report = arena_recap::render_batch(
        &entries,
        &args.out_dir,
        &ctx,
        || ctx.rasterizer(),
        &encoder,
        &opts,
    )?;

    let manifest_path = args.out_dir.join("manifest.json");
    arena_recap::write_manifest(&manifest_path, &report.generated)?;

    eprintln!(
        "wrote {} of {} videos, manifest {}",
        report.generated.len(),
        entries.len(),
        manifest_path.display()
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let ctx = load_context(&args.input)?;
    let entries = arena_recap::load_replays(&args.input.in_path)?;
    let replay = entries
        .get(args.replay)
        .with_context(|| {
            format!(
                "replay {} out of range (batch has {})",
                args.replay,
                entries.len()
            )
        })?
        .replay()?;

    let mut rasterizer = ctx.rasterizer()?;
    let frame = arena_recap::render_frame_at(
        replay,
        &ctx.config.schedule,
        &mut rasterizer,
        arena_recap::FrameIndex(args.frame),
    )?;

    arena_recap::encode::ffmpeg::ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
