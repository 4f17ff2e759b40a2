use crate::config::RecapConfig;
use crate::encode::ffmpeg::{Encoder, ensure_parent_dir};
use crate::encode::scratch::FrameStore;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{RecapError, RecapResult};
use crate::render::backend::{FrameRGBA, Rasterizer};
use crate::render::cpu::{CpuRasterOpts, SchematicRasterizer};
use crate::render::palette::{AgentRoster, Palette};
use crate::replay::model::{BatchEntry, MatchId, Replay};
use crate::timeline::index::EventIndex;
use crate::timeline::schedule::{ScheduleConfig, TimelineScheduler};
use anyhow::Context as _;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared, read-only inputs for rendering one or many replays.
#[derive(Clone, Debug)]
pub struct RenderContext {
    pub config: RecapConfig,
    pub palette: Arc<Palette>,
    pub roster: AgentRoster,
}

impl RenderContext {
    pub fn new(config: RecapConfig, roster: AgentRoster) -> RecapResult<Self> {
        config.validate()?;
        Ok(Self {
            palette: Arc::new(config.palette.clone()),
            config,
            roster,
        })
    }

    /// A fresh CPU rasterizer for the configured canvas.
    pub fn rasterizer(&self) -> RecapResult<SchematicRasterizer> {
        SchematicRasterizer::new(
            CpuRasterOpts {
                canvas: self.config.canvas,
                ..CpuRasterOpts::default()
            },
            self.palette.clone(),
        )
    }

    fn roster_labels(&self, replay: &Replay) -> Vec<String> {
        replay
            .agents
            .iter()
            .map(|a| match self.roster.label_for(&a.name, &self.palette) {
                Some(label) => format!("{} ({label})", a.name),
                None => a.name.clone(),
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_total: u64,
    pub frames_rendered: u64,
    pub samples: u64,
    /// Malformed event records dropped while indexing.
    pub events_skipped: u64,
}

/// A finished per-replay video.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedVideo {
    pub path: PathBuf,
    pub stats: RenderStats,
}

/// Schedule, rasterize and encode one replay to `out_path`.
///
/// Pipeline:
/// 1. [`EventIndex::build`]
/// 2. [`TimelineScheduler`] over the replay's samples
/// 3. [`Rasterizer::render`] per descriptor, stored in a [`FrameStore`]
/// 4. one [`Encoder::encode`] call
///
/// A replay without samples fails with [`RecapError::MissingData`] before any scratch storage is
/// created. The scratch directory is removed on every exit path, and a failed encode removes
/// whatever it left at `out_path` unless that file existed beforehand.
#[tracing::instrument(
    skip(replay, ctx, rasterizer, encoder, out_path),
    fields(match_id = %replay.match_id, out = %out_path.display())
)]
pub fn render_replay<R, E>(
    replay: &Replay,
    ctx: &RenderContext,
    rasterizer: &mut R,
    encoder: &E,
    out_path: &Path,
) -> RecapResult<RenderedVideo>
where
    R: Rasterizer + ?Sized,
    E: Encoder + ?Sized,
{
    replay.validate()?;
    let (index, report) = EventIndex::build(replay);
    let scheduler = TimelineScheduler::new(replay, &index, &ctx.config.schedule)?;
    let layout = scheduler.layout();

    tracing::info!(
        mvp = %replay.mvp_name,
        agents = ?ctx.roster_labels(replay),
        samples = layout.sample_count,
        frames = layout.total(),
        highlights = index.highlight_count(),
        kills = index.kill_count(),
        "rendering replay"
    );

    let canvas = rasterizer.canvas();
    if canvas != ctx.config.canvas {
        tracing::debug!(
            width = canvas.width,
            height = canvas.height,
            "rasterizer canvas differs from configured canvas"
        );
    }

    let mut store = FrameStore::new(canvas, &ctx.config.encode)?;
    for desc in scheduler {
        let desc = desc?;
        let frame = rasterizer.render(&desc)?;
        store.push(desc.index, &frame)?;
    }

    let existed = out_path.exists();
    if let Err(e) = encoder.encode(&store, ctx.config.schedule.fps, out_path) {
        if !existed {
            remove_partial_output(out_path);
        }
        return Err(e);
    }

    let stats = RenderStats {
        frames_total: layout.total(),
        frames_rendered: store.len(),
        samples: layout.sample_count,
        events_skipped: report.skipped_total() as u64,
    };
    tracing::info!(frames = stats.frames_rendered, "replay encoded");
    Ok(RenderedVideo {
        path: out_path.to_path_buf(),
        stats,
    })
}

/// Render a single output frame of `replay`.
///
/// The tracker is driven forward from the first frame, so the result equals the frame a full
/// render would produce at that index.
pub fn render_frame_at<R>(
    replay: &Replay,
    cfg: &ScheduleConfig,
    rasterizer: &mut R,
    frame: FrameIndex,
) -> RecapResult<FrameRGBA>
where
    R: Rasterizer + ?Sized,
{
    replay.validate()?;
    let (index, _) = EventIndex::build(replay);
    let scheduler = TimelineScheduler::new(replay, &index, cfg)?;
    let total = scheduler.total_frames();
    if frame.0 >= total {
        return Err(RecapError::validation(format!(
            "frame {} out of range (replay has {total} frames)",
            frame.0
        )));
    }
    for desc in scheduler {
        let desc = desc?;
        if desc.index == frame {
            return rasterizer.render(&desc);
        }
    }
    Err(RecapError::validation(format!("frame {} was not scheduled", frame.0)))
}

/// Batch execution options.
#[derive(Clone, Debug, Default)]
pub struct BatchOpts {
    /// Render replays concurrently on a rayon pool.
    pub parallel: bool,
    /// Override rayon worker threads (parallel mode only).
    pub threads: Option<usize>,
}

/// One generated video, as listed in `manifest.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub file: String,
    pub match_id: MatchId,
    pub mvp_name: String,
    pub total_kills: u32,
}

/// A replay that produced no video.
#[derive(Debug)]
pub struct BatchFailure {
    /// Zero-based position in the batch input.
    pub position: usize,
    pub match_id: MatchId,
    pub error: RecapError,
}

/// Outcome of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub generated: Vec<ManifestEntry>,
    pub failures: Vec<BatchFailure>,
}

/// Render every replay into `out_dir`, continuing past per-replay failures.
///
/// Each replay gets its own tracker and scratch directory; rasterizers come from
/// `new_rasterizer`, one per worker. Rejected batch entries are reported as failures at their
/// position. Only setup problems (output directory, thread pool) fail the whole call.
pub fn render_batch<R, F, E>(
    entries: &[BatchEntry],
    out_dir: &Path,
    ctx: &RenderContext,
    new_rasterizer: F,
    encoder: &E,
    opts: &BatchOpts,
) -> RecapResult<BatchReport>
where
    R: Rasterizer,
    F: Fn() -> RecapResult<R> + Sync + Send,
    E: Encoder + ?Sized,
{
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory '{}'", out_dir.display()))?;

    let one = |rasterizer: &mut RecapResult<R>, position: usize, entry: &BatchEntry| {
        entry
            .replay()
            .and_then(|replay| {
                let file = replay.output_file_name(position);
                match rasterizer {
                    Ok(r) => render_replay(replay, ctx, r, encoder, &out_dir.join(&file))?,
                    Err(e) => {
                        return Err(RecapError::render(format!("rasterizer setup failed: {e}")));
                    }
                };
                Ok(ManifestEntry {
                    file,
                    match_id: replay.match_id.clone(),
                    mvp_name: replay.mvp_name.clone(),
                    total_kills: replay.total_kills,
                })
            })
            .map_err(|error| BatchFailure {
                position,
                match_id: entry.match_id().clone(),
                error,
            })
    };

    let outcomes: Vec<Result<ManifestEntry, BatchFailure>> = if opts.parallel {
        let pool = build_thread_pool(opts.threads)?;
        pool.install(|| {
            entries
                .par_iter()
                .enumerate()
                .map_init(&new_rasterizer, |r, (pos, entry)| one(r, pos, entry))
                .collect()
        })
    } else {
        let mut r = new_rasterizer();
        entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| one(&mut r, pos, entry))
            .collect()
    };

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(entry) => report.generated.push(entry),
            Err(failure) => {
                tracing::warn!(
                    position = failure.position,
                    match_id = %failure.match_id,
                    recoverable = failure.error.is_batch_recoverable(),
                    error = %failure.error,
                    "replay skipped"
                );
                report.failures.push(failure);
            }
        }
    }
    tracing::info!(
        generated = report.generated.len(),
        failed = report.failures.len(),
        "batch finished"
    );
    Ok(report)
}

/// Write `entries` as a pretty JSON array.
pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> RecapResult<()> {
    ensure_parent_dir(path)?;
    let f = File::create(path)
        .with_context(|| format!("failed to create manifest '{}'", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, entries)
        .map_err(|e| RecapError::serde(format!("write manifest '{}': {e}", path.display())))?;
    w.flush()
        .with_context(|| format!("failed to flush manifest '{}'", path.display()))?;
    Ok(())
}

fn remove_partial_output(path: &Path) {
    if let Err(err) = std::fs::remove_file(path)
        && err.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %err, "failed to remove partial video");
    }
}

fn build_thread_pool(threads: Option<usize>) -> RecapResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(RecapError::validation(
            "batch 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| RecapError::validation(format!("failed to build rayon thread pool: {e}")))
}
