//! Arena recap turns sparse match replays into fixed-rate highlight videos.
//!
//! A replay's samples are expanded into a dense frame sequence by the [`TimelineScheduler`]:
//!
//! - Index the replay's highlights, kills and decisions ([`EventIndex`])
//! - Walk the samples in order, holding each for a fixed number of frames while a
//!   [`PresentationTracker`] decides which overlays are visible
//! - Rasterize every [`FrameDescriptor`] and hand the stored frames to an [`Encoder`]
//!
//! [`render_batch`] runs this for every replay in a batch and reports per-replay failures
//! without aborting.
#![forbid(unsafe_code)]

mod foundation;

/// Recap configuration file.
pub mod config;
/// Scratch frame storage and video encoding.
pub mod encode;
/// Per-replay and batch rendering entry points.
pub mod pipeline;
/// Rasterizer seam, palette and the CPU reference rasterizer.
pub mod render;
pub mod replay;
/// Event index, presentation tracker and frame scheduler.
pub mod timeline;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, Point, Rect, Rgba8};
pub use crate::foundation::error::{RecapError, RecapResult};

pub use crate::config::RecapConfig;
pub use crate::encode::ffmpeg::{EncodeOpts, Encoder, FfmpegEncoder, is_ffmpeg_on_path};
pub use crate::encode::scratch::FrameStore;
pub use crate::pipeline::{
    BatchFailure, BatchOpts, BatchReport, ManifestEntry, RenderContext, RenderStats,
    RenderedVideo, render_batch, render_frame_at, render_replay, write_manifest,
};
pub use crate::render::backend::{FrameRGBA, Rasterizer};
pub use crate::render::cpu::{CpuRasterOpts, SchematicRasterizer};
pub use crate::render::palette::{AgentRoster, Palette};
pub use crate::replay::events::{DecisionEvent, HighlightEvent, HighlightKind, KillEvent};
pub use crate::replay::model::{
    AgentState, BatchEntry, MatchId, ProjectileState, Replay, ReplaySample, RosterAgent,
    load_replays,
};
pub use crate::timeline::index::{EventIndex, IndexReport};
pub use crate::timeline::schedule::{
    BattleFrame, FrameDescriptor, FrameKind, IntroCard, OutroCard, ScheduleConfig,
    SegmentLayout, TickMapping, TimelineScheduler,
};
pub use crate::timeline::tracker::{PresentationTracker, TrackerConfig};
