use crate::foundation::core::{FrameIndex, Fps};
use crate::foundation::error::{RecapError, RecapResult};
use crate::replay::events::{DecisionEvent, HighlightEvent};
use crate::replay::model::{Replay, ReplaySample};
use crate::timeline::index::EventIndex;
use crate::timeline::tracker::{PresentationTracker, SampleUpdate, TrackerConfig};
use serde::{Deserialize, Serialize};

/// How a sample is correlated with decision-log ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TickMapping {
    /// Tick equals the sample's position in the replay.
    #[default]
    SampleIndex,
    /// Tick equals `sample_index / samples_per_tick`.
    Stride { samples_per_tick: u64 },
    /// Tick equals `timestamp / ms_per_tick`.
    Timestamp { ms_per_tick: u64 },
}

impl TickMapping {
    pub fn tick_for(self, sample_index: usize, sample: &ReplaySample) -> u64 {
        match self {
            Self::SampleIndex => sample_index as u64,
            Self::Stride { samples_per_tick } => sample_index as u64 / samples_per_tick.max(1),
            Self::Timestamp { ms_per_tick } => sample.timestamp / ms_per_tick.max(1),
        }
    }

    pub fn validate(self) -> RecapResult<()> {
        match self {
            Self::Stride {
                samples_per_tick: 0,
            } => Err(RecapError::validation("tick stride must be > 0")),
            Self::Timestamp { ms_per_tick: 0 } => {
                Err(RecapError::validation("tick ms_per_tick must be > 0"))
            }
            _ => Ok(()),
        }
    }
}

/// Output timing and overlay pacing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub fps: Fps,
    pub intro_secs: u32,
    pub outro_secs: u32,
    /// Output frames emitted per replay sample.
    pub hold_frames: u32,
    /// Share of a hold run (percent) during which the highlight banner is shown.
    pub highlight_visible_pct: u32,
    /// Share of a hold run (percent) during which decision captions are shown.
    pub decision_visible_pct: u32,
    pub tick_mapping: TickMapping,
    pub tracker: TrackerConfig,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            intro_secs: 3,
            outro_secs: 4,
            hold_frames: 45,
            highlight_visible_pct: 70,
            decision_visible_pct: 80,
            tick_mapping: TickMapping::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> RecapResult<()> {
        self.fps.validate()?;
        if self.hold_frames == 0 {
            return Err(RecapError::validation("hold_frames must be > 0"));
        }
        if self.highlight_visible_pct > 100 || self.decision_visible_pct > 100 {
            return Err(RecapError::validation(
                "overlay visibility percentages must be within 0..=100",
            ));
        }
        self.tick_mapping.validate()
    }

    pub fn intro_frames(&self) -> u64 {
        self.fps.secs_to_frames(self.intro_secs)
    }

    pub fn outro_frames(&self) -> u64 {
        self.fps.secs_to_frames(self.outro_secs)
    }
}

/// Frame counts of the three output segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentLayout {
    pub intro_frames: u64,
    pub sample_count: u64,
    pub hold_frames: u64,
    pub outro_frames: u64,
}

impl SegmentLayout {
    pub fn battle_frames(&self) -> u64 {
        self.sample_count * self.hold_frames
    }

    pub fn battle_start(&self) -> u64 {
        self.intro_frames
    }

    pub fn outro_start(&self) -> u64 {
        self.intro_frames + self.battle_frames()
    }

    pub fn total(&self) -> u64 {
        self.outro_start() + self.outro_frames
    }
}

/// Title/roster card state; its fade is independent of the tracker.
#[derive(Clone, Copy, Debug)]
pub struct IntroCard<'a> {
    pub replay: &'a Replay,
    /// Position within the intro segment.
    pub frame: u64,
    pub frame_count: u64,
    /// Fade-in in `[0, 1]`, reaching 1 at 40% of the segment.
    pub fade: f64,
}

/// Summary card state; its fade is independent of the tracker.
#[derive(Clone, Copy, Debug)]
pub struct OutroCard<'a> {
    pub replay: &'a Replay,
    /// Position within the outro segment.
    pub frame: u64,
    pub frame_count: u64,
    /// Fade-in in `[0, 1]`, reaching 1 at 50% of the segment.
    pub fade: f64,
}

/// Visual state of one battle frame.
#[derive(Clone, Copy, Debug)]
pub struct BattleFrame<'a> {
    pub sample_index: usize,
    pub sample_count: usize,
    /// Position within the sample's hold run.
    pub hold_index: u32,
    pub sample: &'a ReplaySample,
    /// Active highlight, gated to the first part of the hold run.
    pub highlight: Option<&'a HighlightEvent>,
    pub kill_flash: u8,
    /// Visible captions, gated to the first part of the hold run.
    pub decisions: &'a [DecisionEvent],
}

#[derive(Clone, Copy, Debug)]
pub enum FrameKind<'a> {
    Intro(IntroCard<'a>),
    Battle(BattleFrame<'a>),
    Outro(OutroCard<'a>),
}

/// Everything the rasterizer needs for one output frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameDescriptor<'a> {
    pub index: FrameIndex,
    /// Total output frames for the replay.
    pub total: u64,
    pub kind: FrameKind<'a>,
}

impl FrameDescriptor<'_> {
    /// Playback progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.index.0 as f64 / self.total.saturating_sub(1).max(1) as f64
    }
}

/// Expands a replay's sparse samples into the dense output frame sequence.
///
/// Yields one [`FrameDescriptor`] per output frame in strictly increasing index order: the intro
/// card, `hold_frames` frames per sample, then the outro card. The embedded
/// [`PresentationTracker`] is advanced at each sample boundary and its flash decays once per
/// battle frame.
pub struct TimelineScheduler<'a> {
    replay: &'a Replay,
    cfg: ScheduleConfig,
    layout: SegmentLayout,
    tracker: PresentationTracker<'a>,
    next: u64,
}

impl<'a> TimelineScheduler<'a> {
    /// Build a scheduler. An empty sample list is reported as [`RecapError::MissingData`].
    pub fn new(replay: &'a Replay, index: &'a EventIndex, cfg: &ScheduleConfig) -> RecapResult<Self> {
        cfg.validate()?;
        if replay.frames.is_empty() {
            return Err(RecapError::missing_data(format!(
                "match {} has no sample frames",
                replay.match_id
            )));
        }

        let layout = SegmentLayout {
            intro_frames: cfg.intro_frames(),
            sample_count: replay.frames.len() as u64,
            hold_frames: u64::from(cfg.hold_frames),
            outro_frames: cfg.outro_frames(),
        };

        Ok(Self {
            replay,
            cfg: cfg.clone(),
            layout,
            tracker: PresentationTracker::new(index, cfg.tracker.clone()),
            next: 0,
        })
    }

    pub fn layout(&self) -> SegmentLayout {
        self.layout
    }

    pub fn total_frames(&self) -> u64 {
        self.layout.total()
    }

    fn intro(&self, i: u64) -> FrameKind<'a> {
        let n = self.layout.intro_frames;
        FrameKind::Intro(IntroCard {
            replay: self.replay,
            frame: i,
            frame_count: n,
            fade: fade_in(i, n, 0.4),
        })
    }

    fn outro(&self, i: u64) -> FrameKind<'a> {
        let n = self.layout.outro_frames;
        FrameKind::Outro(OutroCard {
            replay: self.replay,
            frame: i,
            frame_count: n,
            fade: fade_in(i, n, 0.5),
        })
    }

    fn battle(&mut self, offset: u64) -> RecapResult<FrameKind<'a>> {
        let hold = self.layout.hold_frames;
        let gi = (offset / hold) as usize;
        let hi = offset % hold;
        let replay = self.replay;
        let sample = &replay.frames[gi];

        if hi == 0 {
            let tick = self.cfg.tick_mapping.tick_for(gi, sample);
            let update = self.tracker.advance_sample(sample.timestamp, tick)?;
            if update != SampleUpdate::default() {
                tracing::debug!(
                    sample = gi,
                    timestamp_ms = sample.timestamp,
                    tick,
                    ?update,
                    "presentation state changed"
                );
            }
        }

        let kill_flash = self.tracker.decay_flash();
        let show_highlight = hi * 100 < hold * u64::from(self.cfg.highlight_visible_pct);
        let show_decisions = hi * 100 < hold * u64::from(self.cfg.decision_visible_pct);

        Ok(FrameKind::Battle(BattleFrame {
            sample_index: gi,
            sample_count: replay.frames.len(),
            hold_index: hi as u32,
            sample,
            highlight: self.tracker.active_highlight().filter(|_| show_highlight),
            kill_flash,
            decisions: if show_decisions {
                self.tracker.visible_decisions()
            } else {
                &[]
            },
        }))
    }
}

impl<'a> Iterator for TimelineScheduler<'a> {
    type Item = RecapResult<FrameDescriptor<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.layout.total();
        if self.next >= total {
            return None;
        }
        let i = self.next;
        self.next += 1;

        let kind = if i < self.layout.battle_start() {
            Ok(self.intro(i))
        } else if i < self.layout.outro_start() {
            if i == self.layout.battle_start() {
                tracing::debug!(frame = i, "battle segment");
            }
            self.battle(i - self.layout.battle_start())
        } else {
            if i == self.layout.outro_start() {
                tracing::debug!(frame = i, "outro segment");
            }
            Ok(self.outro(i - self.layout.outro_start()))
        };

        match kind {
            Ok(kind) => Some(Ok(FrameDescriptor {
                index: FrameIndex(i),
                total,
                kind,
            })),
            Err(e) => {
                self.next = total;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.layout.total().saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TimelineScheduler<'_> {}

fn fade_in(frame: u64, frame_count: u64, ramp_share: f64) -> f64 {
    let ramp = frame_count as f64 * ramp_share;
    if ramp <= 0.0 {
        return 1.0;
    }
    (frame as f64 / ramp).min(1.0)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/schedule.rs"]
mod tests;
