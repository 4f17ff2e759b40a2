use crate::foundation::error::{RecapError, RecapResult};
use crate::replay::events::{DecisionEvent, HighlightEvent};
use crate::timeline::index::EventIndex;
use serde::{Deserialize, Serialize};

/// Tunables for [`PresentationTracker`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// A highlight activates when its start is strictly within this distance of the sample time.
    pub highlight_tolerance_ms: u64,
    /// A kill triggers the flash when strictly within this distance of the sample time.
    pub kill_tolerance_ms: u64,
    /// Flash intensity right after a trigger.
    pub flash_peak: u8,
    /// Intensity removed per output frame.
    pub flash_decay: u8,
    /// Maximum number of decision captions shown at once.
    pub max_captions: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            highlight_tolerance_ms: 5000,
            kill_tolerance_ms: 3000,
            flash_peak: 80,
            flash_decay: 4,
            max_captions: 2,
        }
    }
}

/// The highlight currently eligible for the banner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveHighlight<'a> {
    pub event: &'a HighlightEvent,
    /// Exclusive end of the highlight's window.
    pub ends_at_ms: u64,
}

/// What changed at one sample boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleUpdate {
    pub highlight_expired: bool,
    pub highlight_activated: bool,
    pub flash_triggered: bool,
    pub decisions_replaced: bool,
}

/// Forward-only presentation state: active highlight, kill-flash intensity, visible captions.
///
/// Sample-granularity rules run in [`advance_sample`](Self::advance_sample); the flash decay is the
/// only output-frame-granularity rule ([`decay_flash`](Self::decay_flash)). State only ever looks at
/// events near the current sample, never at history.
#[derive(Clone, Debug)]
pub struct PresentationTracker<'a> {
    index: &'a EventIndex,
    cfg: TrackerConfig,

    active: Option<ActiveHighlight<'a>>,
    kill_flash: u8,
    decisions: &'a [DecisionEvent],
    last_timestamp: Option<u64>,
}

impl<'a> PresentationTracker<'a> {
    pub fn new(index: &'a EventIndex, cfg: TrackerConfig) -> Self {
        Self {
            index,
            cfg,
            active: None,
            kill_flash: 0,
            decisions: &[],
            last_timestamp: None,
        }
    }

    /// Apply the sample-boundary transitions for a sample at `timestamp_ms` mapped to `tick`.
    ///
    /// Order: highlight expiry, highlight activation, kill-flash trigger, decision replacement.
    /// Timestamps must not decrease between calls.
    pub fn advance_sample(&mut self, timestamp_ms: u64, tick: u64) -> RecapResult<SampleUpdate> {
        if let Some(last) = self.last_timestamp
            && timestamp_ms < last
        {
            return Err(RecapError::validation(format!(
                "presentation tracker cannot rewind from {last}ms to {timestamp_ms}ms"
            )));
        }
        self.last_timestamp = Some(timestamp_ms);

        let mut update = SampleUpdate::default();

        if let Some(active) = self.active
            && timestamp_ms >= active.ends_at_ms
        {
            self.active = None;
            update.highlight_expired = true;
        }

        // Scan runs oldest start first; the most recently started eligible highlight wins.
        // Highlights whose window already elapsed are not eligible, so an expired banner never
        // comes back.
        let index = self.index;
        if let Some(event) = index
            .highlights_near(timestamp_ms, self.cfg.highlight_tolerance_ms)
            .filter(|hl| !hl.elapsed_at(timestamp_ms))
            .last()
        {
            self.active = Some(ActiveHighlight {
                event,
                ends_at_ms: event.window_end(),
            });
            update.highlight_activated = true;
        }

        if index.kill_near(timestamp_ms, self.cfg.kill_tolerance_ms) {
            self.kill_flash = self.cfg.flash_peak;
            update.flash_triggered = true;
        }

        if let Some(entries) = index.decisions_at(tick) {
            let n = entries.len().min(self.cfg.max_captions);
            self.decisions = &entries[..n];
            update.decisions_replaced = true;
        }

        Ok(update)
    }

    /// Apply one output frame of flash decay, floored at zero. Returns the new intensity.
    pub fn decay_flash(&mut self) -> u8 {
        self.kill_flash = self.kill_flash.saturating_sub(self.cfg.flash_decay);
        self.kill_flash
    }

    pub fn active_highlight(&self) -> Option<&'a HighlightEvent> {
        self.active.map(|a| a.event)
    }

    pub fn active(&self) -> Option<ActiveHighlight<'a>> {
        self.active
    }

    pub fn kill_flash(&self) -> u8 {
        self.kill_flash
    }

    pub fn visible_decisions(&self) -> &'a [DecisionEvent] {
        self.decisions
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/tracker.rs"]
mod tests;
