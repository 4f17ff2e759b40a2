use crate::replay::events::{DecisionEvent, HighlightEvent, KillEvent};
use crate::replay::model::Replay;
use serde_json::Value;
use std::collections::BTreeMap;

/// Accepted/skipped record counts for one event collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionReport {
    /// Records converted into the index.
    pub accepted: usize,
    /// Malformed records discarded.
    pub skipped: usize,
}

/// Outcome of [`EventIndex::build`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub highlights: CollectionReport,
    pub kills: CollectionReport,
    pub decisions: CollectionReport,
}

impl IndexReport {
    pub fn skipped_total(&self) -> usize {
        self.highlights.skipped + self.kills.skipped + self.decisions.skipped
    }
}

/// Time/tick lookup structures over a replay's event logs.
///
/// Highlights are keyed by start time in an ordered map, so scans run oldest-to-newest and the
/// most recently started match is found last. Kills are a timestamp-sorted sequence queried by
/// window. Decisions are grouped by tick in log order.
#[derive(Clone, Debug, Default)]
pub struct EventIndex {
    highlights: BTreeMap<u64, HighlightEvent>,
    kills: Vec<KillEvent>,
    decisions: BTreeMap<u64, Vec<DecisionEvent>>,
}

impl EventIndex {
    /// Index all three event collections of `replay`, discarding malformed records.
    pub fn build(replay: &Replay) -> (Self, IndexReport) {
        let (highlights, hl_report) = index_highlights(&replay.highlights);
        let (kills, kill_report) = index_kills(&replay.events);
        let (decisions, dec_report) = index_decisions(&replay.combat_log);

        let report = IndexReport {
            highlights: hl_report,
            kills: kill_report,
            decisions: dec_report,
        };
        if report.skipped_total() > 0 {
            tracing::warn!(
                match_id = %replay.match_id,
                highlights = report.highlights.skipped,
                kills = report.kills.skipped,
                decisions = report.decisions.skipped,
                "skipped malformed event records"
            );
        }

        (
            Self {
                highlights,
                kills,
                decisions,
            },
            report,
        )
    }

    pub fn highlight_count(&self) -> usize {
        self.highlights.len()
    }

    pub fn kill_count(&self) -> usize {
        self.kills.len()
    }

    /// Highlights whose start lies strictly within `tolerance_ms` of `t`, oldest start first.
    pub fn highlights_near(
        &self,
        t: u64,
        tolerance_ms: u64,
    ) -> impl DoubleEndedIterator<Item = &HighlightEvent> + '_ {
        let bounds = strict_window(t, tolerance_ms);
        bounds
            .into_iter()
            .flat_map(move |(lo, hi)| self.highlights.range(lo..=hi).map(|(_, hl)| hl))
    }

    /// Whether any kill lies strictly within `tolerance_ms` of `t`.
    pub fn kill_near(&self, t: u64, tolerance_ms: u64) -> bool {
        let Some((lo, hi)) = strict_window(t, tolerance_ms) else {
            return false;
        };
        let first = self.kills.partition_point(|k| k.timestamp < lo);
        self.kills.get(first).is_some_and(|k| k.timestamp <= hi)
    }

    /// Decisions logged for `tick`, in log order.
    pub fn decisions_at(&self, tick: u64) -> Option<&[DecisionEvent]> {
        self.decisions.get(&tick).map(Vec::as_slice)
    }
}

// Inclusive bounds for `|x - t| < tolerance`; `None` when the window is empty.
fn strict_window(t: u64, tolerance_ms: u64) -> Option<(u64, u64)> {
    let reach = tolerance_ms.checked_sub(1)?;
    Some((t.saturating_sub(reach), t.saturating_add(reach)))
}

/// Map highlight start time to highlight. Equal start times keep the later record.
pub fn index_highlights(records: &[Value]) -> (BTreeMap<u64, HighlightEvent>, CollectionReport) {
    let mut out = BTreeMap::new();
    let mut report = CollectionReport::default();
    for record in records {
        match HighlightEvent::from_record(record) {
            Ok(hl) => {
                if let Some(prev) = out.insert(hl.timestamp, hl) {
                    tracing::debug!(
                        timestamp = prev.timestamp,
                        title = %prev.title,
                        "highlight replaced by later record with same timestamp"
                    );
                }
                report.accepted += 1;
            }
            Err(e) => {
                tracing::debug!(error = %e, "dropping highlight record");
                report.skipped += 1;
            }
        }
    }
    (out, report)
}

/// Kill events sorted by timestamp; ties keep log order.
pub fn index_kills(records: &[Value]) -> (Vec<KillEvent>, CollectionReport) {
    let mut out = Vec::new();
    let mut report = CollectionReport::default();
    for record in records {
        match KillEvent::from_record(record) {
            Ok(Some(kill)) => {
                out.push(kill);
                report.accepted += 1;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(error = %e, "dropping kill record");
                report.skipped += 1;
            }
        }
    }
    out.sort_by_key(|k| k.timestamp);
    (out, report)
}

/// Group decisions by tick, preserving log order within a tick.
pub fn index_decisions(
    records: &[Value],
) -> (BTreeMap<u64, Vec<DecisionEvent>>, CollectionReport) {
    let mut out: BTreeMap<u64, Vec<DecisionEvent>> = BTreeMap::new();
    let mut report = CollectionReport::default();
    for record in records {
        match DecisionEvent::from_record(record) {
            Ok(Some(decision)) => {
                out.entry(decision.tick).or_default().push(decision);
                report.accepted += 1;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(error = %e, "dropping decision record");
                report.skipped += 1;
            }
        }
    }
    (out, report)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/index.rs"]
mod tests;
