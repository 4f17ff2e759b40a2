use crate::foundation::error::{RecapError, RecapResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_HIGHLIGHT_DURATION_MS: u64 = 3000;
const CAPTION_MAX_CHARS: usize = 100;

/// Closed set of highlight categories; unknown tags collapse to `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    FirstBlood,
    Kill,
    Clutch,
    MultiKill,
    Default,
}

impl HighlightKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "first_blood" => Self::FirstBlood,
            "kill" => Self::Kill,
            "clutch" => Self::Clutch,
            "multi_kill" => Self::MultiKill,
            _ => Self::Default,
        }
    }
}

/// A titled moment shown as a banner during `[timestamp, timestamp + duration)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightEvent {
    pub timestamp: u64,
    pub duration: u64,
    pub kind: HighlightKind,
    pub title: String,
    pub description: String,
}

impl HighlightEvent {
    /// Exclusive end of the presentation window.
    pub fn window_end(&self) -> u64 {
        self.timestamp.saturating_add(self.duration)
    }

    /// Whether the window has fully elapsed at `t`.
    pub fn elapsed_at(&self, t: u64) -> bool {
        t >= self.window_end()
    }

    /// Convert one raw highlight record.
    pub fn from_record(record: &Value) -> RecapResult<Self> {
        let timestamp = millis_field(record, "timestamp")?
            .ok_or_else(|| RecapError::malformed_event("highlight without timestamp"))?;
        let duration = millis_field(record, "duration")?.unwrap_or(DEFAULT_HIGHLIGHT_DURATION_MS);
        if duration == 0 {
            return Err(RecapError::malformed_event(format!(
                "highlight at {timestamp}ms has zero duration"
            )));
        }
        Ok(Self {
            timestamp,
            duration,
            kind: HighlightKind::from_tag(str_field(record, "type").unwrap_or("")),
            title: str_field(record, "title").unwrap_or("").to_owned(),
            description: str_field(record, "description").unwrap_or("").to_owned(),
        })
    }
}

/// A kill; triggers a decaying flash rather than a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillEvent {
    pub timestamp: u64,
}

impl KillEvent {
    /// Convert one raw event record. `Ok(None)` means the record is some other event type.
    pub fn from_record(record: &Value) -> RecapResult<Option<Self>> {
        if str_field(record, "type") != Some("kill") {
            return Ok(None);
        }
        let timestamp = millis_field(record, "timestamp")?
            .ok_or_else(|| RecapError::malformed_event("kill event without timestamp"))?;
        Ok(Some(Self { timestamp }))
    }
}

/// One AI decision from the combat log, correlated to a sample by tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub tick: u64,
    pub actor: String,
    pub rationale: String,
}

impl DecisionEvent {
    /// Convert one raw combat-log record. `Ok(None)` means the entry is not a decision.
    pub fn from_record(record: &Value) -> RecapResult<Option<Self>> {
        if str_field(record, "type") != Some("decision") {
            return Ok(None);
        }
        let tick = record
            .get("tick")
            .and_then(Value::as_u64)
            .ok_or_else(|| RecapError::malformed_event("decision without integer tick"))?;
        Ok(Some(Self {
            tick,
            actor: str_field(record, "actor").unwrap_or("?").to_owned(),
            rationale: str_field(record, "detail").unwrap_or("").to_owned(),
        }))
    }

    /// Rationale as shown on screen: `"NAME: "` prefix and quotes removed, long text truncated.
    pub fn caption(&self) -> String {
        let text = match self.rationale.split_once(':') {
            Some((_, rest)) => rest.trim().trim_matches('"'),
            None => self.rationale.as_str(),
        };
        if text.chars().count() > CAPTION_MAX_CHARS {
            let mut out: String = text.chars().take(CAPTION_MAX_CHARS).collect();
            out.push_str("...");
            out
        } else {
            text.to_owned()
        }
    }
}

fn str_field<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

// Millisecond fields arrive as integers or floats depending on the producer.
fn millis_field(record: &Value, key: &str) -> RecapResult<Option<u64>> {
    let Some(v) = record.get(key) else {
        return Ok(None);
    };
    if v.is_null() {
        return Ok(None);
    }
    match millis_value(v) {
        Some(ms) => Ok(Some(ms)),
        None => Err(RecapError::malformed_event(format!(
            "field '{key}' must be a non-negative number of milliseconds, got {v}"
        ))),
    }
}

/// A non-negative integer or finite float, rounded to whole milliseconds.
pub(crate) fn millis_value(v: &Value) -> Option<u64> {
    if let Some(ms) = v.as_u64() {
        return Some(ms);
    }
    match v.as_f64() {
        Some(ms) if ms.is_finite() && ms >= 0.0 => Some(ms.round() as u64),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/replay/events.rs"]
mod tests;
