use crate::foundation::error::{RecapError, RecapResult};
use crate::replay::events::{HighlightEvent, millis_value};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Match identifier; upstream producers emit either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchId {
    /// Numeric id.
    Number(u64),
    /// Free-form id.
    Text(String),
}

impl Default for MatchId {
    fn default() -> Self {
        Self::Number(0)
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_health() -> f64 {
    100.0
}

fn default_weapon() -> String {
    "beam".to_owned()
}

// Sample timestamps follow the same integer-or-float millisecond rule as event records.
fn sample_timestamp<'de, D>(d: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    if v.is_null() {
        return Ok(0);
    }
    millis_value(&v).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "timestamp must be a non-negative number of milliseconds, got {v}"
        ))
    })
}

/// One agent as captured in a single replay sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    /// Agent name, unique within a replay.
    pub name: String,
    /// Arena-space x.
    #[serde(default)]
    pub x: f64,
    /// Arena-space z.
    #[serde(default)]
    pub z: f64,
    #[serde(default = "default_true")]
    pub is_alive: bool,
    #[serde(default = "default_health")]
    pub health: f64,
    #[serde(default = "default_health")]
    pub max_health: f64,
    #[serde(default)]
    pub kills: u32,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default = "default_weapon")]
    pub weapon: String,
    /// Facing angle in radians.
    #[serde(default)]
    pub rotation: f64,
    /// Optional `#RRGGBB` display color.
    #[serde(default)]
    pub color: Option<String>,
}

impl AgentState {
    /// Health as a fraction of max health, clamped to `[0, 1]`.
    pub fn health_ratio(&self) -> f64 {
        (self.health / self.max_health.max(1.0)).clamp(0.0, 1.0)
    }
}

/// One projectile as captured in a single replay sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileState {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default = "default_weapon")]
    pub weapon: String,
}

/// One sparse game-state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySample {
    /// Milliseconds since match start.
    #[serde(default, deserialize_with = "sample_timestamp")]
    pub timestamp: u64,
    #[serde(default)]
    pub agents: Vec<AgentState>,
    #[serde(default)]
    pub projectiles: Vec<ProjectileState>,
}

/// Match roster entry (display metadata only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterAgent {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A full match replay: sparse samples, raw event records and match metadata.
///
/// Event collections are kept as raw JSON records. They are produced independently by the game
/// server and converted best-effort by [`crate::EventIndex`], so a single malformed record never
/// rejects the whole replay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replay {
    #[serde(default)]
    pub match_id: MatchId,
    #[serde(default)]
    pub mvp_name: String,
    #[serde(default)]
    pub mvp_kills: u32,
    #[serde(default)]
    pub mvp_tokens: u64,
    #[serde(default)]
    pub total_kills: u32,
    #[serde(default)]
    pub agents: Vec<RosterAgent>,
    #[serde(default)]
    pub frames: Vec<ReplaySample>,
    #[serde(default)]
    pub highlights: Vec<Value>,
    #[serde(default)]
    pub events: Vec<Value>,
    #[serde(default)]
    pub combat_log: Vec<Value>,
}

impl Replay {
    /// Parse one replay from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> RecapResult<Self> {
        serde_json::from_reader(r).map_err(|e| RecapError::serde(format!("parse replay JSON: {e}")))
    }

    /// Parse one replay from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> RecapResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            RecapError::validation(format!("open replay JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check sample ordering and per-sample agent identity.
    pub fn validate(&self) -> RecapResult<()> {
        for (i, pair) in self.frames.windows(2).enumerate() {
            if pair[1].timestamp < pair[0].timestamp {
                return Err(RecapError::validation(format!(
                    "match {}: sample {} timestamp {} precedes sample {} timestamp {}",
                    self.match_id,
                    i + 1,
                    pair[1].timestamp,
                    i,
                    pair[0].timestamp
                )));
            }
        }

        for (i, sample) in self.frames.iter().enumerate() {
            let mut seen = HashSet::with_capacity(sample.agents.len());
            for agent in &sample.agents {
                if !seen.insert(agent.name.as_str()) {
                    return Err(RecapError::validation(format!(
                        "match {}: agent '{}' appears twice in sample {i}",
                        self.match_id, agent.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// First `n` well-formed highlights in log order.
    pub fn top_highlights(&self, n: usize) -> Vec<HighlightEvent> {
        self.highlights
            .iter()
            .filter_map(|record| HighlightEvent::from_record(record).ok())
            .take(n)
            .collect()
    }

    /// Roster color for `name`, if the replay carries a valid one.
    pub fn roster_color(&self, name: &str) -> Option<&str> {
        self.agents
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.color.as_deref())
    }

    /// File name for this replay's video at `batch_position` (zero-based) within a batch.
    pub fn output_file_name(&self, batch_position: usize) -> String {
        format!(
            "battle_recap_{}_{}.mp4",
            batch_position + 1,
            self.mvp_name.to_lowercase()
        )
    }
}

/// One element of a replay batch, parsed independently of its neighbours.
#[derive(Debug, Clone)]
pub enum BatchEntry {
    Loaded(Replay),
    /// The element is not a valid replay.
    Rejected { match_id: MatchId, reason: String },
}

impl BatchEntry {
    /// Convert one raw batch element. A parse failure is kept as [`BatchEntry::Rejected`],
    /// carrying the element's `matchId` when it has a readable one.
    pub fn from_value(value: Value) -> Self {
        let match_id = value
            .get("matchId")
            .and_then(|id| MatchId::deserialize(id).ok())
            .unwrap_or_default();
        match Replay::deserialize(value) {
            Ok(replay) => Self::Loaded(replay),
            Err(e) => Self::Rejected {
                match_id,
                reason: e.to_string(),
            },
        }
    }

    pub fn match_id(&self) -> &MatchId {
        match self {
            Self::Loaded(replay) => &replay.match_id,
            Self::Rejected { match_id, .. } => match_id,
        }
    }

    /// The parsed replay, or a [`RecapError::Serde`] describing why it was rejected.
    pub fn replay(&self) -> RecapResult<&Replay> {
        match self {
            Self::Loaded(replay) => Ok(replay),
            Self::Rejected { match_id, reason } => Err(RecapError::serde(format!(
                "match {match_id}: invalid replay record: {reason}"
            ))),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

impl From<Replay> for BatchEntry {
    fn from(replay: Replay) -> Self {
        Self::Loaded(replay)
    }
}

/// Parse a batch of replays (a JSON array) from disk.
///
/// Only an unreadable file or a document that is not an array fails the call. Each element is
/// converted on its own, so a malformed replay becomes a [`BatchEntry::Rejected`] at its
/// position and the rest of the batch still loads.
pub fn load_replays(path: impl AsRef<Path>) -> RecapResult<Vec<BatchEntry>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| {
        RecapError::validation(format!("open replay batch '{}': {e}", path.display()))
    })?;
    let raw: Vec<Value> = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
        RecapError::serde(format!("parse replay batch '{}': {e}", path.display()))
    })?;
    let entries: Vec<BatchEntry> = raw.into_iter().map(BatchEntry::from_value).collect();

    let rejected = entries.iter().filter(|e| !e.is_loaded()).count();
    if rejected > 0 {
        tracing::warn!(
            path = %path.display(),
            rejected,
            total = entries.len(),
            "replay batch contains invalid records"
        );
    }
    Ok(entries)
}

#[cfg(test)]
#[path = "../../tests/unit/replay/model.rs"]
mod tests;
