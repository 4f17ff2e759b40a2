use crate::foundation::core::Rgba8;
use crate::foundation::error::{RecapError, RecapResult};
use crate::replay::events::HighlightKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const NEUTRAL: Rgba8 = Rgba8::rgb(200, 200, 200);

/// Read-only color and label lookups shared by every replay in a batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Fallback agent colors by agent name.
    pub agents: BTreeMap<String, Rgba8>,
    /// Display labels by model id.
    pub models: BTreeMap<String, String>,
    pub weapons: BTreeMap<String, Rgba8>,
    pub kill_flash: Rgba8,
}

impl Default for Palette {
    fn default() -> Self {
        let agents = [
            ("PHANTOM", Rgba8::rgb(255, 51, 102)),
            ("NEXUS-7", Rgba8::rgb(0, 240, 255)),
            ("TITAN", Rgba8::rgb(255, 165, 0)),
            ("CIPHER", Rgba8::rgb(180, 100, 255)),
            ("WRAITH", Rgba8::rgb(100, 255, 100)),
            ("AURORA", Rgba8::rgb(255, 220, 50)),
        ];
        let models = [
            ("gpt-4o", "GPT-4o"),
            ("claude-3-5-sonnet", "Claude 3.5"),
            ("llama-3.1-70b", "Llama 3.1"),
            ("mistral-large", "Mistral"),
            ("deepseek-v3", "DeepSeek"),
            ("gemini-flash", "Gemini 2.0"),
        ];
        let weapons = [
            ("beam", Rgba8::rgb(0, 200, 255)),
            ("railgun", Rgba8::rgb(255, 50, 50)),
            ("scatter", Rgba8::rgb(255, 200, 0)),
            ("rocket", Rgba8::rgb(255, 100, 0)),
            ("plasma", Rgba8::rgb(200, 0, 255)),
            ("void", Rgba8::rgb(150, 0, 200)),
        ];
        Self {
            agents: agents
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
            models: models
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            weapons: weapons
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
            kill_flash: Rgba8::rgb(255, 50, 50),
        }
    }
}

impl Palette {
    /// Agent color: the replay's `#hex` roster color when valid, else the palette entry, else grey.
    pub fn agent_color(&self, name: &str, roster_hex: Option<&str>) -> Rgba8 {
        roster_hex
            .and_then(|hex| Rgba8::from_hex(hex).ok())
            .or_else(|| self.agents.get(name).copied())
            .unwrap_or(NEUTRAL)
    }

    pub fn weapon_color(&self, weapon: &str) -> Rgba8 {
        self.weapons.get(weapon).copied().unwrap_or(NEUTRAL)
    }

    /// Display label for a model id; unknown ids are shown as-is.
    pub fn model_label<'a>(&'a self, model_id: &'a str) -> &'a str {
        self.models.get(model_id).map_or(model_id, String::as_str)
    }

    pub fn banner_color(&self, kind: HighlightKind) -> Rgba8 {
        match kind {
            HighlightKind::FirstBlood => Rgba8::rgba(200, 0, 0, 220),
            HighlightKind::Kill => Rgba8::rgba(255, 100, 0, 220),
            HighlightKind::Clutch => Rgba8::rgba(255, 215, 0, 220),
            HighlightKind::MultiKill => Rgba8::rgba(255, 50, 200, 220),
            HighlightKind::Default => Rgba8::rgba(50, 100, 200, 220),
        }
    }
}

/// Agent name to model id. Display metadata only; never consulted by scheduling.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentRoster(pub BTreeMap<String, String>);

impl AgentRoster {
    /// The standard arena lineup.
    pub fn arena_default() -> Self {
        Self(
            [
                ("PHANTOM", "gpt-4o"),
                ("NEXUS-7", "claude-3-5-sonnet"),
                ("TITAN", "llama-3.1-70b"),
                ("CIPHER", "mistral-large"),
                ("WRAITH", "deepseek-v3"),
                ("AURORA", "gemini-flash"),
            ]
            .into_iter()
            .map(|(a, m)| (a.to_owned(), m.to_owned()))
            .collect(),
        )
    }

    /// Load `{ "AGENT": "model-id", ... }` from disk.
    pub fn from_path(path: impl AsRef<Path>) -> RecapResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            RecapError::validation(format!("open roster JSON '{}': {e}", path.display()))
        })?;
        serde_json::from_reader(BufReader::new(f))
            .map_err(|e| RecapError::serde(format!("parse roster JSON '{}': {e}", path.display())))
    }

    pub fn model_for(&self, agent: &str) -> Option<&str> {
        self.0.get(agent).map(String::as_str)
    }

    /// Display label for `agent`'s model, if the agent is on the roster.
    pub fn label_for<'a>(&'a self, agent: &str, palette: &'a Palette) -> Option<&'a str> {
        self.model_for(agent).map(|m| palette.model_label(m))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/palette.rs"]
mod tests;
