use crate::encode::ffmpeg::EncodeOpts;
use crate::foundation::core::Canvas;
use crate::foundation::error::{RecapError, RecapResult};
use crate::render::palette::Palette;
use crate::timeline::schedule::ScheduleConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Everything tunable about a recap run, loadable from one JSON file.
///
/// Every section defaults independently, so `{"schedule": {"hold_frames": 30}}` changes only the
/// hold length.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecapConfig {
    pub canvas: Canvas,
    pub schedule: ScheduleConfig,
    pub encode: EncodeOpts,
    pub palette: Palette,
}

impl RecapConfig {
    pub fn from_path(path: impl AsRef<Path>) -> RecapResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            RecapError::validation(format!("open config JSON '{}': {e}", path.display()))
        })?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| RecapError::serde(format!("parse config JSON '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> RecapResult<()> {
        self.canvas.validate()?;
        self.schedule.validate()?;
        self.encode.validate()
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
