use crate::encode::scratch::FrameStore;
use crate::foundation::core::{Fps, Rgba8};
use crate::foundation::error::{RecapError, RecapResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};

const STDERR_TAIL_CHARS: usize = 500;

/// Turns a replay's stored frames into one video file.
///
/// Called exactly once per replay, after every frame has been written. Implementations are shared
/// across batch workers.
pub trait Encoder: Sync {
    fn encode(&self, frames: &FrameStore, fps: Fps, out_path: &Path) -> RecapResult<()>;
}

/// Options for scratch storage and [`FfmpegEncoder`] MP4 output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOpts {
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// x264 preset.
    pub preset: String,
    /// x264 constant rate factor.
    pub crf: u8,
    /// Quality of the scratch JPEG frames (1..=100).
    pub jpeg_quality: u8,
    /// Background color used to flatten alpha (straight alpha).
    pub bg: Rgba8,
}

impl Default for EncodeOpts {
    fn default() -> Self {
        Self {
            overwrite: true,
            preset: "fast".to_owned(),
            crf: 23,
            jpeg_quality: 85,
            bg: Rgba8::rgb(0, 0, 0),
        }
    }
}

impl EncodeOpts {
    pub fn validate(&self) -> RecapResult<()> {
        if self.preset.trim().is_empty() {
            return Err(RecapError::validation("encode preset must be non-empty"));
        }
        if self.crf > 51 {
            return Err(RecapError::validation("encode crf must be within 0..=51"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(RecapError::validation("jpeg_quality must be within 1..=100"));
        }
        Ok(())
    }
}

/// Encoder that runs the system `ffmpeg` once over the stored image sequence.
#[derive(Clone, Debug, Default)]
pub struct FfmpegEncoder {
    opts: EncodeOpts,
}

impl FfmpegEncoder {
    pub fn new(opts: EncodeOpts) -> RecapResult<Self> {
        opts.validate()?;
        Ok(Self { opts })
    }

    pub fn opts(&self) -> &EncodeOpts {
        &self.opts
    }

    fn command(&self, input_pattern: &Path, fps: Fps, out_path: &Path) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.arg(if self.opts.overwrite { "-y" } else { "-n" });
        cmd.args(["-loglevel", "error", "-start_number", "0"]);
        cmd.args(["-framerate", &format!("{}/{}", fps.num, fps.den)]);
        cmd.arg("-i").arg(input_pattern);
        cmd.args([
            "-c:v",
            "libx264",
            "-preset",
            &self.opts.preset,
            "-crf",
            &self.opts.crf.to_string(),
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
        cmd.arg(out_path);
        cmd
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(&self, frames: &FrameStore, fps: Fps, out_path: &Path) -> RecapResult<()> {
        fps.validate()?;
        let canvas = frames.canvas();
        if !canvas.width.is_multiple_of(2) || !canvas.height.is_multiple_of(2) {
            return Err(RecapError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if frames.is_empty() {
            return Err(RecapError::encode("no frames to encode"));
        }

        ensure_parent_dir(out_path)?;
        if !self.opts.overwrite && out_path.exists() {
            return Err(RecapError::validation(format!(
                "output file '{}' already exists",
                out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(RecapError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let output = self
            .command(&frames.pattern(), fps, out_path)
            .output()
            .map_err(|e| {
                RecapError::encode(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecapError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr_tail(stderr.trim(), STDERR_TAIL_CHARS)
            )));
        }

        tracing::debug!(
            frames = frames.len(),
            out = %out_path.display(),
            "ffmpeg finished"
        );
        Ok(())
    }
}

/// Last `max_chars` characters of `s`.
fn stderr_tail(s: &str, max_chars: usize) -> &str {
    let n = s.chars().count();
    if n <= max_chars {
        return s;
    }
    match s.char_indices().nth(n - max_chars) {
        Some((at, _)) => &s[at..],
        None => s,
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> RecapResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
