//! Encoding: scratch frame storage and the ffmpeg-backed video encoder.
//!
//! Rendered frames are written to a scoped scratch directory in strict index order, then turned
//! into one MP4 by a single encoder invocation.

/// `ffmpeg`-based encoder (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Scoped on-disk frame storage.
pub mod scratch;
