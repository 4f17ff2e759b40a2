use crate::encode::ffmpeg::EncodeOpts;
use crate::foundation::core::{Canvas, FrameIndex, Rgba8};
use crate::foundation::error::{RecapError, RecapResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::backend::FrameRGBA;
use anyhow::Context as _;
use image::ImageEncoder as _;
use image::codecs::jpeg::JpegEncoder;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FRAME_PATTERN: &str = "frame_%06d.jpg";

/// Scratch directory holding one replay's rendered frames as numbered JPEGs.
///
/// The directory and its contents are removed when the store is dropped, whether the render
/// succeeded or not.
pub struct FrameStore {
    dir: TempDir,
    canvas: Canvas,
    jpeg_quality: u8,
    bg: Rgba8,
    rgb: Vec<u8>,
    len: u64,
}

impl FrameStore {
    pub fn new(canvas: Canvas, opts: &EncodeOpts) -> RecapResult<Self> {
        canvas.validate()?;
        if !(1..=100).contains(&opts.jpeg_quality) {
            return Err(RecapError::validation("jpeg_quality must be within 1..=100"));
        }
        let dir = tempfile::Builder::new()
            .prefix("arena-recap-")
            .tempdir()
            .context("failed to create scratch frame directory")?;
        tracing::debug!(dir = %dir.path().display(), "scratch frame store created");
        Ok(Self {
            dir,
            canvas,
            jpeg_quality: opts.jpeg_quality,
            bg: opts.bg,
            rgb: vec![0u8; canvas.width as usize * canvas.height as usize * 3],
            len: 0,
        })
    }

    /// Flatten and write one frame. Frames must arrive as `0, 1, 2, ...`.
    pub fn push(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> RecapResult<()> {
        if idx.0 != self.len {
            return Err(RecapError::encode(format!(
                "frame store expected frame {}, got {}",
                self.len, idx.0
            )));
        }
        frame.check_canvas(self.canvas)?;
        flatten_to_rgb8(&mut self.rgb, &frame.data, frame.premultiplied, self.bg)?;

        let path = self.frame_path(idx.0);
        let file = File::create(&path)
            .with_context(|| format!("failed to create scratch frame '{}'", path.display()))?;
        let mut w = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut w, self.jpeg_quality)
            .write_image(
                &self.rgb,
                self.canvas.width,
                self.canvas.height,
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| RecapError::encode(format!("jpeg encode of frame {}: {e}", idx.0)))?;
        w.flush()
            .with_context(|| format!("failed to flush scratch frame '{}'", path.display()))?;

        self.len += 1;
        Ok(())
    }

    /// Number of frames written so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// `printf`-style input pattern understood by ffmpeg's image sequence demuxer.
    pub fn pattern(&self) -> PathBuf {
        self.dir.path().join(FRAME_PATTERN)
    }

    pub fn frame_path(&self, idx: u64) -> PathBuf {
        self.dir.path().join(format!("frame_{idx:06}.jpg"))
    }
}

/// Flatten RGBA8 over an opaque background into packed RGB8.
fn flatten_to_rgb8(dst: &mut [u8], src: &[u8], src_is_premul: bool, bg: Rgba8) -> RecapResult<()> {
    if !src.len().is_multiple_of(4) || dst.len() / 3 != src.len() / 4 || !dst.len().is_multiple_of(3)
    {
        return Err(RecapError::validation(
            "flatten_to_rgb8 expects matching rgba8/rgb8 buffers",
        ));
    }

    let bg = [u16::from(bg.r), u16::from(bg.g), u16::from(bg.b)];
    for (d, s) in dst.chunks_exact_mut(3).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(&s[..3]);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let fg = if src_is_premul {
                u16::from(s[c])
            } else {
                mul_div255_u16(u16::from(s[c]), a)
            };
            d[c] = (fg + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/scratch.rs"]
mod tests;
