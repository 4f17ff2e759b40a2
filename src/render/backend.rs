use crate::foundation::core::Canvas;
use crate::foundation::error::{RecapError, RecapResult};
use crate::timeline::schedule::FrameDescriptor;

/// One rasterized output frame.
///
/// `data` is tightly packed row-major RGBA8. Scratch storage flattens alpha over the encode
/// background, honouring `premultiplied`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Check that the buffer matches `canvas`.
    pub fn check_canvas(&self, canvas: Canvas) -> RecapResult<()> {
        if self.width != canvas.width || self.height != canvas.height {
            return Err(RecapError::render(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                self.width, self.height, canvas.width, canvas.height
            )));
        }
        if self.data.len() != canvas.byte_len() {
            return Err(RecapError::render(
                "frame.data size mismatch with width*height*4",
            ));
        }
        Ok(())
    }
}

/// Turns one frame descriptor into pixels.
///
/// Implementations must be deterministic for identical descriptors and render at a fixed canvas
/// size. Any error is fatal for the replay being rendered; no partial video is produced.
pub trait Rasterizer {
    /// Output dimensions of every frame this rasterizer produces.
    fn canvas(&self) -> Canvas;

    /// Render one output frame.
    fn render(&mut self, desc: &FrameDescriptor<'_>) -> RecapResult<FrameRGBA>;
}

impl<R: Rasterizer + ?Sized> Rasterizer for Box<R> {
    fn canvas(&self) -> Canvas {
        (**self).canvas()
    }

    fn render(&mut self, desc: &FrameDescriptor<'_>) -> RecapResult<FrameRGBA> {
        (**self).render(desc)
    }
}
