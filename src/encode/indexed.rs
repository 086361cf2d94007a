use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::encode::dither::{
    IndexedFrame, Palette, apply_palette_with_dither, derive_palette, luminance_rgba8,
};
use crate::encode::sink::{FileType, FinalizeProgress, FinishCtx, FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{LoomError, LoomResult};
use crate::foundation::events::EventSink;
use crate::render::surface::Surface;

/// Options for the indexed (GIF) format.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IndexedOptions {
    /// Palette size; 2 or 4.
    pub palette_steps: usize,
    /// Error diffusion scale in `[0, 1]`.
    pub dither_strength: f32,
}

impl Default for IndexedOptions {
    fn default() -> Self {
        Self {
            palette_steps: 4,
            dither_strength: 0.85,
        }
    }
}

/// Indexed-frame bitstream boundary.
pub trait IndexedFrameWriter: Send {
    /// Append one frame shown for `delay_ms`.
    fn write_frame(&mut self, frame: &IndexedFrame, delay_ms: u32) -> LoomResult<()>;
    /// Close the stream and return its bytes. Only the first call yields data.
    fn finish(&mut self) -> LoomResult<Vec<u8>>;
    /// Discard any partial stream.
    fn abort(&mut self);
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| std::io::Error::other("gif buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Looping animated GIF writer. Index buffers and palettes are written as-is, without a
/// second quantization pass.
#[derive(Default)]
pub struct GifWriter {
    buf: SharedBuf,
    encoder: Option<gif::Encoder<SharedBuf>>,
    frames: u64,
}

impl GifWriter {
    /// Create a writer with an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    fn encoder(&mut self, width: u16, height: u16) -> LoomResult<&mut gif::Encoder<SharedBuf>> {
        if self.encoder.is_none() {
            // Every frame carries a local palette, so the global table stays empty.
            let mut enc = gif::Encoder::new(self.buf.clone(), width, height, &[])
                .map_err(|e| LoomError::encode(format!("gif header: {e}")))?;
            enc.set_repeat(gif::Repeat::Infinite)
                .map_err(|e| LoomError::encode(format!("gif header: {e}")))?;
            self.encoder = Some(enc);
        }
        self.encoder
            .as_mut()
            .ok_or_else(|| LoomError::encode("gif encoder unavailable"))
    }
}

/// GIF delays are stored in hundredths of a second.
fn delay_centis(delay_ms: u32) -> u16 {
    ((delay_ms + 5) / 10).clamp(1, u32::from(u16::MAX)) as u16
}

impl IndexedFrameWriter for GifWriter {
    fn write_frame(&mut self, frame: &IndexedFrame, delay_ms: u32) -> LoomResult<()> {
        let width = u16::try_from(frame.width)
            .map_err(|_| LoomError::encode("gif width exceeds 65535"))?;
        let height = u16::try_from(frame.height)
            .map_err(|_| LoomError::encode("gif height exceeds 65535"))?;
        if frame.indices.len() != usize::from(width) * usize::from(height) {
            return Err(LoomError::encode("indexed frame size mismatch"));
        }

        let rgb = frame.palette.to_rgb();
        if rgb.is_empty() || rgb.len() > 256 {
            return Err(LoomError::encode(format!(
                "gif palette needs 1..=256 colors, got {}",
                rgb.len()
            )));
        }
        if let Some(&i) = frame.indices.iter().find(|&&i| usize::from(i) >= rgb.len()) {
            return Err(LoomError::encode(format!("palette index {i} out of range")));
        }
        let palette: Vec<u8> = rgb.iter().flatten().copied().collect();

        let mut out = gif::Frame::from_palette_pixels(
            width,
            height,
            &frame.indices[..],
            &palette[..],
            None,
        );
        out.delay = delay_centis(delay_ms);

        self.encoder(width, height)?
            .write_frame(&out)
            .map_err(|e| LoomError::encode(format!("gif frame: {e}")))?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> LoomResult<Vec<u8>> {
        // Dropping the encoder writes the trailer.
        drop(self.encoder.take());
        let mut inner = self
            .buf
            .0
            .lock()
            .map_err(|_| LoomError::encode("gif buffer poisoned"))?;
        Ok(std::mem::take(&mut *inner))
    }

    fn abort(&mut self) {
        drop(self.encoder.take());
        if let Ok(mut inner) = self.buf.0.lock() {
            *inner = Vec::new();
        }
    }
}

/// Frame delay for `fps`, in whole milliseconds.
pub fn frame_delay_ms(fps: u32) -> u32 {
    (1000.0 / f64::from(fps.max(1))).round() as u32
}

/// Quantizes frames against a palette derived from the first frame.
pub struct IndexedSink {
    opts: IndexedOptions,
    writer: Box<dyn IndexedFrameWriter>,
    palette: Option<Palette>,
    cfg: Option<SinkConfig>,
}

impl IndexedSink {
    /// Sink writing a [`GifWriter`] stream.
    pub fn new(opts: IndexedOptions) -> Self {
        Self::with_writer(opts, Box::new(GifWriter::new()))
    }

    /// Sink writing into `writer`.
    pub fn with_writer(opts: IndexedOptions, writer: Box<dyn IndexedFrameWriter>) -> Self {
        Self {
            opts,
            writer,
            palette: None,
            cfg: None,
        }
    }

    /// Palette derived from the first frame, once one has been pushed.
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }
}

impl FrameSink for IndexedSink {
    fn file_type(&self) -> FileType {
        FileType {
            ext: "gif",
            mime: "image/gif",
        }
    }

    fn begin(&mut self, cfg: &SinkConfig, _events: &dyn EventSink) -> LoomResult<()> {
        if !matches!(self.opts.palette_steps, 2 | 4) {
            return Err(LoomError::validation("gif palette steps must be 2 or 4"));
        }
        self.palette = None;
        self.cfg = Some(cfg.clone());
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, surface: &dyn Surface) -> LoomResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| LoomError::encode("indexed sink not started"))?;

        let lum = luminance_rgba8(surface.pixels(), cfg.background);
        let palette = match &self.palette {
            Some(p) => p.clone(),
            None => {
                let p = derive_palette(&lum, self.opts.palette_steps)?;
                tracing::debug!(frame = idx.0, tones = ?p.tones(), "derived gif palette");
                self.palette = Some(p.clone());
                p
            }
        };

        let frame = apply_palette_with_dither(
            &lum,
            &palette,
            cfg.width,
            cfg.height,
            self.opts.dither_strength,
        )?;
        self.writer.write_frame(&frame, frame_delay_ms(cfg.fps))
    }

    fn finish(&mut self, mut ctx: FinishCtx<'_>) -> LoomResult<Option<Vec<u8>>> {
        if ctx.cancel.is_cancelled() {
            return Ok(None);
        }
        let bytes = self.writer.finish()?;
        (ctx.progress)(FinalizeProgress {
            percent: 100.0,
            eta: Some(std::time::Duration::ZERO),
        });
        Ok(Some(bytes))
    }

    fn release(&mut self) {
        self.writer.abort();
        self.palette = None;
        self.cfg = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/indexed.rs"]
mod tests;
