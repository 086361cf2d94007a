use std::time::Duration;

use crate::foundation::cancel::CancelToken;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::LoomResult;
use crate::foundation::events::EventSink;
use crate::render::surface::Surface;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Frames that will be pushed.
    pub total_frames: u64,
    /// Straight RGBA8 used to flatten premultiplied pixels.
    pub background: [u8; 4],
}

/// Extension and MIME type of a sink's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileType {
    /// File extension, without the dot.
    pub ext: &'static str,
    /// MIME type.
    pub mime: &'static str,
}

/// Progress while a sink finalizes its payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalizeProgress {
    /// `0.0..=100.0`.
    pub percent: f32,
    /// Estimated time left, from elapsed time and percent done.
    pub eta: Option<Duration>,
}

impl FinalizeProgress {
    /// Progress at `percent` after `elapsed`. No estimate before any progress.
    pub fn estimate(percent: f32, elapsed: Duration) -> Self {
        let percent = percent.clamp(0.0, 100.0);
        let eta = (percent > 0.0).then(|| {
            let total = elapsed.as_secs_f64() * 100.0 / f64::from(percent);
            Duration::from_secs_f64((total - elapsed.as_secs_f64()).max(0.0))
        });
        Self { percent, eta }
    }
}

/// Per-call context passed to [`FrameSink::finish`].
pub struct FinishCtx<'a> {
    /// Checked between finalization steps.
    pub cancel: &'a CancelToken,
    /// Receives finalization progress.
    pub progress: &'a mut dyn FnMut(FinalizeProgress),
}

/// Format strategy contract: consumes rendered frames and produces one binary payload.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order.
/// `release` is called exactly once at the end of every export, whatever the outcome, and must
/// tolerate being called after `finish`.
pub trait FrameSink: Send {
    /// Extension and MIME type of the payload.
    fn file_type(&self) -> FileType;
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: &SinkConfig, events: &dyn EventSink) -> LoomResult<()>;
    /// Hand off one rendered frame.
    fn push_frame(&mut self, idx: FrameIndex, surface: &dyn Surface) -> LoomResult<()>;
    /// Produce the payload. `Ok(None)` means cancellation was observed while finalizing.
    fn finish(&mut self, ctx: FinishCtx<'_>) -> LoomResult<Option<Vec<u8>>>;
    /// Release encoder buffers and external resources.
    fn release(&mut self);
}

/// In-memory sink for tests and debugging. Payload is the concatenated frame bytes.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    pub(crate) frames: Vec<(FrameIndex, Vec<u8>)>,
    finished: u32,
    released: u32,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration from the last `begin`.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(FrameIndex, Vec<u8>)] {
        &self.frames
    }

    /// How many times `finish` ran.
    pub fn finish_calls(&self) -> u32 {
        self.finished
    }

    /// How many times `release` ran.
    pub fn release_calls(&self) -> u32 {
        self.released
    }
}

impl FrameSink for InMemorySink {
    fn file_type(&self) -> FileType {
        FileType {
            ext: "rgba",
            mime: "application/octet-stream",
        }
    }

    fn begin(&mut self, cfg: &SinkConfig, _events: &dyn EventSink) -> LoomResult<()> {
        self.cfg = Some(cfg.clone());
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, surface: &dyn Surface) -> LoomResult<()> {
        self.frames.push((idx, surface.pixels().to_vec()));
        Ok(())
    }

    fn finish(&mut self, mut ctx: FinishCtx<'_>) -> LoomResult<Option<Vec<u8>>> {
        self.finished += 1;
        if ctx.cancel.is_cancelled() {
            return Ok(None);
        }
        (ctx.progress)(FinalizeProgress {
            percent: 100.0,
            eta: Some(Duration::ZERO),
        });
        Ok(Some(
            self.frames
                .iter()
                .flat_map(|(_, px)| px.iter().copied())
                .collect(),
        ))
    }

    fn release(&mut self) {
        self.released += 1;
    }
}
