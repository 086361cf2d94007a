use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use crate::animation::clock::FrameClock;
use crate::animation::timeline::Timeline;
use crate::animation::value::ParamValue;
use crate::encode::archive::ArchiveSink;
use crate::encode::indexed::IndexedSink;
use crate::encode::sink::{FinalizeProgress, FinishCtx, FrameSink};
use crate::encode::stream::StreamSink;
use crate::export::config::{ExportConfig, ExportFormat, export_filename};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::epoch_millis;
use crate::foundation::error::{ErrorCategory, LoomResult};
use crate::foundation::events::{EventSink, Notice, Severity, TracingEvents};
use crate::foundation::rng::DEFAULT_SEED;
use crate::render::frame::{FrameCtx, FrameRenderer};
use crate::render::surface::SurfaceProvider;

/// Progress reported while an export runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ExportProgress {
    /// `done` frames of `total` have been rendered.
    Frame {
        /// Frames rendered and handed to the sink.
        done: u64,
        /// Frames in the export.
        total: u64,
    },
    /// The sink is producing its payload.
    Finalizing {
        /// `0.0..=100.0`.
        percent: f32,
        /// Estimated time left, once any progress was made.
        eta: Option<Duration>,
    },
}

/// A finished export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportResult {
    /// Encoded bytes.
    pub payload: Vec<u8>,
    /// `<product>-<epochMillis>.<ext>`.
    pub filename: String,
    /// MIME type of `payload`.
    pub mime_type: String,
}

/// Terminal result of a run that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Every frame was encoded.
    Done(ExportResult),
    /// The cancel token fired; no payload was produced.
    Cancelled,
}

impl ExportOutcome {
    /// Whether the run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The result, if the run completed.
    pub fn into_result(self) -> Option<ExportResult> {
        match self {
            Self::Done(r) => Some(r),
            Self::Cancelled => None,
        }
    }
}

/// Sink for `cfg.format` with its default encoder backend.
pub fn sink_for(cfg: &ExportConfig) -> Box<dyn FrameSink> {
    match cfg.format {
        ExportFormat::Video => Box::new(StreamSink::new(cfg.video)),
        ExportFormat::Gif => Box::new(IndexedSink::new(cfg.gif)),
        ExportFormat::Archive => Box::new(ArchiveSink::new()),
    }
}

/// Releases the sink on every exit path.
struct SinkGuard<'s>(&'s mut dyn FrameSink);

impl<'s> Deref for SinkGuard<'s> {
    type Target = dyn FrameSink + 's;

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl<'s> DerefMut for SinkGuard<'s> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0
    }
}

impl Drop for SinkGuard<'_> {
    fn drop(&mut self) {
        self.0.release();
        tracing::trace!("sink released");
    }
}

/// Drives one export: owns frame advancement, parameter sampling, and cancellation checks.
pub struct Exporter<'a> {
    timeline: &'a Timeline,
    defaults: &'a BTreeMap<String, ParamValue>,
    seed: &'a str,
    events: Arc<dyn EventSink>,
    cancel: CancelToken,
}

impl<'a> Exporter<'a> {
    /// Exporter sampling `timeline` over `defaults`, with the default seed.
    pub fn new(timeline: &'a Timeline, defaults: &'a BTreeMap<String, ParamValue>) -> Self {
        Self {
            timeline,
            defaults,
            seed: DEFAULT_SEED,
            events: Arc::new(TracingEvents),
            cancel: CancelToken::new(),
        }
    }

    /// Use `seed` for every frame.
    pub fn seed(mut self, seed: &'a str) -> Self {
        self.seed = seed;
        self
    }

    /// Report notices to `events` instead of `tracing`.
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Observe a host-owned cancel token.
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The token checked by this exporter. Cancel it from any thread.
    pub fn token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Export with the default sink for `cfg.format`.
    pub fn export(
        &self,
        cfg: &ExportConfig,
        provider: &mut dyn SurfaceProvider,
        renderer: &mut dyn FrameRenderer,
        on_progress: &mut dyn FnMut(ExportProgress),
    ) -> LoomResult<ExportOutcome> {
        let mut sink = sink_for(cfg);
        self.export_with_sink(cfg, provider, renderer, sink.as_mut(), on_progress)
    }

    /// Export into a caller-supplied sink. The sink is released before this returns.
    #[tracing::instrument(
        skip_all,
        fields(
            format = %cfg.format,
            width = cfg.width,
            height = cfg.height,
            frames = cfg.total_frames
        )
    )]
    pub fn export_with_sink(
        &self,
        cfg: &ExportConfig,
        provider: &mut dyn SurfaceProvider,
        renderer: &mut dyn FrameRenderer,
        sink: &mut dyn FrameSink,
        on_progress: &mut dyn FnMut(ExportProgress),
    ) -> LoomResult<ExportOutcome> {
        let sink = SinkGuard(sink);
        self.run(cfg, provider, renderer, sink, on_progress)
            .map_err(|e| e.in_op("export", &op_meta(cfg)))
    }

    fn run(
        &self,
        cfg: &ExportConfig,
        provider: &mut dyn SurfaceProvider,
        renderer: &mut dyn FrameRenderer,
        mut sink: SinkGuard<'_>,
        on_progress: &mut dyn FnMut(ExportProgress),
    ) -> LoomResult<ExportOutcome> {
        cfg.validate()?;

        let complexity = cfg.complexity();
        if complexity.advisory {
            self.events.notify(Notice::new(
                Severity::Warning,
                ErrorCategory::Validation,
                format!(
                    "export covers {} pixel-frames; expect a long render and a large file",
                    complexity.pixel_frames
                ),
            ));
        }

        let mut clock = FrameClock::new(cfg.fps, cfg.total_frames)?;
        let mut surface = provider.allocate(cfg.width, cfg.height)?;
        sink.begin(&cfg.sink_config(), self.events.as_ref())?;
        tracing::info!("export started");

        let total = cfg.total_frames;
        let mut next = Some(clock.frame_index());
        while let Some(frame) = next {
            if self.cancel.is_cancelled() {
                tracing::info!(frame = frame.0, "export cancelled");
                return Ok(ExportOutcome::Cancelled);
            }

            let normalized_time = clock.normalized_time();
            let params = self.timeline.sample_all(normalized_time, self.defaults);
            let ctx = FrameCtx {
                frame,
                total_frames: total,
                normalized_time,
                fps: cfg.fps,
                seed: self.seed,
                params: &params,
            };

            surface.clear(cfg.background);
            renderer
                .render(&ctx, surface.as_mut())
                .map_err(|e| e.in_op("render_frame", &[("frame", frame.0.to_string())]))?;
            on_progress(ExportProgress::Frame {
                done: frame.0 + 1,
                total,
            });
            sink.push_frame(frame, surface.as_ref())
                .map_err(|e| e.in_op("push_frame", &[("frame", frame.0.to_string())]))?;

            if let Some(pause) = cfg.frame_yield {
                std::thread::sleep(pause);
            } else {
                std::thread::yield_now();
            }
            next = clock.advance_export();
        }
        drop(surface);

        if self.cancel.is_cancelled() {
            tracing::info!("export cancelled before finalizing");
            return Ok(ExportOutcome::Cancelled);
        }

        let mut on_finalize = |p: FinalizeProgress| {
            on_progress(ExportProgress::Finalizing {
                percent: p.percent,
                eta: p.eta,
            })
        };
        let payload = sink.finish(FinishCtx {
            cancel: &self.cancel,
            progress: &mut on_finalize,
        })?;
        let Some(payload) = payload else {
            tracing::info!("export cancelled while finalizing");
            return Ok(ExportOutcome::Cancelled);
        };

        let file_type = sink.file_type();
        let result = ExportResult {
            filename: export_filename(epoch_millis(), file_type.ext),
            mime_type: file_type.mime.to_owned(),
            payload,
        };
        tracing::info!(
            filename = %result.filename,
            bytes = result.payload.len(),
            "export finished"
        );
        Ok(ExportOutcome::Done(result))
    }
}

fn op_meta(cfg: &ExportConfig) -> [(&'static str, String); 3] {
    [
        ("format", cfg.format.to_string()),
        ("size", format!("{}x{}", cfg.width, cfg.height)),
        ("frames", cfg.total_frames.to_string()),
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/export/orchestrator.rs"]
mod tests;
