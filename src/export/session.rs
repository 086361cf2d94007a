use std::sync::Mutex;

use crate::export::config::ExportConfig;
use crate::export::orchestrator::{ExportOutcome, ExportProgress, ExportResult, Exporter};
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{LoomError, LoomResult};
use crate::render::frame::FrameRenderer;
use crate::render::surface::SurfaceProvider;

/// User-visible export state. Exactly one holds at any time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ExportStatus {
    /// No export has run, or the last result was taken.
    #[default]
    Idle,
    /// Rendering frames.
    Exporting {
        /// Frames rendered so far.
        done: u64,
        /// Frames in the export.
        total: u64,
    },
    /// Finished with a payload.
    Done(ExportResult),
    /// Stopped by the cancel token.
    Cancelled,
    /// Failed; holds the error message.
    Error(String),
}

impl ExportStatus {
    /// Whether the export has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Cancelled | Self::Error(_))
    }
}

#[derive(Debug, Default)]
struct Inner {
    status: ExportStatus,
    cancel: Option<CancelToken>,
}

/// Serializes exports for one host and tracks their status.
///
/// Shareable across threads: one thread runs the export while others poll
/// [`ExportSession::status`] or call [`ExportSession::cancel`].
#[derive(Debug, Default)]
pub struct ExportSession {
    inner: Mutex<Inner>,
}

impl ExportSession {
    /// Idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    pub fn status(&self) -> ExportStatus {
        self.lock().status.clone()
    }

    /// Whether an export is running.
    pub fn is_exporting(&self) -> bool {
        self.lock().cancel.is_some()
    }

    /// Request cancellation of the running export. No-op when idle.
    pub fn cancel(&self) {
        if let Some(token) = &self.lock().cancel {
            token.cancel();
        }
    }

    /// Move a finished result out, returning the session to idle.
    pub fn take_result(&self) -> Option<ExportResult> {
        let mut inner = self.lock();
        match std::mem::take(&mut inner.status) {
            ExportStatus::Done(result) => Some(result),
            other => {
                inner.status = other;
                None
            }
        }
    }

    /// Run `exporter` with a fresh cancel token, mirroring progress into the status.
    ///
    /// Rejects the request while another export is in flight. On success the result is
    /// retrievable with [`ExportSession::take_result`].
    pub fn run(
        &self,
        exporter: Exporter<'_>,
        cfg: &ExportConfig,
        provider: &mut dyn SurfaceProvider,
        renderer: &mut dyn FrameRenderer,
        on_progress: &mut dyn FnMut(ExportProgress),
    ) -> LoomResult<()> {
        let token = CancelToken::new();
        {
            let mut inner = self.lock();
            if inner.cancel.is_some() {
                return Err(LoomError::validation("an export is already in progress"));
            }
            inner.cancel = Some(token.clone());
            inner.status = ExportStatus::Exporting {
                done: 0,
                total: cfg.total_frames,
            };
        }

        let exporter = exporter.cancel_token(token);
        let outcome = exporter.export(cfg, provider, renderer, &mut |p| {
            if let ExportProgress::Frame { done, total } = p {
                self.lock().status = ExportStatus::Exporting { done, total };
            }
            on_progress(p);
        });

        let mut inner = self.lock();
        inner.cancel = None;
        match outcome {
            Ok(ExportOutcome::Done(result)) => {
                inner.status = ExportStatus::Done(result);
                Ok(())
            }
            Ok(ExportOutcome::Cancelled) => {
                inner.status = ExportStatus::Cancelled;
                Ok(())
            }
            Err(e) => {
                tracing::error!(category = %e.category(), "export failed: {e}");
                inner.status = ExportStatus::Error(e.to_string());
                Err(e)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/session.rs"]
mod tests;
