//! Frameloom is a generative-animation engine.
//!
//! Every frame is a pure function of a seed, a frame index, and keyframed parameters:
//!
//! - Author parameter curves on a [`Timeline`] with named [`Ease`] functions
//! - Drive interactive preview with a [`FrameClock`]
//! - Export deterministically with an [`Exporter`] into a video, an indexed-color GIF, or a
//!   frame archive
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Easing, keyframe timelines, and the frame clock.
pub mod animation;
/// Format strategies (video capture, GIF, frame archive).
pub mod encode;
/// Export configuration, orchestration, and session status.
pub mod export;
/// Errors, events, cancellation, and seeded randomness.
pub mod foundation;
/// Render surfaces, the render callback, and the reference effects.
pub mod render;
/// Serializable editor state.
pub mod snapshot;

pub use crate::animation::clock::{ClockMode, FrameClock, FrameClockState};
pub use crate::animation::ease::{Ease, apply_easing};
pub use crate::animation::timeline::{Keyframe, Timeline, TimelineChange};
pub use crate::animation::value::ParamValue;
pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{FrameIndex, Point, Vec2, total_frames};
pub use crate::foundation::error::{ErrorCategory, LoomError, LoomResult};
pub use crate::foundation::events::{EventSink, Notice, NoticeLog, Severity, TracingEvents};
pub use crate::foundation::rng::{Rng, create_rng, frame_rng, hash_seed};

pub use crate::encode::archive::{ArchiveSink, ArchiveWriter, FrameArchive, read_archive};
pub use crate::encode::dither::{Palette, apply_palette_with_dither, derive_palette};
pub use crate::encode::indexed::{GifWriter, IndexedFrameWriter, IndexedOptions, IndexedSink};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::encode::stream::{CapturePort, FfmpegCapture, StreamSink, VideoOptions, VideoProfile};
pub use crate::export::config::{ExportConfig, ExportFormat};
pub use crate::export::orchestrator::{ExportOutcome, ExportProgress, ExportResult, Exporter};
pub use crate::export::session::{ExportSession, ExportStatus};
pub use crate::render::effects::{EffectKind, EffectRenderer};
pub use crate::render::frame::{FrameCtx, FrameRenderer};
pub use crate::render::surface::{PixmapSurfaceProvider, Surface, SurfaceProvider};
pub use crate::snapshot::EditorSnapshot;
