//! Export orchestration: configuration, the frame loop, and session status.

/// Export configuration and validation.
pub mod config;
/// The frame loop driving one export.
pub mod orchestrator;
/// Status tracking for one export at a time.
pub mod session;
