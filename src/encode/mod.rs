//! Format strategies.
//!
//! Sinks consume rendered frames in frame order and produce one binary payload.

/// Frame-sequence archive (`FLAR` container of PNG frames).
pub mod archive;
/// Palette derivation and error-diffusion dithering.
pub mod dither;
/// Indexed-color animated image (GIF).
pub mod indexed;
/// Frame sink trait and the in-memory sink.
pub mod sink;
/// Stream-captured video via a recorder port.
pub mod stream;
