/// Cooperative cancellation.
pub mod cancel;
/// Frame indices, geometry re-exports, and frame-count helpers.
pub mod core;
/// Error type and categories.
pub mod error;
pub mod events;
pub(crate) mod math;
pub mod rng;
