/// Frame clock for preview and export stepping.
pub mod clock;
/// Named easing functions.
pub mod ease;
/// Per-parameter keyframe timelines.
pub mod timeline;
/// Keyframeable parameter values.
pub mod value;
