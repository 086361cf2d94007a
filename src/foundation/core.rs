pub use kurbo::{Point, Vec2};

/// Absolute 0-based frame index in animation timeline space.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frame count for an animation of `duration_secs` at `fps`.
///
/// Always at least one frame.
pub fn total_frames(fps: u32, duration_secs: f64) -> u64 {
    let raw = (f64::from(fps) * duration_secs).round();
    if raw.is_finite() && raw >= 1.0 {
        raw as u64
    } else {
        1
    }
}

/// Normalized position of `frame` across `total` frames.
///
/// A single-frame animation is always at `0.0`.
pub fn normalized_time(frame: FrameIndex, total: u64) -> f64 {
    if total <= 1 {
        return 0.0;
    }
    frame.0 as f64 / (total - 1) as f64
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn epoch_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
