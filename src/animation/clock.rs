use crate::foundation::core::{FrameIndex, normalized_time};
use crate::foundation::error::{LoomError, LoomResult};

/// Tolerance, in steps, applied before flooring the accumulator.
const STEP_EPSILON: f64 = 1e-9;

/// Mutable clock position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameClockState {
    /// Frame currently shown.
    pub frame_index: FrameIndex,
    /// Banked real time not yet consumed by a whole step.
    pub accumulator_secs: f64,
}

/// Who drives the frame index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClockMode {
    /// Advanced by real elapsed time via [`FrameClock::tick`].
    Running,
    /// Paused; the frame index follows an externally supplied normalized time.
    Scrubbing {
        /// Last scrub position in `[0, 1]`.
        normalized: f64,
    },
}

/// Converts elapsed time or scrub positions into a frame index.
#[derive(Clone, Debug)]
pub struct FrameClock {
    fps: u32,
    total_frames: u64,
    preview_cap: Option<u32>,
    mode: ClockMode,
    state: FrameClockState,
}

impl FrameClock {
    /// Running clock at frame 0. `fps` and `total_frames` must be non-zero.
    pub fn new(fps: u32, total_frames: u64) -> LoomResult<Self> {
        if fps == 0 {
            return Err(LoomError::validation("clock fps must be > 0"));
        }
        if total_frames == 0 {
            return Err(LoomError::validation("clock total_frames must be > 0"));
        }
        Ok(Self {
            fps,
            total_frames,
            preview_cap: None,
            mode: ClockMode::Running,
            state: FrameClockState::default(),
        })
    }

    /// Configured frame rate.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Frames in one loop.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Current position and banked time.
    pub fn state(&self) -> FrameClockState {
        self.state
    }

    /// Current driving mode.
    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Frame currently shown.
    pub fn frame_index(&self) -> FrameIndex {
        self.state.frame_index
    }

    /// Position in `[0, 1]`; `0` for a single-frame animation.
    pub fn normalized_time(&self) -> f64 {
        normalized_time(self.state.frame_index, self.total_frames)
    }

    /// Whether ticks are ignored in favor of scrub positions.
    pub fn is_scrubbing(&self) -> bool {
        matches!(self.mode, ClockMode::Scrubbing { .. })
    }

    /// Cap the paint rate during interactive preview. `None` or a cap at or above the
    /// configured fps disables it. Export stepping ignores the cap.
    pub fn set_preview_cap(&mut self, cap: Option<u32>) {
        self.preview_cap = cap.filter(|c| *c > 0 && *c < self.fps);
    }

    /// Frames advanced per preview step.
    pub fn stride(&self) -> u64 {
        match self.preview_cap {
            Some(cap) => u64::from(self.fps.div_ceil(cap)),
            None => 1,
        }
    }

    fn step_duration_secs(&self) -> f64 {
        self.stride() as f64 / f64::from(self.fps)
    }

    /// Bank `delta_secs` of real time and consume it in whole steps.
    ///
    /// Returns the number of frames the index advanced (before wraparound). Ignored while
    /// scrubbing and for negative or non-finite deltas.
    pub fn tick(&mut self, delta_secs: f64) -> u64 {
        if self.is_scrubbing() || !delta_secs.is_finite() || delta_secs <= 0.0 {
            return 0;
        }

        let step = self.step_duration_secs();
        self.state.accumulator_secs += delta_secs;

        // `k / fps` seconds must yield exactly `k` steps despite rounding in the division.
        let steps = (self.state.accumulator_secs / step + STEP_EPSILON).floor();
        if steps < 1.0 {
            return 0;
        }
        self.state.accumulator_secs = (self.state.accumulator_secs - steps * step).max(0.0);

        let frames = (steps as u64).saturating_mul(self.stride());
        self.state.frame_index = FrameIndex(self.wrap(self.state.frame_index.0, frames));
        frames
    }

    /// Pause and follow `normalized` (clamped to `[0, 1]`).
    pub fn scrub(&mut self, normalized: f64) -> FrameIndex {
        let normalized = if normalized.is_nan() {
            0.0
        } else {
            normalized.clamp(0.0, 1.0)
        };
        self.mode = ClockMode::Scrubbing { normalized };
        let max = self.total_frames - 1;
        let idx = (normalized * max as f64).round() as u64;
        self.state.frame_index = FrameIndex(idx.min(max));
        self.state.frame_index
    }

    /// Pause at the current frame.
    pub fn pause(&mut self) {
        if !self.is_scrubbing() {
            self.mode = ClockMode::Scrubbing {
                normalized: self.normalized_time(),
            };
        }
    }

    /// Resume free-running from the current frame with an empty accumulator.
    pub fn resume(&mut self) {
        self.mode = ClockMode::Running;
        self.state.accumulator_secs = 0.0;
    }

    /// Rewind to frame 0 and drop banked time. The mode is kept.
    pub fn reset(&mut self) {
        self.state = FrameClockState::default();
    }

    /// Advance exactly one frame at full rate, independent of wall-clock time and preview caps.
    ///
    /// Returns the frame to render, or `None` once the last frame has been produced.
    pub fn advance_export(&mut self) -> Option<FrameIndex> {
        let next = self.state.frame_index.0 + 1;
        if next >= self.total_frames {
            return None;
        }
        self.state.frame_index = FrameIndex(next);
        Some(self.state.frame_index)
    }

    fn wrap(&self, from: u64, by: u64) -> u64 {
        let by = by % self.total_frames;
        (from % self.total_frames + by) % self.total_frames
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/clock.rs"]
mod tests;
