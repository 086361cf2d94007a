use std::time::Duration;

use crate::encode::indexed::IndexedOptions;
use crate::encode::sink::SinkConfig;
use crate::encode::stream::VideoOptions;
use crate::foundation::core::total_frames;
use crate::foundation::error::{LoomError, LoomResult};

/// Product name used in export filenames.
pub const PRODUCT_NAME: &str = "frameloom";

/// `width * height * total_frames` above which an export is flagged as heavy.
pub const COMPLEXITY_ADVISORY_PIXEL_FRAMES: u64 = 2_000_000_000;

/// Output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Stream-captured video.
    Video,
    /// Indexed-color animated GIF.
    Gif,
    /// Archive of PNG frames.
    Archive,
}

impl ExportFormat {
    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Gif => "gif",
            Self::Archive => "archive",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Estimated cost of an export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Complexity {
    /// `width * height * total_frames`, saturating.
    pub pixel_frames: u64,
    /// Set when `pixel_frames` exceeds [`COMPLEXITY_ADVISORY_PIXEL_FRAMES`]. Never blocks.
    pub advisory: bool,
}

/// Everything needed to run one export.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExportConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Frames to render.
    pub total_frames: u64,
    /// Output format.
    pub format: ExportFormat,
    /// Straight RGBA8 the surface is cleared to and flattened over.
    #[serde(default = "default_background")]
    pub background: [u8; 4],
    /// GIF palette and dither options.
    #[serde(default)]
    pub gif: IndexedOptions,
    /// Video profile options.
    #[serde(default)]
    pub video: VideoOptions,
    /// Sleep after each frame so a host UI sharing the thread stays responsive.
    #[serde(default)]
    pub frame_yield: Option<Duration>,
}

fn default_background() -> [u8; 4] {
    [0, 0, 0, 255]
}

impl ExportConfig {
    /// Config with a black background and default format options.
    pub fn new(width: u32, height: u32, fps: u32, total_frames: u64, format: ExportFormat) -> Self {
        Self {
            width,
            height,
            fps,
            total_frames,
            format,
            background: default_background(),
            gif: IndexedOptions::default(),
            video: VideoOptions::default(),
            frame_yield: None,
        }
    }

    /// `total_frames = max(1, round(fps * duration_secs))`.
    pub fn from_duration(
        width: u32,
        height: u32,
        fps: u32,
        duration_secs: f64,
        format: ExportFormat,
    ) -> Self {
        Self::new(width, height, fps, total_frames(fps, duration_secs), format)
    }

    /// Reject configurations no export can run with, before anything is allocated.
    pub fn validate(&self) -> LoomResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LoomError::validation(format!(
                "export size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(LoomError::validation(format!(
                "export size {}x{} exceeds {} px",
                self.width,
                self.height,
                u16::MAX
            )));
        }
        if self.fps == 0 {
            return Err(LoomError::validation("export fps must be > 0"));
        }
        if self.total_frames == 0 {
            return Err(LoomError::validation("export total_frames must be > 0"));
        }

        match self.format {
            ExportFormat::Gif => {
                if !matches!(self.gif.palette_steps, 2 | 4) {
                    return Err(LoomError::validation(format!(
                        "gif palette steps must be 2 or 4, got {}",
                        self.gif.palette_steps
                    )));
                }
                let s = self.gif.dither_strength;
                if !s.is_finite() || !(0.0..=1.0).contains(&s) {
                    return Err(LoomError::validation(format!(
                        "gif dither strength must be in [0, 1], got {s}"
                    )));
                }
            }
            ExportFormat::Video => {
                if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
                    return Err(LoomError::validation(
                        "video width/height must be even (required for yuv420p output)",
                    ));
                }
            }
            ExportFormat::Archive => {}
        }
        Ok(())
    }

    /// Estimated cost, with the heavy-export advisory flag.
    pub fn complexity(&self) -> Complexity {
        let pixel_frames = u64::from(self.width)
            .saturating_mul(u64::from(self.height))
            .saturating_mul(self.total_frames);
        Complexity {
            pixel_frames,
            advisory: pixel_frames > COMPLEXITY_ADVISORY_PIXEL_FRAMES,
        }
    }

    pub(crate) fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            width: self.width,
            height: self.height,
            fps: self.fps,
            total_frames: self.total_frames,
            background: self.background,
        }
    }
}

/// `<product>-<epochMillis>.<ext>`.
pub fn export_filename(epoch_millis: u128, ext: &str) -> String {
    format!("{PRODUCT_NAME}-{epoch_millis}.{ext}")
}

#[cfg(test)]
#[path = "../../tests/unit/export/config.rs"]
mod tests;
