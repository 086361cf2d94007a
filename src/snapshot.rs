//! Plain, serializable editor state for storage and share links.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::animation::timeline::{Timeline, TimelineSnapshot};
use crate::animation::value::ParamValue;
use crate::encode::archive::encode_png;
use crate::export::config::{ExportConfig, ExportFormat};
use crate::foundation::core::{FrameIndex, normalized_time};
use crate::foundation::error::{LoomError, LoomResult};
use crate::foundation::events::EventSink;
use crate::foundation::math::flatten_premul_over_bg;
use crate::render::effects::{EffectKind, EffectRenderer};
use crate::render::frame::{FrameCtx, FrameRenderer as _};
use crate::render::surface::{PixmapSurfaceProvider, SurfaceProvider as _};

/// Everything needed to reproduce an animation. Carries no binary payload.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EditorSnapshot {
    /// Effect id, see `EffectKind::from_id`.
    pub effect: String,
    /// Static parameter values.
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Animation length in seconds.
    pub duration_secs: f64,
    /// Seed for deterministic effects.
    #[serde(default)]
    pub seed: String,
    /// Background RGBA.
    #[serde(default = "default_background")]
    pub background: [u8; 4],
    /// Invert the effect colors.
    #[serde(default)]
    pub invert: bool,
    /// Keyframes per parameter.
    #[serde(default)]
    pub timeline: TimelineSnapshot,
}

fn default_background() -> [u8; 4] {
    [0, 0, 0, 255]
}

impl EditorSnapshot {
    /// Parse a snapshot from JSON.
    pub fn from_json(json: &str) -> LoomResult<Self> {
        serde_json::from_str(json).map_err(|e| LoomError::serde(e.to_string()))
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> LoomResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| LoomError::serde(e.to_string()))
    }

    /// Replace the stored keyframes with those of `timeline`.
    pub fn set_timeline(&mut self, timeline: &Timeline) {
        self.timeline = timeline.to_snapshot();
    }

    /// Timeline rebuilt from the stored keyframes.
    pub fn build_timeline(&self, events: Arc<dyn EventSink>) -> Timeline {
        Timeline::from_snapshot(&self.timeline, events)
    }

    /// Export config covering the whole duration.
    pub fn export_config(&self, format: ExportFormat) -> ExportConfig {
        let mut cfg = ExportConfig::from_duration(
            self.width,
            self.height,
            self.fps,
            self.duration_secs,
            format,
        );
        cfg.background = self.background;
        cfg
    }

    /// Renderer for the stored effect.
    pub fn renderer(&self) -> LoomResult<EffectRenderer> {
        Ok(EffectRenderer::new(
            EffectKind::from_id(&self.effect)?,
            self.background,
            self.invert,
        ))
    }

    /// Render `frame` exactly as an export would and encode it as PNG.
    pub fn render_png(&self, frame: FrameIndex, events: Arc<dyn EventSink>) -> LoomResult<Vec<u8>> {
        let cfg = self.export_config(ExportFormat::Archive);
        cfg.validate()?;
        if frame.0 >= cfg.total_frames {
            return Err(LoomError::validation(format!(
                "frame {} out of range (total_frames={})",
                frame.0, cfg.total_frames
            )));
        }

        let timeline = self.build_timeline(events);
        let t = normalized_time(frame, cfg.total_frames);
        let params = timeline.sample_all(t, &self.params);
        let ctx = FrameCtx {
            frame,
            total_frames: cfg.total_frames,
            normalized_time: t,
            fps: cfg.fps,
            seed: &self.seed,
            params: &params,
        };

        let mut surface = PixmapSurfaceProvider::new().allocate(cfg.width, cfg.height)?;
        surface.clear(cfg.background);
        self.renderer()?.render(&ctx, surface.as_mut())?;

        let mut rgba = vec![0u8; surface.pixels().len()];
        flatten_premul_over_bg(&mut rgba, surface.pixels(), cfg.background)?;
        encode_png(&rgba, cfg.width, cfg.height)
    }
}
