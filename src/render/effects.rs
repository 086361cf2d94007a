//! Reference effects used by the command-line tool.

use std::f64::consts::TAU;

use vello_cpu::kurbo::{Circle, Rect, Shape as _};
use vello_cpu::peniko::Color;

use crate::foundation::error::{LoomError, LoomResult};
use crate::foundation::rng::{create_rng, frame_rng};
use crate::render::frame::{FrameCtx, FrameRenderer};
use crate::render::surface::Surface;

/// Built-in effects, selected by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectKind {
    /// Seeded dots travelling on circular orbits.
    Orbits,
    /// Per-frame seeded tile noise.
    Grain,
}

impl EffectKind {
    /// Look up an effect by its snapshot id.
    pub fn from_id(id: &str) -> LoomResult<Self> {
        match id {
            "orbits" => Ok(Self::Orbits),
            "grain" => Ok(Self::Grain),
            other => Err(LoomError::validation(format!("unknown effect '{other}'"))),
        }
    }

    /// Stable snapshot id.
    pub fn id(self) -> &'static str {
        match self {
            Self::Orbits => "orbits",
            Self::Grain => "grain",
        }
    }
}

/// Draws an [`EffectKind`] over a solid background.
#[derive(Clone, Debug)]
pub struct EffectRenderer {
    /// Effect to draw.
    pub kind: EffectKind,
    /// Straight RGBA8.
    pub background: [u8; 4],
    /// Swap foreground and background unless an `invert` parameter says otherwise.
    pub invert: bool,
}

impl EffectRenderer {
    /// Create a renderer for `kind`.
    pub fn new(kind: EffectKind, background: [u8; 4], invert: bool) -> Self {
        Self {
            kind,
            background,
            invert,
        }
    }

    /// Background and foreground colors. An animated `invert` parameter overrides the default.
    fn colors(&self, ctx: &FrameCtx<'_>) -> ([u8; 4], [u8; 4]) {
        let [r, g, b, a] = self.background;
        let bg = [r, g, b, a];
        let fg = [255 - r, 255 - g, 255 - b, 255];
        if ctx.flag("invert", self.invert) {
            (fg, bg)
        } else {
            (bg, fg)
        }
    }

    fn draw(&self, ctx: &FrameCtx<'_>, pixmap: &mut vello_cpu::Pixmap) {
        let (w, h) = (pixmap.width(), pixmap.height());
        let (bg, fg) = self.colors(ctx);

        let mut rc = vello_cpu::RenderContext::new(w, h);
        rc.set_paint(Color::from_rgba8(bg[0], bg[1], bg[2], bg[3]));
        rc.fill_rect(&Rect::new(0.0, 0.0, f64::from(w), f64::from(h)));

        match self.kind {
            EffectKind::Orbits => draw_orbits(&mut rc, ctx, f64::from(w), f64::from(h), fg),
            EffectKind::Grain => draw_grain(&mut rc, ctx, f64::from(w), f64::from(h), fg),
        }

        rc.flush();
        rc.render_to_pixmap(pixmap);
    }
}

fn draw_orbits(
    rc: &mut vello_cpu::RenderContext,
    ctx: &FrameCtx<'_>,
    w: f64,
    h: f64,
    fg: [u8; 4],
) {
    let count = ctx.number("count", 24.0).clamp(0.0, 2048.0) as usize;
    let radius = ctx.number("radius", 0.35) * w.min(h);
    let dot = ctx.number("dot_size", 0.02) * w.min(h);
    let turns = ctx.number("speed", 1.0);
    let center = (w / 2.0, h / 2.0);

    // Orbit layout depends only on the seed; motion depends only on normalized time.
    let mut rng = create_rng(ctx.seed);
    for _ in 0..count {
        let phase = rng.next_f64() * TAU;
        let orbit = radius * rng.range(0.3, 1.0);
        let size = dot * rng.range(0.5, 1.5);
        let dir = if rng.next_f64() < 0.5 { -1.0 } else { 1.0 };
        let alpha = (rng.range(0.4, 1.0) * 255.0) as u8;

        let angle = phase + dir * TAU * turns * ctx.normalized_time;
        let c = Circle::new(
            (
                center.0 + orbit * angle.cos(),
                center.1 + orbit * angle.sin(),
            ),
            size.max(0.5),
        );
        rc.set_paint(Color::from_rgba8(fg[0], fg[1], fg[2], alpha));
        rc.fill_path(&c.to_path(0.1));
    }
}

fn draw_grain(rc: &mut vello_cpu::RenderContext, ctx: &FrameCtx<'_>, w: f64, h: f64, fg: [u8; 4]) {
    let cells = ctx.number("cells", 16.0).clamp(1.0, 512.0) as usize;
    let density = ctx.number("density", 0.5).clamp(0.0, 1.0);
    let cw = w / cells as f64;
    let ch = h / cells as f64;

    let mut rng = frame_rng(ctx.seed, ctx.frame);
    for y in 0..cells {
        for x in 0..cells {
            let on = rng.next_f64() < density;
            let alpha = (rng.next_f64() * 255.0) as u8;
            if !on {
                continue;
            }
            rc.set_paint(Color::from_rgba8(fg[0], fg[1], fg[2], alpha));
            let x0 = x as f64 * cw;
            let y0 = y as f64 * ch;
            rc.fill_rect(&Rect::new(x0, y0, x0 + cw, y0 + ch));
        }
    }
}

impl FrameRenderer for EffectRenderer {
    fn render(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) -> LoomResult<()> {
        if let Some(pixmap) = surface.as_pixmap_mut() {
            self.draw(ctx, pixmap);
            return Ok(());
        }

        let w: u16 = surface
            .width()
            .try_into()
            .map_err(|_| LoomError::validation("effect surface width exceeds u16"))?;
        let h: u16 = surface
            .height()
            .try_into()
            .map_err(|_| LoomError::validation("effect surface height exceeds u16"))?;
        let mut scratch = vello_cpu::Pixmap::new(w, h);
        self.draw(ctx, &mut scratch);
        surface
            .pixels_mut()
            .copy_from_slice(scratch.data_as_u8_slice());
        Ok(())
    }
}
