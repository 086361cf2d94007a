//! Tone palette derivation and error-diffusion quantization for indexed-color frames.

use rayon::prelude::*;
use smallvec::SmallVec;

use crate::foundation::error::{LoomError, LoomResult};
use crate::foundation::math::mul_div255_u16;

/// Ordered quantization target tones (luminance levels in `[0, 255]`).
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    tones: SmallVec<[f32; 4]>,
}

impl Palette {
    /// Palette of 1..=256 luminance tones.
    pub fn new(tones: impl IntoIterator<Item = f32>) -> LoomResult<Self> {
        let tones: SmallVec<[f32; 4]> = tones.into_iter().collect();
        if tones.is_empty() {
            return Err(LoomError::validation("palette must have at least one tone"));
        }
        if tones.len() > 256 {
            return Err(LoomError::validation("palette cannot exceed 256 tones"));
        }
        Ok(Self { tones })
    }

    /// Tones in index order.
    pub fn tones(&self) -> &[f32] {
        &self.tones
    }

    /// Number of tones.
    pub fn len(&self) -> usize {
        self.tones.len()
    }

    /// Always `false` for a constructed palette.
    pub fn is_empty(&self) -> bool {
        self.tones.is_empty()
    }

    /// Index of the tone closest to `v`. Ties resolve to the lower index.
    pub fn nearest(&self, v: f32) -> usize {
        let mut best = 0;
        let mut best_d = f32::INFINITY;
        for (i, &t) in self.tones.iter().enumerate() {
            let d = (v - t).abs();
            if d < best_d {
                best = i;
                best_d = d;
            }
        }
        best
    }

    /// Grey RGB triples, for encoders that need a color table.
    pub fn to_rgb(&self) -> Vec<[u8; 3]> {
        self.tones
            .iter()
            .map(|&t| {
                let g = t.round().clamp(0.0, 255.0) as u8;
                [g, g, g]
            })
            .collect()
    }
}

/// One quantized frame: a palette index per pixel, raster order.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Palette index per pixel.
    pub indices: Vec<u8>,
    /// Palette the indices refer to.
    pub palette: Palette,
}

/// Per-pixel luminance of premultiplied RGBA8 composited over `background`.
pub fn luminance_rgba8(pixels: &[u8], background: [u8; 4]) -> Vec<f32> {
    let bg = [
        u16::from(background[0]),
        u16::from(background[1]),
        u16::from(background[2]),
    ];
    pixels
        .par_chunks_exact(4)
        .map(|px| {
            let inv = 255 - u16::from(px[3]);
            let c = |i: usize| -> f32 {
                f32::from((u16::from(px[i]) + mul_div255_u16(bg[i], inv)).min(255))
            };
            0.299 * c(0) + 0.587 * c(1) + 0.114 * c(2)
        })
        .collect()
}

/// Pick `steps` tones at evenly spaced percentiles of `samples`.
///
/// Fewer distinct samples than `steps` repeat boundary values; an empty sample set yields tones
/// evenly spread over `[0, 255]`.
pub fn derive_palette(samples: &[f32], steps: usize) -> LoomResult<Palette> {
    if steps == 0 {
        return Err(LoomError::validation("palette steps must be > 0"));
    }

    if samples.is_empty() {
        if steps == 1 {
            return Palette::new([127.5]);
        }
        let span = (steps - 1) as f32;
        return Palette::new((0..steps).map(|s| 255.0 * s as f32 / span));
    }

    let mut sorted = samples.to_vec();
    sorted.par_sort_unstable_by(|a, b| a.total_cmp(b));
    let n = sorted.len();

    if steps == 1 {
        return Palette::new([sorted[(n - 1) / 2]]);
    }

    Palette::new((0..steps).map(|s| {
        let idx = ((n - 1) * s) / (steps - 1);
        sorted[idx].clamp(0.0, 255.0)
    }))
}

/// Quantize a luminance plane to `palette` with raster-order error diffusion.
///
/// The error of each pixel, scaled by `strength`, goes ½ to the right neighbor, ¼ below and ¼
/// below-left, when those exist.
pub fn apply_palette_with_dither(
    pixels: &[f32],
    palette: &Palette,
    width: u32,
    height: u32,
    strength: f32,
) -> LoomResult<IndexedFrame> {
    let w = width as usize;
    let h = height as usize;
    if pixels.len() != w * h {
        return Err(LoomError::validation(format!(
            "luminance plane has {} samples, expected {}x{}",
            pixels.len(),
            width,
            height
        )));
    }

    let mut err = vec![0.0f32; pixels.len()];
    let mut indices = vec![0u8; pixels.len()];
    let tones = palette.tones();

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let v = (pixels[i] + err[i]).clamp(0.0, 255.0);
            let idx = palette.nearest(v);
            indices[i] = idx as u8;

            let e = (v - tones[idx]) * strength;
            if x + 1 < w {
                err[i + 1] += e * 0.5;
            }
            if y + 1 < h {
                err[i + w] += e * 0.25;
                if x > 0 {
                    err[i + w - 1] += e * 0.25;
                }
            }
        }
    }

    Ok(IndexedFrame {
        width,
        height,
        indices,
        palette: palette.clone(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/dither.rs"]
mod tests;
