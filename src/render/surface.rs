use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::foundation::error::{LoomError, LoomResult};

/// An off-screen rendering target with pixel read-back.
///
/// Pixels are premultiplied RGBA8, tightly packed, row-major.
pub trait Surface: Send {
    /// Width in pixels.
    fn width(&self) -> u32;
    /// Height in pixels.
    fn height(&self) -> u32;
    /// Read back the pixels.
    fn pixels(&self) -> &[u8];
    /// Mutable pixel access.
    fn pixels_mut(&mut self) -> &mut [u8];

    /// Direct access for renderers that draw with `vello_cpu`.
    fn as_pixmap_mut(&mut self) -> Option<&mut vello_cpu::Pixmap> {
        None
    }

    /// Fill with a straight-alpha RGBA8 color.
    fn clear(&mut self, rgba: [u8; 4]) {
        let px = premul_rgba8(rgba);
        for d in self.pixels_mut().chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
    }
}

/// Allocates detached surfaces sized for one export.
pub trait SurfaceProvider {
    /// Allocate a cleared `width`x`height` surface.
    fn allocate(&mut self, width: u32, height: u32) -> LoomResult<Box<dyn Surface>>;
}

pub(crate) fn premul_rgba8([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    let premul = |c: u8| -> u8 { ((u16::from(c) * u16::from(a) + 127) / 255) as u8 };
    [premul(r), premul(g), premul(b), a]
}

/// A `vello_cpu` pixmap surface. Dropping it releases the allocation.
pub struct PixmapSurface {
    pixmap: vello_cpu::Pixmap,
    live: Arc<AtomicUsize>,
}

impl Surface for PixmapSurface {
    fn width(&self) -> u32 {
        u32::from(self.pixmap.width())
    }

    fn height(&self) -> u32 {
        u32::from(self.pixmap.height())
    }

    fn pixels(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        self.pixmap.data_as_u8_slice_mut()
    }

    fn as_pixmap_mut(&mut self) -> Option<&mut vello_cpu::Pixmap> {
        Some(&mut self.pixmap)
    }
}

impl Drop for PixmapSurface {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!("surface released");
    }
}

/// Default provider backed by `vello_cpu` pixmaps.
///
/// Tracks how many surfaces it handed out are still alive.
#[derive(Clone, Debug, Default)]
pub struct PixmapSurfaceProvider {
    live: Arc<AtomicUsize>,
}

impl PixmapSurfaceProvider {
    /// Create a provider with no live surfaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Surfaces allocated by this provider and not yet dropped.
    pub fn live_surfaces(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

impl SurfaceProvider for PixmapSurfaceProvider {
    fn allocate(&mut self, width: u32, height: u32) -> LoomResult<Box<dyn Surface>> {
        let w: u16 = width
            .try_into()
            .map_err(|_| LoomError::validation(format!("surface width exceeds u16: {width}")))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| LoomError::validation(format!("surface height exceeds u16: {height}")))?;
        if w == 0 || h == 0 {
            return Err(LoomError::validation("surface width/height must be > 0"));
        }

        self.live.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(width, height, "surface allocated");
        Ok(Box::new(PixmapSurface {
            pixmap: vello_cpu::Pixmap::new(w, h),
            live: Arc::clone(&self.live),
        }))
    }
}
