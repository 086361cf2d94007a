use std::collections::BTreeMap;

use crate::animation::value::ParamValue;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::LoomResult;
use crate::render::surface::Surface;

/// Everything a renderer may read for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameCtx<'a> {
    /// Frame being rendered.
    pub frame: FrameIndex,
    /// Frames in the animation.
    pub total_frames: u64,
    /// `frame / (total_frames - 1)`, or `0` for single-frame animations.
    pub normalized_time: f64,
    /// Configured frame rate.
    pub fps: u32,
    /// User seed for [`crate::foundation::rng`].
    pub seed: &'a str,
    /// Parameter values sampled from the timeline at `normalized_time`.
    pub params: &'a BTreeMap<String, ParamValue>,
}

impl FrameCtx<'_> {
    /// Numeric parameter `name`, or `default` when absent or not a number.
    pub fn number(&self, name: &str, default: f64) -> f64 {
        self.params
            .get(name)
            .and_then(ParamValue::as_number)
            .unwrap_or(default)
    }

    /// Boolean parameter `name`, or `default` when absent or not a bool.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.params
            .get(name)
            .and_then(ParamValue::as_bool)
            .unwrap_or(default)
    }
}

/// Paints one frame onto a surface. Frames are requested in strictly increasing order.
pub trait FrameRenderer {
    /// Paint `ctx.frame` onto `surface`.
    fn render(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) -> LoomResult<()>;
}

impl<F> FrameRenderer for F
where
    F: FnMut(&FrameCtx<'_>, &mut dyn Surface) -> LoomResult<()>,
{
    fn render(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) -> LoomResult<()> {
        self(ctx, surface)
    }
}
