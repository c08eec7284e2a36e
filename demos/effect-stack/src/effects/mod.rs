//! Demo effects. Each one is a single fullscreen pass; the interesting part
//! is how the chain composes them, not what they draw.

mod blur;
mod invert;
mod overlay;
mod pixelate;

pub use blur::BoxBlur;
pub use invert::Invert;
pub use overlay::DepthOverlay;
pub use pixelate::Pixelate;

use fxring::{AsBytes, Effect, FullscreenPass, RenderContext, RenderError, RenderResult};

/// Settings record shared by every demo pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassSettings {
    pub intensity: f32,
    /// Effect-specific amount: pixel size, blur radius, near plane.
    pub amount: f32,
    pub texel: [f32; 2],
}

// SAFETY: PassSettings is #[repr(C)] with only f32 fields.
unsafe impl AsBytes for PassSettings {}

impl PassSettings {
    pub fn new(ctx: &RenderContext, intensity: f32, amount: f32) -> Self {
        let viewport = ctx.viewport();
        Self {
            intensity,
            amount,
            texel: [
                1.0 / viewport.width.max(1) as f32,
                1.0 / viewport.height.max(1) as f32,
            ],
        }
    }
}

fn initialized_pass<'a>(
    pass: &'a mut Option<FullscreenPass<PassSettings>>,
    effect: &str,
) -> RenderResult<&'a mut FullscreenPass<PassSettings>> {
    pass.as_mut().ok_or_else(|| RenderError::EffectNotInitialized {
        effect: effect.to_string(),
    })
}

/// The demo stack in dispatch order.
pub fn demo_stack(slots: usize) -> Vec<Box<dyn Effect>> {
    vec![
        Box::new(Invert::new(slots)),
        Box::new(Pixelate::new(slots)),
        Box::new(DepthOverlay::new(slots)),
        Box::new(BoxBlur::new(slots)),
    ]
}
