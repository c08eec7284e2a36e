use anyhow::Context;
use fxring::{
    Effect, EffectBase, FileSystem, FrameBuffer, FullscreenPass, GBuffer, RenderContext,
    RenderResult, TargetBindings,
};

use super::{initialized_pass, PassSettings};

const NEAR_PLANE: f32 = 0.1;

/// Draws a depth inset for debugging into `IntermediateTarget2`. It never
/// produces the chain's image, so the chain does not swap after it.
pub struct DepthOverlay {
    base: EffectBase,
    slots: usize,
    pass: Option<FullscreenPass<PassSettings>>,
}

impl DepthOverlay {
    pub const NAME: &'static str = "Depth Overlay";

    pub fn new(slots: usize) -> Self {
        Self {
            base: EffectBase::new(Self::NAME),
            slots,
            pass: None,
        }
    }
}

impl Effect for DepthOverlay {
    fn base(&self) -> &EffectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EffectBase {
        &mut self.base
    }

    fn initialize(&mut self, ctx: &RenderContext, fs: &dyn FileSystem) -> anyhow::Result<()> {
        self.base.add_required_buffer(GBuffer::COLOR);
        self.base.add_required_buffer(GBuffer::Depth);
        let mut pass =
            FullscreenPass::load(ctx, fs, Self::NAME, "depth_overlay.frag", self.slots)
                .context("loading depth_overlay.frag")?;
        pass.prime(ctx, &PassSettings::new(ctx, self.base.intensity(), NEAR_PLANE))?;
        self.pass = Some(pass);
        Ok(())
    }

    fn draw(
        &mut self,
        ctx: &RenderContext,
        _framebuffer: &FrameBuffer,
        targets: &TargetBindings,
    ) -> RenderResult<()> {
        let settings = PassSettings::new(ctx, self.base.intensity(), NEAR_PLANE);
        let pass = initialized_pass(&mut self.pass, Self::NAME)?;
        pass.update(ctx, &settings)?;
        pass.draw(ctx, targets);
        Ok(())
    }

    fn produces_target(&self) -> bool {
        false
    }
}
