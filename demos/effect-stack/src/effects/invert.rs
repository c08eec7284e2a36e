use anyhow::Context;
use fxring::{
    Effect, EffectBase, FileSystem, FrameBuffer, FullscreenPass, GBuffer, RenderContext,
    RenderResult, TargetBindings,
};

use super::{initialized_pass, PassSettings};

pub struct Invert {
    base: EffectBase,
    slots: usize,
    pass: Option<FullscreenPass<PassSettings>>,
}

impl Invert {
    pub const NAME: &'static str = "Invert";

    pub fn new(slots: usize) -> Self {
        Self {
            base: EffectBase::new(Self::NAME),
            slots,
            pass: None,
        }
    }

    fn settings(&self, ctx: &RenderContext) -> PassSettings {
        PassSettings::new(ctx, self.base.intensity(), 0.0)
    }
}

impl Effect for Invert {
    fn base(&self) -> &EffectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EffectBase {
        &mut self.base
    }

    fn initialize(&mut self, ctx: &RenderContext, fs: &dyn FileSystem) -> anyhow::Result<()> {
        self.base.add_required_buffer(GBuffer::COLOR);
        let mut pass = FullscreenPass::load(ctx, fs, Self::NAME, "invert.wgsl", self.slots)
            .context("loading invert.wgsl")?;
        pass.prime(ctx, &self.settings(ctx))?;
        self.pass = Some(pass);
        Ok(())
    }

    fn draw(
        &mut self,
        ctx: &RenderContext,
        _framebuffer: &FrameBuffer,
        targets: &TargetBindings,
    ) -> RenderResult<()> {
        let settings = self.settings(ctx);
        let pass = initialized_pass(&mut self.pass, Self::NAME)?;
        pass.update(ctx, &settings)?;
        pass.draw(ctx, targets);
        Ok(())
    }
}
