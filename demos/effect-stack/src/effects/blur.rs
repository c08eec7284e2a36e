use anyhow::Context;
use fxring::{
    Effect, EffectBase, FileSystem, FrameBuffer, FullscreenPass, GBuffer, RenderContext,
    RenderResult, TargetBindings,
};
use fxring_core::parameters::SimpleParamInfo;

use super::{initialized_pass, PassSettings};

pub struct BoxBlur {
    base: EffectBase,
    radius: usize,
    slots: usize,
    pass: Option<FullscreenPass<PassSettings>>,
}

impl BoxBlur {
    pub const NAME: &'static str = "Box Blur";

    pub fn new(slots: usize) -> Self {
        let mut base = EffectBase::new(Self::NAME);
        let radius = base.add_param(SimpleParamInfo::new("Radius", 2.0).with_range(0.0, 16.0));
        Self {
            base,
            radius,
            slots,
            pass: None,
        }
    }

    fn settings(&self, ctx: &RenderContext) -> PassSettings {
        let radius = self.base.param(self.radius).unwrap_or(0.0).round();
        PassSettings::new(ctx, self.base.intensity(), radius)
    }
}

impl Effect for BoxBlur {
    fn base(&self) -> &EffectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EffectBase {
        &mut self.base
    }

    fn initialize(&mut self, ctx: &RenderContext, fs: &dyn FileSystem) -> anyhow::Result<()> {
        self.base.add_required_buffer(GBuffer::COLOR);
        let mut pass = FullscreenPass::load(ctx, fs, Self::NAME, "blur.frag", self.slots)
            .context("loading blur.frag")?;
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
