use anyhow::Context;
use fxring::{
    Effect, EffectBase, FileSystem, FrameBuffer, FullscreenPass, GBuffer, RenderContext,
    RenderResult, TargetBindings,
};
use fxring_core::parameters::SimpleParamInfo;

use super::{initialized_pass, PassSettings};

/// Reads the colour target and writes the intermediate target, in cells of
/// `Pixel Size` pixels.
pub struct Pixelate {
    base: EffectBase,
    pixel_size: usize,
    slots: usize,
    pass: Option<FullscreenPass<PassSettings>>,
}

impl Pixelate {
    pub const NAME: &'static str = "Pixelate";

    pub fn new(slots: usize) -> Self {
        let mut base = EffectBase::new(Self::NAME);
        let pixel_size =
            base.add_param(SimpleParamInfo::new("Pixel Size", 8.0).with_range(1.0, 64.0));
        Self {
            base,
            pixel_size,
            slots,
            pass: None,
        }
    }

    fn settings(&self, ctx: &RenderContext) -> PassSettings {
        let size = self.base.param(self.pixel_size).unwrap_or(1.0);
        PassSettings::new(ctx, self.base.intensity(), size)
    }
}

impl Effect for Pixelate {
    fn base(&self) -> &EffectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EffectBase {
        &mut self.base
    }

    fn initialize(&mut self, ctx: &RenderContext, fs: &dyn FileSystem) -> anyhow::Result<()> {
        self.base.add_required_buffer(GBuffer::COLOR);
        let mut pass = FullscreenPass::load(ctx, fs, Self::NAME, "pixelate.frag", self.slots)
            .context("loading pixelate.frag")?;
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
