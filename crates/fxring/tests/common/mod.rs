#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use fxring::{Effect, EffectBase, FileSystem, FrameBuffer, GBuffer, RenderContext, RenderResult, TargetBindings};
use fxring_core::{TextureFormat, Viewport};
use fxring_device::{GpuProgram, HeadlessDevice, ProgramId, ProgramSource, ShaderSource};

pub type DrawLog = Rc<RefCell<Vec<String>>>;

/// Effect that draws one fullscreen strip with its own program and logs its
/// name on every draw.
pub struct Recording {
    base: EffectBase,
    produces: bool,
    program: Option<GpuProgram>,
    log: DrawLog,
}

impl Recording {
    pub fn new(name: &str, produces: bool, log: &DrawLog) -> Self {
        Self {
            base: EffectBase::new(name),
            produces,
            program: None,
            log: log.clone(),
        }
    }

    pub fn requiring(mut self, tag: GBuffer) -> Self {
        self.base.add_required_buffer(tag);
        self
    }
}

impl Effect for Recording {
    fn base(&self) -> &EffectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EffectBase {
        &mut self.base
    }

    fn initialize(&mut self, ctx: &RenderContext, _fs: &dyn FileSystem) -> anyhow::Result<()> {
        self.base.add_required_buffer(GBuffer::COLOR);
        let source = ProgramSource {
            label: self.base.name().to_string(),
            vertex: ShaderSource::Glsl("void main() {}".into()),
            fragment: ShaderSource::Glsl("void main() {}".into()),
        };
        self.program = Some(GpuProgram::new(ctx.device(), &source)?);
        Ok(())
    }

    fn draw(
        &mut self,
        ctx: &RenderContext,
        _framebuffer: &FrameBuffer,
        _targets: &TargetBindings,
    ) -> RenderResult<()> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| fxring::RenderError::EffectNotInitialized {
                effect: self.base.name().to_string(),
            })?;
        ctx.device().use_program(Some(program.id()));
        ctx.device().draw_fullscreen(program.id());
        self.log.borrow_mut().push(self.base.name().to_string());
        Ok(())
    }

    fn produces_target(&self) -> bool {
        self.produces
    }
}

/// Program id an initialized `Recording` effect draws with, looked up by label.
pub fn program_of(device: &HeadlessDevice, label: &str) -> Option<ProgramId> {
    device.commands().into_iter().find_map(|command| match command {
        fxring_device::headless::Command::CreateProgram { program, label: l } if l == label => {
            Some(program)
        }
        _ => None,
    })
}

pub fn headless(width: u32, height: u32) -> (Rc<HeadlessDevice>, RenderContext) {
    let device = Rc::new(HeadlessDevice::new());
    let ctx = RenderContext::new(device.clone(), Viewport::new(width, height));
    (device, ctx)
}

pub fn targets(width: u32, height: u32) -> fxring::FrameBufferConfig {
    fxring::FrameBufferConfig {
        width,
        height,
        color_format: TextureFormat::Rgba16F,
        depth_format: Some(TextureFormat::Depth24),
        attachment_count: 2,
    }
}
