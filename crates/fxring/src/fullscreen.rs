//! Fullscreen-pass helper shared by most image-space effects.

use std::path::Path;

use fxring_core::{FileSystem, GBuffer, RenderResult};
use fxring_device::{GpuProgram, ProgramSource, ShaderSource};

use crate::bytes::AsBytes;
use crate::context::RenderContext;
use crate::effect::TargetBindings;
use crate::ring::UniformRing;

/// Vertex stage for a 4-vertex triangle strip covering the viewport.
pub const FULLSCREEN_VERTEX_GLSL: &str = r#"#version 330 core
out vec2 v_uv;

void main() {
    vec2 corner = vec2(float(gl_VertexID & 1), float((gl_VertexID >> 1) & 1));
    v_uv = corner;
    gl_Position = vec4(corner * 2.0 - 1.0, 0.0, 1.0);
}
"#;

/// The same strip for WGSL fragments. Both stages then go through one
/// transpiler, so the varying names agree.
pub const FULLSCREEN_VERTEX_WGSL: &str = r#"struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let corner = vec2<f32>(f32(index & 1u), f32((index >> 1u) & 1u));
    var out: VertexOutput;
    out.position = vec4<f32>(corner * 2.0 - 1.0, 0.0, 1.0);
    out.uv = corner;
    return out;
}
"#;

/// Uniform block name and binding point per-frame settings are bound to.
/// In WGSL this is the struct type name of the uniform variable.
pub const SETTINGS_BLOCK: &str = "Settings";
pub const SETTINGS_BINDING: u32 = 0;

/// Entry points expected in WGSL shaders.
pub const WGSL_VERTEX_ENTRY: &str = "vs_main";
pub const WGSL_FRAGMENT_ENTRY: &str = "fs_main";

/// Sampler uniform name for a target, e.g. `u_Normal`. WGSL shaders name the
/// texture variable this way.
pub fn sampler_name(tag: GBuffer) -> String {
    format!("u_{}", tag.name())
}

/// Vertex stage written in the same language as `fragment`.
pub(crate) fn vertex_stage_for(fragment: &ShaderSource) -> ShaderSource {
    match fragment {
        ShaderSource::Glsl(_) => ShaderSource::Glsl(FULLSCREEN_VERTEX_GLSL.to_string()),
        ShaderSource::Wgsl { .. } => ShaderSource::Wgsl {
            source: FULLSCREEN_VERTEX_WGSL.to_string(),
            entry_point: WGSL_VERTEX_ENTRY.to_string(),
        },
    }
}

/// A fragment program drawn over the whole target, with a ring of `T`
/// settings records written one frame ahead of use.
pub struct FullscreenPass<T: AsBytes> {
    program: GpuProgram,
    settings: UniformRing<T>,
}

impl<T: AsBytes> FullscreenPass<T> {
    pub fn new(
        ctx: &RenderContext,
        label: &str,
        fragment: ShaderSource,
        slots: usize,
    ) -> RenderResult<Self> {
        let source = ProgramSource {
            label: label.to_string(),
            vertex: vertex_stage_for(&fragment),
            fragment,
        };
        let program = GpuProgram::new(ctx.device(), &source)?;
        ctx.device()
            .bind_uniform_block(program.id(), SETTINGS_BLOCK, SETTINGS_BINDING);
        let settings = UniformRing::new(ctx, slots)?;
        Ok(Self { program, settings })
    }

    /// Load the fragment stage from `path`. Files ending in `.wgsl` are
    /// transpiled by the backend; anything else is taken as GLSL.
    pub fn load(
        ctx: &RenderContext,
        fs: &dyn FileSystem,
        label: &str,
        path: &str,
        slots: usize,
    ) -> RenderResult<Self> {
        let text = fs.read_to_string(path)?;
        let fragment = match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some("wgsl") => ShaderSource::Wgsl {
                source: text,
                entry_point: WGSL_FRAGMENT_ENTRY.to_string(),
            },
            _ => ShaderSource::Glsl(text),
        };
        Self::new(ctx, label, fragment, slots)
    }

    pub fn program(&self) -> &GpuProgram {
        &self.program
    }

    pub fn settings(&self) -> &UniformRing<T> {
        &self.settings
    }

    /// Write the settings consumed next frame.
    pub fn update(&mut self, ctx: &RenderContext, settings: &T) -> RenderResult<()> {
        self.settings.write(ctx.frame(), settings)
    }

    /// Write the settings consumed by the current frame. Call once after
    /// creation so the first draw does not read an empty slot.
    pub fn prime(&mut self, ctx: &RenderContext, settings: &T) -> RenderResult<()> {
        self.settings.write(ctx.frame().wrapping_sub(1), settings)
    }

    /// Point each sampler at its target's texture unit, bind this frame's
    /// settings and draw.
    pub fn draw(&mut self, ctx: &RenderContext, targets: &TargetBindings) {
        let device = ctx.device();
        let program = self.program.id();
        device.use_program(Some(program));
        for (tag, _) in targets.iter() {
            device.set_uniform_i32(program, &sampler_name(tag), tag.binding_slot() as i32);
        }
        self.settings.bind(ctx.frame(), SETTINGS_BINDING);
        device.draw_fullscreen(program);
        device.use_program(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxring_core::{MemoryFileSystem, RenderError, Viewport};
    use fxring_device::headless::{Command, UniformValue};
    use fxring_device::{HeadlessDevice, TextureId};
    use std::rc::Rc;

    #[repr(C)]
    struct Tint {
        color: [f32; 4],
    }

    unsafe impl AsBytes for Tint {}

    #[test]
    fn draw_binds_samplers_settings_and_program() {
        let device = Rc::new(HeadlessDevice::new());
        let ctx = RenderContext::new(device.clone(), Viewport::new(8, 8));
        let mut pass: FullscreenPass<Tint> =
            FullscreenPass::new(&ctx, "tint", ShaderSource::Glsl("void main() {}".into()), 3)
                .unwrap();
        assert_eq!(device.uniform_block_binding(pass.program().id(), SETTINGS_BLOCK), Some(0));

        pass.update(&ctx, &Tint { color: [1.0; 4] }).unwrap();
        device.clear_commands();

        let targets = TargetBindings::new().with(GBuffer::Normal, TextureId(5));
        pass.draw(&ctx, &targets);

        let program = pass.program().id();
        assert_eq!(
            device.uniform(program, "u_Normal"),
            Some(UniformValue::I32(GBuffer::Normal.binding_slot() as i32))
        );
        let commands = device.commands();
        assert!(commands.contains(&Command::BindBufferRange {
            kind: fxring_device::BufferKind::Uniform,
            binding: SETTINGS_BINDING,
            buffer: pass.settings().ring().buffer().id(),
            offset: 0,
            size: 256,
        }));
        assert!(matches!(commands.last(), Some(Command::UseProgram(None))));
        assert_eq!(device.draw_count(), 1);
    }

    #[test]
    fn wgsl_fragments_get_a_wgsl_vertex_stage() {
        let wgsl = ShaderSource::Wgsl {
            source: "@fragment fn fs_main() {}".into(),
            entry_point: WGSL_FRAGMENT_ENTRY.into(),
        };
        match vertex_stage_for(&wgsl) {
            ShaderSource::Wgsl { source, entry_point } => {
                assert_eq!(source, FULLSCREEN_VERTEX_WGSL);
                assert_eq!(entry_point, WGSL_VERTEX_ENTRY);
            }
            other => panic!("unexpected vertex stage {other:?}"),
        }
        assert!(matches!(
            vertex_stage_for(&ShaderSource::Glsl("void main() {}".into())),
            ShaderSource::Glsl(_)
        ));
    }

    #[test]
    fn prime_fills_the_slot_read_this_frame() {
        let device = Rc::new(HeadlessDevice::new());
        let ctx = RenderContext::new(device.clone(), Viewport::new(8, 8));
        let mut pass: FullscreenPass<f32> =
            FullscreenPass::new(&ctx, "p", ShaderSource::Glsl("void main() {}".into()), 3).unwrap();

        pass.prime(&ctx, &0.5).unwrap();
        pass.draw(&ctx, &TargetBindings::new());

        let contents = device
            .buffer_contents(pass.settings().ring().buffer().id())
            .unwrap();
        assert_eq!(&contents[0..4], &0.5f32.to_ne_bytes());
        assert_eq!(pass.settings().stats().unconsumed_overwrites, 0);
    }

    #[test]
    fn load_reports_missing_files_and_bad_shaders() {
        let device = Rc::new(HeadlessDevice::new());
        let ctx = RenderContext::new(device.clone(), Viewport::new(8, 8));
        let fs = MemoryFileSystem::new().with_file("broken.frag", "#error nope");

        match FullscreenPass::<f32>::load(&ctx, &fs, "missing", "missing.frag", 3) {
            Err(RenderError::Io(_)) => {}
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("missing file loaded"),
        }
        match FullscreenPass::<f32>::load(&ctx, &fs, "broken", "broken.frag", 3) {
            Err(RenderError::ShaderCompile { label, .. }) => assert_eq!(label, "broken"),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("broken shader compiled"),
        }
        assert_eq!(device.live_programs(), 0);
        assert_eq!(device.live_buffers(), 0);
    }
}
