use crate::device::{BufferId, BufferKind, FramebufferId, ProgramId, TextureId};

/// Uniform value as recorded by the headless device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    F32(f32),
    I32(i32),
}

/// One call made against a [`HeadlessDevice`](super::HeadlessDevice), in
/// submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateBuffer {
        buffer: BufferId,
        kind: BufferKind,
        size: u64,
    },
    WriteBuffer {
        buffer: BufferId,
        offset: u64,
        len: u64,
    },
    BindBufferRange {
        kind: BufferKind,
        binding: u32,
        buffer: BufferId,
        offset: u64,
        size: u64,
    },
    DeleteBuffer(BufferId),

    CreateTexture {
        texture: TextureId,
        label: String,
    },
    BindTexture {
        unit: u32,
        texture: TextureId,
    },
    DeleteTexture(TextureId),

    CreateFramebuffer(FramebufferId),
    AttachColor {
        framebuffer: FramebufferId,
        index: u32,
        texture: TextureId,
    },
    AttachDepth {
        framebuffer: FramebufferId,
        texture: TextureId,
    },
    BindFramebuffer(Option<FramebufferId>),
    SetDrawBuffer {
        framebuffer: FramebufferId,
        index: u32,
    },
    DeleteFramebuffer(FramebufferId),

    CreateProgram {
        program: ProgramId,
        label: String,
    },
    UseProgram(Option<ProgramId>),
    SetUniform {
        program: ProgramId,
        name: String,
        value: UniformValue,
    },
    BindUniformBlock {
        program: ProgramId,
        block: String,
        binding: u32,
    },
    DeleteProgram(ProgramId),

    /// `target` is the texture at the bound framebuffer's draw buffer, if any.
    DrawFullscreen {
        program: ProgramId,
        target: Option<TextureId>,
    },
}

impl Command {
    pub fn is_draw(&self) -> bool {
        matches!(self, Command::DrawFullscreen { .. })
    }
}
