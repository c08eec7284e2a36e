//! The [`RenderDevice`] trait and the plain-data types it speaks.

use fxring_core::{FramebufferStatus, RenderResult, TextureDesc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Which binding point a buffer is used through. Each kind has its own
/// driver-imposed offset alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Uniform,
    Storage,
}

/// Limits queried from the driver once, when a device is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub uniform_offset_alignment: u64,
    pub storage_offset_alignment: u64,
    pub max_color_attachments: u32,
    pub max_texture_units: u32,
}

impl DeviceLimits {
    pub fn alignment_for(&self, kind: BufferKind) -> u64 {
        match kind {
            BufferKind::Uniform => self.uniform_offset_alignment,
            BufferKind::Storage => self.storage_offset_alignment,
        }
    }
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            uniform_offset_alignment: 256,
            storage_offset_alignment: 256,
            max_color_attachments: 8,
            max_texture_units: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Shader source for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    /// GLSL, compiled as-is.
    Glsl(String),
    /// WGSL, transpiled by the backend before compilation.
    Wgsl { source: String, entry_point: String },
}

impl ShaderSource {
    pub fn text(&self) -> &str {
        match self {
            ShaderSource::Glsl(source) => source,
            ShaderSource::Wgsl { source, .. } => source,
        }
    }
}

/// A vertex + fragment program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub label: String,
    pub vertex: ShaderSource,
    pub fragment: ShaderSource,
}

/// Everything the resource layer asks of a GPU API.
///
/// All methods take `&self`: a device is driven from a single render thread
/// and implementations keep whatever bookkeeping they need behind interior
/// mutability. Methods returning [`RenderResult`] can fail at resource
/// creation; binding and drawing calls cannot.
pub trait RenderDevice {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    fn limits(&self) -> DeviceLimits;

    // Buffers

    fn create_buffer(&self, kind: BufferKind, size: u64) -> RenderResult<BufferId>;

    /// Write `data` at `offset` without waiting for the GPU. The written range
    /// is invalidated first; callers guarantee the GPU is not reading it.
    fn write_buffer(
        &self,
        buffer: BufferId,
        kind: BufferKind,
        offset: u64,
        data: &[u8],
    ) -> RenderResult<()>;

    fn bind_buffer_range(
        &self,
        kind: BufferKind,
        binding: u32,
        buffer: BufferId,
        offset: u64,
        size: u64,
    );

    fn delete_buffer(&self, buffer: BufferId);

    // Textures

    fn create_texture(&self, desc: &TextureDesc) -> RenderResult<TextureId>;

    fn bind_texture(&self, unit: u32, texture: TextureId);

    fn delete_texture(&self, texture: TextureId);

    // Framebuffers

    fn create_framebuffer(&self) -> RenderResult<FramebufferId>;

    fn attach_color(
        &self,
        framebuffer: FramebufferId,
        index: u32,
        texture: TextureId,
    ) -> RenderResult<()>;

    fn attach_depth(&self, framebuffer: FramebufferId, texture: TextureId) -> RenderResult<()>;

    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus;

    /// `None` binds the default framebuffer.
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>);

    /// Select which colour attachment subsequent draws write to.
    fn set_draw_buffer(&self, framebuffer: FramebufferId, index: u32);

    fn delete_framebuffer(&self, framebuffer: FramebufferId);

    // Programs

    fn create_program(&self, source: &ProgramSource) -> RenderResult<ProgramId>;

    fn use_program(&self, program: Option<ProgramId>);

    fn set_uniform_f32(&self, program: ProgramId, name: &str, value: f32);

    fn set_uniform_i32(&self, program: ProgramId, name: &str, value: i32);

    fn bind_uniform_block(&self, program: ProgramId, block: &str, binding: u32);

    fn delete_program(&self, program: ProgramId);

    // Drawing

    /// Draw a fullscreen 4-vertex triangle strip with culling, blending and
    /// depth testing disabled.
    fn draw_fullscreen(&self, program: ProgramId);
}
