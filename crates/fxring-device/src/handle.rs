//! RAII wrappers around device objects.
//!
//! Each wrapper keeps the device that created it alive and deletes its object
//! on drop, so a framebuffer resize or shutdown cannot leak GPU memory.

use std::fmt;
use std::rc::Rc;

use fxring_core::{RenderResult, TextureDesc, TextureFormat};
use tracing::trace;

use crate::device::{
    BufferId, BufferKind, FramebufferId, ProgramId, ProgramSource, RenderDevice, TextureId,
};

/// Device handle shared by every resource it created.
pub type SharedDevice = Rc<dyn RenderDevice>;

/// A GPU buffer.
pub struct GpuBuffer {
    id: BufferId,
    kind: BufferKind,
    size: u64,
    device: SharedDevice,
}

impl GpuBuffer {
    pub fn new(device: &SharedDevice, kind: BufferKind, size: u64) -> RenderResult<Self> {
        let id = device.create_buffer(kind, size)?;
        trace!(?id, ?kind, size, "created buffer");
        Ok(Self {
            id,
            kind,
            size,
            device: device.clone(),
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Total size of this buffer in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn write(&self, offset: u64, data: &[u8]) -> RenderResult<()> {
        self.device.write_buffer(self.id, self.kind, offset, data)
    }

    pub fn bind_range(&self, binding: u32, offset: u64, size: u64) {
        self.device
            .bind_buffer_range(self.kind, binding, self.id, offset, size);
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.device.delete_buffer(self.id);
    }
}

impl fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .finish()
    }
}

/// A 2D render-target texture.
pub struct GpuTexture {
    id: TextureId,
    desc: TextureDesc,
    device: SharedDevice,
}

impl GpuTexture {
    pub fn new(device: &SharedDevice, desc: TextureDesc) -> RenderResult<Self> {
        let id = device.create_texture(&desc)?;
        trace!(?id, label = %desc.label, width = desc.width, height = desc.height, "created texture");
        Ok(Self {
            id,
            desc,
            device: device.clone(),
        })
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn format(&self) -> TextureFormat {
        self.desc.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.desc.width, self.desc.height)
    }

    pub fn bind(&self, unit: u32) {
        self.device.bind_texture(unit, self.id);
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        self.device.delete_texture(self.id);
    }
}

impl fmt::Debug for GpuTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuTexture")
            .field("id", &self.id)
            .field("desc", &self.desc)
            .finish()
    }
}

/// A framebuffer object. Attachments are owned separately.
pub struct GpuFramebuffer {
    id: FramebufferId,
    device: SharedDevice,
}

impl GpuFramebuffer {
    pub fn new(device: &SharedDevice) -> RenderResult<Self> {
        let id = device.create_framebuffer()?;
        Ok(Self {
            id,
            device: device.clone(),
        })
    }

    pub fn id(&self) -> FramebufferId {
        self.id
    }
}

impl Drop for GpuFramebuffer {
    fn drop(&mut self) {
        self.device.delete_framebuffer(self.id);
    }
}

impl fmt::Debug for GpuFramebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuFramebuffer").field("id", &self.id).finish()
    }
}

/// A linked shader program.
pub struct GpuProgram {
    id: ProgramId,
    label: String,
    device: SharedDevice,
}

impl GpuProgram {
    /// Compile and link. Failure is fatal for the effect that asked.
    pub fn new(device: &SharedDevice, source: &ProgramSource) -> RenderResult<Self> {
        let id = device.create_program(source)?;
        trace!(?id, label = %source.label, "linked program");
        Ok(Self {
            id,
            label: source.label.clone(),
            device: device.clone(),
        })
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for GpuProgram {
    fn drop(&mut self) {
        self.device.delete_program(self.id);
    }
}

impl fmt::Debug for GpuProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuProgram")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ShaderSource;
    use crate::headless::HeadlessDevice;

    #[test]
    fn dropping_handles_deletes_device_objects() {
        let headless = Rc::new(HeadlessDevice::new());
        let device: SharedDevice = headless.clone();

        {
            let _buffer = GpuBuffer::new(&device, BufferKind::Uniform, 768).unwrap();
            let _texture = GpuTexture::new(
                &device,
                TextureDesc::new("color", 4, 4, TextureFormat::Rgba8),
            )
            .unwrap();
            let _framebuffer = GpuFramebuffer::new(&device).unwrap();
            let _program = GpuProgram::new(
                &device,
                &ProgramSource {
                    label: "noop".into(),
                    vertex: ShaderSource::Glsl("void main() {}".into()),
                    fragment: ShaderSource::Glsl("void main() {}".into()),
                },
            )
            .unwrap();

            assert_eq!(headless.live_buffers(), 1);
            assert_eq!(headless.live_textures(), 1);
            assert_eq!(headless.live_framebuffers(), 1);
            assert_eq!(headless.live_programs(), 1);
        }

        assert_eq!(headless.live_buffers(), 0);
        assert_eq!(headless.live_textures(), 0);
        assert_eq!(headless.live_framebuffers(), 0);
        assert_eq!(headless.live_programs(), 0);
    }

    #[test]
    fn buffer_write_goes_through_the_device() {
        let headless = Rc::new(HeadlessDevice::new());
        let device: SharedDevice = headless.clone();

        let buffer = GpuBuffer::new(&device, BufferKind::Storage, 16).unwrap();
        buffer.write(4, &[1, 2, 3, 4]).unwrap();

        let contents = headless.buffer_contents(buffer.id()).unwrap();
        assert_eq!(&contents[4..8], &[1, 2, 3, 4]);
        assert!(buffer.write(14, &[0; 4]).is_err());
    }
}
