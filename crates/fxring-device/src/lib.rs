//! Render-device seam.
//!
//! This crate defines the [`RenderDevice`] trait, the one interface the ring
//! buffers, framebuffers and effects talk to. Implementations exist for
//! OpenGL (the `fxring-gl` crate) and for an in-memory [`HeadlessDevice`] that
//! records every command, which is what the test suites and the demo run on.
//!
//! GPU objects are owned through the RAII wrappers in [`handle`]; dropping a
//! wrapper issues the matching delete call on the device that created it.

pub mod device;
pub mod handle;
pub mod headless;

pub use device::{
    BufferId, BufferKind, DeviceLimits, FramebufferId, ProgramId, ProgramSource, RenderDevice,
    ShaderSource, ShaderStage, TextureId,
};
pub use handle::{GpuBuffer, GpuFramebuffer, GpuProgram, GpuTexture, SharedDevice};
pub use headless::HeadlessDevice;
