//! Backend-independent vocabulary shared by every fxring crate.
//!
//! - [`GBuffer`] names the render targets effects consume and produce.
//! - [`format`] describes texture formats and framebuffer completeness codes.
//! - [`FrameData`] carries the per-frame viewport and timing.
//! - [`parameters`] describes effect parameters for UI and automation.
//! - [`fs`] is the file-system handle effects load their shaders through.
//! - [`RenderError`] is the error type of the whole resource layer.

pub mod config;
pub mod error;
pub mod format;
pub mod frame;
pub mod fs;
pub mod gbuffer;
pub mod logging;
pub mod parameters;

pub use config::FxConfig;
pub use error::{RenderError, RenderResult};
pub use format::{FramebufferStatus, TextureDesc, TextureFormat};
pub use frame::{FrameData, Viewport};
pub use fs::{DirFileSystem, FileSystem, MemoryFileSystem};
pub use gbuffer::GBuffer;
