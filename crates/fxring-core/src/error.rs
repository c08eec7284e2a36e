//! Error type of the resource layer.
//!
//! Framebuffer incompleteness and shader failures are fatal at startup; the
//! application entry point is expected to log them and exit. Everything else
//! is returned so a single failing effect can be isolated.

use thiserror::Error;

use crate::gbuffer::GBuffer;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create framebuffer, status {status:#06x}")]
    IncompleteFramebuffer { status: u32 },

    #[error("failed to compile shader '{label}': {log}")]
    ShaderCompile { label: String, log: String },

    #[error("failed to link program '{label}': {log}")]
    ShaderLink { label: String, log: String },

    #[error("failed to transpile shader '{label}': {message}")]
    ShaderTranspile { label: String, message: String },

    #[error("effect '{effect}' requires {tag} but nothing provides it")]
    MissingBinding { effect: String, tag: GBuffer },

    #[error("effect '{effect}' was drawn before it was initialized")]
    EffectNotInitialized { effect: String },

    #[error("color attachment {index} out of range (max {max})")]
    AttachmentOutOfRange { index: u32, max: u32 },

    #[error("failed to allocate {what}")]
    Allocation { what: String },

    #[error("buffer range {offset}+{len} exceeds buffer size {size}")]
    BufferRange { offset: u64, len: u64, size: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
