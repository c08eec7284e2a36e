//! Texture formats, texture descriptors and framebuffer completeness.

use crate::error::{RenderError, RenderResult};

/// Pixel formats render targets can be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8,
    Rgba16F,
    Rgba32F,
    Rg16F,
    R16F,
    R32F,
    Depth16,
    Depth24,
    Depth32F,
    Depth24Stencil8,
}

impl TextureFormat {
    /// Whether the format can only be attached as a depth attachment.
    pub const fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16
                | TextureFormat::Depth24
                | TextureFormat::Depth32F
                | TextureFormat::Depth24Stencil8
        )
    }

    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgba16F => 8,
            TextureFormat::Rgba32F => 16,
            TextureFormat::Rg16F => 4,
            TextureFormat::R16F => 2,
            TextureFormat::R32F => 4,
            TextureFormat::Depth16 => 2,
            TextureFormat::Depth24 => 4,
            TextureFormat::Depth32F => 4,
            TextureFormat::Depth24Stencil8 => 4,
        }
    }
}

/// Describes a 2D render-target texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TextureDesc {
    pub fn new(label: impl Into<String>, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            format,
        }
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.format.bytes_per_pixel() as u64
    }
}

/// Framebuffer status codes, numerically identical to the GL enums so every
/// backend reports the same values.
pub mod status {
    pub const COMPLETE: u32 = 0x8CD5;
    pub const INCOMPLETE_ATTACHMENT: u32 = 0x8CD6;
    pub const INCOMPLETE_MISSING_ATTACHMENT: u32 = 0x8CD7;
    pub const INCOMPLETE_DIMENSIONS: u32 = 0x8CD9;
    pub const INCOMPLETE_DRAW_BUFFER: u32 = 0x8CDB;
    pub const UNSUPPORTED: u32 = 0x8CDD;
    pub const UNDEFINED: u32 = 0x8219;
}

/// Result of a framebuffer completeness query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    Incomplete(u32),
}

impl FramebufferStatus {
    pub fn from_code(code: u32) -> Self {
        if code == status::COMPLETE {
            FramebufferStatus::Complete
        } else {
            FramebufferStatus::Incomplete(code)
        }
    }

    pub fn code(self) -> u32 {
        match self {
            FramebufferStatus::Complete => status::COMPLETE,
            FramebufferStatus::Incomplete(code) => code,
        }
    }

    pub fn is_complete(self) -> bool {
        self == FramebufferStatus::Complete
    }

    /// Turn an incomplete status into the fatal initialization error.
    pub fn check(self) -> RenderResult<()> {
        match self {
            FramebufferStatus::Complete => Ok(()),
            FramebufferStatus::Incomplete(status) => {
                Err(RenderError::IncompleteFramebuffer { status })
            }
        }
    }
}
