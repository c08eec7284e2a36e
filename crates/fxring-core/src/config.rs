//! Runtime configuration for the ring buffers, framebuffer and chain.

use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;

use tracing::warn;

use crate::format::TextureFormat;

/// Number of in-flight frame slots. Three tolerates one extra frame of GPU
/// latency on top of the writer/reader separation.
pub const DEFAULT_RING_SLOTS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct FxConfig {
    pub ring_slots: usize,
    pub width: u32,
    pub height: u32,
    pub color_format: TextureFormat,
    pub depth_format: Option<TextureFormat>,
    /// Colour attachments per framebuffer; indices 0 and 1 ping-pong.
    pub attachment_count: u32,
    /// Fail `render` when a required target is unavailable instead of warning.
    pub strict_bindings: bool,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            ring_slots: DEFAULT_RING_SLOTS,
            width: 1280,
            height: 720,
            color_format: TextureFormat::Rgba16F,
            depth_format: Some(TextureFormat::Depth24),
            attachment_count: 2,
            strict_bindings: false,
        }
    }
}

impl FxConfig {
    /// Defaults overridden by `FXRING_RING_SLOTS`, `FXRING_WIDTH`,
    /// `FXRING_HEIGHT` and `FXRING_STRICT_BINDINGS`. A zero slot count is
    /// rejected like any other unparsable value.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(slots) = parse_var::<NonZeroUsize>(&lookup, "FXRING_RING_SLOTS") {
            config.ring_slots = slots.get();
        }
        if let Some(width) = parse_var(&lookup, "FXRING_WIDTH") {
            config.width = width;
        }
        if let Some(height) = parse_var(&lookup, "FXRING_HEIGHT") {
            config.height = height;
        }
        if let Some(strict) = parse_var(&lookup, "FXRING_STRICT_BINDINGS") {
            config.strict_bindings = strict;
        }
        if config.ring_slots < 2 {
            warn!(
                slots = config.ring_slots,
                "ring buffers with fewer than two slots let the CPU overwrite data the GPU is reading"
            );
        }
        config
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
