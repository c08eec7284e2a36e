//! Frame-pipelined GPU resources and post-processing composition.
//!
//! - [`RenderContext`] carries the device, its limits and the frame counter.
//! - [`ring`] maps frame counters to aligned, non-overlapping buffer slots.
//! - [`FrameBuffer`] owns the ping-pong colour attachments.
//! - [`Effect`] is the trait effect authors implement, usually on top of a
//!   [`FullscreenPass`].
//! - [`EffectChain`] dispatches enabled effects in order and swaps
//!   attachments after each one that writes a new image.
//!
//! ```rust,ignore
//! let mut ctx = RenderContext::new(device, Viewport::new(1280, 720));
//! let mut fb = FrameBuffer::new(&ctx, FrameBufferConfig::from(&config))?;
//! let mut chain = EffectChain::with_config(ChainConfig::from(&config));
//! let blur = chain.add(BoxBlur::new());
//! chain.set_enabled(blur, true);
//! chain.initialize(&ctx, &fs);
//!
//! loop {
//!     chain.render(&ctx, &mut fb, &bindings)?;
//!     ctx.advance_frame();
//! }
//! ```

pub mod bytes;
pub mod chain;
pub mod context;
pub mod effect;
pub mod framebuffer;
pub mod fullscreen;
pub mod ring;

pub use bytes::AsBytes;
pub use chain::{ChainConfig, ChainReport, EffectChain, EffectState, InitFailure, MissingBinding};
pub use context::RenderContext;
pub use effect::{Effect, EffectBase, TargetBindings};
pub use framebuffer::{FrameBuffer, FrameBufferConfig};
pub use fullscreen::FullscreenPass;
pub use ring::{compute_aligned_stride, slot_offset, RingBuffer, RingLayout, RingStats, UniformRing};

pub use fxring_core::{FileSystem, GBuffer, RenderError, RenderResult};
