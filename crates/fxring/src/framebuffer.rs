//! Framebuffer with ping-pong colour attachments.
//!
//! Attachment 0 is the current readable result, attachment 1 the writable
//! scratch. After an effect writes attachment 1 the two textures trade
//! places, so a chain of any length runs on two physical images.

use fxring_core::{FxConfig, GBuffer, RenderResult, TextureDesc, TextureFormat};
use fxring_device::{FramebufferId, GpuFramebuffer, GpuTexture, SharedDevice};
use tracing::{debug, trace};

use crate::context::RenderContext;

/// Attachment index effects read from.
pub const SOURCE_ATTACHMENT: u32 = 0;
/// Attachment index effects draw into.
pub const SCRATCH_ATTACHMENT: u32 = 1;
/// Attachment index effects that do not produce the chain's image draw into,
/// when the framebuffer has one.
pub const SIDE_ATTACHMENT: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBufferConfig {
    pub width: u32,
    pub height: u32,
    pub color_format: TextureFormat,
    pub depth_format: Option<TextureFormat>,
    /// At least two; indices 0 and 1 ping-pong.
    pub attachment_count: u32,
}

impl From<&FxConfig> for FrameBufferConfig {
    fn from(config: &FxConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            color_format: config.color_format,
            depth_format: config.depth_format,
            attachment_count: config.attachment_count,
        }
    }
}

struct Targets {
    framebuffer: GpuFramebuffer,
    attachments: Vec<GpuTexture>,
    depth: Option<GpuTexture>,
}

/// Owned render target: a framebuffer object, its colour attachments and an
/// optional depth attachment.
///
/// Any texture handle taken from [`source`](FrameBuffer::source) or
/// [`scratch`](FrameBuffer::scratch) is only meaningful until the next
/// [`swap`](FrameBuffer::swap).
pub struct FrameBuffer {
    device: SharedDevice,
    config: FrameBufferConfig,
    targets: Targets,
    swaps: u64,
}

impl FrameBuffer {
    /// Create and check completeness. An incomplete framebuffer is returned as
    /// [`RenderError::IncompleteFramebuffer`](fxring_core::RenderError).
    pub fn new(ctx: &RenderContext, config: FrameBufferConfig) -> RenderResult<Self> {
        assert!(
            config.attachment_count >= 2,
            "a ping-pong framebuffer needs at least two colour attachments"
        );
        let targets = build(ctx.device(), &config)?;
        Ok(Self {
            device: ctx.device().clone(),
            config,
            targets,
            swaps: 0,
        })
    }

    /// Destroy every attachment and recreate them at the new size.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let config = FrameBufferConfig {
            width,
            height,
            ..self.config
        };
        let targets = build(&self.device, &config)?;
        // Old objects are deleted here, after the replacement is known good.
        self.targets = targets;
        self.config = config;
        self.swaps = 0;
        Ok(())
    }

    /// Exchange the roles of attachments 0 and 1 and re-attach the textures at
    /// the opposite indices.
    pub fn swap(&mut self) -> RenderResult<()> {
        self.targets.attachments.swap(0, 1);
        let id = self.targets.framebuffer.id();
        self.device
            .attach_color(id, SOURCE_ATTACHMENT, self.targets.attachments[0].id())?;
        self.device
            .attach_color(id, SCRATCH_ATTACHMENT, self.targets.attachments[1].id())?;
        self.swaps += 1;
        trace!(swaps = self.swaps, "swapped ping-pong attachments");
        Ok(())
    }

    /// Bind for drawing into the scratch attachment.
    pub fn bind_for_output(&self) {
        let id = self.targets.framebuffer.id();
        self.device.bind_framebuffer(Some(id));
        self.device.set_draw_buffer(id, SCRATCH_ATTACHMENT);
    }

    /// Bind for an effect that does not produce the chain's image. It draws
    /// into attachment 2 (`IntermediateTarget2`) when present, which no swap
    /// touches. Without one it falls back to scratch, where the next
    /// producing effect overwrites it.
    pub fn bind_for_side_output(&self) {
        let id = self.targets.framebuffer.id();
        let index = if self.targets.attachments.len() > SIDE_ATTACHMENT as usize {
            SIDE_ATTACHMENT
        } else {
            SCRATCH_ATTACHMENT
        };
        self.device.bind_framebuffer(Some(id));
        self.device.set_draw_buffer(id, index);
    }

    pub fn id(&self) -> FramebufferId {
        self.targets.framebuffer.id()
    }

    pub fn config(&self) -> &FrameBufferConfig {
        &self.config
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Current readable result.
    pub fn source(&self) -> &GpuTexture {
        &self.targets.attachments[0]
    }

    /// Current writable scratch.
    pub fn scratch(&self) -> &GpuTexture {
        &self.targets.attachments[1]
    }

    pub fn attachments(&self) -> &[GpuTexture] {
        &self.targets.attachments
    }

    pub fn nr_attachments(&self) -> usize {
        self.targets.attachments.len()
    }

    pub fn depth(&self) -> Option<&GpuTexture> {
        self.targets.depth.as_ref()
    }

    /// Number of swaps since creation or the last resize.
    pub fn swap_count(&self) -> u64 {
        self.swaps
    }

    /// Texture this framebuffer provides for `tag`, if it manages that tag.
    pub fn target(&self, tag: GBuffer) -> Option<&GpuTexture> {
        match tag {
            GBuffer::Albedo => Some(self.source()),
            GBuffer::IntermediateTarget => Some(self.scratch()),
            GBuffer::IntermediateTarget2 => self.targets.attachments.get(2),
            GBuffer::Depth => self.depth(),
            _ => None,
        }
    }

    pub fn provides(&self, tag: GBuffer) -> bool {
        self.target(tag).is_some()
    }
}

fn build(device: &SharedDevice, config: &FrameBufferConfig) -> RenderResult<Targets> {
    let framebuffer = GpuFramebuffer::new(device)?;

    let mut attachments = Vec::with_capacity(config.attachment_count as usize);
    for index in 0..config.attachment_count {
        let texture = GpuTexture::new(
            device,
            TextureDesc::new(
                format!("attachment{index}"),
                config.width,
                config.height,
                config.color_format,
            ),
        )?;
        device.attach_color(framebuffer.id(), index, texture.id())?;
        attachments.push(texture);
    }

    let depth = match config.depth_format {
        Some(format) => {
            let texture = GpuTexture::new(
                device,
                TextureDesc::new("depth", config.width, config.height, format),
            )?;
            device.attach_depth(framebuffer.id(), texture.id())?;
            Some(texture)
        }
        None => None,
    };

    device.framebuffer_status(framebuffer.id()).check()?;
    debug!(
        width = config.width,
        height = config.height,
        attachments = config.attachment_count,
        depth = depth.is_some(),
        "framebuffer created"
    );

    Ok(Targets {
        framebuffer,
        attachments,
        depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxring_core::format::status;
    use fxring_core::{RenderError, Viewport};
    use fxring_device::HeadlessDevice;
    use std::rc::Rc;

    fn setup() -> (Rc<HeadlessDevice>, RenderContext) {
        let device = Rc::new(HeadlessDevice::new());
        let ctx = RenderContext::new(device.clone(), Viewport::new(32, 32));
        (device, ctx)
    }

    fn config() -> FrameBufferConfig {
        FrameBufferConfig {
            width: 32,
            height: 32,
            color_format: TextureFormat::Rgba16F,
            depth_format: Some(TextureFormat::Depth24),
            attachment_count: 2,
        }
    }

    #[test]
    fn swap_exchanges_source_and_scratch() {
        let (device, ctx) = setup();
        let mut fb = FrameBuffer::new(&ctx, config()).unwrap();
        let a = fb.source().id();
        let b = fb.scratch().id();

        fb.swap().unwrap();
        assert_eq!(fb.source().id(), b);
        assert_eq!(fb.scratch().id(), a);
        assert_eq!(device.color_attachment(fb.id(), 0), Some(b));
        assert_eq!(device.color_attachment(fb.id(), 1), Some(a));

        fb.swap().unwrap();
        assert_eq!(fb.source().id(), a);
        assert_eq!(fb.scratch().id(), b);
        assert_eq!(fb.swap_count(), 2);
    }

    #[test]
    fn managed_tags() {
        let (_device, ctx) = setup();
        let fb = FrameBuffer::new(&ctx, config()).unwrap();
        assert_eq!(fb.target(GBuffer::COLOR).map(|t| t.id()), Some(fb.source().id()));
        assert_eq!(
            fb.target(GBuffer::IntermediateTarget).map(|t| t.id()),
            Some(fb.scratch().id())
        );
        assert!(fb.provides(GBuffer::Depth));
        assert!(!fb.provides(GBuffer::IntermediateTarget2));
        assert!(!fb.provides(GBuffer::Normal));
    }

    #[test]
    fn incompatible_depth_format_is_fatal() {
        let (device, ctx) = setup();
        let result = FrameBuffer::new(
            &ctx,
            FrameBufferConfig {
                depth_format: Some(TextureFormat::Rgba8),
                ..config()
            },
        );
        match result {
            Err(RenderError::IncompleteFramebuffer { status: code }) => {
                assert_eq!(code, status::INCOMPLETE_ATTACHMENT)
            }
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("incomplete framebuffer was accepted"),
        }
        assert_eq!(device.live_framebuffers(), 0);
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn resize_recreates_without_leaking() {
        let (device, ctx) = setup();
        let mut fb = FrameBuffer::new(&ctx, config()).unwrap();
        let old_source = fb.source().id();
        fb.swap().unwrap();

        fb.resize(64, 48).unwrap();
        assert_eq!(fb.dimensions(), (64, 48));
        assert_eq!(fb.source().dimensions(), (64, 48));
        assert_ne!(fb.source().id(), old_source);
        assert_eq!(fb.swap_count(), 0);
        assert_eq!(device.live_framebuffers(), 1);
        assert_eq!(device.live_textures(), 3);

        drop(fb);
        assert_eq!(device.live_framebuffers(), 0);
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn bind_for_output_targets_scratch() {
        let (device, ctx) = setup();
        let fb = FrameBuffer::new(&ctx, config()).unwrap();
        fb.bind_for_output();
        assert_eq!(device.bound_framebuffer(), Some(fb.id()));
    }
}
