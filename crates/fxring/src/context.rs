//! Explicit render context handed to every ring buffer, framebuffer and
//! effect.

use fxring_core::{FrameData, Viewport};
use fxring_device::{DeviceLimits, SharedDevice};
use tracing::debug;

/// Device, driver limits and frame counter for one render loop.
///
/// Limits are queried exactly once, here, before any ring buffer is sized.
/// The frame counter starts at zero and only moves forward through
/// [`advance_frame`](RenderContext::advance_frame).
pub struct RenderContext {
    device: SharedDevice,
    limits: DeviceLimits,
    frame: u64,
    frame_data: FrameData,
}

impl RenderContext {
    pub fn new(device: SharedDevice, viewport: Viewport) -> Self {
        let limits = device.limits();
        debug!(
            device = device.name(),
            uniform_alignment = limits.uniform_offset_alignment,
            storage_alignment = limits.storage_offset_alignment,
            max_color_attachments = limits.max_color_attachments,
            "render context created"
        );
        Self {
            device,
            limits,
            frame: 0,
            frame_data: FrameData::new(viewport),
        }
    }

    pub fn device(&self) -> &SharedDevice {
        &self.device
    }

    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    /// Current logical frame.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn frame_data(&self) -> &FrameData {
        &self.frame_data
    }

    pub fn viewport(&self) -> Viewport {
        self.frame_data.viewport
    }

    /// Move to the next logical frame and sample the clock.
    pub fn advance_frame(&mut self) -> u64 {
        self.frame += 1;
        self.frame_data.tick();
        self.frame
    }

    /// Record a new viewport. Framebuffers are resized by their owners.
    pub fn resize(&mut self, width: u32, height: u32) {
        debug!(width, height, "viewport resized");
        self.frame_data.set_viewport(Viewport::new(width, height));
    }
}
