//! Per-frame data handed to every effect.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Standard data the application provides to the chain each frame.
#[derive(Debug, Clone)]
pub struct FrameData {
    pub created_at: Instant,
    pub viewport: Viewport,
    /// Time since `created_at` at the last tick.
    pub elapsed: Duration,
    /// Time between the last two ticks.
    pub delta: Duration,
}

impl FrameData {
    pub fn new(viewport: Viewport) -> FrameData {
        Self {
            created_at: Instant::now(),
            viewport,
            elapsed: Duration::ZERO,
            delta: Duration::ZERO,
        }
    }

    /// Sample the clock for a new frame.
    pub fn tick(&mut self) {
        let elapsed = self.created_at.elapsed();
        self.delta = elapsed.saturating_sub(self.elapsed);
        self.elapsed = elapsed;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn get_dimensions(&self) -> (u32, u32) {
        (self.viewport.width, self.viewport.height)
    }
}
