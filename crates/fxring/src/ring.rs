//! Frame-pipelined ring buffers.
//!
//! One physical buffer holds `slots` aligned copies of a record. The CPU
//! writes the copy for frame `F + 1` while the GPU reads the copy for frame
//! `F`, so with two or more slots the writer never touches the range being
//! consumed. Nothing here waits on a fence: the slot count is the only thing
//! separating writer and reader, and it has to cover the actual GPU latency.
//!
//! Zero-sized records, zero alignment, zero slots and payloads larger than a
//! slot are programming errors and panic.

use std::marker::PhantomData;

use num::Integer;
use tracing::{debug, warn};

use fxring_core::RenderResult;
use fxring_device::{BufferKind, DeviceLimits, GpuBuffer};

use crate::bytes::AsBytes;
use crate::context::RenderContext;

/// Round `struct_size` up to the next multiple of `alignment`.
pub fn compute_aligned_stride(struct_size: u64, alignment: u64) -> u64 {
    assert!(struct_size > 0, "ring buffer record size must be non-zero");
    assert!(alignment > 0, "driver alignment must be non-zero");
    Integer::div_ceil(&struct_size, &alignment) * alignment
}

/// Byte offset of the slot backing `frame`.
pub fn slot_offset(frame: u64, stride: u64, slots: usize) -> u64 {
    assert!(slots > 0, "ring buffer needs at least one slot");
    (frame % slots as u64) * stride
}

/// Validated addressing parameters of one ring buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingLayout {
    pub struct_size: u64,
    pub alignment: u64,
    pub stride: u64,
    pub slots: usize,
}

impl RingLayout {
    pub fn new(struct_size: u64, alignment: u64, slots: usize) -> Self {
        assert!(slots > 0, "ring buffer needs at least one slot");
        Self {
            struct_size,
            alignment,
            stride: compute_aligned_stride(struct_size, alignment),
            slots,
        }
    }

    /// Layout using the device alignment for `kind`.
    pub fn for_kind(struct_size: u64, kind: BufferKind, limits: &DeviceLimits, slots: usize) -> Self {
        Self::new(struct_size, limits.alignment_for(kind), slots)
    }

    /// `stride * slots`, the size allocated once up front.
    pub fn total_size(&self) -> u64 {
        self.stride * self.slots as u64
    }

    pub fn slot_index(&self, frame: u64) -> usize {
        (frame % self.slots as u64) as usize
    }

    pub fn slot_offset(&self, frame: u64) -> u64 {
        slot_offset(frame, self.stride, self.slots)
    }

    /// Offset the CPU writes to during `frame`.
    pub fn write_offset(&self, frame: u64) -> u64 {
        self.slot_offset(frame.wrapping_add(1))
    }

    /// Offset the GPU reads from during `frame`.
    pub fn read_offset(&self, frame: u64) -> u64 {
        self.slot_offset(frame)
    }
}

/// Counters of the per-slot debug validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStats {
    pub writes: u64,
    pub binds: u64,
    /// Writes that replaced data no bind had consumed yet. Non-zero means the
    /// slot count is too small for the write/bind pattern in use.
    pub unconsumed_overwrites: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct SlotTrack {
    written_for: Option<u64>,
    consumed: bool,
}

/// Untyped ring buffer over one [`GpuBuffer`].
#[derive(Debug)]
pub struct RingBuffer {
    buffer: GpuBuffer,
    layout: RingLayout,
    tracks: Vec<SlotTrack>,
    stats: RingStats,
    scratch: Vec<u8>,
}

impl RingBuffer {
    /// Allocate `stride * slots` bytes once. No further allocation happens in
    /// steady state.
    pub fn allocate(ctx: &RenderContext, kind: BufferKind, layout: RingLayout) -> RenderResult<Self> {
        let buffer = GpuBuffer::new(ctx.device(), kind, layout.total_size())?;
        debug!(
            ?kind,
            struct_size = layout.struct_size,
            stride = layout.stride,
            slots = layout.slots,
            "allocated ring buffer"
        );
        Ok(Self {
            buffer,
            layout,
            tracks: vec![SlotTrack::default(); layout.slots],
            stats: RingStats::default(),
            scratch: vec![0; layout.stride as usize],
        })
    }

    pub fn layout(&self) -> &RingLayout {
        &self.layout
    }

    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }

    pub fn stats(&self) -> RingStats {
        self.stats
    }

    /// Write `payload` into the slot of `frame + 1`. The write always covers a
    /// whole stride, zero-padded past the payload.
    pub fn write_slot(&mut self, frame: u64, payload: &[u8]) -> RenderResult<()> {
        assert!(
            payload.len() as u64 <= self.layout.stride,
            "ring payload of {} bytes exceeds slot stride {}",
            payload.len(),
            self.layout.stride
        );
        let target = frame.wrapping_add(1);
        let slot = self.layout.slot_index(target);

        let track = &mut self.tracks[slot];
        if let Some(previous) = track.written_for {
            if !track.consumed && previous != target {
                warn!(
                    slot,
                    previous_frame = previous,
                    frame = target,
                    slots = self.layout.slots,
                    "ring slot overwritten before the GPU consumed it"
                );
                self.stats.unconsumed_overwrites += 1;
            }
        }

        self.scratch[..payload.len()].copy_from_slice(payload);
        self.scratch[payload.len()..].fill(0);
        self.buffer
            .write(self.layout.write_offset(frame), &self.scratch)?;

        self.tracks[slot] = SlotTrack {
            written_for: Some(target),
            consumed: false,
        };
        self.stats.writes += 1;
        Ok(())
    }

    /// Bind the slot of `frame` to `binding` for GPU consumption.
    pub fn bind_slot(&mut self, frame: u64, binding: u32) {
        let slot = self.layout.slot_index(frame);
        self.buffer
            .bind_range(binding, self.layout.read_offset(frame), self.layout.stride);

        let track = &mut self.tracks[slot];
        if track.written_for == Some(frame) {
            track.consumed = true;
        }
        self.stats.binds += 1;
    }
}

/// A ring of `T` records in a uniform buffer.
#[derive(Debug)]
pub struct UniformRing<T: AsBytes> {
    ring: RingBuffer,
    _record: PhantomData<T>,
}

impl<T: AsBytes> UniformRing<T> {
    pub fn new(ctx: &RenderContext, slots: usize) -> RenderResult<Self> {
        let layout = RingLayout::for_kind(
            std::mem::size_of::<T>() as u64,
            BufferKind::Uniform,
            ctx.limits(),
            slots,
        );
        Ok(Self {
            ring: RingBuffer::allocate(ctx, BufferKind::Uniform, layout)?,
            _record: PhantomData,
        })
    }

    /// Write the record consumed next frame.
    pub fn write(&mut self, frame: u64, record: &T) -> RenderResult<()> {
        self.ring.write_slot(frame, record.as_bytes())
    }

    /// Bind this frame's record.
    pub fn bind(&mut self, frame: u64, binding: u32) {
        self.ring.bind_slot(frame, binding);
    }

    pub fn layout(&self) -> &RingLayout {
        self.ring.layout()
    }

    pub fn stats(&self) -> RingStats {
        self.ring.stats()
    }

    pub fn ring(&self) -> &RingBuffer {
        &self.ring
    }
}
