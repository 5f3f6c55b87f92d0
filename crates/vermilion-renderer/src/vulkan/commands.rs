//! Per-frame primary command buffer recycling.
//!
//! One pool and a fixed array of primary buffers per in-flight slot. Buffers
//! are handed out sequentially within a frame and never reset individually;
//! the whole pool is reset when the frame's fence proves the GPU is done
//! with it.
//!
//! Retrieval is single-writer: `next` takes `&mut self`, so concurrent
//! hand-out within a frame is rejected at compile time.

use ash::vk;

use super::context::DeviceContext;
use super::error::{RenderError, RenderResult};
use super::MAX_INFLIGHT;

/// Sequential index dispenser for one frame slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SlotCursor {
    next: usize,
    capacity: usize,
}

impl SlotCursor {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { next: 0, capacity }
    }

    pub(crate) fn take(&mut self) -> Option<usize> {
        if self.next == self.capacity {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(index)
    }

    pub(crate) fn reset(&mut self) {
        self.next = 0;
    }

    pub(crate) fn used(&self) -> usize {
        self.next
    }
}

pub struct CommandRecycler {
    label: &'static str,
    pools: [vk::CommandPool; MAX_INFLIGHT],
    buffers: [Vec<vk::CommandBuffer>; MAX_INFLIGHT],
    cursors: [SlotCursor; MAX_INFLIGHT],
}

impl CommandRecycler {
    /// Build pools and `per_slot` primary buffers for every in-flight slot
    /// on the given queue family.
    pub unsafe fn new(
        ctx: &DeviceContext,
        queue_family: u32,
        per_slot: usize,
        label: &'static str,
    ) -> RenderResult<Self> {
        let mut pools = [vk::CommandPool::null(); MAX_INFLIGHT];
        let mut buffers: [Vec<vk::CommandBuffer>; MAX_INFLIGHT] = Default::default();

        for slot in 0..MAX_INFLIGHT {
            let pool_info = vk::CommandPoolCreateInfo::default().queue_family_index(queue_family);
            pools[slot] = ctx
                .device
                .create_command_pool(&pool_info, None)
                .map_err(|e| RenderError::driver("vkCreateCommandPool", e))?;

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(pools[slot])
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(per_slot as u32);
            buffers[slot] = ctx
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| RenderError::driver("vkAllocateCommandBuffers", e))?;
        }

        Ok(Self {
            label,
            pools,
            buffers,
            cursors: [SlotCursor::new(per_slot); MAX_INFLIGHT],
        })
    }

    /// Next free primary buffer in `frame`'s slot. The caller records and
    /// submits it before the slot's fence is waited on again.
    pub fn next(&mut self, frame: usize) -> RenderResult<vk::CommandBuffer> {
        let index = self.cursors[frame]
            .take()
            .ok_or(RenderError::Exhausted(self.label))?;
        Ok(self.buffers[frame][index])
    }

    /// Reset the slot's pool wholesale and rewind its cursor. Only valid
    /// once the fence covering `frame` has signalled.
    pub unsafe fn release_frame(&mut self, ctx: &DeviceContext, frame: usize) -> RenderResult<()> {
        ctx.device
            .reset_command_pool(self.pools[frame], vk::CommandPoolResetFlags::empty())
            .map_err(|e| RenderError::driver("vkResetCommandPool", e))?;
        self.cursors[frame].reset();
        Ok(())
    }

    /// Buffers handed out for `frame` since its last release.
    pub fn used(&self, frame: usize) -> usize {
        self.cursors[frame].used()
    }

    pub unsafe fn destroy(&mut self, ctx: &DeviceContext) {
        for pool in self.pools {
            ctx.device.destroy_command_pool(pool, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_hands_out_sequentially() {
        let mut cursor = SlotCursor::new(3);
        assert_eq!(cursor.take(), Some(0));
        assert_eq!(cursor.take(), Some(1));
        assert_eq!(cursor.take(), Some(2));
        assert_eq!(cursor.used(), 3);
    }

    #[test]
    fn test_cursor_exhaustion() {
        let mut cursor = SlotCursor::new(1);
        assert_eq!(cursor.take(), Some(0));
        assert_eq!(cursor.take(), None);
        assert_eq!(cursor.take(), None);
    }

    #[test]
    fn test_cursor_reset_rewinds() {
        let mut cursor = SlotCursor::new(2);
        cursor.take();
        cursor.take();
        cursor.reset();
        assert_eq!(cursor.used(), 0);
        assert_eq!(cursor.take(), Some(0));
    }
}
