//! The public face of the backend and the per-frame orchestrator.
//!
//! One `Backend` value owns the whole core: device context, memory ledger,
//! resource managers, command recyclers, and the screen. Everything is
//! driven from the engine's main thread; none of these operations are
//! re-entrant.

use ash::vk;

use vermilion_common::{AppInfo, Config};

use crate::types::{BufferDesc, TextureDesc};
use crate::window::WindowSource;

use super::buffers::BufferManager;
use super::commands::CommandRecycler;
use super::context::{DeviceContext, ValidationConfig};
use super::error::{RenderError, RenderResult};
use super::handles::{BufferHandle, TextureHandle};
use super::memory::{Allocation, MemoryBookkeeper};
use super::screen::{PresentOutcome, ScreenResources};
use super::textures::TextureManager;
use super::{COMPUTE_COMMANDS_PER_SLOT, GRAPHICS_COMMANDS_PER_SLOT, MAX_INFLIGHT};

/// Cursor over the in-flight frame slots.
#[derive(Debug, Default)]
pub(crate) struct FrameState {
    current: usize,
}

impl FrameState {
    pub(crate) fn current(&self) -> usize {
        self.current
    }

    pub(crate) fn advance(&mut self) {
        self.current = (self.current + 1) % MAX_INFLIGHT;
    }
}

pub struct Backend<W: WindowSource> {
    window: W,
    draw_skip: bool,
    frame: FrameState,
    screen: ScreenResources,
    graphics_commands: CommandRecycler,
    compute_commands: CommandRecycler,
    textures: TextureManager,
    buffers: BufferManager,
    memory: MemoryBookkeeper,
    ctx: DeviceContext,
}

impl<W: WindowSource> Backend<W> {
    /// Bring up the whole backend against `window`.
    ///
    /// # Safety
    /// The window must outlive the backend, and all backend calls must come
    /// from the thread that owns the engine loop.
    pub unsafe fn init(
        window: W,
        app_info: &AppInfo,
        config: &Config,
        validation: ValidationConfig,
    ) -> RenderResult<Self> {
        log::info!("starting Vulkan backend");

        let (ctx, surface) = DeviceContext::new(&window, app_info, config, validation)?;
        let mut memory = MemoryBookkeeper::new(&ctx);
        let mut textures = TextureManager::new();
        let buffers = BufferManager::new();

        let graphics_commands = CommandRecycler::new(
            &ctx,
            ctx.queue_families.graphics.unwrap_or(0),
            GRAPHICS_COMMANDS_PER_SLOT,
            "graphics command",
        )?;
        let compute_commands = CommandRecycler::new(
            &ctx,
            ctx.queue_families.compute.unwrap_or(0),
            COMPUTE_COMMANDS_PER_SLOT,
            "compute command",
        )?;

        let screen = ScreenResources::create(&ctx, &mut textures, &mut memory, &window, Some(surface))?;

        Ok(Self {
            window,
            draw_skip: false,
            frame: FrameState::default(),
            screen,
            graphics_commands,
            compute_commands,
            textures,
            buffers,
            memory,
            ctx,
        })
    }

    pub unsafe fn create_texture(&mut self, desc: &TextureDesc) -> RenderResult<TextureHandle> {
        self.textures.create(&self.ctx, &mut self.memory, desc)
    }

    pub unsafe fn release_texture(&mut self, handle: TextureHandle) -> RenderResult<()> {
        self.textures.release(&self.ctx, &mut self.memory, handle)
    }

    pub unsafe fn create_buffer(&mut self, desc: &BufferDesc) -> RenderResult<BufferHandle> {
        self.buffers.create(&self.ctx, &mut self.memory, desc)
    }

    pub unsafe fn release_buffer(&mut self, handle: BufferHandle) -> RenderResult<()> {
        self.buffers.release(&self.ctx, &mut self.memory, handle)
    }

    /// Next free graphics primary command buffer for this frame.
    pub fn next_graphics_command(&mut self) -> RenderResult<vk::CommandBuffer> {
        self.graphics_commands.next(self.frame.current())
    }

    /// Next free compute primary command buffer for this frame.
    pub fn next_compute_command(&mut self) -> RenderResult<vk::CommandBuffer> {
        self.compute_commands.next(self.frame.current())
    }

    /// Run one frame: wait for this slot's fence, blit-and-present, recycle
    /// the slot's command pools, advance the frame cursor.
    pub unsafe fn draw_frame(&mut self) -> RenderResult<()> {
        if self.draw_skip {
            return Ok(());
        }
        let frame = self.frame.current();

        let fence = self.ctx.in_flight_fences[frame];
        self.ctx
            .device
            .wait_for_fences(&[fence], true, u64::MAX)
            .map_err(|e| RenderError::driver("vkWaitForFences", e))?;

        if self.screen.present(&self.ctx, frame)? == PresentOutcome::Stale {
            self.screen
                .resize(&self.ctx, &mut self.textures, &mut self.memory, &self.window)?;
        }

        self.graphics_commands.release_frame(&self.ctx, frame)?;
        self.compute_commands.release_frame(&self.ctx, frame)?;

        self.frame.advance();
        Ok(())
    }

    /// Rebuild the screen against the window's current size. A no-op while
    /// draw-skip is set (minimized windows have nothing worth rebuilding).
    pub unsafe fn trigger_resize(&mut self) -> RenderResult<()> {
        if self.draw_skip {
            return Ok(());
        }
        self.screen
            .resize(&self.ctx, &mut self.textures, &mut self.memory, &self.window)
    }

    /// Skip frame drawing and resize handling until cleared.
    pub fn set_draw_skip(&mut self, skip: bool) {
        self.draw_skip = skip;
    }

    // Native accessors for the renderer layer building descriptors and
    // pipelines.

    pub fn texture_image(&self, handle: TextureHandle) -> RenderResult<vk::Image> {
        self.textures.image(handle)
    }

    pub fn texture_view(&self, handle: TextureHandle) -> RenderResult<vk::ImageView> {
        self.textures.view(handle)
    }

    pub fn texture_allocation(&self, handle: TextureHandle) -> RenderResult<Allocation> {
        self.textures.allocation(handle)
    }

    pub fn buffer(&self, handle: BufferHandle) -> RenderResult<vk::Buffer> {
        self.buffers.buffer(handle)
    }

    pub fn buffer_allocation(&self, handle: BufferHandle) -> RenderResult<Allocation> {
        self.buffers.allocation(handle)
    }

    /// Overwrite the start of a host-visible buffer with typed data.
    pub unsafe fn write_buffer<T: bytemuck::Pod>(
        &mut self,
        handle: BufferHandle,
        data: &[T],
    ) -> RenderResult<()> {
        self.buffers
            .write_host_visible(&self.ctx, &self.memory, handle, data)
    }

    /// Current render dimensions (the swap extent).
    pub fn render_dimensions(&self) -> (u32, u32) {
        let extent = self.screen.extent();
        (extent.width, extent.height)
    }

    /// The engine's final-color target, blitted to the screen each frame.
    pub fn composite_target(&self) -> TextureHandle {
        self.screen.composite()
    }

    pub fn depth_target(&self) -> TextureHandle {
        self.screen.depth()
    }

    pub fn current_frame(&self) -> usize {
        self.frame.current()
    }

    pub fn device_context(&self) -> &DeviceContext {
        &self.ctx
    }

    pub fn memory(&self) -> &MemoryBookkeeper {
        &self.memory
    }

    pub fn texture_count(&self) -> usize {
        self.textures.live_count()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.live_count()
    }
}

impl<W: WindowSource> Drop for Backend<W> {
    fn drop(&mut self) {
        unsafe {
            self.ctx.wait_idle();

            if let Err(e) = self
                .screen
                .destroy(&self.ctx, &mut self.textures, &mut self.memory)
            {
                log::error!("screen teardown failed: {}", e);
            }
            self.buffers.shutdown(&self.ctx, &mut self.memory);
            self.textures.shutdown(&self.ctx, &mut self.memory);
            self.graphics_commands.destroy(&self.ctx);
            self.compute_commands.destroy(&self.ctx);
            self.memory.log_leaks();
            // the context tears itself down last
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_state_cycles() {
        let mut frame = FrameState::default();
        assert_eq!(frame.current(), 0);
        frame.advance();
        assert_eq!(frame.current(), 1);
        frame.advance();
        assert_eq!(frame.current(), 0);
    }

    #[test]
    fn test_frame_state_revisits_within_inflight_window() {
        let mut frame = FrameState::default();
        let mut seen = vec![false; MAX_INFLIGHT];
        for _ in 0..MAX_INFLIGHT + 1 {
            seen[frame.current()] = true;
            frame.advance();
        }
        assert!(seen.iter().all(|&s| s));
        // MAX_INFLIGHT + 1 steps land one past a full cycle
        assert_eq!(frame.current(), 1 % MAX_INFLIGHT);
    }
}
