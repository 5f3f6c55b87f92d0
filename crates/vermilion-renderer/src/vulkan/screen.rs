//! Surface, swapchain, and the blit-to-present path.
//!
//! The engine never renders into swap images directly. Each frame the
//! internally-owned composite target is blitted onto the acquired swap
//! image by a command buffer pre-recorded at swapchain creation time.

use ash::vk;

use crate::types::{ColorFormat, TextureDesc, TextureUsage};
use crate::window::WindowSource;

use super::context::DeviceContext;
use super::error::{RenderError, RenderResult};
use super::handles::TextureHandle;
use super::memory::MemoryBookkeeper;
use super::textures::TextureManager;
use super::MAX_INFLIGHT;

/// Outcome of presenting one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// The swapchain went stale; rebuild at this draw boundary.
    Stale,
}

/// Swap image count: one more than the driver's minimum, capped by the
/// maximum when the driver reports one.
pub(crate) fn negotiated_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = caps.min_image_count + 1;
    if caps.max_image_count > 0 && count > caps.max_image_count {
        count = caps.max_image_count;
    }
    count
}

/// Swapchain extent for the window's drawable size, clamped to what the
/// surface allows when the driver leaves the choice to us.
pub(crate) fn surface_extent(
    caps: &vk::SurfaceCapabilitiesKHR,
    drawable: (u32, u32),
) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: drawable
                .0
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: drawable
                .1
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

pub struct ScreenResources {
    surface: vk::SurfaceKHR,
    swapchain: vk::SwapchainKHR,
    extent: vk::Extent2D,
    swap_images: Vec<vk::Image>,
    present_cmds: Vec<vk::CommandBuffer>,
    acquire_semaphores: [vk::Semaphore; MAX_INFLIGHT],
    blit_done_semaphores: [vk::Semaphore; MAX_INFLIGHT],
    composite: TextureHandle,
    depth: TextureHandle,
}

impl ScreenResources {
    /// Build the whole presentation chain against `window`, reusing
    /// `existing_surface` when the caller already created one.
    pub unsafe fn create<W: WindowSource>(
        ctx: &DeviceContext,
        textures: &mut TextureManager,
        mem: &mut MemoryBookkeeper,
        window: &W,
        existing_surface: Option<vk::SurfaceKHR>,
    ) -> RenderResult<Self> {
        ctx.wait_idle();

        let surface = match existing_surface {
            Some(surface) => surface,
            None => ash_window::create_surface(
                &ctx.entry,
                &ctx.instance,
                window.raw_display_handle()?,
                window.raw_window_handle()?,
                None,
            )
            .map_err(|e| RenderError::driver("vkCreateSurfaceKHR", e))?,
        };

        let support = ctx.swap_support(surface)?;
        let extent = surface_extent(&support.caps, window.drawable_size());
        let image_count = negotiated_image_count(&support.caps);

        // The subsystem only ever blits into swap images.
        let mut swapchain_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(support.format.format)
            .image_color_space(support.format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::TRANSFER_DST)
            .pre_transform(support.caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(support.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let graphics_family = ctx.queue_families.graphics.unwrap_or(0);
        let present_family = ctx.queue_families.present.unwrap_or(graphics_family);
        let shared_families = [graphics_family, present_family];
        if graphics_family != present_family {
            swapchain_info = swapchain_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&shared_families);
        } else {
            swapchain_info = swapchain_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE);
        }

        let swapchain = ctx
            .swapchain_loader
            .create_swapchain(&swapchain_info, None)
            .map_err(|e| RenderError::driver("vkCreateSwapchainKHR", e))?;

        let swap_images = ctx
            .swapchain_loader
            .get_swapchain_images(swapchain)
            .map_err(|e| RenderError::driver("vkGetSwapchainImagesKHR", e))?;

        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let mut acquire_semaphores = [vk::Semaphore::null(); MAX_INFLIGHT];
        let mut blit_done_semaphores = [vk::Semaphore::null(); MAX_INFLIGHT];
        for i in 0..MAX_INFLIGHT {
            acquire_semaphores[i] = ctx
                .device
                .create_semaphore(&semaphore_info, None)
                .map_err(|e| RenderError::driver("vkCreateSemaphore", e))?;
            blit_done_semaphores[i] = ctx
                .device
                .create_semaphore(&semaphore_info, None)
                .map_err(|e| RenderError::driver("vkCreateSemaphore", e))?;
        }

        let composite = textures.create(
            ctx,
            mem,
            &TextureDesc {
                width: extent.width,
                height: extent.height,
                format: ColorFormat::R10G10B10A2Unorm,
                usage: TextureUsage::SAMPLED
                    | TextureUsage::RENDER_TARGET
                    | TextureUsage::TRANSFER_SRC,
                debug_label: Some("composite"),
                ..Default::default()
            },
        )?;
        let depth = textures.create(
            ctx,
            mem,
            &TextureDesc {
                width: extent.width,
                height: extent.height,
                format: ColorFormat::Depth,
                usage: TextureUsage::SAMPLED | TextureUsage::DEPTH_BUFFER,
                debug_label: Some("depth"),
                ..Default::default()
            },
        )?;

        let present_cmds = record_present_commands(
            ctx,
            &swap_images,
            textures.image(composite)?,
            extent,
        )?;

        Ok(Self {
            surface,
            swapchain,
            extent,
            swap_images,
            present_cmds,
            acquire_semaphores,
            blit_done_semaphores,
            composite,
            depth,
        })
    }

    /// Tear everything down in reverse dependency order.
    pub unsafe fn destroy(
        &mut self,
        ctx: &DeviceContext,
        textures: &mut TextureManager,
        mem: &mut MemoryBookkeeper,
    ) -> RenderResult<()> {
        ctx.wait_idle();

        ctx.device
            .free_command_buffers(ctx.general_pool, &self.present_cmds);
        self.present_cmds.clear();

        for i in 0..MAX_INFLIGHT {
            ctx.device.destroy_semaphore(self.acquire_semaphores[i], None);
            ctx.device.destroy_semaphore(self.blit_done_semaphores[i], None);
            self.acquire_semaphores[i] = vk::Semaphore::null();
            self.blit_done_semaphores[i] = vk::Semaphore::null();
        }

        textures.release(ctx, mem, self.composite)?;
        textures.release(ctx, mem, self.depth)?;

        self.swap_images.clear();
        ctx.swapchain_loader.destroy_swapchain(self.swapchain, None);
        self.swapchain = vk::SwapchainKHR::null();

        ctx.surface_loader.destroy_surface(self.surface, None);
        self.surface = vk::SurfaceKHR::null();
        Ok(())
    }

    /// Destroy and rebuild against the window's current drawable size.
    pub unsafe fn resize<W: WindowSource>(
        &mut self,
        ctx: &DeviceContext,
        textures: &mut TextureManager,
        mem: &mut MemoryBookkeeper,
        window: &W,
    ) -> RenderResult<()> {
        self.destroy(ctx, textures, mem)?;
        *self = Self::create(ctx, textures, mem, window, None)?;
        Ok(())
    }

    /// Acquire a swap image, submit its blit, and queue the present.
    ///
    /// An out-of-date swapchain at acquire time skips the submit and the
    /// present entirely; staleness either way is reported for the caller to
    /// recreate at this draw boundary.
    pub unsafe fn present(&mut self, ctx: &DeviceContext, frame: usize) -> RenderResult<PresentOutcome> {
        let acquired = ctx.swapchain_loader.acquire_next_image(
            self.swapchain,
            u64::MAX,
            self.acquire_semaphores[frame],
            vk::Fence::null(),
        );
        let image_index = match acquired {
            Ok((index, _suboptimal)) => index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => return Ok(PresentOutcome::Stale),
            Err(e) => return Err(RenderError::driver("vkAcquireNextImageKHR", e)),
        };

        let wait_semaphores = [self.acquire_semaphores[frame]];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let commands = [self.present_cmds[image_index as usize]];
        let signal_semaphores = [self.blit_done_semaphores[frame]];
        let submit = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&commands)
            .signal_semaphores(&signal_semaphores);

        let fence = ctx.in_flight_fences[frame];
        ctx.device
            .reset_fences(&[fence])
            .map_err(|e| RenderError::driver("vkResetFences", e))?;
        ctx.device
            .queue_submit(ctx.graphics_queue, &[submit], fence)
            .map_err(|e| RenderError::driver("vkQueueSubmit", e))?;

        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match ctx
            .swapchain_loader
            .queue_present(ctx.present_queue, &present_info)
        {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
            Err(e) => Err(RenderError::driver("vkQueuePresentKHR", e)),
        }
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn image_count(&self) -> usize {
        self.swap_images.len()
    }

    /// The engine's final-color render target.
    pub fn composite(&self) -> TextureHandle {
        self.composite
    }

    pub fn depth(&self) -> TextureHandle {
        self.depth
    }
}

/// One pre-recorded "blit composite onto swap image N and make it
/// presentable" command buffer per swap image.
unsafe fn record_present_commands(
    ctx: &DeviceContext,
    swap_images: &[vk::Image],
    composite_image: vk::Image,
    extent: vk::Extent2D,
) -> RenderResult<Vec<vk::CommandBuffer>> {
    let alloc_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(ctx.general_pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(swap_images.len() as u32);
    let cmds = ctx
        .device
        .allocate_command_buffers(&alloc_info)
        .map_err(|e| RenderError::driver("vkAllocateCommandBuffers", e))?;

    let color_range = vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    };

    for (&cmd, &swap_image) in cmds.iter().zip(swap_images) {
        // Re-submitted every frame, so no one-time flag.
        let begin_info = vk::CommandBufferBeginInfo::default();
        ctx.device
            .begin_command_buffer(cmd, &begin_info)
            .map_err(|e| RenderError::driver("vkBeginCommandBuffer", e))?;

        let swap_to_dst = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(swap_image)
            .subresource_range(color_range)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);
        let composite_to_src = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(composite_image)
            .subresource_range(color_range)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(vk::AccessFlags::TRANSFER_READ);
        ctx.device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[swap_to_dst, composite_to_src],
        );

        let full_extent = vk::Offset3D {
            x: extent.width as i32,
            y: extent.height as i32,
            z: 1,
        };
        let subresource = vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        };
        let blit = vk::ImageBlit::default()
            .src_subresource(subresource)
            .src_offsets([vk::Offset3D::default(), full_extent])
            .dst_subresource(subresource)
            .dst_offsets([vk::Offset3D::default(), full_extent]);
        ctx.device.cmd_blit_image(
            cmd,
            composite_image,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            swap_image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[blit],
            vk::Filter::LINEAR,
        );

        let swap_to_present = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(swap_image)
            .subresource_range(color_range)
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::MEMORY_READ);
        ctx.device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[swap_to_present],
        );

        ctx.device
            .end_command_buffer(cmd)
            .map_err(|e| RenderError::driver("vkEndCommandBuffer", e))?;
    }

    Ok(cmds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_count_min_plus_one() {
        let mut caps = vk::SurfaceCapabilitiesKHR::default();
        caps.min_image_count = 2;
        caps.max_image_count = 0; // no maximum reported
        assert_eq!(negotiated_image_count(&caps), 3);
    }

    #[test]
    fn test_image_count_capped_by_max() {
        let mut caps = vk::SurfaceCapabilitiesKHR::default();
        caps.min_image_count = 2;
        caps.max_image_count = 2;
        assert_eq!(negotiated_image_count(&caps), 2);

        caps.max_image_count = 8;
        assert_eq!(negotiated_image_count(&caps), 3);
    }

    #[test]
    fn test_extent_uses_driver_extent_when_defined() {
        let mut caps = vk::SurfaceCapabilitiesKHR::default();
        caps.current_extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let extent = surface_extent(&caps, (1024, 768));
        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 600);
    }

    #[test]
    fn test_extent_clamps_drawable_size() {
        let mut caps = vk::SurfaceCapabilitiesKHR::default();
        caps.current_extent = vk::Extent2D {
            width: u32::MAX,
            height: u32::MAX,
        };
        caps.min_image_extent = vk::Extent2D {
            width: 64,
            height: 64,
        };
        caps.max_image_extent = vk::Extent2D {
            width: 1920,
            height: 1080,
        };
        let extent = surface_extent(&caps, (4096, 16));
        assert_eq!(extent.width, 1920);
        assert_eq!(extent.height, 64);
    }
}
