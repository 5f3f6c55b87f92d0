//! Texture lifetime management: image + view + memory behind stable handles,
//! with synchronous staging upload of initial contents.

use ash::vk;

use crate::types::{ColorFormat, GpuResourceAccess, TextureDesc, TextureRegion, TextureType, TextureUsage};

use super::context::DeviceContext;
use super::convert;
use super::error::{RenderError, RenderResult};
use super::handles::{HandlePool, TextureHandle};
use super::memory::{find_memory_type, Allocation, MemoryBookkeeper};
use super::staging::stage;
use super::MAX_TEXTURES;

struct TextureSlot {
    texture_type: TextureType,
    cpu_access: GpuResourceAccess,
    format: ColorFormat,
    image: vk::Image,
    view: vk::ImageView,
    alloc: Option<Allocation>,
}

impl TextureSlot {
    fn vacant() -> Self {
        Self {
            texture_type: TextureType::D2,
            cpu_access: GpuResourceAccess::Device,
            format: ColorFormat::Rgba8Unorm,
            image: vk::Image::null(),
            view: vk::ImageView::null(),
            alloc: None,
        }
    }

    unsafe fn destroy(&mut self, ctx: &DeviceContext, mem: &mut MemoryBookkeeper) {
        if self.view != vk::ImageView::null() {
            ctx.device.destroy_image_view(self.view, None);
        }
        if self.image != vk::Image::null() {
            ctx.device.destroy_image(self.image, None);
        }
        if let Some(alloc) = self.alloc.take() {
            mem.release(ctx, alloc);
        }
        *self = Self::vacant();
    }
}

/// Image extent and array layer count for a texture description. 3D textures
/// put `depth` in the extent; everything else treats it as the layer count.
fn extent_and_layers(
    texture_type: TextureType,
    width: u32,
    height: u32,
    depth: u32,
) -> (vk::Extent3D, u32) {
    if texture_type == TextureType::D3 {
        (
            vk::Extent3D {
                width,
                height,
                depth,
            },
            1,
        )
    } else {
        (
            vk::Extent3D {
                width,
                height,
                depth: 1,
            },
            depth,
        )
    }
}

fn copy_region(region: &TextureRegion) -> vk::BufferImageCopy {
    vk::BufferImageCopy::default()
        .buffer_offset(region.buffer_start)
        .buffer_row_length(0)
        .buffer_image_height(0)
        .image_subresource(vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: region.mip_level,
            base_array_layer: region.layer,
            layer_count: region.layer_count,
        })
        .image_offset(vk::Offset3D {
            x: region.offset[0] as i32,
            y: region.offset[1] as i32,
            z: region.offset[2] as i32,
        })
        .image_extent(vk::Extent3D {
            width: region.extent[0],
            height: region.extent[1],
            depth: region.extent[2],
        })
}

pub struct TextureManager {
    pool: HandlePool,
    slots: Vec<TextureSlot>,
}

impl TextureManager {
    pub fn new() -> Self {
        Self {
            pool: HandlePool::new("texture", MAX_TEXTURES),
            slots: (0..MAX_TEXTURES).map(|_| TextureSlot::vacant()).collect(),
        }
    }

    /// Create an image, bind memory, build its view, and (for device-local
    /// textures with initial contents) upload synchronously. On return the
    /// handle resolves to a fully bound image whose contents are visible to
    /// subsequent shader reads.
    pub unsafe fn create(
        &mut self,
        ctx: &DeviceContext,
        mem: &mut MemoryBookkeeper,
        desc: &TextureDesc,
    ) -> RenderResult<TextureHandle> {
        // No frame may be mid-flight while resources are rebound.
        ctx.wait_idle();

        let handle = TextureHandle(self.pool.create()?);
        let index = handle.0.index() as usize;

        let (extent, layers) = extent_and_layers(desc.texture_type, desc.width, desc.height, desc.depth);

        let mut usage = convert::image_usage(desc.usage);
        if desc.cpu_access == GpuResourceAccess::Device && desc.initial_contents.is_some() {
            usage |= vk::ImageUsageFlags::TRANSFER_DST;
        }
        let tiling = if desc.cpu_access == GpuResourceAccess::Device {
            vk::ImageTiling::OPTIMAL
        } else {
            vk::ImageTiling::LINEAR
        };

        let image_info = vk::ImageCreateInfo::default()
            .image_type(convert::image_type(desc.texture_type))
            .format(convert::native_format(desc.format))
            .extent(extent)
            .array_layers(layers)
            .mip_levels(desc.mips)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(tiling)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = ctx
            .device
            .create_image(&image_info, None)
            .map_err(|e| RenderError::driver("vkCreateImage", e))?;

        let requirements = ctx.device.get_image_memory_requirements(image);
        let wanted_props = if desc.cpu_access == GpuResourceAccess::Device {
            vk::MemoryPropertyFlags::DEVICE_LOCAL
        } else {
            vk::MemoryPropertyFlags::HOST_VISIBLE
        };
        let memory_type = find_memory_type(
            &ctx.memory_properties,
            requirements.memory_type_bits,
            wanted_props,
        )
        .ok_or_else(|| RenderError::unsupported("no memory type fits the texture"))?;
        let alloc = mem.acquire(ctx, requirements.size, memory_type)?;
        ctx.device
            .bind_image_memory(image, alloc.memory, alloc.offset)
            .map_err(|e| RenderError::driver("vkBindImageMemory", e))?;

        let aspect = if desc.format.is_depth() {
            vk::ImageAspectFlags::DEPTH
        } else {
            vk::ImageAspectFlags::COLOR
        };
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(convert::view_type(desc.texture_type))
            .format(convert::native_format(desc.format))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: desc.mips,
                base_array_layer: 0,
                layer_count: layers,
            });
        let view = ctx
            .device
            .create_image_view(&view_info, None)
            .map_err(|e| RenderError::driver("vkCreateImageView", e))?;

        // Upload only makes sense for device-local, non-render-target
        // textures; host-visible ones are mapped and written by the caller.
        if let Some(contents) = desc.initial_contents {
            let is_render_target = desc.usage.contains(TextureUsage::RENDER_TARGET);
            if desc.cpu_access == GpuResourceAccess::Device && !is_render_target {
                upload_initial_contents(ctx, mem, image, desc.mips, layers, contents, desc.regions)?;
            }
        }

        if let Some(label) = desc.debug_label {
            ctx.set_debug_name(image, label);
            ctx.set_debug_name(view, label);
        }

        self.slots[index] = TextureSlot {
            texture_type: desc.texture_type,
            cpu_access: desc.cpu_access,
            format: desc.format,
            image,
            view,
            alloc: Some(alloc),
        };
        Ok(handle)
    }

    /// Destroy the texture's view, image, and memory, and invalidate the
    /// handle. Waits for the device to go idle first.
    pub unsafe fn release(
        &mut self,
        ctx: &DeviceContext,
        mem: &mut MemoryBookkeeper,
        handle: TextureHandle,
    ) -> RenderResult<()> {
        ctx.wait_idle();
        let index = self.pool.resolve(handle.0)?;
        self.slots[index].destroy(ctx, mem);
        self.pool.release(handle.0);
        Ok(())
    }

    pub fn image(&self, handle: TextureHandle) -> RenderResult<vk::Image> {
        let index = self.pool.resolve(handle.0)?;
        Ok(self.slots[index].image)
    }

    pub fn view(&self, handle: TextureHandle) -> RenderResult<vk::ImageView> {
        let index = self.pool.resolve(handle.0)?;
        Ok(self.slots[index].view)
    }

    pub fn allocation(&self, handle: TextureHandle) -> RenderResult<Allocation> {
        let index = self.pool.resolve(handle.0)?;
        self.slots[index].alloc.ok_or(RenderError::StaleHandle)
    }

    pub fn format(&self, handle: TextureHandle) -> RenderResult<ColorFormat> {
        let index = self.pool.resolve(handle.0)?;
        Ok(self.slots[index].format)
    }

    pub fn texture_type(&self, handle: TextureHandle) -> RenderResult<TextureType> {
        let index = self.pool.resolve(handle.0)?;
        Ok(self.slots[index].texture_type)
    }

    pub fn cpu_access(&self, handle: TextureHandle) -> RenderResult<GpuResourceAccess> {
        let index = self.pool.resolve(handle.0)?;
        Ok(self.slots[index].cpu_access)
    }

    pub fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Tear down every remaining texture.
    pub unsafe fn shutdown(&mut self, ctx: &DeviceContext, mem: &mut MemoryBookkeeper) {
        if self.pool.live_count() > 0 {
            log::warn!("{} textures still live at shutdown", self.pool.live_count());
        }
        for slot in &mut self.slots {
            slot.destroy(ctx, mem);
        }
    }
}

impl Default for TextureManager {
    fn default() -> Self {
        Self::new()
    }
}

unsafe fn upload_initial_contents(
    ctx: &DeviceContext,
    mem: &mut MemoryBookkeeper,
    image: vk::Image,
    mips: u32,
    layers: u32,
    contents: &[u8],
    regions: &[TextureRegion],
) -> RenderResult<()> {
    stage(
        ctx,
        mem,
        contents.len() as vk::DeviceSize,
        |dst| dst.copy_from_slice(contents),
        |device, cmd, staging| {
            let full_range = vk::ImageSubresourceRange {
                // depth uploads are unsupported
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: mips,
                base_array_layer: 0,
                layer_count: layers,
            };

            let to_transfer_dst = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(full_range)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);
            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer_dst],
            );

            for region in regions {
                device.cmd_copy_buffer_to_image(
                    cmd,
                    staging,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[copy_region(region)],
                );
            }

            let to_shader_read = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(full_range)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);
            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::ALL_COMMANDS,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_shader_read],
            );
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_and_layers_for_3d() {
        let (extent, layers) = extent_and_layers(TextureType::D3, 16, 16, 8);
        assert_eq!(extent.depth, 8);
        assert_eq!(layers, 1);
    }

    #[test]
    fn test_extent_and_layers_for_arrays() {
        let (extent, layers) = extent_and_layers(TextureType::D2Array, 16, 16, 6);
        assert_eq!(extent.depth, 1);
        assert_eq!(layers, 6);

        let (extent, layers) = extent_and_layers(TextureType::Cube, 32, 32, 6);
        assert_eq!(extent.depth, 1);
        assert_eq!(layers, 6);
    }

    #[test]
    fn test_copy_region_translation() {
        let region = TextureRegion {
            buffer_start: 128,
            offset: [1, 2, 0],
            extent: [64, 32, 1],
            mip_level: 3,
            layer: 2,
            layer_count: 1,
        };
        let copy = copy_region(&region);
        assert_eq!(copy.buffer_offset, 128);
        assert_eq!(copy.image_offset.x, 1);
        assert_eq!(copy.image_offset.y, 2);
        assert_eq!(copy.image_extent.width, 64);
        assert_eq!(copy.image_subresource.mip_level, 3);
        assert_eq!(copy.image_subresource.base_array_layer, 2);
        assert_eq!(copy.image_subresource.layer_count, 1);
    }
}
