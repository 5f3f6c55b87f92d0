//! Buffer lifetime management, the linear-memory sibling of the texture
//! manager.

use ash::vk;

use crate::types::{BufferDesc, GpuResourceAccess};

use super::context::DeviceContext;
use super::convert;
use super::error::{RenderError, RenderResult};
use super::handles::{BufferHandle, HandlePool};
use super::memory::{find_memory_type, Allocation, MemoryBookkeeper};
use super::staging::stage;
use super::MAX_BUFFERS;

struct BufferSlot {
    cpu_access: GpuResourceAccess,
    buffer: vk::Buffer,
    alloc: Option<Allocation>,
}

impl BufferSlot {
    fn vacant() -> Self {
        Self {
            cpu_access: GpuResourceAccess::Device,
            buffer: vk::Buffer::null(),
            alloc: None,
        }
    }

    unsafe fn destroy(&mut self, ctx: &DeviceContext, mem: &mut MemoryBookkeeper) {
        if self.buffer != vk::Buffer::null() {
            ctx.device.destroy_buffer(self.buffer, None);
        }
        if let Some(alloc) = self.alloc.take() {
            mem.release(ctx, alloc);
        }
        *self = Self::vacant();
    }
}

pub struct BufferManager {
    pool: HandlePool,
    slots: Vec<BufferSlot>,
}

impl BufferManager {
    pub fn new() -> Self {
        Self {
            pool: HandlePool::new("buffer", MAX_BUFFERS),
            slots: (0..MAX_BUFFERS).map(|_| BufferSlot::vacant()).collect(),
        }
    }

    /// Create a buffer, bind memory, and upload any initial contents:
    /// staging + copy for device-local buffers, map-and-write for
    /// host-visible ones.
    pub unsafe fn create(
        &mut self,
        ctx: &DeviceContext,
        mem: &mut MemoryBookkeeper,
        desc: &BufferDesc,
    ) -> RenderResult<BufferHandle> {
        ctx.wait_idle();

        let handle = BufferHandle(self.pool.create()?);
        let index = handle.0.index() as usize;

        let mut usage = convert::buffer_usage(desc.usage);
        if desc.cpu_access == GpuResourceAccess::Device && desc.initial_contents.is_some() {
            usage |= vk::BufferUsageFlags::TRANSFER_DST;
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = ctx
            .device
            .create_buffer(&buffer_info, None)
            .map_err(|e| RenderError::driver("vkCreateBuffer", e))?;

        let requirements = ctx.device.get_buffer_memory_requirements(buffer);
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
        .ok_or_else(|| RenderError::unsupported("no memory type fits the buffer"))?;
        let alloc = mem.acquire(ctx, requirements.size, memory_type)?;
        ctx.device
            .bind_buffer_memory(buffer, alloc.memory, alloc.offset)
            .map_err(|e| RenderError::driver("vkBindBufferMemory", e))?;

        if let Some(contents) = desc.initial_contents {
            if desc.cpu_access == GpuResourceAccess::Device {
                upload_initial_contents(ctx, mem, buffer, desc.size, contents)?;
            } else {
                let ptr = mem.map(ctx, &alloc, 0, contents.len() as vk::DeviceSize)?;
                std::ptr::copy_nonoverlapping(contents.as_ptr(), ptr, contents.len());
                mem.unmap(ctx, &alloc);
            }
        }

        if let Some(label) = desc.debug_label {
            ctx.set_debug_name(buffer, label);
        }

        self.slots[index] = BufferSlot {
            cpu_access: desc.cpu_access,
            buffer,
            alloc: Some(alloc),
        };
        Ok(handle)
    }

    /// Destroy the buffer and its memory and invalidate the handle. Waits
    /// for the device to go idle first.
    pub unsafe fn release(
        &mut self,
        ctx: &DeviceContext,
        mem: &mut MemoryBookkeeper,
        handle: BufferHandle,
    ) -> RenderResult<()> {
        ctx.wait_idle();
        let index = self.pool.resolve(handle.0)?;
        self.slots[index].destroy(ctx, mem);
        self.pool.release(handle.0);
        Ok(())
    }

    /// Overwrite the start of a host-visible buffer with typed data.
    pub unsafe fn write_host_visible<T: bytemuck::Pod>(
        &self,
        ctx: &DeviceContext,
        mem: &MemoryBookkeeper,
        handle: BufferHandle,
        data: &[T],
    ) -> RenderResult<()> {
        let index = self.pool.resolve(handle.0)?;
        let slot = &self.slots[index];
        debug_assert_ne!(slot.cpu_access, GpuResourceAccess::Device);
        let alloc = slot.alloc.ok_or(RenderError::StaleHandle)?;

        let bytes: &[u8] = bytemuck::cast_slice(data);
        let ptr = mem.map(ctx, &alloc, 0, bytes.len() as vk::DeviceSize)?;
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
        mem.unmap(ctx, &alloc);
        Ok(())
    }

    pub fn buffer(&self, handle: BufferHandle) -> RenderResult<vk::Buffer> {
        let index = self.pool.resolve(handle.0)?;
        Ok(self.slots[index].buffer)
    }

    pub fn allocation(&self, handle: BufferHandle) -> RenderResult<Allocation> {
        let index = self.pool.resolve(handle.0)?;
        self.slots[index].alloc.ok_or(RenderError::StaleHandle)
    }

    pub fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Tear down every remaining buffer.
    pub unsafe fn shutdown(&mut self, ctx: &DeviceContext, mem: &mut MemoryBookkeeper) {
        if self.pool.live_count() > 0 {
            log::warn!("{} buffers still live at shutdown", self.pool.live_count());
        }
        for slot in &mut self.slots {
            slot.destroy(ctx, mem);
        }
    }
}

impl Default for BufferManager {
    fn default() -> Self {
        Self::new()
    }
}

unsafe fn upload_initial_contents(
    ctx: &DeviceContext,
    mem: &mut MemoryBookkeeper,
    buffer: vk::Buffer,
    size: vk::DeviceSize,
    contents: &[u8],
) -> RenderResult<()> {
    stage(
        ctx,
        mem,
        contents.len() as vk::DeviceSize,
        |dst| dst.copy_from_slice(contents),
        |device, cmd, staging| {
            // Single region covering the whole buffer.
            let copy = vk::BufferCopy::default()
                .src_offset(0)
                .dst_offset(0)
                .size(size);
            device.cmd_copy_buffer(cmd, staging, buffer, &[copy]);

            let to_shader_read = vk::BufferMemoryBarrier::default()
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .buffer(buffer)
                .offset(0)
                .size(size)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);
            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::ALL_COMMANDS,
                vk::DependencyFlags::empty(),
                &[],
                &[to_shader_read],
                &[],
            );
        },
    )
}
