//! One-shot staging uploads shared by the texture and buffer managers.

use ash::vk;

use super::context::DeviceContext;
use super::error::{RenderError, RenderResult};
use super::memory::{find_memory_type, MemoryBookkeeper};

/// Run a synchronous staging upload.
///
/// Creates a transient host-visible + coherent staging buffer of `size`
/// bytes, hands its mapping to `write`, then records a one-shot primary
/// command buffer (handed to `record` along with the staging buffer) and
/// submits it on the graphics queue, waiting until the queue drains before
/// freeing everything. On return the uploaded data is visible to any
/// subsequently submitted work.
pub(crate) unsafe fn stage<Wr, Rec>(
    ctx: &DeviceContext,
    mem: &mut MemoryBookkeeper,
    size: vk::DeviceSize,
    write: Wr,
    record: Rec,
) -> RenderResult<()>
where
    Wr: FnOnce(&mut [u8]),
    Rec: FnOnce(&ash::Device, vk::CommandBuffer, vk::Buffer),
{
    let buffer_info = vk::BufferCreateInfo::default()
        .size(size)
        .usage(vk::BufferUsageFlags::TRANSFER_SRC)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);
    let staging = ctx
        .device
        .create_buffer(&buffer_info, None)
        .map_err(|e| RenderError::driver("vkCreateBuffer", e))?;

    let requirements = ctx.device.get_buffer_memory_requirements(staging);
    let memory_type = find_memory_type(
        &ctx.memory_properties,
        requirements.memory_type_bits,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )
    .ok_or_else(|| RenderError::unsupported("no host-visible coherent memory type"))?;
    let alloc = mem.acquire(ctx, requirements.size, memory_type)?;

    ctx.device
        .bind_buffer_memory(staging, alloc.memory, alloc.offset)
        .map_err(|e| RenderError::driver("vkBindBufferMemory", e))?;

    let ptr = mem.map(ctx, &alloc, 0, size)?;
    write(std::slice::from_raw_parts_mut(ptr, size as usize));
    mem.unmap(ctx, &alloc);

    // One-shot copy out of the general pool, synchronous on the graphics
    // queue. Uploads could move to the transfer queue later.
    let cmd_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(ctx.general_pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);
    let cmd = ctx
        .device
        .allocate_command_buffers(&cmd_info)
        .map_err(|e| RenderError::driver("vkAllocateCommandBuffers", e))?[0];

    let begin_info = vk::CommandBufferBeginInfo::default()
        .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    ctx.device
        .begin_command_buffer(cmd, &begin_info)
        .map_err(|e| RenderError::driver("vkBeginCommandBuffer", e))?;

    record(&ctx.device, cmd, staging);

    ctx.device
        .end_command_buffer(cmd)
        .map_err(|e| RenderError::driver("vkEndCommandBuffer", e))?;

    let commands = [cmd];
    let submit = vk::SubmitInfo::default().command_buffers(&commands);
    ctx.device
        .queue_submit(ctx.graphics_queue, &[submit], vk::Fence::null())
        .map_err(|e| RenderError::driver("vkQueueSubmit", e))?;
    ctx.device
        .queue_wait_idle(ctx.graphics_queue)
        .map_err(|e| RenderError::driver("vkQueueWaitIdle", e))?;

    ctx.device.free_command_buffers(ctx.general_pool, &commands);
    ctx.device.destroy_buffer(staging, None);
    mem.release(ctx, alloc);

    Ok(())
}
