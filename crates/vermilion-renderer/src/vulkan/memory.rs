//! Raw device-memory bookkeeping.
//!
//! Every texture and buffer gets its own `vkAllocateMemory` call; there is
//! no suballocation, so `Allocation::offset` is always zero today. The
//! bookkeeper's job is the ledger: how many allocations are outstanding and
//! how many bytes each memory type holds.

use ash::vk;

use super::context::DeviceContext;
use super::error::{RenderError, RenderResult};

/// One raw device allocation.
///
/// `offset` exists so the record can describe a suballocation later without
/// changing any caller.
#[derive(Debug, Clone, Copy)]
pub struct Allocation {
    pub memory: vk::DeviceMemory,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
    pub memory_type: u32,
}

/// Counter state, split out so the arithmetic is testable without a device.
#[derive(Debug, Default)]
pub(crate) struct AllocTally {
    alloc_count: u32,
    per_type: Vec<vk::DeviceSize>,
}

impl AllocTally {
    pub(crate) fn new(type_count: usize) -> Self {
        Self {
            alloc_count: 0,
            per_type: vec![0; type_count],
        }
    }

    pub(crate) fn on_acquire(&mut self, memory_type: u32, size: vk::DeviceSize) {
        self.alloc_count += 1;
        self.per_type[memory_type as usize] += size;
    }

    pub(crate) fn on_release(&mut self, memory_type: u32, size: vk::DeviceSize) {
        debug_assert!(self.alloc_count > 0);
        self.alloc_count -= 1;
        self.per_type[memory_type as usize] -= size;
    }

    pub(crate) fn alloc_count(&self) -> u32 {
        self.alloc_count
    }

    pub(crate) fn bytes_for_type(&self, memory_type: u32) -> vk::DeviceSize {
        self.per_type.get(memory_type as usize).copied().unwrap_or(0)
    }

    pub(crate) fn total_bytes(&self) -> vk::DeviceSize {
        self.per_type.iter().sum()
    }
}

pub struct MemoryBookkeeper {
    tally: AllocTally,
}

impl MemoryBookkeeper {
    pub fn new(ctx: &DeviceContext) -> Self {
        Self {
            tally: AllocTally::new(ctx.memory_properties.memory_type_count as usize),
        }
    }

    /// Ask the device for raw memory and record it in the ledger.
    pub unsafe fn acquire(
        &mut self,
        ctx: &DeviceContext,
        size: vk::DeviceSize,
        memory_type: u32,
    ) -> RenderResult<Allocation> {
        let info = vk::MemoryAllocateInfo::default()
            .allocation_size(size)
            .memory_type_index(memory_type);

        let memory = ctx
            .device
            .allocate_memory(&info, None)
            .map_err(|e| RenderError::driver("vkAllocateMemory", e))?;

        self.tally.on_acquire(memory_type, size);

        Ok(Allocation {
            memory,
            offset: 0,
            size,
            memory_type,
        })
    }

    /// Free the memory and retire its ledger entry.
    pub unsafe fn release(&mut self, ctx: &DeviceContext, alloc: Allocation) {
        self.tally.on_release(alloc.memory_type, alloc.size);
        ctx.device.free_memory(alloc.memory, None);
    }

    /// Map `size` bytes at `offset` within a host-visible allocation.
    pub unsafe fn map(
        &self,
        ctx: &DeviceContext,
        alloc: &Allocation,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> RenderResult<*mut u8> {
        let ptr = ctx
            .device
            .map_memory(
                alloc.memory,
                alloc.offset + offset,
                size,
                vk::MemoryMapFlags::empty(),
            )
            .map_err(|e| RenderError::driver("vkMapMemory", e))?;
        Ok(ptr.cast())
    }

    pub unsafe fn unmap(&self, ctx: &DeviceContext, alloc: &Allocation) {
        ctx.device.unmap_memory(alloc.memory);
    }

    /// Flush a whole non-coherent allocation to the device.
    pub unsafe fn flush(&self, ctx: &DeviceContext, alloc: &Allocation) -> RenderResult<()> {
        let range = vk::MappedMemoryRange::default()
            .memory(alloc.memory)
            .offset(alloc.offset)
            .size(alloc.size);
        ctx.device
            .flush_mapped_memory_ranges(&[range])
            .map_err(|e| RenderError::driver("vkFlushMappedMemoryRanges", e))
    }

    pub fn alloc_count(&self) -> u32 {
        self.tally.alloc_count()
    }

    pub fn bytes_for_type(&self, memory_type: u32) -> vk::DeviceSize {
        self.tally.bytes_for_type(memory_type)
    }

    /// Report anything still outstanding; called during shutdown after all
    /// managers have released their resources.
    pub fn log_leaks(&self) {
        if self.tally.alloc_count() > 0 {
            log::warn!(
                "{} device allocations ({} bytes) leaked past shutdown",
                self.tally.alloc_count(),
                self.tally.total_bytes(),
            );
        }
    }
}

/// Lowest-indexed memory type satisfying both the requirement mask and the
/// wanted property flags. There is no fallback relaxation.
pub fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..props.memory_type_count).find(|&i| {
        type_bits & (1 << i) != 0
            && props.memory_types[i as usize]
                .property_flags
                .contains(required)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_acquire_release_symmetry() {
        let mut tally = AllocTally::new(4);
        tally.on_acquire(1, 256);
        tally.on_acquire(1, 64);
        tally.on_acquire(3, 128);
        assert_eq!(tally.alloc_count(), 3);
        assert_eq!(tally.bytes_for_type(1), 320);
        assert_eq!(tally.bytes_for_type(3), 128);
        assert_eq!(tally.total_bytes(), 448);

        tally.on_release(1, 64);
        tally.on_release(3, 128);
        tally.on_release(1, 256);
        assert_eq!(tally.alloc_count(), 0);
        assert_eq!(tally.total_bytes(), 0);
    }

    fn props_with(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties::default();
        props.memory_type_count = types.len() as u32;
        for (i, &flags) in types.iter().enumerate() {
            props.memory_types[i].property_flags = flags;
        }
        props
    }

    #[test]
    fn test_find_memory_type_lowest_index_wins() {
        let props = props_with(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);
        assert_eq!(
            find_memory_type(&props, 0b111, vk::MemoryPropertyFlags::HOST_VISIBLE),
            Some(1)
        );
    }

    #[test]
    fn test_find_memory_type_honors_type_bits() {
        let props = props_with(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ]);
        // type 0 excluded by the mask
        assert_eq!(
            find_memory_type(&props, 0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            Some(1)
        );
    }

    #[test]
    fn test_find_memory_type_no_match() {
        let props = props_with(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        assert_eq!(
            find_memory_type(&props, 0b1, vk::MemoryPropertyFlags::HOST_VISIBLE),
            None
        );
    }

    #[test]
    fn test_find_memory_type_requires_all_flags() {
        let props = props_with(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);
        assert_eq!(
            find_memory_type(
                &props,
                0b11,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
            ),
            Some(1)
        );
    }
}
