//! Fixed-capacity handle pools with generation recycling.
//!
//! A released index may be reissued, but its generation is bumped first, so
//! any handle still naming the old resident fails to resolve instead of
//! aliasing the new one.

use super::error::{RenderError, RenderResult};

/// Opaque `{index, generation}` token naming a slot in its owning manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Pack into a single 64-bit value (generation high, index low).
    pub fn to_raw(self) -> u64 {
        (self.generation as u64) << 32 | self.index as u64
    }

    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

/// Handle to a texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub Handle);

/// Handle to a buffer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub Handle);

pub struct HandlePool {
    name: &'static str,
    generations: Vec<u32>,
    free: Vec<u32>,
    live: usize,
}

impl HandlePool {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            generations: vec![0; capacity],
            // pop() hands out low indices first
            free: (0..capacity as u32).rev().collect(),
            live: 0,
        }
    }

    pub fn create(&mut self) -> RenderResult<Handle> {
        let index = self.free.pop().ok_or(RenderError::Exhausted(self.name))?;
        self.live += 1;
        Ok(Handle {
            index,
            generation: self.generations[index as usize],
        })
    }

    /// Invalidate `handle` and queue its index for reissue.
    pub fn release(&mut self, handle: Handle) {
        debug_assert!(self.resolve(handle).is_ok());
        self.generations[handle.index as usize] = self.generations[handle.index as usize].wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
    }

    /// Slot index for a live handle, or `StaleHandle` for anything released.
    pub fn resolve(&self, handle: Handle) -> RenderResult<usize> {
        match self.generations.get(handle.index as usize) {
            Some(&generation) if generation == handle.generation => Ok(handle.index as usize),
            _ => Err(RenderError::StaleHandle),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn capacity(&self) -> usize {
        self.generations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_resolve() {
        let mut pool = HandlePool::new("test", 4);
        let h = pool.create().unwrap();
        assert_eq!(pool.resolve(h).unwrap(), h.index() as usize);
        assert_eq!(pool.live_count(), 1);
    }

    #[test]
    fn test_stale_after_release() {
        let mut pool = HandlePool::new("test", 4);
        let h = pool.create().unwrap();
        pool.release(h);
        assert!(matches!(pool.resolve(h), Err(RenderError::StaleHandle)));
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn test_reissued_index_gets_new_generation() {
        let mut pool = HandlePool::new("test", 1);
        let a = pool.create().unwrap();
        pool.release(a);
        let b = pool.create().unwrap();
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(pool.resolve(a).is_err());
        assert!(pool.resolve(b).is_ok());
    }

    #[test]
    fn test_exhaustion() {
        let mut pool = HandlePool::new("test", 2);
        pool.create().unwrap();
        pool.create().unwrap();
        assert!(matches!(pool.create(), Err(RenderError::Exhausted(_))));
    }

    #[test]
    fn test_create_release_loop_is_net_zero() {
        let mut pool = HandlePool::new("test", 8);
        for _ in 0..100 {
            let h = pool.create().unwrap();
            pool.release(h);
        }
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn test_raw_round_trip() {
        let mut pool = HandlePool::new("test", 4);
        pool.create().unwrap();
        let h = pool.create().unwrap();
        pool.release(h);
        let h2 = pool.create().unwrap();
        assert_eq!(Handle::from_raw(h2.to_raw()), h2);
        assert_ne!(h.to_raw(), h2.to_raw());
    }
}
