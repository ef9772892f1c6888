//! Guest arena allocator
//!
//! Bump allocation from the top of the heap plus a sorted, coalescing free
//! list for holes. Releasing the topmost block lowers the break again, so a
//! balanced allocate/release pair leaves the high-water mark where it was.

use std::collections::BTreeMap;

use luma_core::{LumaError, LumaResult};

use crate::memory::{LinearMemory, PAGE_SIZE};

/// First heap address; the bytes below belong to guest statics
pub const HEAP_BASE: u32 = 1024;

/// Allocation granularity
pub const ALIGN: u32 = 8;

/// Allocator counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Allocations not yet released
    pub live_allocations: usize,
    /// Bytes held by live allocations (after alignment)
    pub live_bytes: usize,
    /// Current heap break
    pub high_water: u32,
    /// Highest break ever reached
    pub peak: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Block {
    address: u32,
    size: u32,
}

impl Block {
    #[inline]
    fn end(&self) -> u32 {
        self.address + self.size
    }
}

/// Linear allocator over guest memory
#[derive(Debug)]
pub struct Arena {
    top: u32,
    peak: u32,
    free: Vec<Block>,
    live: BTreeMap<u32, u32>,
}

impl Arena {
    pub fn new() -> Self {
        Arena {
            top: HEAP_BASE,
            peak: HEAP_BASE,
            free: Vec::new(),
            live: BTreeMap::new(),
        }
    }

    /// Allocate `length` bytes, growing `memory` when the heap runs past its end.
    pub fn allocate(&mut self, memory: &mut LinearMemory, length: u32) -> LumaResult<u32> {
        let size = block_size(length).ok_or(LumaError::OutOfMemory {
            requested: length as usize,
            available: memory.growable_bytes(),
        })?;

        if let Some(address) = self.take_free(size) {
            self.live.insert(address, size);
            return Ok(address);
        }

        let address = self.top;
        let end = address as u64 + size as u64;
        let mapped = memory.byte_len() as u64;
        if end > mapped {
            let delta = (end - mapped).div_ceil(PAGE_SIZE as u64);
            let grown = u32::try_from(delta).ok().and_then(|d| memory.grow(d));
            if grown.is_none() {
                let available = memory.growable_bytes() + (mapped - address as u64) as usize;
                tracing::warn!(requested = length, available, "guest arena exhausted");
                return Err(LumaError::OutOfMemory {
                    requested: length as usize,
                    available,
                });
            }
        }

        // end <= memory.byte_len(), which fits in u32 for any valid page ceiling
        self.top = end as u32;
        self.peak = self.peak.max(self.top);
        self.live.insert(address, size);
        Ok(address)
    }

    /// Return a block to the arena.
    ///
    /// `length` is advisory: the arena remembers the block size. Unknown
    /// addresses are rejected and leave the arena untouched.
    pub fn release(&mut self, address: u32, length: u32) -> LumaResult<()> {
        let Some(size) = self.live.remove(&address) else {
            tracing::warn!(address, length, "release of unknown guest block");
            return Err(LumaError::InvalidRange { address, length });
        };

        let block = Block { address, size };
        if block.end() == self.top {
            self.top = address;
            self.reclaim_tail();
        } else {
            self.insert_free(block);
        }
        Ok(())
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            live_allocations: self.live.len(),
            live_bytes: self.live.values().map(|s| *s as usize).sum(),
            high_water: self.top,
            peak: self.peak,
        }
    }

    /// Current heap break
    #[inline]
    pub fn high_water(&self) -> u32 {
        self.top
    }

    #[inline]
    pub fn live_allocations(&self) -> usize {
        self.live.len()
    }

    fn take_free(&mut self, size: u32) -> Option<u32> {
        let index = self.free.iter().position(|b| b.size >= size)?;
        let block = &mut self.free[index];
        let address = block.address;
        if block.size == size {
            self.free.remove(index);
        } else {
            block.address += size;
            block.size -= size;
        }
        Some(address)
    }

    fn insert_free(&mut self, block: Block) {
        let index = self
            .free
            .binary_search_by_key(&block.address, |b| b.address)
            .unwrap_or_else(|i| i);
        self.free.insert(index, block);

        // Merge with the following hole
        if index + 1 < self.free.len() && self.free[index].end() == self.free[index + 1].address {
            self.free[index].size += self.free[index + 1].size;
            self.free.remove(index + 1);
        }
        // Merge with the preceding hole
        if index > 0 && self.free[index - 1].end() == self.free[index].address {
            self.free[index - 1].size += self.free[index].size;
            self.free.remove(index);
        }
    }

    fn reclaim_tail(&mut self) {
        while let Some(last) = self.free.last() {
            if last.end() != self.top {
                break;
            }
            self.top = last.address;
            self.free.pop();
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

fn block_size(length: u32) -> Option<u32> {
    let length = length.max(ALIGN);
    length.checked_add(ALIGN - 1).map(|l| l & !(ALIGN - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConfig;
    use proptest::prelude::*;

    fn setup(initial: u32, maximum: u32) -> (Arena, LinearMemory) {
        (
            Arena::new(),
            LinearMemory::new(&MemoryConfig::tiny(initial, maximum)),
        )
    }

    #[test]
    fn test_allocations_are_aligned_and_disjoint() {
        let (mut arena, mut memory) = setup(1, 1);

        let a = arena.allocate(&mut memory, 13).unwrap();
        let b = arena.allocate(&mut memory, 4).unwrap();

        assert_eq!(a, HEAP_BASE);
        assert_eq!(a % ALIGN, 0);
        assert_eq!(b % ALIGN, 0);
        assert!(b >= a + 13);
        assert_eq!(arena.live_allocations(), 2);
    }

    #[test]
    fn test_release_top_lowers_break() {
        let (mut arena, mut memory) = setup(1, 1);
        let before = arena.high_water();

        let a = arena.allocate(&mut memory, 64).unwrap();
        assert_eq!(arena.high_water(), before + 64);

        arena.release(a, 64).unwrap();
        assert_eq!(arena.high_water(), before);
        assert_eq!(arena.stats().peak, before + 64);
    }

    #[test]
    fn test_hole_reuse_and_coalescing() {
        let (mut arena, mut memory) = setup(1, 1);

        let a = arena.allocate(&mut memory, 32).unwrap();
        let b = arena.allocate(&mut memory, 32).unwrap();
        let c = arena.allocate(&mut memory, 32).unwrap();

        arena.release(a, 32).unwrap();
        arena.release(b, 32).unwrap();

        // a and b coalesced into a 64-byte hole
        let d = arena.allocate(&mut memory, 64).unwrap();
        assert_eq!(d, a);

        arena.release(d, 64).unwrap();
        arena.release(c, 32).unwrap();
        assert_eq!(arena.high_water(), HEAP_BASE);
        assert_eq!(arena.live_allocations(), 0);
    }

    #[test]
    fn test_allocation_grows_memory() {
        let (mut arena, mut memory) = setup(1, 4);

        let address = arena.allocate(&mut memory, PAGE_SIZE as u32 * 2).unwrap();
        assert_eq!(address, HEAP_BASE);
        assert_eq!(memory.pages(), 3);
        assert_eq!(memory.epoch(), 1);
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let (mut arena, mut memory) = setup(1, 2);

        let err = arena
            .allocate(&mut memory, PAGE_SIZE as u32 * 2)
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, LumaError::OutOfMemory { .. }));
        assert_eq!(memory.pages(), 1);
        assert_eq!(arena.live_allocations(), 0);
    }

    #[test]
    fn test_release_unknown_address() {
        let (mut arena, mut memory) = setup(1, 1);
        let a = arena.allocate(&mut memory, 16).unwrap();

        assert!(arena.release(a + 8, 16).is_err());
        assert_eq!(arena.live_allocations(), 1);
    }

    proptest! {
        #[test]
        fn prop_balanced_alloc_release_keeps_high_water(
            warmup in proptest::collection::vec(1u32..4096, 0..8),
            quads in 1u32..50_000,
        ) {
            let (mut arena, mut memory) = setup(1, 64);
            for len in &warmup {
                arena.allocate(&mut memory, *len).unwrap();
            }

            let length = quads * 4;
            let before = arena.high_water();
            let address = arena.allocate(&mut memory, length).unwrap();
            arena.release(address, length).unwrap();
            prop_assert_eq!(arena.high_water(), before);
        }

        #[test]
        fn prop_live_blocks_never_overlap(
            ops in proptest::collection::vec((any::<bool>(), 1u32..2048), 1..64),
        ) {
            let (mut arena, mut memory) = setup(1, 16);
            let mut live: Vec<(u32, u32)> = Vec::new();

            for (alloc, length) in ops {
                if alloc || live.is_empty() {
                    let address = arena.allocate(&mut memory, length).unwrap();
                    for (other, other_len) in &live {
                        let disjoint = address + length <= *other || other + other_len <= address;
                        prop_assert!(disjoint);
                    }
                    live.push((address, length));
                } else {
                    let (address, length) = live.remove(length as usize % live.len());
                    arena.release(address, length).unwrap();
                }
            }

            prop_assert_eq!(arena.live_allocations(), live.len());
            for (address, length) in live.drain(..) {
                arena.release(address, length).unwrap();
            }
            prop_assert_eq!(arena.high_water(), HEAP_BASE);
        }
    }
}
