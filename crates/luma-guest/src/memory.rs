//! Guest linear memory
//!
//! A flat byte-addressable region made of 64 KiB pages. It only ever grows,
//! and only up to `maximum_pages`. Each successful growth increments the
//! memory epoch so host views derived earlier can be told apart.

use luma_core::{LumaError, LumaResult};

/// Size of one linear-memory page
pub const PAGE_SIZE: usize = 64 * 1024;

/// Linear memory limits
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Pages available at instantiation
    pub initial_pages: u32,
    /// Hard growth ceiling
    pub maximum_pages: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        // 16 MiB initial, 64 MiB ceiling: room for two 720p frames
        MemoryConfig {
            initial_pages: 256,
            maximum_pages: 1024,
        }
    }
}

impl MemoryConfig {
    /// Limits used for still-image transforms
    pub fn still_image() -> Self {
        MemoryConfig {
            initial_pages: 256,
            maximum_pages: 512,
        }
    }

    /// Small memory for tests that exercise growth and exhaustion
    pub fn tiny(initial_pages: u32, maximum_pages: u32) -> Self {
        MemoryConfig {
            initial_pages,
            maximum_pages,
        }
    }

    pub fn maximum_bytes(&self) -> usize {
        self.maximum_pages as usize * PAGE_SIZE
    }
}

/// Growable linear memory
#[derive(Debug)]
pub struct LinearMemory {
    bytes: Vec<u8>,
    maximum_pages: u32,
    epoch: u64,
}

impl LinearMemory {
    pub fn new(config: &MemoryConfig) -> Self {
        let initial = config.initial_pages.min(config.maximum_pages);
        LinearMemory {
            bytes: vec![0; initial as usize * PAGE_SIZE],
            maximum_pages: config.maximum_pages,
            epoch: 0,
        }
    }

    #[inline]
    pub fn pages(&self) -> u32 {
        (self.bytes.len() / PAGE_SIZE) as u32
    }

    #[inline]
    pub fn maximum_pages(&self) -> u32 {
        self.maximum_pages
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Bytes that can still be added by growing
    #[inline]
    pub fn growable_bytes(&self) -> usize {
        (self.maximum_pages - self.pages()) as usize * PAGE_SIZE
    }

    /// Incremented on every growth
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Grow by `delta` pages. Returns the previous page count, or `None`
    /// when the ceiling would be exceeded (memory is left untouched).
    pub fn grow(&mut self, delta: u32) -> Option<u32> {
        let previous = self.pages();
        if delta == 0 {
            return Some(previous);
        }
        let target = previous.checked_add(delta)?;
        if target > self.maximum_pages {
            return None;
        }
        self.bytes.resize(target as usize * PAGE_SIZE, 0);
        self.epoch += 1;
        tracing::debug!(previous, pages = target, epoch = self.epoch, "linear memory grown");
        Some(previous)
    }

    /// Bytes in `[address, address + length)`
    pub fn slice(&self, address: u32, length: u32) -> LumaResult<&[u8]> {
        let range = self.range(address, length)?;
        Ok(&self.bytes[range])
    }

    pub fn slice_mut(&mut self, address: u32, length: u32) -> LumaResult<&mut [u8]> {
        let range = self.range(address, length)?;
        Ok(&mut self.bytes[range])
    }

    /// Write `data` starting at `address`
    pub fn write(&mut self, address: u32, data: &[u8]) -> LumaResult<()> {
        let length = u32::try_from(data.len()).map_err(|_| LumaError::InvalidRange {
            address,
            length: u32::MAX,
        })?;
        self.slice_mut(address, length)?.copy_from_slice(data);
        Ok(())
    }

    fn range(&self, address: u32, length: u32) -> LumaResult<std::ops::Range<usize>> {
        let start = address as usize;
        let end = start + length as usize;
        if end > self.bytes.len() {
            return Err(LumaError::InvalidRange { address, length });
        }
        Ok(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_size() {
        let memory = LinearMemory::new(&MemoryConfig::tiny(2, 4));
        assert_eq!(memory.pages(), 2);
        assert_eq!(memory.byte_len(), 2 * PAGE_SIZE);
        assert_eq!(memory.growable_bytes(), 2 * PAGE_SIZE);
        assert_eq!(memory.epoch(), 0);
    }

    #[test]
    fn test_grow_bumps_epoch() {
        let mut memory = LinearMemory::new(&MemoryConfig::tiny(1, 3));

        assert_eq!(memory.grow(0), Some(1));
        assert_eq!(memory.epoch(), 0);

        assert_eq!(memory.grow(2), Some(1));
        assert_eq!(memory.pages(), 3);
        assert_eq!(memory.epoch(), 1);
    }

    #[test]
    fn test_grow_past_ceiling_fails() {
        let mut memory = LinearMemory::new(&MemoryConfig::tiny(1, 2));
        assert_eq!(memory.grow(2), None);
        assert_eq!(memory.pages(), 1);
        assert_eq!(memory.epoch(), 0);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut memory = LinearMemory::new(&MemoryConfig::tiny(1, 1));
        let end = PAGE_SIZE as u32;

        assert!(memory.slice(end - 4, 4).is_ok());
        assert_eq!(
            memory.slice(end - 2, 4).unwrap_err(),
            LumaError::InvalidRange {
                address: end - 2,
                length: 4
            }
        );
        assert!(memory.write(end, &[1]).is_err());
    }

    #[test]
    fn test_write_then_read() {
        let mut memory = LinearMemory::new(&MemoryConfig::tiny(1, 1));
        memory.write(128, &[1, 2, 3, 4]).unwrap();
        assert_eq!(memory.slice(128, 4).unwrap(), &[1, 2, 3, 4]);
    }
}
