//! In-process reference guest
//!
//! Implements the full export contract on top of [`LinearMemory`] and
//! [`Arena`]. All pixel work reads and writes linear memory only, exactly as a
//! compiled sandbox module would.

use luma_core::{LumaError, LumaResult, BYTES_PER_PIXEL};

use crate::arena::{Arena, ArenaStats};
use crate::kernels::{analysis, neighborhood, pixel, DetectionThresholds};
use crate::memory::{LinearMemory, MemoryConfig};
use crate::module::GuestModule;

/// Bytes in an encoded tone preset: 3x3 matrix plus vignette strength
pub const PRESET_PARAMS_LEN: u32 = 10;

/// Reference guest module
#[derive(Debug)]
pub struct NativeGuest {
    memory: LinearMemory,
    arena: Arena,
    thresholds: DetectionThresholds,
}

impl NativeGuest {
    /// Guest with default memory limits and thresholds
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        NativeGuest {
            memory: LinearMemory::new(&config),
            arena: Arena::new(),
            thresholds: DetectionThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: DetectionThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> &DetectionThresholds {
        &self.thresholds
    }

    /// Pixel region sized for a `width` x `height` frame
    fn image(&mut self, address: u32, length: u32, width: u32, height: u32) -> LumaResult<&mut [u8]> {
        check_geometry(length, width, height)?;
        self.memory.slice_mut(address, length)
    }

    fn params<const N: usize>(&self, address: u32) -> LumaResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.memory.slice(address, N as u32)?);
        Ok(out)
    }
}

impl Default for NativeGuest {
    fn default() -> Self {
        Self::new()
    }
}

fn check_geometry(length: u32, width: u32, height: u32) -> LumaResult<()> {
    let expected = width as usize * height as usize * BYTES_PER_PIXEL;
    if (length as usize) < expected {
        return Err(LumaError::LengthMismatch {
            expected,
            actual: length as usize,
        });
    }
    Ok(())
}

impl GuestModule for NativeGuest {
    fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }

    fn allocate(&mut self, length: u32) -> LumaResult<u32> {
        self.arena.allocate(&mut self.memory, length)
    }

    fn release(&mut self, address: u32, length: u32) -> LumaResult<()> {
        self.arena.release(address, length)
    }

    fn arena_stats(&self) -> Option<ArenaStats> {
        Some(self.arena.stats())
    }

    fn grayscale(&mut self, address: u32, length: u32) -> LumaResult<()> {
        pixel::grayscale(self.memory.slice_mut(address, length)?);
        Ok(())
    }

    fn invert(&mut self, address: u32, length: u32) -> LumaResult<()> {
        pixel::invert(self.memory.slice_mut(address, length)?);
        Ok(())
    }

    fn brightness(&mut self, address: u32, length: u32, delta: i32) -> LumaResult<()> {
        pixel::brightness(self.memory.slice_mut(address, length)?, delta);
        Ok(())
    }

    fn threshold(&mut self, address: u32, length: u32, level: u8) -> LumaResult<()> {
        pixel::threshold(self.memory.slice_mut(address, length)?, level);
        Ok(())
    }

    fn sepia(&mut self, address: u32, length: u32) -> LumaResult<()> {
        pixel::sepia(self.memory.slice_mut(address, length)?);
        Ok(())
    }

    fn contrast(&mut self, address: u32, length: u32, factor: f32) -> LumaResult<()> {
        pixel::contrast(self.memory.slice_mut(address, length)?, factor);
        Ok(())
    }

    fn saturation(&mut self, address: u32, length: u32, factor: f32) -> LumaResult<()> {
        pixel::saturation(self.memory.slice_mut(address, length)?, factor);
        Ok(())
    }

    fn color_matrix(&mut self, address: u32, length: u32, matrix_address: u32) -> LumaResult<()> {
        let matrix = pixel::decode_matrix(&self.params::<9>(matrix_address)?);
        pixel::color_matrix(self.memory.slice_mut(address, length)?, &matrix);
        Ok(())
    }

    fn edge_detect(&mut self, address: u32, length: u32, width: u32, height: u32) -> LumaResult<()> {
        neighborhood::edge_detect(self.image(address, length, width, height)?, width, height);
        Ok(())
    }

    fn blur(&mut self, address: u32, length: u32, width: u32, height: u32) -> LumaResult<()> {
        neighborhood::blur(self.image(address, length, width, height)?, width, height);
        Ok(())
    }

    fn preset_filter(
        &mut self,
        address: u32,
        length: u32,
        preset_address: u32,
        width: u32,
        height: u32,
    ) -> LumaResult<()> {
        let params = self.params::<{ PRESET_PARAMS_LEN as usize }>(preset_address)?;
        let mut samples = [0u8; 9];
        samples.copy_from_slice(&params[..9]);
        let matrix = pixel::decode_matrix(&samples);
        let vignette = params[9];

        let pixels = self.image(address, length, width, height)?;
        pixel::color_matrix(pixels, &matrix);
        pixel::vignette(pixels, width, height, vignette);
        Ok(())
    }

    fn analyze_brightness(&mut self, address: u32, length: u32) -> LumaResult<u8> {
        Ok(analysis::brightness(self.memory.slice(address, length)?))
    }

    fn detect_blur(&mut self, address: u32, length: u32, width: u32, height: u32) -> LumaResult<u32> {
        Ok(analysis::blur_score(self.image(address, length, width, height)?, width, height))
    }

    fn detect_face_presence(&mut self, address: u32, length: u32, width: u32, height: u32) -> LumaResult<u8> {
        Ok(analysis::face_presence(self.image(address, length, width, height)?, width, height))
    }

    fn calculate_motion(&mut self, address: u32, previous_address: u32, length: u32) -> LumaResult<u32> {
        let current = self.memory.slice(address, length)?;
        let previous = self.memory.slice(previous_address, length)?;
        Ok(analysis::motion(current, previous))
    }

    fn detect_cheating(
        &mut self,
        address: u32,
        length: u32,
        width: u32,
        height: u32,
        previous_address: u32,
        previous_brightness: u8,
    ) -> LumaResult<u32> {
        check_geometry(length, width, height)?;
        let current = self.memory.slice(address, length)?;
        let previous = self.memory.slice(previous_address, length)?;
        let flags = analysis::detect_cheating(
            current,
            width,
            height,
            previous,
            previous_brightness,
            &self.thresholds,
        );
        Ok(flags.0 as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::exports;

    fn upload(guest: &mut NativeGuest, bytes: &[u8]) -> u32 {
        let address = guest.allocate(bytes.len() as u32).unwrap();
        guest.memory_mut().write(address, bytes).unwrap();
        address
    }

    #[test]
    fn test_grayscale_in_linear_memory() {
        let mut guest = NativeGuest::with_config(MemoryConfig::tiny(1, 2));
        let px = [255, 0, 0, 255, 0, 255, 0, 255];
        let address = upload(&mut guest, &px);

        guest.grayscale(address, 8).unwrap();
        assert_eq!(
            guest.memory().slice(address, 8).unwrap(),
            &[76, 76, 76, 255, 150, 150, 150, 255]
        );
    }

    #[test]
    fn test_color_matrix_reads_params_from_memory() {
        let mut guest = NativeGuest::with_config(MemoryConfig::tiny(1, 2));
        let address = upload(&mut guest, &[10, 20, 30, 40]);
        // Swap red and blue
        let matrix = upload(&mut guest, &[128, 128, 192, 128, 192, 128, 192, 128, 128]);

        guest.color_matrix(address, 4, matrix).unwrap();
        assert_eq!(guest.memory().slice(address, 4).unwrap(), &[30, 20, 10, 40]);
    }

    #[test]
    fn test_neighbourhood_rejects_short_buffer() {
        let mut guest = NativeGuest::with_config(MemoryConfig::tiny(1, 2));
        let address = upload(&mut guest, &[0; 16]);

        let err = guest.blur(address, 16, 3, 3).unwrap_err();
        assert_eq!(
            err,
            LumaError::LengthMismatch {
                expected: 36,
                actual: 16
            }
        );
    }

    #[test]
    fn test_out_of_bounds_address_traps() {
        let mut guest = NativeGuest::with_config(MemoryConfig::tiny(1, 1));
        let err = guest.invert(u32::MAX - 8, 4).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_partial_guest_reports_missing_export() {
        struct AllocOnly {
            memory: LinearMemory,
            arena: Arena,
        }

        impl GuestModule for AllocOnly {
            fn memory(&self) -> &LinearMemory {
                &self.memory
            }
            fn memory_mut(&mut self) -> &mut LinearMemory {
                &mut self.memory
            }
            fn allocate(&mut self, length: u32) -> LumaResult<u32> {
                self.arena.allocate(&mut self.memory, length)
            }
            fn release(&mut self, address: u32, length: u32) -> LumaResult<()> {
                self.arena.release(address, length)
            }
        }

        let mut guest = AllocOnly {
            memory: LinearMemory::new(&MemoryConfig::tiny(1, 1)),
            arena: Arena::new(),
        };
        let address = guest.allocate(4).unwrap();
        let err = guest.blur(address, 4, 1, 1).unwrap_err();
        assert_eq!(err, LumaError::MissingExport(exports::BLUR));
        assert!(err.is_recoverable());
        assert!(guest.arena_stats().is_none());
    }
}
