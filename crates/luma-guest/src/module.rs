//! Guest export contract
//!
//! Addresses are offsets into the guest's linear memory. Pixel buffers are
//! RGBA, row-major, without padding. Only memory access and the allocator are
//! mandatory; every other export defaults to [`LumaError::MissingExport`] so a
//! guest built without some operations is still usable for the rest.

use luma_core::{LumaError, LumaResult};

use crate::arena::ArenaStats;
use crate::memory::LinearMemory;

/// Names of the optional exports, as the guest publishes them
pub mod exports {
    pub const GRAYSCALE: &str = "grayscale";
    pub const INVERT: &str = "invert";
    pub const BRIGHTNESS: &str = "brightness";
    pub const THRESHOLD: &str = "threshold";
    pub const SEPIA: &str = "sepia";
    pub const CONTRAST: &str = "contrast";
    pub const SATURATION: &str = "saturation";
    pub const COLOR_MATRIX: &str = "colorMatrix";
    pub const EDGE_DETECT: &str = "edgeDetect";
    pub const BLUR: &str = "blur";
    pub const PRESET_FILTER: &str = "presetFilter";
    pub const ANALYZE_BRIGHTNESS: &str = "analyzeBrightness";
    pub const DETECT_BLUR: &str = "detectBlur";
    pub const DETECT_FACE_PRESENCE: &str = "detectFacePresence";
    pub const CALCULATE_MOTION: &str = "calculateMotion";
    pub const DETECT_CHEATING: &str = "detectCheating";
}

#[inline]
fn missing<T>(name: &'static str) -> LumaResult<T> {
    Err(LumaError::MissingExport(name))
}

/// A sandboxed compute module reached through linear memory
pub trait GuestModule {
    /// The guest's linear memory
    fn memory(&self) -> &LinearMemory;

    fn memory_mut(&mut self) -> &mut LinearMemory;

    /// Reserve `length` bytes. May grow memory; fails fatally when it cannot.
    fn allocate(&mut self, length: u32) -> LumaResult<u32>;

    /// Return a block obtained from [`GuestModule::allocate`]
    fn release(&mut self, address: u32, length: u32) -> LumaResult<()>;

    /// Allocator counters, when the guest exposes them
    fn arena_stats(&self) -> Option<ArenaStats> {
        None
    }

    fn grayscale(&mut self, _address: u32, _length: u32) -> LumaResult<()> {
        missing(exports::GRAYSCALE)
    }

    fn invert(&mut self, _address: u32, _length: u32) -> LumaResult<()> {
        missing(exports::INVERT)
    }

    fn brightness(&mut self, _address: u32, _length: u32, _delta: i32) -> LumaResult<()> {
        missing(exports::BRIGHTNESS)
    }

    fn threshold(&mut self, _address: u32, _length: u32, _level: u8) -> LumaResult<()> {
        missing(exports::THRESHOLD)
    }

    fn sepia(&mut self, _address: u32, _length: u32) -> LumaResult<()> {
        missing(exports::SEPIA)
    }

    fn contrast(&mut self, _address: u32, _length: u32, _factor: f32) -> LumaResult<()> {
        missing(exports::CONTRAST)
    }

    fn saturation(&mut self, _address: u32, _length: u32, _factor: f32) -> LumaResult<()> {
        missing(exports::SATURATION)
    }

    /// `matrix_address` points at 9 quantized samples (see `decode_coefficient`)
    fn color_matrix(&mut self, _address: u32, _length: u32, _matrix_address: u32) -> LumaResult<()> {
        missing(exports::COLOR_MATRIX)
    }

    fn edge_detect(&mut self, _address: u32, _length: u32, _width: u32, _height: u32) -> LumaResult<()> {
        missing(exports::EDGE_DETECT)
    }

    fn blur(&mut self, _address: u32, _length: u32, _width: u32, _height: u32) -> LumaResult<()> {
        missing(exports::BLUR)
    }

    /// `preset_address` points at 9 matrix samples followed by one vignette sample
    fn preset_filter(
        &mut self,
        _address: u32,
        _length: u32,
        _preset_address: u32,
        _width: u32,
        _height: u32,
    ) -> LumaResult<()> {
        missing(exports::PRESET_FILTER)
    }

    fn analyze_brightness(&mut self, _address: u32, _length: u32) -> LumaResult<u8> {
        missing(exports::ANALYZE_BRIGHTNESS)
    }

    fn detect_blur(&mut self, _address: u32, _length: u32, _width: u32, _height: u32) -> LumaResult<u32> {
        missing(exports::DETECT_BLUR)
    }

    fn detect_face_presence(
        &mut self,
        _address: u32,
        _length: u32,
        _width: u32,
        _height: u32,
    ) -> LumaResult<u8> {
        missing(exports::DETECT_FACE_PRESENCE)
    }

    fn calculate_motion(&mut self, _address: u32, _previous_address: u32, _length: u32) -> LumaResult<u32> {
        missing(exports::CALCULATE_MOTION)
    }

    fn detect_cheating(
        &mut self,
        _address: u32,
        _length: u32,
        _width: u32,
        _height: u32,
        _previous_address: u32,
        _previous_brightness: u8,
    ) -> LumaResult<u32> {
        missing(exports::DETECT_CHEATING)
    }
}
