//! Pixel kernels executed inside the guest
//!
//! Pure functions over RGBA byte slices. Trailing bytes that do not form a
//! whole pixel are left untouched. Alpha is never modified.

pub mod analysis;
pub mod neighborhood;
pub mod pixel;

pub use analysis::DetectionThresholds;

/// Clamp a float channel value into a byte
#[inline]
pub(crate) fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
