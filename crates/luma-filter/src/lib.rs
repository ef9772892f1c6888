//! LUMA Filter Pipeline
//!
//! Filters are pure, in-place transforms of one guest allocation. The host
//! picks a [`Filter`] variant, copies the frame into the guest, invokes the
//! matching export and copies the result back out.
//!
//! - Pixelwise: grayscale, invert, brightness, threshold, sepia, contrast,
//!   saturation, colour matrix
//! - Neighbourhood (clamp-to-edge): edge detection, blur
//! - Presets: fixed tone matrices supplied by the host

pub mod filter;
pub mod pipeline;
pub mod preset;

pub use filter::*;
pub use pipeline::*;
pub use preset::*;
