//! LUMA Core - Fundamental types shared by host and guest
//!
//! This crate defines the types used throughout the LUMA bridge:
//! - Frame geometry and RGBA pixel buffers
//! - Per-frame metrics
//! - Alert flag bitmask
//! - Error classification (fatal vs. recoverable)

pub mod error;
pub mod flags;
pub mod frame;
pub mod metrics;

pub use error::*;
pub use flags::*;
pub use frame::*;
pub use metrics::*;
