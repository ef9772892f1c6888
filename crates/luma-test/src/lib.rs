//! LUMA Test Harness
//!
//! - Synthetic scenes and frame sources with seeded randomness
//! - Recording display and metrics sinks
//! - A virtual-clock scenario driver around the capture loop

pub mod scenario;
pub mod sinks;
pub mod sources;

pub use scenario::*;
pub use sinks::*;
pub use sources::*;
