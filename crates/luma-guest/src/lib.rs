//! LUMA Guest - the sandbox side of the bridge
//!
//! Pixel work happens inside a guest module that the host can only reach
//! through a flat, growable linear memory and a fixed set of exports.
//!
//! # Layers
//!
//! - [`LinearMemory`]: page-granular byte store that can grow up to a fixed
//!   maximum. Every growth bumps the memory epoch.
//! - [`Arena`]: the guest's allocator over that memory.
//! - [`GuestModule`]: the export contract (`allocate`, `release`, filters,
//!   analysis).
//! - [`NativeGuest`]: in-process reference guest implementing every export.
//! - [`Session`]: host-side bridge owning one guest; hands out
//!   [`BufferHandle`]s and epoch-tagged views.

pub mod arena;
pub mod kernels;
pub mod memory;
pub mod module;
pub mod native;
pub mod session;

pub use arena::*;
pub use kernels::DetectionThresholds;
pub use memory::*;
pub use module::*;
pub use native::*;
pub use session::*;
