//! LUMA Frame Analysis
//!
//! Per-frame scalar metrics, the previous-frame state they depend on, and the
//! mapping from alert bits to reportable alerts.
//!
//! # Buffer discipline
//!
//! While a frame is being analysed at most two pixel buffers are live in the
//! guest: the transient copy of the current frame and the persistent copy of
//! the previous one. Between frames exactly one is live (after the first
//! frame), and none after [`FrameAnalyzer::stop`].

pub mod alert;
pub mod analyzer;
pub mod report;
pub mod temporal;

pub use alert::*;
pub use analyzer::*;
pub use report::*;
pub use temporal::*;
