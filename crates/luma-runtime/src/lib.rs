//! LUMA Runtime
//!
//! Drives the per-frame pipeline from a frame source to the display and
//! metrics sinks:
//!
//! ```text
//! FrameSource -> Session upload -> FrameAnalyzer -> display filter
//!             -> DisplaySink + MetricsSink
//! ```
//!
//! The loop is single-threaded and cooperative. [`CaptureLoop::step`] is one
//! tick; [`CaptureLoop::run`] calls it from a tokio interval until the
//! [`StopHandle`] fires or a fatal error occurs.

pub mod boundary;
pub mod capture;
pub mod config;
pub mod logging;
pub mod sinks;
pub mod stats;

pub use boundary::*;
pub use capture::*;
pub use config::*;
pub use sinks::*;
pub use stats::*;
