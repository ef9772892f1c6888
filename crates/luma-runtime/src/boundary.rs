//! Host boundary traits
//!
//! Camera access, rendering and metric presentation live outside LUMA. These
//! traits are the seams they plug into.

use luma_analysis::FrameReport;
use luma_core::{Frame, FrameSize, LumaResult};

/// Produces fixed-size RGBA frames
pub trait FrameSource {
    /// Start producing frames. `requested` is a hint; the returned size is
    /// what every subsequent frame will have.
    ///
    /// Fails with [`luma_core::LumaError::SourceUnavailable`] when the device
    /// cannot be opened.
    fn open(&mut self, requested: FrameSize) -> LumaResult<FrameSize>;

    /// The next frame, or `None` when nothing new is ready this tick
    fn next_frame(&mut self) -> LumaResult<Option<Frame>>;

    fn close(&mut self) {}
}

/// Consumes displayed frames
pub trait DisplaySink {
    fn present(&mut self, frame: &Frame) -> LumaResult<()>;
}

/// Accepts one report per processed frame
pub trait MetricsSink {
    fn record(&mut self, report: &FrameReport);
}

/// Display that discards every frame
#[derive(Debug, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn present(&mut self, _frame: &Frame) -> LumaResult<()> {
        Ok(())
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn open(&mut self, requested: FrameSize) -> LumaResult<FrameSize> {
        (**self).open(requested)
    }

    fn next_frame(&mut self) -> LumaResult<Option<Frame>> {
        (**self).next_frame()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
