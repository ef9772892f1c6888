//! Recording sinks
//!
//! Both sinks are cheap handles over shared storage: clone one, give the
//! clone to the capture loop, and inspect the original afterwards.

use std::sync::Arc;

use luma_analysis::{FrameReport, Status};
use luma_core::{AlertFlags, Frame, LumaError, LumaResult};
use luma_runtime::{DisplaySink, MetricsSink};
use parking_lot::Mutex;

/// Keeps every presented frame
#[derive(Clone, Debug, Default)]
pub struct RecordingDisplay {
    frames: Arc<Mutex<Vec<Frame>>>,
    /// Fail the presentation of these 1-based frame counts
    fail_on: Arc<Mutex<Vec<usize>>>,
    attempts: Arc<Mutex<usize>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th presentation (1-based) fail with a display error
    pub fn fail_on(self, n: usize) -> Self {
        self.fail_on.lock().push(n);
        self
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    pub fn last(&self) -> Option<Frame> {
        self.frames.lock().last().cloned()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().clone()
    }
}

impl DisplaySink for RecordingDisplay {
    fn present(&mut self, frame: &Frame) -> LumaResult<()> {
        let attempt = {
            let mut attempts = self.attempts.lock();
            *attempts += 1;
            *attempts
        };
        if self.fail_on.lock().contains(&attempt) {
            return Err(LumaError::DisplayError(format!("presentation {} refused", attempt)));
        }
        self.frames.lock().push(frame.clone());
        Ok(())
    }
}

/// Keeps every report
#[derive(Clone, Debug, Default)]
pub struct RecordingMetrics {
    reports: Arc<Mutex<Vec<FrameReport>>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }

    pub fn reports(&self) -> Vec<FrameReport> {
        self.reports.lock().clone()
    }

    pub fn last(&self) -> Option<FrameReport> {
        self.reports.lock().last().cloned()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.reports.lock().iter().map(FrameReport::status).collect()
    }

    /// Union of every flag raised so far
    pub fn all_flags(&self) -> AlertFlags {
        self.reports
            .lock()
            .iter()
            .fold(AlertFlags::NONE, |acc, r| AlertFlags(acc.0 | r.flags.0))
    }
}

impl MetricsSink for RecordingMetrics {
    fn record(&mut self, report: &FrameReport) {
        self.reports.lock().push(report.clone());
    }
}
