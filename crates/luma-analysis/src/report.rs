//! Per-frame reports

use std::fmt;

use luma_core::{AlertFlags, FrameMetrics};

use crate::alert::{classify, Alert};

/// Overall state shown next to the live view
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Status {
    /// Not analysing
    #[default]
    Idle,
    /// Analysing, nothing to report
    Nominal,
    /// The last frame raised at least one alert
    Alert,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Idle => "Idle",
            Status::Nominal => "Analyzing",
            Status::Alert => "Alert",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything known about one processed frame
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// 1-based, counted since the analyzer was last started
    pub frame_number: u64,
    pub metrics: FrameMetrics,
    pub flags: AlertFlags,
    pub alerts: Vec<Alert>,
}

impl FrameReport {
    pub fn new(frame_number: u64, metrics: FrameMetrics, flags: AlertFlags) -> Self {
        FrameReport {
            frame_number,
            metrics,
            flags,
            alerts: classify(flags),
        }
    }

    pub fn status(&self) -> Status {
        if self.alerts.is_empty() {
            Status::Nominal
        } else {
            Status::Alert
        }
    }
}
