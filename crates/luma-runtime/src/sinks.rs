//! Ready-made metrics sinks

use std::io::Write;

use luma_analysis::{FrameReport, Status};
use serde::Serialize;
use tracing::{info, warn};

use crate::boundary::MetricsSink;

/// Logs each report through `tracing`
#[derive(Debug, Default)]
pub struct TracingSink {
    last_status: Status,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsSink for TracingSink {
    fn record(&mut self, report: &FrameReport) {
        let m = &report.metrics;
        let status = report.status();
        if status != self.last_status {
            info!(frame = report.frame_number, status = %status, "status changed");
            self.last_status = status;
        }
        for alert in &report.alerts {
            warn!(
                frame = report.frame_number,
                severity = alert.severity.as_str(),
                "{}",
                alert.message
            );
        }
        tracing::debug!(
            frame = report.frame_number,
            brightness = m.brightness,
            blur = m.blur_score,
            face = m.face_presence,
            motion = m.motion_score,
            "metrics"
        );
    }
}

#[derive(Serialize)]
struct AlertRecord {
    severity: &'static str,
    message: &'static str,
}

/// Wire form of a [`FrameReport`]
#[derive(Serialize)]
struct ReportRecord {
    frame: u64,
    brightness: u8,
    blur_score: u32,
    face_presence: u8,
    motion_score: u32,
    flags: u8,
    status: &'static str,
    alerts: Vec<AlertRecord>,
}

impl From<&FrameReport> for ReportRecord {
    fn from(report: &FrameReport) -> Self {
        let m = &report.metrics;
        ReportRecord {
            frame: report.frame_number,
            brightness: m.brightness,
            blur_score: m.blur_score,
            face_presence: m.face_presence,
            motion_score: m.motion_score,
            flags: report.flags.0,
            status: report.status().label(),
            alerts: report
                .alerts
                .iter()
                .map(|a| AlertRecord {
                    severity: a.severity.as_str(),
                    message: a.message,
                })
                .collect(),
        }
    }
}

/// Writes one JSON object per report, newline separated
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    failures: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink {
            writer,
            failures: 0,
        }
    }

    /// Reports that could not be written
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write(&mut self, report: &FrameReport) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, &ReportRecord::from(report))?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write> MetricsSink for JsonLinesSink<W> {
    fn record(&mut self, report: &FrameReport) {
        if let Err(e) = self.write(report) {
            self.failures += 1;
            warn!(frame = report.frame_number, error = %e, "failed to write report");
        }
    }
}
