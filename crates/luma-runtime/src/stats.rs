//! Loop statistics

use std::fmt;
use std::time::Duration;

/// Counters for one run of the capture loop. Reset on start.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoopStats {
    /// Ticks observed while running
    pub ticks: u64,
    /// Frames that made it through analysis
    pub frames_processed: u64,
    /// Ticks dropped because the target interval had not elapsed
    pub skipped_ticks: u64,
    /// Ticks where the source had nothing new
    pub empty_ticks: u64,
    /// Recoverable failures (source unavailable, filter errors, ...)
    pub recoverable_errors: u64,
    /// `1000 / elapsed_ms` between the last two processed frames
    pub measured_fps: u32,
    /// Wall time spent on the last processed frame
    pub last_process_time: Duration,
}

impl LoopStats {
    pub(crate) fn record_interval(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        if ms > 0.0 {
            self.measured_fps = (1000.0 / ms).round() as u32;
        }
    }
}

impl fmt::Display for LoopStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames, {} skipped, {} errors, {} fps, last frame {}",
            self.frames_processed,
            self.skipped_ticks,
            self.recoverable_errors,
            self.measured_fps,
            humantime::format_duration(self.last_process_time),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measured_fps() {
        let mut stats = LoopStats::default();
        stats.record_interval(Duration::from_millis(40));
        assert_eq!(stats.measured_fps, 25);
        stats.record_interval(Duration::from_millis(33));
        assert_eq!(stats.measured_fps, 30);
        stats.record_interval(Duration::ZERO);
        assert_eq!(stats.measured_fps, 30);
    }

    #[test]
    fn test_display() {
        let stats = LoopStats {
            frames_processed: 3,
            last_process_time: Duration::from_micros(1500),
            ..Default::default()
        };
        assert_eq!(
            stats.to_string(),
            "3 frames, 0 skipped, 0 errors, 0 fps, last frame 1ms 500us"
        );
    }
}
