//! Throttled capture loop
//!
//! Each tick either processes one frame or is skipped outright when less than
//! the target interval has passed since the last processed frame. Frames are
//! never queued. The stop flag is checked at the start of every tick, and
//! stopping releases the previous-frame buffer before the loop reports itself
//! stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use luma_analysis::{FrameAnalyzer, FrameReport, Status};
use luma_core::{Frame, FrameSize, LumaError, LumaResult};
use luma_filter::Filter;
use luma_guest::{GuestModule, MemoryStats, Session};
use parking_lot::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::boundary::{DisplaySink, FrameSource, MetricsSink, NullDisplay};
use crate::config::{target_interval, CaptureConfig, ConfigError};
use crate::stats::LoopStats;

/// Cloneable stop signal for a running loop
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop at its next tick
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The last displayed frame, for external screenshot encoders
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub frame_number: u64,
    pub frame: Frame,
}

/// Shared slot holding the latest [`Snapshot`]
#[derive(Clone, Debug, Default)]
pub struct SnapshotSlot(Arc<Mutex<Option<Snapshot>>>);

impl SnapshotSlot {
    pub fn latest(&self) -> Option<Snapshot> {
        self.0.lock().clone()
    }

    pub fn frame_number(&self) -> Option<u64> {
        self.0.lock().as_ref().map(|s| s.frame_number)
    }

    fn store(&self, snapshot: Snapshot) {
        *self.0.lock() = Some(snapshot);
    }
}

/// What a single tick did
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// The loop is not running
    Idle,
    /// The stop flag was seen; the loop is now stopped
    Stopped,
    /// Too early for the next frame
    Skipped,
    /// The source had nothing new
    NoFrame,
    Processed(FrameReport),
}

/// Frame source to sinks driver
pub struct CaptureLoop<G: GuestModule, S: FrameSource> {
    session: Session<G>,
    source: S,
    analyzer: FrameAnalyzer,
    display: Box<dyn DisplaySink + Send>,
    metrics: Vec<Box<dyn MetricsSink + Send>>,
    config: CaptureConfig,
    display_filter: Option<Filter>,
    target_interval: Duration,
    stop: StopHandle,
    snapshot: SnapshotSlot,
    running: bool,
    frame_size: Option<FrameSize>,
    last_processed: Option<Instant>,
    stats: LoopStats,
    status: Status,
}

impl<G: GuestModule, S: FrameSource> CaptureLoop<G, S> {
    pub fn new(session: Session<G>, source: S, config: CaptureConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let display_filter = config.parsed_display_filter()?;
        Ok(CaptureLoop {
            session,
            source,
            analyzer: FrameAnalyzer::new(),
            display: Box::new(NullDisplay),
            metrics: Vec::new(),
            target_interval: config.target_interval(),
            config,
            display_filter,
            stop: StopHandle::new(),
            snapshot: SnapshotSlot::default(),
            running: false,
            frame_size: None,
            last_processed: None,
            stats: LoopStats::default(),
            status: Status::Idle,
        })
    }

    pub fn with_display(mut self, display: impl DisplaySink + Send + 'static) -> Self {
        self.display = Box::new(display);
        self
    }

    pub fn with_metrics_sink(mut self, sink: impl MetricsSink + Send + 'static) -> Self {
        self.metrics.push(Box::new(sink));
        self
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Size reported by the source when the loop was started
    pub fn frame_size(&self) -> Option<FrameSize> {
        self.frame_size
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn snapshots(&self) -> SnapshotSlot {
        self.snapshot.clone()
    }

    pub fn memory_stats(&self) -> MemoryStats {
        self.session.memory_stats()
    }

    pub fn session(&self) -> &Session<G> {
        &self.session
    }

    pub fn display_filter(&self) -> Option<&Filter> {
        self.display_filter.as_ref()
    }

    pub fn set_display_filter(&mut self, filter: Option<Filter>) {
        debug!(filter = ?filter, "display filter changed");
        self.display_filter = filter;
    }

    /// Change the frame rate, effective from the next tick. Clamped to 1..=240.
    pub fn set_target_fps(&mut self, fps: u32) {
        let fps = fps.clamp(1, CaptureConfig::MAX_FPS);
        self.config.target_fps = fps;
        self.target_interval = target_interval(fps);
        debug!(fps, interval = %humantime::format_duration(self.target_interval), "target fps changed");
    }

    /// Open the source and begin a fresh run
    pub fn start(&mut self) -> LumaResult<FrameSize> {
        if self.running {
            return Err(LumaError::AlreadyRunning);
        }
        let size = self.source.open(self.config.frame_size())?;

        self.stop.reset();
        self.stats = LoopStats::default();
        self.last_processed = None;
        self.frame_size = Some(size);
        self.status = Status::Idle;
        self.running = true;

        info!(
            size = %size,
            fps = self.config.target_fps,
            filter = ?self.display_filter,
            "capture started"
        );
        Ok(size)
    }

    /// Stop the run. The previous-frame buffer is released before returning.
    pub fn stop(&mut self) -> LumaResult<()> {
        if !self.running {
            return Err(LumaError::NotRunning);
        }
        self.running = false;
        self.stop.stop();
        self.status = Status::Idle;
        self.source.close();

        let released = self.analyzer.stop(&mut self.session);
        info!(stats = %self.stats, live_buffers = self.session.live_buffers(), "capture stopped");
        released
    }

    /// Run one tick at time `now`
    pub fn step(&mut self, now: Instant) -> LumaResult<TickOutcome> {
        if !self.running {
            return Ok(TickOutcome::Idle);
        }
        if self.stop.is_stopped() {
            self.stop()?;
            return Ok(TickOutcome::Stopped);
        }
        self.stats.ticks += 1;

        if let Some(last) = self.last_processed {
            if now.saturating_duration_since(last) < self.target_interval {
                self.stats.skipped_ticks += 1;
                return Ok(TickOutcome::Skipped);
            }
        }

        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.stats.empty_ticks += 1;
                return Ok(TickOutcome::NoFrame);
            }
            Err(e) => return Err(self.note(e)),
        };

        if let Some(last) = self.last_processed {
            self.stats.record_interval(now.saturating_duration_since(last));
        }
        self.last_processed = Some(now);

        match self.process(frame) {
            Ok(report) => Ok(TickOutcome::Processed(report)),
            Err(e) => Err(self.note(e)),
        }
    }

    fn note(&mut self, e: LumaError) -> LumaError {
        if e.is_recoverable() {
            self.stats.recoverable_errors += 1;
        }
        e
    }

    fn process(&mut self, mut frame: Frame) -> LumaResult<FrameReport> {
        let started = Instant::now();

        if let Some(expected) = self.frame_size {
            if frame.size() != expected {
                return Err(LumaError::InvalidGeometry {
                    width: expected.width,
                    height: expected.height,
                    expected: expected.byte_len(),
                    actual: frame.len(),
                });
            }
        }

        let report = self.analyzer.process(&mut self.session, &frame)?;
        self.status = report.status();
        self.stats.frames_processed += 1;
        for sink in &mut self.metrics {
            sink.record(&report);
        }

        if let Some(filter) = &self.display_filter {
            match luma_filter::apply(&mut self.session, &mut frame, filter) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => {
                    warn!(filter = %filter, error = %e, "display filter failed, showing unfiltered frame");
                    self.stats.recoverable_errors += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.display.present(&frame)?;
        self.stats.last_process_time = started.elapsed();
        self.snapshot.store(Snapshot {
            frame_number: report.frame_number,
            frame,
        });
        Ok(report)
    }

    /// Drive the loop from a tokio interval until stopped.
    ///
    /// Starts the loop if needed. Recoverable errors drop the frame and the
    /// loop carries on; a fatal error stops the loop and is returned.
    pub async fn run(&mut self) -> LumaResult<LoopStats> {
        if !self.running {
            self.start()?;
        }

        let mut ticker = time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let now = ticker.tick().await.into_std();
            match self.step(now) {
                Ok(TickOutcome::Stopped) | Ok(TickOutcome::Idle) => return Ok(self.stats.clone()),
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "fatal error, stopping capture");
                    if let Err(teardown) = self.stop() {
                        warn!(error = %teardown, "teardown after fatal error failed");
                    }
                    return Err(e);
                }
                Err(e) => warn!(error = %e, "frame dropped"),
            }
        }
    }
}

impl<G: GuestModule, S: FrameSource> Drop for CaptureLoop<G, S> {
    fn drop(&mut self) {
        if self.running {
            if let Err(e) = self.stop() {
                warn!(error = %e, "failed to stop capture loop on drop");
            }
        }
    }
}
