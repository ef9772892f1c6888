//! Scenario driver
//!
//! Runs a capture loop over a [`SceneSource`] on a virtual clock, so tests
//! can step through exact tick sequences without sleeping.

use std::time::{Duration, Instant};

use luma_core::{FrameSize, LumaError, LumaResult};
use luma_guest::{MemoryConfig, NativeGuest, Session};
use luma_runtime::{CaptureConfig, CaptureLoop, ConfigError, TickOutcome};

use crate::sinks::{RecordingDisplay, RecordingMetrics};
use crate::sources::{Scene, SceneSource};

/// Default tick spacing, roughly one display refresh
pub const DEFAULT_TICK: Duration = Duration::from_millis(16);

/// Upper bound on ticks spent waiting for frames in [`Scenario::run_frames`]
const MAX_TICKS_PER_FRAME: u32 = 64;

pub struct Scenario {
    capture: CaptureLoop<NativeGuest, SceneSource>,
    display: RecordingDisplay,
    metrics: RecordingMetrics,
    epoch: Instant,
    elapsed: Duration,
    tick: Duration,
    errors: Vec<LumaError>,
}

impl Scenario {
    /// 30 fps over the given script with default guest memory
    pub fn new(size: FrameSize, script: Vec<Scene>) -> Result<Self, ConfigError> {
        let config = CaptureConfig {
            width: size.width,
            height: size.height,
            ..Default::default()
        };
        Self::with_config(size, script, config, MemoryConfig::default())
    }

    pub fn with_config(
        size: FrameSize,
        script: Vec<Scene>,
        config: CaptureConfig,
        memory: MemoryConfig,
    ) -> Result<Self, ConfigError> {
        Self::with_display(size, script, config, memory, RecordingDisplay::new())
    }

    pub fn with_display(
        size: FrameSize,
        script: Vec<Scene>,
        config: CaptureConfig,
        memory: MemoryConfig,
        display: RecordingDisplay,
    ) -> Result<Self, ConfigError> {
        let tick = config.tick_interval;
        let metrics = RecordingMetrics::new();
        let session = Session::new(NativeGuest::with_config(memory));
        let capture = CaptureLoop::new(session, SceneSource::new(size, script), config)?
            .with_display(display.clone())
            .with_metrics_sink(metrics.clone());

        Ok(Scenario {
            capture,
            display,
            metrics,
            epoch: Instant::now(),
            elapsed: Duration::ZERO,
            tick,
            errors: Vec::new(),
        })
    }

    pub fn start(&mut self) -> LumaResult<FrameSize> {
        self.capture.start()
    }

    pub fn stop(&mut self) -> LumaResult<()> {
        self.capture.stop()
    }

    /// Run one tick and advance the clock. Errors are recorded, not returned.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        let now = self.epoch + self.elapsed;
        self.elapsed += self.tick;
        match self.capture.step(now) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    /// Run `ticks` ticks
    pub fn advance(&mut self, ticks: u32) -> Vec<Option<TickOutcome>> {
        (0..ticks).map(|_| self.tick()).collect()
    }

    /// Tick until `frames` more frames have been processed.
    ///
    /// Returns the number of frames actually processed; fewer means the loop
    /// stopped or kept failing.
    pub fn run_frames(&mut self, frames: u64) -> u64 {
        let target = self.capture.stats().frames_processed + frames;
        let budget = frames.saturating_mul(MAX_TICKS_PER_FRAME as u64);
        let start = self.capture.stats().frames_processed;

        for _ in 0..budget {
            if self.capture.stats().frames_processed >= target || !self.capture.is_running() {
                break;
            }
            self.tick();
        }
        self.capture.stats().frames_processed - start
    }

    pub fn capture(&self) -> &CaptureLoop<NativeGuest, SceneSource> {
        &self.capture
    }

    pub fn capture_mut(&mut self) -> &mut CaptureLoop<NativeGuest, SceneSource> {
        &mut self.capture
    }

    pub fn display(&self) -> &RecordingDisplay {
        &self.display
    }

    pub fn metrics(&self) -> &RecordingMetrics {
        &self.metrics
    }

    /// Errors returned by ticks so far
    pub fn errors(&self) -> &[LumaError] {
        &self.errors
    }

    /// Virtual time since the scenario began
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn live_buffers(&self) -> usize {
        self.capture.session().live_buffers()
    }
}
