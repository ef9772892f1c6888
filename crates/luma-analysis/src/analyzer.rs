//! Frame analyzer
//!
//! One call to [`FrameAnalyzer::process`] runs the fixed per-frame sequence:
//!
//! 1. copy the frame into a transient guest buffer
//! 2. brightness, blur and face presence on the transient alone
//! 3. with a previous frame: motion score and alert flags
//! 4. release the old previous buffer
//! 5. copy the frame into a new previous buffer, remember its brightness
//! 6. release the transient
//!
//! The transient is released on every path, including errors in steps 2-5.
//! A guest without the motion or cheating export reports that signal as
//! absent (motion 0, no flags) and the previous frame still moves forward.

use luma_core::{AlertFlags, Frame, FrameMetrics, FrameSize, LumaError, LumaResult};
use luma_guest::{BufferHandle, GuestModule, Session};
use tracing::{debug, trace};

use crate::report::FrameReport;
use crate::temporal::TemporalState;

#[derive(Debug, Default)]
pub struct FrameAnalyzer {
    state: TemporalState,
    previous_size: Option<FrameSize>,
    frames: u64,
}

impl FrameAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TemporalState {
        &self.state
    }

    /// Frames processed since the last start
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Analyse one frame and roll the temporal state forward
    pub fn process<G: GuestModule>(
        &mut self,
        session: &mut Session<G>,
        frame: &Frame,
    ) -> LumaResult<FrameReport> {
        let transient = session.upload(frame.as_bytes())?;

        let result = self.measure(session, &transient, frame);
        let released = session.release(transient);
        let (metrics, flags) = result?;
        released?;

        self.frames += 1;
        trace!(
            frame = self.frames,
            brightness = metrics.brightness,
            blur = metrics.blur_score,
            face = metrics.face_presence,
            motion = metrics.motion_score,
            flags = flags.0,
            "frame analysed"
        );
        Ok(FrameReport::new(self.frames, metrics, flags))
    }

    fn measure<G: GuestModule>(
        &mut self,
        session: &mut Session<G>,
        current: &BufferHandle,
        frame: &Frame,
    ) -> LumaResult<(FrameMetrics, AlertFlags)> {
        let size = frame.size();
        let (address, length) = (current.address(), current.len());
        let (width, height) = (size.width, size.height);

        let guest = session.guest();
        let brightness = guest.analyze_brightness(address, length)?;
        let blur_score = guest.detect_blur(address, length, width, height)?;
        let face_presence = guest.detect_face_presence(address, length, width, height)?;

        let mut metrics = FrameMetrics {
            brightness,
            blur_score,
            face_presence,
            motion_score: 0,
        };
        let mut flags = AlertFlags::NONE;

        let previous = self
            .state
            .previous()
            .filter(|_| self.previous_size == Some(size))
            .map(BufferHandle::address);
        if let Some(previous_address) = previous {
            let guest = session.guest();
            metrics.motion_score =
                temporal_signal(guest.calculate_motion(address, previous_address, length))?
                    .unwrap_or(0);
            flags = temporal_signal(guest.detect_cheating(
                address,
                length,
                width,
                height,
                previous_address,
                self.state.previous_brightness(),
            ))?
            .map_or(AlertFlags::NONE, AlertFlags::from_raw);
        } else if self.state.has_previous() {
            debug!(size = %size, "frame size changed, skipping temporal comparison");
        }

        if let Some(old) = self.state.take_previous() {
            self.previous_size = None;
            session.release(old)?;
        }

        let previous = session.upload(frame.as_bytes())?;
        self.state.store(previous, brightness);
        self.previous_size = Some(size);

        Ok((metrics, flags))
    }

    /// Release the previous-frame buffer and reset counters.
    ///
    /// The analyzer can be reused afterwards and starts from a clean state.
    pub fn stop<G: GuestModule>(&mut self, session: &mut Session<G>) -> LumaResult<()> {
        self.frames = 0;
        self.previous_size = None;
        self.state.clear(session)
    }
}

/// A missing temporal export means the signal is unavailable, not a failed frame
fn temporal_signal<T>(result: LumaResult<T>) -> LumaResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(LumaError::MissingExport(name)) => {
            debug!(export = name, "temporal signal unavailable");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
