//! Previous-frame state carried between ticks

use luma_core::LumaResult;
use luma_guest::{BufferHandle, GuestModule, Session};
use tracing::{debug, warn};

/// The single previous-frame buffer and its brightness.
///
/// Empty before the first frame. Replaced once per processed frame. Must be
/// cleared against the owning session before being dropped.
#[derive(Debug, Default)]
pub struct TemporalState {
    previous: Option<BufferHandle>,
    previous_brightness: u8,
}

impl TemporalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> Option<&BufferHandle> {
        self.previous.as_ref()
    }

    pub fn previous_brightness(&self) -> u8 {
        self.previous_brightness
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    pub(crate) fn take_previous(&mut self) -> Option<BufferHandle> {
        self.previous.take()
    }

    pub(crate) fn store(&mut self, handle: BufferHandle, brightness: u8) {
        debug_assert!(self.previous.is_none());
        self.previous = Some(handle);
        self.previous_brightness = brightness;
    }

    /// Release the previous buffer, if any, and forget the brightness
    pub fn clear<G: GuestModule>(&mut self, session: &mut Session<G>) -> LumaResult<()> {
        self.previous_brightness = 0;
        match self.previous.take() {
            Some(handle) => {
                debug!(address = handle.address(), "releasing previous frame");
                session.release(handle)
            }
            None => Ok(()),
        }
    }
}

impl Drop for TemporalState {
    fn drop(&mut self) {
        if let Some(handle) = &self.previous {
            warn!(?handle, "temporal state dropped while holding a guest buffer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luma_guest::NativeGuest;

    #[test]
    fn test_clear_releases_buffer() {
        let mut session = Session::new(NativeGuest::new());
        let mut state = TemporalState::new();
        assert!(!state.has_previous());

        let handle = session.upload(&[1u8; 64]).unwrap();
        state.store(handle, 42);
        assert_eq!(state.previous_brightness(), 42);
        assert_eq!(session.live_buffers(), 1);

        state.clear(&mut session).unwrap();
        assert!(!state.has_previous());
        assert_eq!(state.previous_brightness(), 0);
        assert_eq!(session.live_buffers(), 0);

        // Clearing twice is harmless
        state.clear(&mut session).unwrap();
    }
}
