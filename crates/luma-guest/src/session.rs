//! Host-side buffer bridge
//!
//! A [`Session`] owns exactly one guest. Every pipeline operation receives the
//! session explicitly, so independent sessions never share memory.
//!
//! Ownership rules are carried by the types:
//! - [`BufferHandle`] is neither `Copy` nor `Clone`, and [`Session::release`]
//!   consumes it. Releasing twice, or touching a buffer after release, does not
//!   compile.
//! - [`GuestView`] / [`GuestViewMut`] borrow the session. Allocation needs
//!   `&mut Session`, so no view can survive an allocation that might grow
//!   memory.
//! - [`ViewWindow`] is the detached `{base, length, epoch}` form. It borrows
//!   the handle it was taken from, so the handle cannot be released while the
//!   window exists. It must go back through [`Session::rederive`] to become
//!   readable again.

use std::fmt;
use std::ops::{Deref, DerefMut};

use luma_core::{LumaError, LumaResult};

use crate::arena::ArenaStats;
use crate::module::GuestModule;

/// An allocation inside guest memory
pub struct BufferHandle {
    address: u32,
    length: u32,
}

impl BufferHandle {
    #[inline]
    pub fn address(&self) -> u32 {
        self.address
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({:#x}+{})", self.address, self.length)
    }
}

/// Detached description of a view, tagged with the memory epoch it was taken at.
///
/// Only [`Session::window`] creates one, and it holds a borrow of the handle.
#[derive(Clone, Copy, Debug)]
pub struct ViewWindow<'h> {
    handle: &'h BufferHandle,
    epoch: u64,
}

impl ViewWindow<'_> {
    #[inline]
    pub fn base(&self) -> u32 {
        self.handle.address
    }

    #[inline]
    pub fn length(&self) -> u32 {
        self.handle.length
    }

    /// Memory epoch the window was taken at
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Read-only host view into guest memory
pub struct GuestView<'s> {
    bytes: &'s [u8],
    base: u32,
    epoch: u64,
}

impl GuestView<'_> {
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Memory epoch the view was derived at
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Deref for GuestView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

/// Writable host view into guest memory
pub struct GuestViewMut<'s> {
    bytes: &'s mut [u8],
    base: u32,
    epoch: u64,
}

impl GuestViewMut<'_> {
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Deref for GuestViewMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl DerefMut for GuestViewMut<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.bytes
    }
}

/// Point-in-time view of a session's memory use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub pages: u32,
    pub maximum_pages: u32,
    pub epoch: u64,
    pub live_buffers: usize,
    /// Present when the guest exposes allocator counters
    pub arena: Option<ArenaStats>,
}

/// Host/guest session
pub struct Session<G: GuestModule> {
    guest: G,
    live: usize,
    rederived: u64,
}

impl<G: GuestModule> Session<G> {
    pub fn new(guest: G) -> Self {
        Session {
            guest,
            live: 0,
            rederived: 0,
        }
    }

    /// Exports of the guest
    #[inline]
    pub fn guest(&mut self) -> &mut G {
        &mut self.guest
    }

    #[inline]
    pub fn guest_ref(&self) -> &G {
        &self.guest
    }

    /// Current memory epoch
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.guest.memory().epoch()
    }

    /// Buffers allocated through this session and not yet released
    #[inline]
    pub fn live_buffers(&self) -> usize {
        self.live
    }

    /// Number of stale windows that had to be re-derived
    #[inline]
    pub fn rederived_views(&self) -> u64 {
        self.rederived
    }

    pub fn arena_stats(&self) -> Option<ArenaStats> {
        self.guest.arena_stats()
    }

    pub fn memory_stats(&self) -> MemoryStats {
        let memory = self.guest.memory();
        MemoryStats {
            pages: memory.pages(),
            maximum_pages: memory.maximum_pages(),
            epoch: memory.epoch(),
            live_buffers: self.live,
            arena: self.guest.arena_stats(),
        }
    }

    /// Allocate `length` bytes of guest memory.
    ///
    /// Out-of-memory is fatal and never retried.
    pub fn allocate(&mut self, length: usize) -> LumaResult<BufferHandle> {
        let length = u32::try_from(length).map_err(|_| LumaError::OutOfMemory {
            requested: length,
            available: self.guest.memory().growable_bytes(),
        })?;

        let epoch = self.epoch();
        let address = self.guest.allocate(length)?;
        self.live += 1;

        if self.epoch() != epoch {
            tracing::debug!(
                address,
                length,
                epoch = self.epoch(),
                "allocation grew guest memory; earlier views are stale"
            );
        }
        Ok(BufferHandle { address, length })
    }

    /// Return a buffer to the guest. Consumes the handle.
    ///
    /// The live count only drops once the guest has accepted the release.
    pub fn release(&mut self, handle: BufferHandle) -> LumaResult<()> {
        self.guest.release(handle.address, handle.length)?;
        self.live = self.live.saturating_sub(1);
        Ok(())
    }

    /// Copy exactly `handle.len()` bytes into the buffer
    pub fn copy_in(&mut self, handle: &BufferHandle, bytes: &[u8]) -> LumaResult<()> {
        let mut view = self.view_mut(handle)?;
        if bytes.len() != view.len() {
            return Err(LumaError::LengthMismatch {
                expected: view.len(),
                actual: bytes.len(),
            });
        }
        view.copy_from_slice(bytes);
        Ok(())
    }

    /// Copy exactly `handle.len()` bytes out of the buffer
    pub fn copy_out(&self, handle: &BufferHandle, out: &mut [u8]) -> LumaResult<()> {
        let view = self.view(handle)?;
        if out.len() != view.len() {
            return Err(LumaError::LengthMismatch {
                expected: view.len(),
                actual: out.len(),
            });
        }
        out.copy_from_slice(&view);
        Ok(())
    }

    /// Allocate a buffer and fill it with `bytes`
    pub fn upload(&mut self, bytes: &[u8]) -> LumaResult<BufferHandle> {
        let handle = self.allocate(bytes.len())?;
        if let Err(e) = self.copy_in(&handle, bytes) {
            self.release(handle)?;
            return Err(e);
        }
        Ok(handle)
    }

    /// Owned copy of the buffer's contents
    pub fn read(&self, handle: &BufferHandle) -> LumaResult<Vec<u8>> {
        Ok(self.view(handle)?.to_vec())
    }

    /// Borrow the buffer's bytes at the current epoch
    pub fn view(&self, handle: &BufferHandle) -> LumaResult<GuestView<'_>> {
        let bytes = self.guest.memory().slice(handle.address, handle.length)?;
        Ok(GuestView {
            bytes,
            base: handle.address,
            epoch: self.epoch(),
        })
    }

    pub fn view_mut(&mut self, handle: &BufferHandle) -> LumaResult<GuestViewMut<'_>> {
        let epoch = self.epoch();
        let bytes = self
            .guest
            .memory_mut()
            .slice_mut(handle.address, handle.length)?;
        Ok(GuestViewMut {
            bytes,
            base: handle.address,
            epoch,
        })
    }

    /// Detached window for `handle` at the current epoch
    ///
    /// ```rust
    /// use luma_guest::{NativeGuest, Session};
    ///
    /// let mut session = Session::new(NativeGuest::new());
    /// let handle = session.upload(&[1u8; 32]).unwrap();
    /// let window = session.window(&handle);
    /// assert_eq!(session.rederive(window).unwrap().len(), 32);
    /// session.release(handle).unwrap();
    /// ```
    pub fn window<'h>(&self, handle: &'h BufferHandle) -> ViewWindow<'h> {
        ViewWindow {
            handle,
            epoch: self.epoch(),
        }
    }

    /// Turn a detached window back into a view.
    ///
    /// A window from an older epoch is re-derived against the current
    /// memory before any byte is read through it. The window keeps its
    /// handle borrowed, so a released buffer can never be read back:
    ///
    /// ```compile_fail
    /// use luma_guest::{NativeGuest, Session};
    ///
    /// let mut session = Session::new(NativeGuest::new());
    /// let handle = session.upload(&[1u8; 32]).unwrap();
    /// let window = session.window(&handle);
    /// session.release(handle).unwrap();
    /// let _ = session.rederive(window);
    /// ```
    pub fn rederive(&mut self, window: ViewWindow<'_>) -> LumaResult<GuestView<'_>> {
        if window.epoch != self.epoch() {
            self.rederived += 1;
            tracing::debug!(
                base = window.base(),
                stale = window.epoch,
                current = self.epoch(),
                "re-deriving stale guest view"
            );
        }
        self.view(window.handle)
    }

    /// Tear the session down, returning the guest
    pub fn into_guest(self) -> G {
        self.guest
    }
}

impl<G: GuestModule + fmt::Debug> fmt::Debug for Session<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("guest", &self.guest)
            .field("live", &self.live)
            .finish()
    }
}
