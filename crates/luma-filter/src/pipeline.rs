//! Filter dispatch through the buffer bridge
//!
//! [`apply`] is the whole round trip for one frame: upload, invoke, copy
//! back, release. [`apply_in_guest`] works on a buffer that already lives in
//! the guest and is what the capture loop uses when it wants to filter the
//! copy it has just analysed.

use luma_core::{Frame, FrameSize, LumaError, LumaResult};
use luma_guest::{BufferHandle, GuestModule, Session};
use tracing::{debug, trace};

use crate::filter::Filter;

/// Run `filter` over `frame` in place.
///
/// The guest buffer is released whether or not the filter succeeds.
pub fn apply<G: GuestModule>(
    session: &mut Session<G>,
    frame: &mut Frame,
    filter: &Filter,
) -> LumaResult<()> {
    let size = frame.size();
    let handle = session.upload(frame.as_bytes())?;

    let result = apply_in_guest(session, &handle, size, filter)
        .and_then(|()| session.copy_out(&handle, frame.as_bytes_mut()));

    let released = session.release(handle);
    result.and(released)
}

/// Parse `name` and run it over `frame`. Returns the filter that ran.
pub fn apply_named<G: GuestModule>(
    session: &mut Session<G>,
    frame: &mut Frame,
    name: &str,
) -> LumaResult<Filter> {
    let filter: Filter = name.parse()?;
    apply(session, frame, &filter)?;
    Ok(filter)
}

/// Run `filter` over a buffer already in guest memory.
///
/// Matrix and preset filters stage their parameters in a second short-lived
/// allocation. That allocation may grow memory, so callers must not hold a
/// view into `handle` across this call.
pub fn apply_in_guest<G: GuestModule>(
    session: &mut Session<G>,
    handle: &BufferHandle,
    size: FrameSize,
    filter: &Filter,
) -> LumaResult<()> {
    if handle.len() as usize != size.byte_len() {
        return Err(LumaError::InvalidGeometry {
            width: size.width,
            height: size.height,
            expected: size.byte_len(),
            actual: handle.len() as usize,
        });
    }

    let (address, length) = (handle.address(), handle.len());
    let (width, height) = (size.width, size.height);
    trace!(filter = %filter, address, length, "applying filter");

    match filter {
        Filter::Grayscale => session.guest().grayscale(address, length),
        Filter::Invert => session.guest().invert(address, length),
        Filter::Brightness(delta) => session.guest().brightness(address, length, *delta),
        Filter::Threshold(level) => session.guest().threshold(address, length, *level),
        Filter::Sepia => session.guest().sepia(address, length),
        Filter::Contrast(factor) => session.guest().contrast(address, length, *factor),
        Filter::Saturation(factor) => session.guest().saturation(address, length, *factor),
        Filter::EdgeDetect => session.guest().edge_detect(address, length, width, height),
        Filter::Blur => session.guest().blur(address, length, width, height),
        Filter::ColorMatrix(_) | Filter::Preset(_) => {
            let params = match filter.params() {
                Some(params) => params,
                None => return Err(LumaError::UnsupportedFilter(filter.name().to_string())),
            };
            let staged = session.upload(params.as_bytes())?;
            debug!(filter = %filter, params = staged.address(), "staged filter parameters");

            let result = match filter {
                Filter::Preset(_) => {
                    session
                        .guest()
                        .preset_filter(address, length, staged.address(), width, height)
                }
                _ => session.guest().color_matrix(address, length, staged.address()),
            };
            let released = session.release(staged);
            result.and(released)
        }
    }
}
