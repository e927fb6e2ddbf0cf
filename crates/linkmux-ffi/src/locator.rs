use std::os::raw::c_char;
use std::time::Duration;

use linkmux_transport::Transport;

use crate::args;
use crate::error;
use crate::types::{LmxResult, LmxTransportHandle, TransportHandle};

fn with_transport_mut(handle: LmxTransportHandle, f: impl FnOnce(&mut Transport) -> i32) -> i32 {
    if handle.is_null() {
        return error::set_bad_parameters("transport handle cannot be null");
    }

    let transport_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut TransportHandle) }
    };

    f(&mut transport_handle.transport)
}

fn count_to_code(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// Create an empty transport. Free it with `lmx_transport_free`.
#[no_mangle]
pub extern "C" fn lmx_transport_new() -> LmxTransportHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();
        let handle = TransportHandle {
            transport: Transport::new(),
        };
        Box::into_raw(Box::new(handle)) as LmxTransportHandle
    })
}

/// Free a transport handle, closing every channel it owns.
///
/// # Safety
/// `handle` must be null or a handle returned by `lmx_transport_new`.
#[no_mangle]
pub unsafe extern "C" fn lmx_transport_free(handle: LmxTransportHandle) {
    crate::ffi_boundary((), || {
        if handle.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by lmx_transport_new.
        unsafe {
            drop(Box::from_raw(handle as *mut TransportHandle));
        }
    });
}

/// Register a serial device. Returns the locator id or a negative code.
///
/// # Safety
/// `handle` must be a valid transport handle. `device` must be a non-null pointer to a valid
/// UTF-8, NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn lmx_add_serial_locator(
    handle: LmxTransportHandle,
    device: *const c_char,
) -> i32 {
    crate::ffi_boundary(LmxResult::Internal.code(), || {
        error::clear_error_state();

        let device = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(device, "device") } {
                Some(v) => v,
                None => return LmxResult::BadParameters.code(),
            }
        };

        with_transport_mut(handle, |transport| {
            match transport.add_serial_locator(device) {
                Ok(id) => id.get(),
                Err(err) => error::map_transport_error(&err),
            }
        })
    })
}

/// Register a UDP link receiving on `recv_port` and sending to
/// `127.0.0.1:send_port`. Returns the locator id or a negative code.
///
/// # Safety
/// `handle` must be a valid transport handle.
#[no_mangle]
pub unsafe extern "C" fn lmx_add_udp_locator(
    handle: LmxTransportHandle,
    recv_port: u16,
    send_port: u16,
) -> i32 {
    crate::ffi_boundary(LmxResult::Internal.code(), || {
        error::clear_error_state();

        with_transport_mut(handle, |transport| {
            match transport.add_udp_locator(recv_port, send_port) {
                Ok(id) => id.get(),
                Err(err) => error::map_transport_error(&err),
            }
        })
    })
}

/// Close and forget a locator.
///
/// # Safety
/// `handle` must be a valid transport handle.
#[no_mangle]
pub unsafe extern "C" fn lmx_rm_locator(handle: LmxTransportHandle, id: i32) -> i32 {
    crate::ffi_boundary(LmxResult::Internal.code(), || {
        error::clear_error_state();

        let Some(locator) = args::locator_arg(id) else {
            return LmxResult::BadParameters.code();
        };

        with_transport_mut(handle, |transport| match transport.rm_locator(locator) {
            Ok(()) => LmxResult::Ok.code(),
            Err(err) => error::map_transport_error(&err),
        })
    })
}

/// Send one message. Returns the payload length or a negative code.
///
/// # Safety
/// `handle` must be a valid transport handle. If `len > 0`, `data` must be non-null and
/// readable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn lmx_send_data(
    handle: LmxTransportHandle,
    data: *const u8,
    len: usize,
    id: i32,
) -> i32 {
    crate::ffi_boundary(LmxResult::Internal.code(), || {
        error::clear_error_state();

        let payload = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::bytes_arg(data, len, "data") } {
                Some(v) => v,
                None => return LmxResult::BadParameters.code(),
            }
        };
        let Some(locator) = args::locator_arg(id) else {
            return LmxResult::BadParameters.code();
        };

        with_transport_mut(handle, |transport| {
            match transport.send_data(payload, locator) {
                Ok(sent) => count_to_code(sent),
                Err(err) => error::map_transport_error(&err),
            }
        })
    })
}

/// Receive at most one message into `buf`.
///
/// Returns the message length, 0 when nothing complete arrived within the
/// channel's poll timeout, or a negative code. An empty message is also
/// reported as 0.
///
/// # Safety
/// `handle` must be a valid transport handle. If `cap > 0`, `buf` must be non-null and
/// writable for `cap` bytes.
#[no_mangle]
pub unsafe extern "C" fn lmx_receive_data(
    handle: LmxTransportHandle,
    buf: *mut u8,
    cap: usize,
    id: i32,
) -> i32 {
    crate::ffi_boundary(LmxResult::Internal.code(), || {
        error::clear_error_state();

        let dest = {
            // SAFETY: We validate pointer/capacity pairing in helper.
            match unsafe { args::bytes_out_arg(buf, cap, "buf") } {
                Some(v) => v,
                None => return LmxResult::BadParameters.code(),
            }
        };
        let Some(locator) = args::locator_arg(id) else {
            return LmxResult::BadParameters.code();
        };

        with_transport_mut(handle, |transport| {
            match transport.receive_data(dest, locator) {
                Ok(Some(len)) => count_to_code(len),
                Ok(None) => 0,
                Err(err) => error::map_transport_error(&err),
            }
        })
    })
}

/// Override how long a receive on `id` may wait, in milliseconds.
///
/// # Safety
/// `handle` must be a valid transport handle.
#[no_mangle]
pub unsafe extern "C" fn lmx_set_poll_timeout(
    handle: LmxTransportHandle,
    id: i32,
    timeout_ms: u32,
) -> i32 {
    crate::ffi_boundary(LmxResult::Internal.code(), || {
        error::clear_error_state();

        let Some(locator) = args::locator_arg(id) else {
            return LmxResult::BadParameters.code();
        };

        with_transport_mut(handle, |transport| {
            let timeout = Duration::from_millis(u64::from(timeout_ms));
            match transport.set_poll_timeout(locator, timeout) {
                Ok(()) => LmxResult::Ok.code(),
                Err(err) => error::map_transport_error(&err),
            }
        })
    })
}
