//! linkmux-ffi: C-ABI exports for the linkmux transport.
//!
//! Every entry point returns an `int32_t`: a locator id, a byte count, or
//! zero on success, and one of the negative `LMX_ERR_*` codes on failure.
//! The message for the most recent failure on the calling thread is
//! available from `lmx_last_error`.

mod args;
mod error;
mod locator;
mod types;

use std::panic::AssertUnwindSafe;

pub use locator::{
    lmx_add_serial_locator, lmx_add_udp_locator, lmx_receive_data, lmx_rm_locator,
    lmx_send_data, lmx_set_poll_timeout, lmx_transport_free, lmx_transport_new,
};
pub use types::{
    LmxResult, LmxTransportHandle, LMX_ERR_ADDRESS_PARSE, LMX_ERR_ALLOCATION_FAILURE,
    LMX_ERR_BAD_PARAMETERS, LMX_ERR_BUFFER_FULL, LMX_ERR_BUFFER_TOO_SMALL,
    LMX_ERR_CAPACITY_EXCEEDED, LMX_ERR_CHANNEL_UNAVAILABLE, LMX_ERR_INTERNAL, LMX_ERR_NOT_FOUND,
    LMX_ERR_PAYLOAD_TOO_LARGE, LMX_ERR_SOCKET, LMX_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

#[no_mangle]
pub extern "C" fn lmx_init() -> i32 {
    ffi_boundary(LmxResult::Internal.code(), || {
        error::clear_error_state();
        LmxResult::Ok.code()
    })
}

#[no_mangle]
pub extern "C" fn lmx_cleanup() {
    ffi_boundary((), || {
        error::clear_error_state();
    });
}

#[no_mangle]
pub extern "C" fn lmx_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
