use std::ffi::CStr;
use std::os::raw::c_char;

use linkmux_transport::LocatorId;

use crate::error;

/// Convert a required C string argument into UTF-8 `&str`.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn required_str_arg<'a>(value: *const c_char, name: &str) -> Option<&'a str> {
    if value.is_null() {
        let _ = error::set_bad_parameters(format!("{name} cannot be null"));
        return None;
    }

    let as_cstr = {
        // SAFETY: The caller guarantees `value` points to a valid NUL-terminated C string.
        unsafe { CStr::from_ptr(value) }
    };

    match as_cstr.to_str() {
        Ok(v) => Some(v),
        Err(_) => {
            let _ = error::set_bad_parameters(format!("{name} must be valid UTF-8"));
            None
        }
    }
}

/// Convert an optional byte pointer + length into a slice.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and readable for `len` bytes.
pub(crate) unsafe fn bytes_arg<'a>(data: *const u8, len: usize, name: &str) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        let _ = error::set_bad_parameters(format!("{name} cannot be null when len > 0"));
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Convert a writable byte pointer + capacity into a mutable slice.
///
/// # Safety
/// If `cap > 0`, `data` must be non-null and writable for `cap` bytes.
pub(crate) unsafe fn bytes_out_arg<'a>(
    data: *mut u8,
    cap: usize,
    name: &str,
) -> Option<&'a mut [u8]> {
    if cap == 0 {
        return Some(&mut []);
    }
    if data.is_null() {
        let _ = error::set_bad_parameters(format!("{name} cannot be null when cap > 0"));
        return None;
    }

    // SAFETY: Pointer and capacity are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts_mut(data, cap) })
}

pub(crate) fn locator_arg(id: i32) -> Option<LocatorId> {
    let locator = LocatorId::new(id);
    if locator.is_valid() {
        Some(locator)
    } else {
        let _ = error::set_bad_parameters(format!("locator id {id} is negative"));
        None
    }
}
