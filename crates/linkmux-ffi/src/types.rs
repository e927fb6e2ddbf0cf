use std::ffi::c_void;

use linkmux_transport::Transport;

/// Status codes returned across the C boundary.
///
/// Success is zero (or a non-negative count/id, depending on the call);
/// failures are negative.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LmxResult {
    Ok = 0,
    BadParameters = -1,
    CapacityExceeded = -2,
    NotFound = -3,
    AddressParse = -4,
    Socket = -5,
    BufferFull = -6,
    BufferTooSmall = -7,
    ChannelUnavailable = -8,
    AllocationFailure = -9,
    PayloadTooLarge = -10,
    Internal = -99,
}

impl LmxResult {
    pub const fn code(self) -> i32 {
        self as i32
    }
}

#[allow(dead_code)]
pub const LMX_OK: i32 = LmxResult::Ok.code();
#[allow(dead_code)]
pub const LMX_ERR_BAD_PARAMETERS: i32 = LmxResult::BadParameters.code();
#[allow(dead_code)]
pub const LMX_ERR_CAPACITY_EXCEEDED: i32 = LmxResult::CapacityExceeded.code();
#[allow(dead_code)]
pub const LMX_ERR_NOT_FOUND: i32 = LmxResult::NotFound.code();
#[allow(dead_code)]
pub const LMX_ERR_ADDRESS_PARSE: i32 = LmxResult::AddressParse.code();
#[allow(dead_code)]
pub const LMX_ERR_SOCKET: i32 = LmxResult::Socket.code();
#[allow(dead_code)]
pub const LMX_ERR_BUFFER_FULL: i32 = LmxResult::BufferFull.code();
#[allow(dead_code)]
pub const LMX_ERR_BUFFER_TOO_SMALL: i32 = LmxResult::BufferTooSmall.code();
#[allow(dead_code)]
pub const LMX_ERR_CHANNEL_UNAVAILABLE: i32 = LmxResult::ChannelUnavailable.code();
#[allow(dead_code)]
pub const LMX_ERR_ALLOCATION_FAILURE: i32 = LmxResult::AllocationFailure.code();
#[allow(dead_code)]
pub const LMX_ERR_PAYLOAD_TOO_LARGE: i32 = LmxResult::PayloadTooLarge.code();
#[allow(dead_code)]
pub const LMX_ERR_INTERNAL: i32 = LmxResult::Internal.code();

pub type LmxTransportHandle = *mut c_void;

pub(crate) struct TransportHandle {
    pub(crate) transport: Transport,
}
