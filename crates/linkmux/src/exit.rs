use std::fmt;
use std::io;

use linkmux_frame::FrameError;
use linkmux_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: &io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::AddrInUse | io::ErrorKind::NotFound => TRANSPORT_ERROR,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = transport_code(&err);
    CliError::new(code, format!("{context}: {err}"))
}

fn transport_code(err: &TransportError) -> i32 {
    match err {
        TransportError::Socket { source, .. } => io_error("", source).code,
        TransportError::ChannelUnavailable { source, .. } => transport_code(source),
        TransportError::BadParameters(_) | TransportError::AddressParse { .. } => USAGE,
        TransportError::Frame(FrameError::PayloadTooLarge { .. })
        | TransportError::Frame(FrameError::BufferTooSmall { .. })
        | TransportError::BufferFull(_) => DATA_INVALID,
        TransportError::ShortWrite { .. } => TRANSPORT_ERROR,
        TransportError::CapacityExceeded { .. }
        | TransportError::NotFound(_)
        | TransportError::AllocationFailure { .. } => INTERNAL,
    }
}
