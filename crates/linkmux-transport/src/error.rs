use linkmux_frame::FrameError;

use crate::locator::LocatorId;

/// Errors that can occur in locator and channel operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Invalid input (negative or duplicate locator id, empty device path, ...).
    #[error("bad parameters: {0}")]
    BadParameters(String),

    /// Every slot in the locator table is taken.
    #[error("locator table full ({capacity} channels)")]
    CapacityExceeded { capacity: usize },

    /// No live channel has this locator id.
    #[error("locator {0} not found")]
    NotFound(LocatorId),

    /// The remote address could not be resolved.
    #[error("invalid remote address {address:?}: {reason}")]
    AddressParse { address: String, reason: String },

    /// An OS call on a socket or device failed.
    #[error("{context}: {source}")]
    Socket {
        context: String,
        source: std::io::Error,
    },

    /// A datagram or device write transmitted fewer bytes than requested.
    #[error("short write ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },

    /// The receive buffer is saturated and holds no valid frame.
    #[error("receive buffer full on locator {0}")]
    BufferFull(LocatorId),

    /// Frame encoding or extraction failed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Opening the channel on first use failed.
    #[error("channel for locator {locator} unavailable: {source}")]
    ChannelUnavailable {
        locator: LocatorId,
        source: Box<TransportError>,
    },

    /// The channel's receive buffer could not be allocated.
    #[error("failed to allocate {requested}-byte receive buffer")]
    AllocationFailure { requested: usize },
}

impl TransportError {
    pub(crate) fn socket(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Socket {
            context: context.into(),
            source,
        }
    }

    /// Negative status code used at the C boundary.
    pub fn code(&self) -> i32 {
        match self {
            Self::BadParameters(_) => -1,
            Self::CapacityExceeded { .. } => -2,
            Self::NotFound(_) => -3,
            Self::AddressParse { .. } => -4,
            Self::Socket { .. } | Self::ShortWrite { .. } => -5,
            Self::BufferFull(_) => -6,
            Self::Frame(FrameError::BufferTooSmall { .. }) => -7,
            Self::ChannelUnavailable { .. } => -8,
            Self::AllocationFailure { .. } => -9,
            Self::Frame(FrameError::PayloadTooLarge { .. }) => -10,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
