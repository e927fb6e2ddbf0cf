//! Checksummed, length-prefixed message framing for linkmux.
//!
//! Every message travels as a 4-byte header followed by the payload:
//! - A 2-byte big-endian payload length
//! - A 2-byte big-endian CRC-16/CCITT-FALSE over the payload
//!
//! There is no sync byte. Reassembly runs over a fixed-capacity [`RxBuffer`]
//! and recovers from a misaligned stream by discarding one byte at a time
//! until a header/checksum pair validates.

pub mod buffer;
pub mod checksum;
pub mod codec;
pub mod error;

pub use buffer::RxBuffer;
pub use codec::{
    encode_frame, encode_header, extract_message, FrameHeader, HEADER_SIZE, MAX_PAYLOAD,
    WIRE_VERSION,
};
pub use error::{FrameError, Result};
