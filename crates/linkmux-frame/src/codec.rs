use bytes::{BufMut, BytesMut};
use tracing::{debug, trace};

use crate::buffer::RxBuffer;
use crate::checksum;
use crate::error::{FrameError, Result};

/// Frame header: length (2) + checksum (2) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Version of the wire layout below. Not transmitted; both ends are built
/// against the same value.
pub const WIRE_VERSION: u8 = 1;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Number of payload bytes following the header.
    pub payload_len: u16,
    /// CRC-16/CCITT-FALSE over the payload.
    pub checksum: u16,
}

impl FrameHeader {
    /// Build the header describing `payload`.
    pub fn for_payload(payload: &[u8]) -> Result<Self> {
        let payload_len = u16::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        })?;
        Ok(Self {
            payload_len,
            checksum: checksum::compute(payload),
        })
    }

    /// Parse a header from the first [`HEADER_SIZE`] bytes of `src`.
    ///
    /// Returns `None` if `src` is shorter than a header.
    pub fn parse(src: &[u8]) -> Option<Self> {
        if src.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            payload_len: u16::from_be_bytes([src[0], src[1]]),
            checksum: u16::from_be_bytes([src[2], src[3]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let len = self.payload_len.to_be_bytes();
        let crc = self.checksum.to_be_bytes();
        [len[0], len[1], crc[0], crc[1]]
    }

    /// Header plus payload size on the wire.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload_len as usize
    }
}

/// Encode just the header for `payload`.
///
/// Used by links that write header and payload as two separate writes.
pub fn encode_header(payload: &[u8]) -> Result<[u8; HEADER_SIZE]> {
    Ok(FrameHeader::for_payload(payload)?.to_bytes())
}

/// Encode a frame into the wire format.
///
/// Wire format (version 1):
/// ```text
/// ┌──────────────┬──────────────┬─────────────────┐
/// │ Length       │ Checksum     │ Payload         │
/// │ (2B BE)      │ (2B BE)      │ (Length bytes)  │
/// └──────────────┴──────────────┴─────────────────┘
/// ```
///
/// The payload is written verbatim; there is no escaping.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let header = FrameHeader::for_payload(payload)?;
    dst.reserve(header.frame_len());
    dst.put_u16(header.payload_len);
    dst.put_u16(header.checksum);
    dst.put_slice(payload);
    Ok(())
}

/// Extract at most one complete, checksum-valid frame from `rx`.
///
/// Returns `Ok(Some(len))` after copying the payload into `dest[..len]` and
/// removing the frame from `rx`, or `Ok(None)` when more bytes are needed.
///
/// A candidate whose checksum does not match, or whose declared length could
/// never fit in `rx`, means the stream is misaligned: the leading byte is
/// dropped and the scan continues from the next offset. At most `rx.len()`
/// bytes are dropped per call, so this always terminates.
///
/// If a valid frame is larger than `dest`, `BufferTooSmall` is returned and
/// the frame stays buffered.
pub fn extract_message(dest: &mut [u8], rx: &mut RxBuffer) -> Result<Option<usize>> {
    let capacity = rx.capacity();
    let mut skip = 0usize;

    let outcome = loop {
        let window = &rx.filled()[skip..];
        let Some(header) = FrameHeader::parse(window) else {
            break Ok(None);
        };

        let frame_len = header.frame_len();
        if frame_len > capacity {
            trace!(offset = skip, declared = header.payload_len, "length exceeds buffer");
            skip += 1;
            continue;
        }
        if window.len() < frame_len {
            break Ok(None);
        }

        let payload = &window[HEADER_SIZE..frame_len];
        if checksum::compute(payload) != header.checksum {
            trace!(offset = skip, "checksum mismatch");
            skip += 1;
            continue;
        }

        let len = payload.len();
        if dest.len() < len {
            break Err(FrameError::BufferTooSmall {
                needed: len,
                available: dest.len(),
            });
        }
        dest[..len].copy_from_slice(payload);
        break Ok(Some((len, frame_len)));
    };

    if skip > 0 {
        debug!(discarded = skip, "resynchronized receive stream");
    }

    match outcome {
        Ok(Some((len, frame_len))) => {
            rx.consume(skip + frame_len);
            Ok(Some(len))
        }
        Ok(None) => {
            rx.consume(skip);
            Ok(None)
        }
        Err(err) => {
            rx.consume(skip);
            Err(err)
        }
    }
}
