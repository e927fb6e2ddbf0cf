use std::net::SocketAddr;
use std::time::Duration;

use linkmux_frame::{encode_header, extract_message, FrameError, RxBuffer, HEADER_SIZE};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::link::{ChannelKind, Link, LinkParams};
use crate::locator::LocatorId;
use crate::poller::Poller;

/// Live state behind one locator.
///
/// A channel starts closed and opens its OS handles on first use. The
/// receive buffer is the only state carried between receive calls.
#[derive(Debug)]
pub struct Channel {
    locator_id: LocatorId,
    slot_index: usize,
    params: LinkParams,
    link: Option<Link>,
    poll_timeout: Duration,
    rx: RxBuffer,
}

impl Channel {
    pub(crate) fn new(
        locator_id: LocatorId,
        slot_index: usize,
        params: LinkParams,
        poll_timeout: Duration,
        rx: RxBuffer,
    ) -> Self {
        Self {
            locator_id,
            slot_index,
            params,
            link: None,
            poll_timeout,
            rx,
        }
    }

    pub fn locator_id(&self) -> LocatorId {
        self.locator_id
    }

    /// Position in the registry table (and the poller).
    pub fn slot_index(&self) -> usize {
        self.slot_index
    }

    pub fn kind(&self) -> ChannelKind {
        self.params.kind()
    }

    pub fn params(&self) -> &LinkParams {
        &self.params
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    pub fn set_poll_timeout(&mut self, timeout: Duration) {
        self.poll_timeout = timeout;
    }

    /// Bytes waiting in the receive buffer.
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    pub fn rx_capacity(&self) -> usize {
        self.rx.capacity()
    }

    /// Largest payload a peer with the same buffer size can reassemble.
    pub fn max_payload(&self) -> usize {
        self.rx.capacity().saturating_sub(HEADER_SIZE)
    }

    /// Source of the last datagram received (UDP only).
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.link.as_ref().and_then(Link::last_peer)
    }

    /// Open the OS handles and start watching the receive descriptor.
    ///
    /// No-op if already open. On failure the channel stays closed.
    pub(crate) fn open(&mut self, poller: &mut Poller) -> Result<()> {
        if self.link.is_some() {
            return Ok(());
        }
        let link = Link::open(&self.params)?;
        poller.register(self.slot_index, link.raw_fd());
        info!(
            locator = %self.locator_id,
            kind = self.kind().as_str(),
            slot = self.slot_index,
            "channel opened"
        );
        self.link = Some(link);
        Ok(())
    }

    /// Release the OS handles and stop watching. Idempotent.
    pub(crate) fn close(&mut self, poller: &mut Poller) {
        poller.clear(self.slot_index);
        if self.link.take().is_some() {
            info!(locator = %self.locator_id, "channel closed");
        }
    }

    fn ensure_open(&mut self, poller: &mut Poller) -> Result<()> {
        if self.link.is_some() {
            return Ok(());
        }
        self.open(poller)
            .map_err(|err| TransportError::ChannelUnavailable {
                locator: self.locator_id,
                source: Box::new(err),
            })
    }

    /// One bounded poll plus at most one raw receive into `dest`.
    ///
    /// Opens the channel on first use. `Ok(0)` means nothing arrived.
    pub(crate) fn read_raw(&mut self, poller: &mut Poller, dest: &mut [u8]) -> Result<usize> {
        let slot = self.slot_index;
        let timeout = self.poll_timeout;
        let locator = self.locator_id;
        self.ensure_open(poller)?;
        let link = self.link.as_mut().ok_or_else(|| not_open(locator))?;
        let result = poller.read_ready(slot, timeout, link, dest);
        if result.is_err() {
            self.close(poller);
        }
        result
    }

    /// Write `bytes` in one raw write. Anything less than the full length is
    /// a failure: a partial datagram cannot be resumed.
    pub(crate) fn write_raw(&mut self, poller: &mut Poller, bytes: &[u8]) -> Result<usize> {
        let timeout = self.poll_timeout;
        let locator = self.locator_id;
        self.ensure_open(poller)?;
        let link = self.link.as_mut().ok_or_else(|| not_open(locator))?;
        let written = link
            .send(bytes, timeout)
            .map_err(|err| TransportError::socket("send failed", err))?;
        if written != bytes.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: bytes.len(),
            });
        }
        Ok(written)
    }

    /// Frame `payload` and send it as a header write followed by a payload
    /// write. Returns the payload length.
    ///
    /// Payloads longer than [`Channel::max_payload`] are refused: the frame
    /// would not fit a peer's receive buffer and could never be reassembled.
    pub(crate) fn send_frame(&mut self, poller: &mut Poller, payload: &[u8]) -> Result<usize> {
        let max = self.max_payload();
        if payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max,
            }
            .into());
        }
        let header = encode_header(payload)?;
        self.write_raw(poller, &header)?;
        if !payload.is_empty() {
            self.write_raw(poller, payload)?;
        }
        debug!(locator = %self.locator_id, bytes = payload.len(), "frame sent");
        Ok(payload.len())
    }

    /// Try to produce one message into `dest`.
    ///
    /// A frame already buffered is returned without touching the link.
    /// Otherwise one raw read is appended to the buffer and extraction is
    /// retried. `Ok(None)` means no complete message yet.
    pub(crate) fn receive_frame(
        &mut self,
        poller: &mut Poller,
        dest: &mut [u8],
    ) -> Result<Option<usize>> {
        if let Some(len) = extract_message(dest, &mut self.rx)? {
            return Ok(Some(len));
        }
        if self.rx.is_full() {
            return Err(TransportError::BufferFull(self.locator_id));
        }

        let slot = self.slot_index;
        let timeout = self.poll_timeout;
        let locator = self.locator_id;
        self.ensure_open(poller)?;
        let link = self.link.as_mut().ok_or_else(|| not_open(locator))?;
        let n = match poller.read_ready(slot, timeout, link, self.rx.spare_mut()) {
            Ok(n) => n,
            Err(err) => {
                // Drop the handles so a dead descriptor stops waking the
                // poll; the next call reopens.
                self.close(poller);
                return Err(err);
            }
        };
        if n == 0 {
            return Ok(None);
        }
        self.rx.commit(n);

        let extracted = extract_message(dest, &mut self.rx)?;
        if let Some(len) = extracted {
            debug!(locator = %self.locator_id, bytes = len, "frame received");
        }
        Ok(extracted)
    }
}

fn not_open(locator: LocatorId) -> TransportError {
    TransportError::ChannelUnavailable {
        locator,
        source: Box::new(TransportError::BadParameters(
            "channel has no open link".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;
    use std::time::Instant;

    use super::*;
    use crate::udp::UdpParams;

    fn udp_channel(slot: usize, params: UdpParams) -> Channel {
        Channel::new(
            LocatorId::new(slot as i32),
            slot,
            LinkParams::Udp(params),
            Duration::from_millis(20),
            RxBuffer::new(256),
        )
    }

    fn recv_port(channel: &Channel) -> u16 {
        match channel.link.as_ref() {
            Some(Link::Udp(link)) => link.local_recv_addr().unwrap().port(),
            _ => panic!("expected an open udp link"),
        }
    }

    #[test]
    fn test_read_opens_lazily_and_close_is_idempotent() {
        let mut poller = Poller::new(2);
        let mut channel = udp_channel(1, UdpParams::new(0, 9));
        assert!(!channel.is_open());

        let mut buf = [0u8; 16];
        assert_eq!(channel.read_raw(&mut poller, &mut buf).unwrap(), 0);
        assert!(channel.is_open());
        assert!(poller.is_registered(1));

        channel.close(&mut poller);
        assert!(!channel.is_open());
        assert!(!poller.is_registered(1));
        channel.close(&mut poller);
        assert!(!channel.is_open());
    }

    #[test]
    fn test_bad_remote_reports_channel_unavailable() {
        let mut poller = Poller::new(1);
        let mut channel = udp_channel(0, UdpParams::new(0, 9).with_remote("", 9));

        let err = channel.send_frame(&mut poller, b"x").unwrap_err();
        match err {
            TransportError::ChannelUnavailable { locator, source } => {
                assert_eq!(locator, LocatorId::new(0));
                assert!(matches!(*source, TransportError::AddressParse { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!channel.is_open());
        assert!(!poller.is_registered(0));
    }

    #[test]
    fn test_send_frame_writes_header_then_payload() {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let port = peer.local_addr().unwrap().port();

        let mut poller = Poller::new(1);
        let mut channel = udp_channel(0, UdpParams::new(0, port));
        assert_eq!(channel.send_frame(&mut poller, b"abc").unwrap(), 3);

        let mut buf = [0u8; 16];
        let n = peer.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], &encode_header(b"abc").unwrap());
        let n = peer.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"abc");
    }

    #[test]
    fn test_receive_reassembles_split_datagrams() {
        let mut poller = Poller::new(1);
        let mut channel = udp_channel(0, UdpParams::new(0, 9));
        channel.open(&mut poller).unwrap();
        let port = recv_port(&channel);

        let header = encode_header(b"split").unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(&header[..HEADER_SIZE], ("127.0.0.1", port)).unwrap();
        sender.send_to(b"split", ("127.0.0.1", port)).unwrap();

        let mut out = [0u8; 32];
        let deadline = Instant::now() + Duration::from_secs(2);
        let len = loop {
            if let Some(len) = channel.receive_frame(&mut poller, &mut out).unwrap() {
                break len;
            }
            assert!(Instant::now() < deadline, "frame never reassembled");
        };
        assert_eq!(&out[..len], b"split");
        assert_eq!(channel.buffered(), 0);
    }

    #[test]
    fn test_buffered_frames_are_drained_without_reading() {
        let mut poller = Poller::new(1);
        let mut channel = udp_channel(0, UdpParams::new(0, 9));

        let mut wire = encode_header(b"one").unwrap().to_vec();
        wire.extend_from_slice(b"one");
        wire.extend_from_slice(&encode_header(b"two").unwrap());
        wire.extend_from_slice(b"two");
        channel.rx.extend_from_slice(&wire);

        let mut out = [0u8; 8];
        assert_eq!(channel.receive_frame(&mut poller, &mut out).unwrap(), Some(3));
        assert_eq!(&out[..3], b"one");
        assert_eq!(channel.receive_frame(&mut poller, &mut out).unwrap(), Some(3));
        assert_eq!(&out[..3], b"two");
        assert!(!channel.is_open(), "buffered frames must not trigger a read");
    }

    #[test]
    fn test_payload_larger_than_peer_buffer_is_refused() {
        let mut poller = Poller::new(1);
        let mut channel = udp_channel(0, UdpParams::new(0, 9));
        assert_eq!(channel.max_payload(), 256 - HEADER_SIZE);

        let err = channel
            .send_frame(&mut poller, &[0u8; 256 - HEADER_SIZE + 1])
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Frame(FrameError::PayloadTooLarge { size: 253, max: 252 })
        ));
        assert_eq!(err.code(), -10);
        assert!(!channel.is_open(), "refused before touching the link");

        assert_eq!(
            channel
                .send_frame(&mut poller, &[0u8; 256 - HEADER_SIZE])
                .unwrap(),
            252
        );
    }

    #[test]
    fn test_poll_timeout_override() {
        let mut channel = udp_channel(0, UdpParams::new(0, 9));
        channel.set_poll_timeout(Duration::from_millis(5));
        assert_eq!(channel.poll_timeout(), Duration::from_millis(5));
        assert_eq!(channel.kind(), ChannelKind::Udp);
        assert_eq!(channel.rx_capacity(), 256);
    }
}
