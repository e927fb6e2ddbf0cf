use std::io::{self, ErrorKind};
use std::os::fd::RawFd;
use std::time::Duration;

use tracing::{trace, warn};

use crate::error::{Result, TransportError};
use crate::link::{ChannelKind, Link};

const READABLE: libc::c_short = libc::POLLIN | libc::POLLERR | libc::POLLHUP;

/// Poll descriptors for every slot of a [`crate::Registry`].
///
/// Entry `i` belongs to the channel in slot `i`. Unused entries hold
/// `fd = -1`, which `poll(2)` skips.
pub struct Poller {
    fds: Vec<libc::pollfd>,
}

impl Poller {
    pub fn new(slots: usize) -> Self {
        Self {
            fds: vec![empty_pollfd(); slots],
        }
    }

    /// Watch `fd` for input on behalf of `slot`.
    pub fn register(&mut self, slot: usize, fd: RawFd) {
        if let Some(entry) = self.fds.get_mut(slot) {
            *entry = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };
        }
    }

    pub fn clear(&mut self, slot: usize) {
        if let Some(entry) = self.fds.get_mut(slot) {
            *entry = empty_pollfd();
        }
    }

    pub fn is_registered(&self, slot: usize) -> bool {
        self.fds.get(slot).is_some_and(|entry| entry.fd >= 0)
    }

    /// Number of slots currently watched.
    pub fn active(&self) -> usize {
        self.fds.iter().filter(|entry| entry.fd >= 0).count()
    }

    pub fn slots(&self) -> usize {
        self.fds.len()
    }

    /// Wait up to `timeout` for any watched descriptor.
    ///
    /// Returns the number of ready descriptors; an interrupted wait reports 0.
    pub fn poll(&mut self, timeout: Duration) -> io::Result<usize> {
        for entry in &mut self.fds {
            entry.revents = 0;
        }
        let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

        // SAFETY: `fds` is a valid, exclusively borrowed array of `pollfd`
        // whose length is passed alongside it.
        let rc = unsafe {
            libc::poll(
                self.fds.as_mut_ptr(),
                self.fds.len() as libc::nfds_t,
                timeout_ms,
            )
        };

        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(err);
        }
        Ok(rc as usize)
    }

    /// Whether the last [`Poller::poll`] flagged `slot` as readable.
    pub fn is_readable(&self, slot: usize) -> bool {
        self.fds
            .get(slot)
            .is_some_and(|entry| entry.fd >= 0 && entry.revents & READABLE != 0)
    }

    fn revents(&self, slot: usize) -> libc::c_short {
        self.fds.get(slot).map_or(0, |entry| entry.revents)
    }

    /// Poll every watched descriptor, then issue at most one receive on
    /// `link` if `slot` became readable.
    ///
    /// Returns `Ok(0)` when nothing arrived within `timeout`. Would-block and
    /// timeout conditions are not errors; other OS failures are returned with
    /// their original `io::Error`. A zero-byte read from a serial device that
    /// reported `POLLHUP` is end of stream and returned as an error, since
    /// the descriptor would otherwise stay readable forever.
    pub fn read_ready(
        &mut self,
        slot: usize,
        timeout: Duration,
        link: &mut Link,
        dest: &mut [u8],
    ) -> Result<usize> {
        if dest.is_empty() {
            return Ok(0);
        }

        let ready = self
            .poll(timeout)
            .map_err(|err| TransportError::socket("poll failed", err))?;
        if ready == 0 || !self.is_readable(slot) {
            return Ok(0);
        }

        match link.recv(dest) {
            Ok(0) if hung_up(link.kind(), self.revents(slot)) => {
                warn!(slot, kind = link.kind().as_str(), "device hung up");
                Err(TransportError::socket(
                    "device hung up",
                    io::Error::from(ErrorKind::BrokenPipe),
                ))
            }
            Ok(n) => {
                trace!(slot, bytes = n, "raw read");
                Ok(n)
            }
            Err(err) if is_transient(&err) => Ok(0),
            Err(err) => {
                warn!(slot, kind = link.kind().as_str(), error = %err, "read failed");
                Err(TransportError::socket("receive failed", err))
            }
        }
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("slots", &self.fds.len())
            .field("active", &self.active())
            .finish()
    }
}

/// Wait up to `timeout` for `fd` to accept output.
pub(crate) fn wait_writable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    let mut entry = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

    // SAFETY: `entry` is a single valid `pollfd` on the stack.
    let rc = unsafe { libc::poll(&mut entry, 1, timeout_ms) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0 && entry.revents & libc::POLLOUT != 0)
}

/// Zero-length datagrams are legal on UDP, so only stream devices treat an
/// empty read after `POLLHUP` as a hang-up.
fn hung_up(kind: ChannelKind, revents: libc::c_short) -> bool {
    kind == ChannelKind::Serial && revents & libc::POLLHUP != 0
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

fn empty_pollfd() -> libc::pollfd {
    libc::pollfd {
        fd: -1,
        events: 0,
        revents: 0,
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;
    use std::os::fd::AsRawFd;
    use std::time::Instant;

    use super::*;
    use crate::udp::{UdpLink, UdpParams};

    #[test]
    fn test_register_and_clear() {
        let mut poller = Poller::new(4);
        assert_eq!(poller.slots(), 4);
        assert_eq!(poller.active(), 0);

        poller.register(2, 17);
        assert!(poller.is_registered(2));
        assert_eq!(poller.active(), 1);

        poller.clear(2);
        assert!(!poller.is_registered(2));
        assert_eq!(poller.active(), 0);
    }

    #[test]
    fn test_out_of_range_slot_is_ignored() {
        let mut poller = Poller::new(1);
        poller.register(5, 3);
        assert_eq!(poller.active(), 0);
        assert!(!poller.is_readable(5));
    }

    #[test]
    fn test_poll_times_out_without_data() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut poller = Poller::new(2);
        poller.register(0, socket.as_raw_fd());

        let start = Instant::now();
        let ready = poller.poll(Duration::from_millis(30)).unwrap();
        assert_eq!(ready, 0);
        assert!(!poller.is_readable(0));
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_poll_reports_readable_slot() {
        let quiet = UdpSocket::bind("127.0.0.1:0").unwrap();
        let busy = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(b"x", busy.local_addr().unwrap())
            .unwrap();

        let mut poller = Poller::new(3);
        poller.register(0, quiet.as_raw_fd());
        poller.register(2, busy.as_raw_fd());

        let ready = poller.poll(Duration::from_secs(2)).unwrap();
        assert_eq!(ready, 1);
        assert!(!poller.is_readable(0));
        assert!(poller.is_readable(2));
    }

    #[test]
    fn test_read_ready_returns_zero_when_idle() {
        let mut link = Link::Udp(UdpLink::open(&UdpParams::new(0, 9)).unwrap());
        let mut poller = Poller::new(1);
        poller.register(0, link.raw_fd());

        let mut buf = [0u8; 16];
        let start = Instant::now();
        let n = poller
            .read_ready(0, Duration::from_millis(20), &mut link, &mut buf)
            .unwrap();
        assert_eq!(n, 0);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_read_ready_reads_one_datagram() {
        let mut link = Link::Udp(UdpLink::open(&UdpParams::new(0, 9)).unwrap());
        let port = match &link {
            Link::Udp(udp) => udp.local_recv_addr().unwrap().port(),
            Link::Serial(_) => unreachable!(),
        };
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"first", ("127.0.0.1", port)).unwrap();
        sender.send_to(b"second", ("127.0.0.1", port)).unwrap();

        let mut poller = Poller::new(1);
        poller.register(0, link.raw_fd());

        let mut buf = [0u8; 16];
        let n = poller
            .read_ready(0, Duration::from_secs(2), &mut link, &mut buf)
            .unwrap();
        assert_eq!(&buf[..n], b"first");
    }

    #[test]
    fn test_hang_up_only_ends_stream_links() {
        assert!(hung_up(ChannelKind::Serial, libc::POLLHUP));
        assert!(hung_up(ChannelKind::Serial, libc::POLLIN | libc::POLLHUP));
        assert!(!hung_up(ChannelKind::Serial, libc::POLLIN));
        assert!(!hung_up(ChannelKind::Udp, libc::POLLIN | libc::POLLHUP));
    }

    #[test]
    fn test_wait_writable_on_fresh_socket() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        assert!(wait_writable(socket.as_raw_fd(), Duration::from_millis(50)).unwrap());
    }
}
