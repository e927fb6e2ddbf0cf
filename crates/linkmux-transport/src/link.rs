use std::io;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::time::Duration;

use crate::error::Result;
use crate::serial::{SerialLink, SerialParams};
use crate::udp::{UdpLink, UdpParams};

/// Which backend a channel uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Serial,
    Udp,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Serial => "serial",
            ChannelKind::Udp => "udp",
        }
    }
}

/// Backend-specific configuration, kept by the channel so it can be
/// (re)opened lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkParams {
    Serial(SerialParams),
    Udp(UdpParams),
}

impl LinkParams {
    pub fn kind(&self) -> ChannelKind {
        match self {
            LinkParams::Serial(_) => ChannelKind::Serial,
            LinkParams::Udp(_) => ChannelKind::Udp,
        }
    }

    /// Checks that can be made before any OS handle exists.
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            LinkParams::Serial(params) => params.validate(),
            LinkParams::Udp(_) => Ok(()),
        }
    }
}

impl From<UdpParams> for LinkParams {
    fn from(params: UdpParams) -> Self {
        LinkParams::Udp(params)
    }
}

impl From<SerialParams> for LinkParams {
    fn from(params: SerialParams) -> Self {
        LinkParams::Serial(params)
    }
}

/// An open link: the OS handles behind one channel.
///
/// Both variants share one contract: non-blocking `recv` on the descriptor
/// returned by `raw_fd`, and `send` of a whole buffer.
#[derive(Debug)]
pub enum Link {
    Serial(SerialLink),
    Udp(UdpLink),
}

impl Link {
    pub fn open(params: &LinkParams) -> Result<Self> {
        match params {
            LinkParams::Serial(params) => SerialLink::open(params).map(Link::Serial),
            LinkParams::Udp(params) => UdpLink::open(params).map(Link::Udp),
        }
    }

    pub fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Link::Serial(link) => link.recv(buf),
            Link::Udp(link) => link.recv(buf),
        }
    }

    /// Send `buf`. `timeout` bounds how long a stream device may stall.
    pub fn send(&mut self, buf: &[u8], timeout: Duration) -> io::Result<usize> {
        match self {
            Link::Serial(link) => link.send(buf, timeout),
            Link::Udp(link) => link.send(buf),
        }
    }

    pub fn raw_fd(&self) -> RawFd {
        match self {
            Link::Serial(link) => link.raw_fd(),
            Link::Udp(link) => link.raw_fd(),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            Link::Serial(_) => ChannelKind::Serial,
            Link::Udp(_) => ChannelKind::Udp,
        }
    }

    /// Source address of the last datagram, for UDP links.
    pub fn last_peer(&self) -> Option<SocketAddr> {
        match self {
            Link::Serial(_) => None,
            Link::Udp(link) => link.last_peer(),
        }
    }
}
