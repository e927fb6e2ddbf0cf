use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::os::fd::{AsRawFd, RawFd};

use tracing::{debug, info};

use crate::config::DEFAULT_REMOTE_ADDR;
use crate::error::{Result, TransportError};

/// Addressing for a UDP channel.
///
/// Two sockets are bound: one on `local_recv_port` that only receives, and
/// one on `local_send_port` (0 = ephemeral) that only sends to the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpParams {
    pub local_recv_port: u16,
    pub local_send_port: u16,
    pub remote_port: u16,
    /// Textual remote IP address. Required: a channel cannot send without it.
    pub remote_addr: String,
}

impl UdpParams {
    /// Receive on `recv_port`, send from an ephemeral port to
    /// `127.0.0.1:send_port`.
    pub fn new(recv_port: u16, send_port: u16) -> Self {
        Self {
            local_recv_port: recv_port,
            local_send_port: 0,
            remote_port: send_port,
            remote_addr: DEFAULT_REMOTE_ADDR.to_string(),
        }
    }

    pub fn with_remote(mut self, addr: impl Into<String>, port: u16) -> Self {
        self.remote_addr = addr.into();
        self.remote_port = port;
        self
    }

    pub fn with_local_send_port(mut self, port: u16) -> Self {
        self.local_send_port = port;
        self
    }

    /// Parse the remote address into a socket address.
    pub fn remote_socket_addr(&self) -> Result<SocketAddr> {
        let text = self.remote_addr.trim();
        if text.is_empty() {
            return Err(self.address_error("remote address is empty"));
        }
        let ip: IpAddr = text
            .parse()
            .map_err(|err: std::net::AddrParseError| self.address_error(err.to_string()))?;
        if ip.is_unspecified() {
            return Err(self.address_error("remote address must not be unspecified"));
        }
        Ok(SocketAddr::new(ip, self.remote_port))
    }

    fn address_error(&self, reason: impl Into<String>) -> TransportError {
        TransportError::AddressParse {
            address: self.remote_addr.clone(),
            reason: reason.into(),
        }
    }
}

/// An open UDP socket pair.
pub struct UdpLink {
    recv_socket: UdpSocket,
    send_socket: UdpSocket,
    remote: SocketAddr,
    last_peer: Option<SocketAddr>,
}

impl UdpLink {
    /// Resolve addresses and bind both sockets.
    ///
    /// Local sockets bind the unspecified address of the remote's family.
    pub fn open(params: &UdpParams) -> Result<Self> {
        let remote = params.remote_socket_addr()?;
        let any = match remote.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };

        let recv_addr = SocketAddr::new(any, params.local_recv_port);
        let recv_socket = UdpSocket::bind(recv_addr).map_err(|err| {
            TransportError::socket(format!("failed to bind receive socket on {recv_addr}"), err)
        })?;
        recv_socket
            .set_nonblocking(true)
            .map_err(|err| TransportError::socket("failed to set receive socket non-blocking", err))?;

        let send_addr = SocketAddr::new(any, params.local_send_port);
        let send_socket = UdpSocket::bind(send_addr).map_err(|err| {
            TransportError::socket(format!("failed to bind send socket on {send_addr}"), err)
        })?;

        info!(%recv_addr, %send_addr, %remote, "udp link opened");

        Ok(Self {
            recv_socket,
            send_socket,
            remote,
            last_peer: None,
        })
    }

    /// Receive one datagram (non-blocking).
    pub fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (n, peer) = self.recv_socket.recv_from(buf)?;
        self.last_peer = Some(peer);
        Ok(n)
    }

    /// Send `buf` as one datagram to the remote.
    pub fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.send_socket.send_to(buf, self.remote)
    }

    /// Descriptor watched by the poller.
    pub fn raw_fd(&self) -> RawFd {
        self.recv_socket.as_raw_fd()
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// Source of the most recently received datagram.
    pub fn last_peer(&self) -> Option<SocketAddr> {
        self.last_peer
    }

    pub fn local_recv_addr(&self) -> io::Result<SocketAddr> {
        self.recv_socket.local_addr()
    }

    pub fn local_send_addr(&self) -> io::Result<SocketAddr> {
        self.send_socket.local_addr()
    }
}

impl Drop for UdpLink {
    fn drop(&mut self) {
        debug!(remote = %self.remote, "closing udp sockets");
    }
}

impl std::fmt::Debug for UdpLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpLink")
            .field("recv", &self.recv_socket.local_addr().ok())
            .field("send", &self.send_socket.local_addr().ok())
            .field("remote", &self.remote)
            .finish()
    }
}
