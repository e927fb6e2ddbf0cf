//! Locator-addressed message transport over UDP and serial links.
//!
//! Callers register a link and get back a [`LocatorId`]; from then on they
//! send and receive whole messages by id. Underneath:
//! - [`Registry`] owns a fixed-capacity table of [`Channel`]s
//! - [`Poller`] keeps one `pollfd` per table slot so a single thread can
//!   service every open channel with a bounded wait
//! - each channel reassembles frames from its own bounded receive buffer
//!   using `linkmux-frame`
//!
//! [`Transport`] is the facade that ties these together. Everything is
//! synchronous and single-threaded; the only place a call can wait is the
//! poll, and that wait is capped by the channel's poll timeout.

#[cfg(not(unix))]
compile_error!("linkmux-transport requires a Unix target (poll(2), termios)");

pub mod channel;
pub mod config;
pub mod error;
pub mod facade;
pub mod link;
pub mod locator;
pub mod poller;
pub mod registry;
pub mod serial;
pub mod udp;

pub use channel::Channel;
pub use config::{
    TransportConfig, DEFAULT_BAUD_RATE, DEFAULT_POLL_TIMEOUT, DEFAULT_REMOTE_ADDR,
    MAX_NUM_CHANNELS, RX_BUFFER_LENGTH,
};
pub use error::{Result, TransportError};
pub use facade::Transport;
pub use link::{ChannelKind, Link, LinkParams};
pub use locator::LocatorId;
pub use poller::Poller;
pub use registry::Registry;
pub use serial::{SerialLink, SerialParams};
pub use udp::{UdpLink, UdpParams};
