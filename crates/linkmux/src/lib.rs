//! Framed messaging over UDP and serial links, addressed by locator.
//!
//! Register a link, get back a locator id, then send and receive whole
//! messages by id. Frames carry a length and a CRC-16 so a receiver can
//! reassemble them from a fragmented or noisy byte stream.
//!
//! # Crate Structure
//!
//! - [`transport`]: locator registry, UDP/serial channels, and the
//!   [`transport::Transport`] facade
//! - [`frame`]: wire header, checksum, and frame reassembly
//!
//! ```no_run
//! use linkmux::transport::Transport;
//!
//! let mut transport = Transport::new();
//! let id = transport.add_udp_locator(7400, 7401)?;
//! transport.send_data(b"hello", id)?;
//!
//! let mut buf = [0u8; 1024];
//! if let Some(len) = transport.receive_data(&mut buf, id)? {
//!     println!("got {len} bytes");
//! }
//! # Ok::<(), linkmux::transport::TransportError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use linkmux_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use linkmux_frame::*;
}
