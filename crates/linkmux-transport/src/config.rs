use std::time::Duration;

/// Default number of concurrently registered locators.
pub const MAX_NUM_CHANNELS: usize = 8;

/// Default per-channel receive buffer size in bytes.
pub const RX_BUFFER_LENGTH: usize = 1024;

/// Default bound on the poll wait of a single receive call.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(20);

/// Remote address used by [`crate::Transport::add_udp_locator`].
pub const DEFAULT_REMOTE_ADDR: &str = "127.0.0.1";

/// Line speed used by [`crate::Transport::add_serial_locator`].
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Sizing and timing for a [`crate::Registry`].
///
/// Fixed for the lifetime of the registry; the table never grows.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Number of channel slots. Default: 8.
    pub max_channels: usize,
    /// Receive buffer bytes per channel. Default: 1024.
    pub rx_buffer_len: usize,
    /// Initial poll timeout for new channels. Default: 20 ms.
    pub poll_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_channels: MAX_NUM_CHANNELS,
            rx_buffer_len: RX_BUFFER_LENGTH,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}
