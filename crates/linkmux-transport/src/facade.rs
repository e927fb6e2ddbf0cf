use std::path::Path;
use std::time::Duration;

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::link::LinkParams;
use crate::locator::LocatorId;
use crate::registry::Registry;
use crate::serial::SerialParams;
use crate::udp::UdpParams;

/// Message transport addressed by locator id.
///
/// Owns a [`Registry`] and hands out fresh ids for each registered link.
/// Every method needs `&mut self`; share a `Transport` across threads only
/// behind a lock.
#[derive(Debug)]
pub struct Transport {
    registry: Registry,
    next_id: i32,
}

impl Transport {
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    pub fn with_config(config: TransportConfig) -> Self {
        Self {
            registry: Registry::new(config),
            next_id: 0,
        }
    }

    /// Register a serial device at the default baud rate.
    pub fn add_serial_locator(&mut self, device: impl AsRef<Path>) -> Result<LocatorId> {
        self.add_serial_locator_with(SerialParams::new(device))
    }

    pub fn add_serial_locator_with(&mut self, params: SerialParams) -> Result<LocatorId> {
        self.add_locator(LinkParams::Serial(params))
    }

    /// Register a UDP link receiving on `recv_port` and sending to
    /// `127.0.0.1:send_port` from an ephemeral port.
    pub fn add_udp_locator(&mut self, recv_port: u16, send_port: u16) -> Result<LocatorId> {
        self.add_udp_locator_with(UdpParams::new(recv_port, send_port))
    }

    pub fn add_udp_locator_with(&mut self, params: UdpParams) -> Result<LocatorId> {
        self.add_locator(LinkParams::Udp(params))
    }

    pub fn rm_locator(&mut self, id: LocatorId) -> Result<()> {
        self.registry.remove(id)
    }

    /// Send one message. Returns the payload length.
    pub fn send_data(&mut self, payload: &[u8], id: LocatorId) -> Result<usize> {
        self.registry.send(id, payload)
    }

    /// Receive at most one message into `dest`.
    ///
    /// `Ok(None)` means nothing complete arrived within the channel's poll
    /// timeout.
    pub fn receive_data(&mut self, dest: &mut [u8], id: LocatorId) -> Result<Option<usize>> {
        self.registry.receive(id, dest)
    }

    pub fn set_poll_timeout(&mut self, id: LocatorId, timeout: Duration) -> Result<()> {
        let channel = self
            .registry
            .resolve(id)
            .ok_or(TransportError::NotFound(id))?;
        channel.set_poll_timeout(timeout);
        Ok(())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    fn add_locator(&mut self, params: LinkParams) -> Result<LocatorId> {
        if self.registry.is_full() {
            return Err(TransportError::CapacityExceeded {
                capacity: self.registry.capacity(),
            });
        }
        let id = self.allocate_id();
        self.registry.create(id, params)
    }

    /// Next id not held by a live channel. Wraps to 0 before `i32::MAX`.
    fn allocate_id(&mut self) -> LocatorId {
        loop {
            let candidate = LocatorId::new(self.next_id);
            self.next_id = if self.next_id == i32::MAX - 1 {
                0
            } else {
                self.next_id + 1
            };
            if !self.registry.contains(candidate) {
                return candidate;
            }
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}
