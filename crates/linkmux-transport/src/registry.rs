use linkmux_frame::RxBuffer;
use tracing::info;

use crate::channel::Channel;
use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::link::LinkParams;
use crate::locator::LocatorId;
use crate::poller::Poller;

/// Fixed-capacity table mapping locator ids to channels.
///
/// The registry owns every channel it creates. Lookups hand out borrows tied
/// to `&mut self`, so no channel reference can outlive a [`Registry::remove`].
#[derive(Debug)]
pub struct Registry {
    slots: Vec<Option<Channel>>,
    poller: Poller,
    live: usize,
    config: TransportConfig,
}

impl Registry {
    pub fn new(config: TransportConfig) -> Self {
        let mut slots = Vec::with_capacity(config.max_channels);
        slots.resize_with(config.max_channels, || None);
        Self {
            slots,
            poller: Poller::new(config.max_channels),
            live: 0,
            config,
        }
    }

    /// Register a channel under `id` in the first free slot.
    ///
    /// The channel is created closed; no OS handle is opened until first use.
    pub fn create(&mut self, id: LocatorId, params: LinkParams) -> Result<LocatorId> {
        if !id.is_valid() {
            return Err(TransportError::BadParameters(format!(
                "locator id {id} is negative"
            )));
        }
        if self.contains(id) {
            return Err(TransportError::BadParameters(format!(
                "locator id {id} is already registered"
            )));
        }
        params.validate()?;

        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(TransportError::CapacityExceeded {
                capacity: self.slots.len(),
            })?;

        let rx = RxBuffer::try_new(self.config.rx_buffer_len).map_err(|_| {
            TransportError::AllocationFailure {
                requested: self.config.rx_buffer_len,
            }
        })?;

        let kind = params.kind();
        self.slots[slot] = Some(Channel::new(
            id,
            slot,
            params,
            self.config.poll_timeout,
            rx,
        ));
        self.live += 1;

        info!(locator = %id, kind = kind.as_str(), slot, "locator created");
        Ok(id)
    }

    /// Close (if open) and drop the channel registered under `id`.
    pub fn remove(&mut self, id: LocatorId) -> Result<()> {
        let slot = self.slot_of(id).ok_or(TransportError::NotFound(id))?;
        if let Some(mut channel) = self.slots[slot].take() {
            channel.close(&mut self.poller);
        }
        self.live -= 1;
        info!(locator = %id, slot, "locator removed");
        Ok(())
    }

    pub fn resolve(&mut self, id: LocatorId) -> Option<&mut Channel> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|channel| channel.locator_id() == id)
    }

    pub fn get(&self, id: LocatorId) -> Option<&Channel> {
        self.slots
            .iter()
            .flatten()
            .find(|channel| channel.locator_id() == id)
    }

    pub fn contains(&self, id: LocatorId) -> bool {
        self.get(id).is_some()
    }

    /// Live locators in slot order.
    pub fn ids(&self) -> impl Iterator<Item = LocatorId> + '_ {
        self.slots.iter().flatten().map(Channel::locator_id)
    }

    /// Number of live channels.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn is_full(&self) -> bool {
        self.live == self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Frame and send `payload` on `id`, opening the channel if needed.
    pub fn send(&mut self, id: LocatorId, payload: &[u8]) -> Result<usize> {
        let (channel, poller) = self.parts(id)?;
        channel.send_frame(poller, payload)
    }

    /// Produce at most one message from `id` into `dest`.
    pub fn receive(&mut self, id: LocatorId, dest: &mut [u8]) -> Result<Option<usize>> {
        let (channel, poller) = self.parts(id)?;
        channel.receive_frame(poller, dest)
    }

    /// One bounded poll and raw read on `id`, bypassing framing.
    pub fn read_raw(&mut self, id: LocatorId, dest: &mut [u8]) -> Result<usize> {
        let (channel, poller) = self.parts(id)?;
        channel.read_raw(poller, dest)
    }

    /// Open `id` now instead of on first use.
    pub fn open(&mut self, id: LocatorId) -> Result<()> {
        let (channel, poller) = self.parts(id)?;
        channel.open(poller)
    }

    /// Close `id`, keeping its registration. It reopens on next use.
    pub fn close(&mut self, id: LocatorId) -> Result<()> {
        let (channel, poller) = self.parts(id)?;
        channel.close(poller);
        Ok(())
    }

    fn slot_of(&self, id: LocatorId) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|channel| channel.locator_id() == id)
        })
    }

    fn parts(&mut self, id: LocatorId) -> Result<(&mut Channel, &mut Poller)> {
        let channel = self
            .slots
            .iter_mut()
            .flatten()
            .find(|channel| channel.locator_id() == id)
            .ok_or(TransportError::NotFound(id))?;
        Ok((channel, &mut self.poller))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        for channel in self.slots.iter_mut().flatten() {
            channel.close(&mut self.poller);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::serial::SerialParams;
    use crate::udp::UdpParams;

    fn udp(recv: u16, send: u16) -> LinkParams {
        LinkParams::Udp(UdpParams::new(recv, send))
    }

    #[test]
    fn test_create_uses_first_free_slot() {
        let mut registry = Registry::default();
        registry.create(LocatorId::new(10), udp(0, 9)).unwrap();
        registry.create(LocatorId::new(11), udp(0, 9)).unwrap();
        registry.create(LocatorId::new(12), udp(0, 9)).unwrap();

        registry.remove(LocatorId::new(11)).unwrap();
        registry.create(LocatorId::new(13), udp(0, 9)).unwrap();

        assert_eq!(registry.get(LocatorId::new(13)).unwrap().slot_index(), 1);
        assert_eq!(
            registry.ids().collect::<Vec<_>>(),
            vec![LocatorId::new(10), LocatorId::new(13), LocatorId::new(12)]
        );
    }

    #[test]
    fn test_capacity_exceeded_then_slot_freed() {
        let config = TransportConfig {
            max_channels: 3,
            ..TransportConfig::default()
        };
        let mut registry = Registry::new(config);
        for id in 0..3 {
            registry.create(LocatorId::new(id), udp(0, 9)).unwrap();
        }
        assert!(registry.is_full());

        let err = registry.create(LocatorId::new(3), udp(0, 9)).unwrap_err();
        assert!(matches!(err, TransportError::CapacityExceeded { capacity: 3 }));
        assert_eq!(registry.len(), 3);

        registry.remove(LocatorId::new(1)).unwrap();
        registry.create(LocatorId::new(3), udp(0, 9)).unwrap();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_negative_id_rejected() {
        let mut registry = Registry::default();
        let err = registry.create(LocatorId::new(-1), udp(0, 9)).unwrap_err();
        assert!(matches!(err, TransportError::BadParameters(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = Registry::default();
        registry.create(LocatorId::new(4), udp(0, 9)).unwrap();
        let err = registry.create(LocatorId::new(4), udp(0, 9)).unwrap_err();
        assert!(matches!(err, TransportError::BadParameters(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_serial_params_rejected_at_create() {
        let mut registry = Registry::default();
        let params = LinkParams::Serial(SerialParams::new(""));
        assert!(matches!(
            registry.create(LocatorId::new(0), params),
            Err(TransportError::BadParameters(_))
        ));
    }

    #[test]
    fn test_allocation_failure_reported() {
        let config = TransportConfig {
            rx_buffer_len: usize::MAX,
            ..TransportConfig::default()
        };
        let mut registry = Registry::new(config);
        let err = registry.create(LocatorId::new(0), udp(0, 9)).unwrap_err();
        assert!(matches!(err, TransportError::AllocationFailure { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_not_found() {
        let mut registry = Registry::default();
        let err = registry.remove(LocatorId::new(42)).unwrap_err();
        assert!(matches!(err, TransportError::NotFound(id) if id == LocatorId::new(42)));
    }

    #[test]
    fn test_remove_closes_open_channel() {
        let mut registry = Registry::default();
        let id = registry.create(LocatorId::new(0), udp(0, 9)).unwrap();
        registry.open(id).unwrap();
        let slot = registry.get(id).unwrap().slot_index();
        assert!(registry.poller().is_registered(slot));

        registry.remove(id).unwrap();
        assert!(!registry.poller().is_registered(slot));
        assert!(registry.resolve(id).is_none());
    }

    #[test]
    fn test_io_on_unknown_locator_is_not_found() {
        let mut registry = Registry::default();
        let mut buf = [0u8; 8];
        let missing = LocatorId::new(5);

        assert!(matches!(registry.send(missing, b"x"), Err(TransportError::NotFound(_))));
        assert!(matches!(
            registry.receive(missing, &mut buf),
            Err(TransportError::NotFound(_))
        ));
        assert!(matches!(
            registry.read_raw(missing, &mut buf),
            Err(TransportError::NotFound(_))
        ));
    }

    #[test]
    fn test_close_keeps_registration() {
        let mut registry = Registry::default();
        let id = registry.create(LocatorId::new(1), udp(0, 9)).unwrap();
        registry.open(id).unwrap();
        registry.close(id).unwrap();

        let channel = registry.resolve(id).unwrap();
        assert!(!channel.is_open());
        channel.set_poll_timeout(Duration::from_millis(1));
        assert_eq!(registry.len(), 1);
    }
}
