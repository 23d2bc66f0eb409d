//! Roster of devices known to the coordinator.
//!
//! The extended address is the identity: at most one entry per extended
//! address. Entries are only appended or replaced wholesale by a roster
//! snapshot; a device going quiet is marked inactive, never removed.

use tracing::debug;

use crate::device::{CapabilityInfo, Device, DeviceAddress};
use crate::error::GatewayError;

/// One entry of a `GET_DEVICE_ARRAY_CNF` snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterEntry {
    pub short_address: u16,
    pub ext_address: u64,
    pub capability_info: CapabilityInfo,
}

/// Which path a join indication took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Created,
    Updated,
}

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn get(&self, index: usize) -> Option<&Device> {
        self.devices.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Device> {
        self.devices.get_mut(index)
    }

    /// Index of the first device answering to `address`.
    pub fn find_by_address(&self, address: &DeviceAddress) -> Option<usize> {
        self.devices.iter().position(|d| d.matches(address))
    }

    /// Register a joining device, or refresh it if its extended address is
    /// already known. Returns the device's index and the path taken.
    pub fn upsert_on_join(
        &mut self,
        short_address: u16,
        ext_address: u64,
        capability_info: CapabilityInfo,
    ) -> (usize, JoinOutcome) {
        if let Some(index) = self.find_by_address(&DeviceAddress::Extended(ext_address)) {
            debug!(
                ext = %DeviceAddress::Extended(ext_address),
                short = %DeviceAddress::Short(short_address),
                "known device rejoined"
            );
            self.devices[index].update_join(short_address, capability_info);
            return (index, JoinOutcome::Updated);
        }

        debug!(ext = %DeviceAddress::Extended(ext_address), "new device joined");
        self.devices
            .push(Device::new(short_address, ext_address, capability_info));
        (self.devices.len() - 1, JoinOutcome::Created)
    }

    /// Throw away the current roster and rebuild it from a snapshot.
    pub fn replace_snapshot(&mut self, entries: impl IntoIterator<Item = RosterEntry>) {
        self.devices = entries
            .into_iter()
            .map(|e| Device::new(e.short_address, e.ext_address, e.capability_info))
            .collect();
        debug!(count = self.devices.len(), "device roster replaced");
    }

    /// Soft-delete the device with `short_address`.
    pub fn mark_inactive(
        &mut self,
        short_address: u16,
        timeout: u8,
    ) -> Result<usize, GatewayError> {
        let address = DeviceAddress::Short(short_address);
        match self.find_by_address(&address) {
            Some(index) => {
                debug!(%address, timeout, "device not active");
                self.devices[index].mark_inactive();
                Ok(index)
            }
            None => Err(GatewayError::DeviceNotFound(address)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceStatus;

    const EXT: u64 = 0x1122_3344_5566_7788;

    fn entry(short_address: u16, ext_address: u64) -> RosterEntry {
        RosterEntry {
            short_address,
            ext_address,
            capability_info: CapabilityInfo::default(),
        }
    }

    #[test]
    fn join_creates_then_updates_in_place() {
        let mut reg = DeviceRegistry::new();

        let (idx, outcome) = reg.upsert_on_join(0x0001, EXT, CapabilityInfo::default());
        assert_eq!((idx, outcome), (0, JoinOutcome::Created));
        assert!(reg.get(0).unwrap().is_active());

        let cap = CapabilityInfo {
            ffd: true,
            ..Default::default()
        };
        let (idx, outcome) = reg.upsert_on_join(0x0002, EXT, cap);
        assert_eq!((idx, outcome), (0, JoinOutcome::Updated));
        assert_eq!(reg.len(), 1);

        let dev = reg.get(0).unwrap();
        assert_eq!(dev.short_address, 0x0002);
        assert!(dev.capability_info.ffd);
    }

    #[test]
    fn rejoin_reactivates_inactive_device() {
        let mut reg = DeviceRegistry::new();
        reg.upsert_on_join(1, EXT, CapabilityInfo::default());
        reg.mark_inactive(1, 0).unwrap();
        assert_eq!(reg.get(0).unwrap().status, DeviceStatus::Inactive);

        reg.upsert_on_join(1, EXT, CapabilityInfo::default());
        assert_eq!(reg.get(0).unwrap().status, DeviceStatus::Active);
    }

    #[test]
    fn distinct_extended_addresses_are_distinct_devices() {
        let mut reg = DeviceRegistry::new();
        reg.upsert_on_join(1, 0xA, CapabilityInfo::default());
        reg.upsert_on_join(1, 0xB, CapabilityInfo::default());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn snapshot_discards_previous_entries() {
        let mut reg = DeviceRegistry::new();
        for i in 0..5 {
            reg.upsert_on_join(i, u64::from(i) + 100, CapabilityInfo::default());
        }
        reg.mark_inactive(2, 0).unwrap();

        reg.replace_snapshot(vec![entry(9, 900), entry(8, 800)]);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.find_by_address(&DeviceAddress::Extended(100)), None);
        assert_eq!(reg.find_by_address(&DeviceAddress::Short(8)), Some(1));
        assert!(reg.devices().iter().all(Device::is_active));

        reg.replace_snapshot(Vec::new());
        assert!(reg.is_empty());
    }

    #[test]
    fn mark_inactive_unknown_device_is_a_no_op() {
        let mut reg = DeviceRegistry::new();
        reg.upsert_on_join(1, EXT, CapabilityInfo::default());

        let err = reg.mark_inactive(0x0042, 5).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::DeviceNotFound(DeviceAddress::Short(0x0042))
        ));
        assert_eq!(reg.len(), 1);
        assert!(reg.get(0).unwrap().is_active());
    }

    #[test]
    fn find_returns_first_match() {
        let mut reg = DeviceRegistry::new();
        reg.replace_snapshot(vec![entry(7, 1), entry(7, 2)]);
        assert_eq!(reg.find_by_address(&DeviceAddress::Short(7)), Some(0));
        assert_eq!(reg.find_by_address(&DeviceAddress::Extended(2)), Some(1));
    }
}
