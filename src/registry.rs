//! Process-wide device registry.
//!
//! Maps integer product handles to live [`Device`]s. Handles count up
//! monotonically and are never reused within a process lifetime. The
//! registry lock guards only the handle table; it is never held across
//! device I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::info;

use crate::device::Device;
use crate::error::{Error, Result};
use crate::transport::TransportConfig;

#[derive(Default)]
struct RegistryInner {
    devices: HashMap<u32, Arc<Device>>,
    next_handle: u32,
}

/// Handle table shared by all API surfaces of a process.
pub struct DeviceRegistry {
    inner: Mutex<RegistryInner>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        DeviceRegistry {
            inner: Mutex::new(RegistryInner {
                devices: HashMap::new(),
                next_handle: 1,
            }),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Opens a persistent transport, probes the device, and registers it
    /// under a freshly allocated handle.
    pub fn connect(&self, config: &TransportConfig) -> Result<u32> {
        let device = Device::open(config)?;
        Ok(self.register(device))
    }

    /// Registers an already-constructed device (e.g. one built on a
    /// custom or mock transport) and returns its handle.
    pub fn register(&self, mut device: Device) -> u32 {
        let mut inner = self.lock_inner();
        let handle = inner.next_handle;
        inner.next_handle += 1;
        device.set_product_handle(handle);
        info!(
            "device at 0x{:02X} registered as handle {handle}",
            device.slave_address()
        );
        inner.devices.insert(handle, Arc::new(device));
        handle
    }

    /// Looks up a connected device.
    pub fn get(&self, handle: u32) -> Result<Arc<Device>> {
        self.lock_inner()
            .devices
            .get(&handle)
            .cloned()
            .ok_or(Error::UnknownHandle(handle))
    }

    /// Removes a device and closes its transport. The close happens
    /// after the registry lock is released.
    pub fn disconnect(&self, handle: u32) -> Result<()> {
        let device = self
            .lock_inner()
            .devices
            .remove(&handle)
            .ok_or(Error::UnknownHandle(handle))?;
        info!("handle {handle} disconnected");
        device.close()
    }

    /// Handles of all connected devices, in ascending order.
    pub fn handles(&self) -> Vec<u32> {
        let mut handles: Vec<u32> = self.lock_inner().devices.keys().copied().collect();
        handles.sort_unstable();
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBus;

    fn mock_device(mock: &MockBus, address: u8) -> Device {
        mock.seed_identity();
        Device::from_transport(Box::new(mock.transport()), address).unwrap()
    }

    #[test]
    fn test_handles_are_monotonic_and_not_reused() {
        let registry = DeviceRegistry::new();
        let mock = MockBus::new();

        let h1 = registry.register(mock_device(&mock, 0x50));
        let h2 = registry.register(mock_device(&mock, 0x51));
        assert_eq!(h1, 1);
        assert_eq!(h2, 2);
        assert_eq!(registry.handles(), vec![1, 2]);

        registry.disconnect(h1).unwrap();
        let h3 = registry.register(mock_device(&mock, 0x52));
        assert_eq!(h3, 3, "disconnected handles must not be reused");
        assert_eq!(registry.handles(), vec![2, 3]);
    }

    #[test]
    fn test_registered_identity_carries_handle() {
        let registry = DeviceRegistry::new();
        let mock = MockBus::new();
        let handle = registry.register(mock_device(&mock, 0x50));
        let device = registry.get(handle).unwrap();
        assert_eq!(device.identity().product_handle, handle);
        assert_eq!(device.identity().device_address, 0x50);
    }

    #[test]
    fn test_unknown_handle_errors() {
        let registry = DeviceRegistry::new();
        assert!(matches!(registry.get(99), Err(Error::UnknownHandle(99))));
        assert!(matches!(
            registry.disconnect(99),
            Err(Error::UnknownHandle(99))
        ));
    }

    #[test]
    fn test_disconnect_closes_device() {
        let registry = DeviceRegistry::new();
        let mock = MockBus::new();
        let handle = registry.register(mock_device(&mock, 0x50));
        let device = registry.get(handle).unwrap();
        registry.disconnect(handle).unwrap();
        // Survivor Arc still exists but the transport is closed.
        assert!(device.get_status().is_err());
    }
}
