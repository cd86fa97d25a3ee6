//! Discovery engine tests against the mock transport.

use phoenix_retimer::mock::MockBus;
use phoenix_retimer::registers as reg;
use phoenix_retimer::{discover_with, Error, Transport, TransportConfig};

fn i2c_config() -> TransportConfig {
    TransportConfig::I2c {
        adapter_port: 0,
        bus_speed_khz: 400,
        slave_address: 0x50,
    }
}

fn mock_opener(
    mock: &MockBus,
) -> impl FnMut(&TransportConfig) -> phoenix_retimer::Result<Box<dyn Transport + Send>> {
    let mock = mock.clone();
    move |_config| Ok(Box::new(mock.transport()) as Box<dyn Transport + Send>)
}

#[test]
fn test_discover_finds_responder_and_skips_nak() {
    let mock = MockBus::new();
    mock.set_registers(&[
        (reg::GLOBAL_PARAM1, 0x14E4_0201),
        (reg::XAGENT_INFO_0, 0xABCD_0123),
        (reg::GLOBAL_PARAM0, 0x0000_0000),
    ]);
    mock.nak_address(0x51);

    let found = discover_with(&i2c_config(), &[0x51, 0x50], mock_opener(&mock)).unwrap();
    assert_eq!(found.len(), 1);

    let identity = &found[0];
    assert_eq!(identity.device_address, 0x50);
    assert_eq!(identity.vendor_id, 0x14E4);
    assert_eq!(identity.device_id, 0x02);
    assert_eq!(identity.revision_id, 0x01);
    assert_eq!(identity.firmware_version_str(), "1.35");
    assert_eq!(identity.product_id, 0xABCD);
    // Handles are assigned by the registry, not by discovery.
    assert_eq!(identity.product_handle, 0);
}

#[test]
fn test_discover_skips_foreign_vendor() {
    let mock = MockBus::new();
    mock.set_register(reg::GLOBAL_PARAM1, 0x8086_0001);
    let found = discover_with(&i2c_config(), &[0x50], mock_opener(&mock)).unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_discover_skips_pec_corruption() {
    let mock = MockBus::new();
    mock.set_registers(&[
        (reg::GLOBAL_PARAM1, 0x14E4_0201),
        (reg::XAGENT_INFO_0, 0xABCD_0123),
    ]);
    // First probe read is corrupted; the address is skipped, not fatal.
    mock.corrupt_next_read_pec(1);
    let found = discover_with(&i2c_config(), &[0x50], mock_opener(&mock)).unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_discover_aborts_on_bus_error() {
    let mock = MockBus::new();
    mock.set_registers(&[
        (reg::GLOBAL_PARAM1, 0x14E4_0201),
        (reg::XAGENT_INFO_0, 0xABCD_0123),
    ]);
    mock.fail_address(0x52);

    match discover_with(&i2c_config(), &[0x50, 0x52, 0x53], mock_opener(&mock)) {
        Err(Error::Bus { .. }) => {}
        other => panic!("expected bus error to abort the scan, got {other:?}"),
    }
}

#[test]
fn test_discover_probes_sorted_and_deduplicated() {
    let mock = MockBus::new();
    mock.set_registers(&[
        (reg::GLOBAL_PARAM1, 0x14E4_0201),
        (reg::XAGENT_INFO_0, 0xABCD_0123),
    ]);

    let mut probed = Vec::new();
    let found = discover_with(&i2c_config(), &[0x52, 0x50, 0x52, 0x51], |config| {
        probed.push(config.slave_address());
        Ok(Box::new(mock.transport()) as Box<dyn Transport + Send>)
    })
    .unwrap();

    assert_eq!(probed, vec![0x50, 0x51, 0x52]);
    // The shared mock map answers on every address.
    assert_eq!(found.len(), 3);
    assert_eq!(found[0].device_address, 0x50);
    assert_eq!(found[2].device_address, 0x52);
}

#[test]
fn test_discover_rejects_invalid_address() {
    let mock = MockBus::new();
    match discover_with(&i2c_config(), &[0x90], mock_opener(&mock)) {
        Err(Error::InvalidArgument(_)) => {}
        other => panic!("expected InvalidArgument for an 8-bit address, got {other:?}"),
    }
}
