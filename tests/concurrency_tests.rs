//! Per-device serialization tests: concurrent facade operations must
//! never observe a half-applied multi-register update.

use std::sync::Arc;
use std::thread;

use phoenix_retimer::mock::MockBus;
use phoenix_retimer::registers as reg;
use phoenix_retimer::{ConfigurationUpdate, DataRate, Device, InterruptEnables};

fn open_device(mock: &MockBus) -> Arc<Device> {
    mock.seed_identity();
    Arc::new(Device::from_transport(Box::new(mock.transport()), 0x50).unwrap())
}

/// Two coherent device states toggled by the writer. Pattern A sets
/// Gen5 with all interrupts enabled; pattern B sets Gen1 with all
/// interrupts disabled. A reader must only ever see one or the other.
fn pattern_a() -> ConfigurationUpdate {
    ConfigurationUpdate {
        max_data_rate: Some(DataRate::Gen5_32g),
        interrupt_enables: Some(InterruptEnables {
            global: true,
            eq_phase_err: true,
            phy_phase_err: true,
            internal_err: true,
        }),
        ..Default::default()
    }
}

fn pattern_b() -> ConfigurationUpdate {
    ConfigurationUpdate {
        max_data_rate: Some(DataRate::Gen1_2p5g),
        interrupt_enables: Some(InterruptEnables::default()),
        ..Default::default()
    }
}

#[test]
fn test_configuration_updates_appear_atomic_to_readers() {
    let mock = MockBus::new();
    let device = open_device(&mock);
    // Widen the window between the transactions of one facade call.
    mock.preempt_transactions(true);

    let writer = {
        let device = Arc::clone(&device);
        thread::spawn(move || {
            for i in 0..40 {
                let update = if i % 2 == 0 { pattern_a() } else { pattern_b() };
                device.set_configuration(&update).unwrap();
            }
        })
    };

    let reader = {
        let device = Arc::clone(&device);
        thread::spawn(move || {
            for _ in 0..40 {
                let config = device.get_configuration().unwrap();
                let consistent = match config.max_data_rate {
                    DataRate::Gen5_32g => config.interrupt_enables.global,
                    DataRate::Gen1_2p5g => !config.interrupt_enables.global,
                    other => panic!("unexpected rate {other:?}"),
                };
                assert!(
                    consistent,
                    "observed torn configuration: {config:?}"
                );
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
}

#[test]
fn test_status_reads_run_concurrently_with_updates() {
    let mock = MockBus::new();
    let device = open_device(&mock);
    mock.set_registers(&[
        (reg::TEMPERATURE, 0x8000_002D),
        (reg::PPA_LTSSM_STATE, 0x0001_0404),
    ]);
    mock.preempt_transactions(true);

    let writer = {
        let device = Arc::clone(&device);
        thread::spawn(move || {
            for i in 0..30 {
                let update = if i % 2 == 0 { pattern_a() } else { pattern_b() };
                device.set_configuration(&update).unwrap();
            }
        })
    };

    let reader = {
        let device = Arc::clone(&device);
        thread::spawn(move || {
            for _ in 0..30 {
                let status = device.get_status().unwrap();
                assert_eq!(status.temperature_c, 45);
                assert_eq!(status.ppa_status.current_link_width, 16);
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
}

#[test]
fn test_concurrent_rmw_updates_do_not_lose_writes() {
    let mock = MockBus::new();
    let device = open_device(&mock);
    mock.preempt_transactions(true);

    // Two writers patch disjoint fields of GLOBAL_PARAM0. With the RMW
    // held under the device lock, neither update can be lost.
    let rate_writer = {
        let device = Arc::clone(&device);
        thread::spawn(move || {
            for _ in 0..20 {
                device
                    .set_configuration(&ConfigurationUpdate {
                        max_data_rate: Some(DataRate::Gen4_16g),
                        ..Default::default()
                    })
                    .unwrap();
            }
        })
    };

    let clk_writer = {
        let device = Arc::clone(&device);
        thread::spawn(move || {
            for _ in 0..20 {
                device
                    .set_configuration(&ConfigurationUpdate {
                        clocking_mode: Some(phoenix_retimer::ClockingMode::SrisSsc),
                        ..Default::default()
                    })
                    .unwrap();
            }
        })
    };

    rate_writer.join().unwrap();
    clk_writer.join().unwrap();

    let config = device.get_configuration().unwrap();
    assert_eq!(config.max_data_rate, DataRate::Gen4_16g);
    assert_eq!(config.clocking_mode, phoenix_retimer::ClockingMode::SrisSsc);
}
