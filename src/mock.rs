//! Register-map-backed mock transport for testing without hardware.
//!
//! [`MockTransport`] speaks the real SMBus/PEC wire format: it parses
//! command frames byte-for-byte, validates request PECs, serves values
//! from a programmable register map, and signs responses with correct
//! (or deliberately corrupted) PECs. A [`MockBus`] handle shares the
//! underlying state so tests keep scripting access after the transport
//! is moved into a device.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::consts::cmd;
use crate::error::{bus_error, Error, Result};
use crate::pec;
use crate::transport::{Transport, TransportKind};

/// One decoded register transaction seen by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    Read { address: u32, value: u32 },
    Write { address: u32, value: u32 },
}

#[derive(Debug, Default)]
struct MockState {
    registers: HashMap<u32, u32>,
    /// Slaves that never acknowledge.
    nak_addresses: HashSet<u8>,
    /// Slaves that fail with a bus error (aborts discovery).
    fail_addresses: HashSet<u8>,
    /// NAK the next N read transactions regardless of slave.
    nak_next_reads: u32,
    /// Corrupt the response PEC of the next N reads.
    corrupt_next_read_pec: u32,
    /// Fail the next write targeting this register with a bus error.
    fail_next_write_to: Option<u32>,
    /// Fail the next read targeting this register with a bus error.
    fail_next_read_to: Option<u32>,
    /// Sleep briefly at the start of each transaction to widen race
    /// windows in concurrency tests.
    preempt: bool,
    journal: Vec<MockOp>,
}

/// Scripting handle for a mock bus shared by any number of transports.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport view onto this bus.
    pub fn transport(&self) -> MockTransport {
        MockTransport {
            state: Arc::clone(&self.state),
            closed: false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn set_register(&self, address: u32, value: u32) {
        self.lock().registers.insert(address, value);
    }

    pub fn set_registers(&self, entries: &[(u32, u32)]) {
        let mut state = self.lock();
        for &(address, value) in entries {
            state.registers.insert(address, value);
        }
    }

    /// Current value of a register (0 if never written).
    pub fn register(&self, address: u32) -> u32 {
        self.lock().registers.get(&address).copied().unwrap_or(0)
    }

    /// Seeds the identification registers of a typical device:
    /// vendor 0x14E4, device 0x02, revision 0x01, firmware 1.35,
    /// product 0xABCD.
    pub fn seed_identity(&self) {
        self.set_registers(&[
            (crate::consts::reg::GLOBAL_PARAM1, 0x14E4_0201),
            (crate::consts::reg::XAGENT_INFO_0, 0xABCD_0123),
            (crate::consts::reg::GLOBAL_PARAM0, 0x0000_0000),
        ]);
    }

    pub fn nak_address(&self, slave_addr: u8) {
        self.lock().nak_addresses.insert(slave_addr);
    }

    pub fn fail_address(&self, slave_addr: u8) {
        self.lock().fail_addresses.insert(slave_addr);
    }

    pub fn nak_next_reads(&self, count: u32) {
        self.lock().nak_next_reads = count;
    }

    pub fn corrupt_next_read_pec(&self, count: u32) {
        self.lock().corrupt_next_read_pec = count;
    }

    pub fn fail_next_write_to(&self, address: u32) {
        self.lock().fail_next_write_to = Some(address);
    }

    pub fn fail_next_read_to(&self, address: u32) {
        self.lock().fail_next_read_to = Some(address);
    }

    /// Inject a scheduling gap at the start of every transaction.
    pub fn preempt_transactions(&self, enabled: bool) {
        self.lock().preempt = enabled;
    }

    pub fn journal(&self) -> Vec<MockOp> {
        self.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }
}

/// Transport view onto a [`MockBus`].
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    closed: bool,
}

impl MockTransport {
    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidArgument("transport is closed".to_string()));
        }
        Ok(())
    }

    fn maybe_preempt(&self) {
        let preempt = self.state.lock().unwrap().preempt;
        if preempt {
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn check_slave(state: &MockState, slave_addr: u8) -> Result<()> {
        if state.fail_addresses.contains(&slave_addr) {
            return Err(bus_error(format!(
                "injected bus fault at 0x{slave_addr:02X}"
            )));
        }
        if state.nak_addresses.contains(&slave_addr) {
            return Err(Error::Nak {
                address: slave_addr,
            });
        }
        Ok(())
    }
}

impl Transport for MockTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::I2c
    }

    fn write(&mut self, slave_addr: u8, bytes: &[u8]) -> Result<()> {
        self.check_open()?;
        self.maybe_preempt();
        let mut state = self.state.lock().unwrap();
        Self::check_slave(&state, slave_addr)?;

        if bytes.len() < 6 {
            return Err(Error::Framing(format!(
                "write frame too short ({} bytes)",
                bytes.len()
            )));
        }
        let (payload, frame_pec) = bytes.split_at(bytes.len() - 1);
        let computed = pec::write_frame_pec(slave_addr, payload);
        if frame_pec[0] != computed {
            return Err(Error::Pec {
                expected: frame_pec[0],
                computed,
            });
        }

        let command = payload[0];
        let address = u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]);
        let data = &payload[5..];
        let value = match command {
            cmd::REG_WRITE_16 if data.len() == 2 => u16::from_le_bytes([data[0], data[1]]) as u32,
            cmd::REG_WRITE_32 if data.len() == 4 => {
                u32::from_le_bytes([data[0], data[1], data[2], data[3]])
            }
            _ => {
                return Err(Error::Framing(format!(
                    "malformed write frame: command 0x{command:02X} with {} data bytes",
                    data.len()
                )));
            }
        };

        if state.fail_next_write_to == Some(address) {
            state.fail_next_write_to = None;
            return Err(bus_error(format!(
                "injected write fault at register 0x{address:08X}"
            )));
        }

        state.registers.insert(address, value);
        state.journal.push(MockOp::Write { address, value });
        Ok(())
    }

    fn read(&mut self, slave_addr: u8, _len: usize) -> Result<Vec<u8>> {
        self.check_open()?;
        let state = self.state.lock().unwrap();
        Self::check_slave(&state, slave_addr)?;
        // The SMBus layer never issues a bare read; nothing to serve.
        Err(Error::Framing("bare read without a command frame".into()))
    }

    fn write_read(
        &mut self,
        slave_addr: u8,
        write_bytes: &[u8],
        read_len: usize,
    ) -> Result<Vec<u8>> {
        self.check_open()?;
        self.maybe_preempt();
        let mut state = self.state.lock().unwrap();
        Self::check_slave(&state, slave_addr)?;
        if state.nak_next_reads > 0 {
            state.nak_next_reads -= 1;
            return Err(Error::Nak {
                address: slave_addr,
            });
        }

        if write_bytes.len() != 6 {
            return Err(Error::Framing(format!(
                "read request must be 6 bytes, got {}",
                write_bytes.len()
            )));
        }
        let (payload, frame_pec) = write_bytes.split_at(write_bytes.len() - 1);
        let computed = pec::write_frame_pec(slave_addr, payload);
        if frame_pec[0] != computed {
            return Err(Error::Pec {
                expected: frame_pec[0],
                computed,
            });
        }

        let command = payload[0];
        let address = u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]);
        let width = match command {
            cmd::REG_READ_16 => 2,
            cmd::REG_READ_32 => 4,
            other => {
                return Err(Error::Framing(format!(
                    "unknown read command 0x{other:02X}"
                )));
            }
        };
        if read_len != width + 1 {
            return Err(Error::Framing(format!(
                "read length {read_len} does not match command width {width}"
            )));
        }

        if state.fail_next_read_to == Some(address) {
            state.fail_next_read_to = None;
            return Err(bus_error(format!(
                "injected read fault at register 0x{address:08X}"
            )));
        }

        let value = state.registers.get(&address).copied().unwrap_or(0);
        state.journal.push(MockOp::Read { address, value });

        let data = &value.to_le_bytes()[..width];
        let mut response_pec = pec::read_response_pec(slave_addr, payload, data);
        if state.corrupt_next_read_pec > 0 {
            state.corrupt_next_read_pec -= 1;
            response_pec ^= 0x01;
        }
        let mut response = data.to_vec();
        response.push(response_pec);
        Ok(response)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smbus::RegisterBus;

    #[test]
    fn test_register_round_trip_masks_width() {
        let mock = MockBus::new();
        let mut bus = RegisterBus::new(Box::new(mock.transport()), 0x50);

        bus.write_u32(0x0000, 0x1122_3344).unwrap();
        assert_eq!(bus.read_u32(0x0000).unwrap(), 0x1122_3344);
        assert_eq!(mock.register(0x0000), 0x1122_3344);

        bus.write_u16(0x0102, 0xBEEF).unwrap();
        assert_eq!(bus.read_u16(0x0102).unwrap(), 0xBEEF);
        // A 16-bit write stores only 16 bits of value.
        assert_eq!(mock.register(0x0102), 0x0000_BEEF);
    }

    #[test]
    fn test_misaligned_access_rejected_before_io() {
        let mock = MockBus::new();
        let mut bus = RegisterBus::new(Box::new(mock.transport()), 0x50);
        assert!(matches!(
            bus.write_u32(0x0001, 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(bus.read_u32(0x0002), Err(Error::InvalidArgument(_))));
        assert!(matches!(bus.read_u16(0x0003), Err(Error::InvalidArgument(_))));
        assert!(mock.journal().is_empty());
    }

    #[test]
    fn test_pec_corruption_surfaces() {
        let mock = MockBus::new();
        mock.set_register(0x0000, 0x1234_5678);
        mock.corrupt_next_read_pec(1);
        let mut bus = RegisterBus::new(Box::new(mock.transport()), 0x50);
        match bus.read_u32(0x0000) {
            Err(Error::Pec { expected, computed }) => {
                assert_eq!(expected ^ 0x01, computed);
            }
            other => panic!("expected Pec error, got {other:?}"),
        }
        // The corruption was one-shot.
        assert_eq!(bus.read_u32(0x0000).unwrap(), 0x1234_5678);
    }

    #[test]
    fn test_nak_and_fault_injection() {
        let mock = MockBus::new();
        mock.nak_address(0x51);
        mock.fail_address(0x52);
        mock.set_register(0x0004, 0x14E4_0201);

        let mut bus_51 = RegisterBus::new(Box::new(mock.transport()), 0x51);
        assert!(matches!(
            bus_51.read_u32(0x0004),
            Err(Error::Nak { address: 0x51 })
        ));

        let mut bus_52 = RegisterBus::new(Box::new(mock.transport()), 0x52);
        assert!(matches!(bus_52.read_u32(0x0004), Err(Error::Bus { .. })));

        let mut bus_50 = RegisterBus::new(Box::new(mock.transport()), 0x50);
        assert_eq!(bus_50.read_u32(0x0004).unwrap(), 0x14E4_0201);
    }

    #[test]
    fn test_read_fault_targets_one_register() {
        let mock = MockBus::new();
        mock.set_registers(&[(0x0000, 0x1111_1111), (0x0008, 0x2222_2222)]);
        mock.fail_next_read_to(0x0008);
        let mut bus = RegisterBus::new(Box::new(mock.transport()), 0x50);

        // Reads of other registers pass through untouched.
        assert_eq!(bus.read_u32(0x0000).unwrap(), 0x1111_1111);
        assert!(matches!(bus.read_u32(0x0008), Err(Error::Bus { .. })));
        // The injection was one-shot.
        assert_eq!(bus.read_u32(0x0008).unwrap(), 0x2222_2222);
    }

    #[test]
    fn test_closed_transport_rejects_io() {
        let mock = MockBus::new();
        let mut bus = RegisterBus::new(Box::new(mock.transport()), 0x50);
        bus.close().unwrap();
        assert!(matches!(bus.read_u32(0x0000), Err(Error::InvalidArgument(_))));
    }
}
