//! SMBus command framing with Packet Error Checking, and the register
//! access primitives built on it.
//!
//! Wire layout (all multi-byte values little-endian):
//!
//! ```text
//! write:  [SLAVE_W] CMD A0 A1 A2 A3 D0..Dn PEC
//! read:   [SLAVE_W] CMD A0 A1 A2 A3 PEC  --repeated START-->
//!         [SLAVE_R] D0..Dn PEC
//! ```
//!
//! The bracketed address bytes are driven by the bus master and never
//! appear in the buffers handed to the transport, but they are covered
//! by the PEC. A PEC mismatch surfaces [`Error::Pec`] and is not retried
//! at this layer.

use log::trace;

use crate::consts::cmd;
use crate::error::{Error, Result};
use crate::pec;
use crate::transport::Transport;

/// Builds the request bytes for a register read: command, little-endian
/// register address, and the write-phase PEC.
pub fn encode_read_request(slave_addr: u8, command: u8, address: u32) -> Vec<u8> {
    let mut frame = Vec::with_capacity(6);
    frame.push(command);
    frame.extend_from_slice(&address.to_le_bytes());
    frame.push(pec::write_frame_pec(slave_addr, &frame));
    frame
}

/// Builds the request bytes for a register write: command, little-endian
/// register address, little-endian data, and the PEC.
pub fn encode_write_request(slave_addr: u8, command: u8, address: u32, data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(6 + data.len());
    frame.push(command);
    frame.extend_from_slice(&address.to_le_bytes());
    frame.extend_from_slice(data);
    frame.push(pec::write_frame_pec(slave_addr, &frame));
    frame
}

/// Verifies the PEC on a read response and returns the data bytes.
///
/// `request` is the read request including its trailing PEC byte (which
/// the response PEC does not cover); `response` is `data || PEC`.
pub fn verify_read_response<'a>(
    slave_addr: u8,
    request: &[u8],
    response: &'a [u8],
    width: usize,
) -> Result<&'a [u8]> {
    if response.len() < width + 1 {
        return Err(Error::Framing(format!(
            "read response too short: {} bytes, wanted {}",
            response.len(),
            width + 1
        )));
    }
    let (data, rest) = response.split_at(width);
    let received = rest[0];
    let computed = pec::read_response_pec(slave_addr, &request[..request.len() - 1], data);
    if received != computed {
        return Err(Error::Pec {
            expected: received,
            computed,
        });
    }
    Ok(data)
}

fn check_alignment(address: u32, width_bytes: u32) -> Result<()> {
    if address % width_bytes != 0 {
        return Err(Error::InvalidArgument(format!(
            "{}-bit register access requires {}-byte alignment, got address 0x{:08X}",
            width_bytes * 8,
            width_bytes,
            address
        )));
    }
    Ok(())
}

/// Typed register access over a framed transport.
///
/// Owns the transport exclusively; one `RegisterBus` serves one slave.
pub struct RegisterBus {
    transport: Box<dyn Transport + Send>,
    slave_address: u8,
}

impl std::fmt::Debug for RegisterBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterBus")
            .field("slave_address", &self.slave_address)
            .finish()
    }
}

impl RegisterBus {
    pub fn new(transport: Box<dyn Transport + Send>, slave_address: u8) -> Self {
        RegisterBus {
            transport,
            slave_address,
        }
    }

    pub fn slave_address(&self) -> u8 {
        self.slave_address
    }

    pub fn read_u16(&mut self, address: u32) -> Result<u16> {
        check_alignment(address, 2)?;
        let request = encode_read_request(self.slave_address, cmd::REG_READ_16, address);
        let response = self
            .transport
            .write_read(self.slave_address, &request, 2 + 1)?;
        let data = verify_read_response(self.slave_address, &request, &response, 2)?;
        let value = u16::from_le_bytes([data[0], data[1]]);
        trace!("read_u16 0x{address:08X} = 0x{value:04X}");
        Ok(value)
    }

    pub fn read_u32(&mut self, address: u32) -> Result<u32> {
        check_alignment(address, 4)?;
        let request = encode_read_request(self.slave_address, cmd::REG_READ_32, address);
        let response = self
            .transport
            .write_read(self.slave_address, &request, 4 + 1)?;
        let data = verify_read_response(self.slave_address, &request, &response, 4)?;
        let value = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        trace!("read_u32 0x{address:08X} = 0x{value:08X}");
        Ok(value)
    }

    pub fn write_u16(&mut self, address: u32, value: u16) -> Result<()> {
        check_alignment(address, 2)?;
        let request = encode_write_request(
            self.slave_address,
            cmd::REG_WRITE_16,
            address,
            &value.to_le_bytes(),
        );
        trace!("write_u16 0x{address:08X} = 0x{value:04X}");
        self.transport.write(self.slave_address, &request)
    }

    pub fn write_u32(&mut self, address: u32, value: u32) -> Result<()> {
        check_alignment(address, 4)?;
        let request = encode_write_request(
            self.slave_address,
            cmd::REG_WRITE_32,
            address,
            &value.to_le_bytes(),
        );
        trace!("write_u32 0x{address:08X} = 0x{value:08X}");
        self.transport.write(self.slave_address, &request)
    }

    pub fn close(&mut self) -> Result<()> {
        self.transport.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_request_layout() {
        let frame = encode_read_request(0x50, cmd::REG_READ_32, 0x0000_8000);
        assert_eq!(frame.len(), 6);
        assert_eq!(frame[0], 0x05);
        // Address is little-endian on the wire.
        assert_eq!(&frame[1..5], &[0x00, 0x80, 0x00, 0x00]);
        assert_eq!(frame[5], pec::write_frame_pec(0x50, &frame[..5]));
    }

    #[test]
    fn test_write_request_endianness() {
        // Writing 0x11223344 places [44 33 22 11] in the data positions.
        let frame = encode_write_request(
            0x50,
            cmd::REG_WRITE_32,
            0x0000_0000,
            &0x1122_3344u32.to_le_bytes(),
        );
        assert_eq!(frame[0], 0x15);
        assert_eq!(&frame[1..5], &[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(&frame[5..9], &[0x44, 0x33, 0x22, 0x11]);
        assert_eq!(frame[9], pec::write_frame_pec(0x50, &frame[..9]));
    }

    #[test]
    fn test_verify_read_response_detects_corruption() {
        let request = encode_read_request(0x50, cmd::REG_READ_32, 0x0004);
        let data = 0x14E4_0201u32.to_le_bytes();
        let good_pec = pec::read_response_pec(0x50, &request[..request.len() - 1], &data);

        let mut response = data.to_vec();
        response.push(good_pec);
        let decoded = verify_read_response(0x50, &request, &response, 4).unwrap();
        assert_eq!(decoded, &data);

        // Flip a bit in the PEC byte.
        let mut corrupt = data.to_vec();
        corrupt.push(good_pec ^ 0x01);
        match verify_read_response(0x50, &request, &corrupt, 4) {
            Err(Error::Pec { expected, computed }) => {
                assert_eq!(expected, good_pec ^ 0x01);
                assert_eq!(computed, good_pec);
            }
            other => panic!("expected Pec error, got {other:?}"),
        }
    }

    #[test]
    fn test_alignment_enforcement() {
        assert!(check_alignment(0x0000, 4).is_ok());
        assert!(check_alignment(0x0004, 4).is_ok());
        assert!(check_alignment(0x0001, 4).is_err());
        assert!(check_alignment(0x0002, 4).is_err());
        assert!(check_alignment(0x0002, 2).is_ok());
        assert!(check_alignment(0x0003, 2).is_err());
    }
}
