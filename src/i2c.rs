//! I2C/SMBus transport over an FT232H-class USB-to-I2C bridge.
//!
//! The bridge exposes a HID interface: transactions are submitted as OUT
//! reports carrying flags, write/read sizes, the shifted slave address,
//! and up to 32 data bytes; the bridge answers with an IN report whose
//! status byte reports NAK, arbitration loss, or bus timeout. Bridge
//! internals (SCL timing, pull-ups) are programmed through feature
//! reports.

use hidapi::{HidApi, HidDevice};
use log::{debug, trace, warn};

use crate::consts::bridge::{self, in_flags, out_flags};
use crate::consts::timing;
use crate::error::{bus_error, Error, Result};
use crate::transport::{with_retry, Transport, TransportKind};

/// I2C transport bound to one USB bridge adapter.
///
/// The slave address travels with each call rather than the transport, so
/// one adapter can serve a discovery sweep across the 0x50-0x57 strap
/// range without reopening.
pub struct I2cTransport {
    device: Option<HidDevice>,
    adapter_port: u8,
    timeout_ms: i32,
}

impl std::fmt::Debug for I2cTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I2cTransport")
            .field("adapter_port", &self.adapter_port)
            .field("open", &self.device.is_some())
            .finish()
    }
}

impl I2cTransport {
    /// Opens the bridge at `adapter_port` and configures the bus.
    ///
    /// Enumerates bridge interfaces by VID/PID and picks the one at the
    /// given index, programs the SCL clock, enables the internal
    /// pull-ups, and drains the bus with a void probe transfer.
    pub fn open(adapter_port: u8, bus_speed_khz: u16) -> Result<Self> {
        if !matches!(bus_speed_khz, 100 | 400 | 1000) {
            return Err(Error::InvalidArgument(format!(
                "I2C bus speed {bus_speed_khz} kHz not supported (100, 400, or 1000)"
            )));
        }
        let api = HidApi::new()?;
        let info = api
            .device_list()
            .filter(|info| {
                info.vendor_id() == bridge::BRIDGE_VID && info.product_id() == bridge::BRIDGE_PID
            })
            .nth(adapter_port as usize)
            .ok_or_else(|| {
                Error::AdapterNotFound(format!("no USB bridge at adapter port {adapter_port}"))
            })?;

        let device = api.open_path(info.path()).map_err(|e| {
            Error::AdapterBusy(format!(
                "failed to open bridge at port {adapter_port}: {e}"
            ))
        })?;
        debug!("bridge opened at adapter port {adapter_port}");

        let mut transport = I2cTransport {
            device: Some(device),
            adapter_port,
            timeout_ms: timing::OP_TIMEOUT_MS as i32,
        };
        transport.set_bus_speed(bus_speed_khz)?;
        transport.write_bridge_register(bridge::REG_PULLUP_EN, 0x0001)?;
        transport.drain_bus();
        Ok(transport)
    }

    /// Programs the SCL low/high cycle counts for the requested speed.
    /// The bridge core runs at 60 MHz; minimum cycle counts keep the
    /// waveform within the I2C timing tables for each speed class.
    fn set_bus_speed(&mut self, speed_khz: u16) -> Result<()> {
        let target_total_cycles = 60_000u32 / speed_khz as u32;
        let low_cycles = target_total_cycles / 2;
        let high_cycles = target_total_cycles - low_cycles;
        let (min_low, min_high) = match speed_khz {
            100 => (252, 240),
            400 => (78, 36),
            _ => (28, 14),
        };
        let final_low = low_cycles.max(min_low);
        let final_high = high_cycles.max(min_high);
        debug!(
            "setting I2C speed ~{}kHz: SCL_LOW=0x{:04X}, SCL_HIGH=0x{:04X}",
            speed_khz, final_low, final_high
        );
        self.write_bridge_register(bridge::REG_SCL_LOW, final_low as u16)?;
        self.write_bridge_register(bridge::REG_SCL_HIGH, final_high as u16)?;

        // Read back the SCL timing as an adapter sanity check; a bridge
        // that drops feature reports would otherwise fail much later
        // with a confusing bus error.
        let readback = self.read_bridge_register(bridge::REG_SCL_LOW)?;
        if readback != final_low as u16 {
            warn!(
                "bridge SCL readback mismatch: wrote 0x{:04X}, read 0x{readback:04X}",
                final_low
            );
        }
        Ok(())
    }

    /// Clears any half-finished transaction left on the bus by probing
    /// the general-call address. A NAK is the expected answer.
    fn drain_bus(&mut self) {
        match self.transfer(0x00, &[], 0) {
            Ok(_) | Err(Error::Nak { .. }) => trace!("bus drained"),
            Err(e) => warn!("bus drain probe failed: {e}"),
        }
    }

    fn handle(&self) -> Result<&HidDevice> {
        self.device
            .as_ref()
            .ok_or_else(|| Error::InvalidArgument("transport is closed".to_string()))
    }

    // Feature-report access to bridge-internal registers.
    fn write_bridge_register(&self, reg_addr: u16, value: u16) -> Result<()> {
        let device = self.handle()?;
        let buf: [u8; 5] = [
            bridge::REPORT_ID_WRITE_REGISTER,
            (reg_addr & 0xFF) as u8,
            (reg_addr >> 8) as u8,
            (value & 0xFF) as u8,
            (value >> 8) as u8,
        ];
        trace!("bridge reg write 0x{reg_addr:04X} = 0x{value:04X}");
        device
            .send_feature_report(&buf)
            .map_err(|e| bus_error(format!("bridge register 0x{reg_addr:04X} write: {e}")))
    }

    fn read_bridge_register(&self, reg_addr: u16) -> Result<u16> {
        let device = self.handle()?;
        let set_addr: [u8; 3] = [
            bridge::REPORT_ID_SET_READ_ADDRESS,
            (reg_addr & 0xFF) as u8,
            (reg_addr >> 8) as u8,
        ];
        device
            .send_feature_report(&set_addr)
            .map_err(|e| bus_error(format!("bridge register 0x{reg_addr:04X} address: {e}")))?;

        let mut buf = [0u8; 3];
        buf[0] = bridge::REPORT_ID_READ_REGISTER;
        let len = device
            .get_feature_report(&mut buf)
            .map_err(|e| bus_error(format!("bridge register 0x{reg_addr:04X} read: {e}")))?;
        if len != buf.len() || buf[0] != bridge::REPORT_ID_READ_REGISTER {
            return Err(bus_error(format!(
                "unexpected bridge feature report for register 0x{reg_addr:04X}"
            )));
        }
        let value = u16::from_le_bytes([buf[1], buf[2]]);
        trace!("bridge reg read 0x{reg_addr:04X} = 0x{value:04X}");
        Ok(value)
    }

    /// One bridge transaction: optional write phase, optional read phase,
    /// single START/STOP pair with a repeated START between the phases.
    fn transfer(&mut self, slave_addr: u8, write_bytes: &[u8], read_len: usize) -> Result<Vec<u8>> {
        if write_bytes.len() > bridge::REPORT_MAX_DATA_SIZE {
            return Err(Error::InvalidArgument(format!(
                "write of {} bytes exceeds bridge limit of {}",
                write_bytes.len(),
                bridge::REPORT_MAX_DATA_SIZE
            )));
        }
        if read_len > bridge::REPORT_MAX_DATA_SIZE {
            return Err(Error::InvalidArgument(format!(
                "read of {read_len} bytes exceeds bridge limit of {}",
                bridge::REPORT_MAX_DATA_SIZE
            )));
        }

        let mut out_buf = vec![0u8; bridge::OUT_REPORT_SIZE];
        out_buf[0] = out_flags::START_BIT | out_flags::STOP_BIT;
        out_buf[1] = write_bytes.len() as u8;
        out_buf[2] = read_len as u8;
        // 7-bit address shifted into wire format; the bridge drives the
        // R/W bit per phase.
        out_buf[3] = slave_addr << 1;
        out_buf[4..4 + write_bytes.len()].copy_from_slice(write_bytes);

        debug!(
            "I2C transfer to 0x{:02X}: write {} bytes, read {} bytes",
            slave_addr,
            write_bytes.len(),
            read_len
        );
        trace!("I2C OUT buffer: {:02X?}", &out_buf);

        let device = self.handle()?;
        let written = device.write(&out_buf).map_err(Error::Hid)?;
        if written != out_buf.len() {
            warn!("partial bridge write: sent {written} of {} bytes", out_buf.len());
            return Err(bus_error("partial bridge OUT report"));
        }

        // The bridge always answers with a status report, even for
        // write-only transactions.
        let mut in_buf = vec![0u8; bridge::IN_REPORT_SIZE];
        let received = device
            .read_timeout(&mut in_buf, self.timeout_ms)
            .map_err(Error::Hid)?;
        trace!("I2C IN buffer ({received} bytes): {:02X?}", &in_buf[..received]);
        if received == 0 {
            return Err(Error::Timeout("i2c transfer"));
        }
        if received < 4 {
            return Err(bus_error(format!("short bridge IN report ({received} bytes)")));
        }

        let status = in_buf[0];
        if status & in_flags::NAK_RECEIVED != 0 {
            return Err(Error::Nak {
                address: slave_addr,
            });
        }
        if status & in_flags::TIMEOUT != 0 {
            return Err(Error::Timeout("i2c transfer"));
        }
        if status & in_flags::ARBITRATION_LOST != 0 {
            return Err(bus_error(format!(
                "arbitration lost at address 0x{slave_addr:02X}"
            )));
        }
        if status & in_flags::REQUEST_ERROR != 0 || status & 0x0F != 0 {
            return Err(bus_error(format!(
                "bridge rejected transaction at 0x{slave_addr:02X} (status 0x{status:02X})"
            )));
        }

        if read_len == 0 {
            return Ok(Vec::new());
        }
        let reported = in_buf[2] as usize;
        let available = received.saturating_sub(4);
        if reported < read_len || available < read_len {
            return Err(bus_error(format!(
                "short read: wanted {read_len}, bridge returned {}",
                reported.min(available)
            )));
        }
        Ok(in_buf[4..4 + read_len].to_vec())
    }
}

impl Transport for I2cTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::I2c
    }

    fn write(&mut self, slave_addr: u8, bytes: &[u8]) -> Result<()> {
        with_retry("i2c write", || {
            self.transfer(slave_addr, bytes, 0).map(|_| ())
        })
    }

    fn read(&mut self, slave_addr: u8, len: usize) -> Result<Vec<u8>> {
        with_retry("i2c read", || self.transfer(slave_addr, &[], len))
    }

    fn write_read(
        &mut self,
        slave_addr: u8,
        write_bytes: &[u8],
        read_len: usize,
    ) -> Result<Vec<u8>> {
        with_retry("i2c write_read", || {
            self.transfer(slave_addr, write_bytes, read_len)
        })
    }

    fn close(&mut self) -> Result<()> {
        if self.device.take().is_some() {
            debug!("bridge at adapter port {} closed", self.adapter_port);
        }
        Ok(())
    }
}

impl Drop for I2cTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
