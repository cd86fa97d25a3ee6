//! Byte-level transport abstraction over the retimer side channels.
//!
//! A [`Transport`] delivers opaque request bytes to one slave and returns
//! response bytes, with timeouts and retry on transient faults. Two
//! implementations exist: [`crate::i2c::I2cTransport`] over a USB-to-I2C
//! bridge and [`crate::uart::UartTransport`] over a serial line. A
//! transport is exclusively owned by one device (or one discovery probe)
//! at a time.

use std::thread;
use std::time::Duration;

use log::debug;

use crate::consts::timing;
use crate::error::{Error, Result};

/// Which side channel a transport drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    I2c,
    Uart,
}

/// Configuration for opening a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// I2C/SMBus through a USB bridge adapter.
    I2c {
        /// Index of the bridge on the USB bus.
        adapter_port: u8,
        /// SCL clock: 100, 400, or 1000 kHz.
        bus_speed_khz: u16,
        /// 7-bit slave address of the retimer.
        slave_address: u8,
    },
    /// UART through a serial port.
    Uart {
        /// Platform port name, e.g. "/dev/ttyUSB0" or "COM3".
        port_name: String,
        baud_rate: u32,
    },
}

impl TransportConfig {
    /// UART configuration at the default 115200-8N1.
    pub fn uart_default(port_name: impl Into<String>) -> Self {
        TransportConfig::Uart {
            port_name: port_name.into(),
            baud_rate: crate::consts::uart::DEFAULT_BAUD_RATE,
        }
    }

    /// Validates the configuration without touching hardware.
    pub fn validate(&self) -> Result<()> {
        match self {
            TransportConfig::I2c {
                bus_speed_khz,
                slave_address,
                ..
            } => {
                if !matches!(bus_speed_khz, 100 | 400 | 1000) {
                    return Err(Error::InvalidArgument(format!(
                        "I2C bus speed {bus_speed_khz} kHz not supported (100, 400, or 1000)"
                    )));
                }
                if *slave_address > 0x7F {
                    return Err(Error::InvalidArgument(format!(
                        "7-bit slave address 0x{slave_address:02X} out of range"
                    )));
                }
                Ok(())
            }
            TransportConfig::Uart {
                port_name,
                baud_rate,
            } => {
                if port_name.is_empty() {
                    return Err(Error::InvalidArgument(
                        "serial port name not specified".to_string(),
                    ));
                }
                if *baud_rate == 0 {
                    return Err(Error::InvalidArgument("baud rate must be non-zero".into()));
                }
                Ok(())
            }
        }
    }

    /// Slave address the device answers on (0 on UART).
    pub fn slave_address(&self) -> u8 {
        match self {
            TransportConfig::I2c { slave_address, .. } => *slave_address,
            TransportConfig::Uart { .. } => 0,
        }
    }

    /// Copy of this configuration re-targeted at another slave address.
    /// Used by discovery to probe an address range over one adapter.
    pub fn with_slave_address(&self, address: u8) -> Self {
        match self {
            TransportConfig::I2c {
                adapter_port,
                bus_speed_khz,
                ..
            } => TransportConfig::I2c {
                adapter_port: *adapter_port,
                bus_speed_khz: *bus_speed_khz,
                slave_address: address,
            },
            uart => uart.clone(),
        }
    }
}

/// Byte-level duplex to one physical adapter.
///
/// All operations carry the 1000 ms default deadline; implementations
/// retry transient bus faults per [`with_retry`] and surface NAK and PEC
/// conditions without retrying.
pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    /// Write `bytes` to the slave.
    fn write(&mut self, slave_addr: u8, bytes: &[u8]) -> Result<()>;

    /// Read exactly `len` bytes from the slave.
    fn read(&mut self, slave_addr: u8, len: usize) -> Result<Vec<u8>>;

    /// Write then read without releasing the bus in between. On I2C this
    /// is a single START-W-repeated-START-R-STOP sequence; on UART it is
    /// a cookie-correlated request/response frame pair.
    fn write_read(&mut self, slave_addr: u8, write_bytes: &[u8], read_len: usize)
        -> Result<Vec<u8>>;

    /// Releases the hardware handle. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// Opens the transport described by `config`.
pub fn open(config: &TransportConfig) -> Result<Box<dyn Transport + Send>> {
    config.validate()?;
    match config {
        TransportConfig::I2c {
            adapter_port,
            bus_speed_khz,
            ..
        } => {
            let transport = crate::i2c::I2cTransport::open(*adapter_port, *bus_speed_khz)?;
            Ok(Box::new(transport))
        }
        TransportConfig::Uart {
            port_name,
            baud_rate,
        } => {
            let transport = crate::uart::UartTransport::open(port_name, *baud_rate)?;
            Ok(Box::new(transport))
        }
    }
}

/// Runs `op`, retrying transient bus faults up to the configured retry
/// count with a short backoff. NAK, PEC, and timeout conditions pass
/// through on the first occurrence.
pub(crate) fn with_retry<T>(name: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Err(e) if e.is_transient() && attempt < timing::TRANSIENT_RETRIES => {
                attempt += 1;
                debug!("{name}: transient fault ({e}), retry {attempt}");
                thread::sleep(Duration::from_millis(timing::RETRY_BACKOFF_MS));
            }
            other => return other,
        }
    }
}
