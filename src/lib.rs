//! # Phoenix Retimer Control
//!
//! Host-side control plane for 16-lane PCIe Gen6 retimer chips reached
//! over an I2C/SMBus or UART side channel. The crate provides device
//! discovery, configuration, status monitoring, and link diagnostics on
//! top of a reliable byte transport with SMBus-style framing and Packet
//! Error Checking (PEC).
//!
//! ## Architecture
//!
//! The stack is layered, leaves first:
//!
//! - [`transport`] — byte-level duplex to one physical adapter, with
//!   timeouts and retry on transient bus faults. Two implementations:
//!   [`i2c::I2cTransport`] over an FT232H-class USB-to-I2C bridge and
//!   [`uart::UartTransport`] over a length-framed serial protocol.
//! - [`smbus`] — SMBus command framing with CRC-8 PEC ([`pec`]), and
//!   the typed `read_u16`/`read_u32`/`write_u16`/`write_u32` register
//!   primitives. All multi-byte values are little-endian on the wire.
//! - [`regmap`] — the static register catalog with typed bitfield
//!   extraction and insertion. Pure computation.
//! - [`device`] — the per-device facade: status aggregation,
//!   configuration read-modify-write, reset sequencing, PRBS lifecycle,
//!   and eye-diagram capture, serialized by a per-device lock.
//! - [`discovery`] / [`registry`] — bus probing and the process-wide
//!   handle table consumed by CLI/HTTP/UI surfaces.
//!
//! ## Quick Start
//!
//! ```no_run
//! use phoenix_retimer::{discover, DeviceRegistry, TransportConfig};
//!
//! # fn main() -> phoenix_retimer::Result<()> {
//! let config = TransportConfig::I2c {
//!     adapter_port: 0,
//!     bus_speed_khz: 400,
//!     slave_address: 0x50,
//! };
//!
//! // Scan the strap range for retimers.
//! for identity in discover(&config, &[0x50, 0x51, 0x52])? {
//!     println!(
//!         "found device 0x{:02X} at 0x{:02X}, firmware {}",
//!         identity.device_id,
//!         identity.device_address,
//!         identity.firmware_version_str()
//!     );
//! }
//!
//! // Connect and query status.
//! let registry = DeviceRegistry::new();
//! let handle = registry.connect(&config)?;
//! let device = registry.get(handle)?;
//! let status = device.get_status()?;
//! println!(
//!     "{} degC, link up: {}",
//!     status.temperature_c,
//!     status.ppa_status.is_link_up()
//! );
//! registry.disconnect(handle)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! A [`Device`] is `Send + Sync`; operations from multiple threads
//! serialize on the per-device lock in FIFO order, so a status read
//! never observes a half-applied configuration update. Distinct devices
//! proceed independently. The registry lock guards only the handle
//! table and is never held across I/O.
//!
//! Cancelling a thread mid-operation (e.g. between the read and write
//! of a configuration update) can leave the device in an intermediate
//! register state; callers that abort operations should re-read the
//! configuration before continuing.
//!
//! ## Error Handling
//!
//! All operations return [`Result`] with a single [`Error`] sum type.
//! Transient bus faults are retried inside the transport (twice, 10 ms
//! backoff); NAK and PEC failures are surfaced without retry so callers
//! can decide. [`Error::kind`] yields a stable discriminator string for
//! structured reporting.
//!
//! ## Testing Without Hardware
//!
//! [`mock::MockBus`] provides a frame-accurate mock transport backed by
//! a programmable register map, with fault injection for NAK, bus
//! error, and PEC corruption scenarios. Devices built on it behave
//! byte-for-byte like devices on real silicon.
//!
//! ## Logging
//!
//! The crate logs through the `log` facade: transaction summaries at
//! `debug`, raw buffers at `trace`, anomalies at `warn`. Initialize any
//! logger (e.g. `env_logger`) in the host application to see them.

// Internal modules
mod consts;
mod error;

// Public modules
pub mod device;
pub mod discovery;
pub mod i2c;
pub mod mock;
pub mod pec;
pub mod regmap;
pub mod registry;
pub mod smbus;
pub mod transport;
pub mod types;
pub mod uart;

// Re-export main types and functions
pub use device::Device;
pub use discovery::{discover, discover_default, discover_with};
pub use error::{Error, Result};
pub use registry::DeviceRegistry;
pub use smbus::RegisterBus;
pub use transport::{Transport, TransportConfig, TransportKind};
pub use types::{
    BifurcationMode, ClockingMode, Configuration, ConfigurationUpdate, DataRate, DeviceIdentity,
    DeviceStatus, ErrorStatistics, EyeCapture, EyeMargins, InterruptEnables, InterruptStatus,
    LaneStatus, LtssmState, PortOrientation, PortStatus, PrbsConfig, PrbsLaneStatus, PrbsPattern,
    PrbsResult, PrbsState, PrbsStatus, ResetType, TxCoefficients, Voltages,
};

// Re-export essential protocol constants
pub use consts::{BROADCOM_VID, DEFAULT_SLAVE_ADDRESSES, MAX_LANES};

/// Register addresses and protocol constants for callers that drive the
/// raw register interface.
pub mod registers {
    pub use crate::consts::cmd;
    pub use crate::consts::reg::*;
}
