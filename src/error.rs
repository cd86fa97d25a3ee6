use thiserror::Error;

/// Errors that can occur when talking to a retimer device.
///
/// This enum covers all failure conditions across the stack: adapter and
/// serial-port problems, bus-level NAK/arbitration faults, PEC integrity
/// failures, timeouts, and facade-level misuse. Callers match on the
/// variant; external surfaces can use [`Error::kind`] to build structured
/// `{kind, message}` results.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the underlying HID adapter layer.
    #[error("HID adapter error: {0}")]
    Hid(#[from] hidapi::HidError),
    /// Error from the underlying serial port layer.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    /// General I/O error during adapter communication.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// No retimer responded at the probed address.
    #[error("no retimer found at address 0x{address:02X}")]
    DeviceNotFound {
        /// The I2C address that was probed.
        address: u8,
    },
    /// The slave did not acknowledge the transaction.
    #[error("device at address 0x{address:02X} did not acknowledge (NAK)")]
    Nak {
        /// The I2C address that sent the NAK.
        address: u8,
    },
    /// Transient bus fault (arbitration lost, malformed bridge response).
    /// Retried by the transport layer before surfacing.
    #[error("bus error: {context}")]
    Bus {
        /// What the transport was doing when the fault occurred.
        context: String,
    },
    /// Byte stream could not be reassembled into a valid frame.
    #[error("framing error: {0}")]
    Framing(String),
    /// The configured USB adapter or serial port does not exist.
    #[error("adapter not found: {0}")]
    AdapterNotFound(String),
    /// The adapter exists but is held open by another process.
    #[error("adapter busy: {0}")]
    AdapterBusy(String),
    /// Packet Error Checking failed; the frame may be corrupt on the wire.
    /// Not retried by the framing layer; callers may retry.
    #[error("PEC mismatch: frame carried 0x{expected:02X}, computed 0x{computed:02X}")]
    Pec {
        /// The PEC byte received on the wire.
        expected: u8,
        /// The PEC computed over the received frame contents.
        computed: u8,
    },
    /// An operation exceeded its deadline.
    #[error("operation '{0}' timed out")]
    Timeout(&'static str),
    /// Caller error: a parameter is out of range or an API was misused.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The operation is not implemented by the current firmware.
    #[error("operation '{0}' is not supported by the current firmware")]
    Unsupported(&'static str),
    /// A read-modify-write failed between its read and its write; the
    /// register may hold stale state and callers should re-read.
    #[error("read-modify-write interrupted before register 0x{address:08X} was written")]
    PartialWrite {
        /// Address of the register whose update did not complete.
        address: u32,
    },
    /// The handle does not name a connected device in the registry.
    #[error("unknown device handle {0}")]
    UnknownHandle(u32),
}

impl Error {
    /// Stable discriminator string for structured error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Hid(_) => "hid",
            Error::Serial(_) => "serial",
            Error::Io(_) => "io",
            Error::DeviceNotFound { .. } => "device_not_found",
            Error::Nak { .. } => "nak",
            Error::Bus { .. } => "bus_error",
            Error::Framing(_) => "framing_error",
            Error::AdapterNotFound(_) => "adapter_not_found",
            Error::AdapterBusy(_) => "adapter_busy",
            Error::Pec { .. } => "pec_error",
            Error::Timeout(_) => "timeout",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Unsupported(_) => "unsupported_operation",
            Error::PartialWrite { .. } => "partial_write",
            Error::UnknownHandle(_) => "unknown_handle",
        }
    }

    /// Whether the transport layer may retry the failed transaction.
    /// NAK and PEC failures are deliberate non-candidates.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(self, Error::Bus { .. })
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn bus_error(context: impl Into<String>) -> Error {
    Error::Bus {
        context: context.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings_are_stable() {
        assert_eq!(
            Error::Pec {
                expected: 0x12,
                computed: 0x34
            }
            .kind(),
            "pec_error"
        );
        assert_eq!(Error::Nak { address: 0x50 }.kind(), "nak");
        assert_eq!(Error::Timeout("reset").kind(), "timeout");
        assert_eq!(Error::UnknownHandle(7).kind(), "unknown_handle");
    }

    #[test]
    fn test_only_bus_faults_are_transient() {
        assert!(bus_error("arbitration lost").is_transient());
        assert!(!Error::Nak { address: 0x50 }.is_transient());
        assert!(!Error::Pec {
            expected: 0,
            computed: 1
        }
        .is_transient());
        assert!(!Error::Timeout("i2c transfer").is_transient());
    }
}
