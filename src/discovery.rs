//! Discovery engine: probes a bus for retimer responders.

use log::{debug, info};

use crate::consts::DEFAULT_SLAVE_ADDRESSES;
use crate::device::probe_identity;
use crate::error::{Error, Result};
use crate::smbus::RegisterBus;
use crate::transport::{self, Transport, TransportConfig};
use crate::types::DeviceIdentity;

/// Probes `addresses` (sorted, deduplicated) on the configured bus and
/// returns the identities of all retimers that answered.
///
/// Each address is probed through a transient transport that is closed
/// before the next probe. An address that NAKs, fails PEC, or answers
/// with a foreign vendor ID is silently skipped; any other transport
/// error aborts the scan.
pub fn discover(config: &TransportConfig, addresses: &[u8]) -> Result<Vec<DeviceIdentity>> {
    discover_with(config, addresses, transport::open)
}

/// [`discover`] over the default strap range 0x50-0x57.
pub fn discover_default(config: &TransportConfig) -> Result<Vec<DeviceIdentity>> {
    discover(config, &DEFAULT_SLAVE_ADDRESSES)
}

/// Discovery with an injectable transport opener, for probing through
/// custom adapters or a mock bus.
pub fn discover_with<F>(
    config: &TransportConfig,
    addresses: &[u8],
    mut open: F,
) -> Result<Vec<DeviceIdentity>>
where
    F: FnMut(&TransportConfig) -> Result<Box<dyn Transport + Send>>,
{
    let mut sorted: Vec<u8> = addresses.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    info!(
        "discovery started over {} addresses: {:02X?}",
        sorted.len(),
        sorted
    );
    let mut found = Vec::new();
    for address in sorted {
        let probe_config = config.with_slave_address(address);
        probe_config.validate()?;
        let transport = open(&probe_config)?;
        let mut bus = RegisterBus::new(transport, address);

        let outcome = probe_identity(&mut bus, address);
        let _ = bus.close();

        match outcome {
            Ok(identity) => {
                info!(
                    "retimer at 0x{address:02X}: device 0x{:02X}, firmware {}",
                    identity.device_id,
                    identity.firmware_version_str()
                );
                found.push(identity);
            }
            Err(e) if probe_skippable(&e) => {
                debug!("no retimer at 0x{address:02X}: {e}");
            }
            Err(e) => {
                debug!("discovery aborted at 0x{address:02X}: {e}");
                return Err(e);
            }
        }
    }
    info!("discovery complete: {} device(s)", found.len());
    Ok(found)
}

/// Probe outcomes that mean "nothing here" rather than "the scan is
/// broken": no ACK, wire corruption, or a non-retimer responder.
fn probe_skippable(e: &Error) -> bool {
    matches!(
        e,
        Error::Nak { .. } | Error::Pec { .. } | Error::DeviceNotFound { .. }
    )
}
