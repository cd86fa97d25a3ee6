//! High-level device facade for a connected retimer.
//!
//! A [`Device`] composes register transactions into whole operations:
//! status aggregation, configuration read-modify-write, reset
//! sequencing, PRBS lifecycle, and eye-diagram capture. Every operation
//! holds the per-device lock for its full duration, so multi-register
//! reads and RMW sequences appear atomic to other callers of the same
//! device.

use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::consts::{reg, timing, BROADCOM_VID, MAX_LANES};
use crate::error::{Error, Result};
use crate::regmap::{self, fields};
use crate::smbus::RegisterBus;
use crate::transport::{Transport, TransportConfig};
use crate::types::{
    check_lane, BifurcationMode, ClockingMode, Configuration, ConfigurationUpdate, DataRate,
    DeviceIdentity, DeviceStatus, ErrorStatistics, EyeCapture, EyeMargins, InterruptEnables,
    InterruptStatus, LaneStatus, LtssmState, PortOrientation, PortStatus, PrbsConfig,
    PrbsLaneStatus, PrbsResult, PrbsState, PrbsStatus, ResetType, TxCoefficients, Voltages,
};

struct DeviceInner {
    bus: RegisterBus,
    prbs_state: PrbsState,
    prbs_config: Option<PrbsConfig>,
}

/// A live handle to one retimer.
///
/// Owns its transport exclusively. The handle is `Send + Sync`; share it
/// with `Arc` and call operations from any thread — they serialize on
/// the internal device lock in FIFO order.
pub struct Device {
    identity: DeviceIdentity,
    slave_address: u8,
    inner: Mutex<DeviceInner>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("identity", &self.identity)
            .field("slave_address", &self.slave_address)
            .finish()
    }
}

/// Reads the identification registers and builds a [`DeviceIdentity`].
/// Fails with [`Error::DeviceNotFound`] when the responder is not a
/// Broadcom retimer.
pub(crate) fn probe_identity(bus: &mut RegisterBus, address: u8) -> Result<DeviceIdentity> {
    let param1 = bus.read_u32(reg::GLOBAL_PARAM1)?;
    let vendor_id = fields::global_param1::VENDOR_ID.extract(param1) as u16;
    if vendor_id != BROADCOM_VID {
        debug!("responder at 0x{address:02X} has vendor 0x{vendor_id:04X}, not a retimer");
        return Err(Error::DeviceNotFound { address });
    }
    let device_id = fields::global_param1::DEVICE_ID.extract(param1) as u8;
    let revision_id = fields::global_param1::REVISION_ID.extract(param1) as u8;

    let xagent = bus.read_u32(reg::XAGENT_INFO_0)?;
    let firmware_major = fields::xagent_info_0::FW_MAJOR.extract(xagent) as u8;
    let firmware_minor = fields::xagent_info_0::FW_MINOR.extract(xagent) as u8;
    let product_id = fields::xagent_info_0::PRODUCT_ID.extract(xagent) as u16;

    let param0 = bus.read_u32(reg::GLOBAL_PARAM0)?;
    let rate_code = fields::global_param0::MAX_DATA_RATE.extract(param0) as u8;
    let max_speed = decode_data_rate(rate_code, "MAX_DATA_RATE");

    Ok(DeviceIdentity {
        vendor_id,
        device_id,
        revision_id,
        firmware_major,
        firmware_minor,
        product_id,
        max_speed,
        product_handle: 0,
        device_address: address,
    })
}

/// Decodes a data rate code, falling back to Gen6 on out-of-table values
/// so status paths never fail on newer firmware.
fn decode_data_rate(code: u8, context: &str) -> DataRate {
    DataRate::from_code(code).unwrap_or_else(|| {
        warn!("{context}: unknown data rate code {code}, assuming Gen6");
        DataRate::Gen6_64g
    })
}

impl Device {
    /// Opens the configured transport, probes the device, and returns a
    /// live handle.
    pub fn open(config: &TransportConfig) -> Result<Self> {
        let transport = crate::transport::open(config)?;
        Self::from_transport(transport, config.slave_address())
    }

    /// Builds a device from an already-open transport. This is the core
    /// constructor the others use; tests hand it a mock transport.
    pub fn from_transport(transport: Box<dyn Transport + Send>, slave_address: u8) -> Result<Self> {
        let mut bus = RegisterBus::new(transport, slave_address);
        let identity = probe_identity(&mut bus, slave_address)?;
        info!(
            "connected to retimer at 0x{:02X}: device 0x{:02X} rev 0x{:02X}, firmware {}",
            slave_address,
            identity.device_id,
            identity.revision_id,
            identity.firmware_version_str()
        );
        Ok(Device {
            identity,
            slave_address,
            inner: Mutex::new(DeviceInner {
                bus,
                prbs_state: PrbsState::Idle,
                prbs_config: None,
            }),
        })
    }

    /// Identification read at connect time.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn slave_address(&self) -> u8 {
        self.slave_address
    }

    pub(crate) fn set_product_handle(&mut self, handle: u32) {
        self.identity.product_handle = handle;
    }

    fn lock_inner(&self) -> MutexGuard<'_, DeviceInner> {
        // A poisoned lock means another caller panicked mid-operation;
        // the register state may be stale but the handle stays usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- Status ---

    /// Reads the full status snapshot: temperature, rails, interrupt
    /// bits, and both pseudo ports with per-lane detail.
    pub fn get_status(&self) -> Result<DeviceStatus> {
        let mut inner = self.lock_inner();
        let (temperature_c, temperature_valid) = read_temperature(&mut inner.bus)?;
        let voltages = read_voltages(&mut inner.bus)?;
        let interrupt_status = read_interrupt_status(&mut inner.bus)?;
        let ppa_status = read_port_status(&mut inner.bus, reg::PPA_LTSSM_STATE)?;
        let ppb_status = read_port_status(&mut inner.bus, reg::PPB_LTSSM_STATE)?;
        Ok(DeviceStatus {
            temperature_c,
            temperature_valid,
            voltages,
            ppa_status,
            ppb_status,
            interrupt_status,
        })
    }

    /// Die temperature in degrees Celsius; 0 when the sensor has no
    /// valid sample yet.
    pub fn get_temperature(&self) -> Result<i16> {
        let mut inner = self.lock_inner();
        let (value, _valid) = read_temperature(&mut inner.bus)?;
        Ok(value)
    }

    /// Supply rail readings.
    pub fn get_voltages(&self) -> Result<Voltages> {
        let mut inner = self.lock_inner();
        read_voltages(&mut inner.bus)
    }

    /// Pending interrupt bits.
    pub fn get_interrupt_status(&self) -> Result<InterruptStatus> {
        let mut inner = self.lock_inner();
        read_interrupt_status(&mut inner.bus)
    }

    // --- Configuration ---

    /// Reads and decodes the current configuration.
    pub fn get_configuration(&self) -> Result<Configuration> {
        let mut inner = self.lock_inner();
        let param0 = inner.bus.read_u32(reg::GLOBAL_PARAM0)?;
        let intr = inner.bus.read_u32(reg::GLOBAL_INTR)?;

        let bifurcation_code = fields::global_param0::BIFURCATION.extract(param0) as u8;
        let bifurcation_mode = BifurcationMode::from_code(bifurcation_code).unwrap_or_else(|| {
            warn!("unknown bifurcation code {bifurcation_code}, assuming x16");
            BifurcationMode::X16
        });
        let clk_code = fields::global_param0::CLK_MODE.extract(param0) as u8;
        let clocking_mode = ClockingMode::from_code(clk_code).unwrap_or_else(|| {
            warn!("unknown clocking mode code {clk_code}, assuming common clock");
            ClockingMode::CommonWoSsc
        });
        let rate_code = fields::global_param0::MAX_DATA_RATE.extract(param0) as u8;
        let orientation = if fields::global_param0::PORT_ORIEN.extract_bool(param0) {
            PortOrientation::Dynamic
        } else {
            PortOrientation::Static
        };

        Ok(Configuration {
            bifurcation_mode,
            max_data_rate: decode_data_rate(rate_code, "MAX_DATA_RATE"),
            clocking_mode,
            port_orientation: orientation,
            interrupt_enables: InterruptEnables {
                global: fields::global_intr::INTR_EN.extract_bool(intr),
                eq_phase_err: fields::global_intr::EQ_PHASE_ERR_EN.extract_bool(intr),
                phy_phase_err: fields::global_intr::PHY_PHASE_ERR_EN.extract_bool(intr),
                internal_err: fields::global_intr::RTMR_INT_ERR_EN.extract_bool(intr),
            },
        })
    }

    /// Applies a partial configuration patch with one read-modify-write
    /// per touched register. Fields absent from `update` are untouched.
    ///
    /// A transport or PEC failure after the first register has been
    /// written surfaces as [`Error::PartialWrite`]; the caller should
    /// re-read the configuration before retrying.
    pub fn set_configuration(&self, update: &ConfigurationUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        let mut inner = self.lock_inner();
        let mut written_any = false;

        if update.touches_param0() {
            let current = inner.bus.read_u32(reg::GLOBAL_PARAM0)?;
            let mut value = current;
            if let Some(mode) = update.bifurcation_mode {
                value = fields::global_param0::BIFURCATION.insert(value, mode.code() as u32)?;
            }
            if let Some(rate) = update.max_data_rate {
                value = fields::global_param0::MAX_DATA_RATE.insert(value, rate.code() as u32)?;
            }
            if let Some(clk) = update.clocking_mode {
                value = fields::global_param0::CLK_MODE.insert(value, clk.code() as u32)?;
            }
            if let Some(orientation) = update.port_orientation {
                value =
                    fields::global_param0::PORT_ORIEN.insert(value, orientation.code() as u32)?;
            }
            inner
                .bus
                .write_u32(reg::GLOBAL_PARAM0, value)
                .map_err(|e| {
                    warn!("GLOBAL_PARAM0 write failed mid-update: {e}");
                    Error::PartialWrite {
                        address: reg::GLOBAL_PARAM0,
                    }
                })?;
            written_any = true;
        }

        if let Some(enables) = update.interrupt_enables {
            let current = match inner.bus.read_u32(reg::GLOBAL_INTR) {
                Ok(v) => v,
                Err(e) if written_any => {
                    warn!("GLOBAL_INTR read failed mid-update: {e}");
                    return Err(Error::PartialWrite {
                        address: reg::GLOBAL_INTR,
                    });
                }
                Err(e) => return Err(e),
            };
            let mut value = current;
            value = fields::global_intr::INTR_EN.insert_bool(value, enables.global)?;
            value = fields::global_intr::EQ_PHASE_ERR_EN.insert_bool(value, enables.eq_phase_err)?;
            value =
                fields::global_intr::PHY_PHASE_ERR_EN.insert_bool(value, enables.phy_phase_err)?;
            value = fields::global_intr::RTMR_INT_ERR_EN.insert_bool(value, enables.internal_err)?;
            inner.bus.write_u32(reg::GLOBAL_INTR, value).map_err(|e| {
                warn!("GLOBAL_INTR write failed mid-update: {e}");
                Error::PartialWrite {
                    address: reg::GLOBAL_INTR,
                }
            })?;
        }

        info!(
            "configuration updated at 0x{:02X}: {:?}",
            self.slave_address, update
        );
        Ok(())
    }

    // --- Reset ---

    /// Writes RESET_CTRL with exactly one bit set, then waits for the
    /// device to answer again. The device may NAK for up to 500 ms after
    /// the write; the facade settles 200 ms and then polls XAGENT_INFO_0
    /// every 50 ms until a read succeeds or 5 s elapse.
    ///
    /// Soft and global-software resets preserve configuration; no state
    /// is re-applied here.
    pub fn reset(&self, kind: ResetType) -> Result<()> {
        let mut inner = self.lock_inner();
        let deadline = Instant::now() + Duration::from_millis(timing::RESET_DEADLINE_MS);
        let value = 1u32 << kind.ctrl_bit();
        inner.bus.write_u32(reg::RESET_CTRL, value)?;
        info!("reset ({kind:?}) issued at 0x{:02X}", self.slave_address);

        // Any in-flight PRBS run does not survive a reset.
        inner.prbs_state = PrbsState::Idle;
        inner.prbs_config = None;

        thread::sleep(Duration::from_millis(timing::RESET_SETTLE_MS));
        loop {
            match inner.bus.read_u32(reg::XAGENT_INFO_0) {
                Ok(_) => {
                    debug!("device back after {kind:?} reset");
                    return Ok(());
                }
                Err(e) => {
                    if Instant::now() >= deadline {
                        warn!("device did not return from {kind:?} reset: {e}");
                        return Err(Error::Timeout("reset"));
                    }
                    thread::sleep(Duration::from_millis(timing::RESET_POLL_MS));
                }
            }
        }
    }

    // --- Raw register access ---

    /// Reads a register directly. `width_bits` must be 16 or 32.
    pub fn read_register(&self, address: u32, width_bits: u8) -> Result<u32> {
        let mut inner = self.lock_inner();
        match width_bits {
            16 => Ok(inner.bus.read_u16(address)? as u32),
            32 => inner.bus.read_u32(address),
            other => Err(Error::InvalidArgument(format!(
                "register width must be 16 or 32 bits, got {other}"
            ))),
        }
    }

    /// Writes a register directly. `width_bits` must be 16 or 32 and
    /// `value` must fit the width.
    pub fn write_register(&self, address: u32, value: u32, width_bits: u8) -> Result<()> {
        let mut inner = self.lock_inner();
        match width_bits {
            16 => {
                if value > u16::MAX as u32 {
                    return Err(Error::InvalidArgument(format!(
                        "value 0x{value:08X} does not fit a 16-bit register"
                    )));
                }
                inner.bus.write_u16(address, value as u16)
            }
            32 => inner.bus.write_u32(address, value),
            other => Err(Error::InvalidArgument(format!(
                "register width must be 16 or 32 bits, got {other}"
            ))),
        }
    }

    // --- PRBS lifecycle ---

    /// Configures the per-lane generators/checkers and asserts the
    /// global start bit. Allowed from `Idle` and `Stopped` only.
    pub fn start_prbs(&self, config: &PrbsConfig) -> Result<()> {
        if config.lanes.is_empty() {
            return Err(Error::InvalidArgument("no PRBS lanes selected".into()));
        }
        let mut seen = 0u16;
        for &lane in &config.lanes {
            check_lane(lane)?;
            if seen & (1 << lane) != 0 {
                return Err(Error::InvalidArgument(format!(
                    "lane {lane} listed more than once"
                )));
            }
            seen |= 1 << lane;
        }
        if config.sample_count == 0 {
            return Err(Error::InvalidArgument(
                "PRBS sample count must be non-zero".into(),
            ));
        }

        let mut inner = self.lock_inner();
        match inner.prbs_state {
            PrbsState::Idle | PrbsState::Stopped => {}
            state => {
                return Err(Error::InvalidArgument(format!(
                    "prbs test already in progress (state {state:?})"
                )));
            }
        }

        match configure_and_start_prbs(&mut inner.bus, config) {
            Ok(()) => {
                inner.prbs_state = PrbsState::Running;
                inner.prbs_config = Some(config.clone());
                info!(
                    "PRBS started on lanes {:?} ({:?} at Gen{})",
                    config.lanes,
                    config.pattern,
                    config.data_rate.generation()
                );
                Ok(())
            }
            Err(e) => {
                inner.prbs_state = PrbsState::Idle;
                inner.prbs_config = None;
                Err(e)
            }
        }
    }

    /// Current lifecycle state and per-lane checker progress. Allowed in
    /// any state; with no test configured the lane list is empty.
    pub fn get_prbs_status(&self) -> Result<PrbsStatus> {
        let mut inner = self.lock_inner();
        let lanes = match inner.prbs_config.clone() {
            None => Vec::new(),
            Some(config) => {
                let mut lanes = Vec::with_capacity(config.lanes.len());
                for &lane in &config.lanes {
                    let address =
                        regmap::prbs_lane_address(lane, reg::prbs::LANE_STATUS_OFFSET)?;
                    let status = inner.bus.read_u32(address)?;
                    lanes.push(PrbsLaneStatus {
                        lane_number: lane,
                        sync_acquired: fields::prbs_lane_status::SYNC.extract_bool(status),
                        test_complete: fields::prbs_lane_status::DONE.extract_bool(status),
                    });
                }
                lanes
            }
        };
        Ok(PrbsStatus {
            state: inner.prbs_state,
            lanes,
        })
    }

    /// Reads per-lane bit and error counters. Allowed while `Running` or
    /// after `stop_prbs`.
    pub fn get_prbs_results(&self) -> Result<Vec<PrbsResult>> {
        let mut inner = self.lock_inner();
        if !matches!(inner.prbs_state, PrbsState::Running | PrbsState::Stopped) {
            return Err(Error::InvalidArgument("prbs not started".into()));
        }
        let config = inner
            .prbs_config
            .clone()
            .ok_or_else(|| Error::InvalidArgument("prbs not started".into()))?;

        let mut results = Vec::with_capacity(config.lanes.len());
        for &lane in &config.lanes {
            let bit_lo = inner
                .bus
                .read_u32(regmap::prbs_lane_address(lane, reg::prbs::LANE_BIT_COUNT_LO_OFFSET)?)?;
            let bit_hi = inner
                .bus
                .read_u32(regmap::prbs_lane_address(lane, reg::prbs::LANE_BIT_COUNT_HI_OFFSET)?)?;
            let err_lo = inner
                .bus
                .read_u32(regmap::prbs_lane_address(lane, reg::prbs::LANE_ERR_COUNT_LO_OFFSET)?)?;
            let err_hi = inner
                .bus
                .read_u32(regmap::prbs_lane_address(lane, reg::prbs::LANE_ERR_COUNT_HI_OFFSET)?)?;
            results.push(PrbsResult {
                lane_number: lane,
                bit_count: (bit_hi as u64) << 32 | bit_lo as u64,
                error_count: (err_hi as u64) << 32 | err_lo as u64,
            });
        }
        Ok(results)
    }

    /// Clears the global start bit. Allowed while `Running`.
    pub fn stop_prbs(&self) -> Result<()> {
        let mut inner = self.lock_inner();
        if inner.prbs_state != PrbsState::Running {
            return Err(Error::InvalidArgument("prbs not running".into()));
        }
        let ctrl = inner.bus.read_u32(reg::prbs::GLOBAL_CTRL)?;
        let cleared = fields::prbs_global_ctrl::START.insert(ctrl, 0)?;
        inner.bus.write_u32(reg::prbs::GLOBAL_CTRL, cleared)?;
        inner.prbs_state = PrbsState::Stopped;
        info!("PRBS stopped at 0x{:02X}", self.slave_address);
        Ok(())
    }

    // --- Eye diagram ---

    /// Triggers a single-shot eye capture on one lane and blocks until
    /// the margins are valid (up to 10 s).
    ///
    /// At Gen6 the PAM4 signaling yields three eyes and `lower_eye` /
    /// `upper_eye` are populated; below Gen6 only the middle eye exists.
    pub fn eye_diagram(&self, lane: u8, data_rate: DataRate) -> Result<EyeCapture> {
        check_lane(lane)?;
        let mut inner = self.lock_inner();

        let mut ctrl = fields::eye_ctrl::LANE.insert(0, lane as u32)?;
        ctrl = fields::eye_ctrl::RATE.insert(ctrl, data_rate.code() as u32)?;
        ctrl = fields::eye_ctrl::START.insert(ctrl, 1)?;
        inner.bus.write_u32(reg::eye::CTRL, ctrl)?;
        debug!("eye capture triggered on lane {lane} at Gen{}", data_rate.generation());

        let deadline = Instant::now() + Duration::from_millis(timing::EYE_DEADLINE_MS);
        loop {
            let status = inner.bus.read_u32(reg::eye::STATUS)?;
            if fields::eye_status::VALID.extract_bool(status) {
                break;
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout("eye capture"));
            }
            thread::sleep(Duration::from_millis(timing::EYE_POLL_MS));
        }

        let middle_eye = read_eye_margins(&mut inner.bus, reg::eye::MIDDLE_H, reg::eye::MIDDLE_V)?;
        let (lower_eye, upper_eye) = if data_rate == DataRate::Gen6_64g {
            (
                Some(read_eye_margins(&mut inner.bus, reg::eye::LOWER_H, reg::eye::LOWER_V)?),
                Some(read_eye_margins(&mut inner.bus, reg::eye::UPPER_H, reg::eye::UPPER_V)?),
            )
        } else {
            (None, None)
        };

        Ok(EyeCapture {
            lane_number: lane,
            data_rate,
            capture_valid: true,
            middle_eye,
            lower_eye,
            upper_eye,
        })
    }

    // --- Lane diagnostics ---

    /// Receiver error counters for one lane.
    pub fn error_statistics(&self, lane: u8) -> Result<ErrorStatistics> {
        let mut inner = self.lock_inner();
        let mut counters = [0u32; reg::ERROR_STATS_COUNTERS as usize];
        for (i, counter) in counters.iter_mut().enumerate() {
            *counter = inner
                .bus
                .read_u32(regmap::error_stats_address(lane, i as u8)?)?;
        }
        Ok(ErrorStatistics {
            lane_number: lane,
            invalid_symbol: counters[0],
            symbol_lock_loss: counters[1],
            elastic_buffer_error: counters[2],
            lane_deskew_error: counters[3],
            block_alignment_loss: counters[4],
            block_header_error: counters[5],
            sos_block_error: counters[6],
        })
    }

    /// TX equalization settings for one (generation, lane) pair.
    /// Coefficients exist for Gen3 and above.
    pub fn tx_coefficients(&self, rate: DataRate, lane: u8) -> Result<TxCoefficients> {
        let address = regmap::tx_coeff_address(rate, lane)?;
        let mut inner = self.lock_inner();
        let raw = inner.bus.read_u32(address)?;
        Ok(TxCoefficients {
            tx_preset: fields::tx_coeff::PRESET.extract(raw) as u8,
            tx_pre_cursor: fields::tx_coeff::PRE_CURSOR.extract(raw) as u8,
            tx_cursor: fields::tx_coeff::CURSOR.extract(raw) as u8,
            tx_post_cursor: fields::tx_coeff::POST_CURSOR.extract(raw) as u8,
            tx_preset_sel: fields::tx_coeff::PRESET_SEL.extract_bool(raw),
            tx_precode_req: fields::tx_coeff::PRECODE_REQ.extract_bool(raw),
        })
    }

    // --- Capture engines not implemented by current firmware ---

    /// Embedded logic analyzer capture. Unsupported by current firmware.
    pub fn start_ela_capture(&self) -> Result<()> {
        Err(Error::Unsupported("ela capture"))
    }

    /// Broadcom embedded logic analyzer capture. Unsupported by current
    /// firmware.
    pub fn start_bela_capture(&self) -> Result<()> {
        Err(Error::Unsupported("bela capture"))
    }

    /// LinkCAT channel analysis. Unsupported by current firmware.
    pub fn start_linkcat(&self) -> Result<()> {
        Err(Error::Unsupported("linkcat analysis"))
    }

    /// Releases the transport. Idempotent; subsequent operations fail.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.lock_inner();
        inner.bus.close()
    }
}

fn read_temperature(bus: &mut RegisterBus) -> Result<(i16, bool)> {
    let raw = bus.read_u32(reg::TEMPERATURE)?;
    let valid = fields::temperature::VALID.extract_bool(raw);
    if !valid {
        warn!("temperature sensor has no valid sample");
        return Ok((0, false));
    }
    let value = fields::temperature::VALUE.extract(raw) as u16 as i16;
    Ok((value, true))
}

fn read_voltages(bus: &mut RegisterBus) -> Result<Voltages> {
    let mut rail = |address: u32| -> Result<u16> {
        Ok(fields::voltage::VALUE.extract(bus.read_u32(address)?) as u16)
    };
    Ok(Voltages {
        dvdd1_mv: rail(reg::VOLTAGE_DVDD1)?,
        dvdd2_mv: rail(reg::VOLTAGE_DVDD2)?,
        dvdd3_mv: rail(reg::VOLTAGE_DVDD3)?,
        dvdd4_mv: rail(reg::VOLTAGE_DVDD4)?,
        dvdd5_mv: rail(reg::VOLTAGE_DVDD5)?,
        dvdd6_mv: rail(reg::VOLTAGE_DVDD6)?,
        dvddio_mv: rail(reg::VOLTAGE_DVDDIO)?,
    })
}

fn read_interrupt_status(bus: &mut RegisterBus) -> Result<InterruptStatus> {
    let raw = bus.read_u32(reg::GLOBAL_INTR)?;
    Ok(InterruptStatus {
        global: fields::global_intr::INTR_STS.extract_bool(raw),
        eq_phase_err: fields::global_intr::EQ_PHASE_ERR_STS.extract_bool(raw),
        phy_phase_err: fields::global_intr::PHY_PHASE_ERR_STS.extract_bool(raw),
        internal_err: fields::global_intr::RTMR_INT_ERR_STS.extract_bool(raw),
    })
}

fn read_port_status(bus: &mut RegisterBus, base: u32) -> Result<PortStatus> {
    let raw = bus.read_u32(base)?;
    let state_code = fields::ltssm_state::CURRENT_STATE.extract(raw) as u8;
    let speed_code = fields::ltssm_state::LINK_SPEED.extract(raw) as u8;
    let width = fields::ltssm_state::LINK_WIDTH.extract(raw) as u8;
    let forwarding = fields::ltssm_state::FORWARDING_MODE.extract_bool(raw);

    let rx_detect = bus.read_u32(base + reg::LANE_RX_DETECT_OFFSET)?;
    let tx_eq_done = bus.read_u32(base + reg::LANE_TX_EQ_DONE_OFFSET)?;
    let rx_eq_done = bus.read_u32(base + reg::LANE_RX_EQ_DONE_OFFSET)?;
    let lane_status = (0..MAX_LANES)
        .map(|lane| LaneStatus {
            lane_number: lane,
            rx_detect: rx_detect & (1 << lane) != 0,
            tx_eq_done: tx_eq_done & (1 << lane) != 0,
            rx_eq_done: rx_eq_done & (1 << lane) != 0,
        })
        .collect();

    Ok(PortStatus {
        current_ltssm_state: LtssmState::from_raw(state_code),
        current_link_speed: decode_data_rate(speed_code, "LINK_SPEED"),
        current_link_width: width,
        forwarding_mode: forwarding,
        lane_status,
    })
}

fn read_eye_margins(bus: &mut RegisterBus, h_addr: u32, v_addr: u32) -> Result<EyeMargins> {
    let h = bus.read_u32(h_addr)?;
    let v = bus.read_u32(v_addr)?;
    Ok(EyeMargins {
        left_margin_mui: fields::eye_margin_h::LEFT.extract(h) as u16,
        right_margin_mui: fields::eye_margin_h::RIGHT.extract(h) as u16,
        upper_margin_mv: fields::eye_margin_v::UPPER.extract(v) as u16,
        lower_margin_mv: fields::eye_margin_v::LOWER.extract(v) as u16,
    })
}

/// Writes the per-lane PRBS configuration, asserts the global start bit,
/// and confirms the assertion within the 500 ms budget.
fn configure_and_start_prbs(bus: &mut RegisterBus, config: &PrbsConfig) -> Result<()> {
    for &lane in &config.lanes {
        let mut ctrl = fields::prbs_lane_ctrl::GEN_EN.insert(0, 1)?;
        ctrl = fields::prbs_lane_ctrl::CHK_EN.insert(ctrl, 1)?;
        ctrl = fields::prbs_lane_ctrl::PATTERN.insert(ctrl, config.pattern.code() as u32)?;
        ctrl = fields::prbs_lane_ctrl::RATE.insert(ctrl, config.data_rate.code() as u32)?;
        bus.write_u32(
            regmap::prbs_lane_address(lane, reg::prbs::LANE_CTRL_OFFSET)?,
            ctrl,
        )?;
        bus.write_u32(
            regmap::prbs_lane_address(lane, reg::prbs::LANE_SAMPLE_COUNT_OFFSET)?,
            config.sample_count,
        )?;
    }

    let ctrl = bus.read_u32(reg::prbs::GLOBAL_CTRL)?;
    let started = fields::prbs_global_ctrl::START.insert(ctrl, 1)?;
    bus.write_u32(reg::prbs::GLOBAL_CTRL, started)?;

    let deadline = Instant::now() + Duration::from_millis(timing::PRBS_START_DEADLINE_MS);
    loop {
        let readback = bus.read_u32(reg::prbs::GLOBAL_CTRL)?;
        if fields::prbs_global_ctrl::START.extract_bool(readback) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::Timeout("prbs start"));
        }
        thread::sleep(Duration::from_millis(timing::PRBS_START_POLL_MS));
    }
}
