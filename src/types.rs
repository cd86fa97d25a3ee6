//! Protocol enumerations and data models for the retimer.

use crate::error::{Error, Result};

/// PCIe data rate (link generation).
///
/// The wire encoding matches the LINK_SPEED and MAX_DATA_RATE register
/// fields: Gen1 is code 0 through Gen6 at code 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum DataRate {
    Gen1_2p5g = 0,
    Gen2_5g = 1,
    Gen3_8g = 2,
    Gen4_16g = 3,
    Gen5_32g = 4,
    Gen6_64g = 5,
}

impl DataRate {
    pub const ALL: [Self; 6] = [
        Self::Gen1_2p5g,
        Self::Gen2_5g,
        Self::Gen3_8g,
        Self::Gen4_16g,
        Self::Gen5_32g,
        Self::Gen6_64g,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// PCIe generation number (1-6).
    pub fn generation(self) -> u8 {
        self as u8 + 1
    }

    /// Raw symbol rate in GT/s.
    pub fn speed_gt_s(self) -> f32 {
        match self {
            Self::Gen1_2p5g => 2.5,
            Self::Gen2_5g => 5.0,
            Self::Gen3_8g => 8.0,
            Self::Gen4_16g => 16.0,
            Self::Gen5_32g => 32.0,
            Self::Gen6_64g => 64.0,
        }
    }
}

/// Lane partitioning of the 16-lane retimer into independent links.
///
/// Codes 0-32 match the documented bifurcation table; variant names list
/// the link widths in lane order.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BifurcationMode {
    X16 = 0,
    X8,
    X4,
    X8_X8,
    X8_X4_X4,
    X4_X4_X8,
    X4_X4_X4_X4,
    X2_X2_X2_X2_X2_X2_X2_X2,
    X8_X4_X2_X2,
    X8_X2_X2_X4,
    X2_X2_X4_X8,
    X4_X2_X2_X8,
    X2_X2_X2_X2_X8,
    X8_X2_X2_X2_X2,
    X2_X2_X4_X4_X4,
    X4_X2_X2_X4_X4,
    X4_X4_X2_X2_X4,
    X4_X4_X4_X2_X2,
    X2_X2_X2_X2_X4_X4,
    X2_X2_X4_X2_X2_X4,
    X4_X2_X2_X2_X2_X4,
    X2_X2_X4_X4_X2_X2,
    X4_X2_X2_X4_X2_X2,
    X4_X4_X2_X2_X2_X2,
    X2_X2_X2_X2_X2_X2_X4,
    X2_X2_X2_X2_X4_X2_X2,
    X2_X2_X4_X2_X2_X2_X2,
    X4_X2_X2_X2_X2_X2_X2,
    X4_X4,
    X2_X2_X4,
    X4_X2_X2,
    X2_X2_X2_X2,
    X2_X2,
}

impl BifurcationMode {
    pub const ALL: [Self; 33] = [
        Self::X16,
        Self::X8,
        Self::X4,
        Self::X8_X8,
        Self::X8_X4_X4,
        Self::X4_X4_X8,
        Self::X4_X4_X4_X4,
        Self::X2_X2_X2_X2_X2_X2_X2_X2,
        Self::X8_X4_X2_X2,
        Self::X8_X2_X2_X4,
        Self::X2_X2_X4_X8,
        Self::X4_X2_X2_X8,
        Self::X2_X2_X2_X2_X8,
        Self::X8_X2_X2_X2_X2,
        Self::X2_X2_X4_X4_X4,
        Self::X4_X2_X2_X4_X4,
        Self::X4_X4_X2_X2_X4,
        Self::X4_X4_X4_X2_X2,
        Self::X2_X2_X2_X2_X4_X4,
        Self::X2_X2_X4_X2_X2_X4,
        Self::X4_X2_X2_X2_X2_X4,
        Self::X2_X2_X4_X4_X2_X2,
        Self::X4_X2_X2_X4_X2_X2,
        Self::X4_X4_X2_X2_X2_X2,
        Self::X2_X2_X2_X2_X2_X2_X4,
        Self::X2_X2_X2_X2_X4_X2_X2,
        Self::X2_X2_X4_X2_X2_X2_X2,
        Self::X4_X2_X2_X2_X2_X2_X2,
        Self::X4_X4,
        Self::X2_X2_X4,
        Self::X4_X2_X2,
        Self::X2_X2_X2_X2,
        Self::X2_X2,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Total lanes consumed by this partitioning.
    pub fn total_lanes(self) -> u8 {
        match self {
            Self::X4 | Self::X2_X2 => 4,
            Self::X8
            | Self::X4_X4
            | Self::X2_X2_X4
            | Self::X4_X2_X2
            | Self::X2_X2_X2_X2 => 8,
            _ => 16,
        }
    }
}

/// Reference clock distribution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ClockingMode {
    /// Common clock, no SSC.
    CommonWoSsc = 0,
    /// Common clock with SSC.
    CommonSsc = 1,
    /// Separate reference, no SSC.
    SrnsWoSsc = 2,
    /// SRIS with SSC.
    SrisSsc = 3,
    /// SRIS, no SSC.
    SrisWoSsc = 4,
    /// SRIS, no SSC, low latency.
    SrisWoSscLl = 5,
}

impl ClockingMode {
    pub const ALL: [Self; 6] = [
        Self::CommonWoSsc,
        Self::CommonSsc,
        Self::SrnsWoSsc,
        Self::SrisSsc,
        Self::SrisWoSsc,
        Self::SrisWoSscLl,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// PPA/PPB assignment policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PortOrientation {
    /// PPA and PPB are predefined by strapping.
    Static = 0,
    /// PPA and PPB are assigned dynamically at link-up.
    Dynamic = 1,
}

impl PortOrientation {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Static),
            1 => Some(Self::Dynamic),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Reset operations, each driving one bit of RESET_CTRL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetType {
    /// Entire chip including all registers.
    Hard,
    /// Everything except sticky registers.
    Soft,
    /// Global MAC software reset.
    Mac,
    /// PERST fundamental reset.
    Perst,
    /// Toggle the global software link reset.
    GlobalSwrst,
}

impl ResetType {
    /// Bit position in RESET_CTRL (one-hot).
    pub fn ctrl_bit(self) -> u32 {
        match self {
            Self::Hard => 0,
            Self::Soft => 1,
            Self::Mac => 2,
            Self::Perst => 3,
            Self::GlobalSwrst => 4,
        }
    }

    /// Whether device configuration survives this reset.
    pub fn preserves_configuration(self) -> bool {
        matches!(self, Self::Soft | Self::GlobalSwrst)
    }
}

/// Link Training and Status State Machine state.
///
/// The documented state table is incomplete; codes outside it decode to
/// [`LtssmState::Unknown`] so status readouts never fail on new firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LtssmState {
    Detect,
    RateChange,
    FwdForwarding,
    FwdHotReset,
    FwdDisable,
    FwdLoopback,
    FwdCplRcv,
    FwdEnterCpl,
    FwdPmL11,
    ExeClbEntry,
    ExeClbPattern,
    ExeClbExit,
    ExeEqPh2Active,
    ExeEqPh2Passive,
    ExeEqPh3Active,
    ExeEqPh3Passive,
    ExeEqForceTimeout,
    ExeSlaveLpbkEntry,
    ExeSlaveLpbkActive,
    ExeSlaveLpbkExit,
    Unknown(u8),
}

impl LtssmState {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x00 => Self::Detect,
            0x03 => Self::RateChange,
            0x04 => Self::FwdForwarding,
            0x05 => Self::FwdHotReset,
            0x06 => Self::FwdDisable,
            0x07 => Self::FwdLoopback,
            0x08 => Self::FwdCplRcv,
            0x09 => Self::FwdEnterCpl,
            0x0A => Self::FwdPmL11,
            0x10 => Self::ExeClbEntry,
            0x11 => Self::ExeClbPattern,
            0x12 => Self::ExeClbExit,
            0x14 => Self::ExeEqPh2Active,
            0x15 => Self::ExeEqPh2Passive,
            0x16 => Self::ExeEqPh3Active,
            0x17 => Self::ExeEqPh3Passive,
            0x18 => Self::ExeEqForceTimeout,
            0x1C => Self::ExeSlaveLpbkEntry,
            0x1D => Self::ExeSlaveLpbkActive,
            0x1E => Self::ExeSlaveLpbkExit,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Self::Detect => 0x00,
            Self::RateChange => 0x03,
            Self::FwdForwarding => 0x04,
            Self::FwdHotReset => 0x05,
            Self::FwdDisable => 0x06,
            Self::FwdLoopback => 0x07,
            Self::FwdCplRcv => 0x08,
            Self::FwdEnterCpl => 0x09,
            Self::FwdPmL11 => 0x0A,
            Self::ExeClbEntry => 0x10,
            Self::ExeClbPattern => 0x11,
            Self::ExeClbExit => 0x12,
            Self::ExeEqPh2Active => 0x14,
            Self::ExeEqPh2Passive => 0x15,
            Self::ExeEqPh3Active => 0x16,
            Self::ExeEqPh3Passive => 0x17,
            Self::ExeEqForceTimeout => 0x18,
            Self::ExeSlaveLpbkEntry => 0x1C,
            Self::ExeSlaveLpbkActive => 0x1D,
            Self::ExeSlaveLpbkExit => 0x1E,
            Self::Unknown(raw) => raw,
        }
    }
}

/// PRBS polynomial patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PrbsPattern {
    Prbs7 = 0,
    Prbs9 = 1,
    Prbs10 = 2,
    Prbs11 = 3,
    Prbs13 = 4,
    Prbs15 = 5,
    Prbs20 = 6,
    Prbs23 = 7,
    Prbs31 = 8,
    Prbs49 = 9,
    Prbs58 = 10,
}

impl PrbsPattern {
    pub const ALL: [Self; 11] = [
        Self::Prbs7,
        Self::Prbs9,
        Self::Prbs10,
        Self::Prbs11,
        Self::Prbs13,
        Self::Prbs15,
        Self::Prbs20,
        Self::Prbs23,
        Self::Prbs31,
        Self::Prbs49,
        Self::Prbs58,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Identification of a discovered or connected retimer.
///
/// Immutable after construction; `product_handle` is assigned by the
/// registry at connect time (0 for devices found by a bare discovery
/// scan).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub device_id: u8,
    pub revision_id: u8,
    pub firmware_major: u8,
    pub firmware_minor: u8,
    /// Product ID from XAGENT_INFO_0[31:16].
    pub product_id: u16,
    pub max_speed: DataRate,
    pub product_handle: u32,
    /// I2C slave address; 0 on UART-attached devices.
    pub device_address: u8,
}

impl DeviceIdentity {
    /// Firmware version as "major.minor".
    pub fn firmware_version_str(&self) -> String {
        format!("{}.{}", self.firmware_major, self.firmware_minor)
    }
}

/// Supply rail readings in millivolts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Voltages {
    pub dvdd1_mv: u16,
    pub dvdd2_mv: u16,
    pub dvdd3_mv: u16,
    pub dvdd4_mv: u16,
    pub dvdd5_mv: u16,
    pub dvdd6_mv: u16,
    pub dvddio_mv: u16,
}

/// Per-lane training status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneStatus {
    pub lane_number: u8,
    pub rx_detect: bool,
    pub tx_eq_done: bool,
    pub rx_eq_done: bool,
}

/// Status of one pseudo port (PPA or PPB).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStatus {
    pub current_ltssm_state: LtssmState,
    pub current_link_speed: DataRate,
    /// Negotiated width: 0, 1, 2, 4, 8, or 16.
    pub current_link_width: u8,
    pub forwarding_mode: bool,
    /// All 16 lanes, in lane order.
    pub lane_status: Vec<LaneStatus>,
}

impl PortStatus {
    /// The link is up when the port is forwarding in the FWD_FORWARDING
    /// LTSSM state.
    pub fn is_link_up(&self) -> bool {
        self.forwarding_mode && self.current_ltssm_state == LtssmState::FwdForwarding
    }
}

/// Global interrupt status bits (GLOBAL_INTR[3:0]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptStatus {
    pub global: bool,
    pub eq_phase_err: bool,
    pub phy_phase_err: bool,
    pub internal_err: bool,
}

/// Snapshot of device health, built by a single `get_status` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    /// Die temperature; 0 when the sensor has no valid sample.
    pub temperature_c: i16,
    /// Whether the temperature VALID bit was set.
    pub temperature_valid: bool,
    pub voltages: Voltages,
    pub ppa_status: PortStatus,
    pub ppb_status: PortStatus,
    pub interrupt_status: InterruptStatus,
}

impl DeviceStatus {
    /// Healthy means: valid temperature sample below 100 degC and no
    /// internal error interrupt pending.
    pub fn is_healthy(&self) -> bool {
        self.temperature_valid && !self.interrupt_status.internal_err && self.temperature_c < 100
    }
}

/// Interrupt enable bits (GLOBAL_INTR[19:16]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptEnables {
    pub global: bool,
    pub eq_phase_err: bool,
    pub phy_phase_err: bool,
    pub internal_err: bool,
}

/// Decoded device configuration (GLOBAL_PARAM0 + GLOBAL_INTR enables).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub bifurcation_mode: BifurcationMode,
    pub max_data_rate: DataRate,
    pub clocking_mode: ClockingMode,
    pub port_orientation: PortOrientation,
    pub interrupt_enables: InterruptEnables,
}

/// Partial configuration patch. Absent fields are left unchanged on the
/// device; "unspecified" is distinct from "set to default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationUpdate {
    pub bifurcation_mode: Option<BifurcationMode>,
    pub max_data_rate: Option<DataRate>,
    pub clocking_mode: Option<ClockingMode>,
    pub port_orientation: Option<PortOrientation>,
    pub interrupt_enables: Option<InterruptEnables>,
}

impl ConfigurationUpdate {
    pub fn is_empty(&self) -> bool {
        self.bifurcation_mode.is_none()
            && self.max_data_rate.is_none()
            && self.clocking_mode.is_none()
            && self.port_orientation.is_none()
            && self.interrupt_enables.is_none()
    }

    /// Whether any GLOBAL_PARAM0 field is being updated.
    pub(crate) fn touches_param0(&self) -> bool {
        self.bifurcation_mode.is_some()
            || self.max_data_rate.is_some()
            || self.clocking_mode.is_some()
            || self.port_orientation.is_some()
    }
}

/// PRBS generator/checker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrbsConfig {
    pub pattern: PrbsPattern,
    pub data_rate: DataRate,
    /// Lanes under test (0-15).
    pub lanes: Vec<u8>,
    /// Sample count programmed into each lane checker.
    pub sample_count: u32,
}

impl Default for PrbsConfig {
    fn default() -> Self {
        PrbsConfig {
            pattern: PrbsPattern::Prbs31,
            data_rate: DataRate::Gen5_32g,
            lanes: Vec::new(),
            sample_count: 0x100000,
        }
    }
}

/// PRBS lifecycle state of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrbsState {
    Idle,
    Configured,
    Running,
    Stopped,
}

/// Checker progress for one lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrbsLaneStatus {
    pub lane_number: u8,
    pub sync_acquired: bool,
    pub test_complete: bool,
}

/// PRBS lifecycle state plus per-lane checker progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrbsStatus {
    pub state: PrbsState,
    pub lanes: Vec<PrbsLaneStatus>,
}

/// PRBS counters for one lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrbsResult {
    pub lane_number: u8,
    pub bit_count: u64,
    pub error_count: u64,
}

impl PrbsResult {
    pub fn bit_error_rate(&self) -> f64 {
        if self.bit_count == 0 {
            return 0.0;
        }
        self.error_count as f64 / self.bit_count as f64
    }

    /// BER formatted for display: "< 1e-15" when no errors were counted,
    /// otherwise a two-decimal mantissa with a signed two-digit exponent
    /// (e.g. "9.54e-07").
    pub fn ber_string(&self) -> String {
        if self.error_count == 0 || self.bit_count == 0 {
            return "< 1e-15".to_string();
        }
        let ber = self.bit_error_rate();
        let mut exp = ber.log10().floor() as i32;
        let mut mantissa = ber / 10f64.powi(exp);
        // Rounding to two decimals can carry the mantissa to 10.0.
        if mantissa >= 9.995 {
            mantissa = 1.0;
            exp += 1;
        }
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{:.2}e{}{:02}", mantissa, sign, exp.abs())
    }
}

/// Margins of one eye opening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EyeMargins {
    pub left_margin_mui: u16,
    pub right_margin_mui: u16,
    pub upper_margin_mv: u16,
    pub lower_margin_mv: u16,
}

impl EyeMargins {
    pub fn horizontal_opening_mui(&self) -> u32 {
        self.left_margin_mui as u32 + self.right_margin_mui as u32
    }

    pub fn vertical_opening_mv(&self) -> u32 {
        self.upper_margin_mv as u32 + self.lower_margin_mv as u32
    }
}

/// Single-shot eye capture result for one lane.
///
/// PAM4 signaling at Gen6 produces three eye openings; below Gen6 only
/// the middle eye exists and `lower_eye`/`upper_eye` are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EyeCapture {
    pub lane_number: u8,
    pub data_rate: DataRate,
    pub capture_valid: bool,
    pub middle_eye: EyeMargins,
    pub lower_eye: Option<EyeMargins>,
    pub upper_eye: Option<EyeMargins>,
}

/// Receiver error counters for one lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorStatistics {
    pub lane_number: u8,
    pub invalid_symbol: u32,
    pub symbol_lock_loss: u32,
    pub elastic_buffer_error: u32,
    pub lane_deskew_error: u32,
    pub block_alignment_loss: u32,
    pub block_header_error: u32,
    pub sos_block_error: u32,
}

impl ErrorStatistics {
    pub fn total_errors(&self) -> u64 {
        self.invalid_symbol as u64
            + self.symbol_lock_loss as u64
            + self.elastic_buffer_error as u64
            + self.lane_deskew_error as u64
            + self.block_alignment_loss as u64
            + self.block_header_error as u64
            + self.sos_block_error as u64
    }
}

/// TX equalization settings for one (generation, lane) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxCoefficients {
    pub tx_preset: u8,
    pub tx_pre_cursor: u8,
    pub tx_cursor: u8,
    pub tx_post_cursor: u8,
    /// True when the coefficients, rather than the preset, are in force.
    pub tx_preset_sel: bool,
    /// TX precoding requested (Gen5+).
    pub tx_precode_req: bool,
}

/// Validates a lane number against the 16-lane limit.
pub(crate) fn check_lane(lane: u8) -> Result<()> {
    if lane >= crate::consts::MAX_LANES {
        return Err(Error::InvalidArgument(format!(
            "lane {} out of range (0-{})",
            lane,
            crate::consts::MAX_LANES - 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_rate_codes_round_trip() {
        for rate in DataRate::ALL {
            assert_eq!(DataRate::from_code(rate.code()), Some(rate));
        }
        assert_eq!(DataRate::from_code(4), Some(DataRate::Gen5_32g));
        assert_eq!(DataRate::from_code(6), None);
        assert_eq!(DataRate::Gen6_64g.generation(), 6);
        assert!(DataRate::Gen5_32g < DataRate::Gen6_64g);
    }

    #[test]
    fn test_bifurcation_table_is_complete() {
        assert_eq!(BifurcationMode::ALL.len(), 33);
        for (code, mode) in BifurcationMode::ALL.iter().enumerate() {
            assert_eq!(mode.code() as usize, code);
            assert_eq!(BifurcationMode::from_code(code as u8), Some(*mode));
        }
        assert_eq!(BifurcationMode::from_code(33), None);
    }

    #[test]
    fn test_bifurcation_lane_totals() {
        assert_eq!(BifurcationMode::X16.total_lanes(), 16);
        assert_eq!(BifurcationMode::X8_X8.total_lanes(), 16);
        assert_eq!(BifurcationMode::X2_X2_X2_X2_X2_X2_X2_X2.total_lanes(), 16);
        assert_eq!(BifurcationMode::X8.total_lanes(), 8);
        assert_eq!(BifurcationMode::X4_X4.total_lanes(), 8);
        assert_eq!(BifurcationMode::X4.total_lanes(), 4);
        assert_eq!(BifurcationMode::X2_X2.total_lanes(), 4);
    }

    #[test]
    fn test_ltssm_unknown_codes_survive() {
        assert_eq!(LtssmState::from_raw(0x04), LtssmState::FwdForwarding);
        assert_eq!(LtssmState::from_raw(0xAB), LtssmState::Unknown(0xAB));
        assert_eq!(LtssmState::Unknown(0xAB).raw(), 0xAB);
        for raw in 0u8..=0xFF {
            assert_eq!(LtssmState::from_raw(raw).raw(), raw);
        }
    }

    #[test]
    fn test_reset_bits_are_one_hot() {
        let kinds = [
            ResetType::Hard,
            ResetType::Soft,
            ResetType::Mac,
            ResetType::Perst,
            ResetType::GlobalSwrst,
        ];
        for (i, kind) in kinds.iter().enumerate() {
            assert_eq!(kind.ctrl_bit(), i as u32);
        }
        assert!(ResetType::Soft.preserves_configuration());
        assert!(ResetType::GlobalSwrst.preserves_configuration());
        assert!(!ResetType::Hard.preserves_configuration());
    }

    #[test]
    fn test_ber_string_formatting() {
        let clean = PrbsResult {
            lane_number: 0,
            bit_count: 1 << 20,
            error_count: 0,
        };
        assert_eq!(clean.ber_string(), "< 1e-15");

        let one_error = PrbsResult {
            lane_number: 1,
            bit_count: 1 << 20,
            error_count: 1,
        };
        assert_eq!(one_error.ber_string(), "9.54e-07");

        let heavy = PrbsResult {
            lane_number: 2,
            bit_count: 1000,
            error_count: 1,
        };
        assert_eq!(heavy.ber_string(), "1.00e-03");

        let everything = PrbsResult {
            lane_number: 3,
            bit_count: 100,
            error_count: 100,
        };
        assert_eq!(everything.ber_string(), "1.00e+00");
    }

    #[test]
    fn test_eye_margin_openings() {
        let eye = EyeMargins {
            left_margin_mui: 120,
            right_margin_mui: 130,
            upper_margin_mv: 45,
            lower_margin_mv: 40,
        };
        assert_eq!(eye.horizontal_opening_mui(), 250);
        assert_eq!(eye.vertical_opening_mv(), 85);
    }

    #[test]
    fn test_status_health_derivation() {
        let port = PortStatus {
            current_ltssm_state: LtssmState::FwdForwarding,
            current_link_speed: DataRate::Gen5_32g,
            current_link_width: 16,
            forwarding_mode: true,
            lane_status: Vec::new(),
        };
        assert!(port.is_link_up());

        let idle_port = PortStatus {
            forwarding_mode: false,
            ..port.clone()
        };
        assert!(!idle_port.is_link_up());

        let mut status = DeviceStatus {
            temperature_c: 45,
            temperature_valid: true,
            voltages: Voltages::default(),
            ppa_status: port.clone(),
            ppb_status: idle_port,
            interrupt_status: InterruptStatus::default(),
        };
        assert!(status.is_healthy());
        status.temperature_c = 105;
        assert!(!status.is_healthy());
        status.temperature_c = 45;
        status.temperature_valid = false;
        assert!(!status.is_healthy());
        status.temperature_valid = true;
        status.interrupt_status.internal_err = true;
        assert!(!status.is_healthy());
    }

    #[test]
    fn test_configuration_update_emptiness() {
        let empty = ConfigurationUpdate::default();
        assert!(empty.is_empty());
        assert!(!empty.touches_param0());

        let rate_only = ConfigurationUpdate {
            max_data_rate: Some(DataRate::Gen5_32g),
            ..Default::default()
        };
        assert!(!rate_only.is_empty());
        assert!(rate_only.touches_param0());

        let intr_only = ConfigurationUpdate {
            interrupt_enables: Some(InterruptEnables::default()),
            ..Default::default()
        };
        assert!(!intr_only.is_empty());
        assert!(!intr_only.touches_param0());
    }
}
