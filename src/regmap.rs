//! Register map: typed bitfield descriptors and the static register catalog.
//!
//! Pure computation; nothing in this module touches a transport. The
//! facade accesses fields through the named constants in [`fields`],
//! while external surfaces (register browsers, scripting) can resolve
//! registers by name or address through [`lookup`] and [`by_address`].

use crate::consts::reg;
use crate::error::{Error, Result};
use crate::types::DataRate;

/// Definition of a bitfield within a register.
///
/// Invariant: `lsb <= msb < width_bytes * 8` of the containing register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub lsb: u8,
    pub msb: u8,
    pub description: &'static str,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, lsb: u8, msb: u8, description: &'static str) -> Self {
        FieldDescriptor {
            name,
            lsb,
            msb,
            description,
        }
    }

    /// Field width in bits.
    pub const fn width(&self) -> u8 {
        self.msb - self.lsb + 1
    }

    /// Bit mask of this field within the register.
    pub fn mask(&self) -> u32 {
        let bits = ((1u64 << self.width()) - 1) as u32;
        bits << self.lsb
    }

    /// Extract this field's value from a raw register value.
    pub fn extract(&self, raw: u32) -> u32 {
        (raw >> self.lsb) & ((1u64 << self.width()) - 1) as u32
    }

    /// Extract this field as a boolean (single-bit fields).
    pub fn extract_bool(&self, raw: u32) -> bool {
        self.extract(raw) != 0
    }

    /// Insert `value` into this field of `raw`, bound-checking the value
    /// against the field width.
    pub fn insert(&self, raw: u32, value: u32) -> Result<u32> {
        let limit = (1u64 << self.width()) - 1;
        if value as u64 > limit {
            return Err(Error::InvalidArgument(format!(
                "value 0x{:X} does not fit field {} ({} bits)",
                value,
                self.name,
                self.width()
            )));
        }
        Ok((raw & !self.mask()) | ((value << self.lsb) & self.mask()))
    }

    /// Insert a boolean into a single-bit field.
    pub fn insert_bool(&self, raw: u32, value: bool) -> Result<u32> {
        self.insert(raw, value as u32)
    }
}

/// Definition of a register: address, width, and its ordered fields.
#[derive(Debug, Clone, Copy)]
pub struct RegisterDescriptor {
    pub name: &'static str,
    pub address: u32,
    /// 2 or 4 bytes.
    pub width_bytes: u8,
    pub description: &'static str,
    /// Non-overlapping, sorted ascending by `lsb`.
    pub fields: &'static [FieldDescriptor],
}

impl RegisterDescriptor {
    pub fn width_bits(&self) -> u8 {
        self.width_bytes * 8
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Named field constants, grouped per register the way the hardware
/// documentation groups them.
pub mod fields {
    use super::FieldDescriptor;

    pub mod global_param0 {
        use super::FieldDescriptor;
        pub const PROFILE: FieldDescriptor =
            FieldDescriptor::new("PROFILE", 0, 2, "Active configuration profile");
        pub const BIFURCATION: FieldDescriptor =
            FieldDescriptor::new("BIFURCATION", 7, 12, "Lane bifurcation mode code");
        pub const EEPROM_DATA_VAL: FieldDescriptor =
            FieldDescriptor::new("EEPROM_DATA_VAL", 13, 14, "EEPROM data valid state");
        pub const AUTOINC: FieldDescriptor =
            FieldDescriptor::new("AUTOINC", 15, 15, "Address auto-increment enable");
        pub const CLK_MODE: FieldDescriptor =
            FieldDescriptor::new("CLK_MODE", 16, 18, "Clocking mode code");
        pub const ENH_LINK_BEHAV: FieldDescriptor =
            FieldDescriptor::new("ENH_LINK_BEHAV", 19, 20, "Enhanced link behavior");
        pub const EEPROM_TIMEOUT: FieldDescriptor =
            FieldDescriptor::new("EEPROM_TIMEOUT", 21, 23, "EEPROM load timeout select");
        pub const MAX_DATA_RATE: FieldDescriptor =
            FieldDescriptor::new("MAX_DATA_RATE", 24, 26, "Maximum negotiable data rate");
        pub const SRIS_PAYLOAD: FieldDescriptor =
            FieldDescriptor::new("SRIS_PAYLOAD", 28, 30, "SRIS link payload size");
        pub const PORT_ORIEN: FieldDescriptor =
            FieldDescriptor::new("PORT_ORIEN", 31, 31, "Port orientation method");
    }

    pub mod global_param1 {
        use super::FieldDescriptor;
        pub const REVISION_ID: FieldDescriptor =
            FieldDescriptor::new("REVISION_ID", 0, 7, "Silicon revision");
        pub const DEVICE_ID: FieldDescriptor =
            FieldDescriptor::new("DEVICE_ID", 8, 15, "Device identifier");
        pub const VENDOR_ID: FieldDescriptor =
            FieldDescriptor::new("VENDOR_ID", 16, 31, "PCI vendor identifier");
    }

    pub mod global_intr {
        use super::FieldDescriptor;
        pub const INTR_STS: FieldDescriptor =
            FieldDescriptor::new("INTR_STS", 0, 0, "Global interrupt pending");
        pub const EQ_PHASE_ERR_STS: FieldDescriptor =
            FieldDescriptor::new("EQ_PHASE_ERR_STS", 1, 1, "Equalization phase error pending");
        pub const PHY_PHASE_ERR_STS: FieldDescriptor =
            FieldDescriptor::new("PHY_PHASE_ERR_STS", 2, 2, "PHY phase error pending");
        pub const RTMR_INT_ERR_STS: FieldDescriptor =
            FieldDescriptor::new("RTMR_INT_ERR_STS", 3, 3, "Internal error pending");
        pub const INTR_EN: FieldDescriptor =
            FieldDescriptor::new("INTR_EN", 16, 16, "Global interrupt enable");
        pub const EQ_PHASE_ERR_EN: FieldDescriptor =
            FieldDescriptor::new("EQ_PHASE_ERR_EN", 17, 17, "Equalization phase error enable");
        pub const PHY_PHASE_ERR_EN: FieldDescriptor =
            FieldDescriptor::new("PHY_PHASE_ERR_EN", 18, 18, "PHY phase error enable");
        pub const RTMR_INT_ERR_EN: FieldDescriptor =
            FieldDescriptor::new("RTMR_INT_ERR_EN", 19, 19, "Internal error enable");
    }

    pub mod reset_ctrl {
        use super::FieldDescriptor;
        pub const HARD: FieldDescriptor =
            FieldDescriptor::new("HARD", 0, 0, "Hard reset, entire chip");
        pub const SOFT: FieldDescriptor =
            FieldDescriptor::new("SOFT", 1, 1, "Soft reset, sticky registers preserved");
        pub const MAC: FieldDescriptor =
            FieldDescriptor::new("MAC", 2, 2, "Global MAC software reset");
        pub const PERST: FieldDescriptor =
            FieldDescriptor::new("PERST", 3, 3, "PERST fundamental reset");
        pub const GLOBAL_SWRST: FieldDescriptor =
            FieldDescriptor::new("GLOBAL_SWRST", 4, 4, "Toggle global software link reset");
    }

    pub mod temperature {
        use super::FieldDescriptor;
        pub const VALUE: FieldDescriptor =
            FieldDescriptor::new("VALUE", 0, 15, "Die temperature, signed degrees Celsius");
        pub const VALID: FieldDescriptor =
            FieldDescriptor::new("VALID", 31, 31, "Sensor sample valid");
    }

    pub mod voltage {
        use super::FieldDescriptor;
        pub const VALUE: FieldDescriptor =
            FieldDescriptor::new("VALUE", 0, 15, "Rail voltage in millivolts");
    }

    pub mod xagent_info_0 {
        use super::FieldDescriptor;
        pub const FW_MINOR: FieldDescriptor =
            FieldDescriptor::new("FW_MINOR", 0, 7, "Firmware minor version");
        pub const FW_MAJOR: FieldDescriptor =
            FieldDescriptor::new("FW_MAJOR", 8, 15, "Firmware major version");
        pub const PRODUCT_ID: FieldDescriptor =
            FieldDescriptor::new("PRODUCT_ID", 16, 31, "Product identifier");
    }

    /// Shared layout of PPA_LTSSM_STATE and PPB_LTSSM_STATE.
    pub mod ltssm_state {
        use super::FieldDescriptor;
        pub const CURRENT_STATE: FieldDescriptor =
            FieldDescriptor::new("CURRENT_STATE", 0, 7, "Current LTSSM state code");
        pub const LINK_SPEED: FieldDescriptor =
            FieldDescriptor::new("LINK_SPEED", 8, 11, "Negotiated data rate code");
        pub const LINK_WIDTH: FieldDescriptor =
            FieldDescriptor::new("LINK_WIDTH", 12, 16, "Negotiated link width");
        pub const FORWARDING_MODE: FieldDescriptor =
            FieldDescriptor::new("FORWARDING_MODE", 17, 17, "Port is forwarding traffic");
    }

    /// Shared layout of the per-port lane status bitmaps.
    pub mod lane_bitmap {
        use super::FieldDescriptor;
        pub const LANES: FieldDescriptor =
            FieldDescriptor::new("LANES", 0, 15, "One bit per lane, lane 0 at bit 0");
    }

    pub mod prbs_global_ctrl {
        use super::FieldDescriptor;
        pub const START: FieldDescriptor =
            FieldDescriptor::new("START", 0, 0, "Global PRBS start");
    }

    pub mod prbs_lane_ctrl {
        use super::FieldDescriptor;
        pub const GEN_EN: FieldDescriptor =
            FieldDescriptor::new("GEN_EN", 0, 0, "Pattern generator enable");
        pub const CHK_EN: FieldDescriptor =
            FieldDescriptor::new("CHK_EN", 1, 1, "Pattern checker enable");
        pub const PATTERN: FieldDescriptor =
            FieldDescriptor::new("PATTERN", 2, 6, "PRBS polynomial select");
        pub const RATE: FieldDescriptor =
            FieldDescriptor::new("RATE", 8, 10, "Data rate code for the test");
    }

    pub mod prbs_lane_status {
        use super::FieldDescriptor;
        pub const SYNC: FieldDescriptor =
            FieldDescriptor::new("SYNC", 0, 0, "Checker sync acquired");
        pub const DONE: FieldDescriptor =
            FieldDescriptor::new("DONE", 1, 1, "Sample count reached");
    }

    pub mod eye_ctrl {
        use super::FieldDescriptor;
        pub const LANE: FieldDescriptor =
            FieldDescriptor::new("LANE", 0, 3, "Lane under capture");
        pub const RATE: FieldDescriptor =
            FieldDescriptor::new("RATE", 4, 6, "Data rate code for the capture");
        pub const START: FieldDescriptor =
            FieldDescriptor::new("START", 31, 31, "Trigger a single-shot capture");
    }

    pub mod eye_status {
        use super::FieldDescriptor;
        pub const VALID: FieldDescriptor =
            FieldDescriptor::new("VALID", 0, 0, "Capture complete and margins valid");
    }

    /// Shared layout of the horizontal margin registers (mUI).
    pub mod eye_margin_h {
        use super::FieldDescriptor;
        pub const LEFT: FieldDescriptor =
            FieldDescriptor::new("LEFT", 0, 15, "Left margin in milli-UI");
        pub const RIGHT: FieldDescriptor =
            FieldDescriptor::new("RIGHT", 16, 31, "Right margin in milli-UI");
    }

    /// Shared layout of the vertical margin registers (mV).
    pub mod eye_margin_v {
        use super::FieldDescriptor;
        pub const UPPER: FieldDescriptor =
            FieldDescriptor::new("UPPER", 0, 15, "Upper margin in millivolts");
        pub const LOWER: FieldDescriptor =
            FieldDescriptor::new("LOWER", 16, 31, "Lower margin in millivolts");
    }

    /// Shared layout of the per-generation TX coefficient slots.
    pub mod tx_coeff {
        use super::FieldDescriptor;
        pub const PRESET: FieldDescriptor =
            FieldDescriptor::new("PRESET", 0, 3, "TX preset index");
        pub const PRE_CURSOR: FieldDescriptor =
            FieldDescriptor::new("PRE_CURSOR", 4, 9, "TX pre-cursor coefficient");
        pub const CURSOR: FieldDescriptor =
            FieldDescriptor::new("CURSOR", 10, 15, "TX main cursor coefficient");
        pub const POST_CURSOR: FieldDescriptor =
            FieldDescriptor::new("POST_CURSOR", 16, 21, "TX post-cursor coefficient");
        pub const PRESET_SEL: FieldDescriptor =
            FieldDescriptor::new("PRESET_SEL", 22, 22, "Coefficients in force instead of preset");
        pub const PRECODE_REQ: FieldDescriptor =
            FieldDescriptor::new("PRECODE_REQ", 23, 23, "TX precoding requested");
    }
}

macro_rules! lane_bitmap_fields {
    () => {
        &[fields::lane_bitmap::LANES]
    };
}

/// The static register catalog.
pub static REGISTERS: &[RegisterDescriptor] = &[
    RegisterDescriptor {
        name: "GLOBAL_PARAM0",
        address: reg::GLOBAL_PARAM0,
        width_bytes: 4,
        description: "Global configuration: profile, bifurcation, clocking, data rate",
        fields: &[
            fields::global_param0::PROFILE,
            fields::global_param0::BIFURCATION,
            fields::global_param0::EEPROM_DATA_VAL,
            fields::global_param0::AUTOINC,
            fields::global_param0::CLK_MODE,
            fields::global_param0::ENH_LINK_BEHAV,
            fields::global_param0::EEPROM_TIMEOUT,
            fields::global_param0::MAX_DATA_RATE,
            fields::global_param0::SRIS_PAYLOAD,
            fields::global_param0::PORT_ORIEN,
        ],
    },
    RegisterDescriptor {
        name: "GLOBAL_PARAM1",
        address: reg::GLOBAL_PARAM1,
        width_bytes: 4,
        description: "Device identification: vendor, device, revision",
        fields: &[
            fields::global_param1::REVISION_ID,
            fields::global_param1::DEVICE_ID,
            fields::global_param1::VENDOR_ID,
        ],
    },
    RegisterDescriptor {
        name: "GLOBAL_INTR",
        address: reg::GLOBAL_INTR,
        width_bytes: 4,
        description: "Interrupt status (bits 3:0) and enables (bits 19:16)",
        fields: &[
            fields::global_intr::INTR_STS,
            fields::global_intr::EQ_PHASE_ERR_STS,
            fields::global_intr::PHY_PHASE_ERR_STS,
            fields::global_intr::RTMR_INT_ERR_STS,
            fields::global_intr::INTR_EN,
            fields::global_intr::EQ_PHASE_ERR_EN,
            fields::global_intr::PHY_PHASE_ERR_EN,
            fields::global_intr::RTMR_INT_ERR_EN,
        ],
    },
    RegisterDescriptor {
        name: "RESET_CTRL",
        address: reg::RESET_CTRL,
        width_bytes: 4,
        description: "Reset control, one-hot bits 4:0",
        fields: &[
            fields::reset_ctrl::HARD,
            fields::reset_ctrl::SOFT,
            fields::reset_ctrl::MAC,
            fields::reset_ctrl::PERST,
            fields::reset_ctrl::GLOBAL_SWRST,
        ],
    },
    RegisterDescriptor {
        name: "TEMPERATURE",
        address: reg::TEMPERATURE,
        width_bytes: 4,
        description: "Die temperature sensor",
        fields: &[fields::temperature::VALUE, fields::temperature::VALID],
    },
    RegisterDescriptor {
        name: "VOLTAGE_DVDD1",
        address: reg::VOLTAGE_DVDD1,
        width_bytes: 4,
        description: "DVDD1 rail voltage",
        fields: &[fields::voltage::VALUE],
    },
    RegisterDescriptor {
        name: "VOLTAGE_DVDD2",
        address: reg::VOLTAGE_DVDD2,
        width_bytes: 4,
        description: "DVDD2 rail voltage",
        fields: &[fields::voltage::VALUE],
    },
    RegisterDescriptor {
        name: "VOLTAGE_DVDD3",
        address: reg::VOLTAGE_DVDD3,
        width_bytes: 4,
        description: "DVDD3 rail voltage",
        fields: &[fields::voltage::VALUE],
    },
    RegisterDescriptor {
        name: "VOLTAGE_DVDD4",
        address: reg::VOLTAGE_DVDD4,
        width_bytes: 4,
        description: "DVDD4 rail voltage",
        fields: &[fields::voltage::VALUE],
    },
    RegisterDescriptor {
        name: "VOLTAGE_DVDD5",
        address: reg::VOLTAGE_DVDD5,
        width_bytes: 4,
        description: "DVDD5 rail voltage",
        fields: &[fields::voltage::VALUE],
    },
    RegisterDescriptor {
        name: "VOLTAGE_DVDD6",
        address: reg::VOLTAGE_DVDD6,
        width_bytes: 4,
        description: "DVDD6 rail voltage",
        fields: &[fields::voltage::VALUE],
    },
    RegisterDescriptor {
        name: "VOLTAGE_DVDDIO",
        address: reg::VOLTAGE_DVDDIO,
        width_bytes: 4,
        description: "DVDDIO rail voltage",
        fields: &[fields::voltage::VALUE],
    },
    RegisterDescriptor {
        name: "XAGENT_INFO_0",
        address: reg::XAGENT_INFO_0,
        width_bytes: 4,
        description: "Firmware version (major.minor) and product identifier",
        fields: &[
            fields::xagent_info_0::FW_MINOR,
            fields::xagent_info_0::FW_MAJOR,
            fields::xagent_info_0::PRODUCT_ID,
        ],
    },
    RegisterDescriptor {
        name: "PPA_LTSSM_STATE",
        address: reg::PPA_LTSSM_STATE,
        width_bytes: 4,
        description: "Pseudo Port A link state",
        fields: &[
            fields::ltssm_state::CURRENT_STATE,
            fields::ltssm_state::LINK_SPEED,
            fields::ltssm_state::LINK_WIDTH,
            fields::ltssm_state::FORWARDING_MODE,
        ],
    },
    RegisterDescriptor {
        name: "PPB_LTSSM_STATE",
        address: reg::PPB_LTSSM_STATE,
        width_bytes: 4,
        description: "Pseudo Port B link state",
        fields: &[
            fields::ltssm_state::CURRENT_STATE,
            fields::ltssm_state::LINK_SPEED,
            fields::ltssm_state::LINK_WIDTH,
            fields::ltssm_state::FORWARDING_MODE,
        ],
    },
    RegisterDescriptor {
        name: "PPA_LANE_RX_DETECT",
        address: reg::PPA_LTSSM_STATE + reg::LANE_RX_DETECT_OFFSET,
        width_bytes: 4,
        description: "Pseudo Port A receiver detect bitmap",
        fields: lane_bitmap_fields!(),
    },
    RegisterDescriptor {
        name: "PPA_LANE_TX_EQ_DONE",
        address: reg::PPA_LTSSM_STATE + reg::LANE_TX_EQ_DONE_OFFSET,
        width_bytes: 4,
        description: "Pseudo Port A TX equalization done bitmap",
        fields: lane_bitmap_fields!(),
    },
    RegisterDescriptor {
        name: "PPA_LANE_RX_EQ_DONE",
        address: reg::PPA_LTSSM_STATE + reg::LANE_RX_EQ_DONE_OFFSET,
        width_bytes: 4,
        description: "Pseudo Port A RX equalization done bitmap",
        fields: lane_bitmap_fields!(),
    },
    RegisterDescriptor {
        name: "PPB_LANE_RX_DETECT",
        address: reg::PPB_LTSSM_STATE + reg::LANE_RX_DETECT_OFFSET,
        width_bytes: 4,
        description: "Pseudo Port B receiver detect bitmap",
        fields: lane_bitmap_fields!(),
    },
    RegisterDescriptor {
        name: "PPB_LANE_TX_EQ_DONE",
        address: reg::PPB_LTSSM_STATE + reg::LANE_TX_EQ_DONE_OFFSET,
        width_bytes: 4,
        description: "Pseudo Port B TX equalization done bitmap",
        fields: lane_bitmap_fields!(),
    },
    RegisterDescriptor {
        name: "PPB_LANE_RX_EQ_DONE",
        address: reg::PPB_LTSSM_STATE + reg::LANE_RX_EQ_DONE_OFFSET,
        width_bytes: 4,
        description: "Pseudo Port B RX equalization done bitmap",
        fields: lane_bitmap_fields!(),
    },
    RegisterDescriptor {
        name: "PRBS_GLOBAL_CTRL",
        address: reg::prbs::GLOBAL_CTRL,
        width_bytes: 4,
        description: "Global PRBS start control",
        fields: &[fields::prbs_global_ctrl::START],
    },
    RegisterDescriptor {
        name: "EYE_CTRL",
        address: reg::eye::CTRL,
        width_bytes: 4,
        description: "Eye capture lane/rate select and trigger",
        fields: &[
            fields::eye_ctrl::LANE,
            fields::eye_ctrl::RATE,
            fields::eye_ctrl::START,
        ],
    },
    RegisterDescriptor {
        name: "EYE_STATUS",
        address: reg::eye::STATUS,
        width_bytes: 4,
        description: "Eye capture completion status",
        fields: &[fields::eye_status::VALID],
    },
];

/// Look up a register by name.
pub fn lookup(name: &str) -> Option<&'static RegisterDescriptor> {
    REGISTERS.iter().find(|r| r.name == name)
}

/// Look up a register by address.
pub fn by_address(address: u32) -> Option<&'static RegisterDescriptor> {
    REGISTERS.iter().find(|r| r.address == address)
}

/// Address of a lane's TX coefficient slot for a generation.
/// Equalization coefficients exist for Gen3 and above.
pub fn tx_coeff_address(rate: DataRate, lane: u8) -> Result<u32> {
    crate::types::check_lane(lane)?;
    let base = match rate {
        DataRate::Gen3_8g => reg::TX_COEFF_GEN3_BASE,
        DataRate::Gen4_16g => reg::TX_COEFF_GEN4_BASE,
        DataRate::Gen5_32g => reg::TX_COEFF_GEN5_BASE,
        DataRate::Gen6_64g => reg::TX_COEFF_GEN6_BASE,
        _ => {
            return Err(Error::InvalidArgument(format!(
                "no TX coefficients below Gen3 (requested Gen{})",
                rate.generation()
            )));
        }
    };
    Ok(base + lane as u32 * reg::TX_COEFF_LANE_STRIDE)
}

/// Address of one error statistics counter for a lane.
pub fn error_stats_address(lane: u8, counter: u8) -> Result<u32> {
    crate::types::check_lane(lane)?;
    if counter >= reg::ERROR_STATS_COUNTERS {
        return Err(Error::InvalidArgument(format!(
            "error counter {} out of range (0-{})",
            counter,
            reg::ERROR_STATS_COUNTERS - 1
        )));
    }
    Ok(reg::ERROR_STATS_BASE + lane as u32 * reg::ERROR_STATS_LANE_STRIDE + counter as u32 * 4)
}

/// Address of a register within a lane's PRBS slot.
pub fn prbs_lane_address(lane: u8, offset: u32) -> Result<u32> {
    crate::types::check_lane(lane)?;
    Ok(reg::prbs::LANE_BASE + lane as u32 * reg::prbs::LANE_STRIDE + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_extract_insert_round_trip() {
        for field in REGISTERS.iter().flat_map(|r| r.fields.iter()) {
            let max = ((1u64 << field.width()) - 1) as u32;
            for value in [0, 1, max / 2, max] {
                let raw = field.insert(0, value).unwrap();
                assert_eq!(
                    field.extract(raw),
                    value,
                    "round trip failed for {}",
                    field.name
                );
                // Insert must not disturb bits outside the field.
                let seeded = field.insert(0xFFFF_FFFF, value).unwrap();
                assert_eq!(seeded & !field.mask(), 0xFFFF_FFFF & !field.mask());
            }
        }
    }

    #[test]
    fn test_insert_rejects_oversized_values() {
        let field = fields::global_param0::MAX_DATA_RATE;
        assert!(field.insert(0, 7).is_ok());
        assert!(field.insert(0, 8).is_err());

        let bit = fields::temperature::VALID;
        assert!(bit.insert(0, 1).is_ok());
        assert!(bit.insert(0, 2).is_err());
    }

    #[test]
    fn test_catalog_fields_sorted_and_non_overlapping() {
        for register in REGISTERS {
            let mut prev_msb: Option<u8> = None;
            for field in register.fields {
                assert!(
                    field.lsb <= field.msb,
                    "{}.{}: lsb > msb",
                    register.name,
                    field.name
                );
                assert!(
                    field.msb < register.width_bits(),
                    "{}.{}: msb outside register",
                    register.name,
                    field.name
                );
                if let Some(prev) = prev_msb {
                    assert!(
                        field.lsb > prev,
                        "{}.{}: overlaps or out of order",
                        register.name,
                        field.name
                    );
                }
                prev_msb = Some(field.msb);
            }
        }
    }

    #[test]
    fn test_catalog_covers_facade_registers() {
        for name in [
            "GLOBAL_PARAM0",
            "GLOBAL_PARAM1",
            "GLOBAL_INTR",
            "RESET_CTRL",
            "TEMPERATURE",
            "VOLTAGE_DVDD1",
            "VOLTAGE_DVDD6",
            "VOLTAGE_DVDDIO",
            "XAGENT_INFO_0",
            "PPA_LTSSM_STATE",
            "PPB_LTSSM_STATE",
        ] {
            assert!(lookup(name).is_some(), "missing register {name}");
        }
        assert_eq!(lookup("GLOBAL_PARAM1").unwrap().address, 0x0004);
        assert_eq!(by_address(0x8000).unwrap().name, "PPA_LTSSM_STATE");
        assert!(by_address(0xFFFF_FF00).is_none());
    }

    #[test]
    fn test_documented_field_positions() {
        // Positions pinned by the hardware documentation.
        assert_eq!(fields::global_param0::MAX_DATA_RATE.mask(), 0x0700_0000);
        assert_eq!(fields::global_param0::BIFURCATION.mask(), 0x0000_1F80);
        assert_eq!(fields::global_param0::PORT_ORIEN.mask(), 0x8000_0000);
        assert_eq!(fields::global_param1::VENDOR_ID.mask(), 0xFFFF_0000);
        assert_eq!(fields::temperature::VALID.mask(), 0x8000_0000);
        assert_eq!(fields::ltssm_state::LINK_WIDTH.mask(), 0x0001_F000);
        assert_eq!(fields::ltssm_state::FORWARDING_MODE.mask(), 0x0002_0000);

        // The scenario value from the documentation: state 0x04, Gen5, x16.
        let raw = 0x0001_0404;
        assert_eq!(fields::ltssm_state::CURRENT_STATE.extract(raw), 0x04);
        assert_eq!(fields::ltssm_state::LINK_SPEED.extract(raw), 4);
        assert_eq!(fields::ltssm_state::LINK_WIDTH.extract(raw), 16);
        assert!(!fields::ltssm_state::FORWARDING_MODE.extract_bool(raw));
    }

    #[test]
    fn test_computed_block_addressing() {
        assert_eq!(
            tx_coeff_address(DataRate::Gen3_8g, 0).unwrap(),
            reg::TX_COEFF_GEN3_BASE
        );
        assert_eq!(tx_coeff_address(DataRate::Gen6_64g, 2).unwrap(), 0x03A0);
        assert!(tx_coeff_address(DataRate::Gen1_2p5g, 0).is_err());
        assert!(tx_coeff_address(DataRate::Gen5_32g, 16).is_err());

        assert_eq!(error_stats_address(0, 0).unwrap(), reg::ERROR_STATS_BASE);
        assert_eq!(error_stats_address(1, 2).unwrap(), 0x0528);
        assert!(error_stats_address(16, 0).is_err());
        assert!(error_stats_address(0, 7).is_err());

        assert_eq!(
            prbs_lane_address(1, reg::prbs::LANE_SAMPLE_COUNT_OFFSET).unwrap(),
            0x1034
        );
        assert!(prbs_lane_address(16, 0).is_err());
    }
}
