//! Register addresses, command bytes, and protocol constants for the retimer.

/// Broadcom PCI vendor ID reported in GLOBAL_PARAM1.
pub const BROADCOM_VID: u16 = 0x14E4;

/// I2C slave addresses a retimer can strap to (0x50-0x57).
pub const DEFAULT_SLAVE_ADDRESSES: [u8; 8] = [0x50, 0x51, 0x52, 0x53, 0x54, 0x55, 0x56, 0x57];

/// Number of lanes on the retimer.
pub const MAX_LANES: u8 = 16;

// --- SMBus Command Bytes ---
pub mod cmd {
    /// Read a 16-bit register.
    pub const REG_READ_16: u8 = 0x03;
    /// Read a 32-bit register.
    pub const REG_READ_32: u8 = 0x05;
    /// Write a 16-bit register.
    pub const REG_WRITE_16: u8 = 0x13;
    /// Write a 32-bit register.
    pub const REG_WRITE_32: u8 = 0x15;
}

// --- Register Addresses ---
pub mod reg {
    pub const GLOBAL_PARAM0: u32 = 0x0000;
    pub const GLOBAL_PARAM1: u32 = 0x0004;
    pub const GLOBAL_INTR: u32 = 0x0008;
    pub const RESET_CTRL: u32 = 0x0010;

    pub const TEMPERATURE: u32 = 0x0100;
    pub const VOLTAGE_DVDD1: u32 = 0x0104;
    pub const VOLTAGE_DVDD2: u32 = 0x0108;
    pub const VOLTAGE_DVDD3: u32 = 0x010C;
    pub const VOLTAGE_DVDD4: u32 = 0x0110;
    pub const VOLTAGE_DVDD5: u32 = 0x0114;
    pub const VOLTAGE_DVDD6: u32 = 0x0118;
    pub const VOLTAGE_DVDDIO: u32 = 0x011C;

    pub const XAGENT_INFO_0: u32 = 0x4000;

    pub const PPA_LTSSM_STATE: u32 = 0x8000;
    pub const PPB_LTSSM_STATE: u32 = 0xC000;

    // Per-port lane status bitmaps, offsets from the port LTSSM base.
    pub const LANE_RX_DETECT_OFFSET: u32 = 0x04;
    pub const LANE_TX_EQ_DONE_OFFSET: u32 = 0x08;
    pub const LANE_RX_EQ_DONE_OFFSET: u32 = 0x0C;

    // TX coefficient blocks, one 0x10-byte slot per lane.
    pub const TX_COEFF_GEN3_BASE: u32 = 0x0200;
    pub const TX_COEFF_GEN4_BASE: u32 = 0x0280;
    pub const TX_COEFF_GEN5_BASE: u32 = 0x0300;
    pub const TX_COEFF_GEN6_BASE: u32 = 0x0380;
    pub const TX_COEFF_LANE_STRIDE: u32 = 0x10;

    // Error statistics block, one 0x20-byte slot of u32 counters per lane.
    pub const ERROR_STATS_BASE: u32 = 0x0500;
    pub const ERROR_STATS_LANE_STRIDE: u32 = 0x20;
    pub const ERROR_STATS_COUNTERS: u8 = 7;

    /// PRBS generator/checker block.
    pub mod prbs {
        pub const GLOBAL_CTRL: u32 = 0x1000;
        pub const LANE_BASE: u32 = 0x1010;
        pub const LANE_STRIDE: u32 = 0x20;
        pub const LANE_CTRL_OFFSET: u32 = 0x00;
        pub const LANE_SAMPLE_COUNT_OFFSET: u32 = 0x04;
        pub const LANE_STATUS_OFFSET: u32 = 0x08;
        pub const LANE_BIT_COUNT_LO_OFFSET: u32 = 0x0C;
        pub const LANE_BIT_COUNT_HI_OFFSET: u32 = 0x10;
        pub const LANE_ERR_COUNT_LO_OFFSET: u32 = 0x14;
        pub const LANE_ERR_COUNT_HI_OFFSET: u32 = 0x18;
    }

    /// Eye diagram capture block.
    pub mod eye {
        pub const CTRL: u32 = 0x2000;
        pub const STATUS: u32 = 0x2004;
        pub const MIDDLE_H: u32 = 0x2008;
        pub const MIDDLE_V: u32 = 0x200C;
        pub const LOWER_H: u32 = 0x2010;
        pub const LOWER_V: u32 = 0x2014;
        pub const UPPER_H: u32 = 0x2018;
        pub const UPPER_V: u32 = 0x201C;
    }
}

// --- USB Bridge Adapter (I2C side channel) ---
pub mod bridge {
    /// Vendor ID of the FT232H-class USB-to-I2C bridge.
    pub const BRIDGE_VID: u16 = 0x0403;
    /// Product ID of the bridge's I2C interface.
    pub const BRIDGE_PID: u16 = 0x6014;

    // Feature reports for bridge-internal registers.
    pub const REPORT_ID_WRITE_REGISTER: u8 = 0x3C;
    pub const REPORT_ID_SET_READ_ADDRESS: u8 = 0x4B;
    pub const REPORT_ID_READ_REGISTER: u8 = 0x5A;

    // Bridge-internal register addresses.
    pub const REG_SCL_LOW: u16 = 0x0341;
    pub const REG_SCL_HIGH: u16 = 0x0342;
    pub const REG_PULLUP_EN: u16 = 0x0343;

    pub const REPORT_MAX_DATA_SIZE: usize = 32;
    // Flags(1) + WrSize(1) + RdSize(1) + SlaveAddr(1) + Data(32)
    pub const OUT_REPORT_SIZE: usize = 36;
    // Flags(1) + WrSize(1) + RdSize(1) + Reserved(1) + Data(32)
    pub const IN_REPORT_SIZE: usize = 36;

    /// OUT report flags (byte 0).
    pub mod out_flags {
        /// Generate a START condition at the beginning of the transaction.
        pub const START_BIT: u8 = 1 << 0;
        /// Generate a STOP condition at the end of the transaction.
        pub const STOP_BIT: u8 = 1 << 1;
    }

    /// IN report status flags (byte 0).
    pub mod in_flags {
        pub const REQUEST_ERROR: u8 = 1 << 0;
        pub const NAK_RECEIVED: u8 = 1 << 1;
        pub const ARBITRATION_LOST: u8 = 1 << 2;
        pub const TIMEOUT: u8 = 1 << 3;
    }
}

// --- UART Side Channel ---
pub mod uart {
    /// Frame synchronization byte.
    pub const SYNC: u8 = 0xA5;
    /// Largest payload a single frame can carry.
    pub const MAX_PAYLOAD: usize = 255;
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;

    /// Response status codes (payload byte 1, after the echoed cookie).
    pub mod status {
        pub const OK: u8 = 0x00;
        pub const NAK: u8 = 0x01;
        pub const BUS_ERROR: u8 = 0x02;
    }
}

// --- Timing ---
pub mod timing {
    /// Default per-operation transport timeout.
    pub const OP_TIMEOUT_MS: u64 = 1000;
    /// Transient bus errors are retried this many times.
    pub const TRANSIENT_RETRIES: u32 = 2;
    /// Backoff between transient retries.
    pub const RETRY_BACKOFF_MS: u64 = 10;

    /// Settle delay after a reset write before polling begins.
    pub const RESET_SETTLE_MS: u64 = 200;
    /// Poll interval while waiting for the device to come back.
    pub const RESET_POLL_MS: u64 = 50;
    /// Total reset wait budget.
    pub const RESET_DEADLINE_MS: u64 = 5000;

    /// PRBS start-bit assertion confirmation budget.
    pub const PRBS_START_DEADLINE_MS: u64 = 500;
    pub const PRBS_START_POLL_MS: u64 = 20;

    /// Eye capture completion budget.
    pub const EYE_DEADLINE_MS: u64 = 10_000;
    pub const EYE_POLL_MS: u64 = 100;
}
