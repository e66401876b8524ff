//! BLE advertising records
//!
//! Value objects for the advertise commands and the integer wire codes the
//! command protocol uses for them.

use serde_json::json;
use std::time::Duration;

/// Wire code for low-power advertising mode
pub const MODE_LOW_POWER: i32 = 0;
/// Wire code for balanced advertising mode
pub const MODE_BALANCED: i32 = 1;
/// Wire code for low-latency advertising mode
pub const MODE_LOW_LATENCY: i32 = 2;

/// Wire code for ultra-low transmit power
pub const TX_POWER_ULTRA_LOW: i32 = 0;
/// Wire code for low transmit power
pub const TX_POWER_LOW: i32 = 1;
/// Wire code for medium transmit power
pub const TX_POWER_MEDIUM: i32 = 2;
/// Wire code for high transmit power
pub const TX_POWER_HIGH: i32 = 3;

/// Advertising duty-cycle mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiseMode {
    LowPower,
    Balanced,
    LowLatency,
}

impl AdvertiseMode {
    /// Map a wire code to a mode. Unknown codes are the caller's problem.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            MODE_LOW_POWER => Some(Self::LowPower),
            MODE_BALANCED => Some(Self::Balanced),
            MODE_LOW_LATENCY => Some(Self::LowLatency),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::LowPower => MODE_LOW_POWER,
            Self::Balanced => MODE_BALANCED,
            Self::LowLatency => MODE_LOW_LATENCY,
        }
    }
}

/// Advertising transmit power level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPowerLevel {
    UltraLow,
    Low,
    Medium,
    High,
}

impl TxPowerLevel {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            TX_POWER_ULTRA_LOW => Some(Self::UltraLow),
            TX_POWER_LOW => Some(Self::Low),
            TX_POWER_MEDIUM => Some(Self::Medium),
            TX_POWER_HIGH => Some(Self::High),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::UltraLow => TX_POWER_ULTRA_LOW,
            Self::Low => TX_POWER_LOW,
            Self::Medium => TX_POWER_MEDIUM,
            Self::High => TX_POWER_HIGH,
        }
    }
}

/// One stored advertise-settings record.
///
/// Records live in the facade's table from creation until process exit;
/// ids are handed out in insertion order and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertiseSettings {
    pub mode: AdvertiseMode,
    pub timeout: Duration,
    pub tx_power: TxPowerLevel,
    pub connectable: bool,
}

impl AdvertiseSettings {
    /// Project the record into the shape the command protocol returns,
    /// using wire codes rather than enum names.
    pub fn to_document(&self) -> serde_json::Value {
        json!({
            "mode": self.mode.code(),
            "timeout_seconds": self.timeout.as_secs(),
            "tx_power_level": self.tx_power.code(),
            "connectable": self.connectable,
        })
    }
}

/// One stored advertise-data record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertiseData {
    pub manufacturer_id: i32,
    pub payload: Vec<u8>,
    pub include_device_name: bool,
}
