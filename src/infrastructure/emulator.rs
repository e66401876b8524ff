//! Emulated Bluetooth backend
//!
//! An in-memory implementation of the platform traits so the service can
//! run end-to-end on machines without a Bluetooth control service. The
//! test suite drives the same backend.

use crate::domain::advertise::{AdvertiseData, AdvertiseSettings};
use crate::infrastructure::platform::{BluetoothControl, LowEnergyControl};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Address reported by the emulated adapter.
pub const EMULATED_ADDRESS: &str = "00:11:22:33:AA:BB";

/// Name the emulated adapter starts out with.
pub const EMULATED_NAME: &str = "bt_command_bridge emulator";

pub struct EmulatedBluetooth {
    enabled: AtomicBool,
    name: Mutex<String>,
    low_energy: Arc<EmulatedLowEnergy>,
}

impl EmulatedBluetooth {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            name: Mutex::new(EMULATED_NAME.to_string()),
            low_energy: Arc::new(EmulatedLowEnergy::new()),
        }
    }

    pub fn shared() -> Option<Arc<dyn BluetoothControl>> {
        Some(Arc::new(Self::new()))
    }
}

impl Default for EmulatedBluetooth {
    fn default() -> Self {
        Self::new()
    }
}

impl BluetoothControl for EmulatedBluetooth {
    fn enable(&self) -> bool {
        if !self.enabled.swap(true, Ordering::SeqCst) {
            info!("Emulated adapter enabled");
        }
        true
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn address(&self) -> String {
        EMULATED_ADDRESS.to_string()
    }

    fn name(&self) -> String {
        self.name.lock().map(|n| n.clone()).unwrap_or_default()
    }

    fn set_name(&self, name: &str) -> bool {
        match self.name.lock() {
            Ok(mut slot) => {
                *slot = name.to_string();
                true
            }
            Err(_) => false,
        }
    }

    fn low_energy(&self) -> Option<Arc<dyn LowEnergyControl>> {
        Some(self.low_energy.clone())
    }
}

pub struct EmulatedLowEnergy {
    advertising: AtomicBool,
}

impl EmulatedLowEnergy {
    pub fn new() -> Self {
        Self {
            advertising: AtomicBool::new(false),
        }
    }
}

impl Default for EmulatedLowEnergy {
    fn default() -> Self {
        Self::new()
    }
}

impl LowEnergyControl for EmulatedLowEnergy {
    fn start_advertising(&self, data: &AdvertiseData, settings: &AdvertiseSettings) -> bool {
        debug!(
            manufacturer_id = data.manufacturer_id,
            payload_len = data.payload.len(),
            mode = settings.mode.code(),
            "Emulated advertising started"
        );
        self.advertising.store(true, Ordering::SeqCst);
        true
    }

    fn stop_advertising(&self) -> bool {
        // Stopping an idle advertiser is a no-op, not a failure.
        self.advertising.swap(false, Ordering::SeqCst);
        true
    }
}
