//! Bluetooth control facade
//!
//! Owns the borrowed platform handles and the advertise record tables, and
//! exposes one method per remote command. Methods take already-typed
//! arguments; parameter parsing lives with the command wrappers.

use crate::domain::advertise::{AdvertiseData, AdvertiseMode, AdvertiseSettings, TxPowerLevel};
use crate::infrastructure::platform::{self, BluetoothControl, LowEnergyControl};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

/// Failure modes of the facade operations.
#[derive(Debug, Error, PartialEq)]
pub enum FacadeError {
    /// The control handle has not been acquired yet.
    #[error("bluetooth interface not initialized")]
    NotInitialized,
    /// The platform service reports the adapter as not enabled.
    #[error("bluetooth interface not enabled")]
    NotEnabled,
    /// An operation needed the low-energy handle before it was registered.
    #[error("low-energy interface not registered")]
    BleNotRegistered,
    /// Advertise mode code outside the accepted values.
    #[error("unrecognized advertise mode code {0}")]
    InvalidMode(i32),
    /// Tx power level code outside the accepted values.
    #[error("unrecognized tx power level code {0}")]
    InvalidTxPower(i32),
    /// No stored record under the given id.
    #[error("no record stored under id {0}")]
    UnknownId(i32),
    /// The platform call itself reported failure.
    #[error("{0}")]
    CallFailed(&'static str),
}

type InterfaceSource = Box<dyn Fn() -> Option<Arc<dyn BluetoothControl>> + Send>;

/// Command-facing adapter over the platform Bluetooth interface.
///
/// One instance is constructed at startup and handed to the dispatcher;
/// all state (handles, advertise tables) lives here rather than in
/// process-wide globals.
pub struct BtBinderFacade {
    source: InterfaceSource,
    control: Option<Arc<dyn BluetoothControl>>,
    low_energy: Option<Arc<dyn LowEnergyControl>>,
    adv_settings: HashMap<i32, AdvertiseSettings>,
    adv_settings_count: i32,
    adv_data: HashMap<i32, AdvertiseData>,
    adv_data_count: i32,
}

impl BtBinderFacade {
    /// Facade wired to the platform factory lookup.
    pub fn new() -> Self {
        Self::with_source(Box::new(platform::client_interface))
    }

    /// Facade wired to a caller-supplied interface source. This is how the
    /// emulated backend (and the test suite) get plugged in.
    pub fn with_source(source: InterfaceSource) -> Self {
        Self {
            source,
            control: None,
            low_energy: None,
            adv_settings: HashMap::new(),
            adv_settings_count: 0,
            adv_data: HashMap::new(),
            adv_data_count: 0,
        }
    }

    /// Shared precondition: handle acquired and adapter enabled.
    fn require_enabled(&self) -> Result<&Arc<dyn BluetoothControl>, FacadeError> {
        let control = self.control.as_ref().ok_or_else(|| {
            error!("Bluetooth interface not initialized");
            FacadeError::NotInitialized
        })?;
        if !control.is_enabled() {
            error!("Bluetooth interface not enabled");
            return Err(FacadeError::NotEnabled);
        }
        Ok(control)
    }

    /// Acquire the control handle from the platform.
    pub fn init_interface(&mut self) -> Result<bool, FacadeError> {
        match (self.source)() {
            Some(control) => {
                self.control = Some(control);
                Ok(true)
            }
            None => {
                error!("Failed to acquire the Bluetooth control interface");
                Err(FacadeError::NotInitialized)
            }
        }
    }

    /// Ask the platform to enable the adapter.
    ///
    /// Only requires the handle, not the enabled state, since enabling is
    /// what establishes that state. A platform-reported refusal is surfaced as
    /// `Ok(false)`, not as an error; the wire contract reports it as a
    /// false result with a null error.
    pub fn enable(&self) -> Result<bool, FacadeError> {
        let control = self.control.as_ref().ok_or_else(|| {
            error!("Bluetooth interface not initialized");
            FacadeError::NotInitialized
        })?;
        let enabled = control.enable();
        if !enabled {
            warn!("Platform refused to enable the Bluetooth service");
        }
        Ok(enabled)
    }

    pub fn address(&self) -> Result<String, FacadeError> {
        Ok(self.require_enabled()?.address())
    }

    /// Adapter name; an empty name is treated as a failure sentinel.
    pub fn name(&self) -> Result<String, FacadeError> {
        let name = self.require_enabled()?.name();
        if name.is_empty() {
            error!("Failed to get adapter name");
            return Err(FacadeError::CallFailed("adapter reported an empty name"));
        }
        Ok(name)
    }

    pub fn set_name(&self, name: &str) -> Result<bool, FacadeError> {
        if !self.require_enabled()?.set_name(name) {
            error!("Failed to set adapter name");
            return Err(FacadeError::CallFailed("failed to set adapter name"));
        }
        Ok(true)
    }

    /// Acquire the low-energy sub-interface.
    pub fn register_ble(&mut self) -> Result<bool, FacadeError> {
        let low_energy = self.require_enabled()?.low_energy();
        match low_energy {
            Some(handle) => {
                self.low_energy = Some(handle);
                Ok(true)
            }
            None => {
                error!("Failed to register the low-energy interface");
                Err(FacadeError::CallFailed("low-energy interface unavailable"))
            }
        }
    }

    /// Build and store an advertise-settings record, returning its id.
    /// Ids are the running insertion count; records are kept for the life
    /// of the process.
    pub fn set_adv_settings(
        &mut self,
        mode_code: i32,
        timeout_seconds: u64,
        tx_power_code: i32,
        connectable: bool,
    ) -> Result<i32, FacadeError> {
        self.require_enabled()?;
        let mode = AdvertiseMode::from_code(mode_code).ok_or_else(|| {
            error!(mode_code, "Advertise mode is outside the accepted values");
            FacadeError::InvalidMode(mode_code)
        })?;
        let tx_power = TxPowerLevel::from_code(tx_power_code).ok_or_else(|| {
            error!(tx_power_code, "Tx power level is outside the accepted values");
            FacadeError::InvalidTxPower(tx_power_code)
        })?;

        let settings = AdvertiseSettings {
            mode,
            timeout: Duration::from_secs(timeout_seconds),
            tx_power,
            connectable,
        };
        let id = self.adv_settings_count;
        self.adv_settings.insert(id, settings);
        self.adv_settings_count += 1;
        Ok(id)
    }

    /// Look up a stored advertise-settings record.
    pub fn adv_settings(&self, id: i32) -> Result<&AdvertiseSettings, FacadeError> {
        self.require_enabled()?;
        self.adv_settings
            .get(&id)
            .ok_or(FacadeError::UnknownId(id))
    }

    /// Build and store an advertise-data record, returning its id.
    pub fn build_adv_data(
        &mut self,
        manufacturer_id: i32,
        payload: Vec<u8>,
        include_device_name: bool,
    ) -> Result<i32, FacadeError> {
        self.require_enabled()?;
        let data = AdvertiseData {
            manufacturer_id,
            payload,
            include_device_name,
        };
        let id = self.adv_data_count;
        self.adv_data.insert(id, data);
        self.adv_data_count += 1;
        Ok(id)
    }

    /// Start advertising with previously stored data and settings records.
    pub fn start_advertising(&self, data_id: i32, settings_id: i32) -> Result<bool, FacadeError> {
        self.require_enabled()?;
        let low_energy = self.low_energy.as_ref().ok_or_else(|| {
            error!("Low-energy interface not registered");
            FacadeError::BleNotRegistered
        })?;
        let data = self
            .adv_data
            .get(&data_id)
            .ok_or(FacadeError::UnknownId(data_id))?;
        let settings = self
            .adv_settings
            .get(&settings_id)
            .ok_or(FacadeError::UnknownId(settings_id))?;
        if !low_energy.start_advertising(data, settings) {
            error!("Platform rejected the advertising start");
            return Err(FacadeError::CallFailed("failed to start advertising"));
        }
        Ok(true)
    }

    pub fn stop_advertising(&self) -> Result<bool, FacadeError> {
        self.require_enabled()?;
        let low_energy = self.low_energy.as_ref().ok_or_else(|| {
            error!("Low-energy interface not registered");
            FacadeError::BleNotRegistered
        })?;
        if !low_energy.stop_advertising() {
            error!("Platform rejected the advertising stop");
            return Err(FacadeError::CallFailed("failed to stop advertising"));
        }
        Ok(true)
    }
}
