//! Platform Bluetooth interface seam
//!
//! The actual Bluetooth service lives in another process and is owned by
//! the platform; this module only defines the narrow surface the facade
//! calls through, plus the factory lookup that hands out a client handle.

use crate::domain::advertise::{AdvertiseData, AdvertiseSettings};
use std::sync::Arc;
use tracing::warn;

/// Client surface of the platform Bluetooth control service.
///
/// Implementations are shared handles into an external service; the facade
/// borrows them as `Option<Arc<dyn BluetoothControl>>` and checks for
/// presence at every use site.
pub trait BluetoothControl: Send + Sync {
    /// Ask the platform to power up the radio. Returns the platform's
    /// verdict, not the resulting state.
    fn enable(&self) -> bool;

    fn is_enabled(&self) -> bool;

    /// Public adapter address, colon-separated hex.
    fn address(&self) -> String;

    /// Adapter friendly name. The platform reports an empty string when no
    /// name has been assigned.
    fn name(&self) -> String;

    fn set_name(&self, name: &str) -> bool;

    /// Hand out the low-energy sub-interface, if the platform offers one.
    fn low_energy(&self) -> Option<Arc<dyn LowEnergyControl>>;
}

/// Low-energy sub-interface obtained from [`BluetoothControl::low_energy`].
pub trait LowEnergyControl: Send + Sync {
    fn start_advertising(&self, data: &AdvertiseData, settings: &AdvertiseSettings) -> bool;

    fn stop_advertising(&self) -> bool;
}

/// Look up the platform's Bluetooth client interface.
///
/// No platform transport is wired up in this build; callers get `None` and
/// should fall back to the emulated backend for local work.
pub fn client_interface() -> Option<Arc<dyn BluetoothControl>> {
    warn!("No platform Bluetooth interface available on this build");
    None
}
