//! Command wrappers and registry
//!
//! One wrapper per wire command. A wrapper checks the parameter count
//! (declining silently on mismatch; the dispatcher owns that error),
//! type-checks and extracts each parameter, calls the facade, and writes
//! the `result`/`error` pair back into the request document in place.
//!
//! Handlers are plain functions collected into a [`CommandRegistry`] by one
//! explicit [`register_bt_binder_commands`] call at startup.

use crate::facade::BtBinderFacade;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{error, warn};

pub const CMD_KEY: &str = "cmd";
pub const PARAMS_KEY: &str = "params";
pub const RESULT_KEY: &str = "result";
pub const ERROR_KEY: &str = "error";

/// Generic failure marker, used for both failed results and error codes.
pub const FAIL_MARKER: &str = "fail";
/// Error code for a parameter of the wrong type.
pub const INVALID_PARAM: &str = "invalid parameter";
/// Result sentinel for counter-returning commands that failed.
pub const FAILED_COUNTER: i32 = -1;

pub type CommandHandler = fn(&mut BtBinderFacade, &mut Value);

/// Name → handler lookup table, filled once during startup by the owning
/// process.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, handler: CommandHandler) {
        if self.handlers.insert(name, handler).is_some() {
            warn!(command = name, "Command registered twice; keeping the newer handler");
        }
    }

    pub fn get(&self, name: &str) -> Option<CommandHandler> {
        self.handlers.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

/// Register every Bluetooth control command.
pub fn register_bt_binder_commands(registry: &mut CommandRegistry) {
    registry.register("BtBinderInitInterface", init_interface_wrapper);
    registry.register("BtBinderGetName", get_name_wrapper);
    registry.register("BtBinderSetName", set_name_wrapper);
    registry.register("BtBinderGetAddress", get_address_wrapper);
    registry.register("BtBinderEnable", enable_wrapper);
    registry.register("BtBinderRegisterBLE", register_ble_wrapper);
    registry.register("BtBinderSetAdvSettings", set_adv_settings_wrapper);
    registry.register("BtBinderGetAdvSettings", get_adv_settings_wrapper);
    registry.register("BtBinderBuildAdvData", build_adv_data_wrapper);
    registry.register("BtBinderStartAdvertising", start_advertising_wrapper);
    registry.register("BtBinderStopAdvertising", stop_advertising_wrapper);
}

/// True when the request carries exactly `expected` parameters. A mismatch
/// is logged but NOT answered here; the dispatcher fills in the count
/// error for any document a wrapper declined to touch.
fn param_count_matches(doc: &Value, expected: usize) -> bool {
    let actual = doc.get(PARAMS_KEY).and_then(Value::as_array).map(Vec::len);
    match actual {
        Some(n) if n == expected => true,
        Some(n) => {
            warn!(expected, actual = n, "Parameter count mismatch");
            false
        }
        None => {
            warn!(expected, "Request carries no parameter array");
            false
        }
    }
}

pub(crate) fn respond(doc: &mut Value, result: Value, error: Value) {
    if let Value::Object(map) = doc {
        map.insert(RESULT_KEY.to_string(), result);
        map.insert(ERROR_KEY.to_string(), error);
    }
}

fn respond_ok(doc: &mut Value, result: Value) {
    respond(doc, result, Value::Null);
}

fn respond_fail(doc: &mut Value, placeholder: Value) {
    respond(doc, placeholder, json!(FAIL_MARKER));
}

fn respond_invalid_param(doc: &mut Value, placeholder: Value) {
    respond(doc, placeholder, json!(INVALID_PARAM));
}

fn int_param(doc: &Value, index: usize) -> Option<i32> {
    doc[PARAMS_KEY][index]
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
}

fn uint_param(doc: &Value, index: usize) -> Option<u64> {
    doc[PARAMS_KEY][index].as_u64()
}

fn bool_param(doc: &Value, index: usize) -> Option<bool> {
    doc[PARAMS_KEY][index].as_bool()
}

fn str_param(doc: &Value, index: usize) -> Option<String> {
    doc[PARAMS_KEY][index].as_str().map(str::to_owned)
}

pub fn init_interface_wrapper(facade: &mut BtBinderFacade, doc: &mut Value) {
    if !param_count_matches(doc, 0) {
        return;
    }
    match facade.init_interface() {
        Ok(ok) => respond_ok(doc, json!(ok)),
        Err(_) => respond_fail(doc, json!(false)),
    }
}

pub fn get_name_wrapper(facade: &mut BtBinderFacade, doc: &mut Value) {
    if !param_count_matches(doc, 0) {
        return;
    }
    match facade.name() {
        Ok(name) => respond_ok(doc, json!(name)),
        Err(_) => respond_fail(doc, json!(FAIL_MARKER)),
    }
}

pub fn set_name_wrapper(facade: &mut BtBinderFacade, doc: &mut Value) {
    if !param_count_matches(doc, 1) {
        return;
    }
    let Some(name) = str_param(doc, 0) else {
        error!("Expected string input for name");
        respond_invalid_param(doc, json!(false));
        return;
    };
    match facade.set_name(&name) {
        Ok(ok) => respond_ok(doc, json!(ok)),
        Err(_) => respond_fail(doc, json!(false)),
    }
}

pub fn get_address_wrapper(facade: &mut BtBinderFacade, doc: &mut Value) {
    if !param_count_matches(doc, 0) {
        return;
    }
    match facade.address() {
        Ok(address) => respond_ok(doc, json!(address)),
        Err(_) => respond_fail(doc, json!(FAIL_MARKER)),
    }
}

pub fn enable_wrapper(facade: &mut BtBinderFacade, doc: &mut Value) {
    if !param_count_matches(doc, 0) {
        return;
    }
    match facade.enable() {
        // A platform refusal lands here as Ok(false): false result, null
        // error. Only a missing handle is reported as an error.
        Ok(ok) => respond_ok(doc, json!(ok)),
        Err(_) => respond_fail(doc, json!(false)),
    }
}

pub fn register_ble_wrapper(facade: &mut BtBinderFacade, doc: &mut Value) {
    if !param_count_matches(doc, 0) {
        return;
    }
    match facade.register_ble() {
        Ok(ok) => respond_ok(doc, json!(ok)),
        Err(_) => respond_fail(doc, json!(false)),
    }
}

pub fn set_adv_settings_wrapper(facade: &mut BtBinderFacade, doc: &mut Value) {
    if !param_count_matches(doc, 4) {
        return;
    }
    let Some(mode) = int_param(doc, 0) else {
        error!("Expected int input for mode");
        respond_invalid_param(doc, json!(false));
        return;
    };
    let Some(timeout_seconds) = uint_param(doc, 1) else {
        error!("Expected non-negative int input for timeout");
        respond_invalid_param(doc, json!(false));
        return;
    };
    let Some(tx_power) = int_param(doc, 2) else {
        error!("Expected int input for tx power level");
        respond_invalid_param(doc, json!(false));
        return;
    };
    let Some(connectable) = bool_param(doc, 3) else {
        error!("Expected bool input for connectable");
        respond_invalid_param(doc, json!(false));
        return;
    };
    match facade.set_adv_settings(mode, timeout_seconds, tx_power, connectable) {
        Ok(id) => respond_ok(doc, json!(id)),
        Err(_) => respond_fail(doc, json!(FAILED_COUNTER)),
    }
}

pub fn get_adv_settings_wrapper(facade: &mut BtBinderFacade, doc: &mut Value) {
    if !param_count_matches(doc, 1) {
        return;
    }
    let Some(id) = int_param(doc, 0) else {
        error!("Expected int input for settings id");
        respond_invalid_param(doc, json!(false));
        return;
    };
    match facade.adv_settings(id) {
        Ok(settings) => {
            let body = settings.to_document();
            respond_ok(doc, body);
        }
        Err(_) => respond_fail(doc, Value::Null),
    }
}

pub fn build_adv_data_wrapper(facade: &mut BtBinderFacade, doc: &mut Value) {
    if !param_count_matches(doc, 3) {
        return;
    }
    let Some(manufacturer_id) = int_param(doc, 0) else {
        error!("Expected int input for manufacturer id");
        respond_invalid_param(doc, json!(false));
        return;
    };
    let Some(payload_hex) = str_param(doc, 1) else {
        error!("Expected hex string input for manufacturer data");
        respond_invalid_param(doc, json!(false));
        return;
    };
    let Some(include_device_name) = bool_param(doc, 2) else {
        error!("Expected bool input for include device name");
        respond_invalid_param(doc, json!(false));
        return;
    };
    let Ok(payload) = hex::decode(&payload_hex) else {
        error!("Manufacturer data is not valid hex");
        respond_invalid_param(doc, json!(false));
        return;
    };
    match facade.build_adv_data(manufacturer_id, payload, include_device_name) {
        Ok(id) => respond_ok(doc, json!(id)),
        Err(_) => respond_fail(doc, json!(FAILED_COUNTER)),
    }
}

pub fn start_advertising_wrapper(facade: &mut BtBinderFacade, doc: &mut Value) {
    if !param_count_matches(doc, 2) {
        return;
    }
    let Some(data_id) = int_param(doc, 0) else {
        error!("Expected int input for data id");
        respond_invalid_param(doc, json!(false));
        return;
    };
    let Some(settings_id) = int_param(doc, 1) else {
        error!("Expected int input for settings id");
        respond_invalid_param(doc, json!(false));
        return;
    };
    match facade.start_advertising(data_id, settings_id) {
        Ok(ok) => respond_ok(doc, json!(ok)),
        Err(_) => respond_fail(doc, json!(false)),
    }
}

pub fn stop_advertising_wrapper(facade: &mut BtBinderFacade, doc: &mut Value) {
    if !param_count_matches(doc, 0) {
        return;
    }
    match facade.stop_advertising() {
        Ok(ok) => respond_ok(doc, json!(ok)),
        Err(_) => respond_fail(doc, json!(false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::emulator::EmulatedBluetooth;
    use crate::infrastructure::platform::{BluetoothControl, LowEnergyControl};
    use std::sync::Arc;

    fn request(cmd: &str, params: Value) -> Value {
        json!({ "cmd": cmd, "params": params, "id": 7 })
    }

    fn ready_facade() -> BtBinderFacade {
        let mut facade = BtBinderFacade::with_source(Box::new(EmulatedBluetooth::shared));
        facade.init_interface().unwrap();
        facade.enable().unwrap();
        facade
    }

    #[test]
    fn wrong_arity_leaves_the_document_untouched() {
        let mut facade = ready_facade();
        let mut doc = request("BtBinderGetName", json!(["stray"]));
        let before = doc.clone();
        get_name_wrapper(&mut facade, &mut doc);
        assert_eq!(doc, before);

        let mut doc = request("BtBinderSetName", json!([]));
        let before = doc.clone();
        set_name_wrapper(&mut facade, &mut doc);
        assert_eq!(doc, before);
    }

    #[test]
    fn wrong_type_reports_invalid_parameter_without_calling_through() {
        let mut facade = ready_facade();
        let mut doc = request("BtBinderSetName", json!([42]));
        set_name_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(false));
        assert_eq!(doc[ERROR_KEY], json!(INVALID_PARAM));
        // The facade was never asked to rename anything.
        assert_eq!(
            facade.name().unwrap(),
            crate::infrastructure::emulator::EMULATED_NAME
        );
    }

    #[test]
    fn get_name_round_trips_through_the_facade() {
        let mut facade = ready_facade();

        let mut doc = request("BtBinderSetName", json!(["bridge-7"]));
        set_name_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(true));
        assert_eq!(doc[ERROR_KEY], Value::Null);

        let mut doc = request("BtBinderGetName", json!([]));
        get_name_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!("bridge-7"));
        assert_eq!(doc[ERROR_KEY], Value::Null);
    }

    #[test]
    fn empty_name_reports_the_failure_marker_as_both_fields() {
        let mut facade = ready_facade();
        facade.set_name("").unwrap();

        let mut doc = request("BtBinderGetName", json!([]));
        get_name_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(FAIL_MARKER));
        assert_eq!(doc[ERROR_KEY], json!(FAIL_MARKER));
    }

    #[test]
    fn operations_fail_generically_before_init() {
        let mut facade = BtBinderFacade::with_source(Box::new(|| None));
        let mut doc = request("BtBinderGetAddress", json!([]));
        get_address_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(FAIL_MARKER));
        assert_eq!(doc[ERROR_KEY], json!(FAIL_MARKER));

        let mut doc = request("BtBinderEnable", json!([]));
        enable_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(false));
        assert_eq!(doc[ERROR_KEY], json!(FAIL_MARKER));
    }

    #[test]
    fn enable_platform_failure_is_not_an_error() {
        struct EnableRefused;
        impl BluetoothControl for EnableRefused {
            fn enable(&self) -> bool {
                false
            }
            fn is_enabled(&self) -> bool {
                false
            }
            fn address(&self) -> String {
                String::new()
            }
            fn name(&self) -> String {
                String::new()
            }
            fn set_name(&self, _name: &str) -> bool {
                false
            }
            fn low_energy(&self) -> Option<Arc<dyn LowEnergyControl>> {
                None
            }
        }

        let mut facade = BtBinderFacade::with_source(Box::new(|| {
            Some(Arc::new(EnableRefused) as Arc<dyn BluetoothControl>)
        }));
        facade.init_interface().unwrap();

        let mut doc = request("BtBinderEnable", json!([]));
        enable_wrapper(&mut facade, &mut doc);
        // The refusal shows up as a false result with a NULL error.
        assert_eq!(doc[RESULT_KEY], json!(false));
        assert_eq!(doc[ERROR_KEY], Value::Null);
    }

    #[test]
    fn set_adv_settings_hands_out_increasing_ids() {
        let mut facade = ready_facade();

        let mut doc = request("BtBinderSetAdvSettings", json!([0, 5, 0, true]));
        set_adv_settings_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(0));
        assert_eq!(doc[ERROR_KEY], Value::Null);

        let mut doc = request("BtBinderSetAdvSettings", json!([1, 10, 2, false]));
        set_adv_settings_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(1));
    }

    #[test]
    fn set_adv_settings_maps_codes_select_and_stop() {
        let mut facade = ready_facade();

        let mut doc = request("BtBinderSetAdvSettings", json!([2, 60, 3, true]));
        set_adv_settings_wrapper(&mut facade, &mut doc);
        let id = doc[RESULT_KEY].as_i64().unwrap() as i32;

        let mut doc = request("BtBinderGetAdvSettings", json!([id]));
        get_adv_settings_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY]["mode"], json!(2));
        assert_eq!(doc[RESULT_KEY]["tx_power_level"], json!(3));
        assert_eq!(doc[RESULT_KEY]["timeout_seconds"], json!(60));
        assert_eq!(doc[RESULT_KEY]["connectable"], json!(true));
    }

    #[test]
    fn set_adv_settings_unknown_code_fails_with_the_counter_sentinel() {
        let mut facade = ready_facade();
        let mut doc = request("BtBinderSetAdvSettings", json!([7, 5, 0, true]));
        set_adv_settings_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(FAILED_COUNTER));
        assert_eq!(doc[ERROR_KEY], json!(FAIL_MARKER));
    }

    #[test]
    fn set_adv_settings_type_error_short_circuits() {
        let mut facade = ready_facade();
        let mut doc = request("BtBinderSetAdvSettings", json!([0, "soon", 0, true]));
        set_adv_settings_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(false));
        assert_eq!(doc[ERROR_KEY], json!(INVALID_PARAM));

        // Nothing was stored for the malformed request.
        let mut doc = request("BtBinderGetAdvSettings", json!([0]));
        get_adv_settings_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], Value::Null);
        assert_eq!(doc[ERROR_KEY], json!(FAIL_MARKER));
    }

    #[test]
    fn build_adv_data_decodes_hex_payloads() {
        let mut facade = ready_facade();
        let mut doc = request("BtBinderBuildAdvData", json!([76, "4c000215", true]));
        build_adv_data_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(0));
        assert_eq!(doc[ERROR_KEY], Value::Null);

        let mut doc = request("BtBinderBuildAdvData", json!([76, "not hex", true]));
        build_adv_data_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(false));
        assert_eq!(doc[ERROR_KEY], json!(INVALID_PARAM));
    }

    #[test]
    fn advertising_flow_over_the_emulator() {
        let mut facade = ready_facade();

        let mut doc = request("BtBinderStartAdvertising", json!([0, 0]));
        start_advertising_wrapper(&mut facade, &mut doc);
        // BLE not registered yet.
        assert_eq!(doc[RESULT_KEY], json!(false));
        assert_eq!(doc[ERROR_KEY], json!(FAIL_MARKER));

        let mut doc = request("BtBinderRegisterBLE", json!([]));
        register_ble_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(true));

        let mut doc = request("BtBinderBuildAdvData", json!([76, "0102", false]));
        build_adv_data_wrapper(&mut facade, &mut doc);
        let data_id = doc[RESULT_KEY].clone();

        let mut doc = request("BtBinderSetAdvSettings", json!([2, 0, 3, true]));
        set_adv_settings_wrapper(&mut facade, &mut doc);
        let settings_id = doc[RESULT_KEY].clone();

        let mut doc = request("BtBinderStartAdvertising", json!([data_id, settings_id]));
        start_advertising_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(true));
        assert_eq!(doc[ERROR_KEY], Value::Null);

        let mut doc = request("BtBinderStopAdvertising", json!([]));
        stop_advertising_wrapper(&mut facade, &mut doc);
        assert_eq!(doc[RESULT_KEY], json!(true));
    }
}
