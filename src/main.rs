mod commands;
mod domain;
mod facade;
mod infrastructure;
mod server;

use commands::{register_bt_binder_commands, CommandRegistry};
use domain::settings::SettingsService;
use facade::BtBinderFacade;
use infrastructure::emulator::EmulatedBluetooth;
use server::CommandServer;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();

    let _logging = infrastructure::logging::init_logger(&settings.log_settings)?;
    info!("Starting Bluetooth command bridge");

    let emulated = settings.emulated_backend || std::env::args().any(|a| a == "--emulated");
    let facade = if emulated {
        info!("Serving the emulated Bluetooth backend");
        BtBinderFacade::with_source(Box::new(EmulatedBluetooth::shared))
    } else {
        BtBinderFacade::new()
    };

    let mut registry = CommandRegistry::new();
    register_bt_binder_commands(&mut registry);

    CommandServer::new(facade, registry).run(&settings.listen_name)
}
