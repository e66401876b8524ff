pub mod emulator;
pub mod logging;
pub mod platform;
