pub mod bank_loader;
pub mod config;
pub mod console;
