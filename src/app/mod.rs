pub mod config;
pub mod save_location;
pub mod settings;
