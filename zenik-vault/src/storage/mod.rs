pub mod config;
pub mod paths;

pub use config::{load_settings, save_settings, AppSettings};
pub use paths::{default_data_dir, VaultPaths, CONFIG_FILE, LOG_FILE};
