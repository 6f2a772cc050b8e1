mod config;
pub use config::{AppConfig, SYSTEM_MESSAGE};
