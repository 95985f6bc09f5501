//! Utility modules.

pub mod config;
pub mod logging;

pub use config::{load_config, Config, CorsConfig, ModelConfig, ServerConfig};
pub use logging::setup_logging;
