//! Road Accident Risk Prediction Service
//!
//! This crate exposes a pre-trained XGBoost regression model over HTTP. Callers
//! send road and context attributes, the service returns a risk score in
//! `[0, 1]` together with a Low / Medium / High risk level.
//!
//! # Modules
//!
//! - [`features`] - Canonical feature schema and feature-vector assembly
//! - [`models`] - Regressor trait and the native XGBoost JSON scorer
//! - [`risk`] - Risk model adapter, score normalization and classification
//! - [`api`] - Request validation, HTTP handlers and server wiring
//! - [`utils`] - Configuration and logging
//!
//! # Example
//!
//! ```rust,no_run
//! use accident_risk::{api, risk::RiskModel, utils::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let model = RiskModel::load(&config.model.path);
//!     api::serve(&config, model).await
//! }
//! ```

pub mod api;
pub mod features;
pub mod models;
pub mod risk;
pub mod utils;

// Re-export commonly used items at the crate level
pub use features::{coerce_order, FeatureVector, SchemaError, FEATURE_NAMES};
pub use models::{ModelError, Regressor, XgbRegressor};
pub use risk::{ModelHandle, PredictError, PredictionOutcome, RiskLevel, RiskModel};
pub use utils::Config;
