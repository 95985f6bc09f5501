//! HTTP API module
//!
//! - `GET /` - welcome message
//! - `GET /health` - liveness and model state
//! - `POST /predict` - score a road/context payload

pub mod error;
pub mod handlers;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use handlers::{PredictResponse, Prediction, WELCOME_MESSAGE};
pub use request::{FieldError, RiskInput, ValidationErrors};
pub use server::{cors_layer, router, serve};
