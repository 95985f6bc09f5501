//! Risk assessment module.

mod level;
mod model;

pub use level::{clamp_score, round_score, RiskLevel, HIGH_THRESHOLD, MEDIUM_THRESHOLD};
pub use model::{ModelHandle, PredictError, PredictionOutcome, RiskModel};
