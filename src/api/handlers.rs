//! HTTP handlers

use super::error::ApiError;
use super::request::RiskInput;
use crate::risk::{PredictError, PredictionOutcome, RiskModel};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub const WELCOME_MESSAGE: &str =
    "Welcome to the Accident Risk Prediction API. Use /predict to get risk assessments.";

/// Shared handler state
pub type AppState = Arc<RiskModel>;

/// Result of scoring a validated payload
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Outcome(PredictionOutcome),
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    pub input: RiskInput,
    pub prediction: Prediction,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

pub async fn health(State(model): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "model_loaded": model.is_loaded() }))
}

/// `POST /predict`
///
/// Availability is checked before the body is looked at, so an unloaded
/// model answers 503 for every request.
pub async fn predict(
    State(model): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    if !model.is_loaded() {
        return Err(ApiError::ModelUnavailable);
    }

    let Json(body) = payload?;
    let input = RiskInput::validate(&body)?;
    debug!("Scoring request: {:?}", input);

    let prediction = match model.predict(&input.to_features()) {
        Ok(outcome) => Prediction::Outcome(outcome),
        Err(PredictError::ModelNotLoaded) => return Err(ApiError::ModelUnavailable),
        Err(e) => Prediction::Failed {
            error: e.to_string(),
        },
    };

    Ok(Json(PredictResponse { input, prediction }))
}
