//! Machine learning models module
//!
//! This module provides:
//! - The [`Regressor`] trait the risk adapter scores through
//! - A native evaluator for XGBoost models saved in JSON format

pub mod xgboost;

pub use xgboost::{Objective, XgbRegressor};

use thiserror::Error;

/// Errors that can occur with the model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse model: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported model: {0}")]
    Unsupported(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Feature shape mismatch, expected: {expected}, got {got}")]
    FeatureShapeMismatch { expected: usize, got: usize },

    #[error("Prediction failed: {0}")]
    PredictionFailed(String),
}

/// A fitted regression model that scores rows of numeric features
pub trait Regressor: Send + Sync {
    /// Score a batch of rows, one output per row
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError>;

    /// Number of input columns the model was trained on, if known
    fn num_features(&self) -> Option<usize> {
        None
    }

    /// Short human-readable description used in logs
    fn describe(&self) -> String {
        "regressor".to_string()
    }
}
