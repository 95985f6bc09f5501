//! Risk model adapter.
//!
//! Owns the scorer loaded at startup and turns a raw feature mapping into a
//! [`PredictionOutcome`]. The handle is decided once in [`RiskModel::load`] and
//! never changes afterwards, so a `RiskModel` can be shared behind an `Arc`
//! without locking.

use super::level::{clamp_score, round_score, RiskLevel};
use crate::features::{coerce_order, SchemaError, FEATURE_NAMES};
use crate::models::{ModelError, Regressor, XgbRegressor};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors returned by [`RiskModel::predict`]
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    Scoring(#[from] ModelError),
}

/// A scored request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionOutcome {
    /// Clamped to [0, 1] and rounded to two decimals
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    /// The mapping passed to `predict`, before reordering
    pub factors: Map<String, Value>,
}

/// The loaded scorer, or the reason there is none
#[derive(Clone)]
pub enum ModelHandle {
    Loaded(Arc<dyn Regressor>),
    Unloaded { reason: String },
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelHandle::Loaded(model) => write!(f, "Loaded({})", model.describe()),
            ModelHandle::Unloaded { reason } => write!(f, "Unloaded({})", reason),
        }
    }
}

/// Accident risk model
#[derive(Debug, Clone)]
pub struct RiskModel {
    handle: ModelHandle,
}

impl RiskModel {
    /// Load the XGBoost artifact at `path`.
    ///
    /// Never fails: a missing or unreadable artifact is logged and yields an
    /// unloaded model, so the service can still start and report it.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            let reason = format!("Model file {} not found", path.display());
            error!("{}", reason);
            return Self::unloaded(reason);
        }

        match XgbRegressor::from_file(path) {
            Ok(model) => {
                let names = model.feature_names();
                if !names.is_empty() && !names.iter().map(String::as_str).eq(FEATURE_NAMES) {
                    warn!(
                        "Model feature names {:?} differ from the request schema",
                        names
                    );
                }
                info!("Successfully loaded XGBoost model from {}", path.display());
                Self::from_regressor(Arc::new(model))
            }
            Err(e) => {
                let reason = format!("Error loading model: {}", e);
                error!("{}", reason);
                Self::unloaded(reason)
            }
        }
    }

    /// Wrap an in-memory scorer
    pub fn from_regressor(model: Arc<dyn Regressor>) -> Self {
        Self {
            handle: ModelHandle::Loaded(model),
        }
    }

    /// A model that rejects every prediction
    pub fn unloaded(reason: impl Into<String>) -> Self {
        Self {
            handle: ModelHandle::Unloaded {
                reason: reason.into(),
            },
        }
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.handle, ModelHandle::Loaded(_))
    }

    /// Score one request.
    ///
    /// `features` may list the schema fields in any order; extra keys are
    /// ignored for scoring but echoed back in `factors`.
    pub fn predict(&self, features: &Map<String, Value>) -> Result<PredictionOutcome, PredictError> {
        let model = match &self.handle {
            ModelHandle::Loaded(model) => model,
            ModelHandle::Unloaded { .. } => return Err(PredictError::ModelNotLoaded),
        };

        let result = Self::score(model.as_ref(), features);
        if let Err(e) = &result {
            warn!("Prediction error: {}", e);
        }
        result
    }

    fn score(
        model: &dyn Regressor,
        features: &Map<String, Value>,
    ) -> Result<PredictionOutcome, PredictError> {
        let row = coerce_order(features)?.into_row();
        let outputs = model.predict(&[row])?;
        let raw = outputs.first().copied().ok_or_else(|| {
            ModelError::PredictionFailed("model returned no output".to_string())
        })?;
        if !raw.is_finite() {
            return Err(ModelError::PredictionFailed(format!("model returned {}", raw)).into());
        }

        let score = clamp_score(raw);
        let risk_level = RiskLevel::from_score(score);
        debug!("raw={:.4} score={:.4} level={}", raw, score, risk_level);

        Ok(PredictionOutcome {
            risk_score: round_score(score),
            risk_level,
            factors: features.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct FixedRegressor(f64);

    impl Regressor for FixedRegressor {
        fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
            Ok(features.iter().map(|_| self.0).collect())
        }
    }

    /// Returns the sum of the row so order changes would be visible
    struct WeightedRegressor;

    impl Regressor for WeightedRegressor {
        fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
            Ok(features
                .iter()
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .map(|(i, x)| x * (i + 1) as f64 / 1000.0)
                        .sum()
                })
                .collect())
        }
    }

    struct FailingRegressor;

    impl Regressor for FailingRegressor {
        fn predict(&self, _features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
            Err(ModelError::FeatureShapeMismatch {
                expected: 15,
                got: 16,
            })
        }
    }

    fn sample_features() -> Map<String, Value> {
        let value = json!({
            "num_lanes": 2,
            "curvature": 0.35,
            "speed_limit": 60,
            "road_signs_present": 1,
            "public_road": 1,
            "holiday": 0,
            "school_season": 1,
            "num_reported_accidents": 3,
            "road_type_rural": 0,
            "road_type_urban": 1,
            "lighting_dim": 0,
            "lighting_night": 1,
            "weather_foggy": 0,
            "weather_rainy": 1,
            "time_of_day_evening": 1,
            "time_of_day_morning": 0
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn fixed(raw: f64) -> RiskModel {
        RiskModel::from_regressor(Arc::new(FixedRegressor(raw)))
    }

    #[test]
    fn test_score_clamped() {
        let low = fixed(-0.5).predict(&sample_features()).unwrap();
        assert_eq!(low.risk_score, 0.0);
        assert_eq!(low.risk_level, RiskLevel::Low);

        let high = fixed(1.3).predict(&sample_features()).unwrap();
        assert_eq!(high.risk_score, 1.0);
        assert_eq!(high.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_level_uses_unrounded_score() {
        let outcome = fixed(0.29999).predict(&sample_features()).unwrap();
        assert_eq!(outcome.risk_score, 0.3);
        assert_eq!(outcome.risk_level, RiskLevel::Low);

        let outcome = fixed(0.69999).predict(&sample_features()).unwrap();
        assert_eq!(outcome.risk_level, RiskLevel::Medium);

        let outcome = fixed(0.7).predict(&sample_features()).unwrap();
        assert_eq!(outcome.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_score_rounded() {
        let outcome = fixed(0.456).predict(&sample_features()).unwrap();
        assert_eq!(outcome.risk_score, 0.46);
        assert_eq!(outcome.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_factors_echo_original_input() {
        let mut features = Map::new();
        for (k, v) in sample_features().into_iter().rev() {
            features.insert(k, v);
        }
        features.insert("note".to_string(), json!("extra"));

        let outcome = fixed(0.5).predict(&features).unwrap();
        assert_eq!(outcome.factors, features);
        assert_eq!(
            outcome.factors.keys().next().map(String::as_str),
            Some("time_of_day_morning")
        );
        assert_eq!(outcome.factors["note"], json!("extra"));
    }

    #[test]
    fn test_permutation_gives_same_prediction() {
        let model = RiskModel::from_regressor(Arc::new(WeightedRegressor));
        let features = sample_features();
        let mut reversed = Map::new();
        for (k, v) in features.iter().rev() {
            reversed.insert(k.clone(), v.clone());
        }

        let a = model.predict(&features).unwrap();
        let b = model.predict(&reversed).unwrap();
        assert_eq!(a.risk_score, b.risk_score);
        assert_eq!(a.risk_level, b.risk_level);
    }

    #[test]
    fn test_repeated_calls_identical() {
        let model = RiskModel::from_regressor(Arc::new(WeightedRegressor));
        let features = sample_features();
        let first = model.predict(&features).unwrap();
        for _ in 0..5 {
            assert_eq!(model.predict(&features).unwrap(), first);
        }
    }

    #[test]
    fn test_unloaded_model() {
        let model = RiskModel::unloaded("no artifact");
        assert!(!model.is_loaded());
        let err = model.predict(&sample_features()).unwrap_err();
        assert!(matches!(err, PredictError::ModelNotLoaded));
        assert_eq!(err.to_string(), "Model not loaded");
    }

    #[test]
    fn test_scoring_failure_is_contained() {
        let model = RiskModel::from_regressor(Arc::new(FailingRegressor));
        let err = model.predict(&sample_features()).unwrap_err();
        assert!(matches!(err, PredictError::Scoring(_)));
    }

    #[test]
    fn test_missing_feature_is_reported() {
        let mut features = sample_features();
        features.remove("speed_limit");
        let err = fixed(0.5).predict(&features).unwrap_err();
        assert!(matches!(err, PredictError::Schema(SchemaError::MissingFeatures(_))));
    }

    #[test]
    fn test_non_finite_output_rejected() {
        let err = fixed(f64::NAN).predict(&sample_features()).unwrap_err();
        assert!(matches!(err, PredictError::Scoring(ModelError::PredictionFailed(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let model = RiskModel::load(dir.path().join("model_xgboost.json"));
        assert!(!model.is_loaded());
        match model.handle() {
            ModelHandle::Unloaded { reason } => assert!(reason.contains("not found")),
            ModelHandle::Loaded(_) => panic!("expected unloaded handle"),
        }
    }

    #[test]
    fn test_load_corrupt_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a model").unwrap();
        let model = RiskModel::load(file.path());
        assert!(!model.is_loaded());
    }

    #[test]
    fn test_load_valid_file() {
        let trees: Vec<Value> = vec![json!({
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "split_indices": [7, 0, 0],
            "split_conditions": [2.5, 0.1, 0.6],
            "default_left": [0, 0, 0]
        })];
        let artifact = json!({
            "learner": {
                "feature_names": FEATURE_NAMES,
                "gradient_booster": {"name": "gbtree", "model": {"trees": trees}},
                "learner_model_param": {"base_score": "1E-1", "num_feature": "16"},
                "objective": {"name": "reg:squarederror"}
            },
            "version": [2, 1, 0]
        });
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(artifact.to_string().as_bytes()).unwrap();

        let model = RiskModel::load(file.path());
        assert!(model.is_loaded());

        // num_reported_accidents = 3 goes right: 0.1 + 0.6
        let outcome = model.predict(&sample_features()).unwrap();
        assert_eq!(outcome.risk_score, 0.7);
        assert_eq!(outcome.risk_level, RiskLevel::High);
    }
}
