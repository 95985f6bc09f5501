//! Canonical feature schema
//!
//! The model was trained on a fixed column order. Everything that reaches the
//! scorer goes through [`coerce_order`], which selects the canonical columns
//! from an arbitrary-order mapping.

use serde_json::{Map, Value};
use thiserror::Error;

/// Number of model input columns
pub const NUM_FEATURES: usize = 16;

/// Model input columns in training order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "num_lanes",
    "curvature",
    "speed_limit",
    "road_signs_present",
    "public_road",
    "holiday",
    "school_season",
    "num_reported_accidents",
    "road_type_rural",
    "road_type_urban",
    "lighting_dim",
    "lighting_night",
    "weather_foggy",
    "weather_rainy",
    "time_of_day_evening",
    "time_of_day_morning",
];

/// Errors raised while projecting an input onto the schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Missing features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    #[error("Feature '{0}' is not numeric")]
    NonNumeric(String),
}

/// A single row of model input, aligned with [`FEATURE_NAMES`]
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Values in canonical order
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Look up a value by feature name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume into a single-row batch for a [`crate::models::Regressor`]
    pub fn into_row(self) -> Vec<f64> {
        self.values
    }
}

/// Re-project `input` into canonical order.
///
/// Selection is driven by the canonical name list, so keys outside the schema
/// are ignored. Booleans are accepted as 0/1.
pub fn coerce_order(input: &Map<String, Value>) -> Result<FeatureVector, SchemaError> {
    let missing: Vec<String> = FEATURE_NAMES
        .iter()
        .filter(|name| !input.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError::MissingFeatures(missing));
    }

    let values = FEATURE_NAMES
        .iter()
        .map(|name| match &input[*name] {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| SchemaError::NonNumeric(name.to_string())),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            _ => Err(SchemaError::NonNumeric(name.to_string())),
        })
        .collect::<Result<Vec<f64>, SchemaError>>()?;

    Ok(FeatureVector { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_input() -> Map<String, Value> {
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

    #[test]
    fn test_canonical_order() {
        let vector = coerce_order(&sample_input()).unwrap();
        assert_eq!(vector.len(), NUM_FEATURES);
        assert_eq!(vector.as_slice()[0], 2.0);
        assert_eq!(vector.as_slice()[1], 0.35);
        assert_eq!(vector.get("num_reported_accidents"), Some(3.0));
        assert_eq!(vector.get("unknown"), None);
    }

    #[test]
    fn test_order_independent() {
        let input = sample_input();
        let mut reversed = Map::new();
        for (k, v) in input.iter().rev() {
            reversed.insert(k.clone(), v.clone());
        }
        assert_eq!(coerce_order(&input).unwrap(), coerce_order(&reversed).unwrap());
    }

    #[test]
    fn test_missing_features_listed() {
        let mut input = sample_input();
        input.remove("curvature");
        input.remove("holiday");
        let err = coerce_order(&input).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingFeatures(vec!["curvature".to_string(), "holiday".to_string()])
        );
    }

    #[test]
    fn test_extra_keys_ignored() {
        let mut input = sample_input();
        input.insert("latitude".to_string(), json!(52.1));
        let vector = coerce_order(&input).unwrap();
        assert_eq!(vector, coerce_order(&sample_input()).unwrap());
    }

    #[test]
    fn test_non_numeric_rejected() {
        let mut input = sample_input();
        input.insert("speed_limit".to_string(), json!("fast"));
        assert_eq!(
            coerce_order(&input).unwrap_err(),
            SchemaError::NonNumeric("speed_limit".to_string())
        );
    }

    #[test]
    fn test_bool_flags() {
        let mut input = sample_input();
        input.insert("holiday".to_string(), json!(true));
        assert_eq!(coerce_order(&input).unwrap().get("holiday"), Some(1.0));
    }
}
