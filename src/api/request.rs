//! Inbound payload validation.
//!
//! The body is checked field by field against a fixed table so every problem
//! is reported at once, each with its location, before anything reaches the
//! model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Validated `/predict` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskInput {
    // Road characteristics
    pub num_lanes: i64,
    pub curvature: f64,
    pub speed_limit: i64,

    // 0/1 indicators
    pub road_signs_present: i64,
    pub public_road: i64,
    pub holiday: i64,
    pub school_season: i64,

    // History
    pub num_reported_accidents: i64,

    // One-hot categorical flags, 0 when absent
    pub road_type_rural: i64,
    pub road_type_urban: i64,
    pub lighting_dim: i64,
    pub lighting_night: i64,
    pub weather_foggy: i64,
    pub weather_rainy: i64,
    pub time_of_day_evening: i64,
    pub time_of_day_morning: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Int,
    Float,
}

struct FieldSpec {
    name: &'static str,
    kind: FieldKind,
    /// `None` means required
    default: Option<i64>,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        default: None,
    }
}

const fn flag(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Int,
        default: Some(0),
    }
}

const FIELDS: [FieldSpec; 16] = [
    required("num_lanes", FieldKind::Int),
    required("curvature", FieldKind::Float),
    required("speed_limit", FieldKind::Int),
    required("road_signs_present", FieldKind::Int),
    required("public_road", FieldKind::Int),
    required("holiday", FieldKind::Int),
    required("school_season", FieldKind::Int),
    required("num_reported_accidents", FieldKind::Int),
    flag("road_type_rural"),
    flag("road_type_urban"),
    flag("lighting_dim"),
    flag("lighting_night"),
    flag("weather_foggy"),
    flag("weather_rainy"),
    flag("time_of_day_evening"),
    flag("time_of_day_morning"),
];

/// One field-level validation failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

impl FieldError {
    fn new(loc: &[&str], kind: &str, msg: &str, input: Option<&Value>) -> Self {
        Self {
            loc: loc.iter().map(|s| s.to_string()).collect(),
            msg: msg.to_string(),
            kind: kind.to_string(),
            input: input.cloned(),
        }
    }

    fn field(name: &str, kind: &str, msg: &str, input: Option<&Value>) -> Self {
        Self::new(&["body", name], kind, msg, input)
    }

    /// The body could not be read as a JSON object
    pub fn invalid_body(msg: &str) -> Self {
        Self::new(&["body"], "json_invalid", msg, None)
    }
}

/// All validation failures for one payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Field names that failed, in schema order
    pub fn fields(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|e| e.loc.get(1).map(String::as_str))
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.0.len())?;
        for e in &self.0 {
            write!(f, "; {}: {}", e.loc.join("."), e.msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl RiskInput {
    /// Validate a raw JSON body.
    ///
    /// Integer fields accept integers, integral floats, booleans and integer
    /// strings. `curvature` accepts any number or numeric string. Unknown keys
    /// are dropped.
    pub fn validate(body: &Value) -> Result<Self, ValidationErrors> {
        let object = match body {
            Value::Object(object) => object,
            _ => {
                return Err(ValidationErrors(vec![FieldError::invalid_body(
                    "Input should be a valid dictionary",
                )]))
            }
        };

        let mut values = Map::new();
        let mut errors = Vec::new();

        for spec in FIELDS.iter() {
            match (object.get(spec.name), spec.default) {
                (Some(raw), _) => {
                    let parsed = match spec.kind {
                        FieldKind::Int => coerce_int(spec.name, raw).map(Value::from),
                        FieldKind::Float => coerce_float(spec.name, raw).map(Value::from),
                    };
                    match parsed {
                        Ok(value) => {
                            values.insert(spec.name.to_string(), value);
                        }
                        Err(e) => errors.push(e),
                    }
                }
                (None, Some(default)) => {
                    values.insert(spec.name.to_string(), Value::from(default));
                }
                (None, None) => {
                    errors.push(FieldError::field(spec.name, "missing", "Field required", None));
                }
            }
        }

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        serde_json::from_value(Value::Object(values)).map_err(|e| {
            ValidationErrors(vec![FieldError::invalid_body(&e.to_string())])
        })
    }

    /// The validated payload as a name → value mapping in schema order
    pub fn to_features(&self) -> Map<String, Value> {
        let values = [
            Value::from(self.num_lanes),
            Value::from(self.curvature),
            Value::from(self.speed_limit),
            Value::from(self.road_signs_present),
            Value::from(self.public_road),
            Value::from(self.holiday),
            Value::from(self.school_season),
            Value::from(self.num_reported_accidents),
            Value::from(self.road_type_rural),
            Value::from(self.road_type_urban),
            Value::from(self.lighting_dim),
            Value::from(self.lighting_night),
            Value::from(self.weather_foggy),
            Value::from(self.weather_rainy),
            Value::from(self.time_of_day_evening),
            Value::from(self.time_of_day_morning),
        ];
        FIELDS
            .iter()
            .map(|spec| spec.name.to_string())
            .zip(values)
            .collect()
    }
}

fn coerce_int(name: &str, raw: &Value) -> Result<i64, FieldError> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(f as i64)
                }
                Some(f) if f.is_finite() && f.fract() != 0.0 => Err(FieldError::field(
                    name,
                    "int_from_float",
                    "Input should be a valid integer, got a number with a fractional part",
                    Some(raw),
                )),
                _ => Err(FieldError::field(
                    name,
                    "int_type",
                    "Input should be a valid integer",
                    Some(raw),
                )),
            }
        }
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            FieldError::field(
                name,
                "int_parsing",
                "Input should be a valid integer, unable to parse string as an integer",
                Some(raw),
            )
        }),
        _ => Err(FieldError::field(
            name,
            "int_type",
            "Input should be a valid integer",
            Some(raw),
        )),
    }
}

fn coerce_float(name: &str, raw: &Value) -> Result<f64, FieldError> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            return s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| {
                    FieldError::field(
                        name,
                        "float_parsing",
                        "Input should be a valid number, unable to parse string as a number",
                        Some(raw),
                    )
                })
        }
        _ => None,
    };
    parsed.ok_or_else(|| {
        FieldError::field(name, "float_type", "Input should be a valid number", Some(raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_NAMES;
    use serde_json::json;

    fn required_only() -> Value {
        json!({
            "num_lanes": 2,
            "curvature": 0.4,
            "speed_limit": 50,
            "road_signs_present": 1,
            "public_road": 1,
            "holiday": 0,
            "school_season": 0,
            "num_reported_accidents": 1
        })
    }

    #[test]
    fn test_defaults_applied() {
        let input = RiskInput::validate(&required_only()).unwrap();
        assert_eq!(input.num_lanes, 2);
        assert_eq!(input.curvature, 0.4);
        assert_eq!(input.road_type_rural, 0);
        assert_eq!(input.time_of_day_morning, 0);
    }

    #[test]
    fn test_missing_required_fields_reported() {
        let mut body = required_only();
        let object = body.as_object_mut().unwrap();
        object.remove("num_lanes");
        object.remove("curvature");

        let errors = RiskInput::validate(&body).unwrap_err();
        assert_eq!(errors.fields(), vec!["num_lanes", "curvature"]);
        assert!(errors.errors().iter().all(|e| e.kind == "missing"));
    }

    #[test]
    fn test_wrong_types_reported() {
        let mut body = required_only();
        body["speed_limit"] = json!(50.5);
        body["curvature"] = json!([0.1]);
        body["holiday"] = json!("yes");
        body["weather_foggy"] = Value::Null;

        let errors = RiskInput::validate(&body).unwrap_err();
        let kinds: Vec<(&str, &str)> = errors
            .errors()
            .iter()
            .map(|e| (e.loc[1].as_str(), e.kind.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("curvature", "float_type"),
                ("speed_limit", "int_from_float"),
                ("holiday", "int_parsing"),
                ("weather_foggy", "int_type"),
            ]
        );
    }

    #[test]
    fn test_lax_coercions() {
        let mut body = required_only();
        body["num_lanes"] = json!(3.0);
        body["curvature"] = json!(1);
        body["speed_limit"] = json!("80");
        body["public_road"] = json!(true);

        let input = RiskInput::validate(&body).unwrap();
        assert_eq!(input.num_lanes, 3);
        assert_eq!(input.curvature, 1.0);
        assert_eq!(input.speed_limit, 80);
        assert_eq!(input.public_road, 1);
    }

    #[test]
    fn test_flag_range_not_enforced() {
        let mut body = required_only();
        body["lighting_night"] = json!(2);
        assert_eq!(RiskInput::validate(&body).unwrap().lighting_night, 2);
    }

    #[test]
    fn test_non_object_body() {
        let errors = RiskInput::validate(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(errors.errors()[0].kind, "json_invalid");
    }

    #[test]
    fn test_features_in_schema_order() {
        let mut body = required_only();
        body["unknown_field"] = json!(5);
        let features = RiskInput::validate(&body).unwrap().to_features();
        let keys: Vec<&str> = features.keys().map(String::as_str).collect();
        assert_eq!(keys, FEATURE_NAMES.to_vec());
        assert_eq!(features["num_lanes"], json!(2));
        assert_eq!(features["curvature"], json!(0.4));
    }

    #[test]
    fn test_features_match_serialized_input() {
        let mut body = required_only();
        body["lighting_dim"] = json!(1);
        body["curvature"] = json!(0.85);
        let input = RiskInput::validate(&body).unwrap();
        let serialized = serde_json::to_value(&input).unwrap();
        assert_eq!(Value::Object(input.to_features()), serialized);
        assert_eq!(input.to_features()["lighting_dim"], json!(1));
    }
}
