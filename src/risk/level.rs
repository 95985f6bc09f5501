//! Risk score normalization and classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores below this are Low
pub const MEDIUM_THRESHOLD: f64 = 0.3;
/// Scores at or above this are High
pub const HIGH_THRESHOLD: f64 = 0.7;

/// Risk level classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Score in [0, 0.3)
    Low,
    /// Score in [0.3, 0.7)
    Medium,
    /// Score in [0.7, 1]
    High,
}

impl RiskLevel {
    /// Create a risk level from a clamped score.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < MEDIUM_THRESHOLD => RiskLevel::Low,
            s if s < HIGH_THRESHOLD => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// Clamp a raw regression output into [0, 1].
pub fn clamp_score(raw: f64) -> f64 {
    raw.clamp(0.0, 1.0)
}

/// Round to two decimal places for reporting.
///
/// Rounds the exact binary value with ties to even, so 0.125 becomes 0.12.
pub fn round_score(score: f64) -> f64 {
    format!("{:.2}", score).parse().unwrap_or(score)
}
