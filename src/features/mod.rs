//! Feature schema module
//!
//! This module provides:
//! - The canonical, training-ordered list of model input fields
//! - Re-projection of arbitrary-order inputs into that order

pub mod schema;

pub use schema::{coerce_order, FeatureVector, SchemaError, FEATURE_NAMES, NUM_FEATURES};
