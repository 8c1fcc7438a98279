//! Constraints attached to each drawn choice.
//!
//! A constraint records the domain a choice was drawn from so that a
//! replayed (possibly shrunk) value can be checked for fit, and so that the
//! shrinker knows what the simplest permitted value is.

use serde::{Deserialize, Serialize};

/// Integer range with a preferred shrink target.
///
/// Valid constraints satisfy `min_value <= shrink_towards <= max_value`;
/// `new` clamps the target into the range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntegerConstraints {
    pub min_value: i128,
    pub max_value: i128,
    pub shrink_towards: i128,
}

impl IntegerConstraints {
    pub fn new(min_value: i128, max_value: i128, shrink_towards: i128) -> Self {
        Self {
            min_value,
            max_value,
            shrink_towards: shrink_towards.clamp(min_value, max_value.max(min_value)),
        }
    }

    pub fn is_valid(&self, value: i128) -> bool {
        value >= self.min_value && value <= self.max_value
    }
}

impl Default for IntegerConstraints {
    fn default() -> Self {
        Self::new(i64::MIN as i128, i64::MAX as i128, 0)
    }
}

/// Probability of drawing `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanConstraints {
    pub p: f64,
}

impl Eq for BooleanConstraints {}

impl std::hash::Hash for BooleanConstraints {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.p.to_bits().hash(state);
    }
}

impl Default for BooleanConstraints {
    fn default() -> Self {
        Self { p: 0.5 }
    }
}

impl BooleanConstraints {
    pub fn is_valid(&self, value: bool) -> bool {
        match self.p {
            p if p <= 0.0 => !value,
            p if p >= 1.0 => value,
            _ => true,
        }
    }
}

/// Finite float range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatConstraints {
    pub min_value: f64,
    pub max_value: f64,
}

impl Eq for FloatConstraints {}

impl std::hash::Hash for FloatConstraints {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.min_value.to_bits().hash(state);
        self.max_value.to_bits().hash(state);
    }
}

impl Default for FloatConstraints {
    fn default() -> Self {
        Self {
            min_value: -1.0e9,
            max_value: 1.0e9,
        }
    }
}

impl FloatConstraints {
    pub fn new(min_value: f64, max_value: f64) -> Self {
        Self { min_value, max_value }
    }

    pub fn is_valid(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min_value && value <= self.max_value
    }

    /// The value closest to zero inside the range.
    pub fn shrink_target(&self) -> f64 {
        0.0_f64.clamp(self.min_value, self.max_value)
    }
}
