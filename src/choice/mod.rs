//! Choice system
//!
//! All randomness used by generators flows through strongly-typed choices
//! with associated constraints. A generated value is fully described by the
//! sequence of choices it consumed, which is what the shrinker manipulates.

mod constraints;
mod node;

pub use self::constraints::*;
pub use self::node::*;

/// Choice types that can be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ChoiceType {
    Integer,
    Boolean,
    Float,
}

impl std::fmt::Display for ChoiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChoiceType::Integer => write!(f, "integer"),
            ChoiceType::Boolean => write!(f, "boolean"),
            ChoiceType::Float => write!(f, "float"),
        }
    }
}

/// Choice value that can be drawn
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ChoiceValue {
    Integer(i128),
    Boolean(bool),
    Float(f64),
}

impl ChoiceValue {
    pub fn choice_type(&self) -> ChoiceType {
        match self {
            ChoiceValue::Integer(_) => ChoiceType::Integer,
            ChoiceValue::Boolean(_) => ChoiceType::Boolean,
            ChoiceValue::Float(_) => ChoiceType::Float,
        }
    }
}

impl Eq for ChoiceValue {}

impl std::hash::Hash for ChoiceValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            ChoiceValue::Integer(i) => {
                0u8.hash(state);
                i.hash(state);
            }
            ChoiceValue::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            ChoiceValue::Float(f) => {
                2u8.hash(state);
                f.to_bits().hash(state);
            }
        }
    }
}

/// Constraints for different choice types
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Constraints {
    Integer(IntegerConstraints),
    Boolean(BooleanConstraints),
    Float(FloatConstraints),
}

impl Constraints {
    pub fn choice_type(&self) -> ChoiceType {
        match self {
            Constraints::Integer(_) => ChoiceType::Integer,
            Constraints::Boolean(_) => ChoiceType::Boolean,
            Constraints::Float(_) => ChoiceType::Float,
        }
    }

    /// Whether `value` could have been drawn under these constraints.
    pub fn permits(&self, value: &ChoiceValue) -> bool {
        match (self, value) {
            (Constraints::Integer(c), ChoiceValue::Integer(v)) => c.is_valid(*v),
            (Constraints::Boolean(c), ChoiceValue::Boolean(v)) => c.is_valid(*v),
            (Constraints::Float(c), ChoiceValue::Float(v)) => c.is_valid(*v),
            _ => false,
        }
    }

    /// The simplest value these constraints permit.
    pub fn simplest(&self) -> ChoiceValue {
        match self {
            Constraints::Integer(c) => ChoiceValue::Integer(c.shrink_towards),
            Constraints::Boolean(c) => ChoiceValue::Boolean(c.p >= 1.0),
            Constraints::Float(c) => ChoiceValue::Float(c.shrink_target()),
        }
    }
}
