//! ChoiceNode implementation - the core data structure for representing choices

use super::{ChoiceType, ChoiceValue, Constraints};

/// A single choice made during generation
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceNode {
    pub choice_type: ChoiceType,
    pub value: ChoiceValue,
    pub constraints: Constraints,
    pub was_forced: bool,
}

impl ChoiceNode {
    /// Create a new choice node
    pub fn new(
        choice_type: ChoiceType,
        value: ChoiceValue,
        constraints: Constraints,
        was_forced: bool,
    ) -> Self {
        Self {
            choice_type,
            value,
            constraints,
            was_forced,
        }
    }

    /// Copy this node with a new value.
    ///
    /// Returns `None` for forced nodes and for values the node's constraints
    /// do not permit.
    pub fn copy_with_value(&self, new_value: ChoiceValue) -> Option<Self> {
        if self.was_forced || !self.constraints.permits(&new_value) {
            return None;
        }
        Some(Self {
            choice_type: self.choice_type,
            value: new_value,
            constraints: self.constraints.clone(),
            was_forced: false,
        })
    }

    /// Check if this node is trivial (would shrink to itself).
    ///
    /// A trivial node can still take part in a simpler sequence as a whole;
    /// in isolation it is as simple as it gets.
    pub fn trivial(&self) -> bool {
        self.was_forced || self.value == self.constraints.simplest()
    }
}
