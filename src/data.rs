//! ConjectureData: the choice source every generator draws from.
//!
//! A `ConjectureData` either draws fresh choices from a seeded ChaCha8 stream
//! or replays a recorded choice sequence. Replay is how the shrinker turns a
//! candidate choice sequence back into a value: a replayed choice that no
//! longer fits the draw it lands on, or a draw past the end of the recording,
//! yields the draw's simplest permitted value.

use crate::choice::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Upper bound on the number of choices a single generation may consume.
pub const DEFAULT_MAX_CHOICES: usize = 8192;

/// Status of a ConjectureData instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Ran past the maximum number of choices
    Overrun,
    /// Still able to draw
    Valid,
}

impl Default for Status {
    fn default() -> Self {
        Status::Valid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrawError {
    #[error("cannot draw from frozen ConjectureData")]
    Frozen,
    #[error("invalid range: min_value > max_value")]
    InvalidRange,
    #[error("probability must be between 0.0 and 1.0")]
    InvalidProbability,
    #[error("cannot choose from empty sequence")]
    EmptyChoice,
    #[error("overran maximum number of choices")]
    Overrun,
    #[error("could not satisfy filter after {0} attempts")]
    Unsatisfied(u32),
}

#[derive(Debug)]
pub struct ConjectureData {
    pub status: Status,
    pub max_choices: usize,
    rng: ChaCha8Rng,
    frozen: bool,
    nodes: Vec<ChoiceNode>,
    replay_choices: Option<Vec<ChoiceNode>>,
    replay_index: usize,
}

impl ConjectureData {
    /// Create a new ConjectureData instance with the given random seed
    pub fn new(seed: u64) -> Self {
        Self {
            status: Status::Valid,
            max_choices: DEFAULT_MAX_CHOICES,
            rng: ChaCha8Rng::seed_from_u64(seed),
            frozen: false,
            nodes: Vec::new(),
            replay_choices: None,
            replay_index: 0,
        }
    }

    /// Create a ConjectureData instance replaying a specific choice sequence
    pub fn for_choices(choices: &[ChoiceNode]) -> Self {
        let mut data = Self::new(0);
        data.replay_choices = Some(choices.to_vec());
        data
    }

    pub fn is_replaying(&self) -> bool {
        self.replay_choices.is_some()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn choice_count(&self) -> usize {
        self.nodes.len()
    }

    /// The choices consumed so far.
    pub fn nodes(&self) -> &[ChoiceNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<ChoiceNode> {
        self.nodes
    }

    /// Draw an integer in `[min_value, max_value]`, shrinking towards
    /// `shrink_towards` (clamped into the range).
    pub fn draw_integer(
        &mut self,
        min_value: i128,
        max_value: i128,
        shrink_towards: i128,
    ) -> Result<i128, DrawError> {
        if min_value > max_value {
            return Err(DrawError::InvalidRange);
        }
        let constraints = Constraints::Integer(IntegerConstraints::new(min_value, max_value, shrink_towards));
        match self.draw_value(constraints)? {
            ChoiceValue::Integer(value) => Ok(value),
            _ => unreachable!("integer constraints produce integer choices"),
        }
    }

    /// Draw a boolean that is `true` with probability `p`.
    pub fn draw_boolean(&mut self, p: f64) -> Result<bool, DrawError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(DrawError::InvalidProbability);
        }
        match self.draw_value(Constraints::Boolean(BooleanConstraints { p }))? {
            ChoiceValue::Boolean(value) => Ok(value),
            _ => unreachable!("boolean constraints produce boolean choices"),
        }
    }

    /// Draw a finite float in `[min_value, max_value]`.
    pub fn draw_float(&mut self, min_value: f64, max_value: f64) -> Result<f64, DrawError> {
        if !(min_value.is_finite() && max_value.is_finite()) || min_value > max_value {
            return Err(DrawError::InvalidRange);
        }
        match self.draw_value(Constraints::Float(FloatConstraints::new(min_value, max_value)))? {
            ChoiceValue::Float(value) => Ok(value),
            _ => unreachable!("float constraints produce float choices"),
        }
    }

    /// Pick one element of `values`, shrinking towards the first.
    pub fn choice<T: Clone>(&mut self, values: &[T]) -> Result<T, DrawError> {
        if values.is_empty() {
            return Err(DrawError::EmptyChoice);
        }
        let index = self.draw_integer(0, values.len() as i128 - 1, 0)?;
        Ok(values[index as usize].clone())
    }

    fn draw_value(&mut self, constraints: Constraints) -> Result<ChoiceValue, DrawError> {
        if self.frozen {
            return Err(DrawError::Frozen);
        }
        if self.nodes.len() >= self.max_choices {
            self.status = Status::Overrun;
            return Err(DrawError::Overrun);
        }

        let value = match self.replayed_value(&constraints) {
            Some(value) => value,
            None => self.random_value(&constraints),
        };

        self.record_choice(ChoiceNode::new(
            constraints.choice_type(),
            value.clone(),
            constraints,
            false,
        ));
        Ok(value)
    }

    /// In replay mode, the next recorded value if it fits `constraints`,
    /// else the simplest permitted value. `None` when not replaying.
    fn replayed_value(&mut self, constraints: &Constraints) -> Option<ChoiceValue> {
        let replay_choices = self.replay_choices.as_ref()?;
        let replayed = replay_choices.get(self.replay_index).map(|node| node.value.clone());
        self.replay_index += 1;

        Some(match replayed {
            Some(value) if constraints.permits(&value) => value,
            _ => constraints.simplest(),
        })
    }

    fn random_value(&mut self, constraints: &Constraints) -> ChoiceValue {
        match constraints {
            Constraints::Integer(c) => ChoiceValue::Integer(self.rng.gen_range(c.min_value..=c.max_value)),
            Constraints::Boolean(c) => ChoiceValue::Boolean(self.rng.gen_bool(c.p)),
            Constraints::Float(c) => ChoiceValue::Float(self.rng.gen_range(c.min_value..=c.max_value)),
        }
    }

    fn record_choice(&mut self, choice_node: ChoiceNode) {
        self.nodes.push(choice_node);
    }
}
