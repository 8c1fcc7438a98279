//! Shrinking over choice sequences
//!
//! A failing trial is described by the choices its generator consumed. The
//! shrink tree of a choice sequence has as children every declared-simpler
//! alternative sequence (deletions, truncations and per-choice
//! minimizations), and the `Shrinker` greedily walks down that tree while the
//! check keeps failing.
//!
//! Sequences are ordered by `sort_key`: fewer choices first, then
//! lexicographically smaller choice indices.

use crate::choice::{ChoiceNode, ChoiceValue, Constraints};
use crate::generator::{Generator, Produced};
use log::{debug, trace, warn};
use std::collections::HashSet;

const MAX_FLOAT_HALVINGS: usize = 16;

/// Sort key of a choice sequence: `(length, choice indices)`.
pub fn sort_key(nodes: &[ChoiceNode]) -> (usize, Vec<u128>) {
    let indices = nodes
        .iter()
        .map(|node| choice_to_index(&node.value, &node.constraints))
        .collect();
    (nodes.len(), indices)
}

/// Position of a choice in its simplicity ordering; 0 is the simplest.
///
/// Integers zig-zag around their shrink target (`t, t-1, t+1, t-2, ...`),
/// `false` precedes `true`, floats order by distance from their target.
pub fn choice_to_index(value: &ChoiceValue, constraints: &Constraints) -> u128 {
    match (value, constraints) {
        (ChoiceValue::Integer(v), Constraints::Integer(c)) => {
            let t = c.shrink_towards;
            if *v >= t {
                v.abs_diff(t).saturating_mul(2)
            } else {
                v.abs_diff(t).saturating_mul(2) - 1
            }
        }
        (ChoiceValue::Boolean(b), _) => u128::from(*b),
        (ChoiceValue::Float(v), Constraints::Float(c)) => {
            let t = c.shrink_target();
            let distance = (v - t).abs().to_bits() as u128;
            distance * 2 + u128::from(*v < t)
        }
        (ChoiceValue::Integer(v), _) => v.unsigned_abs(),
        (ChoiceValue::Float(v), _) => v.abs().to_bits() as u128,
    }
}

/// A node in the shrink tree: one candidate choice sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ShrinkTree {
    nodes: Vec<ChoiceNode>,
}

impl ShrinkTree {
    pub fn new(nodes: Vec<ChoiceNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[ChoiceNode] {
        &self.nodes
    }

    /// The declared-simpler alternatives of this sequence, simplest first.
    ///
    /// Every child has a strictly smaller `sort_key` than its parent, so any
    /// path down the tree is finite.
    pub fn children(&self) -> Vec<ShrinkTree> {
        let parent_key = sort_key(&self.nodes);
        let mut candidates = Vec::new();
        delete_trailing_choices(&self.nodes, &mut candidates);
        delete_individual_choices(&self.nodes, &mut candidates);
        for index in 0..self.nodes.len() {
            minimize_choice_at(&self.nodes, index, &mut candidates);
        }

        let mut keyed: Vec<_> = candidates
            .into_iter()
            .map(|nodes| (sort_key(&nodes), nodes))
            .filter(|(key, _)| *key < parent_key)
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.dedup_by(|a, b| a.0 == b.0);
        keyed.into_iter().map(|(_, nodes)| ShrinkTree::new(nodes)).collect()
    }
}

/// Every proper prefix of the sequence.
fn delete_trailing_choices(nodes: &[ChoiceNode], out: &mut Vec<Vec<ChoiceNode>>) {
    for len in 0..nodes.len() {
        out.push(nodes[..len].to_vec());
    }
}

/// The sequence with one choice removed, for each position.
fn delete_individual_choices(nodes: &[ChoiceNode], out: &mut Vec<Vec<ChoiceNode>>) {
    for index in 0..nodes.len() {
        let mut candidate = nodes.to_vec();
        candidate.remove(index);
        out.push(candidate);
    }
}

/// The sequence with the choice at `index` replaced by a simpler value.
fn minimize_choice_at(nodes: &[ChoiceNode], index: usize, out: &mut Vec<Vec<ChoiceNode>>) {
    let node = &nodes[index];
    if node.trivial() {
        return;
    }

    for value in simpler_values(node) {
        if let Some(replacement) = node.copy_with_value(value) {
            let mut candidate = nodes.to_vec();
            candidate[index] = replacement;
            out.push(candidate);
        }
    }
}

/// Jump to the target, then close in on the current value by halving the
/// remaining distance (`v - d/2, v - d/4, ..., v - 1`), then flip across the
/// target.
fn simpler_values(node: &ChoiceNode) -> Vec<ChoiceValue> {
    match (&node.value, &node.constraints) {
        (ChoiceValue::Integer(v), Constraints::Integer(c)) => {
            let (v, t) = (*v, c.shrink_towards);
            let mut values = vec![ChoiceValue::Integer(t)];
            let mut step = (v - t) / 2;
            while step != 0 {
                values.push(ChoiceValue::Integer(v - step));
                step /= 2;
            }
            let step_one = if v > t { v - 1 } else { v + 1 };
            values.push(ChoiceValue::Integer(step_one));
            values.push(ChoiceValue::Integer(t - (v - t)));
            values
        }
        (ChoiceValue::Boolean(true), _) => vec![ChoiceValue::Boolean(false)],
        (ChoiceValue::Float(v), Constraints::Float(c)) => {
            let (v, t) = (*v, c.shrink_target());
            let mut values = vec![ChoiceValue::Float(t), ChoiceValue::Float(v.trunc())];
            let mut step = (v - t) / 2.0;
            for _ in 0..MAX_FLOAT_HALVINGS {
                values.push(ChoiceValue::Float(v - step));
                step /= 2.0;
            }
            values.push(ChoiceValue::Float(t - (v - t)));
            values
        }
        _ => Vec::new(),
    }
}

/// Result of a shrink search.
#[derive(Debug, Clone)]
pub struct ShrinkOutcome<R> {
    pub smallest: Produced,
    pub result: R,
    /// Number of times the check was invoked while shrinking.
    pub calls: usize,
    /// Number of accepted simplifications.
    pub changes: usize,
}

/// Greedy shrink search over a generator's shrink tree.
pub struct Shrinker<'a> {
    generator: &'a Generator,
    max_calls: usize,
    seen: HashSet<(usize, Vec<u128>)>,
    calls: usize,
    changes: usize,
}

impl<'a> Shrinker<'a> {
    pub fn new(generator: &'a Generator, max_calls: usize) -> Self {
        Self {
            generator,
            max_calls,
            seen: HashSet::new(),
            calls: 0,
            changes: 0,
        }
    }

    /// Minimize `initial`, whose check result was `initial_result`.
    ///
    /// `still_failing` returns `Some(result)` when a candidate still fails.
    /// At each step the first child (in sort-key order) that still fails and
    /// whose replayed choices sort strictly below the current ones becomes
    /// the new current value. Stops when no child fails or the call budget is
    /// exhausted. Errors from `still_failing` abort the search.
    pub fn shrink<R, E, F>(
        &mut self,
        initial: Produced,
        initial_result: R,
        mut still_failing: F,
    ) -> Result<ShrinkOutcome<R>, E>
    where
        F: FnMut(&crate::value::Value) -> Result<Option<R>, E>,
    {
        debug!("shrinking trial with {} choices", initial.choices.len());

        let mut current = initial;
        let mut result = initial_result;
        self.seen.insert(sort_key(&current.choices));

        'search: loop {
            let tree = ShrinkTree::new(current.choices.clone());
            let current_key = sort_key(&current.choices);

            for child in tree.children() {
                if self.calls >= self.max_calls {
                    warn!("shrink budget of {} calls exhausted", self.max_calls);
                    break 'search;
                }

                let candidate = match self.generator.replay(child.nodes()) {
                    Ok(candidate) => candidate,
                    Err(_) => continue,
                };
                let key = sort_key(&candidate.choices);
                if key >= current_key || !self.seen.insert(key) {
                    continue;
                }

                self.calls += 1;
                if let Some(r) = still_failing(&candidate.value)? {
                    trace!("shrunk to {}", candidate.value);
                    current = candidate;
                    result = r;
                    self.changes += 1;
                    continue 'search;
                }
            }
            break;
        }

        debug!(
            "shrinking finished after {} calls and {} changes",
            self.calls, self.changes
        );
        Ok(ShrinkOutcome {
            smallest: current,
            result,
            calls: self.calls,
            changes: self.changes,
        })
    }

    /// Get call count
    pub fn get_calls(&self) -> usize {
        self.calls
    }
}
