//! # conjecture-spec
//!
//! Composable data specifications with conform, unform, explain and
//! generate, plus bounded randomized verification of callables against
//! argument/return contracts.
//!
//! All randomness flows through typed choices recorded by
//! [`ConjectureData`], so every generated value can be replayed and shrunk
//! by simplifying its choice sequence.

pub mod choice;
pub mod data;
pub mod error;
pub mod value;
pub mod strings;
pub mod generator;
pub mod shrinking;
pub mod engine;
pub mod config;
pub mod spec;
pub mod registry;
pub mod matcher;
pub mod conjunction;
pub mod merge;
pub mod contract;
pub mod check;

// Re-export core types for easy access
pub use choice::{ChoiceNode, ChoiceType, ChoiceValue, Constraints};
pub use data::{ConjectureData, DrawError, Status};
pub use error::{SpecError, SpecResult};
pub use value::{Callable, Fault, Value};
pub use generator::{Generator, Produced};
pub use shrinking::{sort_key, ShrinkTree, Shrinker};
pub use engine::{
    invoke_caught, quick_check, ConjectureRunner, RunOutcome, RunnerConfig, RunnerState, Trial, TrialResult,
    Verdict, VerificationRun,
};
pub use config::{set_spec_config, spec_config, SpecConfig};
pub use spec::{
    conform, exercise, explain_data, explain_str, generate, is_valid, unform, Conformed, ExplainData,
    ExplainEntry, Overrides, PathElem, Pred, Spec, SpecRef,
};
pub use registry::{def, registry, Registry, SpecRegistry};
pub use matcher::{Matcher, Test, TypeTag};
pub use conjunction::ConjunctionSpec;
pub use merge::MergeSpec;
pub use contract::ContractSpec;
pub use check::{
    check, check_all, check_fn, checkable, seed_for, CallFailure, CheckFailure, CheckOptions, CheckOutcome,
    CheckReport, CheckRole, ResultType,
};
