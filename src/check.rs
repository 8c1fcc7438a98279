//! Checking callables against contract specs.
//!
//! `check` runs the verification loop over a contract's generated arguments
//! and reports the outcome, including the shrunk counterexample when one is
//! found.

use crate::config::spec_config;
use crate::contract::ContractSpec;
use crate::engine::{ConjectureRunner, RunOutcome, RunnerConfig, Trial, TrialResult};
use crate::error::{SpecError, SpecResult};
use crate::registry::{registry, Registry};
use crate::spec::{ExplainData, Overrides, Spec};
use crate::value::Callable;
use log::debug;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Trials to run; defaults to `SpecConfig::check_iterations`.
    pub num_tests: Option<u32>,
    /// Generator overrides keyed by spec name.
    pub gen: Overrides,
    /// Seed of the first trial; derived from the spec name when absent.
    pub seed: Option<u64>,
}

/// Which part of a contract a trial failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRole {
    Args,
    Supplementary,
    Ret,
    Relation,
}

impl CheckRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckRole::Args => "args",
            CheckRole::Supplementary => "supplementary",
            CheckRole::Ret => "ret",
            CheckRole::Relation => "relation",
        }
    }
}

impl fmt::Display for CheckRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A trial whose inputs, return value or relation did not conform.
#[derive(Debug, Clone, PartialEq)]
pub struct CallFailure {
    pub role: CheckRole,
    pub data: ExplainData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckFailure {
    /// The first failing trial, as `[args, supplementary]`.
    pub fail: Trial<CallFailure>,
    pub shrunk: Option<Trial<CallFailure>>,
}

impl CheckFailure {
    /// The shrunk trial if any, else the original failure.
    pub fn smallest(&self) -> &Trial<CallFailure> {
        self.shrunk.as_ref().unwrap_or(&self.fail)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Passed,
    Failed(CheckFailure),
    NoArgsSpec,
    NoGenerator(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
    CheckPassed,
    CheckFailed,
    CheckRaised,
    NoArgsSpec,
    NoGen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub spec: String,
    pub callable: String,
    pub num_tests: u32,
    pub outcome: CheckOutcome,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.outcome == CheckOutcome::Passed
    }

    pub fn result_type(&self) -> ResultType {
        match &self.outcome {
            CheckOutcome::Passed => ResultType::CheckPassed,
            CheckOutcome::NoArgsSpec => ResultType::NoArgsSpec,
            CheckOutcome::NoGenerator(_) => ResultType::NoGen,
            CheckOutcome::Failed(failure) => match failure.smallest().result {
                TrialResult::Raised(_) => ResultType::CheckRaised,
                TrialResult::Failed(_) => ResultType::CheckFailed,
            },
        }
    }
}

/// Deterministic seed for a spec name.
pub fn seed_for(name: &str) -> u64 {
    let digest: [u8; 32] = Sha256::digest(name.as_bytes()).into();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Registered names that resolve to contract specs, sorted.
pub fn checkable() -> Vec<String> {
    let specs = registry();
    specs
        .names()
        .into_iter()
        .filter(|name| specs.resolve(name).map_or(false, |spec| spec.as_contract().is_some()))
        .collect()
}

/// Check `callable` against the contract registered under `name`. The seed
/// is derived from `name` unless `opts` fixes one.
pub fn check(name: &str, callable: &Callable, opts: &CheckOptions) -> SpecResult<CheckReport> {
    let spec = registry().resolve(name)?;
    let contract = spec
        .as_contract()
        .ok_or_else(|| SpecError::Usage(format!("{} is not a contract spec", name)))?;
    run_check(name, callable, contract, opts)
}

/// Check each `(name, callable)` pair against its registered contract, in
/// order. Stops at the first name that is not a registered contract.
pub fn check_all<'a, I>(targets: I, opts: &CheckOptions) -> SpecResult<Vec<CheckReport>>
where
    I: IntoIterator<Item = (&'a str, &'a Callable)>,
{
    targets
        .into_iter()
        .map(|(name, callable)| check(name, callable, opts))
        .collect()
}

/// Check `callable` against `contract`, which is reported and seeded by its
/// description.
pub fn check_fn(callable: &Callable, contract: &ContractSpec, opts: &CheckOptions) -> SpecResult<CheckReport> {
    run_check(&contract.describe(), callable, contract, opts)
}

fn run_check(spec: &str, callable: &Callable, contract: &ContractSpec, opts: &CheckOptions) -> SpecResult<CheckReport> {
    let report = |num_tests, outcome| CheckReport {
        spec: spec.to_string(),
        callable: callable.name().to_string(),
        num_tests,
        outcome,
    };

    if contract.args().is_none() {
        return Ok(report(0, CheckOutcome::NoArgsSpec));
    }
    let parts = contract.parts()?;
    let trials = match parts.trial_generator(&opts.gen) {
        Ok(trials) => trials,
        Err(SpecError::NoGenerator(message)) => return Ok(report(0, CheckOutcome::NoGenerator(message))),
        Err(e) => return Err(e),
    };

    let config = RunnerConfig {
        max_examples: opts.num_tests.unwrap_or_else(|| spec_config().check_iterations),
        seed: opts.seed.unwrap_or_else(|| seed_for(spec)),
        ..RunnerConfig::default()
    };
    debug!("checking {} against {} with {} tests", callable, spec, config.max_examples);

    let run = ConjectureRunner::new(config).run(&trials, |trial| parts.check_call(callable, trial))?;
    let outcome = match run.outcome {
        RunOutcome::Passed => CheckOutcome::Passed,
        RunOutcome::Failed { fail } => CheckOutcome::Failed(CheckFailure { fail, shrunk: None }),
        RunOutcome::Shrunk { fail, smallest } => CheckOutcome::Failed(CheckFailure {
            fail,
            shrunk: Some(smallest),
        }),
    };
    Ok(report(run.iterations_run, outcome))
}
