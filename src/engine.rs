//! ConjectureRunner - bounded randomized verification with shrinking
//!
//! The runner draws trials lazily from a generator, hands each one to a check
//! function and stops at the first failure. A failure is then minimized by
//! walking the generator's shrink tree (see [`crate::shrinking`]).
//!
//! Faults raised by the check (including panics) are captured as the trial's
//! result. Only [`Fault::Usage`] escapes, as [`SpecError::Usage`], because it
//! signals a misconfigured spec rather than a failing trial.

use crate::error::{SpecError, SpecResult};
use crate::generator::{Generator, Produced};
use crate::shrinking::Shrinker;
use crate::value::{Callable, Fault, Value};
use log::{debug, trace};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Configuration for the ConjectureRunner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum number of trials to run
    pub max_examples: u32,

    /// Maximum number of check invocations while shrinking
    pub max_shrinks: u32,

    /// Trial `i` draws from a stream seeded with `seed + i`
    pub seed: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_examples: 1000,
            max_shrinks: 10_000,
            seed: 0,
        }
    }
}

impl RunnerConfig {
    pub fn with_max_examples(mut self, max_examples: u32) -> Self {
        self.max_examples = max_examples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// What a check function says about one trial.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<T> {
    Pass,
    Fail(T),
}

/// Result recorded for a failing trial.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialResult<T> {
    /// The check returned a failure.
    Failed(T),
    /// The check raised (or panicked) with this message.
    Raised(String),
}

impl<T> TrialResult<T> {
    pub fn is_raised(&self) -> bool {
        matches!(self, TrialResult::Raised(_))
    }
}

/// A failing trial input together with its check result.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial<T> {
    pub input: Value,
    pub result: TrialResult<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome<T> {
    Passed,
    /// Failed with a generator that exposes no shrink tree.
    Failed { fail: Trial<T> },
    Shrunk { fail: Trial<T>, smallest: Trial<T> },
}

/// Record of one verification run.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRun<T> {
    pub budget: u32,
    pub iterations_run: u32,
    pub shrink_calls: usize,
    pub outcome: RunOutcome<T>,
}

impl<T> VerificationRun<T> {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Passed)
    }

    /// The originally discovered failing trial.
    pub fn failure(&self) -> Option<&Trial<T>> {
        match &self.outcome {
            RunOutcome::Passed => None,
            RunOutcome::Failed { fail } | RunOutcome::Shrunk { fail, .. } => Some(fail),
        }
    }

    /// The shrunk trial if there is one, else the raw failing trial.
    pub fn minimal(&self) -> Option<&Trial<T>> {
        match &self.outcome {
            RunOutcome::Passed => None,
            RunOutcome::Failed { fail } => Some(fail),
            RunOutcome::Shrunk { smallest, .. } => Some(smallest),
        }
    }
}

/// Lifecycle of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    NotStarted,
    Running(u32),
    Passed,
    Failed,
    Shrinking,
    Shrunk,
}

#[derive(Debug)]
pub struct ConjectureRunner {
    pub config: RunnerConfig,
    state: RunnerState,
}

impl ConjectureRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            state: RunnerState::NotStarted,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Run `check` against up to `max_examples` trials drawn from `generator`.
    ///
    /// Trials are drawn one at a time; no trial is drawn before the previous
    /// verdict is known, and `check` is invoked at most `max_examples` times
    /// before the outcome is decided.
    pub fn run<T, F>(&mut self, generator: &Generator, check: F) -> SpecResult<VerificationRun<T>>
    where
        T: Clone,
        F: Fn(&Value) -> Result<Verdict<T>, Fault>,
    {
        let budget = self.config.max_examples;
        debug!("starting verification run: budget {} seed {}", budget, self.config.seed);

        let mut iterations_run = 0;
        for produced in generator.samples(self.config.seed).take(budget as usize) {
            let produced = produced?;
            iterations_run += 1;
            self.state = RunnerState::Running(iterations_run);
            trace!("trial {}: {}", iterations_run, produced.value);

            if let Some(result) = execute_trial(&check, &produced.value)? {
                debug!("trial {} failed: {}", iterations_run, produced.value);
                return self.shrinking_phase(generator, produced, result, &check, iterations_run);
            }
        }

        debug!("verification passed after {} trials", iterations_run);
        self.state = RunnerState::Passed;
        Ok(VerificationRun {
            budget,
            iterations_run,
            shrink_calls: 0,
            outcome: RunOutcome::Passed,
        })
    }

    fn shrinking_phase<T, F>(
        &mut self,
        generator: &Generator,
        produced: Produced,
        result: TrialResult<T>,
        check: &F,
        iterations_run: u32,
    ) -> SpecResult<VerificationRun<T>>
    where
        T: Clone,
        F: Fn(&Value) -> Result<Verdict<T>, Fault>,
    {
        let budget = self.config.max_examples;
        let fail = Trial {
            input: produced.value.clone(),
            result,
        };

        if generator.shrink_tree(&produced).is_none() {
            self.state = RunnerState::Failed;
            return Ok(VerificationRun {
                budget,
                iterations_run,
                shrink_calls: 0,
                outcome: RunOutcome::Failed { fail },
            });
        }

        self.state = RunnerState::Shrinking;
        let mut shrinker = Shrinker::new(generator, self.config.max_shrinks as usize);
        let shrunk = shrinker.shrink(produced, fail.result.clone(), |value| {
            execute_trial(check, value)
        })?;

        self.state = RunnerState::Shrunk;
        Ok(VerificationRun {
            budget,
            iterations_run,
            shrink_calls: shrunk.calls,
            outcome: RunOutcome::Shrunk {
                fail,
                smallest: Trial {
                    input: shrunk.smallest.value,
                    result: shrunk.result,
                },
            },
        })
    }
}

/// Run `check` against `generator` with a fresh runner.
pub fn quick_check<T, F>(generator: &Generator, config: RunnerConfig, check: F) -> SpecResult<VerificationRun<T>>
where
    T: Clone,
    F: Fn(&Value) -> Result<Verdict<T>, Fault>,
{
    ConjectureRunner::new(config).run(generator, check)
}

/// Execute a single trial: `None` when it passes, the failing result
/// otherwise. Usage faults abort with an error.
fn execute_trial<T, F>(check: &F, value: &Value) -> SpecResult<Option<TrialResult<T>>>
where
    F: Fn(&Value) -> Result<Verdict<T>, Fault>,
{
    match catch_unwind(AssertUnwindSafe(|| check(value))) {
        Ok(Ok(Verdict::Pass)) => Ok(None),
        Ok(Ok(Verdict::Fail(result))) => Ok(Some(TrialResult::Failed(result))),
        Ok(Err(Fault::Raised(message))) => Ok(Some(TrialResult::Raised(message))),
        Ok(Err(Fault::Usage(message))) => Err(SpecError::Usage(message)),
        Err(payload) => Ok(Some(TrialResult::Raised(panic_message(payload.as_ref())))),
    }
}

/// Invoke `callable`, turning a panic into [`Fault::Raised`].
pub fn invoke_caught(callable: &Callable, args: &[Value], supplementary: Option<&Value>) -> Result<Value, Fault> {
    catch_unwind(AssertUnwindSafe(|| callable.invoke(args, supplementary)))
        .unwrap_or_else(|payload| Err(Fault::Raised(panic_message(payload.as_ref()))))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn config(max_examples: u32) -> RunnerConfig {
        RunnerConfig::default().with_max_examples(max_examples).with_seed(7)
    }

    #[test]
    fn test_all_passing_runs_full_budget() {
        let calls = Cell::new(0);
        let run: VerificationRun<()> = quick_check(&Generator::integers(0, 10), config(50), |_| {
            calls.set(calls.get() + 1);
            Ok(Verdict::Pass)
        })
        .unwrap();
        assert!(run.passed());
        assert_eq!(run.iterations_run, 50);
        assert_eq!(calls.get(), 50);
    }

    #[test]
    fn test_stops_at_first_failure_and_shrinks() {
        let mut runner = ConjectureRunner::new(config(1000));
        assert_eq!(runner.state(), RunnerState::NotStarted);
        let run = runner
            .run(&Generator::integers(-1000, 1000), |v| {
                let i = v.as_int().unwrap();
                Ok(if i.abs() < 50 { Verdict::Pass } else { Verdict::Fail(i) })
            })
            .unwrap();
        assert_eq!(runner.state(), RunnerState::Shrunk);
        let smallest = run.minimal().unwrap();
        assert_eq!(smallest.input.as_int().unwrap().abs(), 50);
        assert!(matches!(smallest.result, TrialResult::Failed(_)));
        assert!(run.iterations_run <= 1000);
    }

    #[test]
    fn test_unshrinkable_generator_reports_failed() {
        let g = Generator::integers(10, 20).unshrinkable();
        let run = quick_check(&g, config(10), |v| Ok(Verdict::Fail(v.clone()))).unwrap();
        assert_eq!(run.iterations_run, 1);
        assert!(matches!(run.outcome, RunOutcome::Failed { .. }));
    }

    #[test]
    fn test_faults_and_panics_are_trial_results() {
        let raised: VerificationRun<()> = quick_check(&Generator::booleans(), config(5), |_| {
            Err(Fault::Raised("boom".into()))
        })
        .unwrap();
        assert_eq!(raised.failure().unwrap().result, TrialResult::Raised("boom".into()));

        let panicked: VerificationRun<()> =
            quick_check(&Generator::booleans(), config(5), |_| panic!("kaboom")).unwrap();
        assert!(panicked.minimal().unwrap().result.is_raised());
    }

    #[test]
    fn test_usage_faults_abort_the_run() {
        let result: SpecResult<VerificationRun<()>> =
            quick_check(&Generator::booleans(), config(5), |_| Err(Fault::Usage("no args".into())));
        assert_eq!(result, Err(SpecError::Usage("no args".into())));
    }

    #[test]
    fn test_invoke_caught_converts_panics() {
        let f = Callable::from_fn("explode", |_| panic!("bad input"));
        assert_eq!(invoke_caught(&f, &[], None), Err(Fault::Raised("bad input".into())));
    }
}
