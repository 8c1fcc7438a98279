//! # Engine Test Suite
//!
//! Tests for the ConjectureRunner verification loop: trial budgets, fault
//! capture, determinism and the shrinking phase.

use conjecture_spec::{
    engine::{quick_check, ConjectureRunner, RunOutcome, RunnerConfig, RunnerState, TrialResult, Verdict, VerificationRun},
    Fault, Generator, SpecError, Value,
};
use std::cell::Cell;

/// Test helper to create a minimal test configuration
fn minimal_config() -> RunnerConfig {
    RunnerConfig {
        max_examples: 10,
        max_shrinks: 100,
        seed: 42,
    }
}

fn pair_of_ints() -> Generator {
    Generator::tuple(vec![Generator::integers(-10_000, 10_000), Generator::integers(-10_000, 10_000)])
}

#[test]
fn test_default_config() {
    let config = RunnerConfig::default();
    assert_eq!(config.max_examples, 1000);
    assert_eq!(config.max_shrinks, 10_000);
    assert_eq!(config.seed, 0);
}

#[test]
fn test_passing_run_uses_whole_budget() {
    let calls = Cell::new(0u32);
    let mut runner = ConjectureRunner::new(minimal_config());
    let run: VerificationRun<()> = runner
        .run(&pair_of_ints(), |_| {
            calls.set(calls.get() + 1);
            Ok(Verdict::Pass)
        })
        .unwrap();

    assert_eq!(run.outcome, RunOutcome::Passed);
    assert_eq!(run.budget, 10);
    assert_eq!(run.iterations_run, 10);
    assert_eq!(calls.get(), 10);
    assert_eq!(runner.state(), RunnerState::Passed);
}

#[test]
fn test_check_is_never_called_after_first_failure_before_shrinking() {
    let calls = Cell::new(0u32);
    let g = Generator::integers(0, 100).unshrinkable();
    let run = quick_check(&g, minimal_config(), |v| {
        calls.set(calls.get() + 1);
        Ok(if v.as_int().unwrap() > 30 { Verdict::Fail(()) } else { Verdict::Pass })
    })
    .unwrap();

    assert!(!run.passed());
    assert_eq!(calls.get(), run.iterations_run);
    assert!(run.iterations_run <= 10);
}

#[test]
fn test_runs_are_deterministic_for_a_seed() {
    let check = |v: &Value| -> Result<Verdict<Value>, Fault> {
        let items = v.as_list().unwrap();
        Ok(if items[0].as_int() > items[1].as_int() {
            Verdict::Fail(v.clone())
        } else {
            Verdict::Pass
        })
    };
    let a = quick_check(&pair_of_ints(), minimal_config(), check).unwrap();
    let b = quick_check(&pair_of_ints(), minimal_config(), check).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_shrunk_trial_still_fails_and_is_minimal() {
    let run = quick_check(&pair_of_ints(), RunnerConfig::default(), |v| {
        let items = v.as_list().unwrap();
        let (a, b) = (items[0].as_int().unwrap(), items[1].as_int().unwrap());
        Ok(if a + b > 100 { Verdict::Fail(a + b) } else { Verdict::Pass })
    })
    .unwrap();

    match run.outcome {
        RunOutcome::Shrunk { fail, smallest } => {
            assert!(matches!(fail.result, TrialResult::Failed(sum) if sum > 100));
            assert!(matches!(smallest.result, TrialResult::Failed(sum) if sum > 100));
            // Neither component can move towards zero without the sum
            // dropping to 100.
            let items = smallest.input.as_list().unwrap();
            let (a, b) = (items[0].as_int().unwrap(), items[1].as_int().unwrap());
            assert_eq!(a + b, 101);
            assert!(a >= 0 && b >= 0);
        }
        other => panic!("expected a shrunk failure, got {:?}", other),
    }
}

#[test]
fn test_raised_faults_are_captured_and_shrunk() {
    let run: VerificationRun<()> = quick_check(&Generator::integers(0, 1000), RunnerConfig::default(), |v| {
        if v.as_int().unwrap() >= 7 {
            Err(Fault::Raised(format!("too big: {}", v)))
        } else {
            Ok(Verdict::Pass)
        }
    })
    .unwrap();

    let smallest = run.minimal().unwrap();
    assert_eq!(smallest.input, Value::Int(7));
    assert_eq!(smallest.result, TrialResult::Raised("too big: 7".to_string()));
}

#[test]
fn test_usage_fault_aborts_run() {
    let result: Result<VerificationRun<()>, SpecError> =
        quick_check(&Generator::booleans(), minimal_config(), |_| Err(Fault::Usage("misconfigured".into())));
    assert_eq!(result, Err(SpecError::Usage("misconfigured".into())));
}

#[test]
fn test_unshrinkable_failure_is_reported_raw() {
    let mut runner = ConjectureRunner::new(minimal_config());
    let run = runner
        .run(&Generator::integers(500, 600).unshrinkable(), |v| Ok(Verdict::Fail(v.clone())))
        .unwrap();
    assert_eq!(runner.state(), RunnerState::Failed);
    assert_eq!(run.shrink_calls, 0);
    assert_eq!(run.failure(), run.minimal());
}
