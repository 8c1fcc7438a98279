//! ContractSpec: conforming callables by verification, explaining the
//! minimal failing call, and generating stubs.

use conjecture_spec::{
    def, explain_data, explain_str, Callable, ContractSpec, Fault, Generator, Matcher, Overrides, PathElem,
    RunnerConfig, Spec, SpecError, TrialResult, TypeTag, Value,
};

fn int_args() -> Matcher {
    let int = TypeTag::Int.generator().unwrap();
    Matcher::pred("two-ints?", |v| matches!(v.as_list(), Some([Value::Int(_), Value::Int(_)])))
        .with_gen(Generator::tuple(vec![int.clone(), int]))
}

fn sums_args() -> Matcher {
    Matcher::pred("ret-is-sum?", |v| {
        let args = v.get("args").and_then(Value::as_list);
        match (args, v.get("ret")) {
            (Some([Value::Int(a), Value::Int(b)]), Some(Value::Int(ret))) => a + b == *ret,
            _ => false,
        }
    })
}

fn sum_contract() -> ContractSpec {
    ContractSpec::new()
        .with_args(int_args())
        .with_ret(Matcher::type_tag(TypeTag::Int))
        .with_relation(sums_args())
}

fn binary(name: &str, op: fn(i64, i64) -> i64) -> Callable {
    Callable::from_fn(name, move |args| match args {
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(op(*a, *b))),
        _ => Err(Fault::Raised("expected two integers".into())),
    })
}

#[test]
fn test_adder_conforms() {
    let adder = Value::Fn(binary("add", |a, b| a + b));
    assert!(sum_contract().conform(&adder).unwrap().is_valid());
    assert_eq!(explain_str(sum_contract(), &adder).unwrap(), "Success!\n");
}

#[test]
fn test_adder_survives_full_budget() {
    let config = RunnerConfig::default();
    let run = sum_contract()
        .validate(&binary("add", |a, b| a + b), config, &Overrides::new())
        .unwrap();
    assert!(run.passed());
    assert_eq!(run.iterations_run, 1000);
}

#[test]
fn test_subtractor_shrinks_to_smallest_counterexample() {
    let run = sum_contract()
        .validate(&binary("sub", |a, b| a - b), RunnerConfig::default(), &Overrides::new())
        .unwrap();
    let smallest = run.minimal().unwrap();
    assert_eq!(smallest.input, Value::List(vec![Value::List(vec![Value::Int(0), Value::Int(-1)]), Value::Nil]));
    match &smallest.result {
        TrialResult::Failed(failure) => assert_eq!(failure.role.as_str(), "relation"),
        other => panic!("expected a relation failure, got {:?}", other),
    }
}

#[test]
fn test_subtractor_explained_at_relation() {
    def("test.contract/sum", sum_contract());
    let sub = Value::Fn(binary("sub", |a, b| a - b));
    let data = explain_data("test.contract/sum", &sub).unwrap().unwrap();

    assert_eq!(data.problems.len(), 1);
    let problem = &data.problems[0];
    assert_eq!(problem.path, vec![PathElem::from("relation")]);
    assert_eq!(problem.via, vec!["test.contract/sum".to_string()]);
    assert_eq!(problem.pred.description, "ret-is-sum?");
    assert_eq!(
        problem.val,
        Value::map(vec![
            ("args", Value::List(vec![Value::Int(0), Value::Int(-1)])),
            ("ret", Value::Int(1)),
        ])
    );
}

#[test]
fn test_wrong_arity_is_a_raised_failure() {
    let unary = Callable::from_fn("neg", |args| match args {
        [Value::Int(a)] => Ok(Value::Int(-a)),
        _ => Err(Fault::Raised("arity mismatch".into())),
    });
    let problems = sum_contract().explain(&[], &[], &[], &Value::Fn(unary)).unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].reason.as_deref(), Some("arity mismatch"));
    assert_eq!(problems[0].pred.args, vec![Value::Int(0), Value::Int(0)]);
}

#[test]
fn test_panicking_callable_does_not_conform() {
    let panics = Callable::from_fn("panics", |_| panic!("unreachable state"));
    let contract = sum_contract().with_iterations(5);
    assert!(contract.conform(&Value::Fn(panics)).unwrap().is_invalid());
}

#[test]
fn test_missing_args_spec_is_usage_error() {
    let contract = ContractSpec::new().with_ret(Matcher::type_tag(TypeTag::Int));
    let result = contract.conform(&Value::Fn(binary("add", |a, b| a + b)));
    assert!(matches!(result, Err(SpecError::Usage(_))));
}

#[test]
fn test_generated_stub_honours_contract() {
    let contract = sum_contract();
    let stub = contract.generate(&Overrides::new()).unwrap().produce_one(0).unwrap();
    let stub = stub.as_callable().unwrap();

    assert!(matches!(stub.invoke(&[Value::Int(1), Value::Int(2)], None), Ok(Value::Int(_))));
    match stub.invoke(&[Value::from("one")], None) {
        Err(Fault::Usage(message)) => assert!(message.contains("two-ints?")),
        other => panic!("expected a usage fault, got {:?}", other),
    }
}

#[test]
fn test_stub_usage_fault_aborts_higher_order_check() {
    // A contract over callables that take a callable: the stub passed in
    // rejects bad arguments, which aborts verification of the outer callable.
    let inner = sum_contract().with_name("adder-stub");
    let outer = ContractSpec::new()
        .with_args(Matcher::pred("one-fn?", |v| matches!(v.as_list(), Some([Value::Fn(_)]))).with_gen(
            Generator::tuple(vec![inner.generate(&Overrides::new()).unwrap()]),
        ))
        .with_iterations(3);

    let misuses = Callable::from_fn("misuses", |args| match args {
        [Value::Fn(f)] => f.invoke(&[Value::from("bad")], None),
        _ => Ok(Value::Nil),
    });
    assert!(matches!(outer.conform(&Value::Fn(misuses)), Err(SpecError::Usage(_))));
}
