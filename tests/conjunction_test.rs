//! ConjunctionSpec: threaded conform, first-failure explain, first-child
//! generation.

use conjecture_spec::{
    conform, def, explain_data, Conformed, ConjunctionSpec, Generator, Matcher, Overrides, Spec, SpecRef, TypeTag,
    Value,
};

fn is_positive_integer() -> Matcher {
    Matcher::pred("positive-integer?", |v| v.as_int().map_or(false, |i| i > 0))
}

fn is_less_than(n: i64) -> Matcher {
    Matcher::pred(format!("less-than?({})", n), move |v| v.as_int().map_or(false, |i| i < n))
}

#[test]
fn test_positive_and_below_hundred() {
    let spec = ConjunctionSpec::new(vec![is_positive_integer(), is_less_than(100)]);

    assert_eq!(spec.conform(&Value::Int(50)).unwrap(), Conformed::Valid(Value::Int(50)));
    assert_eq!(spec.conform(&Value::Int(150)).unwrap(), Conformed::Invalid);

    let data = explain_data(&spec, &Value::Int(150)).unwrap().unwrap();
    assert_eq!(data.problems.len(), 1);
    assert_eq!(data.problems[0].pred.description, "less-than?(100)");
    assert_eq!(data.problems[0].val, Value::Int(150));
}

#[test]
fn test_only_first_failure_is_explained() {
    let spec = ConjunctionSpec::new(vec![is_positive_integer(), is_less_than(100)]);
    let data = explain_data(&spec, &Value::Int(-5)).unwrap().unwrap();
    assert_eq!(data.problems.len(), 1);
    assert_eq!(data.problems[0].pred.description, "positive-integer?");
}

#[test]
fn test_composition_law() {
    let a = Matcher::conformer("halve-even", |v| match v.as_int() {
        Some(i) if i % 2 == 0 => Conformed::Valid(Value::Int(i / 2)),
        _ => Conformed::Invalid,
    });
    let b = is_less_than(100);
    let spec = ConjunctionSpec::new(vec![SpecRef::from(&a), SpecRef::from(&b)]);

    for produced in Generator::integers(-400, 400).samples(3).take(200) {
        let v = produced.unwrap().value;
        let expected = match a.conform(&v).unwrap() {
            Conformed::Valid(c) => b.conform(&c).unwrap(),
            Conformed::Invalid => Conformed::Invalid,
        };
        assert_eq!(spec.conform(&v).unwrap(), expected);
    }
}

#[test]
fn test_named_children_resolve_once_and_appear_in_via() {
    def("test.conjunction/positive", is_positive_integer());
    def("test.conjunction/small", is_less_than(10));
    let spec = ConjunctionSpec::new(vec!["test.conjunction/positive", "test.conjunction/small"]);

    assert!(conform(&spec, &Value::Int(3)).unwrap().is_valid());
    let data = explain_data(&spec, &Value::Int(30)).unwrap().unwrap();
    assert_eq!(data.problems[0].via, vec!["test.conjunction/small".to_string()]);

    // Resolution is memoized: redefining a child does not affect this spec.
    def("test.conjunction/small", is_less_than(1000));
    assert!(conform(&spec, &Value::Int(30)).unwrap().is_invalid());
}

#[test]
fn test_generation_ignores_later_children() {
    let spec = ConjunctionSpec::new(vec![Matcher::type_tag(TypeTag::Int), is_less_than(0).into()]);
    let g = spec.generate(&Overrides::new()).unwrap();
    let values: Vec<Value> = g.samples(0).take(50).map(|p| p.unwrap().value).collect();
    assert!(values.iter().all(|v| v.as_int().is_some()));
    assert!(values.iter().any(|v| spec.conform(v).unwrap().is_invalid()));
}

#[test]
fn test_with_gen_overrides_first_child() {
    let spec = ConjunctionSpec::new(vec![is_positive_integer(), is_less_than(100)])
        .with_gen(Generator::integers(1, 99));
    let g = spec.generate(&Overrides::new()).unwrap();
    for produced in g.samples(0).take(50) {
        assert!(spec.conform(&produced.unwrap().value).unwrap().is_valid());
    }
}
