//! MergeSpec over map specs.

use conjecture_spec::{explain_data, explain_str, Conformed, Generator, Matcher, MergeSpec, Overrides, Spec, Value};

fn foo_bar() -> MergeSpec {
    MergeSpec::new(vec![Matcher::has_key("foo"), Matcher::has_key("bar")])
}

#[test]
fn test_map_with_both_keys_conforms() {
    let v = Value::map(vec![("foo", Value::Int(1)), ("bar", Value::Int(2))]);
    assert_eq!(foo_bar().conform(&v).unwrap(), Conformed::Valid(v.clone()));
}

#[test]
fn test_missing_key_is_explained() {
    let v = Value::map(vec![("foo", Value::Int(1))]);
    assert!(foo_bar().conform(&v).unwrap().is_invalid());

    let data = explain_data(foo_bar(), &v).unwrap().unwrap();
    assert_eq!(data.problems.len(), 1);
    assert_eq!(data.problems[0].pred.description, "has_key?(bar)");
}

#[test]
fn test_non_map_fails_every_child() {
    let data = explain_data(foo_bar(), &Value::Int(4)).unwrap().unwrap();
    assert_eq!(data.problems.len(), 2);
    assert!(explain_str(foo_bar(), &Value::Int(4)).unwrap().lines().count() == 2);
}

#[test]
fn test_unform_merges_child_unforms() {
    let upper = Matcher::has_key("name").with_unformer(|v| {
        Value::map(vec![("name", v.get("name").cloned().unwrap_or(Value::Nil)), ("restored", Value::Bool(true))])
    });
    let spec = MergeSpec::new(vec![upper, Matcher::has_key("id")]);
    let v = Value::map(vec![("name", Value::from("x")), ("id", Value::Int(3))]);
    let unformed = spec.unform(&v).unwrap();
    assert_eq!(unformed.get("restored"), Some(&Value::Bool(true)));
    assert_eq!(unformed.get("id"), Some(&Value::Int(3)));
}

#[test]
fn test_generated_maps_carry_every_key() {
    let foo = Matcher::has_key("foo").with_gen(Generator::map_of(vec![("foo".into(), Generator::strings(4))]));
    let bar = Matcher::has_key("bar").with_gen(Generator::map_of(vec![("bar".into(), Generator::integers(0, 5))]));
    let spec = MergeSpec::new(vec![foo, bar]);
    let g = spec.generate(&Overrides::new()).unwrap();
    for produced in g.samples(9).take(25) {
        let v = produced.unwrap().value;
        assert!(v.get("foo").is_some() && v.get("bar").is_some());
    }
}

#[test]
fn test_validity_and_disjoint_merge_ignore_child_order() {
    let tag = |key: &'static str| {
        Matcher::conformer(format!("tag-{}", key), move |v| match v.get(key) {
            Some(found) => Conformed::Valid(Value::map(vec![(key, found.clone())])),
            None => Conformed::Invalid,
        })
    };
    let forward = MergeSpec::new(vec![tag("foo"), tag("bar")]);
    let backward = MergeSpec::new(vec![tag("bar"), tag("foo")]);

    let both = Value::map(vec![("foo", Value::Int(1)), ("bar", Value::Int(2)), ("baz", Value::Int(3))]);
    assert_eq!(forward.conform(&both).unwrap(), backward.conform(&both).unwrap());
    assert_eq!(
        forward.conform(&both).unwrap(),
        Conformed::Valid(Value::map(vec![("foo", Value::Int(1)), ("bar", Value::Int(2))]))
    );

    let only_bar = Value::map(vec![("bar", Value::Int(2))]);
    assert!(forward.conform(&only_bar).unwrap().is_invalid());
    assert!(backward.conform(&only_bar).unwrap().is_invalid());
}
