//! Matcher: a spec around a single opaque test.
//!
//! The test is one of a runtime type tag, a set-membership test, a pattern
//! match, a boolean predicate or a conformer function, dispatched by an
//! explicit match. Generation is derived from the test's shape where the
//! shape allows it.

use crate::error::{SpecError, SpecResult};
use crate::generator::{Generator, DEFAULT_MAX_SIZE};
use crate::spec::{Conformed, ExplainEntry, Overrides, PathElem, Pred, Spec};
use crate::value::Value;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;
type ConformerFn = dyn Fn(&Value) -> Conformed + Send + Sync;
type UnformerFn = dyn Fn(&Value) -> Value + Send + Sync;

/// Runtime value categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Any,
    Nil,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    Fn,
}

impl TypeTag {
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (TypeTag::Any, _)
                | (TypeTag::Nil, Value::Nil)
                | (TypeTag::Bool, Value::Bool(_))
                | (TypeTag::Int, Value::Int(_))
                | (TypeTag::Float, Value::Float(_))
                | (TypeTag::Str, Value::Str(_))
                | (TypeTag::List, Value::List(_))
                | (TypeTag::Map, Value::Map(_))
                | (TypeTag::Fn, Value::Fn(_))
        )
    }

    /// Canonical generator for the tag; callables have none.
    pub fn generator(&self) -> Option<Generator> {
        let g = match self {
            TypeTag::Any => Generator::any(),
            TypeTag::Nil => Generator::constant(Value::Nil),
            TypeTag::Bool => Generator::booleans(),
            TypeTag::Int => Generator::integers(i64::from(i32::MIN), i64::from(i32::MAX)),
            TypeTag::Float => Generator::floats(-1.0e6, 1.0e6),
            TypeTag::Str => Generator::strings(DEFAULT_MAX_SIZE),
            TypeTag::List => Generator::list_of(Generator::any(), DEFAULT_MAX_SIZE),
            TypeTag::Map => {
                let entry = Generator::tuple(vec![Generator::strings(DEFAULT_MAX_SIZE), Generator::any()]);
                Generator::list_of(entry, DEFAULT_MAX_SIZE).map(|pairs| match pairs {
                    Value::List(pairs) => Value::Map(
                        pairs
                            .into_iter()
                            .filter_map(|pair| match pair {
                                Value::List(mut kv) if kv.len() == 2 => {
                                    let v = kv.pop()?;
                                    let k = kv.pop()?;
                                    Some((k.as_str()?.to_string(), v))
                                }
                                _ => None,
                            })
                            .collect::<BTreeMap<_, _>>(),
                    ),
                    other => other,
                })
            }
            TypeTag::Fn => return None,
        };
        Some(g)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Any => "Any",
            TypeTag::Nil => "Nil",
            TypeTag::Bool => "Bool",
            TypeTag::Int => "Int",
            TypeTag::Float => "Float",
            TypeTag::Str => "Str",
            TypeTag::List => "List",
            TypeTag::Map => "Map",
            TypeTag::Fn => "Fn",
        };
        write!(f, "{}", name)
    }
}

/// The opaque test a matcher applies.
#[derive(Clone)]
pub enum Test {
    TypeTag(TypeTag),
    SetMembership(Vec<Value>),
    PatternMatch(Regex),
    Predicate { name: String, f: Arc<PredicateFn> },
    Conformer { name: String, f: Arc<ConformerFn> },
}

impl Test {
    /// The test's own result: for a pattern, the matched groups.
    fn apply(&self, value: &Value) -> Conformed {
        let accepted = match self {
            Test::TypeTag(tag) => tag.matches(value),
            Test::SetMembership(members) => members.contains(value),
            Test::PatternMatch(re) => {
                return match value.as_str().and_then(|s| re.captures(s)) {
                    Some(captures) => Conformed::Valid(Value::List(
                        captures
                            .iter()
                            .map(|group| group.map_or(Value::Nil, |m| Value::from(m.as_str())))
                            .collect(),
                    )),
                    None => Conformed::Invalid,
                }
            }
            Test::Predicate { f, .. } => f(value),
            Test::Conformer { f, .. } => return f(value),
        };
        if accepted {
            Conformed::Valid(value.clone())
        } else {
            Conformed::Invalid
        }
    }

    fn describe(&self) -> String {
        match self {
            Test::TypeTag(tag) => tag.to_string(),
            Test::SetMembership(members) => {
                let members: Vec<String> = members.iter().map(Value::to_string).collect();
                format!("#{{{}}}", members.join(", "))
            }
            Test::PatternMatch(re) => format!("/{}/", re.as_str()),
            Test::Predicate { name, .. } | Test::Conformer { name, .. } => name.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Matcher {
    test: Test,
    should_conform: bool,
    gen: Option<Generator>,
    name: Option<String>,
    unformer: Option<Arc<UnformerFn>>,
}

impl Matcher {
    fn new(test: Test, should_conform: bool) -> Self {
        Self {
            test,
            should_conform,
            gen: None,
            name: None,
            unformer: None,
        }
    }

    /// A boolean predicate.
    pub fn pred<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::new(
            Test::Predicate {
                name: name.into(),
                f: Arc::new(f),
            },
            false,
        )
    }

    /// A function returning the conformed value or `Invalid`.
    pub fn conformer<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Conformed + Send + Sync + 'static,
    {
        Self::new(
            Test::Conformer {
                name: name.into(),
                f: Arc::new(f),
            },
            true,
        )
    }

    pub fn type_tag(tag: TypeTag) -> Self {
        Self::new(Test::TypeTag(tag), false)
    }

    pub fn set(members: Vec<Value>) -> Self {
        Self::new(Test::SetMembership(members), false)
    }

    pub fn pattern(pattern: &str) -> SpecResult<Self> {
        let re = Regex::new(pattern).map_err(|e| SpecError::Pattern(e.to_string()))?;
        Ok(Self::new(Test::PatternMatch(re), false))
    }

    pub fn any() -> Self {
        Self::type_tag(TypeTag::Any)
    }

    /// Maps that contain `key`.
    pub fn has_key(key: &str) -> Self {
        let owned = key.to_string();
        Self::pred(format!("has_key?({})", key), move |v| v.get(&owned).is_some())
    }

    /// Return the test's own result from `conform` instead of the input.
    pub fn conforming(mut self) -> Self {
        self.should_conform = true;
        self
    }

    pub fn with_gen(mut self, gen: Generator) -> Self {
        self.gen = Some(gen);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_unformer<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.unformer = Some(Arc::new(f));
        self
    }

    pub fn test(&self) -> &Test {
        &self.test
    }
}

impl Spec for Matcher {
    fn conform(&self, value: &Value) -> SpecResult<Conformed> {
        let result = self.test.apply(value);
        if self.should_conform {
            return Ok(result);
        }
        Ok(match result {
            Conformed::Valid(_) => Conformed::Valid(value.clone()),
            Conformed::Invalid => Conformed::Invalid,
        })
    }

    fn unform(&self, value: &Value) -> SpecResult<Value> {
        Ok(match &self.unformer {
            Some(f) => f(value),
            None => value.clone(),
        })
    }

    fn explain(&self, path: &[PathElem], via: &[String], inn: &[PathElem], value: &Value)
        -> SpecResult<Vec<ExplainEntry>> {
        if self.test.apply(value).is_valid() {
            return Ok(Vec::new());
        }
        let pred = Pred::new(self.test.describe(), vec![value.clone()]);
        Ok(vec![ExplainEntry::new(path, via, inn, value.clone(), pred)])
    }

    fn generate(&self, _overrides: &Overrides) -> SpecResult<Generator> {
        if let Some(gen) = &self.gen {
            return Ok(gen.clone());
        }
        let derived = match &self.test {
            Test::TypeTag(tag) => tag.generator(),
            Test::SetMembership(members) if !members.is_empty() => Some(Generator::element_of(members.clone())),
            Test::PatternMatch(re) => Some(Generator::from_pattern(re.as_str())?),
            _ => None,
        };
        derived.ok_or_else(|| SpecError::NoGenerator(self.describe()))
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn describe(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.test.describe())
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({})", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags() {
        let int = Matcher::type_tag(TypeTag::Int);
        assert_eq!(int.conform(&Value::Int(3)).unwrap(), Conformed::Valid(Value::Int(3)));
        assert!(int.conform(&Value::from("3")).unwrap().is_invalid());
        assert!(Matcher::any().conform(&Value::Nil).unwrap().is_valid());
    }

    #[test]
    fn test_conform_is_idempotent() {
        let even = Matcher::pred("even?", |v| v.as_int().map_or(false, |i| i % 2 == 0));
        let once = even.conform(&Value::Int(4)).unwrap().into_value().unwrap();
        assert_eq!(even.conform(&once).unwrap(), Conformed::Valid(Value::Int(4)));
    }

    #[test]
    fn test_pattern_conform_returns_groups() {
        let m = Matcher::pattern(r"(\d+)-(\d+)").unwrap();
        assert_eq!(m.conform(&Value::from("12-34")).unwrap(), Conformed::Valid(Value::from("12-34")));
        assert_eq!(
            m.clone().conforming().conform(&Value::from("12-34")).unwrap(),
            Conformed::Valid(Value::List(vec!["12-34".into(), "12".into(), "34".into()]))
        );
        assert!(m.conform(&Value::Int(12)).unwrap().is_invalid());
    }

    #[test]
    fn test_conformer_and_unformer() {
        let parse = Matcher::conformer("parse-int", |v| match v.as_str().and_then(|s| s.parse::<i64>().ok()) {
            Some(i) => Conformed::Valid(Value::Int(i)),
            None => Conformed::Invalid,
        })
        .with_unformer(|v| Value::Str(v.to_string()));

        assert_eq!(parse.conform(&Value::from("42")).unwrap(), Conformed::Valid(Value::Int(42)));
        assert_eq!(parse.unform(&Value::Int(42)).unwrap(), Value::from("42"));
    }

    #[test]
    fn test_explain_single_entry() {
        let m = Matcher::set(vec![Value::from("a"), Value::from("b")]);
        assert!(m.explain(&[], &[], &[], &Value::from("a")).unwrap().is_empty());

        let problems = m.explain(&[PathElem::from("k")], &[], &[PathElem::Index(0)], &Value::from("z")).unwrap();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].pred.description, r#"#{"a", "b"}"#);
        assert_eq!(problems[0].pred.args, vec![Value::from("z")]);
        assert_eq!(problems[0].path, vec![PathElem::from("k")]);
    }

    #[test]
    fn test_generation_by_shape() {
        let members = vec![Value::Int(1), Value::Int(2)];
        let set = Matcher::set(members.clone());
        let g = set.generate(&Overrides::new()).unwrap();
        assert!(members.contains(&g.produce_one(5).unwrap()));

        let pat = Matcher::pattern(r"^[a-c]{2}$").unwrap();
        let s = pat.generate(&Overrides::new()).unwrap().produce_one(3).unwrap();
        assert!(pat.conform(&s).unwrap().is_valid());

        let opaque = Matcher::pred("odd?", |v| v.as_int().map_or(false, |i| i % 2 != 0));
        assert!(matches!(opaque.generate(&Overrides::new()), Err(SpecError::NoGenerator(_))));
        let with_gen = opaque.with_gen(Generator::constant(Value::Int(3)));
        assert_eq!(with_gen.generate(&Overrides::new()).unwrap().produce_one(0).unwrap(), Value::Int(3));
    }
}
