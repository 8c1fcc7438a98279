//! The `Spec` trait, explain records and the top-level operations.
//!
//! Every spec supports four operations:
//!
//! - `conform` checks a value and returns either a (possibly transformed)
//!   conformed value or [`Conformed::Invalid`];
//! - `unform` maps a conformed value back to its original shape;
//! - `explain` returns the problems found in a value, each located by the
//!   path through the spec, the named specs traversed (`via`) and the
//!   position inside the original input (`in`);
//! - `generate` returns a [`Generator`] of conforming values.
//!
//! Composites refer to their children through [`SpecRef`], which is either a
//! spec held directly or a name resolved through the global registry.

use crate::contract::ContractSpec;
use crate::conjunction::ConjunctionSpec;
use crate::error::SpecResult;
use crate::generator::Generator;
use crate::matcher::Matcher;
use crate::merge::MergeSpec;
use crate::registry::{registry, Registry};
use crate::value::Value;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Generator overrides keyed by spec name.
pub type Overrides = HashMap<String, Generator>;

/// Result of conforming a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Conformed {
    Valid(Value),
    Invalid,
}

impl Conformed {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Conformed::Invalid)
    }

    pub fn is_valid(&self) -> bool {
        !self.is_invalid()
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Conformed::Valid(v) => Some(v),
            Conformed::Invalid => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Conformed::Valid(v) => Some(v),
            Conformed::Invalid => None,
        }
    }
}

/// One step of a path: a map key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathElem {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElem::Key(k) => write!(f, "{}", k),
            PathElem::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for PathElem {
    fn from(key: &str) -> Self {
        PathElem::Key(key.to_string())
    }
}

impl From<usize> for PathElem {
    fn from(index: usize) -> Self {
        PathElem::Index(index)
    }
}

/// The failing test and the arguments it was applied to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pred {
    pub description: String,
    pub args: Vec<Value>,
}

impl Pred {
    pub fn new(description: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            description: description.into(),
            args,
        }
    }
}

impl fmt::Display for Pred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)?;
        if !self.args.is_empty() {
            write!(f, ", {}", Value::List(self.args.clone()))?;
        }
        Ok(())
    }
}

/// A single problem reported by `explain`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainEntry {
    pub path: Vec<PathElem>,
    pub val: Value,
    pub via: Vec<String>,
    #[serde(rename = "in")]
    pub in_: Vec<PathElem>,
    pub pred: Pred,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ExplainEntry {
    pub fn new(path: &[PathElem], via: &[String], inn: &[PathElem], val: Value, pred: Pred) -> Self {
        Self {
            path: path.to_vec(),
            val,
            via: via.to_vec(),
            in_: inn.to_vec(),
            pred,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

fn write_path(f: &mut fmt::Formatter<'_>, path: &[PathElem]) -> fmt::Result {
    write!(f, "[")?;
    for (i, elem) in path.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", elem)?;
    }
    write!(f, "]")
}

impl fmt::Display for ExplainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.in_.is_empty() {
            write!(f, "In: ")?;
            write_path(f, &self.in_)?;
            write!(f, " ")?;
        }
        write!(f, "val: {} fails", self.val)?;
        if let Some(name) = self.via.last() {
            write!(f, " spec: {}", name)?;
        }
        if !self.path.is_empty() {
            write!(f, " at: ")?;
            write_path(f, &self.path)?;
        }
        write!(f, " predicate: {}", self.pred)?;
        if let Some(reason) = &self.reason {
            write!(f, ", {}", reason)?;
        }
        Ok(())
    }
}

/// All problems found for one top-level value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainData {
    pub problems: Vec<ExplainEntry>,
    pub spec: String,
    pub value: Value,
}

impl ExplainData {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for ExplainData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for problem in &self.problems {
            writeln!(f, "{}", problem)?;
        }
        Ok(())
    }
}

pub trait Spec: Send + Sync {
    fn conform(&self, value: &Value) -> SpecResult<Conformed>;

    fn unform(&self, value: &Value) -> SpecResult<Value>;

    fn explain(&self, path: &[PathElem], via: &[String], inn: &[PathElem], value: &Value)
        -> SpecResult<Vec<ExplainEntry>>;

    fn generate(&self, overrides: &Overrides) -> SpecResult<Generator>;

    /// Display name given with `with_name`, if any.
    fn name(&self) -> Option<&str>;

    /// Human-readable form used in explain output.
    fn describe(&self) -> String;

    fn as_contract(&self) -> Option<&ContractSpec> {
        None
    }
}

/// A spec held directly or referenced by registered name.
#[derive(Clone)]
pub enum SpecRef {
    Named(String),
    Spec(Arc<dyn Spec>),
}

impl SpecRef {
    pub fn resolve(&self) -> SpecResult<Arc<dyn Spec>> {
        self.resolve_in(registry())
    }

    /// Resolve a name through `registry` instead of the global one.
    pub fn resolve_in(&self, registry: &dyn Registry) -> SpecResult<Arc<dyn Spec>> {
        match self {
            SpecRef::Named(name) => registry.resolve(name),
            SpecRef::Spec(spec) => Ok(Arc::clone(spec)),
        }
    }

    /// The registered name, or the spec's own display name.
    pub fn name(&self) -> Option<String> {
        match self {
            SpecRef::Named(name) => Some(name.clone()),
            SpecRef::Spec(spec) => spec.name().map(str::to_string),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SpecRef::Named(name) => name.clone(),
            SpecRef::Spec(spec) => spec.describe(),
        }
    }
}

impl fmt::Debug for SpecRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            SpecRef::Spec(spec) => f.debug_tuple("Spec").field(&spec.describe()).finish(),
        }
    }
}

impl From<&str> for SpecRef {
    fn from(name: &str) -> Self {
        SpecRef::Named(name.to_string())
    }
}

impl From<String> for SpecRef {
    fn from(name: String) -> Self {
        SpecRef::Named(name)
    }
}

impl From<Arc<dyn Spec>> for SpecRef {
    fn from(spec: Arc<dyn Spec>) -> Self {
        SpecRef::Spec(spec)
    }
}

impl From<&SpecRef> for SpecRef {
    fn from(spec: &SpecRef) -> Self {
        spec.clone()
    }
}

macro_rules! spec_ref_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for SpecRef {
                fn from(spec: $ty) -> Self {
                    SpecRef::Spec(Arc::new(spec))
                }
            }

            impl From<&$ty> for SpecRef {
                fn from(spec: &$ty) -> Self {
                    SpecRef::Spec(Arc::new(spec.clone()))
                }
            }
        )*
    };
}

spec_ref_from!(Matcher, ConjunctionSpec, MergeSpec, ContractSpec);

type Resolution = SpecResult<Vec<Arc<dyn Spec>>>;

/// Child references of a composite, resolved at most once. Clones share the
/// resolution.
#[derive(Clone)]
pub(crate) struct ResolvedSpecs {
    refs: Vec<SpecRef>,
    registry: Option<Arc<dyn Registry>>,
    resolved: Arc<OnceCell<Resolution>>,
}

impl ResolvedSpecs {
    pub(crate) fn new(refs: Vec<SpecRef>) -> Self {
        Self {
            refs,
            registry: None,
            resolved: Arc::new(OnceCell::new()),
        }
    }

    /// Resolve names through `registry`; discards any earlier resolution.
    pub(crate) fn with_registry(self, registry: Arc<dyn Registry>) -> Self {
        Self {
            refs: self.refs,
            registry: Some(registry),
            resolved: Arc::new(OnceCell::new()),
        }
    }

    pub(crate) fn refs(&self) -> &[SpecRef] {
        &self.refs
    }

    /// The resolved children, in declaration order.
    pub(crate) fn get(&self) -> SpecResult<&[Arc<dyn Spec>]> {
        let resolved = self.resolved.get_or_init(|| {
            let names = resolver(&self.registry);
            self.refs.iter().map(|spec_ref| spec_ref.resolve_in(names)).collect()
        });
        match resolved {
            Ok(specs) => Ok(specs.as_slice()),
            Err(e) => Err(e.clone()),
        }
    }

    /// Each child reference paired with its resolved spec.
    pub(crate) fn entries(&self) -> SpecResult<impl Iterator<Item = (&SpecRef, &Arc<dyn Spec>)>> {
        Ok(self.refs.iter().zip(self.get()?))
    }
}

/// The injected registry, or the global one.
pub(crate) fn resolver(injected: &Option<Arc<dyn Registry>>) -> &dyn Registry {
    match injected {
        Some(names) => names.as_ref(),
        None => registry(),
    }
}

/// Explain `value` against a resolved child, pushing the child's name onto
/// `via`.
pub(crate) fn explain1(
    spec_ref: &SpecRef,
    spec: &dyn Spec,
    path: &[PathElem],
    via: &[String],
    inn: &[PathElem],
    value: &Value,
) -> SpecResult<Vec<ExplainEntry>> {
    match spec_ref.name() {
        Some(name) => {
            let mut via = via.to_vec();
            via.push(name);
            spec.explain(path, &via, inn, value)
        }
        None => spec.explain(path, via, inn, value),
    }
}

fn override_for<'a>(spec_ref: &SpecRef, overrides: &'a Overrides) -> Option<&'a Generator> {
    spec_ref.name().and_then(|name| overrides.get(&name))
}

/// Generator for a resolved child, preferring an override registered under
/// its name.
pub(crate) fn gensub(spec_ref: &SpecRef, spec: &dyn Spec, overrides: &Overrides) -> SpecResult<Generator> {
    match override_for(spec_ref, overrides) {
        Some(g) => Ok(g.clone()),
        None => spec.generate(overrides),
    }
}

/// Top-level explanation of `value` against a resolved spec.
pub(crate) fn explain_resolved(spec_ref: &SpecRef, spec: &dyn Spec, value: &Value) -> SpecResult<Option<ExplainData>> {
    let problems = explain1(spec_ref, spec, &[], &[], &[], value)?;
    if problems.is_empty() {
        return Ok(None);
    }
    Ok(Some(ExplainData {
        problems,
        spec: spec_ref.describe(),
        value: value.clone(),
    }))
}

/// Conform `value` against `spec`.
pub fn conform(spec: impl Into<SpecRef>, value: &Value) -> SpecResult<Conformed> {
    spec.into().resolve()?.conform(value)
}

/// Map a conformed value back to its original shape.
pub fn unform(spec: impl Into<SpecRef>, value: &Value) -> SpecResult<Value> {
    spec.into().resolve()?.unform(value)
}

pub fn is_valid(spec: impl Into<SpecRef>, value: &Value) -> SpecResult<bool> {
    Ok(conform(spec, value)?.is_valid())
}

/// Structured explanation of why `value` does not conform, or `None` when
/// it does.
pub fn explain_data(spec: impl Into<SpecRef>, value: &Value) -> SpecResult<Option<ExplainData>> {
    let spec_ref = spec.into();
    let spec = spec_ref.resolve()?;
    explain_resolved(&spec_ref, spec.as_ref(), value)
}

/// Explanation as text; `"Success!\n"` when `value` conforms.
pub fn explain_str(spec: impl Into<SpecRef>, value: &Value) -> SpecResult<String> {
    Ok(match explain_data(spec, value)? {
        Some(data) => data.to_string(),
        None => "Success!\n".to_string(),
    })
}

/// Generator of values conforming to `spec`.
pub fn generate(spec: impl Into<SpecRef>, overrides: &Overrides) -> SpecResult<Generator> {
    let spec_ref = spec.into();
    match override_for(&spec_ref, overrides) {
        Some(g) => Ok(g.clone()),
        None => spec_ref.resolve()?.generate(overrides),
    }
}

/// Generate `n` values and pair each with its conformed form.
pub fn exercise(spec: impl Into<SpecRef>, n: usize, overrides: &Overrides) -> SpecResult<Vec<(Value, Conformed)>> {
    let spec_ref = spec.into();
    let resolved = spec_ref.resolve()?;
    let generator = gensub(&spec_ref, resolved.as_ref(), overrides)?;
    generator
        .samples(0)
        .take(n)
        .map(|produced| -> SpecResult<(Value, Conformed)> {
            let value = produced?.value;
            let conformed = resolved.conform(&value)?;
            Ok((value, conformed))
        })
        .collect()
}

/// Explain against a resolved spec at an explicit location.
pub(crate) fn explain_data_at(
    spec: &dyn Spec,
    path: &[PathElem],
    via: &[String],
    inn: &[PathElem],
    value: &Value,
) -> SpecResult<Option<ExplainData>> {
    let problems = spec.explain(path, via, inn, value)?;
    if problems.is_empty() {
        return Ok(None);
    }
    Ok(Some(ExplainData {
        problems,
        spec: spec.describe(),
        value: value.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ExplainEntry {
        ExplainEntry::new(
            &[PathElem::from("ret")],
            &["sum".to_string()],
            &[PathElem::Index(0)],
            Value::Int(3),
            Pred::new("even?", vec![Value::Int(3)]),
        )
    }

    #[test]
    fn test_explain_entry_display() {
        assert_eq!(
            entry().to_string(),
            "In: [0] val: 3 fails spec: sum at: [ret] predicate: even?, [3]"
        );
        assert!(entry().with_reason("boom").to_string().ends_with(", boom"));
    }

    #[test]
    fn test_explain_entry_json() {
        let json = serde_json::to_value(entry()).unwrap();
        assert_eq!(json["in"], serde_json::json!([0]));
        assert_eq!(json["path"], serde_json::json!(["ret"]));
        assert!(json.get("reason").is_none());
    }

    #[test]
    fn test_conformed_accessors() {
        assert!(Conformed::Invalid.is_invalid());
        assert_eq!(Conformed::Valid(Value::Int(1)).into_value(), Some(Value::Int(1)));
        assert_eq!(Conformed::Invalid.value(), None);
    }
}
