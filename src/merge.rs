//! MergeSpec: apply map specs independently and merge their results.

use crate::error::SpecResult;
use crate::generator::Generator;
use crate::registry::Registry;
use crate::spec::{explain1, gensub, Conformed, ExplainEntry, Overrides, PathElem, ResolvedSpecs, Spec, SpecRef};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Conforms when every child conforms; the conformed value is the shallow
/// merge of the children's results, later children winning on shared keys.
#[derive(Clone)]
pub struct MergeSpec {
    specs: ResolvedSpecs,
    gen: Option<Generator>,
    name: Option<String>,
}

impl MergeSpec {
    pub fn new<I, S>(specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SpecRef>,
    {
        Self {
            specs: ResolvedSpecs::new(specs.into_iter().map(Into::into).collect()),
            gen: None,
            name: None,
        }
    }

    pub fn with_gen(mut self, gen: Generator) -> Self {
        self.gen = Some(gen);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.specs = self.specs.with_registry(registry);
        self
    }

    pub fn specs(&self) -> &[SpecRef] {
        self.specs.refs()
    }
}

fn merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Map(BTreeMap::new()), Value::merge)
}

impl Spec for MergeSpec {
    fn conform(&self, value: &Value) -> SpecResult<Conformed> {
        let mut results = Vec::new();
        for spec in self.specs.get()? {
            match spec.conform(value)? {
                Conformed::Valid(v) => results.push(v),
                Conformed::Invalid => return Ok(Conformed::Invalid),
            }
        }
        Ok(Conformed::Valid(merge_all(results)))
    }

    fn unform(&self, value: &Value) -> SpecResult<Value> {
        let unformed = self
            .specs
            .get()?
            .iter()
            .map(|spec| spec.unform(value))
            .collect::<SpecResult<Vec<_>>>()?;
        Ok(merge_all(unformed))
    }

    fn explain(&self, path: &[PathElem], via: &[String], inn: &[PathElem], value: &Value)
        -> SpecResult<Vec<ExplainEntry>> {
        let mut problems = Vec::new();
        for (spec_ref, spec) in self.specs.entries()? {
            problems.extend(explain1(spec_ref, spec.as_ref(), path, via, inn, value)?);
        }
        Ok(problems)
    }

    fn generate(&self, overrides: &Overrides) -> SpecResult<Generator> {
        if let Some(gen) = &self.gen {
            return Ok(gen.clone());
        }
        let gens = self
            .specs
            .entries()?
            .map(|(spec_ref, spec)| gensub(spec_ref, spec.as_ref(), overrides))
            .collect::<SpecResult<Vec<_>>>()?;
        Ok(Generator::tuple(gens).map(|parts| match parts {
            Value::List(parts) => merge_all(parts),
            other => other,
        }))
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn describe(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let children: Vec<String> = self.specs.refs().iter().map(SpecRef::describe).collect();
        format!("merge({})", children.join(", "))
    }
}

impl fmt::Debug for MergeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MergeSpec({})", self.describe())
    }
}
