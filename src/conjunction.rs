//! ConjunctionSpec: thread a value through children in order.

use crate::error::{SpecError, SpecResult};
use crate::generator::Generator;
use crate::registry::Registry;
use crate::spec::{explain1, gensub, Conformed, ExplainEntry, Overrides, PathElem, ResolvedSpecs, Spec, SpecRef};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Every child must conform; each child sees the previous child's
/// conformed value.
#[derive(Clone)]
pub struct ConjunctionSpec {
    specs: ResolvedSpecs,
    gen: Option<Generator>,
    name: Option<String>,
}

impl ConjunctionSpec {
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

    /// Resolve named children through `registry` rather than the global
    /// registry.
    pub fn with_registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.specs = self.specs.with_registry(registry);
        self
    }

    pub fn specs(&self) -> &[SpecRef] {
        self.specs.refs()
    }
}

impl Spec for ConjunctionSpec {
    fn conform(&self, value: &Value) -> SpecResult<Conformed> {
        let mut current = value.clone();
        for spec in self.specs.get()? {
            match spec.conform(&current)? {
                Conformed::Valid(v) => current = v,
                Conformed::Invalid => return Ok(Conformed::Invalid),
            }
        }
        Ok(Conformed::Valid(current))
    }

    fn unform(&self, value: &Value) -> SpecResult<Value> {
        let mut current = value.clone();
        for spec in self.specs.get()?.iter().rev() {
            current = spec.unform(&current)?;
        }
        Ok(current)
    }

    // Only the first failing child reports; earlier children passed and
    // later ones never saw a value.
    fn explain(&self, path: &[PathElem], via: &[String], inn: &[PathElem], value: &Value)
        -> SpecResult<Vec<ExplainEntry>> {
        let mut current = value.clone();
        for (spec_ref, spec) in self.specs.entries()? {
            match spec.conform(&current)? {
                Conformed::Valid(v) => current = v,
                Conformed::Invalid => return explain1(spec_ref, spec.as_ref(), path, via, inn, &current),
            }
        }
        Ok(Vec::new())
    }

    /// Generates from the first child only, so values may fail later
    /// children.
    fn generate(&self, overrides: &Overrides) -> SpecResult<Generator> {
        if let Some(gen) = &self.gen {
            return Ok(gen.clone());
        }
        match self.specs.entries()?.next() {
            Some((first_ref, first)) => gensub(first_ref, first.as_ref(), overrides),
            None => Err(SpecError::NoGenerator(self.describe())),
        }
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn describe(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let children: Vec<String> = self.specs.refs().iter().map(SpecRef::describe).collect();
        format!("and({})", children.join(", "))
    }
}

impl fmt::Debug for ConjunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConjunctionSpec({})", self.describe())
    }
}
