//! ContractSpec: a spec over callables.
//!
//! A contract names an argument spec, a return spec and optionally a
//! relation between the two (checked over `{args, ret[, supplementary]}`)
//! and a spec for the callable's supplementary input. A callable conforms
//! when a bounded verification run over generated arguments finds no
//! failure.

use crate::check::{CallFailure, CheckRole};
use crate::config::spec_config;
use crate::engine::{invoke_caught, ConjectureRunner, RunnerConfig, Verdict, VerificationRun};
use crate::error::{SpecError, SpecResult};
use crate::generator::Generator;
use crate::matcher::Matcher;
use crate::registry::Registry;
use crate::spec::{
    explain1, explain_data_at, explain_resolved, gensub, resolver, Conformed, ExplainData, ExplainEntry, Overrides,
    PathElem, Pred, Spec, SpecRef,
};
use crate::value::{Callable, Fault, Value};
use log::debug;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct ContractSpec {
    args: Option<SpecRef>,
    ret: SpecRef,
    relation: Option<SpecRef>,
    supplementary: Option<SpecRef>,
    gen: Option<Generator>,
    name: Option<String>,
    iterations: Option<u32>,
    registry: Option<Arc<dyn Registry>>,
    resolved: Arc<OnceCell<SpecResult<Arc<Parts>>>>,
}

type Part = (SpecRef, Arc<dyn Spec>);

/// The contract's specs, resolved once and shared by every operation.
pub(crate) struct Parts {
    args: Option<Part>,
    ret: Part,
    relation: Option<Part>,
    supplementary: Option<Part>,
}

fn resolve_part(spec_ref: &SpecRef, names: &dyn Registry) -> SpecResult<Part> {
    Ok((spec_ref.clone(), spec_ref.resolve_in(names)?))
}

fn usage(e: SpecError) -> Fault {
    match e {
        SpecError::Usage(message) => Fault::Usage(message),
        other => Fault::Usage(other.to_string()),
    }
}

/// Split a trial `[args, supplementary]` into its two parts.
fn split_trial(trial: &Value) -> (Value, Value) {
    match trial.as_list() {
        Some([args, supplementary]) => (args.clone(), supplementary.clone()),
        _ => (trial.clone(), Value::Nil),
    }
}

/// Positional arguments of an argument value; a non-list is one argument.
fn positional(args: &Value) -> Vec<Value> {
    match args {
        Value::List(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn failure(role: CheckRole, spec: &dyn Spec, value: &Value) -> Result<Verdict<CallFailure>, Fault> {
    let data = explain_data_at(spec, &[PathElem::from(role.as_str())], &[], &[], value)
        .map_err(usage)?
        .unwrap_or_else(|| ExplainData {
            problems: Vec::new(),
            spec: spec.describe(),
            value: value.clone(),
        });
    Ok(Verdict::Fail(CallFailure { role, data }))
}

impl Parts {
    fn args(&self) -> SpecResult<&Part> {
        self.args
            .as_ref()
            .ok_or_else(|| SpecError::Usage("contract has no args spec".to_string()))
    }

    fn relation_input(&self, args: Value, ret: Value, supplementary: &Value) -> Value {
        let mut entries = vec![("args", args), ("ret", ret)];
        if self.supplementary.is_some() {
            entries.push(("supplementary", supplementary.clone()));
        }
        Value::map(entries)
    }

    fn supplementary_input<'a>(&self, supplementary: &'a Value) -> Option<&'a Value> {
        self.supplementary.as_ref().map(|_| supplementary)
    }

    /// Generator of trials `[args, supplementary]`.
    pub(crate) fn trial_generator(&self, overrides: &Overrides) -> SpecResult<Generator> {
        let (args_ref, args_spec) = self.args()?;
        let args = gensub(args_ref, args_spec.as_ref(), overrides)?;
        let supplementary = match &self.supplementary {
            Some((spec_ref, spec)) => gensub(spec_ref, spec.as_ref(), overrides)?,
            None => Generator::constant(Value::Nil),
        };
        Ok(Generator::tuple(vec![args, supplementary]))
    }

    /// One trial: conform the inputs, invoke, then conform the return value
    /// and the relation.
    pub(crate) fn check_call(&self, callable: &Callable, trial: &Value) -> Result<Verdict<CallFailure>, Fault> {
        let (args, supplementary) = split_trial(trial);
        let (_, args_spec) = self.args().map_err(usage)?;

        let cargs = match args_spec.conform(&args).map_err(usage)? {
            Conformed::Valid(v) => v,
            Conformed::Invalid => return failure(CheckRole::Args, args_spec.as_ref(), &args),
        };
        if let Some((_, spec)) = &self.supplementary {
            if spec.conform(&supplementary).map_err(usage)?.is_invalid() {
                return failure(CheckRole::Supplementary, spec.as_ref(), &supplementary);
            }
        }

        let ret = invoke_caught(callable, &positional(&args), self.supplementary_input(&supplementary))?;

        let cret = match self.ret.1.conform(&ret).map_err(usage)? {
            Conformed::Valid(v) => v,
            Conformed::Invalid => return failure(CheckRole::Ret, self.ret.1.as_ref(), &ret),
        };
        if let Some((_, spec)) = &self.relation {
            let input = self.relation_input(cargs, cret, &supplementary);
            if spec.conform(&input).map_err(usage)?.is_invalid() {
                return failure(CheckRole::Relation, spec.as_ref(), &input);
            }
        }
        Ok(Verdict::Pass)
    }
}

impl ContractSpec {
    pub fn new() -> Self {
        Self {
            args: None,
            ret: SpecRef::from(Matcher::any()),
            relation: None,
            supplementary: None,
            gen: None,
            name: None,
            iterations: None,
            registry: None,
            resolved: Arc::default(),
        }
    }

    /// Drop any resolution made before the contract's specs changed.
    fn unresolved(mut self) -> Self {
        self.resolved = Arc::default();
        self
    }

    pub fn with_args(mut self, args: impl Into<SpecRef>) -> Self {
        self.args = Some(args.into());
        self.unresolved()
    }

    pub fn with_ret(mut self, ret: impl Into<SpecRef>) -> Self {
        self.ret = ret.into();
        self.unresolved()
    }

    pub fn with_relation(mut self, relation: impl Into<SpecRef>) -> Self {
        self.relation = Some(relation.into());
        self.unresolved()
    }

    pub fn with_supplementary(mut self, supplementary: impl Into<SpecRef>) -> Self {
        self.supplementary = Some(supplementary.into());
        self.unresolved()
    }

    /// Resolve named specs through `registry` rather than the global
    /// registry.
    pub fn with_registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registry = Some(registry);
        self.unresolved()
    }

    pub fn with_gen(mut self, gen: Generator) -> Self {
        self.gen = Some(gen);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Trial budget for `conform`, overriding the global default.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = Some(iterations);
        self
    }

    pub fn args(&self) -> Option<&SpecRef> {
        self.args.as_ref()
    }

    pub fn ret(&self) -> &SpecRef {
        &self.ret
    }

    pub fn relation(&self) -> Option<&SpecRef> {
        self.relation.as_ref()
    }

    pub fn supplementary(&self) -> Option<&SpecRef> {
        self.supplementary.as_ref()
    }

    /// The contract's specs, resolved on first use.
    fn resolved(&self) -> SpecResult<Arc<Parts>> {
        self.resolved
            .get_or_init(|| {
                let names = resolver(&self.registry);
                let part = |spec_ref: &SpecRef| resolve_part(spec_ref, names);
                Ok(Arc::new(Parts {
                    args: self.args.as_ref().map(part).transpose()?,
                    ret: part(&self.ret)?,
                    relation: self.relation.as_ref().map(part).transpose()?,
                    supplementary: self.supplementary.as_ref().map(part).transpose()?,
                }))
            })
            .clone()
    }

    /// Resolved specs of a contract that can be verified.
    pub(crate) fn parts(&self) -> SpecResult<Arc<Parts>> {
        if self.args.is_none() {
            return Err(SpecError::Usage(format!(
                "can't conform contract without args spec: {}",
                self.describe()
            )));
        }
        self.resolved()
    }

    /// Verify `callable` against this contract.
    pub fn validate(
        &self,
        callable: &Callable,
        config: RunnerConfig,
        overrides: &Overrides,
    ) -> SpecResult<VerificationRun<CallFailure>> {
        let parts = self.parts()?;
        let trials = parts.trial_generator(overrides)?;
        debug!("validating {} against {}", callable, self.describe());
        ConjectureRunner::new(config).run(&trials, |trial| parts.check_call(callable, trial))
    }

    fn not_callable(path: &[PathElem], via: &[String], inn: &[PathElem], value: &Value) -> ExplainEntry {
        ExplainEntry::new(path, via, inn, value.clone(), Pred::new("callable?", Vec::new()))
    }
}

impl Default for ContractSpec {
    fn default() -> Self {
        Self::new()
    }
}

/// Raise a usage fault explaining `value` when it does not conform.
fn reject_nonconforming((spec_ref, spec): &Part, value: &Value) -> Result<(), Fault> {
    if spec.conform(value).map_err(usage)?.is_valid() {
        return Ok(());
    }
    let explanation = explain_resolved(spec_ref, spec.as_ref(), value).map_err(usage)?;
    Err(Fault::Usage(explanation.map(|data| data.to_string()).unwrap_or_default()))
}

fn push(path: &[PathElem], key: &str) -> Vec<PathElem> {
    let mut path = path.to_vec();
    path.push(PathElem::from(key));
    path
}

impl Spec for ContractSpec {
    fn conform(&self, value: &Value) -> SpecResult<Conformed> {
        // A contract without args is a usage error even for non-callables.
        self.parts()?;
        let callable = match value.as_callable() {
            Some(c) => c,
            None => return Ok(Conformed::Invalid),
        };
        let iterations = self.iterations.unwrap_or_else(|| spec_config().contract_iterations);
        let config = RunnerConfig::default().with_max_examples(iterations);
        let run = self.validate(callable, config, &Overrides::new())?;
        Ok(if run.passed() {
            Conformed::Valid(value.clone())
        } else {
            Conformed::Invalid
        })
    }

    fn unform(&self, value: &Value) -> SpecResult<Value> {
        Ok(value.clone())
    }

    fn explain(&self, path: &[PathElem], via: &[String], inn: &[PathElem], value: &Value)
        -> SpecResult<Vec<ExplainEntry>> {
        let callable = match value.as_callable() {
            Some(c) => c,
            None => return Ok(vec![Self::not_callable(path, via, inn, value)]),
        };
        let parts = self.parts()?;
        let config = RunnerConfig::default().with_max_examples(spec_config().explain_iterations);
        let run = self.validate(callable, config, &Overrides::new())?;
        let trial = match run.minimal() {
            Some(trial) => trial.input.clone(),
            None => return Ok(Vec::new()),
        };
        let (args, supplementary) = split_trial(&trial);
        let (args_ref, args_spec) = parts.args()?;

        let cargs = match args_spec.conform(&args)? {
            Conformed::Valid(v) => v,
            Conformed::Invalid => {
                return explain1(args_ref, args_spec.as_ref(), &push(path, "args"), via, inn, &args)
            }
        };

        let call_args = positional(&args);
        let ret = match invoke_caught(callable, &call_args, parts.supplementary_input(&supplementary)) {
            Ok(ret) => ret,
            Err(fault) => {
                let reason = match fault {
                    Fault::Raised(message) | Fault::Usage(message) => message,
                };
                let mut pred_args = call_args;
                let mut val = vec![("args", args)];
                if parts.supplementary.is_some() {
                    pred_args.push(supplementary.clone());
                    val.push(("supplementary", supplementary));
                }
                let val = Value::map(val);
                let entry = ExplainEntry::new(path, via, inn, val, Pred::new(callable.name(), pred_args));
                return Ok(vec![entry.with_reason(reason.trim_end())]);
            }
        };

        let (ret_ref, ret_spec) = &parts.ret;
        let cret = match ret_spec.conform(&ret)? {
            Conformed::Valid(v) => v,
            Conformed::Invalid => return explain1(ret_ref, ret_spec.as_ref(), &push(path, "ret"), via, inn, &ret),
        };

        match &parts.relation {
            Some((relation_ref, relation)) => {
                let input = parts.relation_input(cargs, cret, &supplementary);
                explain1(relation_ref, relation.as_ref(), &push(path, "relation"), via, inn, &input)
            }
            None => Ok(Vec::new()),
        }
    }

    /// A stub callable: it checks its inputs against `args` (and
    /// `supplementary`), raising a usage fault on mismatch, then returns a
    /// value generated from `ret`.
    fn generate(&self, overrides: &Overrides) -> SpecResult<Generator> {
        if let Some(gen) = &self.gen {
            return Ok(gen.clone());
        }

        let parts = self.resolved()?;
        let (ret_ref, ret_spec) = &parts.ret;
        let ret_gen = gensub(ret_ref, ret_spec.as_ref(), overrides)?;
        let calls = Arc::new(AtomicU64::new(0));
        let name = self.name.clone().unwrap_or_else(|| "stub".to_string());

        let stub = Callable::new(name, move |call_args, supp| {
            if let Some(args) = &parts.args {
                reject_nonconforming(args, &Value::List(call_args.to_vec()))?;
            }
            if let Some(supplementary) = &parts.supplementary {
                reject_nonconforming(supplementary, &supp.cloned().unwrap_or(Value::Nil))?;
            }
            let seed = calls.fetch_add(1, Ordering::Relaxed);
            ret_gen.produce_one(seed).map_err(|e| Fault::Raised(e.to_string()))
        });
        Ok(Generator::constant(Value::Fn(stub)))
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn describe(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let mut parts = Vec::new();
        if let Some(args) = &self.args {
            parts.push(format!("args: {}", args.describe()));
        }
        parts.push(format!("ret: {}", self.ret.describe()));
        if let Some(relation) = &self.relation {
            parts.push(format!("relation: {}", relation.describe()));
        }
        if let Some(supplementary) = &self.supplementary {
            parts.push(format!("supplementary: {}", supplementary.describe()));
        }
        format!("fspec({})", parts.join(", "))
    }

    fn as_contract(&self) -> Option<&ContractSpec> {
        Some(self)
    }
}

impl fmt::Debug for ContractSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractSpec({})", self.describe())
    }
}
