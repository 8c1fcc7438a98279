//! Generators: lazily produce domain values from a choice sequence.
//!
//! A `Generator` is a function from a `ConjectureData` to a `Value`. Because
//! every random decision is recorded as a choice, any produced value can be
//! reproduced (and simplified) by replaying its choices; see
//! [`Generator::replay`] and [`Generator::shrink_tree`].

use crate::choice::ChoiceNode;
use crate::data::{ConjectureData, DrawError};
use crate::error::{SpecError, SpecResult};
use crate::shrinking::ShrinkTree;
use crate::strings;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type DrawFn = dyn Fn(&mut ConjectureData) -> Result<Value, DrawError> + Send + Sync;

/// Default upper bound on generated collection and string sizes.
pub const DEFAULT_MAX_SIZE: usize = 10;

/// Attempts made by [`Generator::filter`] before giving up.
pub const DEFAULT_FILTER_TRIES: u32 = 100;

#[derive(Clone)]
pub struct Generator {
    draw: Arc<DrawFn>,
    shrinkable: bool,
}

/// A produced value together with the choices that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Produced {
    pub value: Value,
    pub choices: Vec<ChoiceNode>,
}

impl Generator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ConjectureData) -> Result<Value, DrawError> + Send + Sync + 'static,
    {
        Self {
            draw: Arc::new(f),
            shrinkable: true,
        }
    }

    /// Draw one value from `data`.
    pub fn draw(&self, data: &mut ConjectureData) -> Result<Value, DrawError> {
        (self.draw)(data)
    }

    /// Mark this generator as exposing no shrink tree.
    pub fn unshrinkable(mut self) -> Self {
        self.shrinkable = false;
        self
    }

    pub fn is_shrinkable(&self) -> bool {
        self.shrinkable
    }

    // Combinators

    pub fn map<F>(&self, f: F) -> Generator
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let inner = self.clone();
        Generator::new(move |data| inner.draw(data).map(&f)).with_shrinkable(self.shrinkable)
    }

    pub fn bind<F>(&self, f: F) -> Generator
    where
        F: Fn(Value) -> Generator + Send + Sync + 'static,
    {
        let inner = self.clone();
        Generator::new(move |data| {
            let value = inner.draw(data)?;
            f(value).draw(data)
        })
        .with_shrinkable(self.shrinkable)
    }

    /// Always produce `value`.
    pub fn constant(value: Value) -> Generator {
        Generator::new(move |_| Ok(value.clone()))
    }

    /// Produce a list with one value from each generator, in order.
    pub fn tuple(gens: Vec<Generator>) -> Generator {
        let shrinkable = gens.iter().all(Generator::is_shrinkable);
        Generator::new(move |data| {
            gens.iter()
                .map(|g| g.draw(data))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        })
        .with_shrinkable(shrinkable)
    }

    /// Pick one of `gens`, shrinking towards the first.
    pub fn one_of(gens: Vec<Generator>) -> Generator {
        let shrinkable = gens.iter().all(Generator::is_shrinkable);
        Generator::new(move |data| {
            let g = data.choice(&gens)?;
            g.draw(data)
        })
        .with_shrinkable(shrinkable)
    }

    /// Pick one of `values`, shrinking towards the first.
    pub fn element_of(values: Vec<Value>) -> Generator {
        Generator::new(move |data| data.choice(&values))
    }

    /// Keep drawing until `pred` holds, up to `max_tries` attempts.
    pub fn filter<F>(&self, pred: F, max_tries: u32) -> Generator
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let inner = self.clone();
        Generator::new(move |data| {
            for _ in 0..max_tries {
                let value = inner.draw(data)?;
                if pred(&value) {
                    return Ok(value);
                }
            }
            Err(DrawError::Unsatisfied(max_tries))
        })
        .with_shrinkable(self.shrinkable)
    }

    // Primitives

    pub fn booleans() -> Generator {
        Generator::new(|data| data.draw_boolean(0.5).map(Value::Bool))
    }

    pub fn integers(min_value: i64, max_value: i64) -> Generator {
        Generator::new(move |data| {
            data.draw_integer(i128::from(min_value), i128::from(max_value), 0)
                .map(|i| Value::Int(i as i64))
        })
    }

    pub fn floats(min_value: f64, max_value: f64) -> Generator {
        Generator::new(move |data| data.draw_float(min_value, max_value).map(Value::Float))
    }

    /// Alphanumeric strings of at most `max_len` characters.
    pub fn strings(max_len: usize) -> Generator {
        Generator::new(move |data| {
            strings::draw_string(data, strings::ALPHANUMERIC, 0, max_len).map(Value::Str)
        })
    }

    /// Strings matched by `pattern`.
    pub fn from_pattern(pattern: &str) -> SpecResult<Generator> {
        let hir = regex_syntax::Parser::new()
            .parse(pattern)
            .map_err(|e| SpecError::Pattern(e.to_string()))?;
        Ok(Generator::new(move |data| {
            let mut out = String::new();
            strings::draw_from_pattern(data, &hir, &mut out)?;
            Ok(Value::Str(out))
        }))
    }

    /// Lists of at most `max_len` elements drawn from `element`.
    pub fn list_of(element: Generator, max_len: usize) -> Generator {
        let shrinkable = element.shrinkable;
        Generator::new(move |data| {
            let len = data.draw_integer(0, max_len as i128, 0)?;
            (0..len)
                .map(|_| element.draw(data))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        })
        .with_shrinkable(shrinkable)
    }

    /// Maps with exactly the given keys, each value drawn from its generator.
    pub fn map_of(entries: Vec<(String, Generator)>) -> Generator {
        let shrinkable = entries.iter().all(|(_, g)| g.shrinkable);
        Generator::new(move |data| {
            let mut map = BTreeMap::new();
            for (key, g) in &entries {
                map.insert(key.clone(), g.draw(data)?);
            }
            Ok(Value::Map(map))
        })
        .with_shrinkable(shrinkable)
    }

    /// Simple scalar values of any type.
    pub fn any() -> Generator {
        Generator::one_of(vec![
            Generator::constant(Value::Nil),
            Generator::booleans(),
            Generator::integers(-1000, 1000),
            Generator::strings(DEFAULT_MAX_SIZE),
        ])
    }

    // Producing values

    /// Draw a value from a fresh choice stream, keeping its choices.
    pub fn produce(&self, seed: u64) -> Result<Produced, DrawError> {
        self.run(ConjectureData::new(seed))
    }

    /// Draw a single value from a fresh choice stream.
    pub fn produce_one(&self, seed: u64) -> Result<Value, DrawError> {
        self.produce(seed).map(|p| p.value)
    }

    /// Lazy, unbounded sequence of produced values; the i-th value is drawn
    /// from a stream seeded with `seed + i`.
    pub fn samples(&self, seed: u64) -> Samples {
        Samples {
            generator: self.clone(),
            seed,
        }
    }

    /// Re-run this generator against a recorded (or modified) choice sequence.
    pub fn replay(&self, choices: &[ChoiceNode]) -> Result<Produced, DrawError> {
        self.run(ConjectureData::for_choices(choices))
    }

    /// The shrink tree rooted at `produced`, or `None` for unshrinkable
    /// generators.
    pub fn shrink_tree(&self, produced: &Produced) -> Option<ShrinkTree> {
        if self.shrinkable {
            Some(ShrinkTree::new(produced.choices.clone()))
        } else {
            None
        }
    }

    fn run(&self, mut data: ConjectureData) -> Result<Produced, DrawError> {
        let value = self.draw(&mut data)?;
        data.freeze();
        Ok(Produced {
            value,
            choices: data.into_nodes(),
        })
    }

    fn with_shrinkable(mut self, shrinkable: bool) -> Self {
        self.shrinkable = shrinkable;
        self
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator").field("shrinkable", &self.shrinkable).finish()
    }
}

/// Iterator returned by [`Generator::samples`].
pub struct Samples {
    generator: Generator,
    seed: u64,
}

impl Iterator for Samples {
    type Item = Result<Produced, DrawError>;

    fn next(&mut self) -> Option<Self::Item> {
        let produced = self.generator.produce(self.seed);
        self.seed = self.seed.wrapping_add(1);
        Some(produced)
    }
}
