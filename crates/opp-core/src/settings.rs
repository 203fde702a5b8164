//! Typed settings surface.
//!
//! Settings are a flat map of `Namespace.key → raw string`, the shape a
//! scenario file naturally has.  Components read them through a [`Scope`],
//! which prefixes a namespace and optionally falls back to a second one
//! (group-specific keys override the interface or router defaults).
//!
//! Numeric keys that describe a population parameter may be a single value or
//! a two-value range:
//!
//! ```text
//! Energy.initialEnergy = 500          → every host starts with 500
//! Energy.initialEnergy = 10,20        → each host draws uniformly in [10, 20)
//! ```
//!
//! Every malformed value is reported as a [`CoreError`] at construction time,
//! before the first tick runs.
//!
//! # CSV format
//!
//! [`Settings::from_reader`] accepts a two-column CSV with a `key,value`
//! header.  Values containing commas (ranges, window lists) must be quoted.
//! Lines starting with `#` are ignored.
//!
//! ```csv
//! key,value
//! Scenario.updateInterval,1
//! Energy.initialEnergy,"10,20"
//! ```

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::{CoreError, CoreResult, SimRng};

// ── SettingRange ──────────────────────────────────────────────────────────────

/// A scalar (`min == max`) or a uniform `[min, max)` range.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SettingRange {
    pub min: f64,
    pub max: f64,
}

impl SettingRange {
    #[inline]
    pub fn scalar(value: f64) -> Self {
        Self { min: value, max: value }
    }

    #[inline]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.min == self.max
    }

    /// Draw a per-instance value.  Scalars never touch the RNG, so adding a
    /// scalar key does not shift the draws of other ranged keys.
    pub fn draw(&self, rng: &mut SimRng) -> f64 {
        if self.is_scalar() {
            self.min
        } else {
            rng.uniform(self.min, self.max)
        }
    }

    fn parse(key: &str, raw: &str) -> CoreResult<Self> {
        let malformed = || CoreError::MalformedRange {
            key:   key.to_owned(),
            value: raw.to_owned(),
        };
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        let values = parts
            .iter()
            .map(|p| p.parse::<f64>().map_err(|_| malformed()))
            .collect::<CoreResult<Vec<f64>>>()?;
        match values.as_slice() {
            [v] => Ok(Self::scalar(*v)),
            [lo, hi] if lo <= hi => Ok(Self::new(*lo, *hi)),
            _ => Err(malformed()),
        }
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

/// Flat `Namespace.key → value` store.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct SettingRecord {
    key:   String,
    value: String,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs.  Later pairs override earlier ones.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut s = Self::new();
        for (k, v) in pairs {
            s.set(k, v);
        }
        s
    }

    /// Load settings from a `key,value` CSV file.
    pub fn load_csv(path: &Path) -> CoreResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Like [`load_csv`](Self::load_csv) but accepts any `Read` source.
    pub fn from_reader<R: Read>(reader: R) -> CoreResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut settings = Self::new();
        for result in csv_reader.deserialize::<SettingRecord>() {
            let row = result.map_err(|e| CoreError::Parse(e.to_string()))?;
            settings.set(row.key, row.value);
        }
        Ok(settings)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// View the keys under `namespace`.
    pub fn scoped(&self, namespace: &str) -> Scope<'_> {
        Scope { settings: self, namespace: namespace.to_owned(), fallback: None }
    }
}

// ── Scope ─────────────────────────────────────────────────────────────────────

/// A namespaced, typed view over [`Settings`].
#[derive(Clone, Debug)]
pub struct Scope<'a> {
    settings:  &'a Settings,
    namespace: String,
    fallback:  Option<String>,
}

impl<'a> Scope<'a> {
    /// Look up keys missing from this namespace in `namespace` instead.
    pub fn with_fallback(mut self, namespace: &str) -> Self {
        self.fallback = Some(namespace.to_owned());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The underlying settings, for keys that live in another namespace.
    pub fn root(&self) -> &'a Settings {
        self.settings
    }

    /// Resolve `key` to `(full_key, raw_value)`, trying the primary namespace
    /// first and the fallback second.
    fn lookup(&self, key: &str) -> Option<(String, &'a str)> {
        let primary = format!("{}.{}", self.namespace, key);
        if let Some(v) = self.settings.get(&primary) {
            return Some((primary, v));
        }
        let fallback = format!("{}.{}", self.fallback.as_deref()?, key);
        self.settings.get(&fallback).map(|v| (fallback, v))
    }

    fn require(&self, key: &str) -> CoreResult<(String, &'a str)> {
        self.lookup(key)
            .ok_or_else(|| CoreError::MissingSetting(format!("{}.{}", self.namespace, key)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn string(&self, key: &str) -> CoreResult<String> {
        self.require(key).map(|(_, v)| v.trim().to_owned())
    }

    pub fn string_opt(&self, key: &str) -> Option<String> {
        self.lookup(key).map(|(_, v)| v.trim().to_owned())
    }

    pub fn f64(&self, key: &str) -> CoreResult<f64> {
        let (full, raw) = self.require(key)?;
        parse_f64(&full, raw)
    }

    pub fn f64_or(&self, key: &str, default: f64) -> CoreResult<f64> {
        match self.lookup(key) {
            Some((full, raw)) => parse_f64(&full, raw),
            None => Ok(default),
        }
    }

    pub fn u64(&self, key: &str) -> CoreResult<u64> {
        let (full, raw) = self.require(key)?;
        parse_u64(&full, raw)
    }

    pub fn u64_or(&self, key: &str, default: u64) -> CoreResult<u64> {
        match self.lookup(key) {
            Some((full, raw)) => parse_u64(&full, raw),
            None => Ok(default),
        }
    }

    pub fn bool(&self, key: &str) -> CoreResult<bool> {
        let (full, raw) = self.require(key)?;
        parse_bool(&full, raw)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> CoreResult<bool> {
        match self.lookup(key) {
            Some((full, raw)) => parse_bool(&full, raw),
            None => Ok(default),
        }
    }

    /// A scalar or two-value range.
    pub fn range(&self, key: &str) -> CoreResult<SettingRange> {
        let (full, raw) = self.require(key)?;
        SettingRange::parse(&full, raw)
    }

    pub fn range_or(&self, key: &str, default: f64) -> CoreResult<SettingRange> {
        match self.lookup(key) {
            Some((full, raw)) => SettingRange::parse(&full, raw),
            None => Ok(SettingRange::scalar(default)),
        }
    }

    /// A comma separated list of numbers of any length.
    pub fn csv_f64(&self, key: &str) -> CoreResult<Vec<f64>> {
        let (full, raw) = self.require(key)?;
        raw.split(',').map(|p| parse_f64(&full, p)).collect()
    }

    /// Exactly two comma separated numbers.
    pub fn pair(&self, key: &str) -> CoreResult<(f64, f64)> {
        let (full, raw) = self.require(key)?;
        match self.csv_f64(key)?.as_slice() {
            [a, b] => Ok((*a, *b)),
            _ => Err(CoreError::invalid(&full, raw, "expected exactly two comma separated values")),
        }
    }
}

// ── Parsers ───────────────────────────────────────────────────────────────────

fn parse_f64(key: &str, raw: &str) -> CoreResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| CoreError::invalid(key, raw, "expected a number"))
}

fn parse_u64(key: &str, raw: &str) -> CoreResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| CoreError::invalid(key, raw, "expected a non-negative integer"))
}

fn parse_bool(key: &str, raw: &str) -> CoreResult<bool> {
    match raw.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(CoreError::invalid(key, raw, "expected true or false")),
    }
}
