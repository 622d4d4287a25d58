// --- Файл: src/config/mod.rs ---

//! Declarative configuration for losses and metrics.
//!
//! A section is an ordered list of single-key mappings:
//!
//! ```yaml
//! - CELoss:
//!     weight: 1.0
//!     epsilon: 0.1
//! - TripletLossV2:
//!     weight: 1.0
//!     margin: 0.5
//! ```
//!
//! [`split_entry`] checks the shape of one entry, and [`Params`] hands typed
//! values to the constructors. Constructors consume the keys they understand
//! and call [`Params::finish`], which rejects whatever is left over.

pub mod loader;

pub use loader::{ConfigFormat, ConfigLoader, Phase, PhaseSections, RunConfig};

use crate::error::ConfigError;
use serde_json::{Map, Value};

type Result<T> = std::result::Result<T, ConfigError>;

/// Checks that a section is a list and returns its entries.
pub fn spec_list(section: &Value) -> Result<&[Value]> {
    section
        .as_array()
        .map(|entries| entries.as_slice())
        .ok_or_else(|| ConfigError::Shape("operator config should be a list".to_string()))
}

/// Splits one entry into its name and parameter mapping.
///
/// The entry must be a mapping with exactly one key. A `null` value (e.g.
/// `- mAP:` in YAML) is read as an empty parameter mapping.
pub fn split_entry(index: usize, entry: &Value) -> Result<(String, Params)> {
    let object = entry.as_object().ok_or_else(|| {
        ConfigError::Shape(format!("entry {index} is not a mapping: {entry}"))
    })?;

    if object.len() != 1 {
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        return Err(ConfigError::Shape(format!(
            "entry {index} must have exactly one key, found {keys:?}"
        )));
    }

    let Some((name, value)) = object.iter().next() else {
        return Err(ConfigError::Shape(format!("entry {index} is empty")));
    };

    let map = match value {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            return Err(ConfigError::Shape(format!(
                "parameters of '{name}' must be a mapping, found {other}"
            )))
        }
    };

    Ok((name.clone(), Params::new(name, map)))
}

/// Constructor parameters for one loss or metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    owner: String,
    map: Map<String, Value>,
}

impl Params {
    pub fn new(owner: &str, map: Map<String, Value>) -> Self {
        Self {
            owner: owner.to_string(),
            map,
        }
    }

    /// Empty parameters, handy when building components in code.
    pub fn empty(owner: &str) -> Self {
        Self::new(owner, Map::new())
    }

    /// Name of the component these parameters belong to.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Removes a raw value. `null` counts as absent.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        match self.map.remove(key) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    pub fn take_f32(&mut self, key: &str) -> Result<Option<f32>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(|v| Some(v as f32))
                .ok_or_else(|| self.type_error(key, "a number", &value)),
        }
    }

    pub fn take_f32_or(&mut self, key: &str, default: f32) -> Result<f32> {
        Ok(self.take_f32(key)?.unwrap_or(default))
    }

    pub fn take_usize(&mut self, key: &str) -> Result<Option<usize>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .map(|v| Some(v as usize))
                .ok_or_else(|| self.type_error(key, "a non-negative integer", &value)),
        }
    }

    pub fn take_usize_or(&mut self, key: &str, default: usize) -> Result<usize> {
        Ok(self.take_usize(key)?.unwrap_or(default))
    }

    pub fn take_bool(&mut self, key: &str) -> Result<Option<bool>> {
        match self.take(key) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.type_error(key, "a boolean", &value)),
        }
    }

    pub fn take_bool_or(&mut self, key: &str, default: bool) -> Result<bool> {
        Ok(self.take_bool(key)?.unwrap_or(default))
    }

    pub fn take_string(&mut self, key: &str) -> Result<Option<String>> {
        match self.take(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(value) => Err(self.type_error(key, "a string", &value)),
        }
    }

    /// Reads either a single integer or a list of integers.
    pub fn take_usize_list(&mut self, key: &str) -> Result<Option<Vec<usize>>> {
        let Some(value) = self.take(key) else {
            return Ok(None);
        };
        if let Some(single) = value.as_u64() {
            return Ok(Some(vec![single as usize]));
        }
        let items = value
            .as_array()
            .ok_or_else(|| self.type_error(key, "an integer or a list of integers", &value))?;
        items
            .iter()
            .map(|item| {
                item.as_u64()
                    .map(|v| v as usize)
                    .ok_or_else(|| self.type_error(key, "a list of integers", &value))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Rejects any parameter the constructor did not consume.
    pub fn finish(self) -> Result<()> {
        if self.map.is_empty() {
            return Ok(());
        }
        let unexpected: Vec<&str> = self.map.keys().map(String::as_str).collect();
        Err(ConfigError::construction(
            &self.owner,
            format!("unexpected parameter(s) {unexpected:?}"),
        ))
    }

    fn type_error(&self, key: &str, expected: &str, found: &Value) -> ConfigError {
        ConfigError::construction(
            &self.owner,
            format!("parameter '{key}' must be {expected}, found {found}"),
        )
    }
}
