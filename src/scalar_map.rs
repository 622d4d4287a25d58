// --- Файл: src/scalar_map.rs ---

//! Ordered name -> scalar mapping returned by losses and metrics.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// An insertion-ordered mapping from component name to scalar.
///
/// Inserting an existing key overwrites the value in place. The key keeps its
/// first-seen position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalarMap {
    entries: Vec<(String, f32)>,
}

impl ScalarMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map holding one entry.
    pub fn single(name: impl Into<String>, value: f32) -> Self {
        let mut map = Self::new();
        map.insert(name, value);
        map
    }

    /// Inserts or overwrites. Returns the previous value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: f32) -> Option<f32> {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.entries.iter().map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), *value))
    }

    /// Merges `other` into `self`. Later values win, earlier positions are kept.
    pub fn merge(&mut self, other: ScalarMap) {
        for (name, value) in other {
            self.insert(name, value);
        }
    }

    /// Sums every value in insertion order.
    pub fn sum(&self) -> f32 {
        self.values().fold(0.0, |acc, v| acc + v)
    }

    /// Multiplies every value by `factor`.
    pub fn scaled(mut self, factor: f32) -> Self {
        for (_, value) in &mut self.entries {
            *value *= factor;
        }
        self
    }
}

impl IntoIterator for ScalarMap {
    type Item = (String, f32);
    type IntoIter = std::vec::IntoIter<(String, f32)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, f32)> for ScalarMap {
    fn from_iter<I: IntoIterator<Item = (K, f32)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

impl Serialize for ScalarMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
