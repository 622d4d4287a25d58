// --- Файл: src/data/output.rs ---

//! Model forward outputs as seen by losses and metrics.

use crate::error::EvalError;
use ndarray::ArrayD;

/// Output of a model forward pass.
///
/// Plain classifiers produce a single tensor of logits. Metric-learning and
/// distillation models produce a dict, e.g. `{"logits": .., "features": ..}`
/// or `{"Student": {..}, "Teacher": {..}}`. Dict entries keep their
/// insertion order; re-inserting a key replaces the value in place.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Tensor(ArrayD<f32>),
    Dict(Vec<(String, ModelOutput)>),
}

impl ModelOutput {
    /// Creates an empty dict output.
    pub fn dict() -> Self {
        ModelOutput::Dict(Vec::new())
    }

    /// Adds or replaces an entry.
    ///
    /// A tensor output is turned into a dict first, with the tensor kept
    /// under `logits`.
    pub fn with(self, key: &str, value: impl Into<ModelOutput>) -> Self {
        let mut entries = match self {
            ModelOutput::Dict(entries) => entries,
            ModelOutput::Tensor(tensor) => vec![("logits".to_string(), ModelOutput::Tensor(tensor))],
        };
        let value = value.into();
        match entries.iter_mut().find(|(name, _)| name == key) {
            Some((_, slot)) => *slot = value,
            None => entries.push((key.to_string(), value)),
        }
        ModelOutput::Dict(entries)
    }

    /// Looks up a dict entry.
    pub fn get(&self, key: &str) -> Result<&ModelOutput, EvalError> {
        match self {
            ModelOutput::Dict(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value)
                .ok_or_else(|| EvalError::MissingOutput(key.to_string())),
            ModelOutput::Tensor(_) => Err(EvalError::NotADict(key.to_string())),
        }
    }

    /// Dict keys in insertion order; empty for a tensor output.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            ModelOutput::Dict(entries) => entries.iter().map(|(name, _)| name.as_str()).collect(),
            ModelOutput::Tensor(_) => Vec::new(),
        }
    }

    pub fn as_tensor(&self, what: &str) -> Result<&ArrayD<f32>, EvalError> {
        match self {
            ModelOutput::Tensor(tensor) => Ok(tensor),
            ModelOutput::Dict(_) => Err(EvalError::NotATensor(what.to_string())),
        }
    }

    /// Classification logits: the tensor itself, or the `logits` entry of a dict.
    pub fn logits(&self) -> Result<&ArrayD<f32>, EvalError> {
        match self {
            ModelOutput::Tensor(tensor) => Ok(tensor),
            ModelOutput::Dict(_) => self.get("logits")?.as_tensor("logits"),
        }
    }

    /// The `features` entry of a dict output.
    pub fn features(&self) -> Result<&ArrayD<f32>, EvalError> {
        self.get("features")?.as_tensor("features")
    }

    /// Retrieval embeddings: the tensor itself, or the `features` entry of a dict.
    pub fn embeddings(&self) -> Result<&ArrayD<f32>, EvalError> {
        match self {
            ModelOutput::Tensor(tensor) => Ok(tensor),
            ModelOutput::Dict(_) => self.features(),
        }
    }
}

impl From<ArrayD<f32>> for ModelOutput {
    fn from(tensor: ArrayD<f32>) -> Self {
        ModelOutput::Tensor(tensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_logits_from_tensor_and_dict() {
        let plain = ModelOutput::from(array![[1.0f32, 2.0]].into_dyn());
        assert_eq!(plain.logits().unwrap().shape(), &[1, 2]);

        let dict = ModelOutput::dict().with("logits", array![[0.5f32, 0.5, 0.0]].into_dyn());
        assert_eq!(dict.logits().unwrap().shape(), &[1, 3]);
    }

    #[test]
    fn test_features_requires_dict() {
        let plain = ModelOutput::from(array![[1.0f32, 2.0]].into_dyn());
        assert!(matches!(plain.features(), Err(EvalError::NotADict(_))));
        assert!(plain.embeddings().is_ok());

        let dict = ModelOutput::dict().with("logits", array![[1.0f32]].into_dyn());
        assert!(matches!(dict.features(), Err(EvalError::MissingOutput(_))));
    }

    #[test]
    fn test_nested_lookup() {
        let student = ModelOutput::dict().with("logits", array![[1.0f32, 0.0]].into_dyn());
        let output = ModelOutput::dict().with("Student", student);
        let inner = output.get("Student").unwrap();
        assert_eq!(inner.logits().unwrap().shape(), &[1, 2]);
        assert!(matches!(
            output.get("Student").unwrap().get("logits").unwrap().get("x"),
            Err(EvalError::NotADict(_))
        ));
    }

    #[test]
    fn test_dict_keeps_insertion_order() {
        let output = ModelOutput::dict()
            .with("features", array![[1.0f32]].into_dyn())
            .with("logits", array![[2.0f32]].into_dyn())
            .with("features", array![[3.0f32]].into_dyn());
        assert_eq!(output.keys(), vec!["features", "logits"]);
        assert_eq!(output.features().unwrap()[[0, 0]], 3.0);
    }

    #[test]
    fn test_with_on_tensor_keeps_it_as_logits() {
        let output = ModelOutput::from(array![[0.2f32, 0.8]].into_dyn())
            .with("features", array![[1.0f32, 0.0]].into_dyn());
        assert_eq!(output.keys(), vec!["logits", "features"]);
        assert_eq!(output.logits().unwrap()[[0, 1]], 0.8);
    }
}
