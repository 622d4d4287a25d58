// --- Файл: src/data/json.rs ---

//! Reading batches and model outputs from JSON documents.
//!
//! Tensors are written as nested arrays of numbers. A dict model output is
//! a JSON object whose values are tensors or further dicts:
//!
//! ```json
//! {
//!   "output": {"logits": [[2.0, 0.1], [0.3, 1.5]], "features": [[0.1, 0.9], [0.8, 0.2]]},
//!   "labels": [0, 1],
//!   "gallery": {"features": [[0.0, 1.0]], "labels": [1]}
//! }
//! ```

use super::{Batch, ModelOutput};
use crate::error::EvalError;
use ndarray::{ArrayD, IxDyn};
use serde_json::Value;

type Result<T> = std::result::Result<T, EvalError>;

/// Converts a nested numeric array into a tensor.
pub fn tensor_from_json(value: &Value) -> Result<ArrayD<f32>> {
    let mut shape = Vec::new();
    let mut probe = value;
    while let Value::Array(items) = probe {
        shape.push(items.len());
        match items.first() {
            Some(first) => probe = first,
            None => break,
        }
    }

    let mut data = Vec::with_capacity(shape.iter().product());
    flatten(value, 0, &shape, &mut data)?;
    ArrayD::from_shape_vec(IxDyn(&shape), data)
        .map_err(|e| EvalError::shape("json tensor", e.to_string()))
}

fn flatten(value: &Value, depth: usize, shape: &[usize], out: &mut Vec<f32>) -> Result<()> {
    match value {
        Value::Array(items) => {
            if depth >= shape.len() || items.len() != shape[depth] {
                return Err(EvalError::shape("json tensor", "ragged nested array"));
            }
            items
                .iter()
                .try_for_each(|item| flatten(item, depth + 1, shape, out))
        }
        Value::Number(n) if depth == shape.len() => {
            out.push(n.as_f64().unwrap_or(f64::NAN) as f32);
            Ok(())
        }
        Value::Number(_) => Err(EvalError::shape("json tensor", "ragged nested array")),
        other => Err(EvalError::invalid(
            "json tensor",
            format!("expected a number or an array, found {other}"),
        )),
    }
}

/// Converts a JSON tensor or object of tensors into a [`ModelOutput`].
pub fn output_from_json(value: &Value) -> Result<ModelOutput> {
    match value {
        Value::Object(map) => {
            let entries = map
                .iter()
                .map(|(key, inner)| Ok((key.clone(), output_from_json(inner)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(ModelOutput::Dict(entries))
        }
        other => tensor_from_json(other).map(ModelOutput::Tensor),
    }
}

/// Reads `{"output": .., "labels": .., "gallery"?: {..}}`.
pub fn batch_from_json(value: &Value) -> Result<(ModelOutput, Batch)> {
    let field = |name: &str| {
        value
            .get(name)
            .ok_or_else(|| EvalError::invalid("batch document", format!("missing '{name}'")))
    };

    let output = output_from_json(field("output")?)?;
    let mut batch = Batch::new(tensor_from_json(field("labels")?)?);

    if let Some(gallery) = value.get("gallery") {
        let features = gallery
            .get("features")
            .ok_or_else(|| EvalError::invalid("gallery", "missing 'features'"))?;
        let labels = gallery
            .get("labels")
            .ok_or_else(|| EvalError::invalid("gallery", "missing 'labels'"))?;
        batch = batch.with_gallery(tensor_from_json(features)?, tensor_from_json(labels)?);
    }

    Ok((output, batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tensor_from_nested_arrays() {
        let tensor = tensor_from_json(&json!([[1, 2, 3], [4, 5, 6]])).unwrap();
        assert_eq!(tensor.shape(), &[2, 3]);
        assert_eq!(tensor[[1, 2]], 6.0);
    }

    #[test]
    fn test_ragged_array_is_rejected() {
        assert!(tensor_from_json(&json!([[1, 2], [3]])).is_err());
        assert!(tensor_from_json(&json!([[1, 2], 3])).is_err());
        assert!(tensor_from_json(&json!(["a"])).is_err());
    }

    #[test]
    fn test_batch_document() {
        let doc = json!({
            "output": {"logits": [[2.0, 0.1]], "features": [[0.1, 0.9]]},
            "labels": [0],
            "gallery": {"features": [[0.0, 1.0], [1.0, 0.0]], "labels": [1, 0]}
        });
        let (output, batch) = batch_from_json(&doc).unwrap();
        assert_eq!(output.logits().unwrap().shape(), &[1, 2]);
        assert_eq!(output.keys(), vec!["logits", "features"]);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.gallery.unwrap().features.shape(), &[2, 2]);
    }

    #[test]
    fn test_missing_labels() {
        let doc = json!({"output": [[1.0]]});
        assert!(batch_from_json(&doc).is_err());
    }
}
