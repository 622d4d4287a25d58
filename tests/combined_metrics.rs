//! Integration tests for metric sections compiled from configuration.

use ndarray::array;
use rustycls::data::json::batch_from_json;
use rustycls::{build_metrics, Batch, ModelOutput};
use serde_json::json;

#[test]
fn topk_with_retrieval_metrics() {
    let metrics = build_metrics(&[
        json!({"TopkAcc": {"topk": [1, 5]}}),
        json!({"Recallk": {"topk": [1]}}),
        json!({"mAP": {}}),
    ])
    .unwrap();
    assert_eq!(metrics.names(), vec!["TopkAcc", "RetriMetric"]);

    let features = array![
        [1.0f32, 0.0, 0.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
        [0.9, 0.1, 0.0, 0.0, 0.0, 0.0],
        [0.1, 0.9, 0.0, 0.0, 0.0, 0.0],
    ]
    .into_dyn();
    let output = ModelOutput::dict()
        .with("logits", features.clone())
        .with("features", features);
    let batch = Batch::from_indices(&[0, 1, 0, 1]);

    let result = metrics.evaluate(&output, &batch).unwrap();
    let keys: Vec<&str> = result.keys().collect();
    assert_eq!(keys, vec!["top1", "top5", "recall1", "mAP"]);
    assert_eq!(result.get("top5"), Some(1.0));
    assert_eq!(result.get("recall1"), Some(1.0));
}

#[test]
fn retrieval_against_explicit_gallery() {
    let metrics = build_metrics(&[
        json!({"Recallk": {"topk": [1, 2]}}),
        json!({"mINP": {}}),
    ])
    .unwrap();
    assert_eq!(metrics.len(), 1);

    let document = json!({
        "output": {"features": [[1.0, 0.0], [0.0, 1.0]]},
        "labels": [0, 1],
        "gallery": {
            "features": [[0.0, 1.0], [1.0, 0.1], [0.1, 1.0]],
            "labels": [0, 0, 1]
        }
    });
    let (output, batch) = batch_from_json(&document).unwrap();
    let result = metrics.evaluate(&output, &batch).unwrap();

    // query 0 ranks [1, 2, 0]: hits at ranks 1 and 3
    // query 1 ranks [0, 2, 1]: hit at rank 2
    assert_eq!(result.get("recall1"), Some(0.5));
    assert_eq!(result.get("recall2"), Some(1.0));
    let expected_minp = (2.0 / 3.0 + 1.0 / 2.0) / 2.0;
    assert!((result.get("mINP").unwrap() - expected_minp).abs() < 1e-6);
}

#[test]
fn distillation_topk_reads_sub_model() {
    let metrics = build_metrics(&[json!({
        "DistillationTopkAcc": {"model_key": "Student", "topk": [1]}
    })])
    .unwrap();

    let document = json!({
        "output": {
            "Student": {"logits": [[0.2, 0.8], [0.9, 0.1]]},
            "Teacher": {"logits": [[0.9, 0.1], [0.9, 0.1]]}
        },
        "labels": [1, 0]
    });
    let (output, batch) = batch_from_json(&document).unwrap();
    let result = metrics.evaluate(&output, &batch).unwrap();
    assert_eq!(result.get("top1"), Some(1.0));
}

#[test]
fn conflicting_shared_settings_fail_construction() {
    let err = build_metrics(&[
        json!({"Recallk": {"topk": [1], "max_rank": 10}}),
        json!({"mAP": {"max_rank": 20}}),
    ]);
    assert!(err.is_err());
}

#[test]
fn null_parameters_are_empty() {
    let metrics = build_metrics(&[json!({"mAP": null})]).unwrap();
    assert_eq!(metrics.names(), vec!["RetriMetric"]);
}
