//! Loading run configurations from disk and compiling their sections.

use rustycls::config::{ConfigLoader, Phase};
use rustycls::data::json::batch_from_json;
use rustycls::{ConfigError, Error};
use serde_json::json;
use std::fs;
use tempfile::tempdir;

const RUN_YAML: &str = r#"
Global:
  device: gpu
  epochs: 120
Loss:
  Train:
    - CELoss:
        weight: 1.0
        epsilon: 0.1
    - TripletLossV2:
        weight: 1.0
        margin: 0.5
  Eval:
    - CELoss:
        weight: 1.0
Metric:
  Train:
    - TopkAcc:
        topk: [1, 5]
  Eval:
    - Recallk:
        topk: [1, 5]
    - mAP: {}
    - mINP:
"#;

#[test]
fn yaml_file_compiles_every_section() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ResNet50.yaml");
    fs::write(&path, RUN_YAML).unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();

    let train_loss = config.build_loss(Phase::Train).unwrap().unwrap();
    assert_eq!(train_loss.names(), vec!["CELoss", "TripletLossV2"]);
    assert_eq!(train_loss.weights(), vec![1.0, 1.0]);

    let eval_loss = config.build_loss(Phase::Eval).unwrap().unwrap();
    assert_eq!(eval_loss.names(), vec!["CELoss"]);

    let train_metrics = config.build_metrics(Phase::Train).unwrap().unwrap();
    assert_eq!(train_metrics.names(), vec!["TopkAcc"]);

    let eval_metrics = config.build_metrics(Phase::Eval).unwrap().unwrap();
    assert_eq!(eval_metrics.names(), vec!["RetriMetric"]);
}

#[test]
fn json_file_is_supported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.json");
    let document = json!({
        "Loss": {"Train": [{"CELoss": {"weight": 1.0}}]}
    });
    fs::write(&path, document.to_string()).unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert!(config.build_loss(Phase::Train).unwrap().is_some());
    assert!(config.build_loss(Phase::Eval).unwrap().is_none());
    assert!(config.build_metrics(Phase::Eval).unwrap().is_none());
}

#[test]
fn unsupported_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.toml");
    fs::write(&path, "").unwrap();
    assert!(matches!(
        ConfigLoader::load_from_file(&path),
        Err(Error::UnsupportedFormat(_))
    ));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        ConfigLoader::load_from_file(&dir.path().join("absent.yaml")),
        Err(Error::Io(_))
    ));
}

#[test]
fn malformed_entry_reports_yaml_format_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(
        &path,
        "Loss:\n  Train:\n    - CELoss:\n        weight: 1.0\n      TripletLoss:\n        weight: 1.0\n",
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    let err = config.build_loss(Phase::Train).unwrap_err();
    assert!(matches!(err, ConfigError::Shape(_)));
    assert!(err.to_string().starts_with("yaml format error"));
}

#[test]
fn end_to_end_evaluation_from_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.yml");
    fs::write(&path, RUN_YAML).unwrap();
    let config = ConfigLoader::load_from_file(&path).unwrap();

    let (output, batch) = batch_from_json(&json!({
        "output": {
            "logits": [[0.0, 0.0], [0.0, 0.0]],
            "features": [[1.0, 0.0], [0.0, 1.0]]
        },
        "labels": [0, 1]
    }))
    .unwrap();

    let loss = config.build_loss(Phase::Eval).unwrap().unwrap();
    let result = loss.evaluate(&output, &batch).unwrap();
    assert!((result.get("loss").unwrap() - 2.0f32.ln()).abs() < 1e-5);
}
