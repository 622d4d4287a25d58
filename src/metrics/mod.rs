// --- Файл: src/metrics/mod.rs ---

//! Evaluation metrics built from configuration.
//!
//! A metric section is a list of single-key entries. Classification metrics
//! are built one evaluator per entry. The retrieval names (`Recallk`, `mAP`,
//! `mINP`) are gathered into a single [`RetriMetric`] that is appended after
//! all other evaluators.
//!
//! # Example
//!
//! ```rust,ignore
//! use rustycls::metrics::build_metrics;
//! use serde_json::json;
//!
//! let metrics = build_metrics(&[
//!     json!({"TopkAcc": {"topk": [1, 5]}}),
//!     json!({"Recallk": {"topk": [1]}}),
//!     json!({"mAP": {}}),
//! ])?;
//! assert_eq!(metrics.names(), vec!["TopkAcc", "RetriMetric"]);
//! let results = metrics.evaluate(&output, &batch)?;
//! ```

pub mod combined;
pub mod registry;
pub mod retrieval;
pub mod running;
pub mod topk;

use crate::data::{Batch, ModelOutput};
use crate::error::EvalError;
use crate::scalar_map::ScalarMap;
use std::fmt::Debug;

pub use combined::{build_metrics, CombinedMetrics};
pub use registry::MetricKind;
pub use retrieval::{RetriMetric, RetrievalConfig, RetrievalKind};
pub use running::{AverageMeter, TrainingMonitor};
pub use topk::{DistillationTopkAcc, TopkAcc};

/// A batch-level evaluator producing named scalar results.
pub trait Metric: Debug + Send + Sync {
    /// Evaluator name, used for display and logging.
    fn name(&self) -> &str;

    /// Scores one batch. Evaluators hold no state between calls.
    fn evaluate(&self, output: &ModelOutput, batch: &Batch) -> Result<ScalarMap, EvalError>;
}
