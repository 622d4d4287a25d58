//! # rustycls: declarative losses and metrics for classification training
//!
//! **rustycls** compiles the `Loss` and `Metric` sections of a run
//! configuration into two evaluators. [`CombinedLoss`] computes a weighted
//! sum of named losses. [`CombinedMetrics`] runs an ordered list of metric
//! evaluators in which retrieval metrics share one ranking pass.
//!
//! ## Usage Example
//!
//! ```no_run
//! use rustycls::config::{ConfigLoader, Phase};
//! use rustycls::data::{Batch, ModelOutput};
//! use ndarray::array;
//! use std::path::Path;
//!
//! // 1. Load the run configuration
//! let config = ConfigLoader::load_from_file(Path::new("ResNet50.yaml"))?;
//!
//! // 2. Compile the training loss
//! let Some(loss) = config.build_loss(Phase::Train)? else {
//!     return Ok(());
//! };
//!
//! // 3. Evaluate it on a batch
//! let output = ModelOutput::from(array![[2.0f32, 0.1], [0.3, 1.5]].into_dyn());
//! let batch = Batch::from_indices(&[0, 1]);
//! let results = loss.evaluate(&output, &batch)?;
//! println!("total loss: {:?}", results.get("loss"));
//! # Ok::<(), rustycls::error::Error>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod losses;
pub mod metrics;
pub mod scalar_map;
pub mod tensor;

pub use config::{ConfigLoader, Params, Phase, RunConfig};
pub use data::{Batch, Gallery, ModelOutput};
pub use error::{ConfigError, Error, EvalError};
pub use losses::{build_loss, CombinedLoss, Loss};
pub use metrics::{build_metrics, CombinedMetrics, Metric, TrainingMonitor};
pub use scalar_map::ScalarMap;
