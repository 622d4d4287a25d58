// --- Файл: src/losses/mod.rs ---

//! Loss kinds and the weighted composite built from configuration.
//!
//! # Available Loss Kinds
//!
//! - **CELoss**: softmax cross-entropy with optional label smoothing
//! - **TripletLoss** / **TripletLossV2**: batch-hard triplet loss
//! - **MSMLoss**: margin sample mining over a `P * K` batch
//! - **EmlLoss**: easy-positive / hard-negative surrogate
//! - **NpairsLoss**: N-pair softmax loss with L2 regularisation
//! - **TriHardLoss**: per-anchor hardest triplet over a `P * K` batch
//! - **CenterLoss**: distance to per-class centers
//!
//! Losses compute forward values only. Each one returns a [`ScalarMap`] with
//! one or more named components.

pub mod celoss;
pub mod centerloss;
pub mod combined;
pub mod emlloss;
pub mod mining;
pub mod msmloss;
pub mod npairsloss;
pub mod registry;
pub mod trihardloss;
pub mod triplet;

pub use celoss::CeLoss;
pub use centerloss::CenterLoss;
pub use combined::{build_loss, CombinedLoss, TOTAL_KEY};
pub use emlloss::EmlLoss;
pub use mining::GroupLayout;
pub use msmloss::MsmLoss;
pub use npairsloss::NpairsLoss;
pub use registry::LossKind;
pub use trihardloss::TriHardLoss;
pub use triplet::{TripletLoss, TripletLossV2};

use crate::data::{Batch, ModelOutput};
use crate::error::EvalError;
use crate::scalar_map::ScalarMap;
use std::fmt::Debug;

/// Common interface of every loss kind.
pub trait Loss: Debug + Send + Sync {
    /// Registry name of the loss kind.
    fn name(&self) -> &str;

    /// Computes the named loss components for one batch.
    fn evaluate(&self, output: &ModelOutput, batch: &Batch) -> Result<ScalarMap, EvalError>;
}
