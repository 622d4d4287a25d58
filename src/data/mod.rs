//! # Batch Data Module
//!
//! What a loss or metric sees on every step: the model's forward output and
//! the batch's ground truth.
//!
//! - [`ModelOutput`]: a logits tensor, or a dict of named outputs
//! - [`Batch`]: class labels plus an optional retrieval [`Gallery`]
//! - [`json`]: reading both from JSON documents

pub mod batch;
pub mod json;
pub mod output;

pub use batch::{class_indices, Batch, Gallery};
pub use output::ModelOutput;
