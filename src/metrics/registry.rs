// --- Файл: src/metrics/registry.rs ---

//! Name -> constructor table for stand-alone metric kinds.

use super::retrieval::RetrievalKind;
use super::{DistillationTopkAcc, Metric, TopkAcc};
use crate::config::Params;
use crate::error::ConfigError;

/// Metric kinds built as their own evaluator.
///
/// The retrieval names are not listed here; see [`RetrievalKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    TopkAcc,
    DistillationTopkAcc,
}

impl MetricKind {
    pub const ALL: [MetricKind; 2] = [MetricKind::TopkAcc, MetricKind::DistillationTopkAcc];

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::TopkAcc => "TopkAcc",
            MetricKind::DistillationTopkAcc => "DistillationTopkAcc",
        }
    }

    /// Every name a metric section may use, retrieval names included.
    pub fn known_names() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .map(|kind| kind.name())
            .chain(RetrievalKind::ALL.iter().map(|kind| kind.name()))
            .collect()
    }

    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| ConfigError::UnknownKind {
                category: "metric",
                name: name.to_string(),
                known: Self::known_names(),
            })
    }

    pub fn build(self, params: Params) -> Result<Box<dyn Metric>, ConfigError> {
        let metric: Box<dyn Metric> = match self {
            MetricKind::TopkAcc => Box::new(TopkAcc::from_params(params)?),
            MetricKind::DistillationTopkAcc => Box::new(DistillationTopkAcc::from_params(params)?),
        };
        Ok(metric)
    }
}
