// --- Файл: src/losses/emlloss.rs ---

//! Easy-positive / hard-negative surrogate loss over a `P * K` batch.

use super::mining::{max_of, min_of, GroupLayout};
use super::Loss;
use crate::config::Params;
use crate::data::{Batch, ModelOutput};
use crate::error::{ConfigError, EvalError};
use crate::scalar_map::ScalarMap;
use crate::tensor::{matrix, pairwise_sq_distances};

const BETA: f64 = 100_000.0;
const THRESH: f64 = 20.0;

/// Smooth surrogate of `pos_max - neg_min` on squared distances.
///
/// For every anchor:
///
/// ```text
/// theta = mean(exp(pos - pos_max)) * mean(exp(neg_min - neg))
/// bias  = pos_max - neg_min
/// f(t)  = ln(1 + beta * theta * e^t) / ln(1 + beta)
/// g(t)  = (ln(theta) + t + ln(beta)) / ln(1 + beta)
/// loss  = f(min(bias, thresh)) + g(max(bias, thresh)) - f(thresh)
/// ```
///
/// `g` replaces `f` above `thresh` where `e^t` would overflow.
///
/// Output key: `emlloss`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmlLoss {
    layout: GroupLayout,
}

impl EmlLoss {
    pub fn new(layout: GroupLayout) -> Self {
        Self { layout }
    }

    pub fn from_params(mut params: Params) -> Result<Self, ConfigError> {
        let layout = GroupLayout::from_params(&mut params, 40)?;
        params.finish()?;
        Ok(Self::new(layout))
    }
}

fn surrogate(theta: f64, bias: f64) -> f64 {
    (1.0 + BETA * theta * bias.exp()).ln() / (1.0 + BETA).ln()
}

fn surrogate_approximate(theta: f64, bias: f64) -> f64 {
    (theta.ln() + bias + BETA.ln()) / (1.0 + BETA).ln()
}

fn surrogate_stable(theta: f64, bias: f64) -> f64 {
    let low = bias.min(THRESH);
    let high = bias.max(THRESH);
    surrogate(theta, low) + surrogate_approximate(theta, high) - surrogate(theta, THRESH)
}

impl Loss for EmlLoss {
    fn name(&self) -> &str {
        "EmlLoss"
    }

    fn evaluate(&self, output: &ModelOutput, _batch: &Batch) -> Result<ScalarMap, EvalError> {
        let features = matrix(output.features()?, "EmlLoss features")?;
        self.layout.check(features.nrows(), "EmlLoss")?;

        let dist = pairwise_sq_distances(&features);

        let total: f64 = (0..self.layout.batch_size)
            .map(|i| {
                let (pos, neg) = self.layout.split_row(&dist, i);
                let pos_max = max_of(&pos) as f64;
                let neg_min = min_of(&neg) as f64;

                let pos_mean = pos
                    .iter()
                    .map(|&d| (d as f64 - pos_max).exp())
                    .sum::<f64>()
                    / pos.len() as f64;
                let neg_mean = neg
                    .iter()
                    .map(|&d| (neg_min - d as f64).exp())
                    .sum::<f64>()
                    / neg.len() as f64;

                surrogate_stable(pos_mean * neg_mean, pos_max - neg_min)
            })
            .sum();
        let loss = (total / self.layout.batch_size as f64) as f32;

        Ok(ScalarMap::single("emlloss", loss))
    }
}
