// --- Файл: src/metrics/running.rs ---

//! Running averages of evaluation results across steps.
//!
//! [`TrainingMonitor`] accepts the [`ScalarMap`] produced by a loss or metric
//! evaluator at every step, keeps a count-weighted average per key and logs
//! each step through `tracing` with the step number supplied by the caller.

use crate::scalar_map::ScalarMap;
use std::collections::HashMap;
use std::fmt;

/// Last value and count-weighted running average of one scalar.
#[derive(Debug, Clone)]
pub struct AverageMeter {
    name: String,
    precision: usize,
    need_avg: bool,
    val: f64,
    sum: f64,
    count: usize,
}

impl AverageMeter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            precision: 5,
            need_avg: true,
            val: 0.0,
            sum: 0.0,
            count: 0,
        }
    }

    /// Digits after the decimal point in [`fmt::Display`] output.
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// When `false`, the meter reports its last value instead of the average.
    pub fn with_need_avg(mut self, need_avg: bool) -> Self {
        self.need_avg = need_avg;
        self
    }

    /// Records `value` as the mean over `n` samples.
    pub fn update(&mut self, value: f64, n: usize) {
        self.val = value;
        self.sum += value * n as f64;
        self.count += n;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn val(&self) -> f64 {
        self.val
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Running average; `0` before the first update.
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// The figure this meter reports: average or last value.
    pub fn value(&self) -> f64 {
        if self.need_avg {
            self.avg()
        } else {
            self.val
        }
    }

    pub fn reset(&mut self) {
        self.val = 0.0;
        self.sum = 0.0;
        self.count = 0;
    }
}

impl fmt::Display for AverageMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.*}", self.name, self.precision, self.value())
    }
}

/// Per-key meters for one epoch plus the history of finished epochs.
#[derive(Debug, Clone, Default)]
pub struct TrainingMonitor {
    meters: Vec<AverageMeter>,
    history: HashMap<String, Vec<f64>>,
    epoch: usize,
}

impl TrainingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn meter_mut(&mut self, name: &str) -> &mut AverageMeter {
        let index = match self.meters.iter().position(|m| m.name() == name) {
            Some(index) => index,
            None => {
                self.meters.push(AverageMeter::new(name));
                self.meters.len() - 1
            }
        };
        &mut self.meters[index]
    }

    /// Folds one step's results into the running averages.
    ///
    /// Every value is weighted by `batch_size`. Keys are kept in the order
    /// they were first seen.
    pub fn record(&mut self, step: usize, results: &ScalarMap, batch_size: usize) {
        for (name, value) in results.iter() {
            self.meter_mut(name).update(value as f64, batch_size);
        }
        tracing::info!(
            epoch = self.epoch,
            step,
            batch_size,
            "{}",
            Self::format_values(results)
        );
    }

    fn format_values(results: &ScalarMap) -> String {
        results
            .iter()
            .map(|(name, value)| format!("{name}: {value:.5}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn meter(&self, name: &str) -> Option<&AverageMeter> {
        self.meters.iter().find(|m| m.name() == name)
    }

    /// Current averages, in first-seen key order.
    pub fn averages(&self) -> ScalarMap {
        self.meters
            .iter()
            .map(|m| (m.name(), m.value() as f32))
            .collect()
    }

    /// `name: avg` pairs of the current epoch.
    pub fn summary(&self) -> String {
        self.meters
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Moves the current averages into the history and starts a new epoch.
    pub fn end_epoch(&mut self) {
        tracing::info!(epoch = self.epoch, "epoch finished: {}", self.summary());
        for meter in self.meters.drain(..) {
            self.history
                .entry(meter.name().to_string())
                .or_default()
                .push(meter.value());
        }
        self.epoch += 1;
    }

    /// Averages of `name` for every finished epoch that reported it.
    pub fn get_history(&self, name: &str) -> Option<&Vec<f64>> {
        self.history.get(name)
    }

    pub fn get_last(&self, name: &str) -> Option<f64> {
        self.history.get(name).and_then(|h| h.last().copied())
    }

    pub fn current_epoch(&self) -> usize {
        self.epoch
    }

    /// Drops the meters of the current epoch; history is kept.
    pub fn reset(&mut self) {
        self.meters.clear();
    }
}
