// --- Файл: src/metrics/retrieval.rs ---

//! Combined retrieval evaluation: Recall@k, mAP and mINP from one ranking.
//!
//! `Recallk`, `mAP` and `mINP` entries of a metric section are never built on
//! their own. Their parameters are collected into a [`RetrievalConfig`] and
//! turned into a single [`RetriMetric`], which computes the query / gallery
//! similarity once and derives every requested figure from the same ranking.

use super::Metric;
use crate::config::Params;
use crate::data::{class_indices, Batch, ModelOutput};
use crate::error::{ConfigError, EvalError};
use crate::scalar_map::ScalarMap;
use crate::tensor::{argsort_desc, l2_normalize, matrix};
use ndarray::Array2;

/// The three metric names routed into [`RetriMetric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetrievalKind {
    Recallk,
    MeanAp,
    MeanInp,
}

impl RetrievalKind {
    pub const ALL: [RetrievalKind; 3] = [
        RetrievalKind::Recallk,
        RetrievalKind::MeanAp,
        RetrievalKind::MeanInp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RetrievalKind::Recallk => "Recallk",
            RetrievalKind::MeanAp => "mAP",
            RetrievalKind::MeanInp => "mINP",
        }
    }

    /// `None` for names that are not reserved retrieval names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Parameters of the reserved retrieval entries, keyed by kind.
///
/// A kind that appears twice keeps its first position; the later
/// parameters replace the earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalConfig {
    entries: Vec<(RetrievalKind, Params)>,
}

impl RetrievalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores parameters for `kind`. Returns `true` if they replaced an
    /// earlier entry of the same kind.
    pub fn insert(&mut self, kind: RetrievalKind, params: Params) -> bool {
        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, slot)) => {
                *slot = params;
                true
            }
            None => {
                self.entries.push((kind, params));
                false
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, kind: RetrievalKind) -> bool {
        self.entries.iter().any(|(k, _)| *k == kind)
    }
}

/// Settings every retrieval entry may carry; they must agree when repeated.
#[derive(Debug, Default)]
struct SharedSettings {
    embedding_size: Option<(usize, RetrievalKind)>,
    max_rank: Option<(usize, RetrievalKind)>,
    feature_normalize: Option<(bool, RetrievalKind)>,
}

fn agree<T: PartialEq + Copy + std::fmt::Debug>(
    slot: &mut Option<(T, RetrievalKind)>,
    value: Option<T>,
    kind: RetrievalKind,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    match *slot {
        Some((existing, owner)) if existing != value => Err(ConfigError::construction(
            "RetriMetric",
            format!(
                "conflicting '{key}': {} sets {:?}, {} sets {:?}",
                owner.name(),
                existing,
                kind.name(),
                value
            ),
        )),
        Some(_) => Ok(()),
        None => {
            *slot = Some((value, kind));
            Ok(())
        }
    }
}

/// Relevance of one query's ranked gallery.
struct Ranking {
    /// Some unmasked gallery item shares the query's label, ranked or not.
    has_relevant: bool,
    /// Relevance flags in rank order, cut at `max_rank`.
    hits: Vec<bool>,
}

/// Joint Recall@k / mAP / mINP evaluator.
///
/// Queries are the batch embeddings (`features` of a dict output, or the
/// output tensor itself). The gallery is [`Batch::gallery`] when present.
/// Otherwise the batch is ranked against itself with each query's own row
/// removed from its ranking.
///
/// Similarity is the dot product of (by default L2-normalised) embeddings.
/// Queries without any relevant gallery item are left out of every figure.
/// A query whose relevant items all rank past `max_rank` still counts, with
/// recall, AP and INP of `0`. When no query has a relevant item, every
/// figure is `0`.
///
/// Output keys, in order: `recall{k}` for each configured `k` (if `Recallk`
/// was configured), `mAP`, `mINP`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetriMetric {
    recall_topk: Option<Vec<usize>>,
    mean_ap: bool,
    mean_inp: bool,
    embedding_size: Option<usize>,
    max_rank: Option<usize>,
    feature_normalize: bool,
}

impl RetriMetric {
    pub fn from_config(config: RetrievalConfig) -> Result<Self, ConfigError> {
        if config.is_empty() {
            return Err(ConfigError::construction(
                "RetriMetric",
                "at least one of Recallk, mAP or mINP must be configured",
            ));
        }

        let mut shared = SharedSettings::default();
        let mut recall_topk = None;

        for (kind, mut params) in config.entries.iter().cloned() {
            agree(
                &mut shared.embedding_size,
                params.take_usize("embedding_size")?,
                kind,
                "embedding_size",
            )?;
            agree(&mut shared.max_rank, params.take_usize("max_rank")?, kind, "max_rank")?;
            agree(
                &mut shared.feature_normalize,
                params.take_bool("feature_normalize")?,
                kind,
                "feature_normalize",
            )?;

            if kind == RetrievalKind::Recallk {
                let topk = params.take_usize_list("topk")?.unwrap_or_else(|| vec![1, 5]);
                if topk.is_empty() || topk.contains(&0) {
                    return Err(ConfigError::construction(
                        "Recallk",
                        format!("topk must be a non-empty list of positive integers, got {topk:?}"),
                    ));
                }
                recall_topk = Some(topk);
            }
            params.finish()?;
        }

        let max_rank = shared.max_rank.map(|(v, _)| v);
        if max_rank == Some(0) {
            return Err(ConfigError::construction("RetriMetric", "max_rank must be positive"));
        }
        if let (Some(limit), Some(topk)) = (max_rank, &recall_topk) {
            if let Some(k) = topk.iter().find(|&&k| k > limit) {
                return Err(ConfigError::construction(
                    "RetriMetric",
                    format!("Recallk k = {k} exceeds max_rank {limit}"),
                ));
            }
        }

        Ok(Self {
            recall_topk,
            mean_ap: config.contains(RetrievalKind::MeanAp),
            mean_inp: config.contains(RetrievalKind::MeanInp),
            embedding_size: shared.embedding_size.map(|(v, _)| v),
            max_rank,
            feature_normalize: shared.feature_normalize.map_or(true, |(v, _)| v),
        })
    }

    fn check_dim(&self, rows: &Array2<f32>, what: &str) -> Result<(), EvalError> {
        match self.embedding_size {
            Some(expected) if rows.ncols() != expected => Err(EvalError::shape(
                "RetriMetric",
                format!("{what} embeddings have size {}, expected {expected}", rows.ncols()),
            )),
            _ => Ok(()),
        }
    }

    fn prepare(&self, m: ndarray::ArrayView2<f32>) -> Array2<f32> {
        if self.feature_normalize {
            l2_normalize(&m, 1e-12)
        } else {
            m.to_owned()
        }
    }

    /// Per query: whether any unmasked gallery item is relevant, and the
    /// relevance flags of its ranking cut at `max_rank`.
    fn rankings(&self, output: &ModelOutput, batch: &Batch) -> Result<Vec<Ranking>, EvalError> {
        let queries = self.prepare(matrix(output.embeddings()?, "RetriMetric query")?);
        let query_labels = class_indices(&batch.labels, None)?;
        if query_labels.len() != queries.nrows() {
            return Err(EvalError::shape(
                "RetriMetric",
                format!("{} labels for {} queries", query_labels.len(), queries.nrows()),
            ));
        }

        let (gallery, gallery_labels, exclude_self) = match &batch.gallery {
            Some(g) => {
                let features = self.prepare(matrix(&g.features, "RetriMetric gallery")?);
                let labels = class_indices(&g.labels, None)?;
                if labels.len() != features.nrows() {
                    return Err(EvalError::shape(
                        "RetriMetric",
                        format!("{} gallery labels for {} items", labels.len(), features.nrows()),
                    ));
                }
                (features, labels, false)
            }
            None => (queries.clone(), query_labels.clone(), true),
        };

        self.check_dim(&queries, "query")?;
        self.check_dim(&gallery, "gallery")?;
        if queries.ncols() != gallery.ncols() {
            return Err(EvalError::shape(
                "RetriMetric",
                format!(
                    "query size {} does not match gallery size {}",
                    queries.ncols(),
                    gallery.ncols()
                ),
            ));
        }

        let similarity = queries.dot(&gallery.t());
        let limit = self.max_rank.unwrap_or(usize::MAX);

        Ok(similarity
            .outer_iter()
            .enumerate()
            .map(|(q, row)| {
                let flags: Vec<bool> = argsort_desc(row)
                    .into_iter()
                    .filter(|&g| !(exclude_self && g == q))
                    .map(|g| gallery_labels[g] == query_labels[q])
                    .collect();
                let has_relevant = flags.iter().any(|&hit| hit);
                let mut hits = flags;
                hits.truncate(limit);
                Ranking { has_relevant, hits }
            })
            .collect())
    }
}

impl Metric for RetriMetric {
    fn name(&self) -> &str {
        "RetriMetric"
    }

    fn evaluate(&self, output: &ModelOutput, batch: &Batch) -> Result<ScalarMap, EvalError> {
        let rankings = self.rankings(output, batch)?;
        let relevant: Vec<&Vec<bool>> = rankings
            .iter()
            .filter(|ranking| ranking.has_relevant)
            .map(|ranking| &ranking.hits)
            .collect();
        let num_valid = relevant.len() as f32;
        let average = |total: f32| if num_valid > 0.0 { total / num_valid } else { 0.0 };

        let mut result = ScalarMap::new();

        if let Some(topk) = &self.recall_topk {
            let first_hits: Vec<usize> = relevant
                .iter()
                .filter_map(|flags| flags.iter().position(|&hit| hit))
                .collect();
            for &k in topk {
                let hits = first_hits.iter().filter(|&&pos| pos < k).count();
                result.insert(format!("recall{k}"), average(hits as f32));
            }
        }

        if self.mean_ap {
            let total: f32 = relevant
                .iter()
                .map(|flags| {
                    let mut found = 0usize;
                    let mut precision_sum = 0.0f32;
                    for (pos, &hit) in flags.iter().enumerate() {
                        if hit {
                            found += 1;
                            precision_sum += found as f32 / (pos + 1) as f32;
                        }
                    }
                    if found == 0 {
                        0.0
                    } else {
                        precision_sum / found as f32
                    }
                })
                .sum();
            result.insert("mAP", average(total));
        }

        if self.mean_inp {
            let total: f32 = relevant
                .iter()
                .map(|flags| {
                    let found = flags.iter().filter(|&&hit| hit).count();
                    match flags.iter().rposition(|&hit| hit) {
                        Some(hardest) => found as f32 / (hardest + 1) as f32,
                        None => 0.0,
                    }
                })
                .sum();
            result.insert("mINP", average(total));
        }

        Ok(result)
    }
}
