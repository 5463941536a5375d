use serde::Deserialize;
use std::fmt::Display;
use std::sync::Arc;

use super::vector::{dot, l2_normalize};
use crate::error::{AppError, AppResult};
use crate::models::{top_k, ScoredTitle, TitleId};
use crate::store::FeatureStore;

/// Nearest-neighbor lookup over content feature vectors
///
/// Similarity is cosine between feature vectors. Results are exact, ordered by
/// similarity descending with ties broken by lower title id, and never contain
/// the query title. Titles for which `skip` returns true are dropped before the
/// top `k` are selected, so filtered lookups still fill `k` when enough titles pass.
pub trait SimilarityIndex: Send + Sync {
    /// Titles most similar to `title_id`
    fn similar_to(
        &self,
        title_id: TitleId,
        k: usize,
        skip: &dyn Fn(TitleId) -> bool,
    ) -> AppResult<Vec<ScoredTitle>>;

    /// Titles most similar to an arbitrary feature vector (e.g. a user taste profile)
    fn nearest(&self, query: &[f32], k: usize, skip: &dyn Fn(TitleId) -> bool) -> Vec<ScoredTitle>;

    /// Index name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Which content index backs the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Scan every title per query: no extra memory, O(n) per lookup
    #[default]
    Exhaustive,
    /// Dense pairwise matrix built at load: O(n²) memory, row lookup per query
    Precomputed,
}

impl IndexKind {
    pub fn build(self, catalog: Arc<FeatureStore>) -> Box<dyn SimilarityIndex> {
        match self {
            IndexKind::Exhaustive => Box::new(ExhaustiveIndex::new(catalog)),
            IndexKind::Precomputed => Box::new(PrecomputedIndex::new(catalog)),
        }
    }
}

impl Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Exhaustive => write!(f, "exhaustive"),
            IndexKind::Precomputed => write!(f, "precomputed"),
        }
    }
}

/// Scores every catalog title against a unit-length query vector
fn scan(
    catalog: &FeatureStore,
    unit_query: &[f32],
    skip: impl Fn(usize, TitleId) -> bool,
) -> Vec<ScoredTitle> {
    (0..catalog.len())
        .filter_map(|pos| {
            let id = catalog.title_at(pos).id;
            if skip(pos, id) {
                return None;
            }
            Some(ScoredTitle {
                title_id: id,
                score: dot(unit_query, catalog.features_at(pos)),
            })
        })
        .collect()
}

/// Brute-force cosine search over the feature store
pub struct ExhaustiveIndex {
    catalog: Arc<FeatureStore>,
}

impl ExhaustiveIndex {
    pub fn new(catalog: Arc<FeatureStore>) -> Self {
        Self { catalog }
    }
}

impl SimilarityIndex for ExhaustiveIndex {
    fn similar_to(
        &self,
        title_id: TitleId,
        k: usize,
        skip: &dyn Fn(TitleId) -> bool,
    ) -> AppResult<Vec<ScoredTitle>> {
        let position = self
            .catalog
            .position(title_id)
            .ok_or(AppError::UnknownTitle(title_id))?;

        let query = self.catalog.features_at(position);
        let scored = scan(&self.catalog, query, |pos, id| pos == position || skip(id));
        Ok(top_k(scored, k))
    }

    fn nearest(&self, query: &[f32], k: usize, skip: &dyn Fn(TitleId) -> bool) -> Vec<ScoredTitle> {
        let unit = l2_normalize(query);
        let scored = scan(&self.catalog, &unit, |_, id| skip(id));
        top_k(scored, k)
    }

    fn name(&self) -> &'static str {
        "exhaustive"
    }
}

/// Full pairwise similarity matrix, row-major and aligned with catalog positions
pub struct PrecomputedIndex {
    catalog: Arc<FeatureStore>,
    matrix: Vec<f32>,
}

impl PrecomputedIndex {
    pub fn new(catalog: Arc<FeatureStore>) -> Self {
        let n = catalog.len();
        let mut matrix = vec![0.0f32; n * n];

        for i in 0..n {
            matrix[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let sim = dot(catalog.features_at(i), catalog.features_at(j)) as f32;
                matrix[i * n + j] = sim;
                matrix[j * n + i] = sim;
            }
        }

        tracing::debug!(titles = n, cells = n * n, "Built pairwise similarity matrix");

        Self { catalog, matrix }
    }

    fn row(&self, position: usize) -> &[f32] {
        let n = self.catalog.len();
        &self.matrix[position * n..(position + 1) * n]
    }
}

impl SimilarityIndex for PrecomputedIndex {
    fn similar_to(
        &self,
        title_id: TitleId,
        k: usize,
        skip: &dyn Fn(TitleId) -> bool,
    ) -> AppResult<Vec<ScoredTitle>> {
        let position = self
            .catalog
            .position(title_id)
            .ok_or(AppError::UnknownTitle(title_id))?;

        let scored = self
            .row(position)
            .iter()
            .enumerate()
            .filter(|(pos, _)| *pos != position)
            .map(|(pos, sim)| ScoredTitle {
                title_id: self.catalog.title_at(pos).id,
                score: f64::from(*sim),
            })
            .filter(|scored| !skip(scored.title_id))
            .collect();

        Ok(top_k(scored, k))
    }

    fn nearest(&self, query: &[f32], k: usize, skip: &dyn Fn(TitleId) -> bool) -> Vec<ScoredTitle> {
        // Arbitrary vectors have no matrix row
        let unit = l2_normalize(query);
        let scored = scan(&self.catalog, &unit, |_, id| skip(id));
        top_k(scored, k)
    }

    fn name(&self) -> &'static str {
        "precomputed"
    }
}
