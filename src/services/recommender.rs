use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::Cell;
use std::time::Instant;

use super::fusion::{fuse, FusionError, FusionWeights};
use crate::error::{AppError, AppResult};
use crate::models::{
    Candidate, CatalogAnalytics, EmptyReason, Method, Query, RecommendationItem,
    RecommendationRequest, RecommendationResult, ScoredTitle, Source, Title, TitleId, TitleType,
    UserHistory,
};
use crate::store::{ArtifactBundle, ModelStore};

/// Upper bound on `k` and on lookup limits; keeps per-request work bounded
pub const MAX_K: usize = 100;
/// Smallest candidate set requested from each source
const MIN_CANDIDATE_POOL: usize = 50;
const DEFAULT_SEARCH_LIMIT: usize = 10;
const MIN_SEARCH_LENGTH: usize = 2;

/// Serving policy for the recommendation engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommenderConfig {
    pub default_method: Method,
    pub weights: FusionWeights,
    pub default_k: usize,
    pub exclude_seen: bool,
    /// Each source contributes `k * candidate_multiplier` candidates before fusion
    pub candidate_multiplier: usize,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            default_method: Method::Hybrid,
            weights: FusionWeights::default(),
            default_k: 10,
            exclude_seen: true,
            candidate_multiplier: 2,
        }
    }
}

/// Entry point for the presentation layer
///
/// Validates requests, makes sure the model bundle is resident, gathers candidates
/// from the content index and the collaborative model and fuses them.
pub struct RecommendationService {
    store: ModelStore,
    config: RecommenderConfig,
}

impl RecommendationService {
    pub fn new(store: ModelStore, config: RecommenderConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// True once the artifact bundle is resident
    pub fn is_ready(&self) -> bool {
        self.store.is_loaded()
    }

    /// When the resident bundle was loaded, if it is resident
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.store.loaded().map(|bundle| bundle.loaded_at())
    }

    /// Loads the artifact bundle ahead of the first request
    pub async fn warm_up(&self) -> AppResult<()> {
        self.store.ensure_loaded().await?;
        Ok(())
    }

    /// Ranked recommendations for a title or a user
    pub async fn recommend(&self, request: &RecommendationRequest) -> AppResult<RecommendationResult> {
        let start = Instant::now();

        let query = request.query()?;
        let method = match request.method.as_deref() {
            Some(method) => method.parse::<Method>()?,
            None => self.config.default_method,
        };
        let k = request.k.unwrap_or(self.config.default_k);
        if k == 0 || k > MAX_K {
            return Err(AppError::InvalidRequest(format!(
                "k must be between 1 and {} (got {})",
                MAX_K, k
            )));
        }
        if let (Some(min), Some(max)) = (request.filters.min_year, request.filters.max_year) {
            if min > max {
                return Err(AppError::InvalidRequest(format!(
                    "min_year {} is after max_year {}",
                    min, max
                )));
            }
        }

        let bundle = self.store.ensure_loaded().await?;
        let catalog = bundle.catalog();

        let weights = self.config.weights.for_method(method);
        let exclude_seen = request
            .filters
            .exclude_seen
            .unwrap_or(self.config.exclude_seen);
        let pool = k
            .saturating_mul(self.config.candidate_multiplier)
            .max(MIN_CANDIDATE_POOL);

        let seen: Option<&UserHistory> = match query {
            Query::User(user_id) if exclude_seen => catalog.history(user_id),
            _ => None,
        };
        let keep = |id: TitleId| {
            query != Query::Title(id)
                && !seen.is_some_and(|h| h.has_seen(id))
                && catalog
                    .title(id)
                    .is_some_and(|title| request.filters.matches(title))
        };
        // Filters run inside candidate generation so they never eat into the pool
        let rejected = Cell::new(0usize);
        let skip = |id: TitleId| {
            let skipped = !keep(id);
            if skipped {
                rejected.set(rejected.get() + 1);
            }
            skipped
        };

        let (content, collaborative) = match query {
            Query::Title(title_id) => {
                if !catalog.contains(title_id) {
                    return Err(AppError::UnknownTitle(title_id));
                }

                let content = if weights.uses(Source::Content) {
                    bundle.content_index().similar_to(title_id, pool, &skip)?
                } else {
                    Vec::new()
                };
                let collaborative = if weights.uses(Source::Collaborative) {
                    or_cold_start(
                        bundle.collaborative().similar_items(title_id, pool, &skip),
                        Source::Collaborative,
                    )?
                } else {
                    Vec::new()
                };
                (content, collaborative)
            }
            Query::User(user_id) => {
                if !bundle.knows_user(user_id) {
                    return Err(AppError::UnknownUser(user_id));
                }

                let content = if weights.uses(Source::Content) {
                    profile_candidates(&bundle, catalog.history(user_id), pool, &skip)
                } else {
                    Vec::new()
                };
                let collaborative = if weights.uses(Source::Collaborative) {
                    or_cold_start(
                        bundle
                            .collaborative()
                            .affinities_for_user(user_id, pool, exclude_seen, &skip),
                        Source::Collaborative,
                    )?
                } else {
                    Vec::new()
                };
                (content, collaborative)
            }
        };

        let fused = fuse(
            &Candidate::from_scored(&content),
            &Candidate::from_scored(&collaborative),
            weights,
            k,
            &keep,
        );

        let (items, reason) = match fused {
            Ok(fused) => {
                let items: Vec<RecommendationItem> = fused
                    .into_iter()
                    .filter_map(|f| {
                        catalog.title(f.title_id).map(|title| RecommendationItem {
                            title_id: f.title_id,
                            name: title.name.clone(),
                            score: f.score,
                            breakdown: f.breakdown,
                        })
                    })
                    .collect();
                let reason = items.is_empty().then_some(EmptyReason::FilteredOut);
                (items, reason)
            }
            Err(FusionError::NoCandidates) if rejected.get() > 0 => {
                (Vec::new(), Some(EmptyReason::FilteredOut))
            }
            Err(FusionError::NoCandidates) => (Vec::new(), Some(EmptyReason::NoCandidates)),
        };

        tracing::info!(
            query = ?query,
            method = %method,
            k,
            content_candidates = content.len(),
            collaborative_candidates = collaborative.len(),
            filtered = rejected.get(),
            returned = items.len(),
            reason = ?reason,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Recommendations computed"
        );

        Ok(RecommendationResult {
            query,
            method,
            items,
            reason,
        })
    }

    /// Titles whose name matches `query`, for building a recommendation query
    pub async fn search_titles(&self, query: &str, limit: Option<usize>) -> AppResult<Vec<Title>> {
        if query.trim().chars().count() < MIN_SEARCH_LENGTH {
            return Err(AppError::InvalidRequest(format!(
                "Search term must be at least {} characters",
                MIN_SEARCH_LENGTH
            )));
        }
        let limit = bounded_limit(limit)?;

        let bundle = self.store.ensure_loaded().await?;
        Ok(bundle.catalog().search_titles(query, limit))
    }

    pub async fn title_details(&self, title_id: TitleId) -> AppResult<Title> {
        let bundle = self.store.ensure_loaded().await?;
        bundle
            .catalog()
            .title(title_id)
            .cloned()
            .ok_or(AppError::UnknownTitle(title_id))
    }

    /// Most popular titles, optionally restricted by type and language
    pub async fn trending(
        &self,
        title_type: Option<TitleType>,
        language: Option<&str>,
        limit: Option<usize>,
    ) -> AppResult<Vec<Title>> {
        let limit = bounded_limit(limit)?;
        let bundle = self.store.ensure_loaded().await?;
        Ok(bundle.catalog().trending(title_type, language, limit))
    }

    /// Catalog composition for the analytics dashboard
    pub async fn analytics(&self) -> AppResult<CatalogAnalytics> {
        let bundle = self.store.ensure_loaded().await?;
        Ok(bundle.catalog().analytics())
    }
}

fn bounded_limit(limit: Option<usize>) -> AppResult<usize> {
    match limit.unwrap_or(DEFAULT_SEARCH_LIMIT) {
        0 => Err(AppError::InvalidRequest("limit must be positive".to_string())),
        n => Ok(n.min(MAX_K)),
    }
}

/// Unknown identifiers in one source are a cold start, not a failed request
fn or_cold_start(result: AppResult<Vec<ScoredTitle>>, source: Source) -> AppResult<Vec<ScoredTitle>> {
    match result {
        Ok(scored) => Ok(scored),
        Err(e @ (AppError::UnknownTitle(_) | AppError::UnknownUser(_))) => {
            tracing::debug!(error = %e, source = ?source, "Cold start, no candidates from source");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Content candidates for a user: catalog titles closest to the rating-weighted
/// sum of the feature vectors the user has watched
fn profile_candidates(
    bundle: &ArtifactBundle,
    history: Option<&UserHistory>,
    pool: usize,
    skip: &dyn Fn(TitleId) -> bool,
) -> Vec<ScoredTitle> {
    let Some(history) = history.filter(|h| !h.is_empty()) else {
        return Vec::new();
    };

    let catalog = bundle.catalog();
    let mut profile = vec![0.0f32; catalog.feature_dim()];
    let mut total_weight = 0.0f32;

    for interaction in history.interactions() {
        let Some(position) = catalog.position(interaction.title_id) else {
            continue;
        };
        let weight = interaction.weight();
        if weight <= 0.0 {
            continue;
        }
        for (p, x) in profile.iter_mut().zip(catalog.features_at(position)) {
            *p += weight * x;
        }
        total_weight += weight;
    }

    if total_weight <= 0.0 {
        return Vec::new();
    }

    bundle.content_index().nearest(&profile, pool, skip)
}
