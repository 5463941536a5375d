use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::artifacts::{
    InteractionRecord, Manifest, RawArtifacts, TitleRecord, INTERACTIONS, ITEM_FACTORS, MANIFEST,
    SUPPORTED_SCHEMA_VERSION, TITLES, USER_FACTORS,
};
use crate::error::ArtifactLoadError;
use crate::models::{
    CatalogAnalytics, Interaction, PopularityStats, Title, TitleId, TitleType, UserHistory, UserId,
    TOP_TITLES,
};
use crate::services::collaborative::CollaborativeModel;
use crate::services::content_index::{IndexKind, SimilarityIndex};
use crate::services::vector::l2_normalize;

/// Catalog metadata, content feature vectors and user histories
///
/// Titles are stored in ascending id order so position order is also tie-break order.
#[derive(Debug)]
pub struct FeatureStore {
    titles: Vec<Title>,
    positions: HashMap<TitleId, usize>,
    /// Unit-length content features, aligned with `titles`
    features: Vec<Vec<f32>>,
    histories: HashMap<UserId, UserHistory>,
    feature_dim: usize,
}

impl FeatureStore {
    /// Validates catalog rows against the manifest and indexes them
    pub fn build(
        manifest: &Manifest,
        mut records: Vec<TitleRecord>,
        interactions: Vec<InteractionRecord>,
    ) -> Result<Self, ArtifactLoadError> {
        records.sort_by_key(|r| r.id);

        let mut titles = Vec::with_capacity(records.len());
        let mut features = Vec::with_capacity(records.len());
        let mut positions = HashMap::with_capacity(records.len());

        for record in records {
            if record.features.len() != manifest.feature_dim {
                return Err(ArtifactLoadError::incompatible(
                    TITLES,
                    format!(
                        "title {} has {} features, manifest declares {}",
                        record.id,
                        record.features.len(),
                        manifest.feature_dim
                    ),
                ));
            }
            if record.features.iter().any(|x| !x.is_finite()) {
                return Err(ArtifactLoadError::incompatible(
                    TITLES,
                    format!("title {} has non-finite features", record.id),
                ));
            }
            if positions.insert(record.id, titles.len()).is_some() {
                return Err(ArtifactLoadError::incompatible(
                    TITLES,
                    format!("duplicate title id {}", record.id),
                ));
            }

            features.push(l2_normalize(&record.features));
            titles.push(Title {
                id: record.id,
                name: record.name,
                title_type: record.title_type,
                language: record.language,
                release_year: record.release_year,
                genres: record.genres,
                popularity: record.popularity,
            });
        }

        let mut histories: HashMap<UserId, UserHistory> = HashMap::new();
        let mut skipped = 0usize;
        for record in interactions {
            if !positions.contains_key(&record.title_id) {
                skipped += 1;
                continue;
            }
            histories.entry(record.user_id).or_default().record(Interaction {
                title_id: record.title_id,
                rating: record.rating,
            });
        }

        if skipped > 0 {
            tracing::warn!(
                artifact = INTERACTIONS,
                skipped,
                "Skipped interactions referencing unknown titles"
            );
        }

        Ok(Self {
            titles,
            positions,
            features,
            histories,
            feature_dim: manifest.feature_dim,
        })
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn titles(&self) -> &[Title] {
        &self.titles
    }

    pub fn title(&self, id: TitleId) -> Option<&Title> {
        self.position(id).map(|pos| &self.titles[pos])
    }

    pub fn contains(&self, id: TitleId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn position(&self, id: TitleId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn title_at(&self, position: usize) -> &Title {
        &self.titles[position]
    }

    /// Unit-length feature vector of the title at `position`
    pub fn features_at(&self, position: usize) -> &[f32] {
        &self.features[position]
    }

    pub fn history(&self, user_id: UserId) -> Option<&UserHistory> {
        self.histories.get(&user_id)
    }

    pub fn user_count(&self) -> usize {
        self.histories.len()
    }

    /// Case-insensitive name search. Prefix matches come first, then substring
    /// matches; each group in ascending id order.
    pub fn search_titles(&self, query: &str, limit: usize) -> Vec<Title> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut prefix = Vec::new();
        let mut substring = Vec::new();
        for title in &self.titles {
            let name = title.name.to_lowercase();
            if name.starts_with(&needle) {
                prefix.push(title);
            } else if name.contains(&needle) {
                substring.push(title);
            }
        }

        prefix
            .into_iter()
            .chain(substring)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Most popular titles, optionally restricted by type and language
    pub fn trending(
        &self,
        title_type: Option<TitleType>,
        language: Option<&str>,
        limit: usize,
    ) -> Vec<Title> {
        let mut matches: Vec<&Title> = self
            .titles
            .iter()
            .filter(|t| title_type.map_or(true, |tt| t.title_type == tt))
            .filter(|t| language.map_or(true, |l| t.language.eq_ignore_ascii_case(l)))
            .collect();

        matches.sort_by(|a, b| {
            b.popularity
                .total_cmp(&a.popularity)
                .then_with(|| a.id.cmp(&b.id))
        });

        matches.into_iter().take(limit).cloned().collect()
    }

    /// Catalog composition: counts by type, language and year plus popularity stats
    pub fn analytics(&self) -> CatalogAnalytics {
        let mut by_type = BTreeMap::new();
        let mut by_language = BTreeMap::new();
        let mut by_release_year = BTreeMap::new();

        for title in &self.titles {
            *by_type.entry(title.title_type).or_insert(0) += 1;
            *by_language.entry(title.language.clone()).or_insert(0) += 1;
            if let Some(year) = title.release_year {
                *by_release_year.entry(year).or_insert(0) += 1;
            }
        }

        let scores: Vec<f64> = self.titles.iter().map(|t| t.popularity).collect();

        CatalogAnalytics {
            total_titles: self.titles.len(),
            by_type,
            by_language,
            by_release_year,
            popularity: PopularityStats::from_scores(&scores),
            top_titles: self.trending(None, None, TOP_TITLES),
        }
    }
}

/// Everything the serving path needs, loaded as a unit and never mutated afterwards
pub struct ArtifactBundle {
    manifest: Manifest,
    catalog: Arc<FeatureStore>,
    content_index: Box<dyn SimilarityIndex>,
    collaborative: CollaborativeModel,
    loaded_at: DateTime<Utc>,
}

impl std::fmt::Debug for ArtifactBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactBundle")
            .field("manifest", &self.manifest)
            .field("titles", &self.catalog.len())
            .field("content_index", &self.content_index.name())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

impl ArtifactBundle {
    /// Validates raw artifacts and builds the in-memory indexes
    pub fn build(raw: RawArtifacts, index_kind: IndexKind) -> Result<Self, ArtifactLoadError> {
        let RawArtifacts {
            manifest,
            titles,
            item_factors,
            user_factors,
            interactions,
        } = raw;

        if manifest.schema_version != SUPPORTED_SCHEMA_VERSION {
            return Err(ArtifactLoadError::incompatible(
                MANIFEST,
                format!(
                    "schema version {} is not supported (expected {})",
                    manifest.schema_version, SUPPORTED_SCHEMA_VERSION
                ),
            ));
        }
        if manifest.feature_dim == 0 || manifest.factor_dim == 0 {
            return Err(ArtifactLoadError::incompatible(
                MANIFEST,
                "feature_dim and factor_dim must be positive",
            ));
        }

        let catalog = Arc::new(FeatureStore::build(&manifest, titles, interactions)?);

        let mut seen_items = HashSet::with_capacity(item_factors.len());
        for record in &item_factors {
            if !catalog.contains(record.title_id) {
                return Err(ArtifactLoadError::incompatible(
                    ITEM_FACTORS,
                    format!("factors for title {} which is not in the catalog", record.title_id),
                ));
            }
            check_factors(ITEM_FACTORS, &record.factors, manifest.factor_dim)?;
            if !seen_items.insert(record.title_id) {
                return Err(ArtifactLoadError::incompatible(
                    ITEM_FACTORS,
                    format!("duplicate factors for title {}", record.title_id),
                ));
            }
        }

        let mut seen_users = HashSet::with_capacity(user_factors.len());
        for record in &user_factors {
            check_factors(USER_FACTORS, &record.factors, manifest.factor_dim)?;
            if !seen_users.insert(record.user_id) {
                return Err(ArtifactLoadError::incompatible(
                    USER_FACTORS,
                    format!("duplicate factors for user {}", record.user_id),
                ));
            }
        }

        let content_index = index_kind.build(Arc::clone(&catalog));
        let collaborative =
            CollaborativeModel::new(item_factors, user_factors, Arc::clone(&catalog));

        Ok(Self {
            manifest,
            catalog,
            content_index,
            collaborative,
            loaded_at: Utc::now(),
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn catalog(&self) -> &FeatureStore {
        &self.catalog
    }

    pub fn content_index(&self) -> &dyn SimilarityIndex {
        self.content_index.as_ref()
    }

    pub fn collaborative(&self) -> &CollaborativeModel {
        &self.collaborative
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// A user is known if either an interaction history or latent factors exist
    pub fn knows_user(&self, user_id: UserId) -> bool {
        self.catalog.history(user_id).is_some() || self.collaborative.has_user(user_id)
    }
}

fn check_factors(artifact: &str, factors: &[f32], expected: usize) -> Result<(), ArtifactLoadError> {
    if factors.len() != expected {
        return Err(ArtifactLoadError::incompatible(
            artifact,
            format!(
                "factor vector has {} dimensions, manifest declares {}",
                factors.len(),
                expected
            ),
        ));
    }
    if factors.iter().any(|x| !x.is_finite()) {
        return Err(ArtifactLoadError::incompatible(
            artifact,
            "factor vector has non-finite values",
        ));
    }
    Ok(())
}
