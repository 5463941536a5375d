use std::collections::HashMap;
use std::sync::Arc;

use super::vector::{dot, l2_normalize};
use crate::error::{AppError, AppResult};
use crate::models::{top_k, ScoredTitle, TitleId, UserId};
use crate::store::artifacts::{ItemFactorRecord, UserFactorRecord};
use crate::store::FeatureStore;

/// Serves affinities from latent factors exported by the offline training job
///
/// User affinity is the raw inner product of user and title factors. Item-item
/// similarity is the cosine of title factors, so popular (large-norm) titles do
/// not dominate every neighbor list.
pub struct CollaborativeModel {
    catalog: Arc<FeatureStore>,
    /// Title ids in ascending order, aligned with the factor rows below
    item_ids: Vec<TitleId>,
    item_positions: HashMap<TitleId, usize>,
    item_factors: Vec<Vec<f32>>,
    item_units: Vec<Vec<f32>>,
    user_factors: HashMap<UserId, Vec<f32>>,
}

impl CollaborativeModel {
    /// Builds the model from validated factor records
    pub fn new(
        mut item_factors: Vec<ItemFactorRecord>,
        user_factors: Vec<UserFactorRecord>,
        catalog: Arc<FeatureStore>,
    ) -> Self {
        item_factors.sort_by_key(|r| r.title_id);

        let item_ids: Vec<TitleId> = item_factors.iter().map(|r| r.title_id).collect();
        let item_positions = item_ids
            .iter()
            .enumerate()
            .map(|(pos, id)| (*id, pos))
            .collect();
        let item_units = item_factors.iter().map(|r| l2_normalize(&r.factors)).collect();
        let item_factors = item_factors.into_iter().map(|r| r.factors).collect();
        let user_factors = user_factors
            .into_iter()
            .map(|r| (r.user_id, r.factors))
            .collect();

        Self {
            catalog,
            item_ids,
            item_positions,
            item_factors,
            item_units,
            user_factors,
        }
    }

    pub fn has_user(&self, user_id: UserId) -> bool {
        self.user_factors.contains_key(&user_id)
    }

    pub fn has_item(&self, title_id: TitleId) -> bool {
        self.item_positions.contains_key(&title_id)
    }

    pub fn user_count(&self) -> usize {
        self.user_factors.len()
    }

    pub fn item_count(&self) -> usize {
        self.item_ids.len()
    }

    /// Titles with the highest predicted affinity for `user_id`.
    ///
    /// With `exclude_seen`, titles in the user's interaction history are never returned.
    /// Titles matching `skip` are dropped before the top `k` are taken.
    pub fn affinities_for_user(
        &self,
        user_id: UserId,
        k: usize,
        exclude_seen: bool,
        skip: &dyn Fn(TitleId) -> bool,
    ) -> AppResult<Vec<ScoredTitle>> {
        let factors = self
            .user_factors
            .get(&user_id)
            .ok_or(AppError::UnknownUser(user_id))?;

        let history = self.catalog.history(user_id).filter(|_| exclude_seen);

        let scored = self
            .item_ids
            .iter()
            .zip(self.item_factors.iter())
            .filter(|(id, _)| !history.is_some_and(|h| h.has_seen(**id)) && !skip(**id))
            .map(|(id, item)| ScoredTitle {
                title_id: *id,
                score: dot(factors, item),
            })
            .collect();

        Ok(top_k(scored, k))
    }

    /// Titles whose latent factors are closest to those of `title_id`, excluding itself
    /// and any title matching `skip`
    pub fn similar_items(
        &self,
        title_id: TitleId,
        k: usize,
        skip: &dyn Fn(TitleId) -> bool,
    ) -> AppResult<Vec<ScoredTitle>> {
        let position = self
            .item_positions
            .get(&title_id)
            .copied()
            .ok_or(AppError::UnknownTitle(title_id))?;

        let query = &self.item_units[position];
        let scored = self
            .item_ids
            .iter()
            .zip(self.item_units.iter())
            .enumerate()
            .filter(|(pos, (id, _))| *pos != position && !skip(**id))
            .map(|(_, (id, unit))| ScoredTitle {
                title_id: *id,
                score: dot(query, unit),
            })
            .collect();

        Ok(top_k(scored, k))
    }
}
