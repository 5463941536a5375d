use std::sync::Arc;

use crate::services::RecommendationService;

/// Shared application state
///
/// The recommendation service owns the model bundle; after the one-time load it is
/// only read, so handlers share it without locking.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<RecommendationService>,
}

impl AppState {
    pub fn new(recommender: RecommendationService) -> Self {
        Self {
            recommender: Arc::new(recommender),
        }
    }
}
