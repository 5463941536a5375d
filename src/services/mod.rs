pub mod collaborative;
pub mod content_index;
pub mod fusion;
pub mod recommender;
pub mod vector;

pub use collaborative::CollaborativeModel;
pub use content_index::{IndexKind, SimilarityIndex};
pub use fusion::{fuse, FusionError, FusionWeights};
pub use recommender::{RecommendationService, RecommenderConfig, MAX_K};
