pub mod analytics;
pub mod recommendation;
pub mod title;
pub mod user;

pub use analytics::{CatalogAnalytics, PopularityStats, TOP_TITLES};
pub use recommendation::{
    rank, top_k, Candidate, EmptyReason, FusedScore, Method, Query, RecommendationFilters,
    RecommendationItem, RecommendationRequest, RecommendationResult, ScoreBreakdown, ScoredTitle,
    Source, SourceScore,
};
pub use title::{Title, TitleId, TitleType};
pub use user::{Interaction, UserHistory, UserId};
