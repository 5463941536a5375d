use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

use super::{Title, TitleId, TitleType, UserId};
use crate::error::AppError;

/// Recommendation method requested by the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Hybrid,
    Content,
    Collaborative,
}

impl FromStr for Method {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hybrid" => Ok(Method::Hybrid),
            "content" => Ok(Method::Content),
            "collaborative" => Ok(Method::Collaborative),
            other => Err(AppError::InvalidRequest(format!(
                "Unknown method '{}': expected hybrid, content or collaborative",
                other
            ))),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Hybrid => write!(f, "hybrid"),
            Method::Content => write!(f, "content"),
            Method::Collaborative => write!(f, "collaborative"),
        }
    }
}

/// Which signal produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Content,
    Collaborative,
}

/// A title with a score from a single method, ordered best-first by [`rank`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredTitle {
    pub title_id: TitleId,
    pub score: f64,
}

fn best_first(a: &ScoredTitle, b: &ScoredTitle) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.title_id.cmp(&b.title_id))
}

/// Sorts descending by score, ties broken by ascending title id
pub fn rank(items: &mut [ScoredTitle]) {
    items.sort_by(best_first);
}

/// Best `k` entries in [`rank`] order, without sorting the whole input
pub fn top_k(mut items: Vec<ScoredTitle>, k: usize) -> Vec<ScoredTitle> {
    if k == 0 {
        return Vec::new();
    }
    if items.len() > k {
        items.select_nth_unstable_by(k - 1, best_first);
        items.truncate(k);
    }
    rank(&mut items);
    items
}

/// Per-request candidate, discarded after fusion
///
/// The source is implied by which list the candidate is handed to `fuse` in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub title_id: TitleId,
    pub raw_score: f64,
}

impl Candidate {
    pub fn from_scored(scored: &[ScoredTitle]) -> Vec<Candidate> {
        scored
            .iter()
            .map(|s| Candidate {
                title_id: s.title_id,
                raw_score: s.score,
            })
            .collect()
    }
}

/// Raw and normalized score contributed by one source
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SourceScore {
    pub raw: f64,
    pub normalized: f64,
}

/// Explains a fused score; a field is null when that source had no signal for the title
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub content: Option<SourceScore>,
    pub collaborative: Option<SourceScore>,
}

/// A fused, ranked entry before catalog metadata is attached
#[derive(Debug, Clone, PartialEq)]
pub struct FusedScore {
    pub title_id: TitleId,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// One entry in a recommendation response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationItem {
    pub title_id: TitleId,
    pub name: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// What the recommendation was computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Query {
    #[serde(rename = "title_id")]
    Title(TitleId),
    #[serde(rename = "user_id")]
    User(UserId),
}

/// Why a valid result came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// Neither source produced any candidate
    NoCandidates,
    /// Candidates existed but every one was removed by filters
    FilteredOut,
}

/// Ranked recommendation list: sorted by score descending, at most k entries,
/// no duplicates, never the query title itself
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResult {
    pub query: Query,
    pub method: Method,
    pub items: Vec<RecommendationItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<EmptyReason>,
}

/// Optional post-filters, applied before truncation to k
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecommendationFilters {
    /// Keep titles having at least one of these genres
    pub genres: Vec<String>,
    pub title_type: Option<TitleType>,
    pub language: Option<String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    /// Overrides the configured already-watched exclusion for this request
    pub exclude_seen: Option<bool>,
}

impl RecommendationFilters {
    /// Returns true if the title passes every metadata filter
    pub fn matches(&self, title: &Title) -> bool {
        if !self.genres.is_empty() && !title.has_any_genre(&self.genres) {
            return false;
        }
        if let Some(title_type) = self.title_type {
            if title.title_type != title_type {
                return false;
            }
        }
        if let Some(language) = &self.language {
            if !title.language.eq_ignore_ascii_case(language) {
                return false;
            }
        }
        if self.min_year.is_some() || self.max_year.is_some() {
            let Some(year) = title.release_year else {
                return false;
            };
            if self.min_year.is_some_and(|min| year < min) {
                return false;
            }
            if self.max_year.is_some_and(|max| year > max) {
                return false;
            }
        }
        true
    }
}

/// Incoming recommendation request; exactly one of `title_id` / `user_id` must be set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationRequest {
    pub title_id: Option<TitleId>,
    pub user_id: Option<UserId>,
    pub method: Option<String>,
    pub k: Option<usize>,
    #[serde(default)]
    pub filters: RecommendationFilters,
}

impl RecommendationRequest {
    pub fn for_title(title_id: TitleId) -> Self {
        Self {
            title_id: Some(title_id),
            ..Self::default()
        }
    }

    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn with_filters(mut self, filters: RecommendationFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Resolves the query target, rejecting requests that name zero or two targets
    pub fn query(&self) -> Result<Query, AppError> {
        match (self.title_id, self.user_id) {
            (Some(title_id), None) => Ok(Query::Title(title_id)),
            (None, Some(user_id)) => Ok(Query::User(user_id)),
            (Some(_), Some(_)) => Err(AppError::InvalidRequest(
                "Provide either title_id or user_id, not both".to_string(),
            )),
            (None, None) => Err(AppError::InvalidRequest(
                "Provide a title_id or a user_id".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_title(id: u64, year: Option<i32>) -> Title {
        Title {
            id: TitleId(id),
            name: format!("Title {}", id),
            title_type: TitleType::Movie,
            language: "English".to_string(),
            release_year: year,
            genres: vec!["Drama".to_string()],
            popularity: 0.5,
        }
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("hybrid".parse::<Method>().unwrap(), Method::Hybrid);
        assert_eq!(" Content ".parse::<Method>().unwrap(), Method::Content);
        assert_eq!(
            "COLLABORATIVE".parse::<Method>().unwrap(),
            Method::Collaborative
        );
        assert!(matches!(
            "popularity".parse::<Method>(),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_rank_orders_by_score_then_id() {
        let mut items = vec![
            ScoredTitle { title_id: TitleId(5), score: 0.5 },
            ScoredTitle { title_id: TitleId(2), score: 0.9 },
            ScoredTitle { title_id: TitleId(3), score: 0.5 },
            ScoredTitle { title_id: TitleId(1), score: 0.1 },
        ];
        rank(&mut items);

        let ids: Vec<u64> = items.iter().map(|s| s.title_id.0).collect();
        assert_eq!(ids, vec![2, 3, 5, 1]);
    }

    #[test]
    fn test_top_k_matches_full_rank() {
        let items: Vec<ScoredTitle> = (0..20u64)
            .map(|i| ScoredTitle {
                title_id: TitleId(i),
                score: ((i * 7) % 5) as f64,
            })
            .collect();

        let mut expected = items.clone();
        rank(&mut expected);
        expected.truncate(6);

        assert_eq!(top_k(items.clone(), 6), expected);
        assert!(top_k(items.clone(), 0).is_empty());
        assert_eq!(top_k(items, 100).len(), 20);
    }

    #[test]
    fn test_query_requires_exactly_one_target() {
        assert_eq!(
            RecommendationRequest::for_title(TitleId(1)).query().unwrap(),
            Query::Title(TitleId(1))
        );
        assert_eq!(
            RecommendationRequest::for_user(UserId(9)).query().unwrap(),
            Query::User(UserId(9))
        );

        let both = RecommendationRequest {
            title_id: Some(TitleId(1)),
            user_id: Some(UserId(9)),
            ..RecommendationRequest::default()
        };
        assert!(matches!(both.query(), Err(AppError::InvalidRequest(_))));
        assert!(matches!(
            RecommendationRequest::default().query(),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_filters_year_range() {
        let filters = RecommendationFilters {
            min_year: Some(2000),
            max_year: Some(2010),
            ..RecommendationFilters::default()
        };
        assert!(filters.matches(&create_title(1, Some(2005))));
        assert!(!filters.matches(&create_title(2, Some(1999))));
        assert!(!filters.matches(&create_title(3, Some(2011))));
        assert!(!filters.matches(&create_title(4, None)));
    }

    #[test]
    fn test_filters_type_language_genre() {
        let title = create_title(1, Some(2020));
        let default = RecommendationFilters::default();
        assert!(default.matches(&title));

        let series_only = RecommendationFilters {
            title_type: Some(TitleType::Series),
            ..RecommendationFilters::default()
        };
        assert!(!series_only.matches(&title));

        let english = RecommendationFilters {
            language: Some("english".to_string()),
            genres: vec!["drama".to_string()],
            ..RecommendationFilters::default()
        };
        assert!(english.matches(&title));
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{
            "title_id": 12,
            "method": "content",
            "k": 3,
            "filters": { "genres": ["Comedy"], "exclude_seen": false }
        }"#;

        let request: RecommendationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.title_id, Some(TitleId(12)));
        assert_eq!(request.user_id, None);
        assert_eq!(request.method.as_deref(), Some("content"));
        assert_eq!(request.k, Some(3));
        assert_eq!(request.filters.genres, vec!["Comedy".to_string()]);
        assert_eq!(request.filters.exclude_seen, Some(false));
    }

    #[test]
    fn test_result_serialization_omits_missing_reason() {
        let result = RecommendationResult {
            query: Query::Title(TitleId(1)),
            method: Method::Content,
            items: vec![],
            reason: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["query"]["title_id"], 1);
        assert_eq!(json["method"], "content");
        assert!(json.get("reason").is_none());

        let empty = RecommendationResult {
            reason: Some(EmptyReason::NoCandidates),
            ..result
        };
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json["reason"], "no_candidates");
    }
}
