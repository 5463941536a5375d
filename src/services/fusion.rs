use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::error::AppError;
use crate::models::{Candidate, FusedScore, Method, ScoreBreakdown, Source, SourceScore, TitleId};

/// Error types for score fusion
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FusionError {
    #[error("No candidates from either content or collaborative source")]
    NoCandidates,
}

/// Relative weight of each source in the fused score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FusionWeights {
    pub content: f64,
    pub collaborative: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            content: 0.6,
            collaborative: 0.4,
        }
    }
}

impl FusionWeights {
    /// Validates weights and rescales them to sum to 1
    pub fn new(content: f64, collaborative: f64) -> Result<Self, AppError> {
        if !content.is_finite() || !collaborative.is_finite() || content < 0.0 || collaborative < 0.0
        {
            return Err(AppError::InvalidRequest(format!(
                "Fusion weights must be finite and non-negative (got content={}, collaborative={})",
                content, collaborative
            )));
        }

        let sum = content + collaborative;
        if sum <= 0.0 {
            return Err(AppError::InvalidRequest(
                "At least one fusion weight must be positive".to_string(),
            ));
        }

        if (sum - 1.0).abs() > 1e-9 {
            tracing::warn!(content, collaborative, sum, "Fusion weights rescaled to sum to 1");
        }

        Ok(Self {
            content: content / sum,
            collaborative: collaborative / sum,
        })
    }

    pub fn content_only() -> Self {
        Self {
            content: 1.0,
            collaborative: 0.0,
        }
    }

    pub fn collaborative_only() -> Self {
        Self {
            content: 0.0,
            collaborative: 1.0,
        }
    }

    /// Weights for a method: single-source methods zero the other weight
    pub fn for_method(self, method: Method) -> Self {
        match method {
            Method::Hybrid => self,
            Method::Content => Self::content_only(),
            Method::Collaborative => Self::collaborative_only(),
        }
    }

    pub fn uses(&self, source: Source) -> bool {
        match source {
            Source::Content => self.content > 0.0,
            Source::Collaborative => self.collaborative > 0.0,
        }
    }
}

/// Min-max normalizes one source's raw scores into [0, 1].
///
/// Duplicate titles keep their highest raw score. When every candidate has the
/// same raw score they all normalize to 1.0.
pub fn normalize(candidates: &[Candidate]) -> HashMap<TitleId, SourceScore> {
    let mut best: HashMap<TitleId, f64> = HashMap::with_capacity(candidates.len());
    for candidate in candidates {
        best.entry(candidate.title_id)
            .and_modify(|raw| *raw = raw.max(candidate.raw_score))
            .or_insert(candidate.raw_score);
    }

    let min = best.values().copied().fold(f64::INFINITY, f64::min);
    let max = best.values().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    best.into_iter()
        .map(|(id, raw)| {
            let normalized = if range > f64::EPSILON {
                (raw - min) / range
            } else {
                1.0
            };
            (id, SourceScore { raw, normalized })
        })
        .collect()
}

/// Merges content and collaborative candidates into one ranked list.
///
/// Each source is normalized on its own, then titles are combined by weighted
/// sum. A title seen by only one source keeps that source's weighted score. If
/// one source is empty the other carries the full weight. Titles rejected by
/// `keep` are dropped before truncating to `k`.
pub fn fuse<F>(
    content: &[Candidate],
    collaborative: &[Candidate],
    weights: FusionWeights,
    k: usize,
    keep: F,
) -> Result<Vec<FusedScore>, FusionError>
where
    F: Fn(TitleId) -> bool,
{
    if content.is_empty() && collaborative.is_empty() {
        return Err(FusionError::NoCandidates);
    }

    let (w_content, w_collab) = if collaborative.is_empty() {
        (1.0, 0.0)
    } else if content.is_empty() {
        (0.0, 1.0)
    } else {
        (weights.content, weights.collaborative)
    };

    let mut breakdowns: HashMap<TitleId, ScoreBreakdown> = HashMap::new();
    for (id, score) in normalize(content) {
        breakdowns.entry(id).or_default().content = Some(score);
    }
    for (id, score) in normalize(collaborative) {
        breakdowns.entry(id).or_default().collaborative = Some(score);
    }

    let mut fused: Vec<FusedScore> = breakdowns
        .into_iter()
        .filter(|(id, _)| keep(*id))
        .map(|(title_id, breakdown)| {
            let score = breakdown.content.map_or(0.0, |s| w_content * s.normalized)
                + breakdown.collaborative.map_or(0.0, |s| w_collab * s.normalized);
            FusedScore {
                title_id,
                score,
                breakdown,
            }
        })
        .collect();

    fused.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.title_id.cmp(&b.title_id))
    });
    fused.truncate(k);

    Ok(fused)
}
