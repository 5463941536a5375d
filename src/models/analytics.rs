use serde::Serialize;
use std::collections::BTreeMap;

use super::{Title, TitleType};

/// Number of titles listed in `CatalogAnalytics::top_titles`
pub const TOP_TITLES: usize = 10;

/// Catalog composition for dashboards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogAnalytics {
    pub total_titles: usize,
    pub by_type: BTreeMap<TitleType, usize>,
    pub by_language: BTreeMap<String, usize>,
    /// Titles per release year; titles without a year are not counted
    pub by_release_year: BTreeMap<i32, usize>,
    /// None for an empty catalog
    pub popularity: Option<PopularityStats>,
    /// Most popular titles, ties by ascending id
    pub top_titles: Vec<Title>,
}

/// Summary statistics of catalog popularity scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopularityStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, 0 for a single title
    pub std_dev: f64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl PopularityStats {
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }

        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std_dev = if count > 1 {
            let squares: f64 = sorted.iter().map(|x| (x - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        Some(Self {
            count,
            mean,
            std_dev,
            min: sorted[0],
            p25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            p75: quantile(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }
}

/// Linearly interpolated quantile of a sorted, non-empty slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}
