use serde::Deserialize;
use std::time::Duration;

use crate::models::Method;
use crate::services::{FusionWeights, IndexKind, RecommenderConfig, MAX_K};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the exported model artifacts
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,

    /// Method used when a request does not name one
    #[serde(default = "default_method")]
    pub default_method: Method,

    /// Weight of content similarity in hybrid scores
    #[serde(default = "default_weight_content")]
    pub weight_content: f64,

    /// Weight of collaborative affinity in hybrid scores
    #[serde(default = "default_weight_collaborative")]
    pub weight_collaborative: f64,

    /// Number of results when a request does not set k
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Never recommend titles already in the user's history
    #[serde(default = "default_exclude_seen")]
    pub exclude_seen: bool,

    /// Content similarity backend
    #[serde(default)]
    pub content_index: IndexKind,

    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,

    /// Load artifacts at startup instead of on the first request
    #[serde(default = "default_preload_artifacts")]
    pub preload_artifacts: bool,

    /// Seconds to wait after a failed artifact load before trying again
    #[serde(default = "default_load_retry_secs")]
    pub load_retry_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_artifacts_dir() -> String {
    "artifacts/sample".to_string()
}

fn default_method() -> Method {
    Method::Hybrid
}

fn default_weight_content() -> f64 {
    0.6
}

fn default_weight_collaborative() -> f64 {
    0.4
}

fn default_k() -> usize {
    10
}

fn default_exclude_seen() -> bool {
    true
}

fn default_candidate_multiplier() -> usize {
    2
}

fn default_preload_artifacts() -> bool {
    true
}

fn default_load_retry_secs() -> u64 {
    30
}

impl Config {
    pub fn load_retry_after(&self) -> Duration {
        Duration::from_secs(self.load_retry_secs)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Serving policy for the recommendation engine, validated
    pub fn recommender(&self) -> anyhow::Result<RecommenderConfig> {
        let weights = FusionWeights::new(self.weight_content, self.weight_collaborative)
            .map_err(|e| anyhow::anyhow!("Invalid fusion weights: {}", e))?;

        if self.default_k == 0 || self.default_k > MAX_K {
            anyhow::bail!("DEFAULT_K must be between 1 and {} (got {})", MAX_K, self.default_k);
        }
        if self.candidate_multiplier == 0 {
            anyhow::bail!("CANDIDATE_MULTIPLIER must be positive");
        }

        Ok(RecommenderConfig {
            default_method: self.default_method,
            weights,
            default_k: self.default_k,
            exclude_seen: self.exclude_seen,
            candidate_multiplier: self.candidate_multiplier,
        })
    }
}
