use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ArtifactLoadError;
use crate::models::{TitleId, TitleType, UserId};

/// Schema version this build knows how to serve
pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

pub const MANIFEST: &str = "manifest";
pub const TITLES: &str = "titles";
pub const ITEM_FACTORS: &str = "item_factors";
pub const USER_FACTORS: &str = "user_factors";
pub const INTERACTIONS: &str = "interactions";

/// Export metadata written by the offline training job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub schema_version: u32,
    /// Length of every content feature vector
    pub feature_dim: usize,
    /// Length of every latent factor vector (users and titles)
    pub factor_dim: usize,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
}

/// One catalog row: metadata plus content features
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitleRecord {
    pub id: TitleId,
    pub name: String,
    pub title_type: TitleType,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: f64,
    pub features: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemFactorRecord {
    pub title_id: TitleId,
    pub factors: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserFactorRecord {
    pub user_id: UserId,
    pub factors: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    pub user_id: UserId,
    pub title_id: TitleId,
    #[serde(default)]
    pub rating: Option<f32>,
}

/// Artifacts as deserialized, before validation and index construction
#[derive(Debug, Clone, PartialEq)]
pub struct RawArtifacts {
    pub manifest: Manifest,
    pub titles: Vec<TitleRecord>,
    pub item_factors: Vec<ItemFactorRecord>,
    pub user_factors: Vec<UserFactorRecord>,
    pub interactions: Vec<InteractionRecord>,
}

/// Where model artifacts come from
///
/// The file source is used in production; tests inject in-memory or mocked sources
/// so loading behavior can be exercised without touching disk.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Reads and deserializes every artifact
    async fn load(&self) -> Result<RawArtifacts, ArtifactLoadError>;

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Reads artifacts from a directory of JSON files exported by the training job
#[derive(Debug, Clone)]
pub struct FileArtifactSource {
    dir: PathBuf,
}

impl FileArtifactSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read_json<T: DeserializeOwned>(&self, artifact: &str) -> Result<T, ArtifactLoadError> {
        let path = self.dir.join(format!("{}.json", artifact));

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ArtifactLoadError::Missing {
                    artifact: artifact.to_string(),
                    path: path.display().to_string(),
                }
            } else {
                ArtifactLoadError::Io {
                    artifact: artifact.to_string(),
                    source: e,
                }
            }
        })?;

        tracing::debug!(artifact, bytes = bytes.len(), "Read artifact file");

        serde_json::from_slice(&bytes).map_err(|e| ArtifactLoadError::Corrupt {
            artifact: artifact.to_string(),
            source: e,
        })
    }
}

#[async_trait::async_trait]
impl ArtifactSource for FileArtifactSource {
    async fn load(&self) -> Result<RawArtifacts, ArtifactLoadError> {
        Ok(RawArtifacts {
            manifest: self.read_json(MANIFEST).await?,
            titles: self.read_json(TITLES).await?,
            item_factors: self.read_json(ITEM_FACTORS).await?,
            user_factors: self.read_json(USER_FACTORS).await?,
            interactions: self.read_json(INTERACTIONS).await?,
        })
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Serves a fixed set of artifacts already held in memory
#[derive(Debug, Clone)]
pub struct InMemorySource {
    artifacts: RawArtifacts,
}

impl InMemorySource {
    pub fn new(artifacts: RawArtifacts) -> Self {
        Self { artifacts }
    }
}

#[async_trait::async_trait]
impl ArtifactSource for InMemorySource {
    async fn load(&self) -> Result<RawArtifacts, ArtifactLoadError> {
        Ok(self.artifacts.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
