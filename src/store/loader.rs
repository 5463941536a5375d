use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

use super::artifacts::ArtifactSource;
use super::bundle::ArtifactBundle;
use crate::error::ArtifactLoadError;
use crate::services::content_index::IndexKind;

/// Owns the lazily loaded artifact bundle for the lifetime of the process
///
/// The first call to [`ModelStore::ensure_loaded`] reads the artifacts; concurrent
/// first callers wait on that single in-flight load and then share the same bundle.
///
/// A failed load leaves the store empty. For `retry_after` after a failure, callers
/// get [`ArtifactLoadError::CoolingDown`] without touching the source; the first
/// caller after that window starts a fresh attempt.
pub struct ModelStore {
    source: Arc<dyn ArtifactSource>,
    index_kind: IndexKind,
    bundle: OnceCell<Arc<ArtifactBundle>>,
    retry_after: Duration,
    last_failure: Mutex<Option<LoadFailure>>,
}

#[derive(Debug, Clone)]
struct LoadFailure {
    at: Instant,
    reason: String,
}

pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

impl ModelStore {
    pub fn new(source: Arc<dyn ArtifactSource>, index_kind: IndexKind) -> Self {
        Self {
            source,
            index_kind,
            bundle: OnceCell::new(),
            retry_after: DEFAULT_RETRY_AFTER,
            last_failure: Mutex::new(None),
        }
    }

    /// How long to refuse new load attempts after a failure
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Returns the resident bundle, loading it first if needed
    pub async fn ensure_loaded(&self) -> Result<Arc<ArtifactBundle>, ArtifactLoadError> {
        let bundle = self
            .bundle
            .get_or_try_init(|| async {
                // Callers queued behind a failed attempt land here too
                self.check_cooldown()?;
                self.load_bundle().await.map_err(|e| {
                    self.record_failure(&e);
                    e
                })
            })
            .await?;
        Ok(Arc::clone(bundle))
    }

    pub fn is_loaded(&self) -> bool {
        self.bundle.initialized()
    }

    /// The resident bundle, without triggering a load
    pub fn loaded(&self) -> Option<Arc<ArtifactBundle>> {
        self.bundle.get().cloned()
    }

    fn check_cooldown(&self) -> Result<(), ArtifactLoadError> {
        let last_failure = self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match last_failure.as_ref() {
            Some(failure) if failure.at.elapsed() < self.retry_after => {
                Err(ArtifactLoadError::CoolingDown {
                    reason: failure.reason.clone(),
                    retry_in: self.retry_after.saturating_sub(failure.at.elapsed()),
                })
            }
            _ => Ok(()),
        }
    }

    fn record_failure(&self, error: &ArtifactLoadError) {
        let mut last_failure = self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last_failure = Some(LoadFailure {
            at: Instant::now(),
            reason: error.to_string(),
        });
    }

    async fn load_bundle(&self) -> Result<Arc<ArtifactBundle>, ArtifactLoadError> {
        let start = Instant::now();
        tracing::info!(
            source = self.source.name(),
            index = %self.index_kind,
            "Loading model artifacts"
        );

        let raw = self.source.load().await.map_err(|e| {
            tracing::error!(error = %e, source = self.source.name(), "Artifact load failed");
            e
        })?;

        // Index construction is CPU-bound (quadratic for the precomputed index)
        let index_kind = self.index_kind;
        let bundle = tokio::task::spawn_blocking(move || ArtifactBundle::build(raw, index_kind))
            .await
            .map_err(|e| ArtifactLoadError::Interrupted(e.to_string()))?
            .map_err(|e| {
                tracing::error!(error = %e, "Artifact validation failed");
                e
            })?;

        tracing::info!(
            titles = bundle.catalog().len(),
            users_with_history = bundle.catalog().user_count(),
            users_with_factors = bundle.collaborative().user_count(),
            titles_with_factors = bundle.collaborative().item_count(),
            exported_at = ?bundle.manifest().exported_at,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model artifacts loaded"
        );

        Ok(Arc::new(bundle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::artifacts::{InMemorySource, MockArtifactSource};
    use crate::store::fixtures::sample_artifacts;

    #[tokio::test]
    async fn test_ensure_loaded_is_idempotent() {
        let store = ModelStore::new(
            Arc::new(InMemorySource::new(sample_artifacts())),
            IndexKind::Exhaustive,
        );
        assert!(!store.is_loaded());
        assert!(store.loaded().is_none());

        let first = store.ensure_loaded().await.unwrap();
        let second = store.ensure_loaded().await.unwrap();

        assert!(store.is_loaded());
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &store.loaded().unwrap()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access_loads_once() {
        let mut source = MockArtifactSource::new();
        source.expect_name().return_const("mock");
        source
            .expect_load()
            .times(1)
            .returning(|| Ok(sample_artifacts()));

        let store = Arc::new(ModelStore::new(Arc::new(source), IndexKind::Precomputed));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.ensure_loaded().await })
            })
            .collect();

        let mut bundles = Vec::new();
        for task in tasks {
            bundles.push(task.await.unwrap().unwrap());
        }

        for bundle in &bundles[1..] {
            assert!(Arc::ptr_eq(&bundles[0], bundle));
        }
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let mut source = MockArtifactSource::new();
        source.expect_name().return_const("mock");
        let mut seq = mockall::Sequence::new();
        source
            .expect_load()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                Err(ArtifactLoadError::Missing {
                    artifact: "titles".to_string(),
                    path: "/models/titles.json".to_string(),
                })
            });
        source
            .expect_load()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(sample_artifacts()));

        let store = ModelStore::new(Arc::new(source), IndexKind::Exhaustive)
            .with_retry_after(Duration::ZERO);

        let err = store.ensure_loaded().await.unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Missing { .. }));
        assert!(!store.is_loaded());

        store.ensure_loaded().await.unwrap();
        assert!(store.is_loaded());
    }

    fn failing_source(times: usize) -> MockArtifactSource {
        let mut source = MockArtifactSource::new();
        source.expect_name().return_const("mock");
        source.expect_load().times(times).returning(|| {
            Err(ArtifactLoadError::Missing {
                artifact: "titles".to_string(),
                path: "/models/titles.json".to_string(),
            })
        });
        source
    }

    #[tokio::test]
    async fn test_failures_are_not_retried_during_cooldown() {
        let store = ModelStore::new(Arc::new(failing_source(1)), IndexKind::Exhaustive)
            .with_retry_after(Duration::from_secs(60));

        let first = store.ensure_loaded().await.unwrap_err();
        assert!(matches!(first, ArtifactLoadError::Missing { .. }));

        for _ in 0..5 {
            match store.ensure_loaded().await.unwrap_err() {
                ArtifactLoadError::CoolingDown { reason, retry_in } => {
                    assert!(reason.contains("titles"));
                    assert!(retry_in <= Duration::from_secs(60));
                }
                other => panic!("unexpected error: {}", other),
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_failed_attempt() {
        let store = Arc::new(
            ModelStore::new(Arc::new(failing_source(1)), IndexKind::Exhaustive)
                .with_retry_after(Duration::from_secs(60)),
        );

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.ensure_loaded().await })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_err());
        }
        assert!(!store.is_loaded());
    }

    #[tokio::test]
    async fn test_load_retried_after_cooldown() {
        let store = ModelStore::new(Arc::new(failing_source(2)), IndexKind::Exhaustive)
            .with_retry_after(Duration::from_millis(50));

        store.ensure_loaded().await.unwrap_err();
        assert!(matches!(
            store.ensure_loaded().await,
            Err(ArtifactLoadError::CoolingDown { .. })
        ));

        tokio::time::sleep(Duration::from_millis(80)).await;
        let err = store.ensure_loaded().await.unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Missing { .. }));
    }

    #[tokio::test]
    async fn test_invalid_artifacts_surface_load_error() {
        let mut raw = sample_artifacts();
        raw.manifest.feature_dim = 8;

        let store = ModelStore::new(Arc::new(InMemorySource::new(raw)), IndexKind::Exhaustive);
        let err = store.ensure_loaded().await.unwrap_err();

        assert!(matches!(err, ArtifactLoadError::Incompatible { .. }));
    }
}
