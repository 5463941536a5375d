use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use hybrid_recommender::{
    api::{create_router, AppState},
    config::Config,
    services::RecommendationService,
    store::{FileArtifactSource, ModelStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hybrid_recommender=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let recommender_config = config.recommender()?;

    tracing::info!(
        artifacts_dir = %config.artifacts_dir,
        content_index = %config.content_index,
        default_method = %recommender_config.default_method,
        weight_content = recommender_config.weights.content,
        weight_collaborative = recommender_config.weights.collaborative,
        "Starting recommendation service"
    );

    let source = Arc::new(FileArtifactSource::new(&config.artifacts_dir));
    let store = ModelStore::new(source, config.content_index)
        .with_retry_after(config.load_retry_after());
    let recommender = RecommendationService::new(store, recommender_config);

    // Nothing can be served without artifacts, so a failed preload stops startup
    if config.preload_artifacts {
        recommender.warm_up().await?;
    }

    let app = create_router(AppState::new(recommender));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
