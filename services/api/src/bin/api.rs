//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, MemoryStore, OpenAiCompletionAdapter, ReqwestFetcher},
    config::Config,
    error::ApiError,
    web::{router, state::AppState},
};
use site_audit_core::ports::AnalysisStore;
use site_audit_core::{FixGenerator, Pipeline};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    let store: Arc<dyn AnalysisStore> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            warn!("DATABASE_URL is not set; analyses are kept in memory only.");
            Arc::new(MemoryStore::new())
        }
    };

    // --- 3. Initialize Service Adapters ---
    let api_key = config
        .openai_api_key
        .as_deref()
        .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
    let completion_adapter = Arc::new(OpenAiCompletionAdapter::from_settings(
        api_key,
        config.openai_base_url.as_deref(),
        config.fix_model.clone(),
    ));
    let fetcher = Arc::new(
        ReqwestFetcher::new(&config.fetch)
            .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?,
    );
    let fix_generator = FixGenerator::new(completion_adapter)
        .with_batch_size(config.fix_batch_size)
        .with_timeout(config.fix_timeout);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        pipeline: Pipeline::new(fetcher, fix_generator),
        store,
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    let app = router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
