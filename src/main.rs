use std::sync::Arc;

use teamdash::{
    config::AppConfig,
    http::{self, AppState},
    model::{MockModelProvider, ModelProvider, OpenAiProvider},
    moderation::ContentModerator,
    orchestrator::DashboardOrchestrator,
    store::{DashboardStore, InMemoryStore, PostgresStore},
};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    let model = build_model_provider(&config);
    let store = build_store(&config).await?;
    let moderator = Arc::new(ContentModerator::default());

    let orchestrator = Arc::new(DashboardOrchestrator::new(moderator, model, store));

    let app = http::router(AppState { orchestrator });
    let listener = TcpListener::bind(config.http_bind).await?;
    info!("teamdash HTTP API listening on {}", config.http_bind);

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();
}

fn build_model_provider(config: &AppConfig) -> Arc<dyn ModelProvider> {
    let openai = || -> Option<Arc<dyn ModelProvider>> {
        let api_key = config.openai_api_key.clone()?;
        info!(model = %config.openai.model, "using OpenAI model provider");
        Some(Arc::new(OpenAiProvider::new(api_key, config.openai.clone())))
    };

    match config.model_provider.to_lowercase().as_str() {
        "mock" => {
            warn!("MODEL_PROVIDER=mock; using mock model provider");
            Arc::new(MockModelProvider)
        }
        "openai" => openai().unwrap_or_else(|| {
            warn!("MODEL_PROVIDER=openai but OPENAI_API_KEY is missing; using mock");
            Arc::new(MockModelProvider)
        }),
        other => {
            if other != "auto" {
                warn!(
                    provider = %other,
                    "unknown MODEL_PROVIDER value; valid values are auto|openai|mock; falling back to auto"
                );
            }
            openai().unwrap_or_else(|| {
                warn!("OPENAI_API_KEY not set; using mock model provider");
                Arc::new(MockModelProvider)
            })
        }
    }
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DashboardStore>> {
    if let Some(database_url) = &config.database_url {
        let store = PostgresStore::connect(database_url).await?;
        info!("Connected to Postgres store");
        Ok(Arc::new(store))
    } else {
        warn!("DATABASE_URL not set; using in-memory store");
        Ok(Arc::new(InMemoryStore::default()))
    }
}
