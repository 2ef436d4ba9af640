mod agent;
mod config;
mod db;
mod errors;
mod models;
mod routes;
mod service;
mod session;

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::{Gateway, GeminiBackend};
use crate::config::AppConfig;
use crate::db::chat_history_repository::ChatHistoryRepository;
use crate::db::kv_store::{KeyValueStore, MemoryKeyValueStore, PgKeyValueStore};
use crate::db::theme_repository::ThemeRepository;
use crate::errors::AppError;
use crate::routes::AppState;
use crate::service::chat_service::ChatService;
use crate::service::theme_service::ThemeStore;

async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let Some(database_url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL is not set; chat history and theme are kept in memory only");
        return Ok(Arc::new(MemoryKeyValueStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(AppError::DatabaseConnectionFailed)?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("Database connection established and migrations applied");
    Ok(Arc::new(PgKeyValueStore::new(pool)))
}

/// Periodically closes sessions whose widget went away without closing.
fn spawn_idle_sweeper(chat: ChatService, max_idle: Duration) {
    let period = (max_idle / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = chat.evict_idle(max_idle).await;
            if evicted > 0 {
                info!("Evicted {evicted} idle session(s)");
            }
        }
    });
}

fn cors_layer(config: &AppConfig) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    Ok(match config.cors_origin.as_deref() {
        Some(origin) => layer.allow_origin(origin.parse::<HeaderValue>()?),
        None => layer.allow_origin(Any),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sarux=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env();

    // ── Storage ───────────────────────────────────────────────────────────────
    let store = connect_store(&config).await?;

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let backend = GeminiBackend::new(config.gemini_api_key.as_deref(), &config.gemini_model)?;
    info!("Using Gemini model {}", config.gemini_model);

    let chat = ChatService::new(
        ChatHistoryRepository::new(store.clone()),
        Gateway::new(Arc::new(backend)),
        config.limits,
    );
    let theme = ThemeStore::new(ThemeRepository::new(store));
    spawn_idle_sweeper(chat.clone(), config.session_idle_timeout);

    let app = routes::router(AppState { chat, theme })
        .layer(cors_layer(&config)?)
        .layer(TraceLayer::new_for_http());

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
