use std::sync::Arc;

use anyhow::Context;

mod app;
mod auth;
mod config;
mod db;
mod error;
mod experiences;
mod ids;
mod memory;
mod state;
mod validation;

use crate::auth::google::{GoogleVerifier, IdentityVerifier};
use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "interview_log=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);

    let verifier = match &config.google_client_id {
        Some(client_id) => {
            Some(Arc::new(GoogleVerifier::new(client_id.clone())?) as Arc<dyn IdentityVerifier>)
        }
        None => {
            tracing::warn!("GOOGLE_CLIENT_ID not set; google sign-in disabled");
            None
        }
    };

    match config.database_url.clone() {
        Some(url) => {
            let pool = db::connect(&config, &url).await?;
            db::migrate(&pool).await?;
            tracing::info!("connected to postgres");

            let store = Arc::new(db::PgStore::new(pool.clone()));
            let state = AppState::from_store(config.clone(), store, verifier);
            let result = app::serve(app::build_app(state), &config).await;

            pool.close().await;
            tracing::info!("database pool closed");
            result.context("server error")
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
            let store = Arc::new(memory::MemoryStore::new());
            let state = AppState::from_store(config.clone(), store, verifier);
            app::serve(app::build_app(state), &config)
                .await
                .context("server error")
        }
    }
}
