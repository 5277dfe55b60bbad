use std::{net::Ipv4Addr, sync::Arc};

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use todo_api::{config::Config, create_app, db, seed, token::TokenKeys, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("todo_api=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    let db = db::init_db(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path))?;
    if config.seed {
        seed::seed(&db).map_err(|e| anyhow::anyhow!("seeding failed: {e:?}"))?;
    }

    let state = AppState {
        db,
        tokens: TokenKeys::new(config.jwt_secret.as_bytes(), config.token_ttl),
        page_size: config.page_size,
        base_path: Arc::new(config.base_path),
    };
    let app = create_app(state);
    let addr = (Ipv4Addr::UNSPECIFIED, config.port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to port {}", config.port))?;

    info!("running on {addr:?}");

    axum::serve(listener, app).await.context("failed serving")?;
    Ok(())
}
