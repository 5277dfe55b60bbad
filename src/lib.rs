pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod seed;
pub mod token;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use db::DbPool;
use token::TokenKeys;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub tokens: TokenKeys,
    pub page_size: u32,
    pub base_path: Arc<String>,
}

fn todo_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/todos",
            get(handlers::todos::list_all_todos).post(handlers::todos::create_new_todo),
        )
        .route(
            "/todos/{id}",
            get(handlers::todos::get_single_todo)
                .put(handlers::todos::update_existing_todo)
                .delete(handlers::todos::delete_existing_todo),
        )
}

pub fn create_app(state: AppState) -> Router {
    let base_path = state.base_path.clone();

    let app_routes = Router::new()
        .route("/", get(handlers::docs::health))
        .route("/up", get(handlers::docs::health))
        .route("/docs", get(handlers::docs::api_docs))
        .route("/auth/login", post(handlers::auth::login))
        .route("/signup", post(handlers::auth::signup))
        .merge(todo_routes())
        .nest("/api/v1", todo_routes())
        .layer(
            tower::ServiceBuilder::new()
                .layer(tower_http::trace::TraceLayer::new_for_http())
                .layer(tower_http::compression::CompressionLayer::new()),
        )
        .with_state(state);

    tracing::info!("base_path: {base_path:?}");

    if base_path.is_empty() {
        app_routes
    } else {
        Router::new().nest(&base_path, app_routes)
    }
}
