use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::auth::{authenticate, register};
use crate::error::AppError;
use crate::middleware::AppJson;
use crate::models::{LoginRequest, SignupRequest, TokenResponse, User};
use crate::AppState;

pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = authenticate(&state.db, &req.email, &req.password)?;
    let token = state.tokens.issue(user.id)?;
    info!(user_id = user.id, "User logged in");
    Ok(Json(TokenResponse { token }))
}

pub async fn signup(
    State(state): State<AppState>,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = register(&state.db, &req)?;
    info!(user_id = user.id, "Created user");
    Ok((StatusCode::CREATED, Json(user)))
}
