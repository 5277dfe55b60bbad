use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::{header::AUTHORIZATION, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::db::find_user_by_id;
use crate::error::AppError;
use crate::models::User;
use crate::token::TokenError;
use crate::AppState;

/// The user behind a valid `Authorization: Bearer <token>` header. Handlers
/// take it as an argument; there is no other way to reach the caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            warn!("missing or malformed Authorization header");
            AuthError::Unauthorized("Missing token")
        })?;

        let user_id = state.tokens.verify(token).map_err(|err| {
            warn!(reason = ?err, "rejected bearer token");
            match err {
                TokenError::Expired => AuthError::Unauthorized("Token expired"),
                TokenError::Invalid => AuthError::Unauthorized("Invalid token"),
            }
        })?;

        match find_user_by_id(&state.db, user_id)? {
            Some(user) => {
                debug!(user_id, "authenticated request");
                Ok(CurrentUser(user))
            }
            None => {
                warn!(user_id, "token for a user that no longer exists");
                Err(AuthError::Unauthorized("Invalid token"))
            }
        }
    }
}

/// `Json<T>` whose rejections go through `AppError`: type errors become 422
/// field errors, unreadable bodies a JSON `{"error": ...}`.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                warn!(status = %rejection.status(), "rejected request body");
                Err(rejection.into())
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[derive(Debug)]
pub enum AuthError {
    Unauthorized(&'static str),
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg }))).into_response()
            }
            AuthError::Internal(msg) => AppError::Internal(msg).into_response(),
        }
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Database(msg) | AppError::Internal(msg) => AuthError::Internal(msg),
            AppError::Unauthorized(msg) => AuthError::Unauthorized(msg),
            AppError::NotFound => AuthError::Unauthorized("Invalid token"),
            AppError::Validation(_) | AppError::Rejected(..) => {
                AuthError::Internal("unexpected request error".into())
            }
        }
    }
}
