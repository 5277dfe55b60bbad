use axum::extract::{Path, Query, State};
use axum::{http::StatusCode, response::IntoResponse, Json};
use tracing::info;

use crate::db::{create_todo, delete_todo, get_todo, list_todos, update_todo};
use crate::error::AppError;
use crate::middleware::{AppJson, CurrentUser};
use crate::models::{CreateTodo, ListFilter, Todo, TodoQuery, UpdateTodo};
use crate::AppState;

// Ids that are not integers cannot name any todo.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

pub async fn list_all_todos(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<TodoQuery>,
) -> Result<Json<Vec<Todo>>, AppError> {
    let filter = ListFilter::from(query);
    let todos = list_todos(&state.db, user.id, &filter, state.page_size)?;
    info!(user_id = user.id, count = todos.len(), page = filter.page, "Listed todos");
    Ok(Json(todos))
}

pub async fn create_new_todo(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateTodo>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let todo = create_todo(&state.db, user.id, &req)?;
    info!(user_id = user.id, id = todo.id, title = %todo.title, "Created todo");
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn get_single_todo(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, AppError> {
    let id = parse_id(&id)?;
    match get_todo(&state.db, user.id, id)? {
        Some(todo) => Ok(Json(todo)),
        None => Err(AppError::NotFound),
    }
}

pub async fn update_existing_todo(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateTodo>,
) -> Result<Json<Todo>, AppError> {
    let id = parse_id(&id)?;
    match update_todo(&state.db, user.id, id, &req)? {
        Some(todo) => {
            info!(user_id = user.id, id = todo.id, completed = todo.completed, "Updated todo");
            Ok(Json(todo))
        }
        None => Err(AppError::NotFound),
    }
}

pub async fn delete_existing_todo(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    if delete_todo(&state.db, user.id, id)? {
        info!(user_id = user.id, id, "Deleted todo");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
