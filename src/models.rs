use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: i64,
    pub owner_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Body of `POST /todos`. Unknown keys, including any owner field, are dropped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTodo {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<i64>,
}

/// Body of `PUT /todos/:id`. `description` distinguishes an omitted key
/// (`None`, left alone) from an explicit `null` (`Some(None)`, cleared).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<i64>,
}

// Only runs for keys present in the body, so `null` maps to `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Completed,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Created,
    Priority,
}

/// Raw `GET /todos` query string. Values are kept as strings so that
/// unrecognised input degrades to the defaults instead of a 400.
#[derive(Debug, Default, Deserialize)]
pub struct TodoQuery {
    pub page: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<StatusFilter>,
    pub sort: SortOrder,
    /// One-based page number.
    pub page: u32,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            status: None,
            sort: SortOrder::Created,
            page: 1,
        }
    }
}

impl From<TodoQuery> for ListFilter {
    fn from(query: TodoQuery) -> Self {
        let status = match query.status.as_deref() {
            Some("completed") => Some(StatusFilter::Completed),
            Some("pending") => Some(StatusFilter::Pending),
            _ => None,
        };
        let sort = match query.sort_by.as_deref() {
            Some("priority") => SortOrder::Priority,
            _ => SortOrder::Created,
        };
        let page = query
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);

        ListFilter { status, sort, page }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
