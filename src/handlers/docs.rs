use axum::extract::State;
use axum::http::{header::HOST, HeaderMap};
use axum::Json;
use serde_json::{json, Value};

use crate::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn api_docs(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let base_url = format!("http://{}{}", host, state.base_path);
    Json(describe_api(&base_url))
}

/// The document served at `/docs`. Static apart from `base_url`.
pub fn describe_api(base_url: &str) -> Value {
    json!({
        "api_name": "To-Do List API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "RESTful API for managing to-do lists with user authentication",
        "base_url": base_url,
        "authentication": {
            "type": "JWT Bearer Token",
            "header": "Authorization: Bearer <token>"
        },
        "endpoints": {
            "general": {
                "root": {
                    "method": "GET",
                    "path": "/",
                    "description": "Liveness check"
                },
                "health": {
                    "method": "GET",
                    "path": "/up",
                    "description": "Liveness check, returns 200 when the app is up"
                },
                "docs": {
                    "method": "GET",
                    "path": "/docs",
                    "description": "This document"
                }
            },
            "authentication": {
                "login": {
                    "method": "POST",
                    "path": "/auth/login",
                    "description": "Authenticate user and get JWT token",
                    "body": {
                        "email": "string (required)",
                        "password": "string (required)"
                    }
                },
                "signup": {
                    "method": "POST",
                    "path": "/signup",
                    "description": "Register new user account",
                    "body": {
                        "name": "string (required)",
                        "email": "string (required)",
                        "password": "string (required)",
                        "password_confirmation": "string (required)"
                    }
                }
            },
            "todos": {
                "list": {
                    "method": "GET",
                    "path": "/todos",
                    "description": "Get all todos for authenticated user",
                    "query_params": {
                        "page": "integer (pagination)",
                        "status": "string (completed|pending)",
                        "sort_by": "string (priority)"
                    }
                },
                "create": {
                    "method": "POST",
                    "path": "/todos",
                    "description": "Create a new todo",
                    "body": {
                        "title": "string (required)",
                        "description": "string (optional)",
                        "priority": "integer (optional, default: 1)"
                    }
                },
                "show": {
                    "method": "GET",
                    "path": "/todos/:id",
                    "description": "Get a specific todo"
                },
                "update": {
                    "method": "PUT",
                    "path": "/todos/:id",
                    "description": "Update a todo",
                    "body": {
                        "title": "string (optional)",
                        "description": "string (optional)",
                        "completed": "boolean (optional)",
                        "priority": "integer (optional)"
                    }
                },
                "delete": {
                    "method": "DELETE",
                    "path": "/todos/:id",
                    "description": "Delete a todo"
                }
            },
            "api_v1": {
                "todos": {
                    "methods": ["GET", "POST"],
                    "path": "/api/v1/todos",
                    "description": "Same as /todos"
                },
                "todo": {
                    "methods": ["GET", "PUT", "DELETE"],
                    "path": "/api/v1/todos/:id",
                    "description": "Same as /todos/:id"
                }
            }
        },
        "status_codes": {
            "200": "OK - Request successful",
            "201": "Created - Resource created successfully",
            "204": "No Content - Resource deleted successfully",
            "400": "Bad Request - Invalid request format",
            "401": "Unauthorized - Authentication required",
            "404": "Not Found - Resource not found",
            "415": "Unsupported Media Type - Body is not application/json",
            "422": "Unprocessable Entity - Validation failed"
        }
    })
}
