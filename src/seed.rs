use tracing::info;

use crate::auth::hash_password;
use crate::db::{count_todos, create_todo, find_user_by_email, insert_user, update_todo, DbPool};
use crate::error::AppError;
use crate::models::{CreateTodo, UpdateTodo, User};

struct SampleTodo {
    title: &'static str,
    description: &'static str,
    completed: bool,
    priority: i64,
}

struct SampleUser {
    name: &'static str,
    email: &'static str,
    todos: &'static [SampleTodo],
}

const SAMPLE_PASSWORD: &str = "password123";

const SAMPLES: &[SampleUser] = &[
    SampleUser {
        name: "John Doe",
        email: "john@example.com",
        todos: &[
            SampleTodo {
                title: "Complete API tutorial",
                description: "Build a comprehensive to-do list API with authentication",
                completed: false,
                priority: 1,
            },
            SampleTodo {
                title: "Write API documentation",
                description: "Document all the endpoints and authentication flow",
                completed: false,
                priority: 2,
            },
            SampleTodo {
                title: "Set up CI/CD pipeline",
                description: "Configure automated testing and deployment",
                completed: true,
                priority: 3,
            },
        ],
    },
    SampleUser {
        name: "Jane Smith",
        email: "jane@example.com",
        todos: &[
            SampleTodo {
                title: "Review code changes",
                description: "Review pull requests from team members",
                completed: false,
                priority: 1,
            },
            SampleTodo {
                title: "Update project README",
                description: "Add setup instructions and API documentation",
                completed: false,
                priority: 2,
            },
        ],
    },
];

/// Makes sure the sample users exist and that each has its sample todos.
/// Users who already own todos are left untouched, so repeated runs are no-ops.
pub fn seed(pool: &DbPool) -> Result<(), AppError> {
    for sample in SAMPLES {
        let user = ensure_user(pool, sample)?;
        if count_todos(pool, user.id)? > 0 {
            continue;
        }

        for todo in sample.todos {
            let req = CreateTodo {
                title: todo.title.to_string(),
                description: Some(todo.description.to_string()),
                priority: Some(todo.priority),
            };
            let created = create_todo(pool, user.id, &req)?;
            if todo.completed {
                let patch = UpdateTodo {
                    completed: Some(true),
                    ..Default::default()
                };
                update_todo(pool, user.id, created.id, &patch)?;
            }
        }
        info!(user_id = user.id, count = sample.todos.len(), "Seeded todos");
    }
    Ok(())
}

fn ensure_user(pool: &DbPool, sample: &SampleUser) -> Result<User, AppError> {
    if let Some(user) = find_user_by_email(pool, sample.email)? {
        return Ok(user);
    }
    let hash = hash_password(SAMPLE_PASSWORD)?;
    let user = insert_user(pool, sample.name, sample.email, &hash)?;
    info!(user_id = user.id, email = sample.email, "Seeded user");
    Ok(user)
}
