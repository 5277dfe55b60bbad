use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Result, Row};
use time::OffsetDateTime;

use crate::error::{AppError, ValidationErrors};
use crate::models::{CreateTodo, ListFilter, SortOrder, StatusFilter, Todo, UpdateTodo, User};

pub type DbPool = Arc<Mutex<Connection>>;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        password_hash TEXT NOT NULL,
        created_at INTEGER DEFAULT (strftime('%s', 'now')),
        updated_at INTEGER DEFAULT (strftime('%s', 'now'))
    );

    CREATE TABLE IF NOT EXISTS todos (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        completed INTEGER NOT NULL DEFAULT 0,
        priority INTEGER NOT NULL DEFAULT 1,
        owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at INTEGER DEFAULT (strftime('%s', 'now')),
        updated_at INTEGER DEFAULT (strftime('%s', 'now'))
    );

    CREATE INDEX IF NOT EXISTS idx_todos_owner_id ON todos(owner_id);
    CREATE INDEX IF NOT EXISTS idx_todos_completed ON todos(completed);
    CREATE INDEX IF NOT EXISTS idx_todos_priority ON todos(priority);
";

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";
const TODO_COLUMNS: &str =
    "id, title, description, completed, priority, owner_id, created_at, updated_at";

pub fn init_db(path: impl AsRef<Path>) -> Result<DbPool> {
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub fn init_in_memory() -> Result<DbPool> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Creates the tables on `conn` and turns on foreign key enforcement, which
/// SQLite tracks per connection.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
}

fn lock(pool: &DbPool) -> Result<MutexGuard<'_, Connection>, AppError> {
    pool.lock()
        .map_err(|_| AppError::Database("database lock poisoned".to_string()))
}

fn timestamp(row: &Row, idx: usize) -> Result<OffsetDateTime> {
    let secs: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn user_from_row(row: &Row) -> Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: timestamp(row, 4)?,
        updated_at: timestamp(row, 5)?,
    })
}

fn todo_from_row(row: &Row) -> Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        completed: row.get::<_, i32>(3)? != 0,
        priority: row.get(4)?,
        owner_id: row.get(5)?,
        created_at: timestamp(row, 6)?,
        updated_at: timestamp(row, 7)?,
    })
}

// User operations
//
// Callers pass an already validated, lower-cased email and a password hash.
pub fn insert_user(
    pool: &DbPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    let conn = lock(pool)?;
    let inserted = conn.execute(
        "INSERT INTO users (name, email, password_hash) VALUES (?1, ?2, ?3)",
        (name, email, password_hash),
    );

    match inserted {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            return Err(ValidationErrors::single("email", "has already been taken").into());
        }
        Err(err) => return Err(err.into()),
    }

    let id = conn.last_insert_rowid();
    let user = conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        user_from_row,
    )?;
    Ok(user)
}

pub fn find_user_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, AppError> {
    let conn = lock(pool)?;
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE"),
            [email.trim()],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn find_user_by_id(pool: &DbPool, id: i64) -> Result<Option<User>, AppError> {
    let conn = lock(pool)?;
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Removes a user together with every todo they own.
pub fn delete_user(pool: &DbPool, id: i64) -> Result<bool, AppError> {
    let conn = lock(pool)?;
    let rows = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
    Ok(rows > 0)
}

// Todo operations
//
// Every query below filters on owner_id. A todo owned by someone else is
// reported exactly like a missing one.
pub fn create_todo(pool: &DbPool, owner_id: i64, req: &CreateTodo) -> Result<Todo, AppError> {
    if req.title.trim().is_empty() {
        return Err(ValidationErrors::single("title", "can't be blank").into());
    }

    let priority = req.priority.unwrap_or(1);
    let conn = lock(pool)?;
    conn.execute(
        "INSERT INTO todos (title, description, completed, priority, owner_id)
         VALUES (?1, ?2, 0, ?3, ?4)",
        (&req.title, &req.description, priority, owner_id),
    )?;
    let id = conn.last_insert_rowid();

    get_todo_internal(&conn, owner_id, id)?
        .ok_or_else(|| AppError::Database(format!("todo {id} vanished after insert")))
}

pub fn list_todos(
    pool: &DbPool,
    owner_id: i64,
    filter: &ListFilter,
    page_size: u32,
) -> Result<Vec<Todo>, AppError> {
    let conn = lock(pool)?;

    let mut query = format!("SELECT {TODO_COLUMNS} FROM todos WHERE owner_id = ?");
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(owner_id)];

    match filter.status {
        Some(StatusFilter::Completed) => query.push_str(" AND completed = 1"),
        Some(StatusFilter::Pending) => query.push_str(" AND completed = 0"),
        None => {}
    }

    match filter.sort {
        SortOrder::Priority => query.push_str(" ORDER BY priority ASC, id ASC"),
        SortOrder::Created => query.push_str(" ORDER BY id ASC"),
    }

    let limit = i64::from(page_size);
    let offset = i64::from(filter.page.saturating_sub(1)).saturating_mul(limit);
    query.push_str(" LIMIT ? OFFSET ?");
    params.push(Box::new(limit));
    params.push(Box::new(offset));

    let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query)?;
    let todos = stmt
        .query_map(params_refs.as_slice(), todo_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(todos)
}

pub fn count_todos(pool: &DbPool, owner_id: i64) -> Result<i64, AppError> {
    let conn = lock(pool)?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM todos WHERE owner_id = ?1",
        [owner_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn get_todo(pool: &DbPool, owner_id: i64, id: i64) -> Result<Option<Todo>, AppError> {
    let conn = lock(pool)?;
    get_todo_internal(&conn, owner_id, id)
}

pub fn update_todo(
    pool: &DbPool,
    owner_id: i64,
    id: i64,
    req: &UpdateTodo,
) -> Result<Option<Todo>, AppError> {
    if let Some(ref title) = req.title {
        if title.trim().is_empty() {
            return Err(ValidationErrors::single("title", "can't be blank").into());
        }
    }

    let conn = lock(pool)?;

    let mut updates = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref t) = req.title {
        updates.push("title = ?");
        params.push(Box::new(t.clone()));
    }
    if let Some(ref d) = req.description {
        updates.push("description = ?");
        params.push(Box::new(d.clone()));
    }
    if let Some(c) = req.completed {
        updates.push("completed = ?");
        params.push(Box::new(c as i32));
    }
    if let Some(p) = req.priority {
        updates.push("priority = ?");
        params.push(Box::new(p));
    }

    if updates.is_empty() {
        return get_todo_internal(&conn, owner_id, id);
    }

    updates.push("updated_at = strftime('%s', 'now')");
    params.push(Box::new(id));
    params.push(Box::new(owner_id));

    let query = format!(
        "UPDATE todos SET {} WHERE id = ? AND owner_id = ?",
        updates.join(", ")
    );

    let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    if conn.execute(&query, params_refs.as_slice())? == 0 {
        return Ok(None);
    }

    get_todo_internal(&conn, owner_id, id)
}

fn get_todo_internal(conn: &Connection, owner_id: i64, id: i64) -> Result<Option<Todo>, AppError> {
    let todo = conn
        .query_row(
            &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1 AND owner_id = ?2"),
            [id, owner_id],
            todo_from_row,
        )
        .optional()?;
    Ok(todo)
}

pub fn delete_todo(pool: &DbPool, owner_id: i64, id: i64) -> Result<bool, AppError> {
    let conn = lock(pool)?;
    let rows = conn.execute(
        "DELETE FROM todos WHERE id = ?1 AND owner_id = ?2",
        [id, owner_id],
    )?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (DbPool, User, User) {
        let pool = init_in_memory().unwrap();
        let alice = insert_user(&pool, "Alice", "alice@example.com", "hash-a").unwrap();
        let bob = insert_user(&pool, "Bob", "bob@example.com", "hash-b").unwrap();
        (pool, alice, bob)
    }

    fn todo(title: &str, priority: Option<i64>) -> CreateTodo {
        CreateTodo {
            title: title.to_string(),
            description: None,
            priority,
        }
    }

    fn complete(pool: &DbPool, owner_id: i64, id: i64) {
        let patch = UpdateTodo {
            completed: Some(true),
            ..Default::default()
        };
        update_todo(pool, owner_id, id, &patch).unwrap().unwrap();
    }

    #[test]
    fn create_fills_defaults_and_owner() {
        let (pool, alice, _) = setup();
        let created = create_todo(&pool, alice.id, &todo("Buy milk", None)).unwrap();
        assert_eq!(created.owner_id, alice.id);
        assert_eq!(created.priority, 1);
        assert!(!created.completed);
        assert!(created.description.is_none());
    }

    #[test]
    fn create_rejects_blank_title_without_persisting() {
        let (pool, alice, _) = setup();
        let err = create_todo(&pool, alice.id, &todo("  ", None)).unwrap_err();
        match err {
            AppError::Validation(errors) => assert!(errors.get("title").is_some()),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(count_todos(&pool, alice.id).unwrap(), 0);
    }

    #[test]
    fn foreign_todos_are_invisible() {
        let (pool, alice, bob) = setup();
        let created = create_todo(&pool, alice.id, &todo("Secret", None)).unwrap();

        assert!(get_todo(&pool, bob.id, created.id).unwrap().is_none());
        let patch = UpdateTodo {
            title: Some("Hijacked".into()),
            ..Default::default()
        };
        assert!(update_todo(&pool, bob.id, created.id, &patch).unwrap().is_none());
        assert!(!delete_todo(&pool, bob.id, created.id).unwrap());
        assert!(list_todos(&pool, bob.id, &ListFilter::default(), 25)
            .unwrap()
            .is_empty());

        let still_there = get_todo(&pool, alice.id, created.id).unwrap().unwrap();
        assert_eq!(still_there.title, "Secret");
    }

    #[test]
    fn update_applies_patch_and_rejects_blank_title() {
        let (pool, alice, _) = setup();
        let created = create_todo(&pool, alice.id, &todo("Draft", None)).unwrap();

        let patch = UpdateTodo {
            description: Some(Some("with notes".into())),
            priority: Some(5),
            ..Default::default()
        };
        let updated = update_todo(&pool, alice.id, created.id, &patch)
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Draft");
        assert_eq!(updated.description.as_deref(), Some("with notes"));
        assert_eq!(updated.priority, 5);

        let blank = UpdateTodo {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            update_todo(&pool, alice.id, created.id, &blank),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn null_description_clears_it() {
        let (pool, alice, _) = setup();
        let req = CreateTodo {
            title: "Noted".into(),
            description: Some("remove me".into()),
            priority: None,
        };
        let created = create_todo(&pool, alice.id, &req).unwrap();

        let keep = UpdateTodo {
            priority: Some(2),
            ..Default::default()
        };
        let kept = update_todo(&pool, alice.id, created.id, &keep).unwrap().unwrap();
        assert_eq!(kept.description.as_deref(), Some("remove me"));

        let clear = UpdateTodo {
            description: Some(None),
            ..Default::default()
        };
        let cleared = update_todo(&pool, alice.id, created.id, &clear).unwrap().unwrap();
        assert!(cleared.description.is_none());
    }

    #[test]
    fn huge_page_and_page_size_do_not_overflow() {
        let (pool, alice, _) = setup();
        create_todo(&pool, alice.id, &todo("only", None)).unwrap();

        let last = ListFilter {
            page: u32::MAX,
            ..Default::default()
        };
        assert!(list_todos(&pool, alice.id, &last, u32::MAX).unwrap().is_empty());
        assert_eq!(
            list_todos(&pool, alice.id, &ListFilter::default(), u32::MAX)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn empty_patch_returns_current_row() {
        let (pool, alice, _) = setup();
        let created = create_todo(&pool, alice.id, &todo("Same", None)).unwrap();
        let fetched = update_todo(&pool, alice.id, created.id, &UpdateTodo::default())
            .unwrap()
            .unwrap();
        assert_eq!(fetched.title, "Same");
        assert!(update_todo(&pool, alice.id, 9999, &UpdateTodo::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn delete_twice_reports_missing() {
        let (pool, alice, _) = setup();
        let created = create_todo(&pool, alice.id, &todo("Once", None)).unwrap();
        assert!(delete_todo(&pool, alice.id, created.id).unwrap());
        assert!(!delete_todo(&pool, alice.id, created.id).unwrap());
    }

    #[test]
    fn list_filters_by_status_and_sorts_by_priority() {
        let (pool, alice, _) = setup();
        let low = create_todo(&pool, alice.id, &todo("low", Some(3))).unwrap();
        let high = create_todo(&pool, alice.id, &todo("high", Some(1))).unwrap();
        let mid = create_todo(&pool, alice.id, &todo("mid", Some(2))).unwrap();
        complete(&pool, alice.id, mid.id);

        let all = list_todos(&pool, alice.id, &ListFilter::default(), 25).unwrap();
        let ids: Vec<i64> = all.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![low.id, high.id, mid.id]);

        let by_priority = ListFilter {
            sort: SortOrder::Priority,
            ..Default::default()
        };
        let ids: Vec<i64> = list_todos(&pool, alice.id, &by_priority, 25)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![high.id, mid.id, low.id]);

        let completed = ListFilter {
            status: Some(StatusFilter::Completed),
            ..Default::default()
        };
        let done = list_todos(&pool, alice.id, &completed, 25).unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, mid.id);

        let pending = ListFilter {
            status: Some(StatusFilter::Pending),
            ..Default::default()
        };
        let open = list_todos(&pool, alice.id, &pending, 25).unwrap();
        assert_eq!(open.len(), 2);
        assert!(open.iter().all(|t| !t.completed));
    }

    #[test]
    fn list_paginates_and_out_of_range_is_empty() {
        let (pool, alice, _) = setup();
        for i in 0..5 {
            create_todo(&pool, alice.id, &todo(&format!("todo {i}"), None)).unwrap();
        }

        let page = |n| ListFilter {
            page: n,
            ..Default::default()
        };
        assert_eq!(list_todos(&pool, alice.id, &page(1), 2).unwrap().len(), 2);
        assert_eq!(list_todos(&pool, alice.id, &page(3), 2).unwrap().len(), 1);
        assert!(list_todos(&pool, alice.id, &page(4), 2).unwrap().is_empty());
        assert!(list_todos(&pool, alice.id, &page(u32::MAX), 2)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn duplicate_email_is_a_validation_error() {
        let (pool, _, _) = setup();
        let err = insert_user(&pool, "Other", "ALICE@example.com", "hash").unwrap_err();
        match err {
            AppError::Validation(errors) => assert!(errors.get("email").is_some()),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn user_lookup_ignores_case() {
        let (pool, alice, _) = setup();
        let found = find_user_by_email(&pool, "Alice@Example.COM").unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        assert!(find_user_by_email(&pool, "nobody@example.com")
            .unwrap()
            .is_none());
    }

    #[test]
    fn deleting_user_cascades_to_todos() {
        let (pool, alice, _) = setup();
        let created = create_todo(&pool, alice.id, &todo("Orphan", None)).unwrap();

        assert!(delete_user(&pool, alice.id).unwrap());
        assert!(find_user_by_id(&pool, alice.id).unwrap().is_none());
        assert!(get_todo(&pool, alice.id, created.id).unwrap().is_none());
        assert_eq!(count_todos(&pool, alice.id).unwrap(), 0);
        assert!(!delete_user(&pool, alice.id).unwrap());
    }

    #[test]
    fn on_disk_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.db");

        {
            let pool = init_db(&path).unwrap();
            insert_user(&pool, "Disk", "disk@example.com", "hash").unwrap();
        }

        let pool = init_db(&path).unwrap();
        assert!(find_user_by_email(&pool, "disk@example.com")
            .unwrap()
            .is_some());
    }
}
