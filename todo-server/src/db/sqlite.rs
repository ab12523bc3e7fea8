//! SQLite implementation of [`TodoStore`](super::TodoStore).
//!
//! Runs the same statements as the MySQL store. `connect` creates the
//! `todos` table when it is missing so a fresh file (or `sqlite::memory:`)
//! is usable immediately.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::StoreError;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
)";

const SELECT_TODOS: &str = "SELECT id, title, completed, created_at FROM todos";

#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open `url`, e.g. `"sqlite://todos.db"` or `"sqlite::memory:"`.
    ///
    /// An in-memory database lives only as long as its connection, so the
    /// pool is held to a single connection in that case.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Underlying pool, for seeding and inspecting rows directly.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

sql_todo_store!(SqliteStore, SELECT_TODOS);
