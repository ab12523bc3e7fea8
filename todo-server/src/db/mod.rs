//! Data access layer for the `todos` table.
//!
//! # Design
//! [`TodoStore`] is the seam between handlers and SQL. Production runs on
//! MySQL ([`mysql::MySqlStore`]); [`sqlite::SqliteStore`] speaks the same
//! statements and backs local runs and the test suite. [`Store`] picks one at
//! startup so handlers stay non-generic.
//!
//! Storage encodings are fixed by rows that already exist:
//! - `completed` is an integer flag, 1 for true and 0 for false.
//! - `created_at` is text in `YYYY-MM-DD HH:MM:SS` with no offset, read and
//!   written as UTC.
//!
//! `update` and `delete` report the number of rows they touched. Whether zero
//! means "not found" is the handler's call.

/// Implements [`TodoStore`] for a store wrapping a `pool` field. Both
/// backends share every statement except the select, which MySQL needs to
/// cast column by column.
macro_rules! sql_todo_store {
    ($store:ty, $select:expr) => {
        impl $crate::db::TodoStore for $store {
            async fn list_all(
                &self,
            ) -> Result<Vec<$crate::model::Todo>, $crate::error::StoreError> {
                let rows: Vec<(i64, String, i64, String)> =
                    sqlx::query_as($select).fetch_all(&self.pool).await?;
                rows.into_iter().map($crate::db::decode_row).collect()
            }

            async fn insert(&self, title: &str) -> Result<(), $crate::error::StoreError> {
                sqlx::query($crate::db::INSERT_TODO)
                    .bind(title)
                    .bind($crate::db::completed_to_flag(false))
                    .bind($crate::db::format_created_at($crate::db::now_created_at()))
                    .execute(&self.pool)
                    .await?;
                Ok(())
            }

            async fn update(
                &self,
                id: i64,
                title: &str,
                completed: bool,
            ) -> Result<u64, $crate::error::StoreError> {
                let result = sqlx::query($crate::db::UPDATE_TODO)
                    .bind(title)
                    .bind($crate::db::completed_to_flag(completed))
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected())
            }

            async fn delete(&self, id: i64) -> Result<u64, $crate::error::StoreError> {
                let result = sqlx::query($crate::db::DELETE_TODO)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected())
            }
        }
    };
}

pub mod mysql;
pub mod sqlite;

use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use sqlx::mysql::MySqlConnectOptions;

use crate::config::Config;
use crate::error::StoreError;
use crate::model::Todo;

pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) const INSERT_TODO: &str =
    "INSERT INTO todos (title, completed, created_at) VALUES (?, ?, ?)";
pub(crate) const UPDATE_TODO: &str = "UPDATE todos SET title = ?, completed = ? WHERE id = ?";
pub(crate) const DELETE_TODO: &str = "DELETE FROM todos WHERE id = ?";

pub trait TodoStore: Send + Sync + 'static {
    /// Every row in scan order. Fails as a whole if any row cannot be read.
    fn list_all(&self) -> impl Future<Output = Result<Vec<Todo>, StoreError>> + Send;

    /// Store a new, not yet completed todo stamped with the current time.
    fn insert(&self, title: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite title and completion of `id`. Returns rows affected.
    fn update(
        &self,
        id: i64,
        title: &str,
        completed: bool,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Remove `id`. Returns rows affected.
    fn delete(&self, id: i64) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// The backend selected from configuration.
#[derive(Clone, Debug)]
pub enum Store {
    MySql(mysql::MySqlStore),
    Sqlite(sqlite::SqliteStore),
}

impl TodoStore for Store {
    async fn list_all(&self) -> Result<Vec<Todo>, StoreError> {
        match self {
            Store::MySql(s) => s.list_all().await,
            Store::Sqlite(s) => s.list_all().await,
        }
    }

    async fn insert(&self, title: &str) -> Result<(), StoreError> {
        match self {
            Store::MySql(s) => s.insert(title).await,
            Store::Sqlite(s) => s.insert(title).await,
        }
    }

    async fn update(&self, id: i64, title: &str, completed: bool) -> Result<u64, StoreError> {
        match self {
            Store::MySql(s) => s.update(id, title, completed).await,
            Store::Sqlite(s) => s.update(id, title, completed).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        match self {
            Store::MySql(s) => s.delete(id).await,
            Store::Sqlite(s) => s.delete(id).await,
        }
    }
}

impl Store {
    /// Open the backend `config` selects: SQLite for a `sqlite:` URL, MySQL
    /// for any other URL, otherwise MySQL from the `DB_*` settings.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        if let Some(url) = config.sqlite_url() {
            return Ok(sqlite::SqliteStore::connect(url).await?.into());
        }
        let options = match config.database_url.as_deref() {
            Some(url) => MySqlConnectOptions::from_str(url)?,
            None => config.db.mysql_options(),
        };
        Ok(mysql::MySqlStore::connect(options).await?.into())
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Store::MySql(_) => "mysql",
            Store::Sqlite(_) => "sqlite",
        }
    }
}

impl From<mysql::MySqlStore> for Store {
    fn from(store: mysql::MySqlStore) -> Self {
        Store::MySql(store)
    }
}

impl From<sqlite::SqliteStore> for Store {
    fn from(store: sqlite::SqliteStore) -> Self {
        Store::Sqlite(store)
    }
}

pub fn completed_to_flag(completed: bool) -> i64 {
    i64::from(completed)
}

pub fn flag_to_completed(flag: i64) -> bool {
    flag == 1
}

pub fn format_created_at(at: DateTime<Utc>) -> String {
    at.format(CREATED_AT_FORMAT).to_string()
}

pub fn parse_created_at(value: &str) -> Result<DateTime<Utc>, StoreError> {
    NaiveDateTime::parse_from_str(value, CREATED_AT_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| StoreError::Timestamp {
            value: value.to_string(),
            source,
        })
}

/// Current time at the precision the table keeps.
pub(crate) fn now_created_at() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Turn raw `(id, title, completed, created_at)` columns into a record.
pub(crate) fn decode_row(
    (id, title, completed, created_at): (i64, String, i64, String),
) -> Result<Todo, StoreError> {
    Ok(Todo {
        id,
        title,
        completed: flag_to_completed(completed),
        created_at: parse_created_at(&created_at)?,
    })
}
