//! MySQL implementation of [`TodoStore`](super::TodoStore).
//!
//! Columns are cast on the way out so the decoder sees the same types no
//! matter how the table was declared: `id` and `completed` as signed
//! integers (covers `TINYINT(1)`/`BOOLEAN` flags), `created_at` as text
//! (covers both `DATETIME` and `VARCHAR` columns).
//!
//! sqlx negotiates `CLIENT_FOUND_ROWS`, so `rows_affected` on an update counts
//! matched rows, including ones whose values did not change.

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPool, MySqlPoolOptions};
use sqlx::Connection;

use crate::error::StoreError;

const SELECT_TODOS: &str = "SELECT CAST(id AS SIGNED), title, CAST(completed AS SIGNED), \
     CAST(created_at AS CHAR) FROM todos";

#[derive(Clone, Debug)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Ping the server over a single connection, then open the pool.
    ///
    /// The pool retries failed connects until its acquire timeout and then
    /// reports only that it timed out, so the direct connection is what
    /// surfaces a refused port or bad credentials, immediately and with the
    /// driver's cause.
    pub async fn connect(options: MySqlConnectOptions) -> Result<Self, StoreError> {
        let mut conn = MySqlConnection::connect_with(&options).await?;
        conn.ping().await?;
        conn.close().await?;

        let pool = MySqlPoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }
}

sql_todo_store!(MySqlStore, SELECT_TODOS);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;

    #[tokio::test]
    async fn refused_connection_reports_io_error() {
        let options = DbConfig {
            addr: "127.0.0.1:1".into(),
            ..Default::default()
        }
        .mysql_options();

        let err = MySqlStore::connect(options).await.unwrap_err();
        assert!(
            matches!(err, StoreError::Database(sqlx::Error::Io(_))),
            "{err:?}"
        );
    }
}
