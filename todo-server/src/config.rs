//! Runtime configuration, read from the environment at startup.
//!
//! `main` loads a `.env` file first when one exists ([`load_dotenv`]).
//! Every field has a default so `from_env` never fails; a bad database
//! setting surfaces when the store connects.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use sqlx::mysql::MySqlConnectOptions;

/// The service always listens here.
pub const PORT: u16 = 19000;

const DEFAULT_MYSQL_PORT: u16 = 3306;

#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,

    /// Full connection URL. Overrides `db` when set; a `sqlite:` scheme
    /// selects the SQLite store.
    pub database_url: Option<String>,

    /// `tracing` filter string, e.g. `"info"` or `"debug,sqlx=warn"`.
    pub log_level: String,

    /// Emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// How long in-flight requests get to finish after an interrupt.
    pub shutdown_timeout: Duration,

    /// Bound on reading a request's headers (idle keep-alive included) and
    /// on handling it once read. Expiry closes the connection or answers 408.
    pub http_timeout: Duration,

    /// Directory holding `home.tpl`.
    pub static_dir: PathBuf,

    /// Answer 404 when update/delete match no row instead of 200.
    pub strict_not_found: bool,
}

/// MySQL connection settings, from `DB_USER`, `DB_PASS`, `DB_NAME` and
/// `DB_ADDR` (`host[:port]`).
#[derive(Clone, Default)]
pub struct DbConfig {
    pub user: String,
    pub password: String,
    pub name: String,
    pub addr: String,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("addr", &self.addr)
            .finish()
    }
}

impl DbConfig {
    pub fn mysql_options(&self) -> MySqlConnectOptions {
        let (host, port) = split_addr(&self.addr);
        let mut options = MySqlConnectOptions::new().host(host).port(port);
        if !self.user.is_empty() {
            options = options.username(&self.user);
        }
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        if !self.name.is_empty() {
            options = options.database(&self.name);
        }
        options
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).unwrap_or_default();
        Self {
            db: DbConfig {
                user: get("DB_USER"),
                password: get("DB_PASS"),
                name: get("DB_NAME"),
                addr: get("DB_ADDR"),
            },
            database_url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),
            log_level: lookup("TODO_LOG").unwrap_or_else(|| "info".to_owned()),
            log_json: lookup("TODO_LOG_JSON").is_some_and(|v| parse_flag(&v)),
            shutdown_timeout: Duration::from_secs(
                lookup("TODO_SHUTDOWN_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
            ),
            http_timeout: Duration::from_secs(
                lookup("TODO_HTTP_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
            static_dir: lookup("TODO_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            strict_not_found: lookup("TODO_STRICT_NOT_FOUND").is_some_and(|v| parse_flag(&v)),
        }
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, PORT))
    }

    /// The SQLite URL to use, if the configuration selects SQLite.
    pub fn sqlite_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .filter(|url| url.starts_with("sqlite:"))
    }
}

/// Load `.env` from the working directory (or a parent) into the process
/// environment. Variables already set are left alone. Returns the file used.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenv::dotenv().ok()
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn split_addr(addr: &str) -> (&str, u16) {
    if addr.is_empty() {
        return ("localhost", DEFAULT_MYSQL_PORT);
    }
    match addr.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, port),
            Err(_) => (addr, DEFAULT_MYSQL_PORT),
        },
        None => (addr, DEFAULT_MYSQL_PORT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.log_level, "info");
        assert!(!cfg.log_json);
        assert_eq!(cfg.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(cfg.http_timeout, Duration::from_secs(60));
        assert_eq!(cfg.static_dir, PathBuf::from("static"));
        assert!(!cfg.strict_not_found);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.bind_address().port(), 19000);
    }

    #[test]
    fn reads_database_settings() {
        let cfg = config(&[
            ("DB_USER", "app"),
            ("DB_PASS", "s3cr:et@"),
            ("DB_NAME", "tododb"),
            ("DB_ADDR", "db.internal:3307"),
        ]);
        assert_eq!(cfg.db.user, "app");
        assert_eq!(cfg.db.name, "tododb");
        assert_eq!(split_addr(&cfg.db.addr), ("db.internal", 3307));
    }

    #[test]
    fn debug_hides_password() {
        let cfg = config(&[("DB_PASS", "hunter2")]);
        assert!(!format!("{:?}", cfg.db).contains("hunter2"));
    }

    #[test]
    fn addr_without_port_uses_default() {
        assert_eq!(split_addr("db"), ("db", 3306));
        assert_eq!(split_addr(""), ("localhost", 3306));
        assert_eq!(split_addr("db:notaport"), ("db:notaport", 3306));
    }

    #[test]
    fn flags_and_timeout() {
        let cfg = config(&[
            ("TODO_LOG_JSON", "TRUE"),
            ("TODO_STRICT_NOT_FOUND", "1"),
            ("TODO_SHUTDOWN_TIMEOUT_SECS", "12"),
            ("TODO_HTTP_TIMEOUT_SECS", "30"),
        ]);
        assert!(cfg.log_json);
        assert!(cfg.strict_not_found);
        assert_eq!(cfg.shutdown_timeout, Duration::from_secs(12));
        assert_eq!(cfg.http_timeout, Duration::from_secs(30));

        let cfg = config(&[
            ("TODO_SHUTDOWN_TIMEOUT_SECS", "soon"),
            ("TODO_HTTP_TIMEOUT_SECS", "-1"),
        ]);
        assert_eq!(cfg.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(cfg.http_timeout, Duration::from_secs(60));
    }

    #[test]
    fn sqlite_url_selects_sqlite() {
        let cfg = config(&[("DATABASE_URL", "sqlite://todos.db")]);
        assert_eq!(cfg.sqlite_url(), Some("sqlite://todos.db"));

        let cfg = config(&[("DATABASE_URL", "mysql://u:p@h/db")]);
        assert_eq!(cfg.sqlite_url(), None);
    }
}
