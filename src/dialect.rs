//! Bind-variable dialects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder syntax expected by a SQL engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Dialect {
    /// `?` (MySQL, SQLite). Also used for unknown names.
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
    /// `:arg1`, `:arg2`, ... (Oracle)
    Named,
    /// `@p1`, `@p2`, ... (SQL Server)
    At,
}

impl Dialect {
    /// Placeholder for the 1-based bind position `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Question => "?".to_string(),
            Dialect::Dollar => format!("${}", index),
            Dialect::Named => format!(":arg{}", index),
            Dialect::At => format!("@p{}", index),
        }
    }

    /// Dialect for a database driver name.
    pub fn from_driver(driver: &str) -> Self {
        match driver.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pgx" | "pq" | "pq-timeouts" | "cloudsqlpostgres"
            | "ql" | "nrpostgres" | "cockroach" => Dialect::Dollar,
            "mysql" | "mariadb" | "sqlite" | "sqlite3" | "nrmysql" | "nrsqlite3" => {
                Dialect::Question
            }
            "oci8" | "ora" | "goracle" | "godror" | "oracle" => Dialect::Named,
            "sqlserver" | "mssql" | "azuresql" => Dialect::At,
            _ => Dialect::Question,
        }
    }

    /// Dialect for a connection URL, judged by its scheme.
    pub fn from_url(url: &str) -> Self {
        match url.split_once(':') {
            Some((scheme, _)) => Self::from_driver(scheme),
            None => Dialect::Question,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Question => "question",
            Dialect::Dollar => "dollar",
            Dialect::Named => "named",
            Dialect::At => "at",
        }
    }
}

impl FromStr for Dialect {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "dollar" => Dialect::Dollar,
            "named" => Dialect::Named,
            "at" => Dialect::At,
            _ => Dialect::Question,
        })
    }
}

impl From<String> for Dialect {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl From<Dialect> for String {
    fn from(d: Dialect) -> Self {
        d.as_str().to_string()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
