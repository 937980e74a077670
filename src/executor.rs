//! Execution wrappers over sqlx's `Any` driver.
//!
//! The builders never reach this module; these helpers take their output,
//! bind it and run it.

use crate::decoder::FormValues;
use crate::dialect::Dialect;
use crate::error::QueryError;
use crate::query::ListQuery;
use crate::value::Value;

use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column, Row, TypeInfo};
use thiserror::Error;

/// Error from building or running a query.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Build(#[from] QueryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One result row keyed by column name.
pub type JsonRow = serde_json::Map<String, serde_json::Value>;

/// Connect a small pool and pick the dialect from the URL scheme.
///
/// ```rust,ignore
/// let (pool, dialect) = connect("postgres://localhost/app").await?;
/// assert_eq!(dialect, Dialect::Dollar);
/// ```
pub async fn connect(url: &str) -> Result<(AnyPool, Dialect), ExecuteError> {
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await?;

    Ok((pool, Dialect::from_url(url)))
}

/// Bind arguments in placeholder order. Lists must already be expanded.
pub fn bind_args<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    args: &[Value],
) -> Result<Query<'q, Any, AnyArguments<'q>>, ExecuteError> {
    for arg in args {
        query = match arg {
            Value::Null => query.bind(None::<String>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::String(v) => query.bind(v.clone()),
            Value::Bytes(v) => query.bind(v.clone()),
            Value::List(_) => {
                return Err(QueryError::rebind("list argument was not expanded before binding").into());
            }
        };
    }
    Ok(query)
}

/// Run `sql` and return every row as a JSON object.
pub async fn fetch_rows(pool: &AnyPool, sql: &str, args: &[Value]) -> Result<Vec<JsonRow>, ExecuteError> {
    let query = bind_args(sqlx::query(sql), args)?;
    let rows: Vec<AnyRow> = query.fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_map).collect())
}

/// Build the data query for `request` and fetch its rows.
pub async fn fetch_page<R: FormValues + ?Sized>(
    pool: &AnyPool,
    list: &ListQuery,
    base: &str,
    request: &R,
) -> Result<Vec<JsonRow>, ExecuteError> {
    let (sql, args) = list.data(base, request)?;
    fetch_rows(pool, &sql, &args).await
}

/// Build the count query for `request` and read the first column of its
/// first row.
pub async fn fetch_count<R: FormValues + ?Sized>(
    pool: &AnyPool,
    list: &ListQuery,
    base: &str,
    request: &R,
) -> Result<i64, ExecuteError> {
    let (sql, args) = list.count(base, request)?;
    let query = bind_args(sqlx::query(&sql), &args)?;
    let row = query.fetch_one(pool).await?;
    Ok(row.try_get::<i64, _>(0)?)
}

/// Convert an AnyRow to a JSON object.
fn row_to_map(row: &AnyRow) -> JsonRow {
    let mut map = JsonRow::new();

    for (i, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();
        let type_name = column.type_info().name();

        let value: serde_json::Value = match type_name {
            "BOOL" | "BOOLEAN" => row
                .try_get::<bool, _>(i)
                .map(serde_json::Value::Bool)
                .unwrap_or(serde_json::Value::Null),
            "INT2" | "INT4" | "INT8" | "INTEGER" | "BIGINT" | "SMALLINT" => row
                .try_get::<i64, _>(i)
                .map(|v| serde_json::Value::Number(v.into()))
                .unwrap_or(serde_json::Value::Null),
            "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE" => row
                .try_get::<f64, _>(i)
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            _ => row
                .try_get::<String, _>(i)
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
        };

        map.insert(name, value);
    }

    map
}
