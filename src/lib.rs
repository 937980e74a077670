//! # listquery
//!
//! > **Paging, filtering, sorting and grouping for list endpoints, without
//! > letting clients write SQL.**
//!
//! Clients send JSON descriptors in request parameters. The server owns a
//! [`FieldRegistry`] saying which logical fields exist, which column each maps
//! to and what may be done with it. Descriptors are checked against the
//! registry and compiled into parameterized SQL for the target dialect.
//!
//! ## Quick Example
//!
//! ```
//! use listquery::prelude::*;
//!
//! let registry = FieldRegistry::builder()
//!     .field("name", FieldConfig::new("u.name").filterable().sortable())
//!     .build();
//! let config = QueryConfig::builder()
//!     .dialect(Dialect::Dollar)
//!     .exclude_limit()
//!     .build();
//!
//! let request = QueryParams::parse(
//!     r#"filter=[{"field":"name","operator":"eq","value":["bob","ann"]}]"#,
//! );
//! let (sql, args) = build_data_query("select * from u", &request, &registry, &config)?;
//!
//! assert_eq!(sql, "select * from u where u.name in ($1, $2)");
//! assert_eq!(args, vec![Value::from("bob"), Value::from("ann")]);
//! # Ok::<(), listquery::QueryError>(())
//! ```
//!
//! ## Operators
//!
//! | Operator         | SQL                              |
//! |------------------|----------------------------------|
//! | `eq` / `neq`     | `col = ?` / `col != ?`           |
//! | `startswith`     | `col ilike ? \|\| '%'`           |
//! | `endswith`       | `col ilike '%' \|\| ?`           |
//! | `contains`       | `col ilike '%' \|\| ? \|\| '%'`  |
//! | `doesnotcontain` | `col not ilike '%' \|\| ? \|\| '%'` |
//! | `isnull`         | `col is null`                    |
//! | `isempty`        | `col = ''`                       |
//! | `lt` ... `gte`   | `col < ?` ... `col >= ?`         |
//!
//! A list value always compiles to `col in (?)` and is expanded to one
//! placeholder per element when the query is rendered.

pub mod builder;
pub mod compiler;
pub mod config;
pub mod decoder;
pub mod descriptor;
pub mod dialect;
pub mod error;
#[cfg(feature = "sqlx")]
pub mod executor;
pub mod lexer;
pub mod query;
pub mod rebind;
pub mod registry;
pub mod transform;
pub mod value;

pub use config::QueryConfig;
pub use dialect::Dialect;
pub use error::{ErrorKind, Operation, QueryError, QueryResult};
pub use query::{build_count_query, build_data_query, BuiltQuery, ListQuery};
pub use registry::{FieldConfig, FieldRegistry};
pub use value::Value;

pub mod prelude {
    pub use crate::builder::SelectBuilder;
    pub use crate::config::QueryConfig;
    pub use crate::decoder::{FormValues, QueryParams};
    pub use crate::descriptor::{Filter, Group, Operator, Sort, SortDir};
    pub use crate::dialect::Dialect;
    pub use crate::error::*;
    pub use crate::query::{build_count_query, build_data_query, ListQuery};
    pub use crate::rebind::{expand_in, prepare, rebind};
    pub use crate::registry::{FieldConfig, FieldRegistry};
    pub use crate::value::Value;
}

/// Expand list arguments and rebind a hand-written query in one step.
///
/// # Example
///
/// ```
/// use listquery::{rebind_query, Dialect, Value};
///
/// let (sql, args) = rebind_query(
///     Dialect::Dollar,
///     "select * from t where id in (?) and kind = ?",
///     vec![Value::List(vec![1.into(), 2.into()]), "a".into()],
/// )
/// .unwrap();
/// assert_eq!(sql, "select * from t where id in ($1, $2) and kind = $3");
/// assert_eq!(args.len(), 3);
/// ```
pub fn rebind_query(
    dialect: Dialect,
    query: &str,
    args: Vec<Value>,
) -> Result<(String, Vec<Value>), QueryError> {
    rebind::prepare(dialect, query, args)
}
