//! Clause assembly over a base query.
//!
//! The base query is scanned once for its top-level clauses. From then on
//! explicit flags decide whether an insertion opens a clause (`where`,
//! `group by`, `order by`) or continues it (`and`, `,`), and each fragment is
//! spliced in at the end of its own clause, ahead of any later one.

use crate::compiler::Predicate;
use crate::dialect::Dialect;
use crate::error::QueryResult;
use crate::lexer::{scan_clauses, tokenize, Clause, ClauseScan};
use crate::rebind;
use crate::value::Value;

/// Per-build clause state. Never shared between builds.
#[derive(Debug, Clone, Default)]
struct BuildState {
    has_where: bool,
    has_group: bool,
    has_order: bool,
    where_sql: String,
    where_args: Vec<Value>,
    group_sql: String,
    order_sql: String,
    limit: Option<(u64, u64)>,
}

impl BuildState {
    fn from_scan(scan: &ClauseScan) -> Self {
        Self {
            has_where: scan.has_where,
            has_group: scan.has_group,
            has_order: scan.has_order,
            ..Self::default()
        }
    }

    fn push_where(&mut self, sql: &str) {
        self.where_sql
            .push_str(if self.has_where { " and " } else { " where " });
        self.has_where = true;
        self.where_sql.push_str(sql);
    }

    fn push_group(&mut self, column: &str) {
        self.group_sql
            .push_str(if self.has_group { ", " } else { " group by " });
        self.has_group = true;
        self.group_sql.push_str(column);
    }

    fn push_order(&mut self, column: &str) {
        self.order_sql
            .push_str(if self.has_order { ", " } else { " order by " });
        self.has_order = true;
        self.order_sql.push_str(column);
    }
}

/// Fluent SELECT builder.
///
/// ```
/// use listquery::builder::SelectBuilder;
/// use listquery::Dialect;
///
/// let (sql, args) = SelectBuilder::new("select * from u")
///     .filter("u.name = ?", vec!["bob".into()])
///     .order_by("u.id desc")
///     .limit(20, 40)
///     .dialect(Dialect::Dollar)
///     .render()
///     .unwrap();
///
/// assert_eq!(sql, "select * from u where u.name = $1 order by u.id desc limit $2 offset $3");
/// assert_eq!(args.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    base: String,
    layout: ClauseScan,
    state: BuildState,
    dialect: Dialect,
}

impl SelectBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        let layout = scan_clauses(&base);
        let state = BuildState::from_scan(&layout);
        Self {
            base,
            layout,
            state,
            dialect: Dialect::default(),
        }
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// AND a condition onto WHERE. `args` bind its `?` placeholders in order.
    pub fn filter(mut self, sql: &str, args: Vec<Value>) -> Self {
        self.state.push_where(sql);
        self.state.where_args.extend(args);
        self
    }

    pub fn predicate(self, predicate: Predicate) -> Self {
        self.filter(&predicate.sql, predicate.args)
    }

    pub fn predicates(self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        predicates.into_iter().fold(self, Self::predicate)
    }

    pub fn group_by(mut self, column: &str) -> Self {
        self.state.push_group(column);
        self
    }

    pub fn group_by_all<S: AsRef<str>>(self, columns: impl IntoIterator<Item = S>) -> Self {
        columns
            .into_iter()
            .fold(self, |b, c| b.group_by(c.as_ref()))
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.state.push_order(column);
        self
    }

    pub fn order_by_all<S: AsRef<str>>(self, columns: impl IntoIterator<Item = S>) -> Self {
        columns
            .into_iter()
            .fold(self, |b, c| b.order_by(c.as_ref()))
    }

    /// Append `limit ? offset ?`. A later call replaces the earlier values.
    /// Ignored when the base query already has a top-level LIMIT or OFFSET.
    pub fn limit(mut self, limit: u64, offset: u64) -> Self {
        self.state.limit = Some((limit, offset));
        self
    }

    pub fn has_where(&self) -> bool {
        self.state.has_where
    }

    pub fn has_group(&self) -> bool {
        self.state.has_group
    }

    pub fn has_order(&self) -> bool {
        self.state.has_order
    }

    /// Whether the base query has its own top-level LIMIT or OFFSET.
    pub fn has_limit(&self) -> bool {
        self.layout.has_limit
    }

    /// Query text with generic `?` placeholders, and its arguments.
    ///
    /// A trailing `;` on the base query is dropped.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let state = &self.state;
        let layout = &self.layout;
        let paging = state.limit.filter(|_| !layout.has_limit);
        let limit_sql = if paging.is_some() { " limit ? offset ?" } else { "" };

        let fragments = [
            (layout.insertion_point(Clause::Where), state.where_sql.as_str()),
            (layout.insertion_point(Clause::GroupBy), state.group_sql.as_str()),
            (layout.insertion_point(Clause::OrderBy), state.order_sql.as_str()),
            (layout.insertion_point(Clause::Offset), limit_sql),
        ];

        let mut sql = String::with_capacity(
            self.base.len() + state.where_sql.len() + state.group_sql.len() + state.order_sql.len() + 24,
        );
        let mut cursor = 0;
        for (at, fragment) in fragments {
            let at = at.max(cursor);
            sql.push_str(&self.base[cursor..at]);
            sql.push_str(fragment);
            cursor = at;
        }
        sql.push_str(&self.base[cursor..layout.end]);
        sql.push_str(trailer(&self.base[layout.end..]).trim_end());

        let mut args = state.where_args.clone();
        if let Some((limit, offset)) = paging {
            args.push(Value::from(limit));
            args.push(Value::from(offset));
        }

        (sql, args)
    }

    /// Final text for the configured dialect, with list arguments expanded.
    pub fn render(&self) -> QueryResult<(String, Vec<Value>)> {
        let (sql, args) = self.to_sql();
        rebind::prepare(self.dialect, &sql, args)
    }
}

/// Comments and whitespace after the last statement token, without `;`.
fn trailer(rest: &str) -> String {
    tokenize(rest)
        .into_iter()
        .filter(|t| t.text != ";")
        .map(|t| t.text)
        .collect()
}
