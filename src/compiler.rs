//! Descriptor compilation.
//!
//! Checks each descriptor against the [`FieldRegistry`] and renders it into a
//! clause fragment over physical columns, with generic `?` placeholders and
//! the matching arguments.

use crate::descriptor::{Filter, Group, Operator, Sort, SortDir};
use crate::error::{Operation, QueryError, QueryResult};
use crate::registry::{FieldConfig, FieldRegistry};
use crate::value::{json_type_name, Value};
use std::fmt;

/// A rendered WHERE condition and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub sql: String,
    pub args: Vec<Value>,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}

fn lookup<'r>(registry: &'r FieldRegistry, field: &str) -> QueryResult<&'r FieldConfig> {
    registry
        .lookup(field)
        .ok_or_else(|| QueryError::unknown_field(field))
}

fn permitted<'r>(
    registry: &'r FieldRegistry,
    field: &str,
    operation: Operation,
) -> QueryResult<&'r FieldConfig> {
    let config = lookup(registry, field)?;
    let allowed = match operation {
        Operation::Filter => config.allow_filter,
        Operation::Sort => config.allow_sort,
        Operation::Group => config.allow_group,
        Operation::Operator(_) => true,
    };
    if allowed {
        Ok(config)
    } else {
        Err(QueryError::not_allowed(field, operation))
    }
}

/// Narrow the raw JSON value of a filter into a bindable [`Value`].
///
/// Null checks ignore whatever value was sent.
pub fn validate_value(
    field: &str,
    operator: &Operator,
    raw: Option<&serde_json::Value>,
) -> QueryResult<Value> {
    if operator.is_null_check() {
        return Ok(Value::Null);
    }

    match raw {
        None | Some(serde_json::Value::Null) => Err(QueryError::value(field, "missing value")),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(_) | serde_json::Value::Number(_) => {
                    Value::from_json_scalar(item).ok_or_else(|| QueryError::Slice {
                        field: field.to_string(),
                        found: json_type_name(item),
                    })
                }
                other => Err(QueryError::Slice {
                    field: field.to_string(),
                    found: json_type_name(other),
                }),
            })
            .collect::<QueryResult<Vec<_>>>()
            .map(Value::List),
        Some(serde_json::Value::Object(_)) => Err(QueryError::value(
            field,
            "unsupported value of type object",
        )),
        Some(scalar) => Value::from_json_scalar(scalar).ok_or_else(|| {
            QueryError::value(
                field,
                format!("unsupported value of type {}", json_type_name(scalar)),
            )
        }),
    }
}

/// Compile one filter into a predicate.
pub fn compile_filter(registry: &FieldRegistry, filter: &Filter) -> QueryResult<Predicate> {
    let config = permitted(registry, &filter.field, Operation::Filter)?;

    let mut value = validate_value(&filter.field, &filter.operator, filter.value.as_ref())?;
    if !filter.operator.is_null_check() {
        if let Some(transform) = &config.transform {
            value = transform(value).map_err(|reason| QueryError::value(&filter.field, reason))?;
        }
    }

    let template = filter.operator.template().ok_or_else(|| {
        QueryError::not_allowed(
            &filter.field,
            Operation::Operator(filter.operator.as_str().to_string()),
        )
    })?;

    if value.is_list() {
        return Ok(Predicate {
            sql: format!("{} in (?)", config.column),
            args: vec![value],
        });
    }

    let args = if filter.operator.binds_value() {
        vec![value]
    } else {
        Vec::new()
    };

    Ok(Predicate {
        sql: format!("{} {}", config.column, template),
        args,
    })
}

pub fn compile_filters(registry: &FieldRegistry, filters: &[Filter]) -> QueryResult<Vec<Predicate>> {
    filters
        .iter()
        .map(|f| compile_filter(registry, f))
        .collect()
}

/// Join predicates with `and`, keeping argument order.
pub fn join_predicates(predicates: Vec<Predicate>) -> Predicate {
    let mut sql = Vec::with_capacity(predicates.len());
    let mut args = Vec::new();
    for predicate in predicates {
        sql.push(predicate.sql);
        args.extend(predicate.args);
    }
    Predicate {
        sql: sql.join(" and "),
        args,
    }
}

/// Compile one sort into `<column> asc|desc`.
pub fn compile_sort(registry: &FieldRegistry, sort: &Sort) -> QueryResult<String> {
    let config = permitted(registry, &sort.field, Operation::Sort)?;
    match &sort.dir {
        SortDir::Asc | SortDir::Desc => Ok(format!("{} {}", config.column, sort.dir.as_str())),
        SortDir::Unknown(dir) => Err(QueryError::Dir {
            field: sort.field.clone(),
            dir: dir.clone(),
        }),
    }
}

/// Compile sorts. Every entry is checked; only the first is rendered unless
/// `multi_column` is set.
pub fn compile_sorts(
    registry: &FieldRegistry,
    sorts: &[Sort],
    multi_column: bool,
) -> QueryResult<Vec<String>> {
    let mut columns = sorts
        .iter()
        .map(|s| compile_sort(registry, s))
        .collect::<QueryResult<Vec<_>>>()?;
    if !multi_column {
        columns.truncate(1);
    }
    Ok(columns)
}

pub fn compile_group(registry: &FieldRegistry, group: &Group) -> QueryResult<String> {
    permitted(registry, &group.field, Operation::Group).map(|c| c.column.clone())
}

/// Compile groups. Same first-only rule as [`compile_sorts`].
pub fn compile_groups(
    registry: &FieldRegistry,
    groups: &[Group],
    multi_column: bool,
) -> QueryResult<Vec<String>> {
    let mut columns = groups
        .iter()
        .map(|g| compile_group(registry, g))
        .collect::<QueryResult<Vec<_>>>()?;
    if !multi_column {
        columns.truncate(1);
    }
    Ok(columns)
}

/// Columns that must join GROUP BY because they are ordered on.
///
/// Empty unless both lists are non-empty. Every sort field must be sortable;
/// the first that is not fails the whole call. Columns already grouped, or
/// already added, are skipped.
pub fn reconcile_groups(
    registry: &FieldRegistry,
    groups: &[Group],
    sorts: &[Sort],
) -> QueryResult<Vec<String>> {
    if groups.is_empty() || sorts.is_empty() {
        return Ok(Vec::new());
    }

    let grouped: Vec<&str> = groups
        .iter()
        .filter_map(|g| registry.lookup(&g.field))
        .map(|c| c.column.as_str())
        .collect();

    let mut extra: Vec<String> = Vec::new();
    for sort in sorts {
        let config = permitted(registry, &sort.field, Operation::Sort)?;
        let column = config.column.as_str();
        if grouped.contains(&column) || extra.iter().any(|c| c == column) {
            continue;
        }
        extra.push(column.to_string());
    }

    Ok(extra)
}
