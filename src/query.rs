//! Data and count query entry points.
//!
//! Both decode the request's descriptors, check them against the registry,
//! assemble clauses onto the base query and rebind for the configured
//! dialect. The first error aborts the build; nothing is partially applied
//! and no database is touched.

use crate::builder::SelectBuilder;
use crate::compiler::{compile_filters, compile_groups, compile_sorts, reconcile_groups};
use crate::config::QueryConfig;
use crate::decoder::{decode_filters, decode_groups, decode_sorts, FormValues};
use crate::descriptor::{Filter, Group, Sort};
use crate::error::{QueryError, QueryResult};
use crate::registry::FieldRegistry;
use crate::value::Value;
use std::sync::Arc;

/// Final query text and its arguments in placeholder order.
pub type BuiltQuery = (String, Vec<Value>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Data,
    Count,
}

/// Descriptors taken from one request.
#[derive(Debug, Default)]
struct RequestDescriptors {
    filters: Vec<Filter>,
    sorts: Vec<Sort>,
    groups: Vec<Group>,
}

impl RequestDescriptors {
    fn decode<R: FormValues + ?Sized>(request: &R, config: &QueryConfig) -> QueryResult<Self> {
        let filters = decode_filters(request, &config.filter_param)?;
        let groups = decode_groups(request, &config.group_param)?;
        // Count queries still need the sorts to reconcile GROUP BY
        let sorts = decode_sorts(request, &config.order_param)?;
        Ok(Self {
            filters,
            sorts,
            groups,
        })
    }
}

/// Build the paged data query for `request`.
pub fn build_data_query<R: FormValues + ?Sized>(
    base: &str,
    request: &R,
    registry: &FieldRegistry,
    config: &QueryConfig,
) -> QueryResult<BuiltQuery> {
    build(base, request, registry, config, Mode::Data)
}

/// Build the matching count query: same filters and grouping, no ORDER BY
/// and no LIMIT/OFFSET.
pub fn build_count_query<R: FormValues + ?Sized>(
    base: &str,
    request: &R,
    registry: &FieldRegistry,
    config: &QueryConfig,
) -> QueryResult<BuiltQuery> {
    build(base, request, registry, config, Mode::Count)
}

fn build<R: FormValues + ?Sized>(
    base: &str,
    request: &R,
    registry: &FieldRegistry,
    config: &QueryConfig,
    mode: Mode,
) -> QueryResult<BuiltQuery> {
    let client = RequestDescriptors::decode(request, config)?;
    let prepend = &config.prepend;

    let mut builder = SelectBuilder::new(base)
        .dialect(config.dialect)
        .predicates(compile_filters(registry, &prepend.filters)?)
        .predicates(compile_filters(registry, &client.filters)?);

    // GROUP BY: server groups always render in full, client groups obey the
    // multi-column switch
    let mut group_columns = compile_groups(registry, &prepend.groups, true)?;
    group_columns.extend(compile_groups(registry, &client.groups, config.multi_column_group)?);

    let rendered_groups = rendered(&prepend.groups, &client.groups, config.multi_column_group);
    let rendered_sorts = rendered(&prepend.sorts, &client.sorts, config.multi_column_order);

    if !config.exclude.reconciliation {
        group_columns.extend(reconcile_groups(registry, &rendered_groups, &rendered_sorts)?);
    }
    builder = builder.group_by_all(&group_columns);

    if mode == Mode::Data {
        let mut sort_columns = compile_sorts(registry, &prepend.sorts, true)?;
        sort_columns.extend(compile_sorts(registry, &client.sorts, config.multi_column_order)?);
        builder = builder.order_by_all(&sort_columns);

        if builder.has_limit() {
            tracing::debug!("base query has its own limit; paging skipped");
        } else if !config.exclude.limit {
            let (limit, offset) = paging(request, config)?;
            builder = builder.limit(limit, offset);
        }
    }

    let (sql, args) = builder.render()?;
    tracing::debug!(
        sql = %sql,
        args = args.len(),
        count = mode == Mode::Count,
        "built list query"
    );
    Ok((sql, args))
}

/// Server descriptors in full, then the client's (first only unless
/// `multi_column`).
fn rendered<T: Clone>(server: &[T], client: &[T], multi_column: bool) -> Vec<T> {
    let take = if multi_column { client.len() } else { client.len().min(1) };
    server.iter().chain(&client[..take]).cloned().collect()
}

/// Requested limit and offset, defaulted and clamped by the config.
///
/// An explicit `limit=0` means "no preference" and gets the default page size.
pub fn paging<R: FormValues + ?Sized>(request: &R, config: &QueryConfig) -> QueryResult<(u64, u64)> {
    let limit = match read_u64(request, &config.limit_param)? {
        Some(0) | None => config.limit,
        Some(n) => n.min(config.limit),
    };
    let offset = read_u64(request, &config.offset_param)?.unwrap_or(config.offset);
    Ok((limit, offset))
}

fn read_u64<R: FormValues + ?Sized>(request: &R, param: &str) -> QueryResult<Option<u64>> {
    let raw = request.form_value(param);
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u64>().map(Some).map_err(|_| {
        QueryError::value(param, format!("'{}' is not a non-negative integer", raw))
    })
}

/// A registry and config pair shared by the handlers of one endpoint.
#[derive(Debug, Clone)]
pub struct ListQuery {
    registry: Arc<FieldRegistry>,
    config: Arc<QueryConfig>,
}

impl ListQuery {
    pub fn new(registry: impl Into<Arc<FieldRegistry>>, config: impl Into<Arc<QueryConfig>>) -> Self {
        Self {
            registry: registry.into(),
            config: config.into(),
        }
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn data<R: FormValues + ?Sized>(&self, base: &str, request: &R) -> QueryResult<BuiltQuery> {
        build_data_query(base, request, &self.registry, &self.config)
    }

    pub fn count<R: FormValues + ?Sized>(&self, base: &str, request: &R) -> QueryResult<BuiltQuery> {
        build_count_query(base, request, &self.registry, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Operator;
    use crate::dialect::Dialect;
    use crate::error::{ErrorKind, Operation};
    use crate::registry::FieldConfig;
    use pretty_assertions::assert_eq;

    fn registry() -> FieldRegistry {
        FieldRegistry::builder()
            .field("name", FieldConfig::new("u.name").filterable().sortable())
            .field("age", FieldConfig::new("u.age").filterable().sortable().groupable())
            .field("team", FieldConfig::new("u.team").filterable().groupable())
            .field("deleted", FieldConfig::new("u.deleted_at").filterable())
            .build()
    }

    #[test]
    fn test_empty_request_gets_default_paging() {
        let request: Vec<(&str, &str)> = vec![];
        let (sql, args) =
            build_data_query("select * from u", &request, &registry(), &QueryConfig::default()).unwrap();
        assert_eq!(sql, "select * from u limit ? offset ?");
        assert_eq!(args, vec![Value::Int(100), Value::Int(0)]);
    }

    #[test]
    fn test_full_data_query() {
        let request = vec![
            ("filter", r#"[{"field":"name","operator":"startswith","value":"a"}]"#),
            ("sort", r#"[{"field":"age","dir":"desc"}]"#),
            ("limit", "20"),
            ("offset", "40"),
        ];
        let config = QueryConfig::builder().dialect(Dialect::Dollar).build();
        let (sql, args) = build_data_query("select * from u", &request, &registry(), &config).unwrap();
        assert_eq!(
            sql,
            "select * from u where u.name ilike $1 || '%' order by u.age desc limit $2 offset $3"
        );
        assert_eq!(args, vec![Value::from("a"), Value::Int(20), Value::Int(40)]);
    }

    #[test]
    fn test_prepend_renders_first() {
        let request = vec![
            ("filter", r#"[{"field":"name","operator":"eq","value":"x"}]"#),
            ("sort", r#"[{"field":"name"}]"#),
        ];
        let config = QueryConfig::builder()
            .prepend_filter(Filter::unary("deleted", Operator::IsNull))
            .prepend_sort(Sort::desc("age"))
            .exclude_limit()
            .build();
        let (sql, args) = build_data_query("select * from u", &request, &registry(), &config).unwrap();
        assert_eq!(
            sql,
            "select * from u where u.deleted_at is null and u.name = ? order by u.age desc, u.name asc"
        );
        assert_eq!(args, vec![Value::from("x")]);
    }

    #[test]
    fn test_count_query_skips_order_and_paging() {
        let request = vec![
            ("filter", r#"[{"field":"age","operator":"gte","value":18}]"#),
            ("sort", r#"[{"field":"name","dir":"asc"}]"#),
            ("group", r#"[{"field":"team"}]"#),
            ("limit", "5"),
        ];
        let (sql, args) = build_count_query(
            "select u.team, count(*) from u",
            &request,
            &registry(),
            &QueryConfig::default(),
        )
        .unwrap();
        assert_eq!(
            sql,
            "select u.team, count(*) from u where u.age >= ? group by u.team, u.name"
        );
        assert_eq!(args, vec![Value::Int(18)]);
    }

    #[test]
    fn test_reconciliation_can_be_excluded() {
        let request = vec![
            ("sort", r#"[{"field":"name"}]"#),
            ("group", r#"[{"field":"team"}]"#),
        ];
        let config = QueryConfig::builder().exclude_reconciliation().build();
        let (sql, _) = build_count_query("select count(*) from u", &request, &registry(), &config).unwrap();
        assert_eq!(sql, "select count(*) from u group by u.team");
    }

    #[test]
    fn test_single_column_order_and_group() {
        let request = vec![
            ("sort", r#"[{"field":"age"},{"field":"name","dir":"desc"}]"#),
            ("group", r#"[{"field":"age"},{"field":"team"}]"#),
        ];
        let config = QueryConfig::builder()
            .multi_column_order(false)
            .multi_column_group(false)
            .exclude_limit()
            .build();
        let (sql, _) = build_data_query("select u.age from u", &request, &registry(), &config).unwrap();
        assert_eq!(sql, "select u.age from u group by u.age order by u.age asc");
    }

    #[test]
    fn test_limit_clamp_and_validation() {
        let config = QueryConfig::builder().limit(100).build();
        assert_eq!(paging(&vec![("limit", "500")], &config).unwrap(), (100, 0));
        assert_eq!(paging(&vec![("offset", "7")], &config).unwrap(), (100, 7));

        let err = paging(&vec![("limit", "-1")], &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
        assert_eq!(err.field(), Some("limit"));
    }

    #[test]
    fn test_zero_limit_gets_default_page_size() {
        let config = QueryConfig::builder().limit(50).build();
        assert_eq!(paging(&vec![("limit", "0"), ("offset", "7")], &config).unwrap(), (50, 7));
    }

    #[test]
    fn test_base_with_group_and_limit() {
        let request = vec![
            ("filter", r#"[{"field":"name","operator":"eq","value":"bob"}]"#),
            ("limit", "not a number"),
        ];
        let (sql, args) = build_data_query(
            "select u.team, count(*) from u where u.active group by u.team limit 5;",
            &request,
            &registry(),
            &QueryConfig::default(),
        )
        .unwrap();
        assert_eq!(
            sql,
            "select u.team, count(*) from u where u.active and u.name = ? group by u.team limit 5"
        );
        assert_eq!(args, vec![Value::from("bob")]);
    }

    #[test]
    fn test_errors_abort_build() {
        let request = vec![("filter", r#"[{"field":"age","operator":"eq","value":1}]"#), ("sort", "[{")];
        let err = build_data_query("select * from u", &request, &registry(), &QueryConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);

        let request = vec![
            ("sort", r#"[{"field":"team"}]"#),
            ("group", r#"[{"field":"age"}]"#),
        ];
        let err = build_count_query("select count(*) from u", &request, &registry(), &QueryConfig::default())
            .unwrap_err();
        assert_eq!(err, QueryError::not_allowed("team", Operation::Sort));
    }

    #[test]
    fn test_list_query_handle() {
        let handle = ListQuery::new(registry(), QueryConfig::builder().exclude_limit().build());
        let request = vec![("filter", r#"[{"field":"team","operator":"eq","value":["a","b"]}]"#)];
        let (sql, args) = handle.data("select * from u", &request).unwrap();
        assert_eq!(sql, "select * from u where u.team in (?, ?)");
        assert_eq!(args, vec![Value::from("a"), Value::from("b")]);
    }
}
