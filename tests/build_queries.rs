use listquery::prelude::*;
use pretty_assertions::assert_eq;

fn users() -> FieldRegistry {
    FieldRegistry::builder()
        .field("name", FieldConfig::new("u.name").filterable().sortable())
        .field("a", FieldConfig::new("t.a").sortable().groupable())
        .field("b", FieldConfig::new("t.b").sortable())
        .field(
            "email",
            FieldConfig::new("u.email")
                .filterable()
                .with_transform(listquery::transform::lowercase()),
        )
        .field("secret", FieldConfig::new("u.secret"))
        .build()
}

fn no_paging(dialect: Dialect) -> QueryConfig {
    QueryConfig::builder().dialect(dialect).exclude_limit().build()
}

#[test]
fn test_eq_filter_question_and_dollar() {
    let request = QueryParams::parse(
        "filter=%5B%7B%22field%22%3A%22name%22%2C%22operator%22%3A%22eq%22%2C%22value%22%3A%22bob%22%7D%5D",
    );

    let (sql, args) = build_data_query("select * from u", &request, &users(), &no_paging(Dialect::Question)).unwrap();
    assert_eq!(sql, "select * from u where u.name = ?");
    assert_eq!(args, vec![Value::from("bob")]);

    let (sql, args) = build_data_query("select * from u", &request, &users(), &no_paging(Dialect::Dollar)).unwrap();
    assert_eq!(sql, "select * from u where u.name = $1");
    assert_eq!(args, vec![Value::from("bob")]);
}

#[test]
fn test_list_value_expands_in_clause() {
    let request = vec![(
        "filter",
        r#"[{"field":"name","operator":"eq","value":["bob","ann"]}]"#,
    )];

    let (sql, args) = build_data_query("select * from u", &request, &users(), &no_paging(Dialect::Question)).unwrap();
    assert_eq!(sql, "select * from u where u.name in (?, ?)");
    assert_eq!(args, vec![Value::from("bob"), Value::from("ann")]);

    let (sql, _) = build_data_query("select * from u", &request, &users(), &no_paging(Dialect::Dollar)).unwrap();
    assert_eq!(sql, "select * from u where u.name in ($1, $2)");
}

#[test]
fn test_limit_is_clamped_to_config() {
    let request = vec![("limit", "500")];
    let config = QueryConfig::builder().limit(100).build();
    let (sql, args) = build_data_query("select * from u", &request, &users(), &config).unwrap();
    assert_eq!(sql, "select * from u limit ? offset ?");
    assert_eq!(args, vec![Value::Int(100), Value::Int(0)]);
}

#[test]
fn test_group_reconciled_with_sorts() {
    let request = vec![
        ("group", r#"[{"field":"a"}]"#),
        ("sort", r#"[{"field":"b","dir":"asc"},{"field":"a","dir":"desc"}]"#),
    ];
    let (sql, _) = build_data_query("select t.a, t.b from t", &request, &users(), &no_paging(Dialect::Question)).unwrap();
    assert_eq!(
        sql,
        "select t.a, t.b from t group by t.a, t.b order by t.b asc, t.a desc"
    );
}

#[test]
fn test_existing_where_gets_and() {
    let request = vec![("filter", r#"[{"field":"name","operator":"neq","value":"x"}]"#)];
    let (sql, _) = build_data_query(
        "select * from u where u.active = true",
        &request,
        &users(),
        &no_paging(Dialect::Question),
    )
    .unwrap();
    assert_eq!(sql, "select * from u where u.active = true and u.name != ?");

    // A WHERE inside a subquery does not count
    let (sql, _) = build_data_query(
        "select * from (select * from u where u.active = true) s",
        &request,
        &users(),
        &no_paging(Dialect::Question),
    )
    .unwrap();
    assert_eq!(
        sql,
        "select * from (select * from u where u.active = true) s where u.name != ?"
    );
}

#[test]
fn test_permissions_are_enforced() {
    let config = QueryConfig::default();

    let request = vec![("filter", r#"[{"field":"secret","operator":"eq","value":1}]"#)];
    let err = build_data_query("select * from u", &request, &users(), &config).unwrap_err();
    assert_eq!(err, QueryError::not_allowed("secret", Operation::Filter));
    assert_eq!(err.status_code(), 403);

    let request = vec![("sort", r#"[{"field":"nope"}]"#)];
    let err = build_data_query("select * from u", &request, &users(), &config).unwrap_err();
    assert_eq!(err, QueryError::unknown_field("nope"));
    assert_eq!(err.status_code(), 400);

    let request = vec![("group", r#"[{"field":"name"}]"#)];
    let err = build_count_query("select count(*) from u", &request, &users(), &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Operation);
}

#[test]
fn test_transform_runs_before_binding() {
    let request = vec![("filter", r#"[{"field":"email","operator":"contains","value":"Bob@X"}]"#)];
    let (sql, args) = build_data_query("select * from u", &request, &users(), &no_paging(Dialect::At)).unwrap();
    assert_eq!(sql, "select * from u where u.email ilike '%' || @p1 || '%'");
    assert_eq!(args, vec![Value::from("bob@x")]);
}

#[test]
fn test_question_round_trip_is_stable() {
    let sql = "select * from u where a = ? and b in (?, ?)";
    assert_eq!(rebind(Dialect::Question, sql), sql);
}

#[test]
fn test_list_query_data_and_count_agree_on_filters() {
    let handle = ListQuery::new(users(), QueryConfig::default());
    let request = vec![
        ("filter", r#"[{"field":"name","operator":"startswith","value":"a"}]"#),
        ("sort", r#"[{"field":"name","dir":"DESC"}]"#),
        ("offset", "10"),
    ];

    let (data, data_args) = handle.data("select * from u", &request).unwrap();
    let (count, count_args) = handle.count("select count(*) from u", &request).unwrap();

    assert_eq!(
        data,
        "select * from u where u.name ilike ? || '%' order by u.name desc limit ? offset ?"
    );
    assert_eq!(data_args, vec![Value::from("a"), Value::Int(100), Value::Int(10)]);
    assert_eq!(count, "select count(*) from u where u.name ilike ? || '%'");
    assert_eq!(count_args, vec![Value::from("a")]);
}

#[test]
fn test_filter_joins_existing_where_ahead_of_group_by() {
    let request = vec![
        ("filter", r#"[{"field":"name","operator":"eq","value":"bob"}]"#),
        ("group", r#"[{"field":"a"}]"#),
    ];
    let (sql, args) = build_data_query(
        "select t.a, count(*) from t where t.active group by t.b;",
        &request,
        &users(),
        &QueryConfig::default(),
    )
    .unwrap();
    assert_eq!(
        sql,
        "select t.a, count(*) from t where t.active and u.name = ? group by t.b, t.a limit ? offset ?"
    );
    assert_eq!(args, vec![Value::from("bob"), Value::Int(100), Value::Int(0)]);
}

#[test]
fn test_base_order_and_limit_are_respected() {
    let request = vec![
        ("filter", r#"[{"field":"name","operator":"neq","value":"x"}]"#),
        ("sort", r#"[{"field":"b","dir":"desc"}]"#),
        ("limit", "20"),
    ];
    let (sql, args) = build_data_query(
        "select * from t order by t.id limit 10",
        &request,
        &users(),
        &QueryConfig::default(),
    )
    .unwrap();
    assert_eq!(
        sql,
        "select * from t where u.name != ? order by t.id, t.b desc limit 10"
    );
    assert_eq!(args, vec![Value::from("x")]);
}
