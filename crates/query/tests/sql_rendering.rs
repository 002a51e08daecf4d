use dynfields_core::{FieldDefinition, FieldKind, FieldType};
use dynfields_query::{FieldFinder, FieldQuery, SqlConfig};
use serde_json::{json, Value};

fn field(id: &str, ty: FieldType) -> FieldDefinition {
    FieldDefinition::new("f", "Author", FieldKind::unconstrained(ty)).with_id(id)
}

#[test]
fn unconstrained_query_renders_nothing() {
    assert!(FieldQuery::new("Author").to_sql(&SqlConfig::default()).is_none());
}

#[test]
fn scalar_comparison() {
    let age = field("f1", FieldType::Integer);
    let query = FieldQuery::new("Author").with(age.finder().search("gt", Some(&json!("3"))).unwrap());
    let sql = query.to_sql(&SqlConfig::default()).unwrap();
    assert_eq!(
        sql.text,
        "WITH \"field_values_0\" AS (SELECT \"host_id\", \"value\" FROM \"custom_field_values\" \
         WHERE \"field_id\" = $1 AND \"host_type\" = $2)\n\
         SELECT \"host_id\" FROM \"field_values_0\" WHERE (\"value\" #>> '{}')::bigint > $3::bigint"
    );
    assert_eq!(sql.params, vec![json!("f1"), json!("Author"), json!(3)]);
}

#[test]
fn conditions_intersect_with_their_own_ctes() {
    let age = field("f1", FieldType::Integer);
    let name = field("f2", FieldType::Text);
    let query = FieldQuery::new("Author")
        .with(age.finder().search("eq", None).unwrap())
        .with(name.finder().search("!^", Some(&json!("a_b"))).unwrap());
    let sql = query.to_sql(&SqlConfig::default()).unwrap();

    let lines: Vec<&str> = sql.text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("WITH \"field_values_0\" AS ("));
    assert!(lines[1].starts_with("\"field_values_1\" AS ("));
    assert_eq!(
        lines[2],
        "SELECT \"host_id\" FROM \"field_values_0\" WHERE (\"value\" #>> '{}') IS NULL"
    );
    assert_eq!(lines[3], "INTERSECT");
    assert_eq!(
        lines[4],
        "SELECT \"host_id\" FROM \"field_values_1\" WHERE \
         (NOT ((\"value\" #>> '{}') LIKE $5) OR (\"value\" #>> '{}') IS NULL)"
    );
    assert_eq!(
        sql.params,
        vec![
            json!("f1"),
            json!("Author"),
            json!("f2"),
            json!("Author"),
            json!("a\\_b%"),
        ]
    );
}

#[test]
fn array_quantifiers_use_jsonpath() {
    let at = field("f1", FieldType::DateTimeArray);
    let cond = at
        .finder()
        .search("any_gt", Some(&json!("2024-01-01")))
        .unwrap();
    let sql = FieldQuery::new("Author").with(cond).to_sql(&SqlConfig::default()).unwrap();
    assert!(sql.text.ends_with(
        "COALESCE(jsonb_path_exists_tz(\"value\", '$[*] ? (@.datetime() > $value.datetime())', \
         jsonb_build_object('value', $3::jsonb)), FALSE)"
    ));
    assert_eq!(sql.params[2], json!("\"2024-01-01T00:00:00.000000Z\""));

    let scores = field("f2", FieldType::IntegerArray);
    let cond = scores.finder().search("&>=", Some(&json!(5))).unwrap();
    let sql = FieldQuery::new("Author").with(cond).to_sql(&SqlConfig::default()).unwrap();
    let len = "(CASE WHEN jsonb_typeof(\"value\") = 'array' THEN jsonb_array_length(\"value\") END)";
    assert!(sql.text.ends_with(&format!(
        "({len} > 0 AND {len} = jsonb_array_length(jsonb_path_query_array(\"value\", \
         '$[*] ? (@ >= $value)', jsonb_build_object('value', $3::jsonb))))"
    )));
    assert_eq!(sql.params[2], json!("5"));
}

#[test]
fn decimal_arrays_compare_as_double_while_scalars_stay_numeric() {
    let prices = field("f1", FieldType::DecimalArray);
    let cond = prices.finder().search("any_lt", Some(&json!("2.50"))).unwrap();
    let sql = FieldQuery::new("Author").with(cond).to_sql(&SqlConfig::default()).unwrap();
    assert!(sql.text.contains("'$[*] ? (@.double() < $value.double())'"));
    assert_eq!(sql.params[2], json!("\"2.5\""));

    let price = field("f2", FieldType::Decimal);
    let cond = price.finder().search("lt", Some(&json!("2.50"))).unwrap();
    let sql = FieldQuery::new("Author").with(cond).to_sql(&SqlConfig::default()).unwrap();
    assert!(sql.text.ends_with("::numeric < $3::numeric"));
}

#[test]
fn size_and_configured_names() {
    let config = SqlConfig {
        values_table: "cf \"values\"".into(),
        value_column: "payload".into(),
        cte_prefix: "c".into(),
        ..SqlConfig::default()
    };
    let tags = field("f1", FieldType::EnumArray);
    let cond = tags.finder().search("#<=", Some(&json!("2"))).unwrap();
    let sql = FieldQuery::new("Post").with(cond).to_sql(&config).unwrap();
    assert!(sql.text.contains("FROM \"cf \"\"values\"\"\""));
    assert!(sql.text.contains("WITH \"c0\" AS (SELECT \"host_id\", \"payload\""));
    assert!(sql.text.ends_with(
        "(CASE WHEN jsonb_typeof(\"payload\") = 'array' THEN jsonb_array_length(\"payload\") END) \
         <= $3::bigint"
    ));
    assert_eq!(sql.params, vec![json!("f1"), json!("Post"), json!(2)]);
}

#[test]
fn in_memory_matching_agrees_on_null_policies() {
    let age = field("f1", FieldType::Integer);
    let tags = field("f2", FieldType::IntegerArray);
    let query = FieldQuery::new("Author")
        .with(age.finder().search("!=", Some(&json!(3))).unwrap())
        .with(tags.finder().search("not_include", Some(&json!(1))).unwrap());

    let check = |age: Value, tags: Value| {
        query.matches_host(|id| match id {
            "f1" => Some(&age),
            "f2" => Some(&tags),
            _ => None,
        })
    };

    assert!(check(Value::Null, Value::Null));
    assert!(check(json!(4), json!([2, 3])));
    assert!(!check(json!(3), json!([2])));
    assert!(!check(json!(4), json!([1])));

    // a host with no value row for a field does not match that field's condition
    assert!(!query.matches_host(|_| None));
}
