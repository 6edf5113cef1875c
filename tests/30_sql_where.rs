mod common;

use anyhow::Result;
use crud_list::crud::{normalize, to_sql_where, FilterError, FilterShape, QueryEmitter, SqlWhereEmitter};
use serde_json::json;

// Relational WHERE fragments built from normalized listing requests

#[test]
fn number_filter_round_trip() -> Result<()> {
    let schema = common::users_schema()?;
    let params = normalize(&schema, &common::request(json!({"search": {"age": 30.0}}))?);
    assert_eq!(params.number_filters.get("age"), Some(&30));

    let where_ = to_sql_where(&params);
    assert_eq!(where_.clause, "1 AND age = ?");
    assert_eq!(where_.params, vec![json!(30)]);
    Ok(())
}

#[test]
fn fixture_request_to_sql() -> Result<()> {
    let schema = common::users_schema()?;
    let raw = std::fs::read_to_string(common::fixture("request.json"))?;
    let params = normalize(&schema, &serde_json::from_str(&raw)?);

    let where_ = to_sql_where(&params);
    assert_eq!(
        where_.clause,
        "1 AND age = ? AND status = ? AND verified = ? AND name LIKE ? AND (email LIKE ?) ORDER BY age DESC"
    );
    assert_eq!(
        where_.params,
        vec![json!(30), json!("active"), json!(true), json!("jo%"), json!("jo%")]
    );

    let select = where_.select_sql("users", &params)?;
    assert!(select.query.starts_with("SELECT * FROM `users` WHERE 1 AND age = ?"));
    assert!(select.query.ends_with("ORDER BY age DESC LIMIT ? OFFSET ?"));
    assert_eq!(select.params[5..], [json!(10), json!(10)]);
    Ok(())
}

#[test]
fn strict_emit_rejects_range_filters() -> Result<()> {
    let schema = common::users_schema()?;
    let params = normalize(&schema, &common::request(json!({"search": {"score": [1, 2], "age": 4}}))?);

    assert_eq!(to_sql_where(&params).clause, "1 AND age = ?");

    let err = SqlWhereEmitter.try_emit(&params).unwrap_err();
    assert!(matches!(
        err,
        FilterError::UnsupportedShape { ref field, shape: FilterShape::RangeNumber, .. } if field == "score"
    ));
    assert_eq!(SqlWhereEmitter.unsupported(&params), vec![("score", FilterShape::RangeNumber)]);
    Ok(())
}

#[test]
fn or_group_keeps_raw_values() -> Result<()> {
    let schema = common::users_schema()?;
    let params = normalize(
        &schema,
        &common::request(json!({"searchOR": {"email": "a_b ", "name": "50%"}}))?,
    );

    let where_ = to_sql_where(&params);
    assert_eq!(where_.clause, "1 AND (email LIKE ? OR name LIKE ?)");
    assert_eq!(where_.params, vec![json!("a_b %"), json!("50%%")]);
    Ok(())
}

#[test]
fn table_name_must_be_an_identifier() -> Result<()> {
    let schema = common::users_schema()?;
    let params = normalize(&schema, &common::request(json!({}))?);
    let where_ = to_sql_where(&params);

    assert!(where_.count_sql("users").is_ok());
    for table in ["", "1users", "users; DROP TABLE users", "us`ers"] {
        assert!(matches!(where_.count_sql(table), Err(FilterError::InvalidTableName(_))));
    }
    Ok(())
}
