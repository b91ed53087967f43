//! `#[derive(Record)]` end to end, against an in-memory client.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use myorm::{
    ColumnMap, Db, FieldRole, GenericClient, Kind, OrmError, OrmResult, QueryResult, QueryType,
    RawRow, Record, TemporalFormat, Value, args, from_row, schema_column_map, to_column_map,
};
use std::sync::Mutex;

#[derive(Debug, Default, Clone, PartialEq, Record)]
#[orm(table = "users")]
struct User {
    #[orm(pk, auto)]
    id: i64,
    #[orm(column = "user_name")]
    name: String,
    age: Option<i32>,
    active: bool,
    #[orm(type = "date")]
    birthday: Option<NaiveDate>,
    #[orm(type = "int")]
    updated_at: NaiveDateTime,
    #[orm(notfield)]
    tags: Vec<String>,
}

// Key/value spellings and a field-level table.
#[derive(Debug, Default, Record)]
struct Membership {
    #[orm(key = "pk", table = "memberships")]
    user_id: u64,
    #[orm(key = "pk")]
    group_id: u64,
    #[orm(field = "since", auto = "1")]
    joined: NaiveDateTime,
    #[orm(key = "notfield")]
    note: Option<Vec<u8>>,
}

#[derive(Debug, Default, Record)]
struct Loose {
    body: String,
}

#[derive(Debug, Default, Record)]
struct Comment {
    body: Option<String>,
}

#[derive(Default)]
struct FakeClient {
    sql: Mutex<Vec<(String, Vec<Value>)>>,
    rows: Mutex<Vec<RawRow>>,
}

impl FakeClient {
    fn with_rows(rows: Vec<RawRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    fn last(&self) -> (String, Vec<Value>) {
        self.sql.lock().unwrap().last().cloned().unwrap()
    }
}

impl GenericClient for FakeClient {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<QueryResult> {
        self.sql.lock().unwrap().push((sql.to_string(), params.to_vec()));
        Ok(std::mem::take(&mut *self.rows.lock().unwrap()))
    }

    async fn execute(&self, _kind: QueryType, sql: &str, params: &[Value]) -> OrmResult<i64> {
        self.sql.lock().unwrap().push((sql.to_string(), params.to_vec()));
        Ok(1)
    }
}

fn user_row() -> RawRow {
    RawRow::new()
        .with("id", "3")
        .with("user_name", "carol")
        .with_null("age")
        .with("active", "1")
        .with("birthday", "1990-04-01")
        .with("updated_at", "1672646645")
}

#[test]
fn test_schema_describes_fields_in_order() {
    let schema = User::SCHEMA;
    assert_eq!(schema.table, Some("users"));
    assert_eq!(
        schema.columns(),
        ["id", "user_name", "age", "active", "birthday", "updated_at"]
    );
    assert_eq!(schema.primary_keys(), ["id"]);

    let id = schema.field("id").unwrap();
    assert!(id.generated);
    assert_eq!(id.role, FieldRole::PrimaryKey);
    assert_eq!(id.kind, Kind::I64);

    let tags = schema.field("tags").unwrap();
    assert_eq!(tags.role, FieldRole::Excluded);
    assert_eq!(tags.kind, Kind::Unsupported("Vec<String>"));

    assert_eq!(
        schema.field("birthday").unwrap().temporal,
        Some(TemporalFormat::Date)
    );
}

#[test]
fn test_key_value_attribute_spellings() {
    let schema = Membership::SCHEMA;
    assert_eq!(schema.table, Some("memberships"));
    assert_eq!(schema.primary_keys(), ["user_id", "group_id"]);
    assert!(schema.field("joined").unwrap().generated);
    assert_eq!(schema.field("joined").unwrap().column, "since");
    assert!(!schema.field("note").unwrap().is_mapped());
    assert_eq!(Loose::SCHEMA.table, None);
}

#[test]
fn test_write_payload() {
    let user = User {
        id: 3,
        name: "carol".into(),
        age: None,
        active: true,
        birthday: NaiveDate::from_ymd_opt(1990, 4, 1),
        updated_at: NaiveDateTime::default(),
        tags: vec!["x".into()],
    };
    let mapped = to_column_map(&user, Some("app_"));
    assert_eq!(mapped.table.as_deref(), Some("app_users"));
    assert_eq!(
        mapped.columns,
        ColumnMap::new()
            .set("user_name", "carol")
            .set("age", Value::Null)
            .set("active", true)
            .set("birthday", "1990-04-01")
    );
    assert_eq!(mapped.primary_keys, vec![("id".to_string(), Value::Int(3))]);
}

#[test]
fn test_schema_column_map_uses_defaults() {
    let mapped = schema_column_map::<User>(None);
    assert!(mapped.columns.contains("user_name"));
    assert!(!mapped.columns.contains("id"));
    assert!(!mapped.columns.contains("updated_at"));
}

#[test]
fn test_read_back_from_row() {
    let user: User = from_row(&user_row()).unwrap();
    assert_eq!(user.id, 3);
    assert_eq!(user.name, "carol");
    assert_eq!(user.age, None);
    assert!(user.active);
    assert_eq!(user.birthday, NaiveDate::from_ymd_opt(1990, 4, 1));
    assert_eq!(user.updated_at.and_utc().timestamp(), 1672646645);
    assert!(user.tags.is_empty());
}

#[test]
fn test_stored_null_text_is_not_sql_null() {
    let text = RawRow::new().with("body", "NULL");
    let comment: Comment = from_row(&text).unwrap();
    assert_eq!(comment.body.as_deref(), Some("NULL"));

    let null = RawRow::new().with_null("body");
    let comment: Comment = from_row(&null).unwrap();
    assert_eq!(comment.body, None);

    // Non-optional text fields see the sentinel for SQL NULL.
    let loose: Loose = from_row(&null).unwrap();
    assert_eq!(loose.body, myorm::NULL_SENTINEL);
}

#[test]
fn test_missing_column_is_mapping_error() {
    let row = RawRow::new().with("id", "3");
    let err = from_row::<User>(&row).unwrap_err();
    assert!(matches!(err, OrmError::Mapping { .. }));
}

#[test]
fn test_bad_value_names_the_field() {
    let row = user_row();
    let mut broken = RawRow::new();
    for (column, value) in row.iter() {
        let value = if column == "updated_at" { "yesterday" } else { value };
        broken.push(column, Some(value.to_string()));
    }
    match from_row::<User>(&broken) {
        Err(OrmError::Conversion { field, raw, .. }) => {
            assert_eq!(field, "updated_at");
            assert_eq!(raw, "yesterday");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn test_find_by_composite_pk() {
    let row = RawRow::new()
        .with("user_id", "1")
        .with("group_id", "2")
        .with("since", "2024-01-02 03:04:05");
    let db = Db::new(FakeClient::with_rows(vec![row]), None);

    let m: Membership = db.model().find_by_pk(args![1u64, 2u64]).await.unwrap();
    assert_eq!(m.group_id, 2);

    let (sql, params) = db.client().last();
    assert_eq!(
        sql,
        "SELECT user_id, group_id, since FROM memberships WHERE 1=1 AND user_id = ? AND group_id = ?"
    );
    assert_eq!(params, args![1u64, 2u64]);
}

#[tokio::test]
async fn test_add_and_save() {
    let db = Db::new(FakeClient::default(), None);
    let user = User {
        id: 9,
        name: "dave".into(),
        age: Some(41),
        active: false,
        ..User::default()
    };

    db.model().add(&user).await.unwrap();
    let (sql, params) = db.client().last();
    assert_eq!(
        sql,
        "INSERT INTO users (user_name, age, active) VALUES (?, ?, ?)"
    );
    assert_eq!(params, args!["dave", 41, false]);

    db.model().save(&user).await.unwrap();
    let (sql, params) = db.client().last();
    assert_eq!(
        sql,
        "UPDATE users SET user_name = ?, age = ?, active = ? WHERE 1=1 AND id = ?"
    );
    assert_eq!(params, args!["dave", 41, false, 9]);
}
