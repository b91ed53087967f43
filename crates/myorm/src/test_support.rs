//! In-memory client that records every statement it is asked to run, plus a
//! small record fixture.

use crate::client::GenericClient;
use crate::coerce::{FromRaw, Kind};
use crate::error::{OrmError, OrmResult};
use crate::mapper::{FieldDescriptor, FieldRole, FieldValue, Record, Schema, TemporalFormat, ToField};
use crate::monitor::QueryType;
use crate::pool::PoolRole;
use crate::row::{QueryResult, RawRow};
use crate::value::Value;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub role: PoolRole,
    pub kind: QueryType,
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Default)]
pub(crate) struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    results: Mutex<VecDeque<QueryResult>>,
    exec_result: i64,
    fail: Option<String>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next read.
    pub fn with_rows(self, rows: QueryResult) -> Self {
        self.results.lock().unwrap().push_back(rows);
        self
    }

    /// Value returned by every write.
    pub fn with_exec_result(mut self, n: i64) -> Self {
        self.exec_result = n;
        self
    }

    /// Make every statement fail with a connection error carrying `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.fail = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last(&self) -> Call {
        self.calls().pop().expect("no statement was issued")
    }

    fn record(&self, role: PoolRole, kind: QueryType, sql: &str, params: &[Value]) -> OrmResult<()> {
        self.calls.lock().unwrap().push(Call {
            role,
            kind,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match &self.fail {
            Some(message) => Err(OrmError::Connection(message.clone())),
            None => Ok(()),
        }
    }
}

impl GenericClient for RecordingClient {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<QueryResult> {
        self.record(PoolRole::Reader, QueryType::Select, sql, params)?;
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute(&self, kind: QueryType, sql: &str, params: &[Value]) -> OrmResult<i64> {
        self.record(PoolRole::Writer, kind, sql, params)?;
        Ok(self.exec_result)
    }
}

/// Hand-written record equivalent to:
///
/// ```ignore
/// #[derive(Record)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(pk, auto)] id: i64,
///     #[orm(column = "user_name")] name: String,
///     age: i32,
///     #[orm(type = "date")] birthday: Option<NaiveDate>,
///     #[orm(notfield)] scratch: Vec<String>,
/// }
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct User {
    pub id: i64,
    pub name: String,
    pub age: i32,
    pub birthday: Option<NaiveDate>,
    pub scratch: Vec<String>,
}

impl Record for User {
    const SCHEMA: &'static Schema = &Schema {
        table: Some("users"),
        fields: &[
            FieldDescriptor {
                name: "id",
                column: "id",
                role: FieldRole::PrimaryKey,
                generated: true,
                temporal: None,
                kind: <i64 as FromRaw>::KIND,
            },
            FieldDescriptor {
                name: "name",
                column: "user_name",
                role: FieldRole::Ordinary,
                generated: false,
                temporal: None,
                kind: <String as FromRaw>::KIND,
            },
            FieldDescriptor {
                name: "age",
                column: "age",
                role: FieldRole::Ordinary,
                generated: false,
                temporal: None,
                kind: <i32 as FromRaw>::KIND,
            },
            FieldDescriptor {
                name: "birthday",
                column: "birthday",
                role: FieldRole::Ordinary,
                generated: false,
                temporal: Some(TemporalFormat::Date),
                kind: <Option<NaiveDate> as FromRaw>::KIND,
            },
            FieldDescriptor {
                name: "scratch",
                column: "scratch",
                role: FieldRole::Excluded,
                generated: false,
                temporal: None,
                kind: Kind::Unsupported("Vec<String>"),
            },
        ],
    };

    fn field_value(&self, index: usize) -> Option<FieldValue> {
        match index {
            0 => Some(self.id.to_field()),
            1 => Some(self.name.to_field()),
            2 => Some(self.age.to_field()),
            3 => Some(self.birthday.to_field()),
            _ => None,
        }
    }

    fn assign(&mut self, index: usize, raw: Option<&str>) -> OrmResult<()> {
        match index {
            0 => self.id = FromRaw::from_nullable(raw)?,
            1 => self.name = FromRaw::from_nullable(raw)?,
            2 => self.age = FromRaw::from_nullable(raw)?,
            3 => self.birthday = FromRaw::from_nullable(raw)?,
            _ => {}
        }
        Ok(())
    }
}

/// A row shaped like the `users` table.
pub(crate) fn user_row(id: i64, name: &str, age: i32) -> RawRow {
    RawRow::new()
        .with("id", id.to_string())
        .with("user_name", name)
        .with("age", age.to_string())
        .with_null("birthday")
}

/// A record without table or primary key.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Note {
    pub body: String,
}

impl Record for Note {
    const SCHEMA: &'static Schema = &Schema {
        table: None,
        fields: &[FieldDescriptor {
            name: "body",
            column: "body",
            role: FieldRole::Ordinary,
            generated: false,
            temporal: None,
            kind: <String as FromRaw>::KIND,
        }],
    };

    fn field_value(&self, index: usize) -> Option<FieldValue> {
        (index == 0).then(|| self.body.to_field())
    }

    fn assign(&mut self, index: usize, raw: Option<&str>) -> OrmResult<()> {
        if index == 0 {
            self.body = FromRaw::from_nullable(raw)?;
        }
        Ok(())
    }
}
