//! Field mapper: records to column maps and rows back to records.
//!
//! A record type describes itself once through a static [`Schema`] (usually
//! generated by `#[derive(Record)]`), so mapping never inspects types at run
//! time:
//!
//! ```ignore
//! #[derive(Debug, Default, myorm::Record)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(pk, auto)]
//!     id: i64,
//!     #[orm(column = "user_name")]
//!     name: String,
//!     #[orm(type = "date")]
//!     birthday: Option<chrono::NaiveDate>,
//!     #[orm(notfield)]
//!     cached_score: Vec<u32>,
//! }
//! ```

use crate::coerce::Kind;
use crate::error::{OrmError, OrmResult};
use crate::row::RawRow;
use crate::value::{DATE_FORMAT, DATETIME_FORMAT, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// How a declared field takes part in mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Part of the primary key set.
    PrimaryKey,
    /// A regular column.
    Ordinary,
    /// Not a column at all; ignored in both directions.
    Excluded,
}

/// Write representation of a temporal field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalFormat {
    /// `YYYY-MM-DD`
    Date,
    /// `YYYY-MM-DD HH:MM:SS`
    DateTime,
    /// Unix epoch seconds.
    UnixInt,
}

/// Static description of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Rust field name.
    pub name: &'static str,
    /// Column name (explicit or the field name).
    pub column: &'static str,
    pub role: FieldRole,
    /// Database-generated; never part of a write payload.
    pub generated: bool,
    /// Write format for temporal fields.
    pub temporal: Option<TemporalFormat>,
    /// Destination kind when reading.
    pub kind: Kind,
}

impl FieldDescriptor {
    pub fn is_mapped(&self) -> bool {
        self.role != FieldRole::Excluded
    }

    pub fn is_primary_key(&self) -> bool {
        self.role == FieldRole::PrimaryKey
    }
}

/// Static description of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Default table name, used when the query has none.
    pub table: Option<&'static str>,
    /// Declared fields in declaration order.
    pub fields: &'static [FieldDescriptor],
}

impl Schema {
    /// Columns of all mapped fields, in declaration order.
    pub fn columns(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.is_mapped())
            .map(|f| f.column)
            .collect()
    }

    /// Primary key columns, in declaration order.
    pub fn primary_keys(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.is_primary_key())
            .map(|f| f.column)
            .collect()
    }

    /// Look up a field by Rust name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A field's current value as seen by the mapper.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Value),
    /// `None` is the zero value and is omitted from write payloads.
    Temporal(Option<DateTime<Utc>>),
}

/// Conversion of a record field into a [`FieldValue`].
///
/// Temporal types have no separate "unset" state, so the zero value is the
/// Unix epoch. A field holding exactly 1970-01-01 00:00:00 UTC (or the date
/// 1970-01-01) is indistinguishable from an unset one and is left out of
/// insert and update payloads, including when wrapped in `Some`. Store the
/// epoch itself through a raw statement.
pub trait ToField {
    /// Whether the type is a temporal type.
    const TEMPORAL: bool = false;

    fn to_field(&self) -> FieldValue;
}

macro_rules! impl_to_field_scalar {
    ($($t:ty),* $(,)?) => {$(
        impl ToField for $t {
            fn to_field(&self) -> FieldValue {
                FieldValue::Scalar(Value::from(self.clone()))
            }
        }
    )*};
}

impl_to_field_scalar!(
    String, bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, Vec<u8>,
);

/// The epoch counts as the zero value.
fn non_zero(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (dt != DateTime::<Utc>::UNIX_EPOCH).then_some(dt)
}

impl ToField for DateTime<Utc> {
    const TEMPORAL: bool = true;

    fn to_field(&self) -> FieldValue {
        FieldValue::Temporal(non_zero(*self))
    }
}

impl ToField for NaiveDateTime {
    const TEMPORAL: bool = true;

    fn to_field(&self) -> FieldValue {
        FieldValue::Temporal(non_zero(self.and_utc()))
    }
}

impl ToField for NaiveDate {
    const TEMPORAL: bool = true;

    fn to_field(&self) -> FieldValue {
        FieldValue::Temporal(self.and_hms_opt(0, 0, 0).and_then(|dt| non_zero(dt.and_utc())))
    }
}

impl<T: ToField> ToField for Option<T> {
    const TEMPORAL: bool = T::TEMPORAL;

    fn to_field(&self) -> FieldValue {
        match self {
            Some(v) => v.to_field(),
            None if T::TEMPORAL => FieldValue::Temporal(None),
            None => FieldValue::Scalar(Value::Null),
        }
    }
}

impl FieldValue {
    /// Write-side value, applying the temporal format. `None` means "omit".
    pub fn into_value(self, format: Option<TemporalFormat>) -> Option<Value> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            FieldValue::Temporal(None) => None,
            FieldValue::Temporal(Some(dt)) => Some(match format.unwrap_or(TemporalFormat::DateTime) {
                TemporalFormat::Date => Value::Text(dt.format(DATE_FORMAT).to_string()),
                TemporalFormat::DateTime => Value::Text(dt.format(DATETIME_FORMAT).to_string()),
                TemporalFormat::UnixInt => Value::Int(dt.timestamp()),
            }),
        }
    }
}

/// A record type with a static schema.
///
/// Derive it with `#[derive(Record)]`; hand-written impls must keep
/// `field_value` and `assign` indexed consistently with `SCHEMA.fields`.
pub trait Record: Sized {
    const SCHEMA: &'static Schema;

    /// Current value of the field at `index`; `None` for excluded fields.
    fn field_value(&self, index: usize) -> Option<FieldValue>;

    /// Coerce `raw` into the field at `index`. `None` is SQL NULL.
    fn assign(&mut self, index: usize, raw: Option<&str>) -> OrmResult<()>;
}

/// Ordered column → value map used as a write payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    entries: Vec<(String, Value)>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Insert or replace a column value, keeping the original position on replace.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Value>) {
        self.entries.into_iter().unzip()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ColumnMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ColumnMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for ColumnMap {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Output of [`to_column_map`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapped {
    /// Table from the schema, with the prefix applied.
    pub table: Option<String>,
    /// Write payload (generated fields and zero temporals omitted).
    pub columns: ColumnMap,
    /// Primary key columns with their current values.
    pub primary_keys: Vec<(String, Value)>,
}

/// Apply an optional table prefix.
pub(crate) fn prefixed(prefix: Option<&str>, table: &str) -> String {
    match prefix {
        Some(p) => format!("{p}{table}"),
        None => table.to_string(),
    }
}

/// Map a record to its table, write payload and primary keys.
pub fn to_column_map<R: Record>(record: &R, prefix: Option<&str>) -> Mapped {
    let schema = R::SCHEMA;
    let mut mapped = Mapped {
        table: schema.table.map(|t| prefixed(prefix, t)),
        ..Mapped::default()
    };

    for (index, field) in schema.fields.iter().enumerate() {
        if !field.is_mapped() {
            continue;
        }
        let Some(value) = record.field_value(index) else {
            continue;
        };
        let value = value.into_value(field.temporal);

        if field.is_primary_key() {
            mapped
                .primary_keys
                .push((field.column.to_string(), value.clone().unwrap_or(Value::Null)));
        }
        if !field.generated {
            if let Some(value) = value {
                mapped.columns.insert(field.column, value);
            }
        }
    }
    mapped
}

/// Map the element type of a sequence, using a default instance for values.
pub fn schema_column_map<R: Record + Default>(prefix: Option<&str>) -> Mapped {
    to_column_map(&R::default(), prefix)
}

/// Populate `record` from a row.
///
/// SQL NULL reaches the record as NULL, so an `Option` field only becomes
/// `None` for a real NULL and keeps a stored `"NULL"` string as text.
///
/// Stops at the first field whose column is missing or whose raw value
/// cannot be coerced; fields before it have already been written.
pub fn from_column_map<R: Record>(row: &RawRow, record: &mut R) -> OrmResult<()> {
    for (index, field) in R::SCHEMA.fields.iter().enumerate() {
        if !field.is_mapped() {
            continue;
        }
        let raw = row
            .get_nullable(field.column)
            .ok_or_else(|| OrmError::mapping(field.name, field.column))?;
        record
            .assign(index, raw)
            .map_err(|e| e.for_field(field.name))?;
    }
    Ok(())
}

/// Build a fresh record from a row. A failed row yields no record at all.
pub fn from_row<R: Record + Default>(row: &RawRow) -> OrmResult<R> {
    let mut record = R::default();
    from_column_map(row, &mut record)?;
    Ok(record)
}
