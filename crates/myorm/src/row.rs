//! Raw result rows.
//!
//! The driver hands back column bytes; they are kept as text here and only
//! become typed values when a record asks for them (see [`crate::coerce`]).

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Textual marker for SQL NULL in decoded rows.
///
/// A NULL column is never decoded as an empty string and never as an absent
/// key; [`RawRow::get`] returns this sentinel and [`RawRow::is_null`] tells
/// the two cases apart even when a real value happens to spell `NULL`.
pub const NULL_SENTINEL: &str = "NULL";

/// One result row: column name to raw text, in select-list order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    columns: Vec<String>,
    values: Vec<Option<String>>,
}

/// Rows returned by a read.
pub type QueryResult = Vec<RawRow>;

impl RawRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. `None` is SQL NULL.
    pub fn push(&mut self, column: impl Into<String>, value: Option<String>) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Builder-style [`RawRow::push`] for a non-null value.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(column, Some(value.into()));
        self
    }

    /// Builder-style [`RawRow::push`] for a NULL column.
    pub fn with_null(mut self, column: impl Into<String>) -> Self {
        self.push(column, None);
        self
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Raw text of a column; NULL yields [`NULL_SENTINEL`]. `None` if the column is absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.get_nullable(column)
            .map(|v| v.unwrap_or(NULL_SENTINEL))
    }

    /// Raw text of a column with NULL as `Some(None)`.
    pub fn get_nullable(&self, column: &str) -> Option<Option<&str>> {
        self.position(column).map(|i| self.values[i].as_deref())
    }

    /// Whether the column is present and SQL NULL.
    pub fn is_null(&self, column: &str) -> bool {
        matches!(self.get_nullable(column), Some(None))
    }

    /// Whether the row has the column.
    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// `(column, raw text)` pairs in order, NULL rendered as the sentinel.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.as_str(), v.as_deref().unwrap_or(NULL_SENTINEL)))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Decode a driver row into raw text.
    pub(crate) fn from_driver(row: &mysql_async::Row) -> Self {
        let columns = row.columns_ref();
        let mut raw = RawRow {
            columns: Vec::with_capacity(columns.len()),
            values: Vec::with_capacity(columns.len()),
        };
        for (i, column) in columns.iter().enumerate() {
            let value = row.as_ref(i).and_then(raw_text);
            raw.push(column.name_str().into_owned(), value);
        }
        raw
    }
}

/// Serializes as a JSON-style object with NULL columns as `null`.
impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Text form of a driver value. `None` for SQL NULL.
pub(crate) fn raw_text(value: &mysql_async::Value) -> Option<String> {
    use mysql_async::Value as V;

    let text = match value {
        V::NULL => return None,
        V::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        V::Int(n) => n.to_string(),
        V::UInt(n) => n.to_string(),
        V::Float(f) => f.to_string(),
        V::Double(f) => f.to_string(),
        V::Date(year, month, day, hour, minute, second, micros) => {
            let mut s = format!(
                "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            );
            if *micros > 0 {
                s.push_str(&format!(".{micros:06}"));
            }
            s
        }
        V::Time(negative, days, hours, minutes, seconds, micros) => {
            let total_hours = u64::from(*days) * 24 + u64::from(*hours);
            let mut s = format!(
                "{}{total_hours:02}:{minutes:02}:{seconds:02}",
                if *negative { "-" } else { "" }
            );
            if *micros > 0 {
                s.push_str(&format!(".{micros:06}"));
            }
            s
        }
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_async::Value as V;

    #[test]
    fn null_is_sentinel_and_distinct_from_empty() {
        let row = RawRow::new()
            .with("name", "")
            .with_null("email");

        assert_eq!(row.get("name"), Some(""));
        assert_eq!(row.get("email"), Some(NULL_SENTINEL));
        assert!(row.is_null("email"));
        assert!(!row.is_null("name"));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn literal_null_text_is_not_sql_null() {
        let row = RawRow::new().with("nick", "NULL");
        assert_eq!(row.get("nick"), Some("NULL"));
        assert!(!row.is_null("nick"));
    }

    #[test]
    fn raw_text_renders_driver_values() {
        assert_eq!(raw_text(&V::NULL), None);
        assert_eq!(raw_text(&V::Bytes(b"alice".to_vec())).as_deref(), Some("alice"));
        assert_eq!(raw_text(&V::Int(-3)).as_deref(), Some("-3"));
        assert_eq!(
            raw_text(&V::Date(2023, 1, 2, 15, 4, 5, 0)).as_deref(),
            Some("2023-01-02 15:04:05")
        );
        assert_eq!(
            raw_text(&V::Date(2023, 1, 2, 15, 4, 5, 120)).as_deref(),
            Some("2023-01-02 15:04:05.000120")
        );
        assert_eq!(
            raw_text(&V::Time(true, 1, 2, 3, 4, 0)).as_deref(),
            Some("-26:03:04")
        );
    }

    #[test]
    fn serializes_in_column_order() {
        let row = RawRow::new().with("b", "2").with_null("a");
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"b":"2","a":null}"#);
    }
}
