use crate::error::{OrmError, OrmResult};
use crate::mapper::{ColumnMap, Record, prefixed};
use crate::sql::count_placeholders;
use crate::value::Value;

/// Plain-data description of one query or mutation.
///
/// Every setter consumes the value and returns the updated one, so a query is
/// never shared between two statements. Usage mistakes made while building
/// (a placeholder/argument mismatch, for instance) are recorded and returned
/// by [`QuerySpec::validate`]; the first mistake wins.
///
/// ```
/// use myorm::{QuerySpec, args};
///
/// let spec = QuerySpec::new()
///     .table("users")
///     .select_columns(["id", "name"])
///     .filter("age > ? AND status = ?", args![18, "active"])
///     .order_by(["id DESC"])
///     .limit(20, 10);
///
/// assert_eq!(
///     spec.select_sql().unwrap(),
///     "SELECT id, name FROM users WHERE age > ? AND status = ? ORDER BY id DESC LIMIT 20,10"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    prefix: Option<String>,
    table: String,
    columns: Vec<String>,
    join: String,
    predicate: String,
    args: Vec<Value>,
    group_by: Vec<String>,
    having: Vec<String>,
    order_by: Vec<String>,
    offset: u64,
    count: u64,
    primary_keys: Vec<String>,
    tag: Option<String>,
    error: Option<String>,
}

fn collect<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A spec whose table names get `prefix` prepended.
    pub fn with_prefix(prefix: Option<&str>) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            ..Self::default()
        }
    }

    fn fail(mut self, message: String) -> Self {
        if self.error.is_none() {
            self.error = Some(message);
        }
        self
    }

    /// Set the target table, applying the table prefix.
    pub fn table(mut self, name: &str) -> Self {
        self.table = prefixed(self.prefix.as_deref(), name);
        self
    }

    /// Declare primary key columns, in order.
    pub fn set_primary_keys<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.primary_keys.contains(&name) {
                self.primary_keys.push(name);
            }
        }
        self
    }

    /// Columns for SELECT; none means `*`.
    pub fn select_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = collect(names);
        self
    }

    /// `LIMIT offset,count`. A zero count means no limit.
    pub fn limit(mut self, offset: u64, count: u64) -> Self {
        self.offset = offset;
        self.count = count;
        self
    }

    pub fn order_by<I, S>(mut self, clauses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = collect(clauses);
        self
    }

    pub fn group_by<I, S>(mut self, clauses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = collect(clauses);
        self
    }

    /// HAVING conditions, joined with `AND`. Only rendered with a GROUP BY.
    pub fn having<I, S>(mut self, clauses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.having = collect(clauses);
        self
    }

    /// Set the predicate and its positional arguments.
    ///
    /// The number of `?` markers must equal `args.len()`; otherwise the query
    /// is marked invalid and nothing about the predicate changes.
    pub fn filter(self, predicate: impl Into<String>, args: Vec<Value>) -> Self {
        let predicate = predicate.into();
        let markers = count_placeholders(&predicate);
        if markers != args.len() {
            return self.fail(format!(
                "predicate {predicate:?} has {markers} placeholder(s) but {} argument(s) were given",
                args.len()
            ));
        }
        let mut spec = self;
        spec.predicate = predicate;
        spec.args = args;
        spec
    }

    /// Join fragment placed after the table name, e.g. `LEFT JOIN roles r ON r.id = u.role_id`.
    pub fn join(mut self, fragment: impl Into<String>) -> Self {
        self.join = fragment.into();
        self
    }

    /// Tag reported to hooks and monitors.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    // ==================== Accessors ====================

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn get_tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Return the first usage error recorded while building.
    pub fn validate(&self) -> OrmResult<()> {
        match &self.error {
            Some(message) => Err(OrmError::usage(message.clone())),
            None => Ok(()),
        }
    }

    fn require_table(&self, op: &str) -> OrmResult<()> {
        self.validate()?;
        if self.table.trim().is_empty() {
            return Err(OrmError::usage(format!("{op} requires a table name")));
        }
        Ok(())
    }

    // ==================== Record binding ====================

    /// Fill in what the record type declares: its table when none is set,
    /// its primary keys after any explicit ones, and its mapped columns when
    /// none were selected.
    pub(crate) fn bind_schema<R: Record>(mut self) -> Self {
        let schema = R::SCHEMA;
        if self.table.is_empty() {
            if let Some(table) = schema.table {
                self = self.table(table);
            }
        }
        self = self.set_primary_keys(schema.primary_keys());
        if self.columns.is_empty() {
            self.columns = collect(schema.columns());
        }
        self
    }

    /// Replace the predicate with `1=1 AND k1 = ? AND k2 = ? ...`.
    pub(crate) fn filter_by_primary_keys(mut self, pk_args: Vec<Value>) -> OrmResult<Self> {
        self.validate()?;
        if pk_args.is_empty() {
            return Err(OrmError::usage("primary key values must not be empty"));
        }
        if pk_args.len() != self.primary_keys.len() {
            return Err(OrmError::usage(format!(
                "{} primary key value(s) given for {} primary key column(s) {:?}",
                pk_args.len(),
                self.primary_keys.len(),
                self.primary_keys
            )));
        }
        self.predicate = self.pk_predicate("1=1");
        self.args = pk_args;
        Ok(self)
    }

    fn pk_predicate(&self, base: &str) -> String {
        let mut predicate = base.to_string();
        for key in &self.primary_keys {
            predicate.push_str(" AND ");
            predicate.push_str(key);
            predicate.push_str(" = ?");
        }
        predicate
    }

    // ==================== Rendering ====================

    fn push_from(&self, sql: &mut String) {
        sql.push_str(" FROM ");
        sql.push_str(&self.table);
        if !self.join.is_empty() {
            sql.push(' ');
            sql.push_str(&self.join);
        }
        if !self.predicate.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.predicate);
        }
    }

    fn push_grouping(&self, sql: &mut String) {
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
            if !self.having.is_empty() {
                sql.push_str(" HAVING ");
                sql.push_str(&self.having.join(" AND "));
            }
        }
    }

    /// `SELECT <columns|*> FROM <table> [join] [WHERE ...] [GROUP BY ... [HAVING ...]] [ORDER BY ...] [LIMIT o,c]`
    pub fn select_sql(&self) -> OrmResult<String> {
        self.require_table("select")?;
        let mut sql = String::from("SELECT ");
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        self.push_from(&mut sql);
        self.push_grouping(&mut sql);
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if self.count > 0 {
            sql.push_str(&format!(" LIMIT {},{}", self.offset, self.count));
        }
        Ok(sql)
    }

    /// `SELECT COUNT(*)` over the same rows a select would return, ignoring
    /// ordering and limits.
    pub fn count_sql(&self) -> OrmResult<String> {
        self.require_table("count")?;
        if self.group_by.is_empty() {
            let mut sql = String::from("SELECT COUNT(*)");
            self.push_from(&mut sql);
            Ok(sql)
        } else {
            let mut inner = String::from("SELECT 1");
            self.push_from(&mut inner);
            self.push_grouping(&mut inner);
            Ok(format!("SELECT COUNT(*) FROM ({inner}) AS grouped"))
        }
    }

    /// `INSERT INTO <table> (c1, c2) VALUES (?, ?)` with the payload values.
    pub fn insert_sql(&self, payload: ColumnMap) -> OrmResult<(String, Vec<Value>)> {
        self.require_table("insert")?;
        if payload.is_empty() {
            return Err(OrmError::usage("insert requires at least one column"));
        }
        let (columns, values) = payload.into_parts();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders
        );
        Ok((sql, values))
    }

    /// `UPDATE <table> SET c1 = ?, c2 = ? [WHERE ...]` with the payload values
    /// followed by the predicate arguments.
    pub fn update_sql(&self, payload: ColumnMap) -> OrmResult<(String, Vec<Value>)> {
        self.require_table("update")?;
        if payload.is_empty() {
            return Err(OrmError::usage("update requires at least one column"));
        }
        let (columns, mut values) = payload.into_parts();
        let assignments: Vec<String> = columns.iter().map(|c| format!("{c} = ?")).collect();
        let mut sql = format!("UPDATE {} SET {}", self.table, assignments.join(", "));
        if !self.predicate.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.predicate);
            values.extend(self.args.iter().cloned());
        }
        Ok((sql, values))
    }

    /// `DELETE FROM <table> WHERE <predicate|1=1>[ AND pk = ?...]`.
    ///
    /// Refuses to render without a predicate and without primary key values.
    pub fn delete_sql(&self, pk_args: Vec<Value>) -> OrmResult<(String, Vec<Value>)> {
        self.require_table("delete")?;
        if pk_args.is_empty() && self.predicate.is_empty() {
            return Err(OrmError::usage(format!(
                "delete from {} without a predicate or primary key values would remove every row",
                self.table
            )));
        }
        if !pk_args.is_empty() && pk_args.len() != self.primary_keys.len() {
            return Err(OrmError::usage(format!(
                "{} primary key value(s) given for {} primary key column(s) {:?}",
                pk_args.len(),
                self.primary_keys.len(),
                self.primary_keys
            )));
        }

        let base = if self.predicate.is_empty() {
            "1=1"
        } else {
            self.predicate.as_str()
        };
        let mut args = self.args.clone();
        let predicate = if pk_args.is_empty() {
            base.to_string()
        } else {
            args.extend(pk_args);
            self.pk_predicate(base)
        };
        Ok((format!("DELETE FROM {} WHERE {predicate}", self.table), args))
    }
}
