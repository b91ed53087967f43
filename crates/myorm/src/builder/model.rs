use super::spec::QuerySpec;
use crate::client::GenericClient;
use crate::coerce::FromRaw;
use crate::db::Db;
use crate::error::{OrmError, OrmResult};
use crate::mapper::{ColumnMap, Record, from_row, to_column_map};
use crate::monitor::QueryType;
use crate::pool::ConnectionManager;
use crate::row::QueryResult;
use crate::value::Value;

/// A query being built against a [`Db`].
///
/// Setters consume the model and hand back the updated one; terminal calls
/// consume it for good. Configuration therefore never leaks from one
/// statement into the next: start every statement from [`Db::model`] or
/// [`Db::table`].
///
/// ```ignore
/// let rows = db
///     .table("users")
///     .filter("age > ?", myorm::args![18])
///     .order_by(["id DESC"])
///     .limit(0, 10)
///     .select()
///     .await?;
///
/// let user: User = db.model().find_by_pk(myorm::args![42]).await?;
/// ```
#[must_use = "a model does nothing until a terminal method is awaited"]
pub struct Model<'a, C: GenericClient = ConnectionManager> {
    db: &'a Db<C>,
    spec: QuerySpec,
}

impl<C: GenericClient> std::fmt::Debug for Model<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model").field("spec", &self.spec).finish()
    }
}

impl<C: GenericClient> Clone for Model<'_, C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db,
            spec: self.spec.clone(),
        }
    }
}

impl<'a, C: GenericClient> Model<'a, C> {
    pub(crate) fn new(db: &'a Db<C>, spec: QuerySpec) -> Self {
        Self { db, spec }
    }

    fn map(mut self, f: impl FnOnce(QuerySpec) -> QuerySpec) -> Self {
        self.spec = f(self.spec);
        self
    }

    /// The [`QuerySpec`] built so far.
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn into_spec(self) -> QuerySpec {
        self.spec
    }

    // ==================== Setters ====================

    /// Set the target table (the table prefix is applied).
    pub fn table(self, name: &str) -> Self {
        self.map(|s| s.table(name))
    }

    pub fn set_primary_keys<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map(|s| s.set_primary_keys(names))
    }

    pub fn select_columns<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map(|s| s.select_columns(names))
    }

    pub fn limit(self, offset: u64, count: u64) -> Self {
        self.map(|s| s.limit(offset, count))
    }

    pub fn order_by<I, S>(self, clauses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map(|s| s.order_by(clauses))
    }

    pub fn group_by<I, S>(self, clauses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map(|s| s.group_by(clauses))
    }

    pub fn having<I, S>(self, clauses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map(|s| s.having(clauses))
    }

    /// Set the predicate (`WHERE`) and its positional arguments.
    ///
    /// A placeholder/argument count mismatch makes the next terminal call
    /// return `OrmError::Usage` without sending anything.
    pub fn filter(self, predicate: impl Into<String>, args: Vec<Value>) -> Self {
        self.map(|s| s.filter(predicate, args))
    }

    pub fn join(self, fragment: impl Into<String>) -> Self {
        self.map(|s| s.join(fragment))
    }

    /// Tag reported to hooks and monitors.
    pub fn tag(self, tag: impl Into<String>) -> Self {
        self.map(|s| s.tag(tag))
    }

    // ==================== Terminals ====================

    async fn read(&self, sql: &str, args: &[Value]) -> OrmResult<QueryResult> {
        self.db.run_query(sql, args, self.spec.get_tag()).await
    }

    async fn write(&self, kind: QueryType, sql: &str, args: &[Value]) -> OrmResult<i64> {
        self.db.run_execute(kind, sql, args, self.spec.get_tag()).await
    }

    /// Run the SELECT on the reader pool.
    pub async fn select(self) -> OrmResult<QueryResult> {
        let sql = self.spec.select_sql()?;
        self.read(&sql, self.spec.args()).await
    }

    /// Count the rows the SELECT would return (ignoring ordering and limits).
    pub async fn count(self) -> OrmResult<i64> {
        let sql = self.spec.count_sql()?;
        let rows = self.read(&sql, self.spec.args()).await?;
        let raw = rows
            .first()
            .and_then(|row| row.iter().next())
            .map(|(_, raw)| raw)
            .ok_or_else(|| OrmError::not_found("COUNT(*) returned no rows"))?;
        i64::from_raw(raw).map_err(|e| e.for_field("COUNT(*)"))
    }

    /// Insert one row; returns the last inserted id.
    pub async fn insert(self, payload: ColumnMap) -> OrmResult<i64> {
        let (sql, args) = self.spec.insert_sql(payload)?;
        self.write(QueryType::Insert, &sql, &args).await
    }

    /// Update rows matching the predicate (all rows if none); returns the affected-row count.
    pub async fn update(self, payload: ColumnMap) -> OrmResult<i64> {
        let (sql, args) = self.spec.update_sql(payload)?;
        self.write(QueryType::Update, &sql, &args).await
    }

    /// Delete by predicate, by primary key values, or both; returns the affected-row count.
    ///
    /// With neither a predicate nor primary key values this is a usage error
    /// and nothing is sent.
    pub async fn delete(self, pk_args: Vec<Value>) -> OrmResult<i64> {
        let (sql, args) = self.spec.delete_sql(pk_args)?;
        self.write(QueryType::Delete, &sql, &args).await
    }

    fn bind<R: Record>(self) -> Self {
        self.map(QuerySpec::bind_schema::<R>)
    }

    async fn fetch_rows(self) -> OrmResult<QueryResult> {
        let table = self.spec.table_name().to_string();
        let rows = self.select().await?;
        if rows.is_empty() {
            return Err(OrmError::not_found(format!("no rows found in {table}")));
        }
        Ok(rows)
    }

    /// Map only the first row; later rows are never coerced.
    async fn fetch_first<R: Record + Default>(self) -> OrmResult<R> {
        let rows = self.fetch_rows().await?;
        from_row(&rows[0])
    }

    /// Populate one record from the first matching row.
    pub async fn find<R: Record + Default>(self) -> OrmResult<R> {
        self.bind::<R>().fetch_first().await
    }

    /// Populate one record per matching row.
    ///
    /// Zero rows is `NotFound`. A row that fails to map fails the whole call.
    pub async fn find_list<R: Record + Default>(self) -> OrmResult<Vec<R>> {
        let rows = self.bind::<R>().fetch_rows().await?;
        rows.iter().map(from_row).collect()
    }

    /// Look a record up by its primary key values, in primary key order.
    ///
    /// Replaces any predicate with `1=1 AND k1 = ? AND k2 = ? ...`.
    pub async fn find_by_pk<R: Record + Default>(self, pk_args: Vec<Value>) -> OrmResult<R> {
        let model = self.bind::<R>();
        let model = Self {
            db: model.db,
            spec: model.spec.filter_by_primary_keys(pk_args)?,
        };
        model.fetch_first().await
    }

    /// Insert a record's write payload; returns the last inserted id.
    pub async fn add<R: Record>(self, record: &R) -> OrmResult<i64> {
        let model = self.bind::<R>();
        let mapped = to_column_map(record, None);
        model.insert(mapped.columns).await
    }

    /// Update a record's row; returns the affected-row count.
    ///
    /// Without an explicit predicate the row is addressed by the record's
    /// primary key values. A record with no primary key and no predicate is
    /// a usage error, never a full-table update.
    pub async fn save<R: Record>(self, record: &R) -> OrmResult<i64> {
        let mut model = self.bind::<R>();
        model.spec.validate()?;
        let mapped = to_column_map(record, None);

        if model.spec.predicate().is_empty() {
            if model.spec.primary_keys().is_empty() {
                return Err(OrmError::usage(format!(
                    "save on {} needs a predicate or a primary key",
                    model.spec.table_name()
                )));
            }
            let mut values = Vec::with_capacity(model.spec.primary_keys().len());
            for key in model.spec.primary_keys() {
                let value = mapped
                    .primary_keys
                    .iter()
                    .find(|(column, _)| column == key)
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| {
                        OrmError::usage(format!("primary key {key} has no value on the record"))
                    })?;
                values.push(value);
            }
            model.spec = model.spec.filter_by_primary_keys(values)?;
        }

        model.update(mapped.columns).await
    }
}
