//! The engine handle.

use crate::builder::{Model, QuerySpec};
use crate::client::GenericClient;
use crate::config::ClusterSettings;
use crate::error::OrmResult;
use crate::monitor::{Instrumentation, MonitorConfig, QueryHook, QueryMonitor, QueryType};
use crate::pool::ConnectionManager;
use crate::row::{QueryResult, RawRow};
use crate::value::Value;
use std::sync::Arc;

/// Cheap-to-clone handle over a client, the table prefix and the
/// instrumentation applied to every statement.
///
/// ```ignore
/// let db = Db::connect(ClusterSettings::single(settings))
///     .await?
///     .with_hook(myorm::monitor::TracingSqlHook::new());
///
/// let id = db
///     .table("users")
///     .insert(ColumnMap::new().set("name", "Alice").set("age", 30))
///     .await?;
/// ```
pub struct Db<C: GenericClient = ConnectionManager> {
    client: Arc<C>,
    prefix: Option<Arc<str>>,
    instrumentation: Instrumentation,
}

impl<C: GenericClient> Clone for Db<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            prefix: self.prefix.clone(),
            instrumentation: self.instrumentation.clone(),
        }
    }
}

impl<C: GenericClient> std::fmt::Debug for Db<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("prefix", &self.prefix)
            .field("instrumentation", &self.instrumentation)
            .finish_non_exhaustive()
    }
}

impl Db<ConnectionManager> {
    /// Build the writer and reader pools, verify both endpoints, and take
    /// the table prefix from the writer settings.
    pub async fn connect(cluster: ClusterSettings) -> OrmResult<Self> {
        let prefix = cluster.table_prefix().map(str::to_string);
        let manager = ConnectionManager::connect(cluster).await?;
        Ok(Self::new(manager, prefix.as_deref()))
    }
}

impl<C: GenericClient> Db<C> {
    pub fn new(client: C, prefix: Option<&str>) -> Self {
        Self::from_arc(Arc::new(client), prefix)
    }

    pub fn from_arc(client: Arc<C>, prefix: Option<&str>) -> Self {
        Self {
            client,
            prefix: prefix.filter(|p| !p.is_empty()).map(Arc::from),
            instrumentation: Instrumentation::default(),
        }
    }

    /// Add a query hook, composing with any existing one.
    pub fn with_hook<H: QueryHook + 'static>(mut self, hook: H) -> Self {
        self.instrumentation = self.instrumentation.with_hook(hook);
        self
    }

    pub fn with_hook_arc(mut self, hook: Arc<dyn QueryHook>) -> Self {
        self.instrumentation = self.instrumentation.with_hook_arc(hook);
        self
    }

    pub fn with_monitor<M: QueryMonitor + 'static>(mut self, monitor: M) -> Self {
        self.instrumentation = self.instrumentation.with_monitor(monitor);
        self
    }

    pub fn with_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.instrumentation = self.instrumentation.with_monitor_arc(monitor);
        self
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.instrumentation = self.instrumentation.with_config(config);
        self
    }

    pub fn with_instrumentation(mut self, instrumentation: Instrumentation) -> Self {
        self.instrumentation = instrumentation;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn table_prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn instrumentation(&self) -> &Instrumentation {
        &self.instrumentation
    }

    /// Start an empty query.
    pub fn model(&self) -> Model<'_, C> {
        Model::new(self, QuerySpec::with_prefix(self.table_prefix()))
    }

    /// Start a query on `name` (the table prefix is applied).
    pub fn table(&self, name: &str) -> Model<'_, C> {
        self.model().table(name)
    }

    /// Continue from a spec built elsewhere. Its own prefix setting is kept.
    pub fn with_spec(&self, spec: QuerySpec) -> Model<'_, C> {
        Model::new(self, spec)
    }

    pub(crate) async fn run_query(
        &self,
        sql: &str,
        args: &[Value],
        tag: Option<&str>,
    ) -> OrmResult<QueryResult> {
        self.instrumentation
            .query(&*self.client, sql, args, tag)
            .await
    }

    pub(crate) async fn run_execute(
        &self,
        kind: QueryType,
        sql: &str,
        args: &[Value],
        tag: Option<&str>,
    ) -> OrmResult<i64> {
        self.instrumentation
            .execute(&*self.client, kind, sql, args, tag)
            .await
    }

    /// Run raw SQL on the reader pool.
    pub async fn query(&self, sql: &str, args: &[Value]) -> OrmResult<QueryResult> {
        self.run_query(sql, args, None).await
    }

    /// Run raw SQL on the writer pool.
    ///
    /// Returns the last inserted id for [`QueryType::Insert`], otherwise the
    /// affected-row count.
    pub async fn execute(&self, kind: QueryType, sql: &str, args: &[Value]) -> OrmResult<i64> {
        self.run_execute(kind, sql, args, None).await
    }

    /// First row of a raw read, if any.
    pub async fn get_row(&self, sql: &str, args: &[Value]) -> OrmResult<Option<RawRow>> {
        Ok(self.query(sql, args).await?.into_iter().next())
    }

    /// Check both endpoints.
    pub async fn ping(&self) -> OrmResult<()> {
        self.client.ping().await
    }
}
