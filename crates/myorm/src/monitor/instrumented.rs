use super::config::MonitorConfig;
use super::monitors::{CompositeHook, NoopMonitor};
use super::types::{HookAction, QueryContext, QueryHook, QueryMonitor, QueryOutcome, QueryType};
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::pool::PoolRole;
use crate::row::QueryResult;
use crate::value::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hooks, monitor and configuration wrapped around every statement.
///
/// Attached to a [`Db`](crate::Db) at construction; the default has no hook,
/// a no-op monitor, and monitoring disabled.
#[derive(Clone)]
pub struct Instrumentation {
    monitor: Arc<dyn QueryMonitor>,
    hook: Option<Arc<dyn QueryHook>>,
    config: MonitorConfig,
}

impl Default for Instrumentation {
    fn default() -> Self {
        Self {
            monitor: Arc::new(NoopMonitor),
            hook: None,
            config: MonitorConfig::default(),
        }
    }
}

impl std::fmt::Debug for Instrumentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrumentation")
            .field("has_hook", &self.hook.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Instrumentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the monitor configuration.
    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the query monitor.
    pub fn with_monitor<M: QueryMonitor + 'static>(self, monitor: M) -> Self {
        self.with_monitor_arc(Arc::new(monitor))
    }

    /// Set the query monitor from an Arc.
    pub fn with_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Add a query hook.
    ///
    /// If a hook is already set, this composes it with the new hook (existing first).
    pub fn with_hook<H: QueryHook + 'static>(self, hook: H) -> Self {
        self.with_hook_arc(Arc::new(hook))
    }

    /// Add a query hook from an `Arc`, composing with any existing hook.
    pub fn with_hook_arc(mut self, hook: Arc<dyn QueryHook>) -> Self {
        self.hook = Some(match self.hook.take() {
            None => hook,
            Some(existing) => Arc::new(CompositeHook::new().add_arc(existing).add_arc(hook)),
        });
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn apply_hook(&self, ctx: &mut QueryContext) -> OrmResult<()> {
        let Some(hook) = &self.hook else {
            return Ok(());
        };

        match hook.before_query(ctx) {
            HookAction::Continue => Ok(()),
            HookAction::ModifySql {
                exec_sql,
                canonical_sql,
            } => {
                ctx.exec_sql = exec_sql;
                if let Some(canonical_sql) = canonical_sql {
                    ctx.canonical_sql = canonical_sql;
                }
                ctx.query_type = QueryType::from_sql(&ctx.canonical_sql);
                Ok(())
            }
            HookAction::Abort(reason) => Err(OrmError::Aborted(reason)),
        }
    }

    fn report(&self, ctx: &QueryContext, duration: Duration, outcome: &QueryOutcome) {
        if let Some(hook) = &self.hook {
            hook.after_query(ctx, duration, outcome);
        }

        if !self.config.monitoring_enabled {
            return;
        }

        self.monitor.on_query_complete(ctx, duration, outcome);

        if let Some(threshold) = self.config.slow_query_threshold {
            if duration > threshold {
                self.monitor.on_slow_query(ctx, duration);
            }
        }
    }

    async fn with_timeout<T, F>(&self, future: F) -> OrmResult<T>
    where
        F: std::future::Future<Output = OrmResult<T>> + Send,
    {
        match self.config.query_timeout {
            Some(timeout) => tokio::time::timeout(timeout, future)
                .await
                .map_err(|_| OrmError::Timeout(timeout))?,
            None => future.await,
        }
    }

    fn begin(&self, ctx: &mut QueryContext) -> OrmResult<Instant> {
        self.apply_hook(ctx)?;
        if self.config.monitoring_enabled {
            self.monitor.on_query_start(ctx);
        }
        Ok(Instant::now())
    }

    /// Run a read through the hooks and monitors.
    pub(crate) async fn query<C: GenericClient>(
        &self,
        client: &C,
        sql: &str,
        params: &[Value],
        tag: Option<&str>,
    ) -> OrmResult<QueryResult> {
        let mut ctx = QueryContext::new(sql, params.len(), PoolRole::Reader);
        ctx.tag = tag.map(str::to_string);

        let start = self.begin(&mut ctx)?;
        let result = self.with_timeout(client.query(&ctx.exec_sql, params)).await;
        let duration = start.elapsed();

        let outcome = match &result {
            Ok(rows) => QueryOutcome::Rows(rows.len()),
            Err(e) => QueryOutcome::error(e.to_string()),
        };
        self.report(&ctx, duration, &outcome);
        result
    }

    /// Run a write through the hooks and monitors.
    pub(crate) async fn execute<C: GenericClient>(
        &self,
        client: &C,
        kind: QueryType,
        sql: &str,
        params: &[Value],
        tag: Option<&str>,
    ) -> OrmResult<i64> {
        let mut ctx = QueryContext::new(sql, params.len(), PoolRole::Writer);
        ctx.query_type = kind;
        ctx.tag = tag.map(str::to_string);

        let start = self.begin(&mut ctx)?;
        let result = self
            .with_timeout(client.execute(kind, &ctx.exec_sql, params))
            .await;
        let duration = start.elapsed();

        let outcome = match &result {
            Ok(n) => QueryOutcome::Affected(*n),
            Err(e) => QueryOutcome::error(e.to_string()),
        };
        self.report(&ctx, duration, &outcome);
        result
    }
}
