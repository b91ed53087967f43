use super::truncate_sql_bytes;
use super::types::{HookAction, QueryContext, QueryHook, QueryOutcome};
use std::time::Duration;
use tracing::Level;

/// A `tracing` hook that emits every statement under the `myorm.sql` target.
///
/// The statement is logged before it runs, with its parameter count and the
/// pool it is routed to; failures are logged again at `WARN` once they
/// complete.
#[derive(Debug, Clone)]
pub struct TracingSqlHook {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingSqlHook {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl TracingSqlHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    fn emit(&self, ctx: &QueryContext, exec_sql: &str) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let tag = ctx.tag.as_deref().unwrap_or("-");
        emit_at_level!(
            self.level,
            target: "myorm.sql",
            query_type = %ctx.query_type,
            role = %ctx.role,
            tag,
            param_count = ctx.param_count,
            sql = %exec_sql,
        );
    }
}

impl QueryHook for TracingSqlHook {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        self.emit(ctx, &self.truncate_sql(&ctx.exec_sql));
        HookAction::Continue
    }

    fn after_query(&self, ctx: &QueryContext, duration: Duration, outcome: &QueryOutcome) {
        if let QueryOutcome::Error(error) = outcome {
            tracing::warn!(
                target: "myorm.sql",
                query_type = %ctx.query_type,
                role = %ctx.role,
                ?duration,
                error = %error,
                sql = %self.truncate_sql(&ctx.exec_sql),
                "statement failed"
            );
        }
    }
}
