//! Statement monitoring and hooks.
//!
//! Instrumentation is injected into a [`Db`](crate::Db) when it is built
//! rather than switched on globally:
//!
//! ```rust,ignore
//! use myorm::monitor::{MonitorConfig, StatsMonitor, TracingSqlHook};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let stats = Arc::new(StatsMonitor::new());
//! let db = myorm::Db::connect(cluster)
//!     .await?
//!     .with_hook(TracingSqlHook::new())
//!     .with_monitor_arc(stats.clone())
//!     .with_config(
//!         MonitorConfig::new()
//!             .with_slow_query_threshold(Duration::from_millis(200))
//!             .enable_monitoring(),
//!     );
//! ```

mod config;
mod instrumented;
mod monitors;
mod tracing_hook;
mod types;

#[cfg(test)]
mod tests;

pub use config::MonitorConfig;
pub use instrumented::Instrumentation;
pub use monitors::{CompositeHook, CompositeMonitor, NoopMonitor, QueryStats, StatsMonitor};
pub use tracing_hook::TracingSqlHook;
pub use types::{HookAction, QueryContext, QueryHook, QueryMonitor, QueryOutcome, QueryType};

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
