use super::*;
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::pool::PoolRole;
use crate::row::{QueryResult, RawRow};
use crate::test_support::RecordingClient;
use crate::value::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn read_ctx(sql: &str) -> QueryContext {
    QueryContext::new(sql, 0, PoolRole::Reader)
}

fn write_ctx(sql: &str) -> QueryContext {
    QueryContext::new(sql, 0, PoolRole::Writer)
}

#[test]
fn test_query_type_detection() {
    assert_eq!(QueryType::from_sql("SELECT * FROM users"), QueryType::Select);
    assert_eq!(QueryType::from_sql("  select * FROM users"), QueryType::Select);
    assert_eq!(
        QueryType::from_sql("INSERT INTO users (name) VALUES (?)"),
        QueryType::Insert
    );
    assert_eq!(
        QueryType::from_sql("REPLACE INTO users (name) VALUES (?)"),
        QueryType::Insert
    );
    assert_eq!(QueryType::from_sql("UPDATE users SET name = ?"), QueryType::Update);
    assert_eq!(
        QueryType::from_sql("/* admin */ DELETE FROM users WHERE id = ?"),
        QueryType::Delete
    );
    assert_eq!(QueryType::from_sql("SET NAMES utf8mb4"), QueryType::Other);
}

#[test]
fn error_outcome_is_truncated() {
    let long = "x".repeat(2000);
    match QueryOutcome::error(long) {
        QueryOutcome::Error(msg) => {
            assert_eq!(msg.len(), 515);
            assert!(msg.ends_with("..."));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn tracing_hook_truncates_on_char_boundary() {
    let hook = TracingSqlHook::new().max_sql_length(4);
    assert_eq!(hook.truncate_sql("SELECT 1"), "SELE...");
    assert_eq!(hook.truncate_sql("SEL"), "SEL");
    assert_eq!(truncate_sql_bytes("héllo", 2), "h");
}

#[test]
fn stats_monitor_tracks_kinds_and_roles() {
    let monitor = StatsMonitor::new();

    monitor.on_query_complete(&read_ctx("SELECT 1"), Duration::from_millis(1), &QueryOutcome::Rows(1));
    monitor.on_query_complete(
        &write_ctx("INSERT INTO t (x) VALUES (?)"),
        Duration::from_millis(2),
        &QueryOutcome::Affected(7),
    );
    monitor.on_query_complete(
        &write_ctx("UPDATE t SET x = ?"),
        Duration::from_millis(3),
        &QueryOutcome::Affected(1),
    );
    monitor.on_query_complete(
        &write_ctx("DELETE FROM t WHERE id = ?"),
        Duration::from_millis(4),
        &QueryOutcome::Affected(1),
    );
    monitor.on_query_complete(
        &read_ctx("SELECT bad"),
        Duration::from_millis(1),
        &QueryOutcome::error("some error".to_string()),
    );

    let stats = monitor.stats();
    assert_eq!(stats.total_queries, 5);
    assert_eq!(stats.select_count, 2);
    assert_eq!(stats.insert_count, 1);
    assert_eq!(stats.update_count, 1);
    assert_eq!(stats.delete_count, 1);
    assert_eq!(stats.reader_count, 2);
    assert_eq!(stats.writer_count, 3);
    assert_eq!(stats.failed_queries, 1);
    assert_eq!(stats.total_duration, Duration::from_millis(11));
}

#[test]
fn stats_monitor_tracks_slowest_query_and_resets() {
    let monitor = StatsMonitor::new();
    for (sql, ms) in [("SELECT fast", 10), ("SELECT slow", 100), ("SELECT medium", 50)] {
        monitor.on_query_complete(&read_ctx(sql), Duration::from_millis(ms), &QueryOutcome::Rows(0));
    }

    let stats = monitor.stats();
    assert_eq!(stats.max_duration, Duration::from_millis(100));
    assert_eq!(stats.slowest_query.as_deref(), Some("SELECT slow"));

    monitor.reset();
    assert_eq!(monitor.stats(), QueryStats::default());
}

#[test]
fn test_composite_hook_modify() {
    struct AddCommentHook;
    impl QueryHook for AddCommentHook {
        fn before_query(&self, ctx: &QueryContext) -> HookAction {
            HookAction::ModifySql {
                exec_sql: format!("/* instrumented */ {}", ctx.exec_sql),
                canonical_sql: None,
            }
        }
    }

    let hook = CompositeHook::new().add(AddCommentHook).add(AddCommentHook);
    match hook.before_query(&read_ctx("SELECT 1")) {
        HookAction::ModifySql {
            exec_sql,
            canonical_sql,
        } => {
            assert_eq!(exec_sql, "/* instrumented */ /* instrumented */ SELECT 1");
            assert!(canonical_sql.is_none());
        }
        _ => panic!("Expected ModifySql"),
    }
}

struct BlockDeleteHook;

impl QueryHook for BlockDeleteHook {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        if ctx.query_type == QueryType::Delete {
            HookAction::Abort("DELETE not allowed".to_string())
        } else {
            HookAction::Continue
        }
    }
}

#[test]
fn test_composite_hook_abort() {
    let hook = CompositeHook::new().add(BlockDeleteHook);
    match hook.before_query(&write_ctx("DELETE FROM users")) {
        HookAction::Abort(reason) => assert_eq!(reason, "DELETE not allowed"),
        _ => panic!("Expected Abort"),
    }
}

#[tokio::test]
async fn aborted_statement_never_reaches_the_client() {
    let client = RecordingClient::new();
    let inst = Instrumentation::new().with_hook(BlockDeleteHook);

    let err = inst
        .execute(&client, QueryType::Delete, "DELETE FROM users", &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Aborted(ref r) if r == "DELETE not allowed"));
    assert!(client.calls().is_empty());
}

#[derive(Default)]
struct Capture {
    contexts: Mutex<Vec<(QueryContext, QueryOutcome)>>,
}

impl QueryMonitor for Capture {
    fn on_query_complete(&self, ctx: &QueryContext, _: Duration, outcome: &QueryOutcome) {
        self.contexts
            .lock()
            .unwrap()
            .push((ctx.clone(), outcome.clone()));
    }
}

#[tokio::test]
async fn monitor_sees_role_tag_and_outcome() {
    let client = RecordingClient::new()
        .with_rows(vec![RawRow::new().with("id", "1")])
        .with_exec_result(42);
    let capture = Arc::new(Capture::default());
    let inst = Instrumentation::new()
        .with_config(MonitorConfig::new().enable_monitoring())
        .with_monitor_arc(capture.clone());

    inst.query(&client, "SELECT id FROM t", &[], Some("list-t"))
        .await
        .unwrap();
    let id = inst
        .execute(
            &client,
            QueryType::Insert,
            "INSERT INTO t (a) VALUES (?)",
            &[Value::from(1)],
            None,
        )
        .await
        .unwrap();
    assert_eq!(id, 42);

    let seen = capture.contexts.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0.role, PoolRole::Reader);
    assert_eq!(seen[0].0.tag.as_deref(), Some("list-t"));
    assert_eq!(seen[0].1, QueryOutcome::Rows(1));
    assert_eq!(seen[1].0.role, PoolRole::Writer);
    assert_eq!(seen[1].0.param_count, 1);
    assert_eq!(seen[1].1, QueryOutcome::Affected(42));
}

#[tokio::test]
async fn disabled_monitoring_skips_monitors() {
    let client = RecordingClient::new();
    let capture = Arc::new(Capture::default());
    let inst = Instrumentation::new().with_monitor_arc(capture.clone());

    inst.query(&client, "SELECT 1", &[], None).await.unwrap();
    assert!(capture.contexts.lock().unwrap().is_empty());
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn slow_queries_are_reported() {
    struct SlowClient;
    impl GenericClient for SlowClient {
        async fn query(&self, _: &str, _: &[Value]) -> OrmResult<QueryResult> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(vec![])
        }
        async fn execute(&self, _: QueryType, _: &str, _: &[Value]) -> OrmResult<i64> {
            Ok(0)
        }
    }

    let stats = Arc::new(StatsMonitor::new());
    let inst = Instrumentation::new()
        .with_monitor_arc(stats.clone())
        .with_config(
            MonitorConfig::new()
                .with_slow_query_threshold(Duration::from_millis(1))
                .enable_monitoring(),
        );

    inst.query(&SlowClient, "SELECT SLEEP(1)", &[], None).await.unwrap();
    assert_eq!(stats.stats().slow_queries, 1);
}

#[tokio::test]
async fn timeout_returns_error() {
    struct HangingClient;
    impl GenericClient for HangingClient {
        async fn query(&self, _: &str, _: &[Value]) -> OrmResult<QueryResult> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }
        async fn execute(&self, _: QueryType, _: &str, _: &[Value]) -> OrmResult<i64> {
            Ok(0)
        }
    }

    let inst = Instrumentation::new().with_config(
        MonitorConfig::new().with_query_timeout(Duration::from_millis(10)),
    );

    let err = inst
        .query(&HangingClient, "SELECT SLEEP(60)", &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Timeout(_)));
}
