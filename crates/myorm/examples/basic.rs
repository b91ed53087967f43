//! Basic usage example for myorm
//!
//! Run with: cargo run --example basic -p myorm
//!
//! Set the writer endpoint in a .env file or the environment:
//! MYORM_HOST=127.0.0.1 MYORM_USER=root MYORM_PASSWORD=secret MYORM_DB=myorm_example
//!
//! The same endpoint is used for reads; use `ClusterSettings::new` to point
//! reads at a replica.

use myorm::prelude::*;
use myorm::{
    HookAction, MonitorConfig, QueryContext, QueryHook, QueryOutcome, StatsMonitor,
    TracingSqlHook,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default, Record)]
#[orm(table = "users")]
struct User {
    #[orm(pk, auto)]
    id: i64,
    #[orm(column = "username")]
    name: String,
    email: Option<String>,
    #[orm(type = "datetime")]
    created_at: Option<chrono::NaiveDateTime>,
}

/// Prints every statement and its outcome.
struct PrintHook;

impl QueryHook for PrintHook {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        println!("[{}] {}", ctx.role, ctx.exec_sql);
        HookAction::Continue
    }

    fn after_query(&self, _ctx: &QueryContext, duration: Duration, outcome: &QueryOutcome) {
        println!("    -> {outcome} in {duration:?}");
    }
}

#[tokio::main]
async fn main() -> Result<(), OrmError> {
    dotenvy::dotenv().ok();

    let host = env::var("MYORM_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let user = env::var("MYORM_USER").unwrap_or_else(|_| "root".to_string());
    let settings = Settings::new(host, 3306, user)
        .password(env::var("MYORM_PASSWORD").unwrap_or_default())
        .default_db(env::var("MYORM_DB").unwrap_or_else(|_| "myorm_example".to_string()));

    let stats = Arc::new(StatsMonitor::new());
    let db = Db::connect(ClusterSettings::single(settings))
        .await?
        .with_hook(TracingSqlHook::new())
        .with_hook(PrintHook)
        .with_config(MonitorConfig::new().enable_monitoring())
        .with_monitor_arc(stats.clone());

    db.execute(
        QueryType::Other,
        "CREATE TABLE IF NOT EXISTS users (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            username VARCHAR(64) NOT NULL,
            email VARCHAR(128) NULL,
            created_at DATETIME NULL
        )",
        &[],
    )
    .await?;
    db.execute(QueryType::Delete, "DELETE FROM users", &[]).await?;

    // ============================================
    // Records
    // ============================================
    println!("=== add / find_by_pk / save ===");

    let id = db
        .model()
        .add(&User {
            name: "alice".into(),
            email: Some("alice@example.com".into()),
            created_at: Some(chrono::Utc::now().naive_utc()),
            ..User::default()
        })
        .await?;

    let mut alice: User = db.model().find_by_pk(args![id]).await?;
    println!("found {alice:?}");

    alice.email = None;
    db.model().save(&alice).await?;

    // ============================================
    // Column maps and raw rows
    // ============================================
    println!("=== insert / select ===");

    db.table("users")
        .insert(ColumnMap::new().set("username", "bob"))
        .await?;

    let rows = db
        .table("users")
        .select_columns(["id", "username", "email"])
        .filter("username <> ?", args!["nobody"])
        .order_by(["id"])
        .limit(0, 10)
        .select()
        .await?;
    for row in &rows {
        println!(
            "{} {} email null: {}",
            row.get("id").unwrap_or_default(),
            row.get("username").unwrap_or_default(),
            row.is_null("email")
        );
    }

    let total = db.table("users").count().await?;
    println!("{total} users");

    // Guarded: no predicate and no primary key values.
    match db.table("users").delete(args![]).await {
        Err(e) if e.is_usage() => println!("refused: {e}"),
        other => println!("unexpected: {other:?}"),
    }

    let all: Vec<User> = db.model().find_list().await?;
    println!("{} records", all.len());

    let s = stats.stats();
    println!(
        "stats: {} statements, {} selects, {} inserts, {} failed",
        s.total_queries, s.select_count, s.insert_count, s.failed_queries
    );

    Ok(())
}
