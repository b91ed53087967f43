//! Round trips against a real server.
//!
//! Skipped unless `MYORM_TEST_HOST` is set (a `.env` file is honoured).
//! Optional: `MYORM_TEST_PORT`, `MYORM_TEST_USER`, `MYORM_TEST_PASSWORD`,
//! `MYORM_TEST_DB` (defaults to `test`).

use myorm::{
    ClusterSettings, ColumnMap, Db, MonitorConfig, PoolSettings, QueryType, Record, Settings,
    StatsMonitor, args,
};
use std::env;
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq, Record)]
#[orm(table = "myorm_live_users")]
struct LiveUser {
    #[orm(pk, auto)]
    id: i64,
    name: String,
    age: Option<i32>,
    #[orm(type = "datetime")]
    created_at: Option<chrono::NaiveDateTime>,
}

fn settings() -> Option<Settings> {
    dotenvy::dotenv().ok();
    let host = env::var("MYORM_TEST_HOST").ok()?;
    let port = env::var("MYORM_TEST_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3306);
    let user = env::var("MYORM_TEST_USER").unwrap_or_else(|_| "root".to_string());
    Some(
        Settings::new(host, port, user)
            .password(env::var("MYORM_TEST_PASSWORD").unwrap_or_default())
            .default_db(env::var("MYORM_TEST_DB").unwrap_or_else(|_| "test".to_string()))
            .pool(PoolSettings {
                max_open: 4,
                max_idle: 2,
            }),
    )
}

#[tokio::test]
async fn test_crud_round_trip() {
    let Some(settings) = settings() else {
        eprintln!("MYORM_TEST_HOST not set, skipping");
        return;
    };

    let stats = Arc::new(StatsMonitor::new());
    let db = Db::connect(ClusterSettings::single(settings))
        .await
        .unwrap()
        .with_config(MonitorConfig::new().enable_monitoring())
        .with_monitor_arc(stats.clone());
    db.ping().await.unwrap();

    db.execute(QueryType::Other, "DROP TABLE IF EXISTS myorm_live_users", &[])
        .await
        .unwrap();
    db.execute(
        QueryType::Other,
        "CREATE TABLE myorm_live_users (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(64) NOT NULL,
            age INT NULL,
            created_at DATETIME NULL
        )",
        &[],
    )
    .await
    .unwrap();

    let created = chrono::NaiveDate::from_ymd_opt(2024, 5, 6)
        .and_then(|d| d.and_hms_opt(7, 8, 9));
    let id = db
        .model()
        .add(&LiveUser {
            name: "alice".into(),
            age: Some(30),
            created_at: created,
            ..LiveUser::default()
        })
        .await
        .unwrap();
    assert!(id > 0);

    let mut user: LiveUser = db.model().find_by_pk(args![id]).await.unwrap();
    assert_eq!(user.name, "alice");
    assert_eq!(user.created_at, created);

    user.age = None;
    let affected = db.model().save(&user).await.unwrap();
    assert_eq!(affected, 1);

    let rows = db
        .table("myorm_live_users")
        .filter("id = ?", args![id])
        .select()
        .await
        .unwrap();
    assert!(rows[0].is_null("age"));
    assert_eq!(rows[0].get("age"), Some(myorm::NULL_SENTINEL));

    db.table("myorm_live_users")
        .insert(ColumnMap::new().set("name", "bob"))
        .await
        .unwrap();
    assert_eq!(db.table("myorm_live_users").count().await.unwrap(), 2);

    let err = db.table("myorm_live_users").delete(args![]).await.unwrap_err();
    assert!(err.is_usage());

    let deleted = db
        .table("myorm_live_users")
        .set_primary_keys(["id"])
        .delete(args![id])
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let missing = db
        .model()
        .find_by_pk::<LiveUser>(args![id])
        .await
        .unwrap_err();
    assert!(missing.is_not_found());

    assert!(stats.stats().total_queries > 0);
}
