//! Writer/reader connection pools.
//!
//! Each endpoint gets a `deadpool` managed pool of `mysql_async` connections.
//! Connections are health-checked with `COM_PING` when they are handed out,
//! and a pool whose connections cannot be established is rebuilt once before
//! the checkout is reported as failed.

use crate::client::GenericClient;
use crate::config::{ClusterSettings, Settings};
use crate::error::{OrmError, OrmResult};
use crate::monitor::QueryType;
use crate::row::{QueryResult, RawRow};
use crate::value::{Value, driver_params};
use deadpool::managed::{self, Metrics, PoolError, RecycleResult};
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder};
use std::cell::Cell;
use std::fmt;
use std::sync::RwLock;

/// Which endpoint a pool talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolRole {
    /// Primary; every write goes here.
    Writer,
    /// Replica; every read goes here.
    Reader,
}

impl PoolRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolRole::Writer => "writer",
            PoolRole::Reader => "reader",
        }
    }
}

impl fmt::Display for PoolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `deadpool` manager creating `mysql_async` connections.
#[derive(Debug, Clone)]
pub struct MysqlManager {
    opts: Opts,
}

impl MysqlManager {
    /// Build connection options from endpoint settings.
    ///
    /// Authentication data is only sent when a password is configured, and
    /// every new connection runs `SET NAMES <charset>`.
    pub fn new(settings: &Settings) -> Self {
        let mut builder = OptsBuilder::default()
            .ip_or_hostname(settings.host.clone())
            .tcp_port(settings.port)
            .user(Some(settings.user.clone()))
            .init(vec![format!("SET NAMES {}", settings.charset)]);
        if !settings.password.is_empty() {
            builder = builder.pass(Some(settings.password.clone()));
        }
        if !settings.default_db.is_empty() {
            builder = builder.db_name(Some(settings.default_db.clone()));
        }
        Self {
            opts: Opts::from(builder),
        }
    }
}

impl managed::Manager for MysqlManager {
    type Type = Conn;
    type Error = mysql_async::Error;

    async fn create(&self) -> Result<Conn, mysql_async::Error> {
        Conn::new(self.opts.clone()).await
    }

    async fn recycle(&self, conn: &mut Conn, _: &Metrics) -> RecycleResult<mysql_async::Error> {
        conn.ping().await?;
        Ok(())
    }
}

type Pool = managed::Pool<MysqlManager>;

/// A pooled connection checked out from a [`ManagedPool`].
pub type PooledConn = managed::Object<MysqlManager>;

/// A pool plus a counter bumped every time it is replaced.
#[derive(Clone)]
struct Generation {
    id: u64,
    pool: Pool,
}

/// One endpoint's pool plus what is needed to rebuild it.
pub struct ManagedPool {
    role: PoolRole,
    settings: Settings,
    pool: RwLock<Generation>,
}

impl fmt::Debug for ManagedPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedPool")
            .field("role", &self.role)
            .field("endpoint", &self.settings.endpoint())
            .finish_non_exhaustive()
    }
}

fn build_pool(settings: &Settings) -> OrmResult<Pool> {
    Pool::builder(MysqlManager::new(settings))
        .max_size(settings.pool.max_open)
        .build()
        .map_err(|e| OrmError::Pool(e.to_string()))
}

impl ManagedPool {
    /// Create the pool without dialing.
    pub fn new(role: PoolRole, settings: Settings) -> OrmResult<Self> {
        settings.validate()?;
        let pool = build_pool(&settings)?;
        Ok(Self {
            role,
            settings,
            pool: RwLock::new(Generation { id: 0, pool }),
        })
    }

    pub fn role(&self) -> PoolRole {
        self.role
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current pool handle. The lock is released before any await.
    fn current(&self) -> Generation {
        match self.pool.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of connections currently idle in the pool.
    pub fn idle(&self) -> usize {
        self.current().pool.status().available
    }

    /// Drop idle connections above `max_idle`.
    fn trim_idle(&self, pool: &Pool) {
        let max_idle = self.settings.pool.max_idle;
        let idle = pool.status().available;
        if idle <= max_idle {
            return;
        }
        // `retain` takes an `Fn`, so the countdown lives in a `Cell`.
        let excess = Cell::new(idle - max_idle);
        let _ = pool.retain(|_, _| {
            let left = excess.get();
            if left > 0 {
                excess.set(left - 1);
                false
            } else {
                true
            }
        });
        tracing::debug!(
            target: "myorm.pool",
            role = %self.role,
            dropped = idle - max_idle,
            "trimmed idle connections"
        );
    }

    /// Replace generation `failed` with a fresh pool and close the old one.
    ///
    /// When another caller already replaced it, the newer pool is returned
    /// untouched.
    fn rebuild(&self, failed: u64) -> OrmResult<Pool> {
        let mut guard = match self.pool.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.id != failed {
            return Ok(guard.pool.clone());
        }
        let fresh = build_pool(&self.settings)?;
        let old = std::mem::replace(
            &mut *guard,
            Generation {
                id: failed + 1,
                pool: fresh.clone(),
            },
        );
        drop(guard);
        old.pool.close();
        Ok(fresh)
    }

    /// Check out a live connection.
    ///
    /// If no connection can be established the pool is rebuilt and the
    /// checkout retried once; a second failure is a connection error.
    pub async fn checkout(&self) -> OrmResult<PooledConn> {
        let Generation { id, pool } = self.current();
        self.trim_idle(&pool);

        match pool.get().await {
            Ok(conn) => Ok(conn),
            Err(PoolError::Backend(err)) => {
                tracing::warn!(
                    target: "myorm.pool",
                    role = %self.role,
                    endpoint = %self.settings.endpoint(),
                    error = %err,
                    "checkout failed, rebuilding pool"
                );
                let pool = self.rebuild(id)?;
                pool.get().await.map_err(|err| {
                    OrmError::Connection(format!(
                        "{} {}: {err}",
                        self.role,
                        self.settings.endpoint()
                    ))
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Check out a connection and ping it.
    pub async fn ping(&self) -> OrmResult<()> {
        let mut conn = self.checkout().await?;
        conn.ping().await.map_err(OrmError::from_db_error)
    }
}

/// Owns the writer and reader pools and routes statements between them.
///
/// Reads always go to the reader, writes always to the writer. Both pools
/// can be shared freely across tasks.
#[derive(Debug)]
pub struct ConnectionManager {
    writer: ManagedPool,
    reader: ManagedPool,
}

impl ConnectionManager {
    /// Build both pools without dialing.
    pub fn new(cluster: ClusterSettings) -> OrmResult<Self> {
        cluster.validate()?;
        Ok(Self {
            writer: ManagedPool::new(PoolRole::Writer, cluster.writer)?,
            reader: ManagedPool::new(PoolRole::Reader, cluster.reader)?,
        })
    }

    /// Build both pools and verify each endpoint with one checkout.
    pub async fn connect(cluster: ClusterSettings) -> OrmResult<Self> {
        let manager = Self::new(cluster)?;
        for pool in [&manager.writer, &manager.reader] {
            pool.checkout().await.map_err(|e| match e {
                OrmError::Pool(msg) => OrmError::Connection(msg),
                other => other,
            })?;
            tracing::info!(
                target: "myorm.pool",
                role = %pool.role(),
                endpoint = %pool.settings().endpoint(),
                db = %pool.settings().default_db,
                "connected"
            );
        }
        Ok(manager)
    }

    pub fn writer(&self) -> &ManagedPool {
        &self.writer
    }

    pub fn reader(&self) -> &ManagedPool {
        &self.reader
    }

    /// The pool a statement of `kind` runs on.
    pub fn route(&self, kind: QueryType) -> &ManagedPool {
        match kind {
            QueryType::Select => &self.reader,
            _ => &self.writer,
        }
    }
}

impl GenericClient for ConnectionManager {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<QueryResult> {
        let mut conn = self.reader.checkout().await?;
        let rows: Vec<mysql_async::Row> = conn
            .exec(sql, driver_params(params))
            .await
            .map_err(OrmError::from_db_error)?;
        Ok(rows.iter().map(RawRow::from_driver).collect())
    }

    async fn execute(&self, kind: QueryType, sql: &str, params: &[Value]) -> OrmResult<i64> {
        let mut conn = self.writer.checkout().await?;
        conn.exec_drop(sql, driver_params(params))
            .await
            .map_err(OrmError::from_db_error)?;
        let n = match kind {
            QueryType::Insert => conn.last_insert_id().unwrap_or(0),
            _ => conn.affected_rows(),
        };
        Ok(i64::try_from(n).unwrap_or(i64::MAX))
    }

    async fn ping(&self) -> OrmResult<()> {
        self.reader.ping().await?;
        self.writer.ping().await
    }
}
