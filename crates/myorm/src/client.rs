//! Generic client trait for the two raw primitives.

use crate::error::{OrmError, OrmResult};
use crate::monitor::QueryType;
use crate::row::{QueryResult, RawRow};
use crate::value::Value;

/// The raw primitives every terminal call is built on.
///
/// [`ConnectionManager`](crate::ConnectionManager) is the production
/// implementation; anything else (a recording fake in tests, a wrapper that
/// adds retries) can stand in for it behind a [`Db`](crate::Db).
pub trait GenericClient: Send + Sync {
    /// Run a read on the reader pool and decode every row.
    ///
    /// NULL columns decode to the NULL sentinel, never to an absent key.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<QueryResult>> + Send;

    /// Run a write on the writer pool.
    ///
    /// Returns the last inserted id for [`QueryType::Insert`] and the
    /// affected-row count for everything else.
    fn execute(
        &self,
        kind: QueryType,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<i64>> + Send;

    /// Execute a read and return the first row, if any.
    fn query_opt(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Option<RawRow>>> + Send {
        async move { Ok(self.query(sql, params).await?.into_iter().next()) }
    }

    /// Execute a read and return the first row.
    ///
    /// Returns `OrmError::NotFound` if no rows are returned.
    fn query_one(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<RawRow>> + Send {
        async move {
            self.query_opt(sql, params)
                .await?
                .ok_or_else(|| OrmError::not_found("Expected 1 row, got 0"))
        }
    }

    /// Verify connectivity. The default assumes the client is always live.
    fn ping(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send {
        async { Ok(()) }
    }
}

impl<C: GenericClient> GenericClient for std::sync::Arc<C> {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<QueryResult> {
        (**self).query(sql, params).await
    }

    async fn execute(&self, kind: QueryType, sql: &str, params: &[Value]) -> OrmResult<i64> {
        (**self).execute(kind, sql, params).await
    }

    async fn ping(&self) -> OrmResult<()> {
        (**self).ping().await
    }
}
