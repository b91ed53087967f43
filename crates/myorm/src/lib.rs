//! # myorm
//!
//! A MySQL record mapper and query builder with writer/reader routing.
//!
//! ## Features
//!
//! - **Two pools**: every read goes to the reader endpoint, every write to the writer
//! - **Static schemas**: `#[derive(Record)]` describes a struct's columns once, at compile time
//! - **Text-first rows**: results arrive as column text (NULL as the `"NULL"` sentinel) and
//!   are coerced into record fields on demand
//! - **Fluent, by-value builder**: a query's configuration can never leak into the next one
//! - **Safe defaults**: DELETE needs a predicate or primary key values, mistakes surface as
//!   `OrmError::Usage` instead of reaching the server
//! - **Query monitoring**: hooks and monitors see every statement, with `tracing` output built in
//!
//! ## Example
//!
//! ```ignore
//! use myorm::prelude::*;
//!
//! #[derive(Debug, Default, Record)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(pk, auto)]
//!     id: i64,
//!     name: String,
//!     age: i32,
//! }
//!
//! let db = Db::connect(ClusterSettings::single(settings)).await?;
//!
//! let id = db.model().add(&User { name: "Alice".into(), age: 30, ..Default::default() }).await?;
//! let user: User = db.model().find_by_pk(args![id]).await?;
//!
//! let adults: Vec<User> = db
//!     .model()
//!     .filter("age >= ?", args![18])
//!     .order_by(["id"])
//!     .limit(0, 20)
//!     .find_list()
//!     .await?;
//! ```

pub mod builder;
pub mod client;
pub mod coerce;
pub mod config;
pub mod db;
pub mod error;
pub mod mapper;
pub mod monitor;
pub mod pool;
pub mod prelude;
pub mod row;
pub mod sql;
pub mod value;

#[cfg(test)]
mod test_support;

pub use builder::{Model, QuerySpec};
pub use client::GenericClient;
pub use coerce::{FromRaw, Kind, Scalar, coerce, parse_temporal};
pub use config::{ClusterSettings, PoolSettings, Settings};
pub use db::Db;
pub use error::{OrmError, OrmResult};
pub use mapper::{
    ColumnMap, FieldDescriptor, FieldRole, FieldValue, Mapped, Record, Schema, TemporalFormat,
    ToField, from_column_map, from_row, schema_column_map, to_column_map,
};
pub use monitor::{
    CompositeHook, CompositeMonitor, HookAction, Instrumentation, MonitorConfig, NoopMonitor,
    QueryContext, QueryHook, QueryMonitor, QueryOutcome, QueryStats, QueryType, StatsMonitor,
    TracingSqlHook,
};
pub use pool::{ConnectionManager, ManagedPool, MysqlManager, PoolRole, PooledConn};
pub use row::{NULL_SENTINEL, QueryResult, RawRow};
pub use sql::count_placeholders;
pub use value::Value;

#[cfg(feature = "derive")]
pub use myorm_derive::Record;
