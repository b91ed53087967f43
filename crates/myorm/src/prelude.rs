//! Convenient imports for typical `myorm` usage.
//!
//! ```ignore
//! use myorm::prelude::*;
//! ```

pub use crate::{
    ClusterSettings, ColumnMap, Db, GenericClient, OrmError, OrmResult, QueryType, RawRow,
    Record, Settings, Value, args,
};
