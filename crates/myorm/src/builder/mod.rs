//! Query builder and CRUD executor.
//!
//! [`QuerySpec`] is the plain-data description of a statement and renders
//! MySQL text (`?` placeholders, `LIMIT offset,count`). [`Model`] pairs a
//! spec with a [`Db`](crate::Db) and adds the terminal operations.

mod model;
mod spec;

pub use model::Model;
pub use spec::QuerySpec;
