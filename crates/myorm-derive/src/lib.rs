//! Derive macros for myorm
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive the `Record` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use myorm::Record;
///
/// #[derive(Debug, Default, Record)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(pk, auto)]
///     id: i64,
///     #[orm(column = "user_name")]
///     name: String,
///     #[orm(type = "int")]
///     updated_at: chrono::NaiveDateTime,
///     #[orm(notfield)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// # Attributes
///
/// Struct level:
/// - `#[orm(table = "name")]` - Default table for queries on this record
///
/// Field level:
/// - `#[orm(column = "name")]` (or `field = "name"`) - Map field to a different column name
/// - `#[orm(pk)]` (or `key = "pk"`) - Part of the primary key, in declaration order
/// - `#[orm(auto)]` (or `auto = "1"`) - Generated by the server, never written
/// - `#[orm(notfield)]` (or `key = "notfield"`) - Not mapped at all
/// - `#[orm(type = "date" | "datetime" | "int")]` - Write format of a temporal field
/// - `#[orm(table = "name")]` - Table name when the struct has none (first one wins)
///
/// Mapped field types must implement `FromRaw` and `ToField`, so structured
/// fields are rejected at compile time unless marked `notfield`.
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
