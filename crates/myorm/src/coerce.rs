//! Read-side type coercion: raw column text into typed record fields.
//!
//! Every value that flows from a [`RawRow`](crate::RawRow) into a record goes
//! through [`coerce`]. It dispatches on the destination [`Kind`]:
//!
//! | Kind | Rule |
//! |------|------|
//! | `Str` | verbatim |
//! | `Bool` | `"1"` is true, anything else false |
//! | integers | parsed with the kind's range |
//! | floats | parsed with the kind's precision |
//! | `Temporal` | `YYYY-MM-DD HH:MM:SS[.f]`, then `YYYY-MM-DD HH:MM:SS.mmm ±HHMM`, then Unix seconds, then `YYYY-MM-DD` |
//! | `Bytes` | UTF-8 bytes of the raw text |
//! | `Unsupported` | always fails |

use crate::error::{OrmError, OrmResult};
use crate::row::NULL_SENTINEL;
use crate::value::DATE_FORMAT;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Destination kind of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Str,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Temporal,
    Bytes,
    /// A structured kind the engine cannot map; carries the type name.
    Unsupported(&'static str),
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Str => "string",
            Kind::Bool => "bool",
            Kind::I8 => "i8",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::U8 => "u8",
            Kind::U16 => "u16",
            Kind::U32 => "u32",
            Kind::U64 => "u64",
            Kind::F32 => "f32",
            Kind::F64 => "f64",
            Kind::Temporal => "datetime",
            Kind::Bytes => "bytes",
            Kind::Unsupported(name) => name,
        }
    }
}

/// A coerced value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Temporal(DateTime<Utc>),
    Bytes(Vec<u8>),
}

/// `YYYY-MM-DD HH:MM:SS` with an optional fractional second.
const PRIMARY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// `YYYY-MM-DD HH:MM:SS.mmm ±HHMM`
const ZONED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f %z";

fn conversion_err(kind: Kind, raw: &str, message: impl std::fmt::Display) -> OrmError {
    OrmError::conversion(kind.name(), raw, message.to_string())
}

macro_rules! parse_as {
    ($raw:expr, $kind:expr, $ty:ty, $variant:ident) => {
        $raw.parse::<$ty>()
            .map(Scalar::$variant)
            .map_err(|e| conversion_err($kind, $raw, e))
    };
}

/// Whether `raw` spells an infinity rather than a finite number.
fn is_infinity_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    digits.eq_ignore_ascii_case("inf") || digits.eq_ignore_ascii_case("infinity")
}

/// Like `parse_as!`, but a finite literal that overflows the float type is
/// out of range rather than infinity.
macro_rules! parse_float {
    ($raw:expr, $kind:expr, $ty:ty, $variant:ident) => {
        match $raw.parse::<$ty>() {
            Ok(v) if v.is_infinite() && !is_infinity_literal($raw) => Err(conversion_err(
                $kind,
                $raw,
                concat!("value out of range for ", stringify!($ty)),
            )),
            Ok(v) => Ok(Scalar::$variant(v)),
            Err(e) => Err(conversion_err($kind, $raw, e)),
        }
    };
}

/// Coerce raw column text into a value of `kind`.
///
/// The error's `field` is the kind name; the field mapper re-labels it with
/// the record field before returning it to the caller.
pub fn coerce(raw: &str, kind: Kind) -> OrmResult<Scalar> {
    match kind {
        Kind::Str => Ok(Scalar::Str(raw.to_string())),
        Kind::Bool => Ok(Scalar::Bool(raw == "1")),
        Kind::I8 => parse_as!(raw, kind, i8, I8),
        Kind::I16 => parse_as!(raw, kind, i16, I16),
        Kind::I32 => parse_as!(raw, kind, i32, I32),
        Kind::I64 => parse_as!(raw, kind, i64, I64),
        Kind::U8 => parse_as!(raw, kind, u8, U8),
        Kind::U16 => parse_as!(raw, kind, u16, U16),
        Kind::U32 => parse_as!(raw, kind, u32, U32),
        Kind::U64 => parse_as!(raw, kind, u64, U64),
        Kind::F32 => parse_float!(raw, kind, f32, F32),
        Kind::F64 => parse_float!(raw, kind, f64, F64),
        Kind::Temporal => parse_temporal(raw)
            .map(Scalar::Temporal)
            .ok_or_else(|| conversion_err(kind, raw, "unsupported time format")),
        Kind::Bytes => Ok(Scalar::Bytes(raw.as_bytes().to_vec())),
        Kind::Unsupported(name) => Err(conversion_err(
            kind,
            raw,
            format!("cannot map structured type `{name}`; only flat scalar fields are supported"),
        )),
    }
}

/// Parse a temporal value, trying each accepted representation in order.
pub fn parse_temporal(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, PRIMARY_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(zoned) = DateTime::parse_from_str(raw, ZONED_FORMAT) {
        return Some(zoned.with_timezone(&Utc));
    }
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Types that can be populated from raw column text.
///
/// Implemented for the flat scalar types the engine maps. Record fields of any
/// other type fail to derive, so unsupported shapes are caught at compile time.
pub trait FromRaw: Sized {
    /// Destination kind used for coercion.
    const KIND: Kind;

    /// Build a value from raw column text.
    fn from_raw(raw: &str) -> OrmResult<Self>;

    /// Build a value from a column that may be SQL NULL (`None`).
    ///
    /// NULL reaches [`FromRaw::from_raw`] as the NULL sentinel, so a
    /// non-optional field sees the same text a [`RawRow`](crate::RawRow) shows.
    fn from_nullable(raw: Option<&str>) -> OrmResult<Self> {
        Self::from_raw(raw.unwrap_or(NULL_SENTINEL))
    }
}

macro_rules! impl_from_raw {
    ($($t:ty => $kind:ident),* $(,)?) => {$(
        impl FromRaw for $t {
            const KIND: Kind = Kind::$kind;

            fn from_raw(raw: &str) -> OrmResult<Self> {
                match coerce(raw, Self::KIND)? {
                    Scalar::$kind(v) => Ok(v),
                    other => Err(conversion_err(
                        Self::KIND,
                        raw,
                        format!("coercer produced {other:?}"),
                    )),
                }
            }
        }
    )*};
}

impl_from_raw!(
    String => Str,
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Vec<u8> => Bytes,
);

impl FromRaw for isize {
    const KIND: Kind = Kind::I64;

    fn from_raw(raw: &str) -> OrmResult<Self> {
        let n = i64::from_raw(raw)?;
        isize::try_from(n).map_err(|e| conversion_err(Kind::I64, raw, e))
    }
}

impl FromRaw for usize {
    const KIND: Kind = Kind::U64;

    fn from_raw(raw: &str) -> OrmResult<Self> {
        let n = u64::from_raw(raw)?;
        usize::try_from(n).map_err(|e| conversion_err(Kind::U64, raw, e))
    }
}

impl FromRaw for DateTime<Utc> {
    const KIND: Kind = Kind::Temporal;

    fn from_raw(raw: &str) -> OrmResult<Self> {
        match coerce(raw, Self::KIND)? {
            Scalar::Temporal(dt) => Ok(dt),
            other => Err(conversion_err(Self::KIND, raw, format!("coercer produced {other:?}"))),
        }
    }
}

impl FromRaw for NaiveDateTime {
    const KIND: Kind = Kind::Temporal;

    fn from_raw(raw: &str) -> OrmResult<Self> {
        DateTime::<Utc>::from_raw(raw).map(|dt| dt.naive_utc())
    }
}

impl FromRaw for NaiveDate {
    const KIND: Kind = Kind::Temporal;

    fn from_raw(raw: &str) -> OrmResult<Self> {
        DateTime::<Utc>::from_raw(raw).map(|dt| dt.date_naive())
    }
}

/// From bare text the sentinel becomes `None`. Through
/// [`FromRaw::from_nullable`] only SQL NULL does, and a stored `"NULL"` string
/// is kept.
impl<T: FromRaw> FromRaw for Option<T> {
    const KIND: Kind = T::KIND;

    fn from_raw(raw: &str) -> OrmResult<Self> {
        if raw == NULL_SENTINEL {
            Ok(None)
        } else {
            T::from_raw(raw).map(Some)
        }
    }

    fn from_nullable(raw: Option<&str>) -> OrmResult<Self> {
        raw.map(T::from_raw).transpose()
    }
}
