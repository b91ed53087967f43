//! Attribute parsing for the Record derive macro.
//!
//! Handles struct-level and field-level `#[orm(...)]` attributes. Both flag
//! (`pk`) and key/value (`key = "pk"`) spellings are accepted.

use syn::ext::IdentExt;
use syn::{Attribute, DeriveInput, Result};

/// Storage format of a temporal field, from `type = "..."`.
#[derive(Clone, Copy)]
pub(super) enum Temporal {
    Date,
    DateTime,
    UnixInt,
}

/// Parsed field-level attributes.
#[derive(Default)]
pub(super) struct FieldAttr {
    pub table: Option<String>,
    pub column: Option<String>,
    pub pk: bool,
    pub notfield: bool,
    pub auto: bool,
    pub temporal: Option<Temporal>,
}

impl FieldAttr {
    fn merge(&mut self, other: FieldAttr) {
        if self.table.is_none() {
            self.table = other.table;
        }
        if other.column.is_some() {
            self.column = other.column;
        }
        if other.temporal.is_some() {
            self.temporal = other.temporal;
        }
        self.pk |= other.pk;
        self.notfield |= other.notfield;
        self.auto |= other.auto;
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true")
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            // `type` is a keyword, so plain `Ident` parsing would reject it.
            let ident = syn::Ident::parse_any(input)?;
            let key = ident.to_string();

            if input.peek(syn::Token![=]) {
                let _: syn::Token![=] = input.parse()?;
                let lit: syn::LitStr = input.parse()?;
                let value = lit.value();
                match key.as_str() {
                    "table" => attr.table = Some(value),
                    "column" | "field" => attr.column = Some(value),
                    "key" => match value.as_str() {
                        "pk" => attr.pk = true,
                        "notfield" => attr.notfield = true,
                        _ => {
                            return Err(syn::Error::new_spanned(
                                lit,
                                "expected key = \"pk\" or key = \"notfield\"",
                            ));
                        }
                    },
                    "auto" => attr.auto = is_truthy(&value),
                    "type" => {
                        attr.temporal = Some(match value.as_str() {
                            "date" => Temporal::Date,
                            "datetime" => Temporal::DateTime,
                            "int" => Temporal::UnixInt,
                            _ => {
                                return Err(syn::Error::new_spanned(
                                    lit,
                                    "expected type = \"date\", \"datetime\" or \"int\"",
                                ));
                            }
                        })
                    }
                    _ => {
                        return Err(syn::Error::new_spanned(
                            ident,
                            format!("unknown orm attribute `{key}`"),
                        ));
                    }
                }
            } else {
                match key.as_str() {
                    "pk" => attr.pk = true,
                    "notfield" => attr.notfield = true,
                    "auto" => attr.auto = true,
                    _ => {
                        return Err(syn::Error::new_spanned(
                            ident,
                            format!("unknown orm flag `{key}`"),
                        ));
                    }
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

/// Merge every `#[orm(...)]` attribute on a field.
pub(super) fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in attrs {
        if attr.path().is_ident("orm") {
            merged.merge(attr.parse_args::<FieldAttr>()?);
        }
    }
    Ok(merged)
}

/// Extract the table name from a struct-level `#[orm(table = "...")]`.
pub(super) fn get_table_name(input: &DeriveInput) -> Result<Option<String>> {
    for attr in &input.attrs {
        if attr.path().is_ident("orm") {
            let parsed = attr.parse_args::<FieldAttr>()?;
            if parsed.table.is_some() {
                return Ok(parsed.table);
            }
        }
    }
    Ok(None)
}
