//! Record derive macro implementation.
//!
//! Generates a static `Schema` plus index-based accessors, so the runtime
//! mapper never needs to inspect field types.

mod attrs;

use attrs::{Temporal, get_table_name, parse_field_attrs};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    // Struct-level table wins; otherwise the first field that names one.
    let mut table = get_table_name(&input)?;

    let mut descriptors = Vec::new();
    let mut getters = Vec::new();
    let mut setters = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let ty = &field.ty;
        let attr = parse_field_attrs(&field.attrs)?;

        if table.is_none() {
            table.clone_from(&attr.table);
        }

        let field_name = ident.to_string().trim_start_matches("r#").to_string();
        let column = attr.column.clone().unwrap_or_else(|| field_name.clone());

        let role = if attr.notfield {
            quote! { ::myorm::FieldRole::Excluded }
        } else if attr.pk {
            quote! { ::myorm::FieldRole::PrimaryKey }
        } else {
            quote! { ::myorm::FieldRole::Ordinary }
        };
        let generated = attr.auto;
        let temporal = match attr.temporal {
            Some(Temporal::Date) => quote! { Some(::myorm::TemporalFormat::Date) },
            Some(Temporal::DateTime) => quote! { Some(::myorm::TemporalFormat::DateTime) },
            Some(Temporal::UnixInt) => quote! { Some(::myorm::TemporalFormat::UnixInt) },
            None => quote! { None },
        };

        // Excluded fields may have any type; they are never coerced.
        let kind = if attr.notfield {
            let type_name = quote!(#ty).to_string().replace(' ', "");
            quote! { ::myorm::Kind::Unsupported(#type_name) }
        } else {
            getters.push(quote! {
                #index => ::std::option::Option::Some(::myorm::ToField::to_field(&self.#ident)),
            });
            setters.push(quote! {
                #index => self.#ident = ::myorm::FromRaw::from_nullable(raw)?,
            });
            quote! { <#ty as ::myorm::FromRaw>::KIND }
        };

        descriptors.push(quote! {
            ::myorm::FieldDescriptor {
                name: #field_name,
                column: #column,
                role: #role,
                generated: #generated,
                temporal: #temporal,
                kind: #kind,
            }
        });
    }

    let table = match table {
        Some(t) => quote! { ::std::option::Option::Some(#t) },
        None => quote! { ::std::option::Option::None },
    };

    Ok(quote! {
        impl #impl_generics ::myorm::Record for #name #ty_generics #where_clause {
            const SCHEMA: &'static ::myorm::Schema = &::myorm::Schema {
                table: #table,
                fields: &[#(#descriptors),*],
            };

            fn field_value(&self, index: usize) -> ::std::option::Option<::myorm::FieldValue> {
                match index {
                    #(#getters)*
                    _ => ::std::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn assign(&mut self, index: usize, raw: ::std::option::Option<&str>) -> ::myorm::OrmResult<()> {
                match index {
                    #(#setters)*
                    _ => {}
                }
                ::std::result::Result::Ok(())
            }
        }
    })
}
