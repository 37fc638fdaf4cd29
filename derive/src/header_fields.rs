use super::utils;

use darling::ast::Data;
use darling::util::Ignored;
use darling::{Error, FromDeriveInput, FromField, Result};
use proc_macro2::TokenStream;
use quote::quote;

#[derive(FromDeriveInput)]
#[darling(attributes(ovf), supports(struct_named))]
struct HeaderInput {
    ident: syn::Ident,
    generics: syn::Generics,
    data: Data<Ignored, HeaderMember>,
}

#[derive(FromField)]
#[darling(attributes(ovf))]
struct HeaderMember {
    ident: Option<syn::Ident>,
    #[darling(default)]
    skip: bool,
    #[darling(default)]
    repeatable: bool,
    #[darling(default)]
    label: Option<String>,
}

pub fn derive(input: &syn::DeriveInput) -> Result<TokenStream> {
    let parsed = HeaderInput::from_derive_input(input)?;

    let struct_type = parsed.ident;
    let (impl_generics, ty_generics, where_clause) = parsed.generics.split_for_impl();

    let members = parsed
        .data
        .take_struct()
        .ok_or_else(|| Error::unsupported_shape("enum"))?
        .fields;

    let mut records = Vec::new();
    for member in members.iter().filter(|m| !m.skip) {
        // supports(struct_named) guarantees an identifier
        let ident = member
            .ident
            .as_ref()
            .ok_or_else(|| Error::unsupported_shape("unnamed member"))?;
        records.push((utils::record_key(ident), ident, member));
    }

    let keyed: Vec<(String, &syn::Ident)> =
        records.iter().map(|(key, ident, _)| (key.clone(), *ident)).collect();
    utils::check_unique(&keyed)?;

    let keys: Vec<&String> = records.iter().map(|(key, _, _)| key).collect();
    let idents: Vec<&syn::Ident> = records.iter().map(|(_, ident, _)| *ident).collect();

    let labels: Vec<String> = records
        .iter()
        .map(|(key, _, member)| member.label.clone().unwrap_or_else(|| key.clone()))
        .collect();

    let repeatable: Vec<&String> = records
        .iter()
        .filter(|(_, _, member)| member.repeatable)
        .map(|(key, _, _)| key)
        .collect();

    // an empty alternation is not a valid pattern
    let repeatable_body = if repeatable.is_empty() {
        quote! { let _ = name; false }
    } else {
        quote! { matches!(name, #(#repeatable)|*) }
    };

    let expanded = quote! {
        impl #impl_generics ovf::header::HeaderFields for #struct_type #ty_generics #where_clause {
            const FIELD_NAMES: &'static [&'static str] = &[#(#keys),*];

            fn label(name: &str) -> Option<&'static str> {
                match name {
                    #(#keys => Some(#labels),)*
                    _ => None,
                }
            }

            fn is_repeatable(name: &str) -> bool {
                #repeatable_body
            }

            fn slot(&self, name: &str) -> Option<&dyn ovf::header::FieldSlot> {
                match name {
                    #(#keys => Some(&self.#idents),)*
                    _ => None,
                }
            }

            fn slot_mut(&mut self, name: &str) -> Option<&mut dyn ovf::header::FieldSlot> {
                match name {
                    #(#keys => Some(&mut self.#idents),)*
                    _ => None,
                }
            }
        }
    };

    Ok(expanded)
}
