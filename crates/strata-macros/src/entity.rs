//! Expansion of `#[derive(Entity)]`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub(crate) mod attr_parser;

use attr_parser::{ColumnAttrs, EntityAttrs};

pub(crate) fn derive_entity_impl(input: DeriveInput) -> Result<TokenStream> {
	let entity_attrs = EntityAttrs::from_attributes(&input.attrs)?;
	let krate = entity_attrs.crate_path()?;
	let struct_name = &input.ident;
	let type_name = struct_name.to_string();

	let fields = match &input.data {
		Data::Struct(data) => match &data.fields {
			Fields::Named(fields) => &fields.named,
			_ => {
				return Err(syn::Error::new_spanned(
					&input,
					"#[derive(Entity)] only supports structs with named fields",
				));
			}
		},
		_ => {
			return Err(syn::Error::new_spanned(
				&input,
				"#[derive(Entity)] only supports structs",
			));
		}
	};

	let mut properties = Vec::new();
	let mut getters = Vec::new();
	let mut setters = Vec::new();

	for field in fields {
		let attrs = ColumnAttrs::from_attributes(&field.attrs)?;
		if attrs.ignore {
			continue;
		}
		let Some(ident) = field.ident.as_ref() else {
			continue;
		};
		let ty = &field.ty;
		let name = ident.to_string();

		let mut property = quote! {
			#krate::metadata::PropertyDescriptor::new(
				#name,
				<#ty as #krate::value::SqlType>::column_type(),
			)
			.nullable(<#ty as #krate::value::SqlType>::is_nullable())
		};
		if attrs.nullable {
			property = quote! { #property.nullable(true) };
		}
		if let Some(column) = &attrs.name {
			property = quote! { #property.column(#column) };
		}
		if let Some(display) = &attrs.display {
			property = quote! { #property.display_name(#display) };
		}
		if let Some(size) = attrs.size {
			property = quote! { #property.max_length(#size) };
		}
		if attrs.key {
			property = quote! { #property.key() };
		}
		if attrs.identity {
			property = quote! { #property.identity() };
		}
		if attrs.row_version {
			property = quote! { #property.row_version() };
		}
		if attrs.not_updated {
			property = quote! { #property.not_updated() };
		}
		if let Some(group) = &attrs.unique {
			property = quote! { #property.unique(#group) };
		}
		properties.push(property);

		getters.push(quote! {
			#name => ::std::option::Option::Some(#krate::value::Value::from(
				::std::clone::Clone::clone(&self.#ident),
			)),
		});
		setters.push(quote! {
			#name => {
				self.#ident = <#ty as #krate::value::FromValue>::from_value(value)?;
				::std::result::Result::Ok(())
			}
		});
	}

	let table = entity_attrs
		.table
		.as_ref()
		.map(|table| quote! { .table(#table) });
	let target = entity_attrs
		.target
		.as_ref()
		.map(|target| quote! { .target(#krate::metadata::get_entity_type::<#target>) });
	let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

	Ok(quote! {
		impl #impl_generics #krate::metadata::Entity for #struct_name #ty_generics #where_clause {
			fn descriptor() -> #krate::metadata::EntityDescriptor {
				#krate::metadata::EntityDescriptor::new(#type_name)
					#table
					#target
					#(.property(#properties))*
			}

			fn get_value(&self, property: &str) -> ::std::option::Option<#krate::value::Value> {
				match property {
					#(#getters)*
					_ => ::std::option::Option::None,
				}
			}

			fn set_value(
				&mut self,
				property: &str,
				value: #krate::value::Value,
			) -> #krate::error::Result<()> {
				match property {
					#(#setters)*
					_ => ::std::result::Result::Err(#krate::error::QueryError::UnknownProperty {
						entity: #type_name.to_string(),
						property: property.to_string(),
					}),
				}
			}
		}
	})
}
