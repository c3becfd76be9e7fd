//! # Strata Macros
//!
//! `#[derive(Entity)]` implements `strata_query::metadata::Entity` for a
//! struct with named fields: a static descriptor of table and columns, plus
//! by-name accessors used for row mapping and parameter binding.
//!
//! ```rust,ignore
//! use strata_macros::Entity;
//!
//! #[derive(Entity, Default, Clone)]
//! #[entity(table = "users")]
//! struct User {
//!     #[column(key, identity)]
//!     id: i64,
//!     #[column(size = 100, unique = "ux_users_email")]
//!     email: String,
//!     #[column(name = "display_name", display = "Display name")]
//!     name: Option<String>,
//!     #[column(ignore)]
//!     session: Vec<u8>,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive `Entity`.
///
/// ## Struct Attributes
///
/// `#[entity(...)]`:
/// - `table = "name"` - Logical table name (defaults to the struct name)
/// - `target = Type` - Map onto the table of another entity
/// - `crate = "path"` - Path of the `strata_query` crate (defaults to `::strata_query`)
///
/// ## Field Attributes
///
/// `#[column(...)]`:
/// - `key` - Member of the primary key, in declaration order
/// - `identity` - Engine-generated value, skipped on insert
/// - `row_version` - Concurrency token, skipped on insert and update
/// - `not_updated` - Skipped on update
/// - `nullable` - Nullable even when the type is not an `Option`
/// - `size = n` - Maximum length
/// - `name = "column"` - Physical column name
/// - `display = "label"` - Display name
/// - `unique = "group"` - Member of the named unique key
/// - `ignore` - Not mapped; the field type must implement `Default`
#[proc_macro_derive(Entity, attributes(entity, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);
	entity::derive_entity_impl(input)
		.unwrap_or_else(syn::Error::into_compile_error)
		.into()
}
