//! Attribute parsing for `#[entity(...)]` and `#[column(...)]`.

use syn::{
	Attribute, Error, Ident, Lit, LitStr, Path, Result, Token,
	parse::{Parse, ParseStream},
	punctuated::Punctuated,
};

/// Parsed attributes from `#[entity(...)]`.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntityAttrs {
	pub(crate) table: Option<String>,
	pub(crate) target: Option<Path>,
	pub(crate) krate: Option<String>,
}

impl EntityAttrs {
	pub(crate) fn from_attributes(attrs: &[Attribute]) -> Result<Self> {
		let mut result = Self::default();
		for attr in attrs.iter().filter(|a| a.path().is_ident("entity")) {
			attr.parse_nested_meta(|meta| {
				if meta.path.is_ident("table") {
					set_once(&mut result.table, meta.value()?.parse::<LitStr>()?.value(), &meta.path)
				} else if meta.path.is_ident("target") {
					set_once(&mut result.target, meta.value()?.parse::<Path>()?, &meta.path)
				} else if meta.path.is_ident("crate") {
					set_once(&mut result.krate, meta.value()?.parse::<LitStr>()?.value(), &meta.path)
				} else {
					Err(meta.error("unknown entity attribute"))
				}
			})?;
		}
		Ok(result)
	}

	pub(crate) fn crate_path(&self) -> Result<Path> {
		match &self.krate {
			Some(path) => syn::parse_str(path),
			None => syn::parse_str("::strata_query"),
		}
	}
}

fn set_once<T>(slot: &mut Option<T>, value: T, path: &Path) -> Result<()> {
	if slot.is_some() {
		return Err(Error::new_spanned(path, "duplicate attribute"));
	}
	*slot = Some(value);
	Ok(())
}

/// Parsed attributes from `#[column(...)]`.
#[derive(Debug, Clone, Default)]
pub(crate) struct ColumnAttrs {
	pub(crate) key: bool,
	pub(crate) identity: bool,
	pub(crate) row_version: bool,
	pub(crate) not_updated: bool,
	pub(crate) nullable: bool,
	pub(crate) ignore: bool,
	pub(crate) size: Option<usize>,
	/// Physical column name
	pub(crate) name: Option<String>,
	pub(crate) display: Option<String>,
	/// Unique key group
	pub(crate) unique: Option<String>,
}

impl ColumnAttrs {
	pub(crate) fn from_attributes(attrs: &[Attribute]) -> Result<Self> {
		let mut result = Self::default();
		for attr in attrs.iter().filter(|a| a.path().is_ident("column")) {
			let parsed: ColumnAttrs = attr.parse_args()?;
			result.merge(parsed);
		}
		Ok(result)
	}

	fn merge(&mut self, other: ColumnAttrs) {
		self.key |= other.key;
		self.identity |= other.identity;
		self.row_version |= other.row_version;
		self.not_updated |= other.not_updated;
		self.nullable |= other.nullable;
		self.ignore |= other.ignore;
		self.size = other.size.or(self.size);
		self.name = other.name.or(self.name.take());
		self.display = other.display.or(self.display.take());
		self.unique = other.unique.or(self.unique.take());
	}
}

impl Parse for ColumnAttrs {
	fn parse(input: ParseStream) -> Result<Self> {
		let attrs = Punctuated::<ColumnAttr, Token![,]>::parse_terminated(input)?;

		let mut result = Self::default();

		for attr in attrs {
			match attr {
				ColumnAttr::Flag(name) => {
					let flag = match name.to_string().as_str() {
						"key" => &mut result.key,
						"identity" => &mut result.identity,
						"row_version" => &mut result.row_version,
						"not_updated" => &mut result.not_updated,
						"nullable" => &mut result.nullable,
						"ignore" => &mut result.ignore,
						_ => {
							return Err(Error::new(
								name.span(),
								format!("unknown flag attribute `{}`", name),
							));
						}
					};
					if *flag {
						return Err(Error::new(name.span(), format!("duplicate `{}` attribute", name)));
					}
					*flag = true;
				}
				ColumnAttr::NameValue { name, value } => match name.to_string().as_str() {
					"size" => {
						let Lit::Int(size) = &value else {
							return Err(Error::new(name.span(), "`size` expects an integer"));
						};
						let size = size.base10_parse::<usize>()?;
						if result.size.replace(size).is_some() {
							return Err(Error::new(name.span(), "duplicate `size` attribute"));
						}
					}
					"name" | "display" | "unique" => {
						let Lit::Str(text) = &value else {
							return Err(Error::new(
								name.span(),
								format!("`{}` expects a string", name),
							));
						};
						let slot = match name.to_string().as_str() {
							"name" => &mut result.name,
							"display" => &mut result.display,
							_ => &mut result.unique,
						};
						if slot.replace(text.value()).is_some() {
							return Err(Error::new(name.span(), format!("duplicate `{}` attribute", name)));
						}
					}
					_ => {
						return Err(Error::new(
							name.span(),
							format!("unknown attribute `{}`", name),
						));
					}
				},
			}
		}

		Ok(result)
	}
}

/// Single column attribute: either a flag or a name-value pair.
enum ColumnAttr {
	/// Flag attribute (e.g., `key`, `identity`)
	Flag(Ident),
	/// Name-value attribute (e.g., `size = 100`)
	NameValue { name: Ident, value: Lit },
}

impl Parse for ColumnAttr {
	fn parse(input: ParseStream) -> Result<Self> {
		let name: Ident = input.parse()?;

		if input.peek(Token![=]) {
			let _eq: Token![=] = input.parse()?;
			let value: Lit = input.parse()?;
			Ok(ColumnAttr::NameValue { name, value })
		} else {
			Ok(ColumnAttr::Flag(name))
		}
	}
}
