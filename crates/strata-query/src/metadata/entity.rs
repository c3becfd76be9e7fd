use std::any::Any;
use std::sync::Arc;

use crate::error::Result;
use crate::value::{ColumnType, Value};

use super::EntityType;

/// A mapped record type.
///
/// `descriptor` is consulted once, on first lookup; the accessors are used by
/// [`Property::get`](super::Property::get) and
/// [`Property::set`](super::Property::set).
pub trait Entity: Any + Send + Sync {
	/// Static description of the type and its mapped fields.
	fn descriptor() -> EntityDescriptor
	where
		Self: Sized;

	/// Current value of a mapped property, `None` for unknown names.
	fn get_value(&self, property: &str) -> Option<Value>;

	/// Overwrite a mapped property.
	fn set_value(&mut self, property: &str, value: Value) -> Result<()>;
}

/// Description of an entity as declared in code.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
	pub type_name: &'static str,
	/// Explicit table name; defaults to the type name.
	pub table: Option<&'static str>,
	/// Entity whose table this type maps to.
	pub target: Option<fn() -> Arc<EntityType>>,
	pub properties: Vec<PropertyDescriptor>,
}

impl EntityDescriptor {
	pub fn new(type_name: &'static str) -> Self {
		Self {
			type_name,
			table: None,
			target: None,
			properties: Vec::new(),
		}
	}

	pub fn table(mut self, table: &'static str) -> Self {
		self.table = Some(table);
		self
	}

	pub fn target(mut self, target: fn() -> Arc<EntityType>) -> Self {
		self.target = Some(target);
		self
	}

	pub fn property(mut self, property: PropertyDescriptor) -> Self {
		self.properties.push(property);
		self
	}
}

/// Description of one mapped field.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
	pub name: &'static str,
	pub column: Option<&'static str>,
	pub display_name: Option<&'static str>,
	pub column_type: ColumnType,
	pub nullable: bool,
	pub identity: bool,
	pub max_length: Option<usize>,
	pub row_version: bool,
	pub updatable: bool,
	pub key: bool,
	pub unique: Option<&'static str>,
}

impl PropertyDescriptor {
	pub fn new(name: &'static str, column_type: ColumnType) -> Self {
		Self {
			name,
			column: None,
			display_name: None,
			column_type,
			nullable: false,
			identity: false,
			max_length: None,
			row_version: false,
			updatable: true,
			key: false,
			unique: None,
		}
	}

	pub fn column(mut self, column: &'static str) -> Self {
		self.column = Some(column);
		self
	}

	pub fn display_name(mut self, display_name: &'static str) -> Self {
		self.display_name = Some(display_name);
		self
	}

	pub fn nullable(mut self, nullable: bool) -> Self {
		self.nullable = nullable;
		self
	}

	pub fn identity(mut self) -> Self {
		self.identity = true;
		self
	}

	pub fn max_length(mut self, max_length: usize) -> Self {
		self.max_length = Some(max_length);
		self
	}

	pub fn row_version(mut self) -> Self {
		self.row_version = true;
		self
	}

	pub fn not_updated(mut self) -> Self {
		self.updatable = false;
		self
	}

	pub fn key(mut self) -> Self {
		self.key = true;
		self
	}

	pub fn unique(mut self, group: &'static str) -> Self {
		self.unique = Some(group);
		self
	}
}
