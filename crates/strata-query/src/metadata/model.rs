use std::any::TypeId;
use std::collections::BTreeMap;

use crate::error::{QueryError, Result};
use crate::value::{ColumnType, Value};

use super::entity::{Entity, EntityDescriptor, PropertyDescriptor};
use super::prefixed;

/// Column metadata of one mapped property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
	name: String,
	column: String,
	display_name: String,
	column_type: ColumnType,
	nullable: bool,
	identity: bool,
	max_length: Option<usize>,
	row_version: bool,
	updatable: bool,
	declaring_type: &'static str,
	declaring_type_id: TypeId,
}

impl Property {
	fn from_descriptor(
		descriptor: &PropertyDescriptor,
		declaring_type: &'static str,
		declaring_type_id: TypeId,
	) -> Self {
		Self {
			name: descriptor.name.to_string(),
			column: descriptor.column.unwrap_or(descriptor.name).to_string(),
			display_name: descriptor.display_name.unwrap_or(descriptor.name).to_string(),
			column_type: descriptor.column_type.clone(),
			nullable: descriptor.nullable,
			identity: descriptor.identity,
			max_length: descriptor.max_length,
			row_version: descriptor.row_version,
			// identity and row-version columns are engine-maintained
			updatable: descriptor.updatable && !descriptor.identity && !descriptor.row_version,
			declaring_type,
			declaring_type_id,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Physical column name
	pub fn column(&self) -> &str {
		&self.column
	}

	pub fn display_name(&self) -> &str {
		&self.display_name
	}

	pub fn column_type(&self) -> &ColumnType {
		&self.column_type
	}

	pub fn is_nullable(&self) -> bool {
		self.nullable
	}

	pub fn is_identity(&self) -> bool {
		self.identity
	}

	pub fn max_length(&self) -> Option<usize> {
		self.max_length
	}

	pub fn is_row_version(&self) -> bool {
		self.row_version
	}

	/// Whether UPDATE statements may write this column
	pub fn is_updatable(&self) -> bool {
		self.updatable
	}

	pub fn declaring_type(&self) -> &'static str {
		self.declaring_type
	}

	/// Read the property from an instance of its declaring type.
	pub fn get<E: Entity>(&self, instance: &E) -> Option<Value> {
		if TypeId::of::<E>() != self.declaring_type_id {
			return None;
		}
		instance.get_value(&self.name)
	}

	/// Write the property on an instance of its declaring type.
	pub fn set<E: Entity>(&self, instance: &mut E, value: Value) -> Result<()> {
		if TypeId::of::<E>() != self.declaring_type_id {
			return Err(QueryError::UnknownProperty {
				entity: std::any::type_name::<E>().to_string(),
				property: self.name.clone(),
			});
		}
		instance.set_value(&self.name, value)
	}
}

/// Ordered, non-empty list of properties of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
	entity: &'static str,
	properties: Vec<Property>,
}

impl Key {
	pub fn new(entity: &'static str, properties: Vec<Property>) -> Result<Self> {
		if properties.is_empty() {
			return Err(QueryError::InvalidExpression(format!(
				"key of `{}` has no properties",
				entity
			)));
		}
		if let Some(foreign) = properties.iter().find(|p| p.declaring_type != entity) {
			return Err(QueryError::InvalidExpression(format!(
				"key of `{}` contains property `{}` of `{}`",
				entity, foreign.name, foreign.declaring_type
			)));
		}
		Ok(Self { entity, properties })
	}

	pub fn entity(&self) -> &'static str {
		self.entity
	}

	pub fn properties(&self) -> &[Property] {
		&self.properties
	}
}

/// Cached description of a mapped record type.
#[derive(Debug)]
pub struct EntityType {
	type_id: TypeId,
	type_name: &'static str,
	table: String,
	properties: Vec<Property>,
	primary_key: Option<Key>,
	unique_keys: Vec<(String, Key)>,
}

impl EntityType {
	pub(crate) fn build(type_id: TypeId, descriptor: EntityDescriptor) -> Result<Self> {
		let type_name = descriptor.type_name;
		let table = match (descriptor.table, descriptor.target) {
			(Some(table), _) => prefixed(table),
			(None, Some(target)) => target().table().to_string(),
			(None, None) => prefixed(type_name),
		};

		let properties: Vec<Property> = descriptor
			.properties
			.iter()
			.map(|p| Property::from_descriptor(p, type_name, type_id))
			.collect();

		let key_properties: Vec<Property> = descriptor
			.properties
			.iter()
			.zip(&properties)
			.filter(|(d, _)| d.key)
			.map(|(_, p)| p.clone())
			.collect();
		let primary_key = if key_properties.is_empty() {
			None
		} else {
			Some(Key::new(type_name, key_properties)?)
		};

		let mut groups: BTreeMap<&'static str, Vec<Property>> = BTreeMap::new();
		for (d, p) in descriptor.properties.iter().zip(&properties) {
			if let Some(group) = d.unique {
				groups.entry(group).or_default().push(p.clone());
			}
		}
		let unique_keys = groups
			.into_iter()
			.map(|(group, props)| Ok((group.to_string(), Key::new(type_name, props)?)))
			.collect::<Result<Vec<_>>>()?;

		Ok(Self {
			type_id,
			type_name,
			table,
			properties,
			primary_key,
			unique_keys,
		})
	}

	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Logical table name, carrying the prefix marker.
	pub fn table(&self) -> &str {
		&self.table
	}

	pub fn properties(&self) -> &[Property] {
		&self.properties
	}

	pub fn find_property(&self, name: &str) -> Option<&Property> {
		self.properties.iter().find(|p| p.name == name)
	}

	/// Look up a property, failing with `UnknownProperty`.
	pub fn property(&self, name: &str) -> Result<&Property> {
		self.find_property(name).ok_or_else(|| QueryError::UnknownProperty {
			entity: self.type_name.to_string(),
			property: name.to_string(),
		})
	}

	pub fn primary_key(&self) -> Option<&Key> {
		self.primary_key.as_ref()
	}

	/// Primary key, failing with `MissingPrimaryKey`.
	pub fn require_primary_key(&self) -> Result<&Key> {
		self.primary_key.as_ref().ok_or_else(|| QueryError::MissingPrimaryKey {
			entity: self.type_name.to_string(),
		})
	}

	pub fn identity(&self) -> Option<&Property> {
		self.properties.iter().find(|p| p.identity)
	}

	pub fn row_version(&self) -> Option<&Property> {
		self.properties.iter().find(|p| p.row_version)
	}

	/// Unique key groups in group-name order.
	pub fn unique_keys(&self) -> &[(String, Key)] {
		&self.unique_keys
	}
}

impl PartialEq for EntityType {
	fn eq(&self, other: &Self) -> bool {
		self.type_id == other.type_id
	}
}
