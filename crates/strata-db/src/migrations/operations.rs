//! Schema-change operations
//!
//! Operations describe *what* changes; [`MigrationsSqlGenerator`] decides how
//! each dialect expresses it. Table names are logical: the generator applies
//! the prefix marker, so `"users"` and `"$pre:users"` name the same table.
//!
//! [`MigrationsSqlGenerator`]: super::MigrationsSqlGenerator

use std::collections::BTreeMap;
use std::sync::Arc;

use strata_query::{ColumnType, EntityType, Expression, Property, Value};

/// Free-form extension data attached to an operation or column.
pub type Annotations = BTreeMap<String, serde_json::Value>;

/// A column as it should exist after the operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
	pub name: String,
	pub column_type: ColumnType,
	/// Explicit column type; bypasses the type mapper.
	pub store_type: Option<String>,
	pub max_length: Option<usize>,
	pub nullable: bool,
	pub identity: bool,
	pub row_version: bool,
	pub unicode: bool,
	/// Literal default, rendered with the dialect's literal rules
	pub default_value: Option<Value>,
	/// Default given as SQL
	pub default_sql: Option<String>,
	pub computed_sql: Option<String>,
	pub annotations: Annotations,
}

impl ColumnDefinition {
	pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
		Self {
			name: name.into(),
			column_type,
			store_type: None,
			max_length: None,
			nullable: false,
			identity: false,
			row_version: false,
			unicode: true,
			default_value: None,
			default_sql: None,
			computed_sql: None,
			annotations: Annotations::new(),
		}
	}

	/// Column for a mapped property.
	pub fn from_property(property: &Property) -> Self {
		Self {
			max_length: property.max_length(),
			nullable: property.is_nullable(),
			identity: property.is_identity(),
			row_version: property.is_row_version(),
			..Self::new(property.column(), property.column_type().clone())
		}
	}

	pub fn nullable(mut self) -> Self {
		self.nullable = true;
		self
	}

	pub fn max_length(mut self, max_length: usize) -> Self {
		self.max_length = Some(max_length);
		self
	}

	pub fn identity(mut self) -> Self {
		self.identity = true;
		self
	}

	pub fn row_version(mut self) -> Self {
		self.row_version = true;
		self
	}

	/// Use the non-national character type.
	pub fn ansi(mut self) -> Self {
		self.unicode = false;
		self
	}

	pub fn store_type(mut self, store_type: impl Into<String>) -> Self {
		self.store_type = Some(store_type.into());
		self
	}

	pub fn default_value(mut self, value: impl Into<Value>) -> Self {
		self.default_value = Some(value.into());
		self
	}

	pub fn default_sql(mut self, sql: impl Into<String>) -> Self {
		self.default_sql = Some(sql.into());
		self
	}

	pub fn computed(mut self, sql: impl Into<String>) -> Self {
		self.computed_sql = Some(sql.into());
		self
	}

	pub fn annotate(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.annotations.insert(key.into(), value.into());
		self
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKeyDefinition {
	pub name: String,
	pub columns: Vec<String>,
	/// SQL Server clustering; `None` keeps the engine default.
	pub clustered: Option<bool>,
}

impl PrimaryKeyDefinition {
	pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
		Self {
			name: name.into(),
			columns,
			clustered: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniqueConstraintDefinition {
	pub name: String,
	pub columns: Vec<String>,
}

impl UniqueConstraintDefinition {
	pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
		Self {
			name: name.into(),
			columns,
		}
	}
}

/// Action taken on dependent rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferentialAction {
	#[default]
	NoAction,
	Restrict,
	Cascade,
	SetNull,
	SetDefault,
}

impl ReferentialAction {
	pub fn as_sql(&self) -> &'static str {
		match self {
			ReferentialAction::NoAction => "NO ACTION",
			ReferentialAction::Restrict => "RESTRICT",
			ReferentialAction::Cascade => "CASCADE",
			ReferentialAction::SetNull => "SET NULL",
			ReferentialAction::SetDefault => "SET DEFAULT",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDefinition {
	pub name: String,
	pub columns: Vec<String>,
	pub principal_table: String,
	pub principal_schema: Option<String>,
	pub principal_columns: Vec<String>,
	pub on_delete: ReferentialAction,
	pub on_update: ReferentialAction,
}

impl ForeignKeyDefinition {
	pub fn new(
		name: impl Into<String>,
		columns: Vec<String>,
		principal_table: impl Into<String>,
		principal_columns: Vec<String>,
	) -> Self {
		Self {
			name: name.into(),
			columns,
			principal_table: principal_table.into(),
			principal_schema: None,
			principal_columns,
			on_delete: ReferentialAction::NoAction,
			on_update: ReferentialAction::NoAction,
		}
	}

	pub fn on_delete(mut self, action: ReferentialAction) -> Self {
		self.on_delete = action;
		self
	}

	pub fn on_update(mut self, action: ReferentialAction) -> Self {
		self.on_update = action;
		self
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
	pub name: String,
	pub table: String,
	pub columns: Vec<String>,
	pub unique: bool,
	pub clustered: Option<bool>,
	/// Partial index predicate, as SQL
	pub filter: Option<String>,
}

impl IndexDefinition {
	pub fn new(name: impl Into<String>, table: impl Into<String>, columns: Vec<String>) -> Self {
		Self {
			name: name.into(),
			table: table.into(),
			columns,
			unique: false,
			clustered: None,
			filter: None,
		}
	}

	pub fn unique(mut self) -> Self {
		self.unique = true;
		self
	}

	pub fn clustered(mut self, clustered: bool) -> Self {
		self.clustered = Some(clustered);
		self
	}

	pub fn filter(mut self, filter: impl Into<String>) -> Self {
		self.filter = Some(filter.into());
		self
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceDefinition {
	pub name: String,
	pub schema: Option<String>,
	pub column_type: ColumnType,
	pub start_value: i64,
	pub increment_by: i64,
	pub min_value: Option<i64>,
	pub max_value: Option<i64>,
	pub cycle: bool,
}

impl SequenceDefinition {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			schema: None,
			column_type: ColumnType::BigInt,
			start_value: 1,
			increment_by: 1,
			min_value: None,
			max_value: None,
			cycle: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableOperation {
	pub name: String,
	pub schema: Option<String>,
	pub columns: Vec<ColumnDefinition>,
	pub primary_key: Option<PrimaryKeyDefinition>,
	pub unique_constraints: Vec<UniqueConstraintDefinition>,
	pub foreign_keys: Vec<ForeignKeyDefinition>,
	pub comment: Option<String>,
	pub annotations: Annotations,
}

impl CreateTableOperation {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			schema: None,
			columns: Vec::new(),
			primary_key: None,
			unique_constraints: Vec::new(),
			foreign_keys: Vec::new(),
			comment: None,
			annotations: Annotations::new(),
		}
	}

	/// Table layout of a mapped entity: one column per property, the primary
	/// key as `PK_<table>` and each unique key group as `UQ_<table>_<group>`.
	pub fn for_entity(entity: &EntityType) -> Self {
		let table = entity.table();
		let columns = entity
			.properties()
			.iter()
			.map(ColumnDefinition::from_property)
			.collect();
		let key_columns = |properties: &[Property]| {
			properties
				.iter()
				.map(|p| p.column().to_string())
				.collect::<Vec<_>>()
		};
		let primary_key = entity
			.primary_key()
			.map(|key| PrimaryKeyDefinition::new(format!("PK_{}", table), key_columns(key.properties())));
		let unique_constraints = entity
			.unique_keys()
			.iter()
			.map(|(group, key)| {
				UniqueConstraintDefinition::new(format!("UQ_{}_{}", table, group), key_columns(key.properties()))
			})
			.collect();
		Self {
			columns,
			primary_key,
			unique_constraints,
			..Self::new(table)
		}
	}
}

/// One schema or data change.
#[derive(Debug, Clone)]
pub enum MigrationOperation {
	CreateTable(CreateTableOperation),
	AddColumn {
		table: String,
		schema: Option<String>,
		column: ColumnDefinition,
		annotations: Annotations,
	},
	AlterColumn {
		table: String,
		schema: Option<String>,
		column: ColumnDefinition,
		/// Definition before the change, when known
		old_column: Option<ColumnDefinition>,
		annotations: Annotations,
	},
	DropColumn {
		table: String,
		schema: Option<String>,
		name: String,
		annotations: Annotations,
	},
	RenameColumn {
		table: String,
		schema: Option<String>,
		name: String,
		new_name: String,
		annotations: Annotations,
	},
	CreateIndex {
		schema: Option<String>,
		index: IndexDefinition,
		annotations: Annotations,
	},
	DropIndex {
		table: String,
		schema: Option<String>,
		name: String,
		annotations: Annotations,
	},
	RenameIndex {
		table: String,
		schema: Option<String>,
		name: String,
		new_name: String,
		annotations: Annotations,
	},
	AddPrimaryKey {
		table: String,
		schema: Option<String>,
		key: PrimaryKeyDefinition,
		annotations: Annotations,
	},
	DropPrimaryKey {
		table: String,
		schema: Option<String>,
		name: String,
		annotations: Annotations,
	},
	AddUniqueConstraint {
		table: String,
		schema: Option<String>,
		constraint: UniqueConstraintDefinition,
		annotations: Annotations,
	},
	DropUniqueConstraint {
		table: String,
		schema: Option<String>,
		name: String,
		annotations: Annotations,
	},
	AddForeignKey {
		table: String,
		schema: Option<String>,
		key: ForeignKeyDefinition,
		annotations: Annotations,
	},
	DropForeignKey {
		table: String,
		schema: Option<String>,
		name: String,
		annotations: Annotations,
	},
	/// Table-level properties; currently the comment
	AlterTable {
		table: String,
		schema: Option<String>,
		comment: Option<String>,
		annotations: Annotations,
	},
	RenameTable {
		name: String,
		schema: Option<String>,
		new_name: String,
		annotations: Annotations,
	},
	DropTable {
		name: String,
		schema: Option<String>,
		annotations: Annotations,
	},
	EnsureSchema {
		name: String,
		annotations: Annotations,
	},
	DropSchema {
		name: String,
		annotations: Annotations,
	},
	CreateSequence {
		sequence: SequenceDefinition,
		annotations: Annotations,
	},
	/// Changes increment, bounds and cycling; the start value is ignored.
	AlterSequence {
		sequence: SequenceDefinition,
		annotations: Annotations,
	},
	DropSequence {
		name: String,
		schema: Option<String>,
		annotations: Annotations,
	},
	RestartSequence {
		name: String,
		schema: Option<String>,
		start_value: i64,
		annotations: Annotations,
	},
	RenameSequence {
		name: String,
		schema: Option<String>,
		new_name: String,
		annotations: Annotations,
	},
	/// Raw SQL, emitted verbatim
	Sql {
		sql: String,
		annotations: Annotations,
	},
	/// Rows of an entity; each row holds one value per property, in property
	/// order.
	InsertRows {
		entity: Arc<EntityType>,
		rows: Vec<Vec<Value>>,
		annotations: Annotations,
	},
	/// Set `values` (property name, value) on the rows matching `predicate`.
	UpdateRows {
		entity: Arc<EntityType>,
		values: Vec<(String, Value)>,
		predicate: Expression,
		annotations: Annotations,
	},
	DeleteRows {
		entity: Arc<EntityType>,
		predicate: Expression,
		annotations: Annotations,
	},
}

impl MigrationOperation {
	/// Operation name as used in error messages.
	pub fn name(&self) -> &'static str {
		match self {
			MigrationOperation::CreateTable(_) => "CreateTable",
			MigrationOperation::AddColumn { .. } => "AddColumn",
			MigrationOperation::AlterColumn { .. } => "AlterColumn",
			MigrationOperation::DropColumn { .. } => "DropColumn",
			MigrationOperation::RenameColumn { .. } => "RenameColumn",
			MigrationOperation::CreateIndex { .. } => "CreateIndex",
			MigrationOperation::DropIndex { .. } => "DropIndex",
			MigrationOperation::RenameIndex { .. } => "RenameIndex",
			MigrationOperation::AddPrimaryKey { .. } => "AddPrimaryKey",
			MigrationOperation::DropPrimaryKey { .. } => "DropPrimaryKey",
			MigrationOperation::AddUniqueConstraint { .. } => "AddUniqueConstraint",
			MigrationOperation::DropUniqueConstraint { .. } => "DropUniqueConstraint",
			MigrationOperation::AddForeignKey { .. } => "AddForeignKey",
			MigrationOperation::DropForeignKey { .. } => "DropForeignKey",
			MigrationOperation::AlterTable { .. } => "AlterTable",
			MigrationOperation::RenameTable { .. } => "RenameTable",
			MigrationOperation::DropTable { .. } => "DropTable",
			MigrationOperation::EnsureSchema { .. } => "EnsureSchema",
			MigrationOperation::DropSchema { .. } => "DropSchema",
			MigrationOperation::CreateSequence { .. } => "CreateSequence",
			MigrationOperation::AlterSequence { .. } => "AlterSequence",
			MigrationOperation::DropSequence { .. } => "DropSequence",
			MigrationOperation::RestartSequence { .. } => "RestartSequence",
			MigrationOperation::RenameSequence { .. } => "RenameSequence",
			MigrationOperation::Sql { .. } => "Sql",
			MigrationOperation::InsertRows { .. } => "InsertRows",
			MigrationOperation::UpdateRows { .. } => "UpdateRows",
			MigrationOperation::DeleteRows { .. } => "DeleteRows",
		}
	}

	pub fn annotations(&self) -> &Annotations {
		match self {
			MigrationOperation::CreateTable(op) => &op.annotations,
			MigrationOperation::AddColumn { annotations, .. }
			| MigrationOperation::AlterColumn { annotations, .. }
			| MigrationOperation::DropColumn { annotations, .. }
			| MigrationOperation::RenameColumn { annotations, .. }
			| MigrationOperation::CreateIndex { annotations, .. }
			| MigrationOperation::DropIndex { annotations, .. }
			| MigrationOperation::RenameIndex { annotations, .. }
			| MigrationOperation::AddPrimaryKey { annotations, .. }
			| MigrationOperation::DropPrimaryKey { annotations, .. }
			| MigrationOperation::AddUniqueConstraint { annotations, .. }
			| MigrationOperation::DropUniqueConstraint { annotations, .. }
			| MigrationOperation::AddForeignKey { annotations, .. }
			| MigrationOperation::DropForeignKey { annotations, .. }
			| MigrationOperation::AlterTable { annotations, .. }
			| MigrationOperation::RenameTable { annotations, .. }
			| MigrationOperation::DropTable { annotations, .. }
			| MigrationOperation::EnsureSchema { annotations, .. }
			| MigrationOperation::DropSchema { annotations, .. }
			| MigrationOperation::CreateSequence { annotations, .. }
			| MigrationOperation::AlterSequence { annotations, .. }
			| MigrationOperation::DropSequence { annotations, .. }
			| MigrationOperation::RestartSequence { annotations, .. }
			| MigrationOperation::RenameSequence { annotations, .. }
			| MigrationOperation::Sql { annotations, .. }
			| MigrationOperation::InsertRows { annotations, .. }
			| MigrationOperation::UpdateRows { annotations, .. }
			| MigrationOperation::DeleteRows { annotations, .. } => annotations,
		}
	}

	pub fn annotations_mut(&mut self) -> &mut Annotations {
		match self {
			MigrationOperation::CreateTable(op) => &mut op.annotations,
			MigrationOperation::AddColumn { annotations, .. }
			| MigrationOperation::AlterColumn { annotations, .. }
			| MigrationOperation::DropColumn { annotations, .. }
			| MigrationOperation::RenameColumn { annotations, .. }
			| MigrationOperation::CreateIndex { annotations, .. }
			| MigrationOperation::DropIndex { annotations, .. }
			| MigrationOperation::RenameIndex { annotations, .. }
			| MigrationOperation::AddPrimaryKey { annotations, .. }
			| MigrationOperation::DropPrimaryKey { annotations, .. }
			| MigrationOperation::AddUniqueConstraint { annotations, .. }
			| MigrationOperation::DropUniqueConstraint { annotations, .. }
			| MigrationOperation::AddForeignKey { annotations, .. }
			| MigrationOperation::DropForeignKey { annotations, .. }
			| MigrationOperation::AlterTable { annotations, .. }
			| MigrationOperation::RenameTable { annotations, .. }
			| MigrationOperation::DropTable { annotations, .. }
			| MigrationOperation::EnsureSchema { annotations, .. }
			| MigrationOperation::DropSchema { annotations, .. }
			| MigrationOperation::CreateSequence { annotations, .. }
			| MigrationOperation::AlterSequence { annotations, .. }
			| MigrationOperation::DropSequence { annotations, .. }
			| MigrationOperation::RestartSequence { annotations, .. }
			| MigrationOperation::RenameSequence { annotations, .. }
			| MigrationOperation::Sql { annotations, .. }
			| MigrationOperation::InsertRows { annotations, .. }
			| MigrationOperation::UpdateRows { annotations, .. }
			| MigrationOperation::DeleteRows { annotations, .. } => annotations,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_annotations_mut() {
		let mut operation = MigrationOperation::Sql {
			sql: "SELECT 1;".to_string(),
			annotations: Annotations::new(),
		};

		operation
			.annotations_mut()
			.insert("source".to_string(), serde_json::json!("seed"));

		assert_eq!(operation.annotations()["source"], "seed");
		assert_eq!(operation.name(), "Sql");
	}

	#[test]
	fn test_column_definition_builder() {
		let column = ColumnDefinition::new("code", ColumnType::String)
			.max_length(12)
			.ansi()
			.default_value("none");

		assert_eq!(column.max_length, Some(12));
		assert!(!column.unicode);
		assert_eq!(column.default_value, Some(Value::from("none")));
		assert!(!column.nullable);
	}
}
