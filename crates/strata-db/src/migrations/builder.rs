use std::sync::Arc;

use strata_query::dialect::row_values;
use strata_query::{Entity, EntityType, Expression, QueryError, Value, get_entity_type};

use super::operations::{
	Annotations, ColumnDefinition, CreateTableOperation, ForeignKeyDefinition, IndexDefinition,
	MigrationOperation, PrimaryKeyDefinition, SequenceDefinition, UniqueConstraintDefinition,
};

/// Accumulates operations in the order they are declared.
///
/// ```rust
/// use strata_db::migrations::{ColumnDefinition, MigrationBuilder};
/// use strata_query::ColumnType;
///
/// let mut builder = MigrationBuilder::new();
/// builder
///     .add_column("users", ColumnDefinition::new("nickname", ColumnType::String).nullable())
///     .annotate("reason", "profile page");
///
/// assert_eq!(builder.operations().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MigrationBuilder {
	operations: Vec<MigrationOperation>,
}

impl MigrationBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn operations(&self) -> &[MigrationOperation] {
		&self.operations
	}

	pub fn into_operations(self) -> Vec<MigrationOperation> {
		self.operations
	}

	pub fn push(&mut self, operation: MigrationOperation) -> &mut Self {
		self.operations.push(operation);
		self
	}

	/// Annotate the most recently added operation.
	pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> &mut Self {
		if let Some(operation) = self.operations.last_mut() {
			operation.annotations_mut().insert(key.into(), value.into());
		}
		self
	}

	/// Table of entity `E`, pre-filled from its metadata.
	pub fn create_table<E: Entity>(&mut self) -> CreateTableBuilder<'_> {
		let entity = get_entity_type::<E>();
		self.start_table(CreateTableOperation::for_entity(&entity))
	}

	pub fn create_table_named(&mut self, name: impl Into<String>) -> CreateTableBuilder<'_> {
		self.start_table(CreateTableOperation::new(name))
	}

	fn start_table(&mut self, operation: CreateTableOperation) -> CreateTableBuilder<'_> {
		self.operations.push(MigrationOperation::CreateTable(operation));
		let index = self.operations.len() - 1;
		CreateTableBuilder { builder: self, index }
	}

	pub fn add_column(&mut self, table: impl Into<String>, column: ColumnDefinition) -> &mut Self {
		self.push(MigrationOperation::AddColumn {
			table: table.into(),
			schema: None,
			column,
			annotations: Annotations::new(),
		})
	}

	pub fn alter_column(
		&mut self,
		table: impl Into<String>,
		column: ColumnDefinition,
		old_column: Option<ColumnDefinition>,
	) -> &mut Self {
		self.push(MigrationOperation::AlterColumn {
			table: table.into(),
			schema: None,
			column,
			old_column,
			annotations: Annotations::new(),
		})
	}

	pub fn drop_column(&mut self, table: impl Into<String>, name: impl Into<String>) -> &mut Self {
		self.push(MigrationOperation::DropColumn {
			table: table.into(),
			schema: None,
			name: name.into(),
			annotations: Annotations::new(),
		})
	}

	pub fn rename_column(
		&mut self,
		table: impl Into<String>,
		name: impl Into<String>,
		new_name: impl Into<String>,
	) -> &mut Self {
		self.push(MigrationOperation::RenameColumn {
			table: table.into(),
			schema: None,
			name: name.into(),
			new_name: new_name.into(),
			annotations: Annotations::new(),
		})
	}

	pub fn create_index(&mut self, index: IndexDefinition) -> &mut Self {
		self.push(MigrationOperation::CreateIndex {
			schema: None,
			index,
			annotations: Annotations::new(),
		})
	}

	pub fn drop_index(&mut self, table: impl Into<String>, name: impl Into<String>) -> &mut Self {
		self.push(MigrationOperation::DropIndex {
			table: table.into(),
			schema: None,
			name: name.into(),
			annotations: Annotations::new(),
		})
	}

	pub fn rename_index(
		&mut self,
		table: impl Into<String>,
		name: impl Into<String>,
		new_name: impl Into<String>,
	) -> &mut Self {
		self.push(MigrationOperation::RenameIndex {
			table: table.into(),
			schema: None,
			name: name.into(),
			new_name: new_name.into(),
			annotations: Annotations::new(),
		})
	}

	pub fn add_primary_key(&mut self, table: impl Into<String>, key: PrimaryKeyDefinition) -> &mut Self {
		self.push(MigrationOperation::AddPrimaryKey {
			table: table.into(),
			schema: None,
			key,
			annotations: Annotations::new(),
		})
	}

	pub fn drop_primary_key(&mut self, table: impl Into<String>, name: impl Into<String>) -> &mut Self {
		self.push(MigrationOperation::DropPrimaryKey {
			table: table.into(),
			schema: None,
			name: name.into(),
			annotations: Annotations::new(),
		})
	}

	pub fn add_unique_constraint(
		&mut self,
		table: impl Into<String>,
		constraint: UniqueConstraintDefinition,
	) -> &mut Self {
		self.push(MigrationOperation::AddUniqueConstraint {
			table: table.into(),
			schema: None,
			constraint,
			annotations: Annotations::new(),
		})
	}

	pub fn drop_unique_constraint(&mut self, table: impl Into<String>, name: impl Into<String>) -> &mut Self {
		self.push(MigrationOperation::DropUniqueConstraint {
			table: table.into(),
			schema: None,
			name: name.into(),
			annotations: Annotations::new(),
		})
	}

	pub fn add_foreign_key(&mut self, table: impl Into<String>, key: ForeignKeyDefinition) -> &mut Self {
		self.push(MigrationOperation::AddForeignKey {
			table: table.into(),
			schema: None,
			key,
			annotations: Annotations::new(),
		})
	}

	pub fn drop_foreign_key(&mut self, table: impl Into<String>, name: impl Into<String>) -> &mut Self {
		self.push(MigrationOperation::DropForeignKey {
			table: table.into(),
			schema: None,
			name: name.into(),
			annotations: Annotations::new(),
		})
	}

	/// Set or clear the table comment.
	pub fn alter_table(&mut self, table: impl Into<String>, comment: Option<String>) -> &mut Self {
		self.push(MigrationOperation::AlterTable {
			table: table.into(),
			schema: None,
			comment,
			annotations: Annotations::new(),
		})
	}

	pub fn rename_table(&mut self, name: impl Into<String>, new_name: impl Into<String>) -> &mut Self {
		self.push(MigrationOperation::RenameTable {
			name: name.into(),
			schema: None,
			new_name: new_name.into(),
			annotations: Annotations::new(),
		})
	}

	pub fn drop_table(&mut self, name: impl Into<String>) -> &mut Self {
		self.push(MigrationOperation::DropTable {
			name: name.into(),
			schema: None,
			annotations: Annotations::new(),
		})
	}

	pub fn ensure_schema(&mut self, name: impl Into<String>) -> &mut Self {
		self.push(MigrationOperation::EnsureSchema {
			name: name.into(),
			annotations: Annotations::new(),
		})
	}

	pub fn drop_schema(&mut self, name: impl Into<String>) -> &mut Self {
		self.push(MigrationOperation::DropSchema {
			name: name.into(),
			annotations: Annotations::new(),
		})
	}

	pub fn create_sequence(&mut self, sequence: SequenceDefinition) -> &mut Self {
		self.push(MigrationOperation::CreateSequence {
			sequence,
			annotations: Annotations::new(),
		})
	}

	pub fn alter_sequence(&mut self, sequence: SequenceDefinition) -> &mut Self {
		self.push(MigrationOperation::AlterSequence {
			sequence,
			annotations: Annotations::new(),
		})
	}

	pub fn drop_sequence(&mut self, name: impl Into<String>) -> &mut Self {
		self.push(MigrationOperation::DropSequence {
			name: name.into(),
			schema: None,
			annotations: Annotations::new(),
		})
	}

	pub fn restart_sequence(&mut self, name: impl Into<String>, start_value: i64) -> &mut Self {
		self.push(MigrationOperation::RestartSequence {
			name: name.into(),
			schema: None,
			start_value,
			annotations: Annotations::new(),
		})
	}

	pub fn rename_sequence(&mut self, name: impl Into<String>, new_name: impl Into<String>) -> &mut Self {
		self.push(MigrationOperation::RenameSequence {
			name: name.into(),
			schema: None,
			new_name: new_name.into(),
			annotations: Annotations::new(),
		})
	}

	pub fn sql(&mut self, sql: impl Into<String>) -> &mut Self {
		self.push(MigrationOperation::Sql {
			sql: sql.into(),
			annotations: Annotations::new(),
		})
	}

	/// Insert `row`. Consecutive inserts of the same entity share one
	/// operation.
	pub fn insert<E: Entity>(&mut self, row: &E) -> &mut Self {
		let entity = get_entity_type::<E>();
		let values = row_values(&entity, row);
		if let Some(MigrationOperation::InsertRows {
			entity: last,
			rows,
			..
		}) = self.operations.last_mut()
			&& Arc::ptr_eq(last, &entity)
		{
			rows.push(values);
			return self;
		}
		self.push(MigrationOperation::InsertRows {
			entity,
			rows: vec![values],
			annotations: Annotations::new(),
		})
	}

	/// Update the row matching `row`'s primary key to `row`'s values.
	pub fn update<E: Entity>(&mut self, row: &E) -> Result<&mut Self, QueryError> {
		let entity = get_entity_type::<E>();
		let predicate = key_predicate(&entity, row)?;
		let values = entity
			.properties()
			.iter()
			.map(|p| (p.name().to_string(), p.get(row).unwrap_or(Value::Null)))
			.collect();
		Ok(self.push(MigrationOperation::UpdateRows {
			entity,
			values,
			predicate,
			annotations: Annotations::new(),
		}))
	}

	/// Delete the row matching `row`'s primary key.
	pub fn delete<E: Entity>(&mut self, row: &E) -> Result<&mut Self, QueryError> {
		let entity = get_entity_type::<E>();
		let predicate = key_predicate(&entity, row)?;
		Ok(self.push(MigrationOperation::DeleteRows {
			entity,
			predicate,
			annotations: Annotations::new(),
		}))
	}

	/// Update matching rows of `E` with explicit values.
	pub fn update_where<E: Entity>(&mut self, values: Vec<(String, Value)>, predicate: Expression) -> &mut Self {
		self.push(MigrationOperation::UpdateRows {
			entity: get_entity_type::<E>(),
			values,
			predicate,
			annotations: Annotations::new(),
		})
	}

	pub fn delete_where<E: Entity>(&mut self, predicate: Expression) -> &mut Self {
		self.push(MigrationOperation::DeleteRows {
			entity: get_entity_type::<E>(),
			predicate,
			annotations: Annotations::new(),
		})
	}
}

/// `key1 = v1 AND key2 = v2 ...` with the values embedded as constants.
fn key_predicate<E: Entity>(entity: &Arc<EntityType>, row: &E) -> Result<Expression, QueryError> {
	let key = entity.require_primary_key()?;
	let mut predicate: Option<Expression> = None;
	for property in key.properties() {
		let value = property.get(row).unwrap_or(Value::Null);
		let comparison = Expression::property_of(Arc::clone(entity), property.name(), None)?
			.eq(Expression::constant(value));
		predicate = Some(match predicate {
			Some(left) => left.and(comparison),
			None => comparison,
		});
	}
	predicate.ok_or_else(|| QueryError::MissingPrimaryKey {
		entity: entity.type_name().to_string(),
	})
}

/// Adjusts a [`CreateTableOperation`] in place.
pub struct CreateTableBuilder<'a> {
	builder: &'a mut MigrationBuilder,
	index: usize,
}

impl CreateTableBuilder<'_> {
	fn table(&mut self) -> &mut CreateTableOperation {
		match &mut self.builder.operations[self.index] {
			MigrationOperation::CreateTable(table) => table,
			_ => unreachable!("CreateTableBuilder always points at a CreateTable operation"),
		}
	}

	fn table_name(&mut self) -> String {
		self.table().name.clone()
	}

	pub fn schema(mut self, schema: impl Into<String>) -> Self {
		self.table().schema = Some(schema.into());
		self
	}

	/// Add a column, replacing one with the same name.
	pub fn column(mut self, column: ColumnDefinition) -> Self {
		let columns = &mut self.table().columns;
		match columns.iter_mut().find(|c| c.name == column.name) {
			Some(existing) => *existing = column,
			None => columns.push(column),
		}
		self
	}

	/// Change an existing column in place.
	pub fn configure_column(mut self, name: &str, configure: impl FnOnce(&mut ColumnDefinition)) -> Self {
		if let Some(column) = self.table().columns.iter_mut().find(|c| c.name == name) {
			configure(column);
		}
		self
	}

	pub fn primary_key(mut self, key: PrimaryKeyDefinition) -> Self {
		self.table().primary_key = Some(key);
		self
	}

	pub fn clustered(mut self, clustered: bool) -> Self {
		if let Some(key) = self.table().primary_key.as_mut() {
			key.clustered = Some(clustered);
		}
		self
	}

	pub fn unique_constraint(mut self, constraint: UniqueConstraintDefinition) -> Self {
		self.table().unique_constraints.push(constraint);
		self
	}

	pub fn foreign_key(mut self, key: ForeignKeyDefinition) -> Self {
		self.table().foreign_keys.push(key);
		self
	}

	pub fn comment(mut self, comment: impl Into<String>) -> Self {
		self.table().comment = Some(comment.into());
		self
	}

	/// Index on this table, emitted after the table.
	pub fn index(mut self, name: impl Into<String>, columns: &[&str], unique: bool) -> Self {
		let table = self.table_name();
		let mut index = IndexDefinition::new(name, table, columns.iter().map(|c| c.to_string()).collect());
		index.unique = unique;
		self.builder.create_index(index);
		self
	}

	pub fn annotate(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.table().annotations.insert(key.into(), value.into());
		self
	}
}
