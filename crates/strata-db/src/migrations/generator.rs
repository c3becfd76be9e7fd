//! Migration SQL generation
//!
//! [`MigrationsSqlGenerator`] turns operations into [`MigrationCommand`]s,
//! preserving input order. Default methods carry the portable DDL; each
//! dialect overrides what it spells differently and rejects what it cannot
//! express with [`MigrationError::UnsupportedOperation`] before producing any
//! SQL.
//!
//! | Operation | SQL Server | MySQL | SQLite |
//! |-----------|------------|-------|--------|
//! | identity | `IDENTITY(1,1)` | `AUTO_INCREMENT` | `INTEGER PRIMARY KEY AUTOINCREMENT` |
//! | alter column | `ALTER COLUMN` | `MODIFY COLUMN` | unsupported |
//! | rename column | `sp_rename` | `RENAME COLUMN` | `RENAME COLUMN` |
//! | rename table | `sp_rename` | `RENAME TABLE` | `RENAME TO` |
//! | sequences | yes | unsupported | unsupported |
//! | key changes on existing tables | yes | yes | unsupported |

use std::fmt;

use strata_query::{DatabaseKind, Dialect, EntityType, Expression, SqlHelper, Value, prefixed};

use super::operations::{
	ColumnDefinition, CreateTableOperation, ForeignKeyDefinition, IndexDefinition, MigrationOperation,
	PrimaryKeyDefinition, ReferentialAction, SequenceDefinition, UniqueConstraintDefinition,
};
use crate::error::MigrationError;

mod mysql;
mod sql_server;
mod sqlite;

pub use mysql::MySqlMigrationsSqlGenerator;
pub use sql_server::SqlServerMigrationsSqlGenerator;
pub use sqlite::SqliteMigrationsSqlGenerator;

type Result<T> = std::result::Result<T, MigrationError>;

/// One unit of work sent to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationCommand {
	pub sql: String,
}

impl fmt::Display for MigrationCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.sql)
	}
}

/// Ordered command output of one generation run.
#[derive(Debug, Default)]
pub struct CommandList {
	commands: Vec<MigrationCommand>,
	variables: usize,
}

impl CommandList {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, sql: impl Into<String>) {
		self.commands.push(MigrationCommand { sql: sql.into() });
	}

	/// Fresh script variable name (`var0`, `var1`, ...).
	pub fn next_variable(&mut self) -> String {
		let name = format!("var{}", self.variables);
		self.variables += 1;
		name
	}

	pub fn len(&self) -> usize {
		self.commands.len()
	}

	pub fn is_empty(&self) -> bool {
		self.commands.is_empty()
	}

	pub fn into_commands(self) -> Vec<MigrationCommand> {
		self.commands
	}
}

/// Renders migration operations as dialect DDL.
pub trait MigrationsSqlGenerator: Send + Sync + fmt::Debug {
	fn dialect(&self) -> &Dialect;

	fn kind(&self) -> DatabaseKind {
		self.dialect().kind()
	}

	fn helper(&self) -> &dyn SqlHelper {
		self.dialect().helper()
	}

	fn generate(&self, operations: &[MigrationOperation]) -> Result<Vec<MigrationCommand>> {
		let mut commands = CommandList::new();
		for operation in operations {
			self.generate_operation(operation, &mut commands)?;
		}
		tracing::debug!(
			dialect = %self.kind(),
			operations = operations.len(),
			commands = commands.len(),
			"generated migration commands"
		);
		Ok(commands.into_commands())
	}

	/// Script form of [`generate`](Self::generate), batches separated by the
	/// dialect's batch terminator.
	fn generate_script(&self, operations: &[MigrationOperation]) -> Result<String> {
		let commands = self.generate(operations)?;
		let separator = match self.helper().batch_terminator() {
			Some(terminator) => format!("\n{}\n\n", terminator),
			None => "\n\n".to_string(),
		};
		let mut script = commands
			.iter()
			.map(|c| c.sql.as_str())
			.collect::<Vec<_>>()
			.join(&separator);
		if !script.is_empty() {
			script.push_str(&separator);
		}
		Ok(script)
	}

	fn generate_operation(&self, operation: &MigrationOperation, commands: &mut CommandList) -> Result<()> {
		match operation {
			MigrationOperation::CreateTable(op) => self.create_table(op, commands),
			MigrationOperation::AddColumn {
				table,
				schema,
				column,
				..
			} => self.add_column(table, schema.as_deref(), column, commands),
			MigrationOperation::AlterColumn {
				table,
				schema,
				column,
				old_column,
				..
			} => {
				if column.computed_sql.is_some() {
					// computed columns cannot be altered in place
					self.drop_column(table, schema.as_deref(), &column.name, commands)?;
					return self.add_column(table, schema.as_deref(), column, commands);
				}
				self.alter_column(table, schema.as_deref(), column, old_column.as_ref(), commands)
			}
			MigrationOperation::DropColumn {
				table, schema, name, ..
			} => self.drop_column(table, schema.as_deref(), name, commands),
			MigrationOperation::RenameColumn {
				table,
				schema,
				name,
				new_name,
				..
			} => self.rename_column(table, schema.as_deref(), name, new_name, commands),
			MigrationOperation::CreateIndex { schema, index, .. } => {
				self.create_index(schema.as_deref(), index, commands)
			}
			MigrationOperation::DropIndex {
				table, schema, name, ..
			} => self.drop_index(table, schema.as_deref(), name, commands),
			MigrationOperation::RenameIndex {
				table,
				schema,
				name,
				new_name,
				..
			} => self.rename_index(table, schema.as_deref(), name, new_name, commands),
			MigrationOperation::AddPrimaryKey {
				table, schema, key, ..
			} => self.add_primary_key(table, schema.as_deref(), key, commands),
			MigrationOperation::DropPrimaryKey {
				table, schema, name, ..
			} => self.drop_primary_key(table, schema.as_deref(), name, commands),
			MigrationOperation::AddUniqueConstraint {
				table,
				schema,
				constraint,
				..
			} => self.add_unique_constraint(table, schema.as_deref(), constraint, commands),
			MigrationOperation::DropUniqueConstraint {
				table, schema, name, ..
			} => self.drop_unique_constraint(table, schema.as_deref(), name, commands),
			MigrationOperation::AddForeignKey {
				table, schema, key, ..
			} => self.add_foreign_key(table, schema.as_deref(), key, commands),
			MigrationOperation::DropForeignKey {
				table, schema, name, ..
			} => self.drop_foreign_key(table, schema.as_deref(), name, commands),
			MigrationOperation::AlterTable {
				table,
				schema,
				comment,
				..
			} => self.alter_table(table, schema.as_deref(), comment.as_deref(), commands),
			MigrationOperation::RenameTable {
				name,
				schema,
				new_name,
				..
			} => self.rename_table(name, schema.as_deref(), new_name, commands),
			MigrationOperation::DropTable { name, schema, .. } => {
				self.drop_table(name, schema.as_deref(), commands)
			}
			MigrationOperation::EnsureSchema { name, .. } => self.ensure_schema(name, commands),
			MigrationOperation::DropSchema { name, .. } => self.drop_schema(name, commands),
			MigrationOperation::CreateSequence { sequence, .. } => self.create_sequence(sequence, commands),
			MigrationOperation::AlterSequence { sequence, .. } => self.alter_sequence(sequence, commands),
			MigrationOperation::DropSequence { name, schema, .. } => {
				self.drop_sequence(name, schema.as_deref(), commands)
			}
			MigrationOperation::RestartSequence {
				name,
				schema,
				start_value,
				..
			} => self.restart_sequence(name, schema.as_deref(), *start_value, commands),
			MigrationOperation::RenameSequence {
				name,
				schema,
				new_name,
				..
			} => self.rename_sequence(name, schema.as_deref(), new_name, commands),
			MigrationOperation::Sql { sql, .. } => {
				commands.push(sql.trim());
				Ok(())
			}
			MigrationOperation::InsertRows { entity, rows, .. } => self.insert_rows(entity, rows, commands),
			MigrationOperation::UpdateRows {
				entity,
				values,
				predicate,
				..
			} => self.update_rows(entity, values, predicate, commands),
			MigrationOperation::DeleteRows {
				entity, predicate, ..
			} => self.delete_rows(entity, predicate, commands),
		}
	}

	// Building blocks

	fn unsupported(&self, operation: &str) -> MigrationError {
		MigrationError::unsupported(operation, self.kind())
	}

	fn ident(&self, name: &str) -> Result<String> {
		Ok(self.helper().delimit_identifier(name)?)
	}

	/// Delimited table name; the prefix marker is applied when missing.
	fn table_name(&self, name: &str, schema: Option<&str>) -> Result<String> {
		Ok(self
			.helper()
			.delimit_identifier_with_schema(&prefixed(name), schema)?)
	}

	fn column_list(&self, columns: &[String]) -> Result<String> {
		let columns = columns
			.iter()
			.map(|c| self.ident(c))
			.collect::<Result<Vec<_>>>()?;
		Ok(columns.join(", "))
	}

	fn terminate(&self, sql: String) -> String {
		format!("{}{}", sql, self.helper().statement_terminator())
	}

	fn column_type(&self, column: &ColumnDefinition) -> Result<String> {
		match &column.store_type {
			Some(store_type) => Ok(store_type.clone()),
			None => Ok(self.dialect().type_mapper().get_mapping(
				&column.column_type,
				column.max_length,
				column.row_version,
				column.unicode,
			)?),
		}
	}

	/// ` DEFAULT ...`, or empty; a column may not carry both kinds of default.
	fn default_clause(&self, column: &ColumnDefinition) -> Result<String> {
		match (&column.default_value, &column.default_sql) {
			(Some(_), Some(_)) => Err(MigrationError::InvalidOperation(format!(
				"column `{}` has both a default value and default SQL",
				column.name
			))),
			(Some(value), None) => Ok(format!(" DEFAULT {}", self.helper().escape_literal(value))),
			(None, Some(sql)) => Ok(format!(" DEFAULT ({})", sql)),
			(None, None) => Ok(String::new()),
		}
	}

	fn identity_clause(&self) -> &'static str;

	fn nullability(&self, column: &ColumnDefinition) -> &'static str {
		if column.nullable { " NULL" } else { " NOT NULL" }
	}

	fn computed_column_definition(&self, column: &ColumnDefinition, sql: &str) -> Result<String> {
		Ok(format!(
			"{} {} AS ({})",
			self.ident(&column.name)?,
			self.column_type(column)?,
			sql
		))
	}

	/// Column as it appears in `CREATE TABLE` and `ADD`.
	fn column_definition(&self, column: &ColumnDefinition) -> Result<String> {
		let default = self.default_clause(column)?;
		if let Some(sql) = &column.computed_sql {
			return self.computed_column_definition(column, sql);
		}
		let identity = if column.identity { self.identity_clause() } else { "" };
		let row_version = if column.row_version && default.is_empty() {
			self.row_version_clause()
		} else {
			""
		};
		Ok(format!(
			"{} {}{}{}{}{}",
			self.ident(&column.name)?,
			self.column_type(column)?,
			self.nullability(column),
			default,
			row_version,
			identity
		))
	}

	/// How the engine fills a row-version column it is never given a value for.
	fn row_version_clause(&self) -> &'static str {
		""
	}

	fn clustered_clause(&self, _clustered: Option<bool>) -> &'static str {
		""
	}

	fn referential_action(&self, action: ReferentialAction) -> &'static str {
		action.as_sql()
	}

	fn primary_key_constraint(&self, key: &PrimaryKeyDefinition) -> Result<String> {
		Ok(format!(
			"CONSTRAINT {} PRIMARY KEY{} ({})",
			self.ident(&key.name)?,
			self.clustered_clause(key.clustered),
			self.column_list(&key.columns)?
		))
	}

	fn unique_constraint(&self, constraint: &UniqueConstraintDefinition) -> Result<String> {
		Ok(format!(
			"CONSTRAINT {} UNIQUE ({})",
			self.ident(&constraint.name)?,
			self.column_list(&constraint.columns)?
		))
	}

	fn foreign_key_constraint(&self, key: &ForeignKeyDefinition) -> Result<String> {
		let mut sql = format!(
			"CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
			self.ident(&key.name)?,
			self.column_list(&key.columns)?,
			self.table_name(&key.principal_table, key.principal_schema.as_deref())?,
			self.column_list(&key.principal_columns)?
		);
		if key.on_delete != ReferentialAction::NoAction {
			sql.push_str(" ON DELETE ");
			sql.push_str(self.referential_action(key.on_delete));
		}
		if key.on_update != ReferentialAction::NoAction {
			sql.push_str(" ON UPDATE ");
			sql.push_str(self.referential_action(key.on_update));
		}
		Ok(sql)
	}

	/// `CREATE TABLE` with the given column lines; `primary_key` is `None`
	/// when a column already declares it.
	fn create_table_statement(
		&self,
		operation: &CreateTableOperation,
		columns: Vec<String>,
		primary_key: Option<&PrimaryKeyDefinition>,
	) -> Result<String> {
		let mut lines = columns;
		if let Some(key) = primary_key {
			lines.push(self.primary_key_constraint(key)?);
		}
		for constraint in &operation.unique_constraints {
			lines.push(self.unique_constraint(constraint)?);
		}
		for key in &operation.foreign_keys {
			lines.push(self.foreign_key_constraint(key)?);
		}
		Ok(format!(
			"CREATE TABLE {} (\n    {}\n)",
			self.table_name(&operation.name, operation.schema.as_deref())?,
			lines.join(",\n    ")
		))
	}

	// Operations

	fn create_table(&self, operation: &CreateTableOperation, commands: &mut CommandList) -> Result<()> {
		let columns = operation
			.columns
			.iter()
			.map(|c| self.column_definition(c))
			.collect::<Result<Vec<_>>>()?;
		let sql = self.create_table_statement(operation, columns, operation.primary_key.as_ref())?;
		commands.push(self.terminate(sql));
		if let Some(comment) = &operation.comment {
			self.alter_table(&operation.name, operation.schema.as_deref(), Some(comment), commands)?;
		}
		Ok(())
	}

	fn add_column(
		&self,
		table: &str,
		schema: Option<&str>,
		column: &ColumnDefinition,
		commands: &mut CommandList,
	) -> Result<()> {
		let sql = format!(
			"ALTER TABLE {} ADD {}",
			self.table_name(table, schema)?,
			self.column_definition(column)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn alter_column(
		&self,
		table: &str,
		schema: Option<&str>,
		column: &ColumnDefinition,
		old_column: Option<&ColumnDefinition>,
		commands: &mut CommandList,
	) -> Result<()>;

	fn drop_column(&self, table: &str, schema: Option<&str>, name: &str, commands: &mut CommandList) -> Result<()> {
		let sql = format!(
			"ALTER TABLE {} DROP COLUMN {}",
			self.table_name(table, schema)?,
			self.ident(name)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn rename_column(
		&self,
		table: &str,
		schema: Option<&str>,
		name: &str,
		new_name: &str,
		commands: &mut CommandList,
	) -> Result<()> {
		let sql = format!(
			"ALTER TABLE {} RENAME COLUMN {} TO {}",
			self.table_name(table, schema)?,
			self.ident(name)?,
			self.ident(new_name)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn index_filter(&self, filter: Option<&str>) -> Result<String> {
		Ok(filter.map(|f| format!(" WHERE {}", f)).unwrap_or_default())
	}

	fn create_index(&self, schema: Option<&str>, index: &IndexDefinition, commands: &mut CommandList) -> Result<()> {
		let sql = format!(
			"CREATE {}{}INDEX {} ON {} ({}){}",
			if index.unique { "UNIQUE " } else { "" },
			match self.clustered_clause(index.clustered) {
				"" => String::new(),
				clause => format!("{} ", clause.trim_start()),
			},
			self.ident(&index.name)?,
			self.table_name(&index.table, schema)?,
			self.column_list(&index.columns)?,
			self.index_filter(index.filter.as_deref())?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn drop_index(&self, table: &str, schema: Option<&str>, name: &str, commands: &mut CommandList) -> Result<()> {
		let sql = format!("DROP INDEX {} ON {}", self.ident(name)?, self.table_name(table, schema)?);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn rename_index(
		&self,
		table: &str,
		schema: Option<&str>,
		name: &str,
		new_name: &str,
		commands: &mut CommandList,
	) -> Result<()>;

	fn add_primary_key(
		&self,
		table: &str,
		schema: Option<&str>,
		key: &PrimaryKeyDefinition,
		commands: &mut CommandList,
	) -> Result<()> {
		let sql = format!(
			"ALTER TABLE {} ADD {}",
			self.table_name(table, schema)?,
			self.primary_key_constraint(key)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn drop_constraint(&self, table: &str, schema: Option<&str>, name: &str, commands: &mut CommandList) -> Result<()> {
		let sql = format!(
			"ALTER TABLE {} DROP CONSTRAINT {}",
			self.table_name(table, schema)?,
			self.ident(name)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn drop_primary_key(&self, table: &str, schema: Option<&str>, name: &str, commands: &mut CommandList) -> Result<()> {
		self.drop_constraint(table, schema, name, commands)
	}

	fn add_unique_constraint(
		&self,
		table: &str,
		schema: Option<&str>,
		constraint: &UniqueConstraintDefinition,
		commands: &mut CommandList,
	) -> Result<()> {
		let sql = format!(
			"ALTER TABLE {} ADD {}",
			self.table_name(table, schema)?,
			self.unique_constraint(constraint)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn drop_unique_constraint(
		&self,
		table: &str,
		schema: Option<&str>,
		name: &str,
		commands: &mut CommandList,
	) -> Result<()> {
		self.drop_constraint(table, schema, name, commands)
	}

	fn add_foreign_key(
		&self,
		table: &str,
		schema: Option<&str>,
		key: &ForeignKeyDefinition,
		commands: &mut CommandList,
	) -> Result<()> {
		let sql = format!(
			"ALTER TABLE {} ADD {}",
			self.table_name(table, schema)?,
			self.foreign_key_constraint(key)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn drop_foreign_key(&self, table: &str, schema: Option<&str>, name: &str, commands: &mut CommandList) -> Result<()> {
		self.drop_constraint(table, schema, name, commands)
	}

	fn alter_table(
		&self,
		table: &str,
		schema: Option<&str>,
		comment: Option<&str>,
		commands: &mut CommandList,
	) -> Result<()>;

	fn rename_table(
		&self,
		name: &str,
		schema: Option<&str>,
		new_name: &str,
		commands: &mut CommandList,
	) -> Result<()> {
		let sql = format!(
			"ALTER TABLE {} RENAME TO {}",
			self.table_name(name, schema)?,
			self.table_name(new_name, schema)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn drop_table(&self, name: &str, schema: Option<&str>, commands: &mut CommandList) -> Result<()> {
		let sql = format!("DROP TABLE {}", self.table_name(name, schema)?);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn ensure_schema(&self, name: &str, commands: &mut CommandList) -> Result<()>;

	fn drop_schema(&self, name: &str, commands: &mut CommandList) -> Result<()> {
		let sql = format!("DROP SCHEMA {}", self.ident(name)?);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn create_sequence(&self, _sequence: &SequenceDefinition, _commands: &mut CommandList) -> Result<()> {
		Err(self.unsupported("CreateSequence"))
	}

	fn alter_sequence(&self, _sequence: &SequenceDefinition, _commands: &mut CommandList) -> Result<()> {
		Err(self.unsupported("AlterSequence"))
	}

	fn drop_sequence(&self, _name: &str, _schema: Option<&str>, _commands: &mut CommandList) -> Result<()> {
		Err(self.unsupported("DropSequence"))
	}

	fn restart_sequence(
		&self,
		_name: &str,
		_schema: Option<&str>,
		_start_value: i64,
		_commands: &mut CommandList,
	) -> Result<()> {
		Err(self.unsupported("RestartSequence"))
	}

	fn rename_sequence(
		&self,
		_name: &str,
		_schema: Option<&str>,
		_new_name: &str,
		_commands: &mut CommandList,
	) -> Result<()> {
		Err(self.unsupported("RenameSequence"))
	}

	/// Compile a row predicate; values must be embedded, not bound.
	fn predicate_sql(&self, predicate: &Expression) -> Result<String> {
		let compiled = self.dialect().compile(predicate)?;
		if !compiled.parameters.is_empty() {
			return Err(MigrationError::InvalidOperation(
				"row predicates in migrations cannot use parameters".to_string(),
			));
		}
		Ok(compiled.sql)
	}

	/// One `INSERT` per row; identity and row-version columns are left to the
	/// engine.
	fn insert_rows(&self, entity: &EntityType, rows: &[Vec<Value>], commands: &mut CommandList) -> Result<()> {
		let included: Vec<usize> = entity
			.properties()
			.iter()
			.enumerate()
			.filter(|(_, p)| !p.is_identity() && !p.is_row_version())
			.map(|(i, _)| i)
			.collect();
		let columns = included
			.iter()
			.map(|&i| self.ident(entity.properties()[i].column()))
			.collect::<Result<Vec<_>>>()?
			.join(", ");
		let table = self.table_name(entity.table(), None)?;
		for row in rows {
			if row.len() != entity.properties().len() {
				return Err(MigrationError::InvalidOperation(format!(
					"row for `{}` has {} values, expected {}",
					entity.type_name(),
					row.len(),
					entity.properties().len()
				)));
			}
			let values = included
				.iter()
				.map(|&i| self.helper().escape_literal(&row[i]))
				.collect::<Vec<_>>()
				.join(", ");
			commands.push(self.terminate(format!("INSERT INTO {} ({}) VALUES ({})", table, columns, values)));
		}
		Ok(())
	}

	fn update_rows(
		&self,
		entity: &EntityType,
		values: &[(String, Value)],
		predicate: &Expression,
		commands: &mut CommandList,
	) -> Result<()> {
		let mut assignments = Vec::new();
		for (name, value) in values {
			let property = entity.property(name)?;
			if !property.is_updatable() {
				continue;
			}
			assignments.push(format!(
				"{} = {}",
				self.ident(property.column())?,
				self.helper().escape_literal(value)
			));
		}
		if assignments.is_empty() {
			return Err(MigrationError::InvalidOperation(format!(
				"update of `{}` sets no updatable column",
				entity.type_name()
			)));
		}
		let sql = format!(
			"UPDATE {} SET {} WHERE {}",
			self.table_name(entity.table(), None)?,
			assignments.join(", "),
			self.predicate_sql(predicate)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn delete_rows(&self, entity: &EntityType, predicate: &Expression, commands: &mut CommandList) -> Result<()> {
		let sql = format!(
			"DELETE FROM {} WHERE {}",
			self.table_name(entity.table(), None)?,
			self.predicate_sql(predicate)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	/// Scalar query returning a non-zero count when `table` exists.
	fn table_exists_sql(&self, table: &str) -> Result<String>;
}

/// Generator for `dialect`.
pub fn generator_for(dialect: Dialect) -> Box<dyn MigrationsSqlGenerator> {
	match dialect.kind() {
		DatabaseKind::SqlServer => Box::new(SqlServerMigrationsSqlGenerator::new(dialect)),
		DatabaseKind::MySql => Box::new(MySqlMigrationsSqlGenerator::new(dialect)),
		DatabaseKind::Sqlite => Box::new(SqliteMigrationsSqlGenerator::new(dialect)),
	}
}

