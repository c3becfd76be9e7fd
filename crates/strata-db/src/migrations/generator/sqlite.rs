use strata_query::{Dialect, Value, prefixed};

use super::{CommandList, MigrationsSqlGenerator, Result};
use crate::error::MigrationError;
use crate::migrations::operations::{
	ColumnDefinition, CreateTableOperation, ForeignKeyDefinition, PrimaryKeyDefinition,
	UniqueConstraintDefinition,
};

/// SQLite DDL.
///
/// `ALTER TABLE` covers only add, drop and rename. Key and constraint changes
/// on existing tables would need a table rebuild and are rejected. Schemas
/// and table comments do not exist and are skipped.
#[derive(Debug, Clone)]
pub struct SqliteMigrationsSqlGenerator {
	dialect: Dialect,
}

impl SqliteMigrationsSqlGenerator {
	pub fn new(dialect: Dialect) -> Self {
		Self { dialect }
	}
}

impl SqliteMigrationsSqlGenerator {
	/// `DEFAULT (randomblob(8))` only covers inserts; this trigger draws a new
	/// value on every update that leaves the column untouched.
	fn row_version_trigger(&self, table: &str, column: &str) -> Result<String> {
		let table_name = self.table_name(table, None)?;
		let column_name = self.ident(column)?;
		Ok(format!(
			"CREATE TRIGGER {} AFTER UPDATE ON {table_name} FOR EACH ROW \
			 WHEN NEW.{column_name} IS OLD.{column_name} \
			 BEGIN UPDATE {table_name} SET {column_name} = randomblob(8) WHERE rowid = NEW.rowid; END;",
			self.ident(&format!("TR_{}_{}", prefixed(table), column))?,
		))
	}
}

impl Default for SqliteMigrationsSqlGenerator {
	fn default() -> Self {
		Self::new(Dialect::sqlite())
	}
}

impl MigrationsSqlGenerator for SqliteMigrationsSqlGenerator {
	fn dialect(&self) -> &Dialect {
		&self.dialect
	}

	fn identity_clause(&self) -> &'static str {
		""
	}

	fn row_version_clause(&self) -> &'static str {
		" DEFAULT (randomblob(8))"
	}

	/// An identity column becomes the rowid alias and must be the whole
	/// primary key.
	fn create_table(&self, operation: &CreateTableOperation, commands: &mut CommandList) -> Result<()> {
		let identity: Vec<&ColumnDefinition> = operation.columns.iter().filter(|c| c.identity).collect();
		let inline_key = match identity.as_slice() {
			[] => None,
			[column] => {
				let sole_key = operation
					.primary_key
					.as_ref()
					.is_some_and(|key| key.columns.len() == 1 && key.columns[0] == column.name);
				if !sole_key {
					return Err(MigrationError::InvalidOperation(format!(
						"identity column `{}` must be the only primary key column",
						column.name
					)));
				}
				Some(column.name.as_str())
			}
			_ => {
				return Err(MigrationError::InvalidOperation(format!(
					"table `{}` has more than one identity column",
					operation.name
				)));
			}
		};

		let columns = operation
			.columns
			.iter()
			.map(|column| match inline_key {
				Some(name) if column.name == name => {
					Ok(format!("{} INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT", self.ident(name)?))
				}
				_ => self.column_definition(column),
			})
			.collect::<Result<Vec<_>>>()?;
		let primary_key = match inline_key {
			Some(_) => None,
			None => operation.primary_key.as_ref(),
		};
		let sql = self.create_table_statement(operation, columns, primary_key)?;
		commands.push(self.terminate(sql));
		for column in operation.columns.iter().filter(|c| c.row_version) {
			commands.push(self.row_version_trigger(&operation.name, &column.name)?);
		}
		if operation.comment.is_some() {
			tracing::debug!(table = %operation.name, "SQLite has no table comments; skipped");
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
		if column.identity {
			return Err(self.unsupported("AddColumn (identity)"));
		}
		let sql = format!(
			"ALTER TABLE {} ADD COLUMN {}",
			self.table_name(table, schema)?,
			self.column_definition(column)?
		);
		commands.push(self.terminate(sql));
		if column.row_version {
			commands.push(self.row_version_trigger(table, &column.name)?);
		}
		Ok(())
	}

	fn alter_column(
		&self,
		_table: &str,
		_schema: Option<&str>,
		_column: &ColumnDefinition,
		_old_column: Option<&ColumnDefinition>,
		_commands: &mut CommandList,
	) -> Result<()> {
		Err(self.unsupported("AlterColumn"))
	}

	fn drop_index(&self, _table: &str, schema: Option<&str>, name: &str, commands: &mut CommandList) -> Result<()> {
		let sql = format!(
			"DROP INDEX {}",
			self.helper().delimit_identifier_with_schema(name, schema)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn rename_index(
		&self,
		_table: &str,
		_schema: Option<&str>,
		_name: &str,
		_new_name: &str,
		_commands: &mut CommandList,
	) -> Result<()> {
		Err(self.unsupported("RenameIndex"))
	}

	fn add_primary_key(
		&self,
		_table: &str,
		_schema: Option<&str>,
		_key: &PrimaryKeyDefinition,
		_commands: &mut CommandList,
	) -> Result<()> {
		Err(self.unsupported("AddPrimaryKey"))
	}

	fn drop_primary_key(&self, _table: &str, _schema: Option<&str>, _name: &str, _commands: &mut CommandList) -> Result<()> {
		Err(self.unsupported("DropPrimaryKey"))
	}

	fn add_unique_constraint(
		&self,
		_table: &str,
		_schema: Option<&str>,
		_constraint: &UniqueConstraintDefinition,
		_commands: &mut CommandList,
	) -> Result<()> {
		Err(self.unsupported("AddUniqueConstraint"))
	}

	fn drop_unique_constraint(
		&self,
		_table: &str,
		_schema: Option<&str>,
		_name: &str,
		_commands: &mut CommandList,
	) -> Result<()> {
		Err(self.unsupported("DropUniqueConstraint"))
	}

	fn add_foreign_key(
		&self,
		_table: &str,
		_schema: Option<&str>,
		_key: &ForeignKeyDefinition,
		_commands: &mut CommandList,
	) -> Result<()> {
		Err(self.unsupported("AddForeignKey"))
	}

	fn drop_foreign_key(&self, _table: &str, _schema: Option<&str>, _name: &str, _commands: &mut CommandList) -> Result<()> {
		Err(self.unsupported("DropForeignKey"))
	}

	fn alter_table(
		&self,
		table: &str,
		_schema: Option<&str>,
		_comment: Option<&str>,
		_commands: &mut CommandList,
	) -> Result<()> {
		tracing::debug!(table, "SQLite has no table comments; skipped");
		Ok(())
	}

	fn ensure_schema(&self, name: &str, _commands: &mut CommandList) -> Result<()> {
		tracing::debug!(schema = name, "SQLite has no schemas; skipped");
		Ok(())
	}

	fn drop_schema(&self, name: &str, _commands: &mut CommandList) -> Result<()> {
		tracing::debug!(schema = name, "SQLite has no schemas; skipped");
		Ok(())
	}

	fn table_exists_sql(&self, table: &str) -> Result<String> {
		Ok(format!(
			"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = {};",
			self.helper().escape_literal(&Value::String(prefixed(table)))
		))
	}
}
