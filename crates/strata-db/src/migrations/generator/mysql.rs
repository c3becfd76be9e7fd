use strata_query::{Dialect, Value, prefixed};

use super::{CommandList, MigrationsSqlGenerator, Result};
use crate::migrations::operations::{ColumnDefinition, CreateTableOperation};

/// MySQL DDL.
///
/// MySQL commits implicitly around DDL, so a failing migration can leave
/// earlier DDL of the same batch applied.
#[derive(Debug, Clone)]
pub struct MySqlMigrationsSqlGenerator {
	dialect: Dialect,
}

impl MySqlMigrationsSqlGenerator {
	pub fn new(dialect: Dialect) -> Self {
		Self { dialect }
	}

	fn comment_literal(&self, comment: Option<&str>) -> String {
		self.helper()
			.escape_literal(&Value::String(comment.unwrap_or_default().to_string()))
	}
}

impl Default for MySqlMigrationsSqlGenerator {
	fn default() -> Self {
		Self::new(Dialect::mysql())
	}
}

impl MigrationsSqlGenerator for MySqlMigrationsSqlGenerator {
	fn dialect(&self) -> &Dialect {
		&self.dialect
	}

	fn identity_clause(&self) -> &'static str {
		" AUTO_INCREMENT"
	}

	fn row_version_clause(&self) -> &'static str {
		" DEFAULT CURRENT_TIMESTAMP(6) ON UPDATE CURRENT_TIMESTAMP(6)"
	}

	fn create_table(&self, operation: &CreateTableOperation, commands: &mut CommandList) -> Result<()> {
		let columns = operation
			.columns
			.iter()
			.map(|c| self.column_definition(c))
			.collect::<Result<Vec<_>>>()?;
		let mut sql = self.create_table_statement(operation, columns, operation.primary_key.as_ref())?;
		if let Some(comment) = &operation.comment {
			sql.push_str(" COMMENT = ");
			sql.push_str(&self.comment_literal(Some(comment)));
		}
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn alter_column(
		&self,
		table: &str,
		schema: Option<&str>,
		column: &ColumnDefinition,
		_old_column: Option<&ColumnDefinition>,
		commands: &mut CommandList,
	) -> Result<()> {
		let sql = format!(
			"ALTER TABLE {} MODIFY COLUMN {}",
			self.table_name(table, schema)?,
			self.column_definition(column)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn index_filter(&self, filter: Option<&str>) -> Result<String> {
		match filter {
			Some(_) => Err(self.unsupported("CreateIndex (filtered)")),
			None => Ok(String::new()),
		}
	}

	fn rename_index(
		&self,
		table: &str,
		schema: Option<&str>,
		name: &str,
		new_name: &str,
		commands: &mut CommandList,
	) -> Result<()> {
		let sql = format!(
			"ALTER TABLE {} RENAME INDEX {} TO {}",
			self.table_name(table, schema)?,
			self.ident(name)?,
			self.ident(new_name)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn drop_primary_key(&self, table: &str, schema: Option<&str>, _name: &str, commands: &mut CommandList) -> Result<()> {
		let sql = format!("ALTER TABLE {} DROP PRIMARY KEY", self.table_name(table, schema)?);
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
		let sql = format!(
			"ALTER TABLE {} DROP INDEX {}",
			self.table_name(table, schema)?,
			self.ident(name)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn drop_foreign_key(&self, table: &str, schema: Option<&str>, name: &str, commands: &mut CommandList) -> Result<()> {
		let sql = format!(
			"ALTER TABLE {} DROP FOREIGN KEY {}",
			self.table_name(table, schema)?,
			self.ident(name)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn alter_table(
		&self,
		table: &str,
		schema: Option<&str>,
		comment: Option<&str>,
		commands: &mut CommandList,
	) -> Result<()> {
		let sql = format!(
			"ALTER TABLE {} COMMENT = {}",
			self.table_name(table, schema)?,
			self.comment_literal(comment)
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn rename_table(
		&self,
		name: &str,
		schema: Option<&str>,
		new_name: &str,
		commands: &mut CommandList,
	) -> Result<()> {
		let sql = format!(
			"RENAME TABLE {} TO {}",
			self.table_name(name, schema)?,
			self.table_name(new_name, schema)?
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn ensure_schema(&self, name: &str, commands: &mut CommandList) -> Result<()> {
		commands.push(self.terminate(format!("CREATE SCHEMA IF NOT EXISTS {}", self.ident(name)?)));
		Ok(())
	}

	fn table_exists_sql(&self, table: &str) -> Result<String> {
		Ok(format!(
			"SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = {};",
			self.helper().escape_literal(&Value::String(prefixed(table)))
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::MigrationError;
	use crate::migrations::operations::{ForeignKeyDefinition, IndexDefinition, ReferentialAction};
	use crate::migrations::MigrationBuilder;
	use rstest::rstest;
	use strata_query::ColumnType;

	fn generate(builder: &MigrationBuilder) -> Result<Vec<String>> {
		let commands = MySqlMigrationsSqlGenerator::default().generate(builder.operations())?;
		Ok(commands.into_iter().map(|c| c.sql).collect())
	}

	#[test]
	fn test_create_table_with_identity_and_comment() {
		let mut builder = MigrationBuilder::new();
		builder
			.create_table_named("orders")
			.column(ColumnDefinition::new("id", ColumnType::BigInt).identity())
			.column(ColumnDefinition::new("total", ColumnType::Decimal).default_value(Value::Int(0)))
			.column(ColumnDefinition::new("version", ColumnType::Bytes).row_version())
			.primary_key(crate::migrations::PrimaryKeyDefinition::new("PK_orders", vec!["id".into()]))
			.comment("customer's orders");

		assert_eq!(
			generate(&builder).unwrap(),
			vec![
				"CREATE TABLE `$pre:orders` (\n    \
				 `id` bigint NOT NULL AUTO_INCREMENT,\n    \
				 `total` decimal(18,2) NOT NULL DEFAULT 0,\n    \
				 `version` timestamp(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6) ON UPDATE CURRENT_TIMESTAMP(6),\n    \
				 CONSTRAINT `PK_orders` PRIMARY KEY (`id`)\n) COMMENT = 'customer''s orders';"
			]
		);
	}

	#[test]
	fn test_foreign_key_keeps_restrict() {
		let mut builder = MigrationBuilder::new();
		builder.add_foreign_key(
			"orders",
			ForeignKeyDefinition::new("FK_orders_users", vec!["user_id".into()], "users", vec!["id".into()])
				.on_delete(ReferentialAction::Restrict),
		);

		assert_eq!(
			generate(&builder).unwrap(),
			vec![
				"ALTER TABLE `$pre:orders` ADD CONSTRAINT `FK_orders_users` FOREIGN KEY (`user_id`) REFERENCES `$pre:users` (`id`) ON DELETE RESTRICT;"
			]
		);
	}

	#[rstest]
	#[case::alter(
		|b: &mut MigrationBuilder| { b.alter_column("users", ColumnDefinition::new("email", ColumnType::String).max_length(200), None); },
		"ALTER TABLE `$pre:users` MODIFY COLUMN `email` varchar(200) NOT NULL;"
	)]
	#[case::rename_column(
		|b: &mut MigrationBuilder| { b.rename_column("users", "email", "mail"); },
		"ALTER TABLE `$pre:users` RENAME COLUMN `email` TO `mail`;"
	)]
	#[case::rename_index(
		|b: &mut MigrationBuilder| { b.rename_index("users", "IX_a", "IX_b"); },
		"ALTER TABLE `$pre:users` RENAME INDEX `IX_a` TO `IX_b`;"
	)]
	#[case::rename_table(
		|b: &mut MigrationBuilder| { b.rename_table("users", "people"); },
		"RENAME TABLE `$pre:users` TO `$pre:people`;"
	)]
	#[case::drop_pk(
		|b: &mut MigrationBuilder| { b.drop_primary_key("users", "PK_users"); },
		"ALTER TABLE `$pre:users` DROP PRIMARY KEY;"
	)]
	#[case::drop_unique(
		|b: &mut MigrationBuilder| { b.drop_unique_constraint("users", "UQ_email"); },
		"ALTER TABLE `$pre:users` DROP INDEX `UQ_email`;"
	)]
	#[case::drop_fk(
		|b: &mut MigrationBuilder| { b.drop_foreign_key("orders", "FK_o"); },
		"ALTER TABLE `$pre:orders` DROP FOREIGN KEY `FK_o`;"
	)]
	#[case::ensure_schema(
		|b: &mut MigrationBuilder| { b.ensure_schema("audit"); },
		"CREATE SCHEMA IF NOT EXISTS `audit`;"
	)]
	#[case::clear_comment(
		|b: &mut MigrationBuilder| { b.alter_table("users", None); },
		"ALTER TABLE `$pre:users` COMMENT = '';"
	)]
	fn test_single_statement_operations(#[case] build: fn(&mut MigrationBuilder), #[case] expected: &str) {
		let mut builder = MigrationBuilder::new();
		build(&mut builder);

		assert_eq!(generate(&builder).unwrap(), vec![expected.to_string()]);
	}

	#[test]
	fn test_filtered_index_is_unsupported() {
		let mut builder = MigrationBuilder::new();
		builder.create_index(IndexDefinition::new("IX_active", "users", vec!["email".into()]).filter("active = 1"));

		assert!(matches!(
			generate(&builder),
			Err(MigrationError::UnsupportedOperation { .. })
		));
	}

	#[test]
	fn test_sequences_are_unsupported() {
		let mut builder = MigrationBuilder::new();
		builder.restart_sequence("order_numbers", 100);

		assert!(matches!(
			generate(&builder),
			Err(MigrationError::UnsupportedOperation { ref operation, .. }) if operation == "RestartSequence"
		));
	}
}
