use strata_query::{Dialect, Value, prefixed};

use super::{CommandList, MigrationsSqlGenerator, Result};
use crate::migrations::operations::{ColumnDefinition, ReferentialAction, SequenceDefinition};

const DEFAULT_SCHEMA: &str = "dbo";

/// SQL Server DDL.
#[derive(Debug, Clone)]
pub struct SqlServerMigrationsSqlGenerator {
	dialect: Dialect,
}

impl SqlServerMigrationsSqlGenerator {
	pub fn new(dialect: Dialect) -> Self {
		Self { dialect }
	}

	fn literal(&self, value: &str) -> String {
		self.helper().string_literal(value)
	}

	/// Script dropping whatever default constraint is bound to `column`.
	///
	/// Defaults are named by the engine, so the name is looked up at run time.
	fn drop_default_constraint(
		&self,
		table: &str,
		schema: Option<&str>,
		column: &str,
		commands: &mut CommandList,
	) -> Result<String> {
		let variable = commands.next_variable();
		let table = self.table_name(table, schema)?;
		let drop = format!("ALTER TABLE {} DROP CONSTRAINT [", self.helper().escape_string(&table));
		Ok(format!(
			"DECLARE @{var} sysname;\n\
			 SELECT @{var} = [d].[name]\n\
			 FROM [sys].[default_constraints] [d]\n\
			 INNER JOIN [sys].[columns] [c] ON [d].[parent_column_id] = [c].[column_id] AND [d].[parent_object_id] = [c].[object_id]\n\
			 WHERE ([d].[parent_object_id] = OBJECT_ID({table}) AND [c].[name] = {column});\n\
			 IF @{var} IS NOT NULL EXEC(N'{drop}' + @{var} + '];');",
			var = variable,
			table = self.literal(&table),
			column = self.literal(column),
			drop = drop,
		))
	}

	fn sequence_name(&self, name: &str, schema: Option<&str>) -> Result<String> {
		Ok(self.helper().delimit_identifier_with_schema(name, schema)?)
	}

	/// `INCREMENT BY ... MINVALUE ... MAXVALUE ... CYCLE`, shared by create and alter.
	fn sequence_options(&self, sequence: &SequenceDefinition) -> String {
		let min = match sequence.min_value {
			Some(v) => format!("MINVALUE {}", v),
			None => "NO MINVALUE".to_string(),
		};
		let max = match sequence.max_value {
			Some(v) => format!("MAXVALUE {}", v),
			None => "NO MAXVALUE".to_string(),
		};
		let cycle = if sequence.cycle { "CYCLE" } else { "NO CYCLE" };
		format!("INCREMENT BY {} {} {} {}", sequence.increment_by, min, max, cycle)
	}

	fn sp_rename(&self, object: &str, new_name: &str, kind: Option<&str>) -> String {
		let mut sql = format!("EXEC sp_rename {}, {}", self.literal(object), self.literal(new_name));
		if let Some(kind) = kind {
			sql.push_str(", ");
			sql.push_str(&self.literal(kind));
		}
		self.terminate(sql)
	}
}

impl Default for SqlServerMigrationsSqlGenerator {
	fn default() -> Self {
		Self::new(Dialect::sql_server())
	}
}

impl MigrationsSqlGenerator for SqlServerMigrationsSqlGenerator {
	fn dialect(&self) -> &Dialect {
		&self.dialect
	}

	fn identity_clause(&self) -> &'static str {
		" IDENTITY(1,1)"
	}

	fn clustered_clause(&self, clustered: Option<bool>) -> &'static str {
		match clustered {
			Some(true) => " CLUSTERED",
			Some(false) => " NONCLUSTERED",
			None => "",
		}
	}

	fn referential_action(&self, action: ReferentialAction) -> &'static str {
		match action {
			ReferentialAction::Restrict => ReferentialAction::NoAction.as_sql(),
			other => other.as_sql(),
		}
	}

	fn computed_column_definition(&self, column: &ColumnDefinition, sql: &str) -> Result<String> {
		Ok(format!("{} AS ({})", self.ident(&column.name)?, sql))
	}

	/// Drops the current default, alters type and nullability, then re-adds
	/// the new default, all in one batch.
	fn alter_column(
		&self,
		table: &str,
		schema: Option<&str>,
		column: &ColumnDefinition,
		_old_column: Option<&ColumnDefinition>,
		commands: &mut CommandList,
	) -> Result<()> {
		let default = self.default_clause(column)?;
		let table_name = self.table_name(table, schema)?;
		let column_name = self.ident(&column.name)?;
		let mut lines = vec![self.drop_default_constraint(table, schema, &column.name, commands)?];
		lines.push(self.terminate(format!(
			"ALTER TABLE {} ALTER COLUMN {} {}{}",
			table_name,
			column_name,
			self.column_type(column)?,
			self.nullability(column)
		)));
		if let Some(expression) = default.strip_prefix(" DEFAULT ") {
			lines.push(self.terminate(format!(
				"ALTER TABLE {} ADD DEFAULT {} FOR {}",
				table_name, expression, column_name
			)));
		}
		commands.push(lines.join("\n"));
		Ok(())
	}

	fn drop_column(&self, table: &str, schema: Option<&str>, name: &str, commands: &mut CommandList) -> Result<()> {
		let drop_default = self.drop_default_constraint(table, schema, name, commands)?;
		let sql = format!(
			"{}\n{}",
			drop_default,
			self.terminate(format!(
				"ALTER TABLE {} DROP COLUMN {}",
				self.table_name(table, schema)?,
				self.ident(name)?
			))
		);
		commands.push(sql);
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
		let object = format!("{}.{}", self.table_name(table, schema)?, self.ident(name)?);
		commands.push(self.sp_rename(&object, new_name, Some("COLUMN")));
		Ok(())
	}

	fn rename_index(
		&self,
		table: &str,
		schema: Option<&str>,
		name: &str,
		new_name: &str,
		commands: &mut CommandList,
	) -> Result<()> {
		let object = format!("{}.{}", self.table_name(table, schema)?, self.ident(name)?);
		commands.push(self.sp_rename(&object, new_name, Some("INDEX")));
		Ok(())
	}

	fn rename_table(
		&self,
		name: &str,
		schema: Option<&str>,
		new_name: &str,
		commands: &mut CommandList,
	) -> Result<()> {
		let object = self.table_name(name, schema)?;
		commands.push(self.sp_rename(&object, &prefixed(new_name), None));
		Ok(())
	}

	/// Table comments live in the `MS_Description` extended property.
	fn alter_table(
		&self,
		table: &str,
		schema: Option<&str>,
		comment: Option<&str>,
		commands: &mut CommandList,
	) -> Result<()> {
		let schema_name = schema.unwrap_or(DEFAULT_SCHEMA);
		let table_name = prefixed(table);
		let target = format!(
			"@level0type = N'SCHEMA', @level0name = {}, @level1type = N'TABLE', @level1name = {}",
			self.literal(schema_name),
			self.literal(&table_name)
		);
		let mut lines = vec![format!(
			"IF EXISTS (SELECT 1 FROM [sys].[extended_properties] WHERE [major_id] = OBJECT_ID({}) AND [minor_id] = 0 AND [name] = N'MS_Description')\n    \
			 EXEC sp_dropextendedproperty @name = N'MS_Description', {};",
			self.literal(&self.table_name(table, Some(schema_name))?),
			target
		)];
		if let Some(comment) = comment {
			lines.push(format!(
				"EXEC sp_addextendedproperty @name = N'MS_Description', @value = {}, {};",
				self.helper().escape_literal(&Value::String(comment.to_string())),
				target
			));
		}
		commands.push(lines.join("\n"));
		Ok(())
	}

	fn ensure_schema(&self, name: &str, commands: &mut CommandList) -> Result<()> {
		let create = format!("CREATE SCHEMA {};", self.ident(name)?);
		commands.push(self.terminate(format!(
			"IF SCHEMA_ID({}) IS NULL EXEC({})",
			self.literal(name),
			self.literal(&create)
		)));
		Ok(())
	}

	fn create_sequence(&self, sequence: &SequenceDefinition, commands: &mut CommandList) -> Result<()> {
		let column_type =
			self.dialect()
				.type_mapper()
				.get_mapping(&sequence.column_type, None, false, true)?;
		let sql = format!(
			"CREATE SEQUENCE {} AS {} START WITH {} {}",
			self.sequence_name(&sequence.name, sequence.schema.as_deref())?,
			column_type,
			sequence.start_value,
			self.sequence_options(sequence)
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn alter_sequence(&self, sequence: &SequenceDefinition, commands: &mut CommandList) -> Result<()> {
		let sql = format!(
			"ALTER SEQUENCE {} {}",
			self.sequence_name(&sequence.name, sequence.schema.as_deref())?,
			self.sequence_options(sequence)
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn drop_sequence(&self, name: &str, schema: Option<&str>, commands: &mut CommandList) -> Result<()> {
		commands.push(self.terminate(format!("DROP SEQUENCE {}", self.sequence_name(name, schema)?)));
		Ok(())
	}

	fn restart_sequence(
		&self,
		name: &str,
		schema: Option<&str>,
		start_value: i64,
		commands: &mut CommandList,
	) -> Result<()> {
		let sql = format!(
			"ALTER SEQUENCE {} RESTART WITH {}",
			self.sequence_name(name, schema)?,
			start_value
		);
		commands.push(self.terminate(sql));
		Ok(())
	}

	fn rename_sequence(
		&self,
		name: &str,
		schema: Option<&str>,
		new_name: &str,
		commands: &mut CommandList,
	) -> Result<()> {
		let object = self.sequence_name(name, schema)?;
		commands.push(self.sp_rename(&object, new_name, None));
		Ok(())
	}

	fn table_exists_sql(&self, table: &str) -> Result<String> {
		Ok(format!(
			"SELECT CASE WHEN OBJECT_ID({}) IS NULL THEN 0 ELSE 1 END;",
			self.literal(&self.table_name(table, None)?)
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::migrations::MigrationBuilder;
	use crate::migrations::operations::{ForeignKeyDefinition, IndexDefinition, PrimaryKeyDefinition};
	use rstest::rstest;
	use strata_query::ColumnType;

	fn generate(builder: &MigrationBuilder) -> Vec<String> {
		SqlServerMigrationsSqlGenerator::default()
			.generate(builder.operations())
			.unwrap()
			.into_iter()
			.map(|c| c.sql)
			.collect()
	}

	#[test]
	fn test_create_table_with_identity_and_clustered_key() {
		let mut builder = MigrationBuilder::new();
		builder
			.create_table_named("orders")
			.column(ColumnDefinition::new("id", ColumnType::Int).identity())
			.column(ColumnDefinition::new("code", ColumnType::String).max_length(20).ansi())
			.column(ColumnDefinition::new("version", ColumnType::Bytes).row_version())
			.primary_key(PrimaryKeyDefinition::new("PK_orders", vec!["id".into()]))
			.clustered(false);

		assert_eq!(
			generate(&builder),
			vec![
				"CREATE TABLE [$pre:orders] (\n    \
				 [id] int NOT NULL IDENTITY(1,1),\n    \
				 [code] varchar(20) NOT NULL,\n    \
				 [version] rowversion NOT NULL,\n    \
				 CONSTRAINT [PK_orders] PRIMARY KEY NONCLUSTERED ([id])\n);"
			]
		);
	}

	#[test]
	fn test_alter_column_replaces_default_constraint() {
		let mut builder = MigrationBuilder::new();
		builder.alter_column(
			"users",
			ColumnDefinition::new("active", ColumnType::Bool).default_value(Value::Bool(true)),
			None,
		);

		assert_eq!(
			generate(&builder),
			vec![
				"DECLARE @var0 sysname;\n\
				 SELECT @var0 = [d].[name]\n\
				 FROM [sys].[default_constraints] [d]\n\
				 INNER JOIN [sys].[columns] [c] ON [d].[parent_column_id] = [c].[column_id] AND [d].[parent_object_id] = [c].[object_id]\n\
				 WHERE ([d].[parent_object_id] = OBJECT_ID(N'[$pre:users]') AND [c].[name] = N'active');\n\
				 IF @var0 IS NOT NULL EXEC(N'ALTER TABLE [$pre:users] DROP CONSTRAINT [' + @var0 + '];');\n\
				 ALTER TABLE [$pre:users] ALTER COLUMN [active] bit NOT NULL;\n\
				 ALTER TABLE [$pre:users] ADD DEFAULT 1 FOR [active];"
			]
		);
	}

	#[test]
	fn test_script_variables_are_unique_per_run() {
		let mut builder = MigrationBuilder::new();
		builder.drop_column("users", "a").drop_column("users", "b");

		let commands = generate(&builder);

		assert!(commands[0].starts_with("DECLARE @var0 sysname;"));
		assert!(commands[1].starts_with("DECLARE @var1 sysname;"));
		assert!(commands[1].ends_with("ALTER TABLE [$pre:users] DROP COLUMN [b];"));
	}

	#[test]
	fn test_computed_column_has_no_type() {
		let mut builder = MigrationBuilder::new();
		builder.add_column(
			"lines",
			ColumnDefinition::new("total", ColumnType::Decimal).computed("[price] * [quantity]"),
		);

		assert_eq!(
			generate(&builder),
			vec!["ALTER TABLE [$pre:lines] ADD [total] AS ([price] * [quantity]);"]
		);
	}

	#[rstest]
	#[case::rename_column(
		|b: &mut MigrationBuilder| { b.rename_column("users", "email", "mail"); },
		"EXEC sp_rename N'[$pre:users].[email]', N'mail', N'COLUMN';"
	)]
	#[case::rename_index(
		|b: &mut MigrationBuilder| { b.rename_index("users", "IX_a", "IX_b"); },
		"EXEC sp_rename N'[$pre:users].[IX_a]', N'IX_b', N'INDEX';"
	)]
	#[case::rename_table(
		|b: &mut MigrationBuilder| { b.rename_table("users", "people"); },
		"EXEC sp_rename N'[$pre:users]', N'$pre:people';"
	)]
	#[case::ensure_schema(
		|b: &mut MigrationBuilder| { b.ensure_schema("audit"); },
		"IF SCHEMA_ID(N'audit') IS NULL EXEC(N'CREATE SCHEMA [audit];');"
	)]
	#[case::drop_index(
		|b: &mut MigrationBuilder| { b.drop_index("users", "IX_a"); },
		"DROP INDEX [IX_a] ON [$pre:users];"
	)]
	#[case::filtered_index(
		|b: &mut MigrationBuilder| { b.create_index(IndexDefinition::new("IX_active", "users", vec!["email".into()]).unique().filter("[active] = 1")); },
		"CREATE UNIQUE INDEX [IX_active] ON [$pre:users] ([email]) WHERE [active] = 1;"
	)]
	#[case::restrict_is_no_action(
		|b: &mut MigrationBuilder| {
			b.add_foreign_key(
				"orders",
				ForeignKeyDefinition::new("FK_o", vec!["user_id".into()], "users", vec!["id".into()])
					.on_delete(ReferentialAction::Restrict)
					.on_update(ReferentialAction::Cascade),
			);
		},
		"ALTER TABLE [$pre:orders] ADD CONSTRAINT [FK_o] FOREIGN KEY ([user_id]) REFERENCES [$pre:users] ([id]) ON DELETE NO ACTION ON UPDATE CASCADE;"
	)]
	#[case::create_sequence(
		|b: &mut MigrationBuilder| { b.create_sequence(SequenceDefinition::new("order_numbers")); },
		"CREATE SEQUENCE [order_numbers] AS bigint START WITH 1 INCREMENT BY 1 NO MINVALUE NO MAXVALUE NO CYCLE;"
	)]
	#[case::restart_sequence(
		|b: &mut MigrationBuilder| { b.restart_sequence("order_numbers", 100); },
		"ALTER SEQUENCE [order_numbers] RESTART WITH 100;"
	)]
	fn test_single_command_operations(#[case] build: fn(&mut MigrationBuilder), #[case] expected: &str) {
		let mut builder = MigrationBuilder::new();
		build(&mut builder);

		assert_eq!(generate(&builder), vec![expected.to_string()]);
	}

	#[test]
	fn test_table_comment_uses_extended_property() {
		let mut builder = MigrationBuilder::new();
		builder.alter_table("users", Some("People's accounts".into()));

		assert_eq!(
			generate(&builder),
			vec![
				"IF EXISTS (SELECT 1 FROM [sys].[extended_properties] WHERE [major_id] = OBJECT_ID(N'[dbo].[$pre:users]') AND [minor_id] = 0 AND [name] = N'MS_Description')\n    \
				 EXEC sp_dropextendedproperty @name = N'MS_Description', @level0type = N'SCHEMA', @level0name = N'dbo', @level1type = N'TABLE', @level1name = N'$pre:users';\n\
				 EXEC sp_addextendedproperty @name = N'MS_Description', @value = N'People''s accounts', @level0type = N'SCHEMA', @level0name = N'dbo', @level1type = N'TABLE', @level1name = N'$pre:users';"
			]
		);
	}

	#[test]
	fn test_script_separates_batches() {
		let mut builder = MigrationBuilder::new();
		builder.drop_table("a").drop_table("b");

		let script = SqlServerMigrationsSqlGenerator::default()
			.generate_script(builder.operations())
			.unwrap();

		assert_eq!(script, "DROP TABLE [$pre:a];\nGO\n\nDROP TABLE [$pre:b];\nGO\n\n");
	}

	#[test]
	fn test_table_exists_sql() {
		assert_eq!(
			SqlServerMigrationsSqlGenerator::default()
				.table_exists_sql("__strata_migrations")
				.unwrap(),
			"SELECT CASE WHEN OBJECT_ID(N'[$pre:__strata_migrations]') IS NULL THEN 0 ELSE 1 END;"
		);
	}
}
