//! DDL rendered from entity metadata, per dialect

mod common;

use common::{Label, Task};
use rstest::rstest;
use strata_db::MigrationError;
use strata_db::migrations::{MigrationBuilder, MigrationsSqlGenerator, generator_for};
use strata_query::{Dialect, Expression, Value};

fn render(dialect: Dialect, builder: &MigrationBuilder) -> Vec<String> {
	generator_for(dialect)
		.generate(builder.operations())
		.unwrap()
		.into_iter()
		.map(|command| command.sql)
		.collect()
}

#[rstest]
#[case::sql_server(
	Dialect::sql_server(),
	"CREATE TABLE [$pre:tasks] (\n    \
	 [id] bigint NOT NULL IDENTITY(1,1),\n    \
	 [title] nvarchar(100) NOT NULL,\n    \
	 [sort_order] int NOT NULL,\n    \
	 [done] bit NOT NULL,\n    \
	 [due] date NULL,\n    \
	 CONSTRAINT [PK_$pre:tasks] PRIMARY KEY ([id])\n);"
)]
#[case::mysql(
	Dialect::mysql(),
	"CREATE TABLE `$pre:tasks` (\n    \
	 `id` bigint NOT NULL AUTO_INCREMENT,\n    \
	 `title` varchar(100) NOT NULL,\n    \
	 `sort_order` int NOT NULL,\n    \
	 `done` tinyint(1) NOT NULL,\n    \
	 `due` date NULL,\n    \
	 CONSTRAINT `PK_$pre:tasks` PRIMARY KEY (`id`)\n);"
)]
#[case::sqlite(
	Dialect::sqlite(),
	"CREATE TABLE \"$pre:tasks\" (\n    \
	 \"id\" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,\n    \
	 \"title\" TEXT NOT NULL,\n    \
	 \"sort_order\" INTEGER NOT NULL,\n    \
	 \"done\" INTEGER NOT NULL,\n    \
	 \"due\" TEXT NULL\n);"
)]
fn test_create_table_from_entity(#[case] dialect: Dialect, #[case] expected: &str) {
	let mut builder = MigrationBuilder::new();
	builder.create_table::<Task>();

	assert_eq!(render(dialect, &builder), vec![expected.to_string()]);
}

#[test]
fn test_create_table_with_unique_key_and_row_version() {
	let mut builder = MigrationBuilder::new();
	builder.create_table::<Label>();

	assert_eq!(
		render(Dialect::sql_server(), &builder),
		vec![
			"CREATE TABLE [$pre:labels] (\n    \
			 [code] nvarchar(40) NOT NULL,\n    \
			 [name] nvarchar(max) NOT NULL,\n    \
			 [version] rowversion NOT NULL,\n    \
			 CONSTRAINT [PK_$pre:labels] PRIMARY KEY ([code]),\n    \
			 CONSTRAINT [UQ_$pre:labels_name] UNIQUE ([name])\n);"
		]
	);
}

#[test]
fn test_row_operations_embed_literals() {
	let mut builder = MigrationBuilder::new();
	builder
		.insert(&Task::new("O'Brien", 1))
		.update(&Task {
			id: 4,
			..Task::new("renamed", 2)
		})
		.unwrap()
		.delete(&Task {
			id: 5,
			..Default::default()
		})
		.unwrap();

	assert_eq!(
		render(Dialect::sql_server(), &builder),
		vec![
			"INSERT INTO [$pre:tasks] ([title], [sort_order], [done], [due]) VALUES (N'O''Brien', 1, 0, NULL);",
			"UPDATE [$pre:tasks] SET [title] = N'renamed', [sort_order] = 2, [done] = 0, [due] = NULL WHERE [id] = 4;",
			"DELETE FROM [$pre:tasks] WHERE [id] = 5;",
		]
	);
}

#[test]
fn test_update_where_rejects_bound_parameters() {
	let mut builder = MigrationBuilder::new();
	let done = Expression::property::<Task>("done").unwrap();
	builder.update_where::<Task>(
		vec![("done".to_string(), Value::Bool(true))],
		done.eq(Expression::parameter("flag", false)),
	);

	let result = generator_for(Dialect::mysql()).generate(builder.operations());

	assert!(matches!(result, Err(MigrationError::InvalidOperation(_))));
}

#[test]
fn test_unsupported_operation_produces_no_commands() {
	let mut builder = MigrationBuilder::new();
	builder.create_table::<Task>();
	builder.rename_sequence("order_numbers", "invoice_numbers");

	let result = generator_for(Dialect::sqlite()).generate(builder.operations());

	assert!(matches!(
		result,
		Err(MigrationError::UnsupportedOperation { ref operation, .. }) if operation == "RenameSequence"
	));
}

#[test]
fn test_script_separators() {
	let mut builder = MigrationBuilder::new();
	builder.drop_table("tasks").sql("  DELETE FROM [$pre:log];  ");

	assert_eq!(
		generator_for(Dialect::sql_server())
			.generate_script(builder.operations())
			.unwrap(),
		"DROP TABLE [$pre:tasks];\nGO\n\nDELETE FROM [$pre:log];\nGO\n\n"
	);
	assert_eq!(
		generator_for(Dialect::mysql())
			.generate_script(builder.operations())
			.unwrap(),
		"DROP TABLE `$pre:tasks`;\n\nDELETE FROM [$pre:log];\n\n"
	);
}
