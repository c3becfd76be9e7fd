//! Statement generation over derived entities

mod common;

use chrono::NaiveDate;
use common::{Post, Tag, User};
use rstest::{fixture, rstest};
use strata_query::prelude::*;

#[fixture]
fn user() -> User {
	User {
		id: 7,
		email: "ada@example.com".to_string(),
		name: Some("Ada".to_string()),
		created_at: NaiveDate::from_ymd_opt(2024, 3, 1)
			.unwrap()
			.and_hms_opt(9, 30, 0)
			.unwrap(),
		sort_order: 3,
		cached: true,
	}
}

fn names(parameters: &[Parameter]) -> Vec<&str> {
	parameters.iter().map(|p| p.name.as_str()).collect()
}

#[test]
fn test_page_query_with_order() {
	let dialect = Dialect::sqlite();
	let paged = dialect
		.select::<User>()
		.order_by(Expression::property::<User>("id").unwrap())
		.page(3, 20)
		.page_query()
		.unwrap();

	assert_eq!(
		paged.data.sql,
		"SELECT * FROM \"$pre:users\" ORDER BY \"id\" ASC LIMIT 40, 20;"
	);
	assert_eq!(paged.count.sql, "SELECT COUNT(1) FROM \"$pre:users\";");
}

#[test]
fn test_page_query_without_order_on_sql_server() {
	let dialect = Dialect::sql_server();
	let email = Expression::property::<User>("email").unwrap();
	let paged = dialect
		.select::<User>()
		.filter(email.eq(Expression::parameter("email", "ada@example.com")))
		.page_query()
		.unwrap();

	assert_eq!(
		paged.data.sql,
		"SELECT * FROM [$pre:users] WHERE [email] = @email ORDER BY (SELECT 1) OFFSET 0 ROWS FETCH NEXT 20 ROWS ONLY;"
	);
	assert_eq!(
		paged.count.sql,
		"SELECT COUNT(1) FROM [$pre:users] WHERE [email] = @email;"
	);
	assert_eq!(names(&paged.data.parameters), ["email"]);
	assert_eq!(paged.count.parameters, paged.data.parameters);
}

#[test]
fn test_page_query_counts_distinct_aggregation() {
	let email = Expression::property::<User>("email").unwrap();
	let paged = Dialect::mysql()
		.select::<User>()
		.select(email.clone())
		.distinct()
		.aggregate(email)
		.page(2, 10)
		.page_query()
		.unwrap();

	assert_eq!(
		paged.data.sql,
		"SELECT DISTINCT `email` FROM `$pre:users` LIMIT 10, 10;"
	);
	assert_eq!(
		paged.count.sql,
		"SELECT COUNT(DISTINCT `email`) FROM `$pre:users`;"
	);
}

#[test]
fn test_distinct_without_aggregation_counts_rows() {
	let paged = Dialect::sqlite()
		.select::<User>()
		.distinct()
		.page_query()
		.unwrap();

	assert_eq!(paged.count.sql, "SELECT COUNT(1) FROM \"$pre:users\";");
}

#[test]
fn test_filters_are_combined() {
	let email = Expression::property::<User>("email").unwrap();
	let order = Expression::property::<User>("sort_order").unwrap();
	let compiled = Dialect::sqlite()
		.select::<User>()
		.filter(email.starts_with("a"))
		.filter(order.clone().gt(Expression::parameter("min", 2i32)))
		.order_by(order.desc())
		.query()
		.unwrap();

	assert_eq!(
		compiled.sql,
		"SELECT * FROM \"$pre:users\" WHERE (\"email\" LIKE 'a%' ESCAPE '\\' AND \"sort_order\" > @min) ORDER BY \"sort_order\" DESC;"
	);
	assert_eq!(compiled.parameter("min"), Some(&Value::Int(2)));
}

#[rstest]
#[case(Dialect::sql_server(), "SELECT TOP 5 * FROM [$pre:users];")]
#[case(Dialect::mysql(), "SELECT * FROM `$pre:users` LIMIT 5;")]
#[case(Dialect::sqlite(), "SELECT * FROM \"$pre:users\" LIMIT 5;")]
fn test_size_query(#[case] dialect: Dialect, #[case] expected: &str) {
	let compiled = dialect.select::<User>().size(5).size_query().unwrap();

	assert_eq!(compiled.sql, expected);
}

#[rstest]
#[case(Dialect::sql_server())]
#[case(Dialect::mysql())]
#[case(Dialect::sqlite())]
fn test_size_query_requires_row_cap(#[case] dialect: Dialect) {
	let result = dialect.select::<User>().size_query();

	assert!(matches!(result, Err(QueryError::InvalidExpression(_))));
}

#[test]
fn test_page_offset_saturates() {
	let paged = Dialect::sqlite()
		.select::<User>()
		.page(usize::MAX, 20)
		.page_query()
		.unwrap();

	assert!(paged.data.sql.ends_with(&format!("LIMIT {}, 20;", usize::MAX)));
}

#[rstest]
#[case(Dialect::sql_server(), "SELECT TOP 1 1 FROM [$pre:users];")]
#[case(Dialect::mysql(), "SELECT 1 FROM `$pre:users` LIMIT 1;")]
#[case(Dialect::sqlite(), "SELECT 1 FROM \"$pre:users\" LIMIT 1;")]
fn test_any(#[case] dialect: Dialect, #[case] expected: &str) {
	let compiled = dialect.any(&get_entity_type::<User>(), None).unwrap();

	assert_eq!(compiled.sql, expected);
	assert!(compiled.parameters.is_empty());
}

#[test]
fn test_any_with_predicate() {
	let predicate = Expression::property::<User>("email")
		.unwrap()
		.eq(Expression::parameter("email", "ada@example.com"));
	let compiled = Dialect::sql_server()
		.any(&get_entity_type::<User>(), Some(&predicate))
		.unwrap();

	assert_eq!(
		compiled.sql,
		"SELECT TOP 1 1 FROM [$pre:users] WHERE [email] = @email;"
	);
	assert_eq!(names(&compiled.parameters), ["email"]);
}

#[test]
fn test_join() {
	let on = Expression::aliased_property::<Post>("p", "user_id")
		.unwrap()
		.eq(Expression::aliased_property::<User>("u", "id").unwrap());
	let compiled = Dialect::sqlite()
		.select::<User>()
		.alias("u")
		.join::<Post>(JoinKind::Inner, "p", on)
		.query()
		.unwrap();

	assert_eq!(
		compiled.sql,
		"SELECT \"u\".* FROM \"$pre:users\" AS \"u\" INNER JOIN \"$pre:posts\" AS \"p\" ON \"p\".\"user_id\" = \"u\".\"id\";"
	);
}

#[rstest]
fn test_insert_skips_identity(user: User) {
	let compiled = Dialect::sqlite().insert(&user).unwrap();

	assert_eq!(
		compiled.sql,
		"INSERT INTO \"$pre:users\" (\"email\", \"display_name\", \"created_at\", \"sort_order\") VALUES (@email, @name, @created_at, @sort_order);"
	);
	assert_eq!(names(&compiled.parameters), ["email", "name", "created_at", "sort_order"]);
	assert_eq!(compiled.parameter("name"), Some(&Value::from("Ada")));
}

#[test]
fn test_insert_skips_row_version() {
	let post = Post {
		id: 1,
		user_id: 7,
		title: "Hello".to_string(),
		version: vec![0, 1],
	};
	let compiled = Dialect::sql_server().insert(&post).unwrap();

	assert_eq!(
		compiled.sql,
		"INSERT INTO [$pre:posts] ([id], [user_id], [title]) VALUES (@id, @user_id, @title);"
	);
}

#[rstest]
fn test_update_by_key(user: User) {
	let compiled = Dialect::sqlite().update(&user).unwrap();

	assert_eq!(
		compiled.sql,
		"UPDATE \"$pre:users\" SET \"email\" = @email, \"display_name\" = @name, \"created_at\" = @created_at, \"sort_order\" = @sort_order WHERE \"id\" = @id;"
	);
	assert_eq!(compiled.parameter("id"), Some(&Value::BigInt(7)));
}

#[test]
fn test_update_without_updatable_columns() {
	let tag = Tag {
		tenant: 1,
		name: "rust".to_string(),
		created_by: "ada".to_string(),
	};

	assert!(matches!(
		Dialect::sqlite().update(&tag),
		Err(QueryError::InvalidExpression(_))
	));
}

#[rstest]
fn test_delete_by_key(user: User) {
	let compiled = Dialect::mysql().delete(&user).unwrap();

	assert_eq!(compiled.sql, "DELETE FROM `$pre:users` WHERE `id` = ?id;");
	assert_eq!(names(&compiled.parameters), ["id"]);
}

#[test]
fn test_select_by_composite_key() {
	let compiled = Dialect::sqlite()
		.select_by_key::<Tag>(&[Value::from(1i32), Value::from("rust")])
		.unwrap();

	assert_eq!(
		compiled.sql,
		"SELECT * FROM \"$pre:Tag\" WHERE \"tenant\" = @tenant AND \"name\" = @name;"
	);
}

#[test]
fn test_select_by_key_arity_mismatch() {
	let result = Dialect::sqlite().select_by_key::<Tag>(&[Value::from(1i32)]);

	assert!(matches!(result, Err(QueryError::InvalidExpression(_))));
}

#[derive(strata_macros::Entity, Debug, Default)]
struct AuditLine {
	line: String,
}

#[test]
fn test_delete_without_primary_key() {
	let line = AuditLine {
		line: "x".to_string(),
	};

	assert!(matches!(
		Dialect::sqlite().delete(&line),
		Err(QueryError::MissingPrimaryKey { .. })
	));
}

fn move_request(direction: MoveDirection) -> MoveRequest {
	MoveRequest::new(
		get_entity_type::<User>(),
		direction,
		"sort_order",
		Parameter::new("id", 7i64),
	)
}

#[test]
fn test_move_sqlite_is_single_statement() {
	let statement = Dialect::sqlite().move_rows(&move_request(MoveDirection::Up)).unwrap();

	assert!(statement.sql.starts_with("WITH \"move_current\" AS MATERIALIZED"));
	assert!(statement.sql.contains(
		"WHERE \"sort_order\" > (SELECT \"move_order\" FROM \"move_current\") ORDER BY \"sort_order\" ASC LIMIT 1"
	));
	assert!(statement.sql.contains("WHERE \"id\" = @id"));
	assert_eq!(statement.sql.matches(';').count(), 1);
	assert_eq!(statement.outcome, MoveOutcome::RowsAffected(2));
	assert_eq!(statement.parameters, vec![Parameter::new("id", 7i64)]);
}

#[test]
fn test_move_down_on_mysql() {
	let statement = Dialect::mysql().move_rows(&move_request(MoveDirection::Down)).unwrap();

	assert!(statement.sql.contains(
		"SELECT `sort_order` FROM `$pre:users` WHERE `id` = ?id INTO @move_current_order;"
	));
	assert!(statement.sql.contains(
		"WHERE `sort_order` < @move_current_order ORDER BY `sort_order` DESC LIMIT 1"
	));
	assert!(statement.sql.ends_with("SELECT @move_adjacent_key IS NOT NULL;"));
	assert_eq!(statement.outcome, MoveOutcome::Scalar);
}

#[test]
fn test_move_sql_server_declares_typed_variables() {
	let statement = Dialect::sql_server().move_rows(&move_request(MoveDirection::Up)).unwrap();

	assert!(statement.sql.starts_with("DECLARE @MoveCurrentOrder int;\nDECLARE @MoveAdjacentKey bigint;"));
	assert!(statement.sql.contains("SELECT TOP 1 @MoveAdjacentKey = [id], @MoveAdjacentOrder = [sort_order]"));
	assert_eq!(statement.sql.matches("ROLLBACK TRANSACTION").count(), 2);
	assert!(statement.sql.ends_with("SELECT 0;"));
	assert_eq!(statement.outcome, MoveOutcome::Scalar);
}

#[test]
fn test_move_with_grouping() {
	let grouping = CompiledSql::new(
		"\"display_name\" = @group",
		vec![Parameter::new("group", "ops")],
	);
	let request = move_request(MoveDirection::Up).grouping(grouping);
	let statement = Dialect::sqlite().move_rows(&request).unwrap();

	assert!(statement.sql.contains(
		"(SELECT \"move_order\" FROM \"move_current\") AND (\"display_name\" = @group) ORDER BY"
	));
	assert_eq!(names(&statement.parameters), ["id", "group"]);
}

#[test]
fn test_move_requires_single_column_key() {
	let request = MoveRequest::new(
		get_entity_type::<Tag>(),
		MoveDirection::Up,
		"created_by",
		Parameter::new("tenant", 1i32),
	);

	assert!(matches!(
		Dialect::sqlite().move_rows(&request),
		Err(QueryError::InvalidExpression(_))
	));
}

#[test]
fn test_move_unknown_order_property() {
	let request = MoveRequest::new(
		get_entity_type::<User>(),
		MoveDirection::Up,
		"position",
		Parameter::new("id", 1i64),
	);

	assert!(matches!(
		Dialect::sqlite().move_rows(&request),
		Err(QueryError::UnknownProperty { .. })
	));
}
