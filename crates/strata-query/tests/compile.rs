//! Expression compilation against derived entities

mod common;

use common::{Post, User};
use rstest::rstest;
use strata_query::prelude::*;

fn email() -> Expression {
	Expression::property::<User>("email").unwrap()
}

fn created_at() -> Expression {
	Expression::property::<User>("created_at").unwrap()
}

#[rstest]
#[case(Dialect::sql_server(), "[display_name] IS NOT NULL")]
#[case(Dialect::mysql(), "`display_name` IS NOT NULL")]
#[case(Dialect::sqlite(), "\"display_name\" IS NOT NULL")]
fn test_property_uses_physical_column(#[case] dialect: Dialect, #[case] expected: &str) {
	let expression = Expression::property::<User>("name").unwrap().ne(Value::Null);

	assert_eq!(dialect.compile(&expression).unwrap().sql, expected);
}

#[test]
fn test_entity_member_resolves_to_column() {
	let expression = Expression::entity::<User>().member("email").eq("a@example.com");

	assert_eq!(
		Dialect::sqlite().compile(&expression).unwrap().sql,
		"\"email\" = 'a@example.com'"
	);
}

#[test]
fn test_aliased_property() {
	let expression = Expression::aliased_property::<Post>("p", "user_id")
		.unwrap()
		.eq(Expression::aliased_property::<User>("u", "id").unwrap());

	assert_eq!(
		Dialect::sql_server().compile(&expression).unwrap().sql,
		"[p].[user_id] = [u].[id]"
	);
}

#[rstest]
#[case(Dialect::sql_server(), "DATEPART(year, [created_at]) = 2024")]
#[case(Dialect::mysql(), "CAST(DATE_FORMAT(`created_at`, '%Y') AS SIGNED) = 2024")]
#[case(Dialect::sqlite(), "CAST(strftime('%Y', \"created_at\") AS INTEGER) = 2024")]
fn test_date_member(#[case] dialect: Dialect, #[case] expected: &str) {
	let expression = created_at().member("year").eq(2024i32);

	assert_eq!(dialect.compile(&expression).unwrap().sql, expected);
}

#[rstest]
#[case(Dialect::sql_server(), "[created_at] < GETDATE()")]
#[case(Dialect::mysql(), "`created_at` < NOW(6)")]
#[case(Dialect::sqlite(), "\"created_at\" < datetime('now', 'localtime')")]
fn test_now(#[case] dialect: Dialect, #[case] expected: &str) {
	let expression = created_at().lt(Expression::static_member(TypeOwner::DateTime, "now"));

	assert_eq!(dialect.compile(&expression).unwrap().sql, expected);
}

#[rstest]
#[case(Dialect::sql_server(), "LEN([email]) > 3")]
#[case(Dialect::mysql(), "CHAR_LENGTH(`email`) > 3")]
#[case(Dialect::sqlite(), "LENGTH(\"email\") > 3")]
fn test_string_length(#[case] dialect: Dialect, #[case] expected: &str) {
	let expression = email().member("length").gt(3i32);

	assert_eq!(dialect.compile(&expression).unwrap().sql, expected);
}

#[rstest]
#[case(Dialect::sql_server(), "SUBSTRING([email], 2, LEN([email]))")]
#[case(Dialect::mysql(), "SUBSTRING(`email`, 2)")]
#[case(Dialect::sqlite(), "SUBSTR(\"email\", 2)")]
fn test_substring(#[case] dialect: Dialect, #[case] expected: &str) {
	let expression = email().call(Method::string("substring"), vec![Expression::constant(1i32)]);

	assert_eq!(dialect.compile(&expression).unwrap().sql, expected);
}

#[rstest]
#[case(Dialect::sql_server(), "LTRIM(RTRIM([email]))")]
#[case(Dialect::mysql(), "TRIM(`email`)")]
fn test_trim(#[case] dialect: Dialect, #[case] expected: &str) {
	let expression = email().call(Method::string("trim"), vec![]);

	assert_eq!(dialect.compile(&expression).unwrap().sql, expected);
}

#[rstest]
#[case(Dialect::sql_server(), "ROUND(ROUND([sort_order], 0, 1), 0)")]
#[case(Dialect::mysql(), "ROUND(TRUNCATE(`sort_order`, 0))")]
#[case(Dialect::sqlite(), "ROUND(CAST(\"sort_order\" AS INTEGER))")]
fn test_math(#[case] dialect: Dialect, #[case] expected: &str) {
	let order = Expression::property::<User>("sort_order").unwrap();
	let truncated = Expression::static_call(Method::math("truncate"), vec![order]);
	let expression = Expression::static_call(Method::math("round"), vec![truncated]);

	assert_eq!(dialect.compile(&expression).unwrap().sql, expected);
}

#[rstest]
#[case(Dialect::sql_server(), "NEWID()")]
#[case(Dialect::mysql(), "UUID()")]
#[case(Dialect::sqlite(), "lower(hex(randomblob(16)))")]
fn test_new_uuid(#[case] dialect: Dialect, #[case] expected: &str) {
	let expression = Expression::static_call(Method::new(TypeOwner::Uuid, "new_v4"), vec![]);

	assert_eq!(dialect.compile(&expression).unwrap().sql, expected);
}

#[test]
fn test_convert_uses_type_mapper() {
	let expression = Expression::static_call(
		Method::new(TypeOwner::Convert, "to_string"),
		vec![Expression::property::<User>("sort_order").unwrap()],
	);

	assert_eq!(
		Dialect::sql_server().compile(&expression).unwrap().sql,
		"CAST([sort_order] AS nvarchar(max))"
	);
}

#[test]
fn test_is_null_or_empty() {
	let expression = Expression::static_call(
		Method::string("is_null_or_empty"),
		vec![Expression::property::<User>("name").unwrap()],
	);

	assert_eq!(
		Dialect::sqlite().compile(&expression).unwrap().sql,
		"(\"display_name\" IS NULL OR \"display_name\" = '')"
	);
}

#[test]
fn test_equals() {
	let expression = email().call(Method::string("equals"), vec![Expression::parameter("email", "x")]);
	let compiled = Dialect::mysql().compile(&expression).unwrap();

	assert_eq!(compiled.sql, "`email` = ?email");
	assert_eq!(compiled.parameter("email"), Some(&Value::from("x")));
}

#[rstest]
#[case(Dialect::sql_server(), "[email] LIKE N'%a\\_b' ESCAPE N'\\'")]
#[case(Dialect::sqlite(), "\"email\" LIKE '%a\\_b' ESCAPE '\\'")]
fn test_ends_with_constant(#[case] dialect: Dialect, #[case] expected: &str) {
	let expression = email().ends_with("a_b");

	assert_eq!(dialect.compile(&expression).unwrap().sql, expected);
}

#[rstest]
#[case::sql_server(
	Dialect::sql_server(),
	"(([email] LIKE (N'%' + @term) AND SUBSTRING([email], ((LEN([email]) - LEN(@term)) + 1), LEN(@term)) = @term) OR @term = N'')"
)]
#[case::mysql(
	Dialect::mysql(),
	"((`email` LIKE CONCAT('%', ?term) AND SUBSTRING(`email`, ((CHAR_LENGTH(`email`) - CHAR_LENGTH(?term)) + 1), CHAR_LENGTH(?term)) = ?term) OR ?term = '')"
)]
#[case::sqlite(
	Dialect::sqlite(),
	"((\"email\" LIKE ('%' || @term) AND SUBSTR(\"email\", ((LENGTH(\"email\") - LENGTH(@term)) + 1), LENGTH(@term)) = @term) OR @term = '')"
)]
fn test_ends_with_parameter_is_anchored(#[case] dialect: Dialect, #[case] expected: &str) {
	let expression = email().ends_with(Expression::parameter("term", "_b"));

	let compiled = dialect.compile(&expression).unwrap();

	assert_eq!(compiled.sql, expected);
	assert_eq!(compiled.parameters.len(), 1);
}

#[test]
fn test_contains_parameter() {
	let expression = email().contains(Expression::parameter("term", "ex"));

	assert_eq!(
		Dialect::sql_server().compile(&expression).unwrap().sql,
		"(CHARINDEX(@term, [email]) > 0 OR @term = N'')"
	);
}

#[test]
fn test_captured_record() {
	let filter = Expression::captured(
		"filter",
		[("email".to_string(), Value::from("o'brien@example.com"))],
	);
	let expression = email().eq(filter.member("email"));

	assert_eq!(
		Dialect::sql_server().compile(&expression).unwrap().sql,
		"[email] = N'o''brien@example.com'"
	);
}

#[test]
fn test_unresolved_member_on_text() {
	let result = Dialect::sqlite().compile(&email().member("domain"));

	assert_eq!(
		result,
		Err(QueryError::UnresolvedMember {
			owner: "String".to_string(),
			member: "domain".to_string(),
		})
	);
}

#[test]
fn test_unresolved_static_member() {
	let result = Dialect::sqlite().compile(&Expression::static_member(TypeOwner::DateTime, "epoch"));

	assert!(matches!(result, Err(QueryError::UnresolvedMember { .. })));
}

#[test]
fn test_conflicting_parameter_values() {
	let expression = email()
		.eq(Expression::parameter("p", "a"))
		.or(email().eq(Expression::parameter("p", "b")));

	assert!(matches!(
		Dialect::sqlite().compile(&expression),
		Err(QueryError::InvalidExpression(_))
	));
}

#[test]
fn test_predicate_projection_on_sql_server() {
	let expression = email().starts_with("a").alias("is_a");

	assert_eq!(
		Dialect::sql_server().compile(&expression).unwrap().sql,
		"CASE WHEN [email] LIKE N'a%' ESCAPE N'\\' THEN CAST(1 AS bit) ELSE CAST(0 AS bit) END AS [is_a]"
	);
}
