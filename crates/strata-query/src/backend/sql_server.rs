//! SQL Server rules: `[..]` identifiers, `N'..'` strings, `0x..` binary and
//! seven-digit fractional seconds.

use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime};

use super::{DatabaseKind, SqlHelper, TypeMapper, fraction_7, hex};
use crate::error::Result;
use crate::value::ColumnType;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerSqlHelper;

impl SqlHelper for SqlServerSqlHelper {
	fn kind(&self) -> DatabaseKind {
		DatabaseKind::SqlServer
	}

	fn quote_chars(&self) -> (char, char) {
		('[', ']')
	}

	fn batch_terminator(&self) -> Option<&'static str> {
		Some("GO")
	}

	fn string_literal(&self, value: &str) -> String {
		format!("N'{}'", self.escape_string(value))
	}

	fn bytes_literal(&self, value: &[u8]) -> String {
		format!("0x{}", hex(value))
	}

	fn time_literal(&self, value: &NaiveTime) -> String {
		format!("'{}.{}'", value.format("%H:%M:%S"), fraction_7(value))
	}

	fn datetime_literal(&self, value: &NaiveDateTime) -> String {
		format!("'{}.{}'", value.format("%Y-%m-%dT%H:%M:%S"), fraction_7(value))
	}

	fn datetime_offset_literal(&self, value: &DateTime<FixedOffset>) -> String {
		format!(
			"'{}.{}{}'",
			value.format("%Y-%m-%dT%H:%M:%S"),
			fraction_7(value),
			value.format("%:z")
		)
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerTypeMapper;

impl TypeMapper for SqlServerTypeMapper {
	fn kind(&self) -> DatabaseKind {
		DatabaseKind::SqlServer
	}

	fn get_mapping(
		&self,
		column_type: &ColumnType,
		size: Option<usize>,
		row_version: bool,
		unicode: bool,
	) -> Result<String> {
		let sized = |base: &str, limit: usize| match size {
			Some(n) if n <= limit => format!("{}({})", base, n),
			_ => format!("{}(max)", base),
		};
		let mapping = match column_type {
			ColumnType::Bytes if row_version => "rowversion".to_string(),
			ColumnType::Bool => "bit".to_string(),
			ColumnType::TinyInt | ColumnType::SmallInt => "smallint".to_string(),
			ColumnType::TinyUnsigned => "tinyint".to_string(),
			ColumnType::Int | ColumnType::SmallUnsigned | ColumnType::Enum => "int".to_string(),
			ColumnType::BigInt | ColumnType::Unsigned => "bigint".to_string(),
			ColumnType::BigUnsigned => "decimal(20,0)".to_string(),
			ColumnType::Float => "real".to_string(),
			ColumnType::Double => "float".to_string(),
			ColumnType::Decimal => "decimal(18,2)".to_string(),
			ColumnType::Char if unicode => "nchar(1)".to_string(),
			ColumnType::Char => "char(1)".to_string(),
			ColumnType::String if unicode => sized("nvarchar", 4000),
			ColumnType::String => sized("varchar", 8000),
			ColumnType::Json => "nvarchar(max)".to_string(),
			ColumnType::Bytes => sized("varbinary", 8000),
			ColumnType::Date => "date".to_string(),
			ColumnType::Time => "time".to_string(),
			ColumnType::DateTime => "datetime2".to_string(),
			ColumnType::DateTimeOffset => "datetimeoffset".to_string(),
			ColumnType::Uuid => "uniqueidentifier".to_string(),
			ColumnType::Other(_) => return Err(self.unsupported(column_type)),
		};
		Ok(mapping)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::QueryError;
	use crate::value::Value;
	use chrono::NaiveDate;
	use rstest::rstest;

	#[rstest]
	#[case("users", "[users]")]
	#[case("we]ird", "[we]]ird]")]
	#[case("$pre:users", "[$pre:users]")]
	fn test_delimit_identifier(#[case] name: &str, #[case] expected: &str) {
		assert_eq!(SqlServerSqlHelper.delimit_identifier(name).unwrap(), expected);
	}

	#[test]
	fn test_delimit_identifier_twice_is_not_a_single_quoting() {
		let once = SqlServerSqlHelper.delimit_identifier("users").unwrap();
		let twice = SqlServerSqlHelper.delimit_identifier(&once).unwrap();

		assert_ne!(twice, once);
		assert_eq!(twice, "[[users]]]");
	}

	#[test]
	fn test_delimit_identifier_with_schema() {
		assert_eq!(
			SqlServerSqlHelper
				.delimit_identifier_with_schema("users", Some("dbo"))
				.unwrap(),
			"[dbo].[users]"
		);
	}

	#[rstest]
	#[case(Value::Null, "NULL")]
	#[case(Value::String("O'Brien".into()), "N'O''Brien'")]
	#[case(Value::Bool(true), "1")]
	#[case(Value::Bytes(vec![0xde, 0xad]), "0xDEAD")]
	#[case(Value::Int(-5), "-5")]
	#[case(Value::Double(1.5), "1.5")]
	#[case(Value::enumeration("Status", 3), "3")]
	fn test_escape_literal(#[case] value: Value, #[case] expected: &str) {
		assert_eq!(SqlServerSqlHelper.escape_literal(&value), expected);
	}

	#[test]
	fn test_escape_literal_datetime() {
		let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
			.unwrap()
			.and_hms_milli_opt(8, 5, 1, 123)
			.unwrap();
		assert_eq!(
			SqlServerSqlHelper.escape_literal(&Value::DateTime(dt)),
			"'2024-03-09T08:05:01.1230000'"
		);

		let offset = FixedOffset::east_opt(3600).unwrap();
		let with_offset = dt.and_local_timezone(offset).unwrap();
		assert_eq!(
			SqlServerSqlHelper.escape_literal(&Value::DateTimeOffset(with_offset)),
			"'2024-03-09T08:05:01.1230000+01:00'"
		);
	}

	#[rstest]
	#[case(ColumnType::String, Some(64), "nvarchar(64)")]
	#[case(ColumnType::String, None, "nvarchar(max)")]
	#[case(ColumnType::Bytes, None, "varbinary(max)")]
	#[case(ColumnType::Int, None, "int")]
	#[case(ColumnType::Uuid, None, "uniqueidentifier")]
	fn test_get_mapping(#[case] column_type: ColumnType, #[case] size: Option<usize>, #[case] expected: &str) {
		assert_eq!(
			SqlServerTypeMapper.get_mapping(&column_type, size, false, true).unwrap(),
			expected
		);
	}

	#[test]
	fn test_get_mapping_row_version() {
		assert_eq!(
			SqlServerTypeMapper
				.get_mapping(&ColumnType::Bytes, None, true, true)
				.unwrap(),
			"rowversion"
		);
	}

	#[test]
	fn test_get_mapping_unsupported() {
		let result = SqlServerTypeMapper.get_mapping(&ColumnType::Other("(i32, i32)".into()), None, false, true);

		assert!(matches!(result, Err(QueryError::UnsupportedColumnType { .. })));
	}
}
