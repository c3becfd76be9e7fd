//! SQLite rules: `".."` identifiers and storage-class column types.

use super::{DatabaseKind, SqlHelper, TypeMapper};
use crate::error::Result;
use crate::value::ColumnType;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteSqlHelper;

impl SqlHelper for SqliteSqlHelper {
	fn kind(&self) -> DatabaseKind {
		DatabaseKind::Sqlite
	}

	fn quote_chars(&self) -> (char, char) {
		('"', '"')
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTypeMapper;

impl TypeMapper for SqliteTypeMapper {
	fn kind(&self) -> DatabaseKind {
		DatabaseKind::Sqlite
	}

	fn get_mapping(
		&self,
		column_type: &ColumnType,
		_size: Option<usize>,
		_row_version: bool,
		_unicode: bool,
	) -> Result<String> {
		let mapping = match column_type {
			ColumnType::Bool
			| ColumnType::TinyInt
			| ColumnType::SmallInt
			| ColumnType::Int
			| ColumnType::BigInt
			| ColumnType::TinyUnsigned
			| ColumnType::SmallUnsigned
			| ColumnType::Unsigned
			| ColumnType::BigUnsigned
			| ColumnType::Enum => "INTEGER",
			ColumnType::Float | ColumnType::Double => "REAL",
			ColumnType::Bytes => "BLOB",
			ColumnType::Decimal
			| ColumnType::Char
			| ColumnType::String
			| ColumnType::Date
			| ColumnType::Time
			| ColumnType::DateTime
			| ColumnType::DateTimeOffset
			| ColumnType::Uuid
			| ColumnType::Json => "TEXT",
			ColumnType::Other(_) => return Err(self.unsupported(column_type)),
		};
		Ok(mapping.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::Value;
	use chrono::{NaiveDate, NaiveTime};
	use rstest::rstest;

	#[test]
	fn test_delimit_identifier() {
		assert_eq!(SqliteSqlHelper.delimit_identifier("a\"b").unwrap(), "\"a\"\"b\"");
	}

	#[test]
	fn test_parameterized() {
		assert_eq!(SqliteSqlHelper.parameterized("Id"), "@Id");
	}

	#[rstest]
	#[case(Value::Date(NaiveDate::from_ymd_opt(2020, 1, 31).unwrap()), "'2020-01-31'")]
	#[case(Value::Time(NaiveTime::from_hms_micro_opt(23, 59, 1, 5).unwrap()), "'23:59:01.000005'")]
	#[case(Value::Char('\''), "''''")]
	#[case(Value::Float(0.1), "0.1")]
	fn test_escape_literal(#[case] value: Value, #[case] expected: &str) {
		assert_eq!(SqliteSqlHelper.escape_literal(&value), expected);
	}

	#[test]
	fn test_get_mapping_unsupported() {
		assert!(
			SqliteTypeMapper
				.get_mapping(&ColumnType::Other("(i32, i32)".into()), None, false, true)
				.is_err()
		);
	}
}
