//! MySQL rules: backtick identifiers, `?name` placeholders, backslash-aware
//! string literals and `TRUE`/`FALSE` booleans.

use super::{DatabaseKind, SqlHelper, TypeMapper};
use crate::error::Result;
use crate::value::ColumnType;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlSqlHelper;

impl SqlHelper for MySqlSqlHelper {
	fn kind(&self) -> DatabaseKind {
		DatabaseKind::MySql
	}

	fn quote_chars(&self) -> (char, char) {
		('`', '`')
	}

	fn parameter_prefix(&self) -> char {
		'?'
	}

	// backslash is an escape character inside MySQL string literals
	fn escape_string(&self, value: &str) -> String {
		value.replace('\\', "\\\\").replace('\'', "''")
	}

	fn bool_literal(&self, value: bool) -> String {
		let literal = if value { "TRUE" } else { "FALSE" };
		literal.to_string()
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlTypeMapper;

impl TypeMapper for MySqlTypeMapper {
	fn kind(&self) -> DatabaseKind {
		DatabaseKind::MySql
	}

	fn get_mapping(
		&self,
		column_type: &ColumnType,
		size: Option<usize>,
		row_version: bool,
		_unicode: bool,
	) -> Result<String> {
		let mapping = match column_type {
			ColumnType::Bytes if row_version => "timestamp(6)".to_string(),
			ColumnType::Bool => "tinyint(1)".to_string(),
			ColumnType::TinyInt => "tinyint".to_string(),
			ColumnType::SmallInt => "smallint".to_string(),
			ColumnType::Int | ColumnType::Enum => "int".to_string(),
			ColumnType::BigInt => "bigint".to_string(),
			ColumnType::TinyUnsigned => "tinyint unsigned".to_string(),
			ColumnType::SmallUnsigned => "smallint unsigned".to_string(),
			ColumnType::Unsigned => "int unsigned".to_string(),
			ColumnType::BigUnsigned => "bigint unsigned".to_string(),
			ColumnType::Float => "float".to_string(),
			ColumnType::Double => "double".to_string(),
			ColumnType::Decimal => "decimal(18,2)".to_string(),
			ColumnType::Char => "char(1)".to_string(),
			ColumnType::String => match size {
				Some(n) if n <= 16_383 => format!("varchar({})", n),
				_ => "longtext".to_string(),
			},
			ColumnType::Bytes => match size {
				Some(n) if n <= 65_535 => format!("varbinary({})", n),
				_ => "longblob".to_string(),
			},
			ColumnType::Date => "date".to_string(),
			ColumnType::Time => "time(6)".to_string(),
			ColumnType::DateTime | ColumnType::DateTimeOffset => "datetime(6)".to_string(),
			ColumnType::Uuid => "char(36)".to_string(),
			ColumnType::Json => "json".to_string(),
			ColumnType::Other(_) => return Err(self.unsupported(column_type)),
		};
		Ok(mapping)
	}
}
