//! Dialect rules: identifier quoting, literal formatting, placeholder syntax
//! and column type mapping.
//!
//! [`SqlHelper`] and [`TypeMapper`] carry the shared behaviour as default
//! methods; each engine gets a small struct that overrides only what differs:
//!
//! - [`SqlServerSqlHelper`] / [`SqlServerTypeMapper`]
//! - [`MySqlSqlHelper`] / [`MySqlTypeMapper`]
//! - [`SqliteSqlHelper`] / [`SqliteTypeMapper`]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{QueryError, Result};
use crate::value::{ColumnType, Value};

mod mysql;
mod sql_server;
mod sql_writer;
mod sqlite;

pub use mysql::{MySqlSqlHelper, MySqlTypeMapper};
pub use sql_server::{SqlServerSqlHelper, SqlServerTypeMapper};
pub use sql_writer::{CompiledSql, Parameter, SqlWriter};
pub use sqlite::{SqliteSqlHelper, SqliteTypeMapper};

/// Maximum identifier length accepted before quoting.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseKind {
	SqlServer,
	MySql,
	Sqlite,
}

impl DatabaseKind {
	pub fn name(&self) -> &'static str {
		match self {
			DatabaseKind::SqlServer => "SqlServer",
			DatabaseKind::MySql => "MySql",
			DatabaseKind::Sqlite => "Sqlite",
		}
	}
}

impl fmt::Display for DatabaseKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for DatabaseKind {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"sqlserver" | "mssql" => Ok(DatabaseKind::SqlServer),
			"mysql" => Ok(DatabaseKind::MySql),
			"sqlite" => Ok(DatabaseKind::Sqlite),
			_ => Err(format!("unknown database provider: {}", s)),
		}
	}
}

impl Serialize for DatabaseKind {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(self.name())
	}
}

impl<'de> Deserialize<'de> for DatabaseKind {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let name = String::deserialize(deserializer)?;
		name.parse().map_err(serde::de::Error::custom)
	}
}

/// Reject identifiers that must never reach the wire.
pub fn validate_identifier(name: &str) -> Result<()> {
	if name.is_empty() {
		return Err(QueryError::identifier(name, "identifier cannot be empty"));
	}
	if name.contains('\0') {
		return Err(QueryError::identifier(name, "identifier contains a null byte"));
	}
	if name.len() > MAX_IDENTIFIER_LENGTH {
		return Err(QueryError::identifier(
			name,
			format!(
				"identifier exceeds {} bytes (got {})",
				MAX_IDENTIFIER_LENGTH,
				name.len()
			),
		));
	}
	Ok(())
}

/// Per-dialect SQL text rules.
pub trait SqlHelper: Send + Sync + fmt::Debug {
	fn kind(&self) -> DatabaseKind;

	/// Opening and closing identifier quote characters.
	fn quote_chars(&self) -> (char, char);

	fn delimit_identifier(&self, name: &str) -> Result<String> {
		validate_identifier(name)?;
		let (open, close) = self.quote_chars();
		let mut quoted = String::with_capacity(name.len() + 2);
		quoted.push(open);
		for c in name.chars() {
			if c == close {
				quoted.push(close);
			}
			quoted.push(c);
		}
		quoted.push(close);
		Ok(quoted)
	}

	fn delimit_identifier_with_schema(&self, name: &str, schema: Option<&str>) -> Result<String> {
		match schema {
			Some(schema) => Ok(format!(
				"{}.{}",
				self.delimit_identifier(schema)?,
				self.delimit_identifier(name)?
			)),
			None => self.delimit_identifier(name),
		}
	}

	fn parameter_prefix(&self) -> char {
		'@'
	}

	/// Placeholder for a named parameter.
	fn parameterized(&self, name: &str) -> String {
		format!("{}{}", self.parameter_prefix(), name)
	}

	fn statement_terminator(&self) -> &'static str {
		";"
	}

	/// Separator between batches of a migration script, if the engine uses one.
	fn batch_terminator(&self) -> Option<&'static str> {
		None
	}

	/// Body of a string literal, without the surrounding quotes.
	fn escape_string(&self, value: &str) -> String {
		value.replace('\'', "''")
	}

	fn string_literal(&self, value: &str) -> String {
		format!("'{}'", self.escape_string(value))
	}

	fn bool_literal(&self, value: bool) -> String {
		let literal = if value { "1" } else { "0" };
		literal.to_string()
	}

	fn bytes_literal(&self, value: &[u8]) -> String {
		format!("X'{}'", hex(value))
	}

	fn date_literal(&self, value: &NaiveDate) -> String {
		format!("'{}'", value.format("%Y-%m-%d"))
	}

	fn time_literal(&self, value: &NaiveTime) -> String {
		format!("'{}'", value.format("%H:%M:%S%.6f"))
	}

	fn datetime_literal(&self, value: &NaiveDateTime) -> String {
		format!("'{}'", value.format("%Y-%m-%d %H:%M:%S%.6f"))
	}

	fn datetime_offset_literal(&self, value: &DateTime<FixedOffset>) -> String {
		format!("'{}'", value.format("%Y-%m-%d %H:%M:%S%.6f%:z"))
	}

	/// Render a value as a literal of this dialect.
	fn escape_literal(&self, value: &Value) -> String {
		match value {
			Value::Null => "NULL".to_string(),
			Value::Bool(v) => self.bool_literal(*v),
			Value::TinyInt(v) => v.to_string(),
			Value::SmallInt(v) => v.to_string(),
			Value::Int(v) => v.to_string(),
			Value::BigInt(v) => v.to_string(),
			Value::TinyUnsigned(v) => v.to_string(),
			Value::SmallUnsigned(v) => v.to_string(),
			Value::Unsigned(v) => v.to_string(),
			Value::BigUnsigned(v) => v.to_string(),
			Value::Float(v) if v.is_finite() => format!("{:?}", v),
			Value::Double(v) if v.is_finite() => format!("{:?}", v),
			Value::Float(_) | Value::Double(_) => "NULL".to_string(),
			Value::Decimal(v) => v.to_string(),
			Value::Enum { discriminant, .. } => discriminant.to_string(),
			Value::Char(c) => self.string_literal(&c.to_string()),
			Value::String(s) | Value::TypeName(s) => self.string_literal(s),
			Value::Json(json) => self.string_literal(&json.to_string()),
			Value::Bytes(bytes) => self.bytes_literal(bytes),
			Value::Date(d) => self.date_literal(d),
			Value::Time(t) => self.time_literal(t),
			Value::DateTime(dt) => self.datetime_literal(dt),
			Value::DateTimeOffset(dt) => self.datetime_offset_literal(dt),
			Value::Uuid(id) => self.string_literal(&id.hyphenated().to_string()),
		}
	}
}

/// Maps logical column types to column type strings.
pub trait TypeMapper: Send + Sync + fmt::Debug {
	fn kind(&self) -> DatabaseKind;

	/// Column type for `column_type`.
	///
	/// `size` is the declared maximum length for text and binary columns;
	/// `unicode` selects the national character variant where the engine has
	/// one.
	fn get_mapping(
		&self,
		column_type: &ColumnType,
		size: Option<usize>,
		row_version: bool,
		unicode: bool,
	) -> Result<String>;

	fn unsupported(&self, column_type: &ColumnType) -> QueryError {
		QueryError::UnsupportedColumnType {
			column_type: column_type.to_string(),
			dialect: self.kind().to_string(),
		}
	}
}

pub(crate) fn hex(bytes: &[u8]) -> String {
	use fmt::Write;

	let mut out = String::with_capacity(bytes.len() * 2);
	for b in bytes {
		let _ = write!(out, "{:02X}", b);
	}
	out
}

/// Seven-digit fractional seconds, as `datetime2` and `time` print them.
pub(crate) fn fraction_7(time: &impl Timelike) -> String {
	format!("{:07}", (time.nanosecond() % 1_000_000_000) / 100)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("SqlServer", DatabaseKind::SqlServer)]
	#[case("sqlserver", DatabaseKind::SqlServer)]
	#[case("MySql", DatabaseKind::MySql)]
	#[case("SQLITE", DatabaseKind::Sqlite)]
	fn test_database_kind_from_str(#[case] name: &str, #[case] expected: DatabaseKind) {
		assert_eq!(name.parse::<DatabaseKind>().unwrap(), expected);
	}

	#[test]
	fn test_database_kind_unknown() {
		assert!("oracle".parse::<DatabaseKind>().is_err());
	}

	#[rstest]
	#[case("")]
	#[case("bad\0name")]
	fn test_validate_identifier_rejects(#[case] name: &str) {
		assert!(matches!(
			validate_identifier(name),
			Err(QueryError::IdentifierValidation { .. })
		));
	}

	#[test]
	fn test_validate_identifier_length() {
		assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
		assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1)).is_err());
	}

	#[test]
	fn test_hex() {
		assert_eq!(hex(&[0x00, 0xab, 0x10]), "00AB10");
		assert_eq!(hex(&[]), "");
	}
}
