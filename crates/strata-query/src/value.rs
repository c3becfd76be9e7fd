//! Dynamically typed SQL values and logical column types.
//!
//! [`Value`] is what the compiler embeds as a literal or binds as a
//! parameter; [`ColumnType`] is the logical type a dialect's
//! [`TypeMapper`](crate::backend::TypeMapper) turns into a column type string.
//! Rust field types advertise their column type through [`SqlType`] and are
//! read back through [`FromValue`].

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{QueryError, Result};

/// A single SQL value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	/// SQL `NULL`
	Null,
	Bool(bool),
	TinyInt(i8),
	SmallInt(i16),
	Int(i32),
	BigInt(i64),
	TinyUnsigned(u8),
	SmallUnsigned(u16),
	Unsigned(u32),
	BigUnsigned(u64),
	Float(f32),
	Double(f64),
	Decimal(Decimal),
	Char(char),
	String(String),
	Bytes(Vec<u8>),
	Date(NaiveDate),
	Time(NaiveTime),
	DateTime(NaiveDateTime),
	/// Date and time with an explicit UTC offset
	DateTimeOffset(DateTime<FixedOffset>),
	Uuid(Uuid),
	/// Enumeration stored as its discriminant
	Enum { type_name: String, discriminant: i64 },
	/// A type name stored as text
	TypeName(String),
	Json(serde_json::Value),
}

impl Value {
	/// Check if the value is `NULL`
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Logical column type of this value, `None` for `NULL`.
	pub fn column_type(&self) -> Option<ColumnType> {
		let column_type = match self {
			Value::Null => return None,
			Value::Bool(_) => ColumnType::Bool,
			Value::TinyInt(_) => ColumnType::TinyInt,
			Value::SmallInt(_) => ColumnType::SmallInt,
			Value::Int(_) => ColumnType::Int,
			Value::BigInt(_) => ColumnType::BigInt,
			Value::TinyUnsigned(_) => ColumnType::TinyUnsigned,
			Value::SmallUnsigned(_) => ColumnType::SmallUnsigned,
			Value::Unsigned(_) => ColumnType::Unsigned,
			Value::BigUnsigned(_) => ColumnType::BigUnsigned,
			Value::Float(_) => ColumnType::Float,
			Value::Double(_) => ColumnType::Double,
			Value::Decimal(_) => ColumnType::Decimal,
			Value::Char(_) => ColumnType::Char,
			Value::String(_) | Value::TypeName(_) => ColumnType::String,
			Value::Bytes(_) => ColumnType::Bytes,
			Value::Date(_) => ColumnType::Date,
			Value::Time(_) => ColumnType::Time,
			Value::DateTime(_) => ColumnType::DateTime,
			Value::DateTimeOffset(_) => ColumnType::DateTimeOffset,
			Value::Uuid(_) => ColumnType::Uuid,
			Value::Enum { .. } => ColumnType::Enum,
			Value::Json(_) => ColumnType::Json,
		};
		Some(column_type)
	}

	/// Integer view of the value, if it holds any integer kind.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Bool(v) => Some(i64::from(*v)),
			Value::TinyInt(v) => Some(i64::from(*v)),
			Value::SmallInt(v) => Some(i64::from(*v)),
			Value::Int(v) => Some(i64::from(*v)),
			Value::BigInt(v) => Some(*v),
			Value::TinyUnsigned(v) => Some(i64::from(*v)),
			Value::SmallUnsigned(v) => Some(i64::from(*v)),
			Value::Unsigned(v) => Some(i64::from(*v)),
			Value::BigUnsigned(v) => i64::try_from(*v).ok(),
			Value::Enum { discriminant, .. } => Some(*discriminant),
			_ => None,
		}
	}

	/// Text view of the value, if it holds a string kind.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) | Value::TypeName(s) => Some(s),
			_ => None,
		}
	}

	/// Build an enum value from its type name and discriminant.
	pub fn enumeration(type_name: impl Into<String>, discriminant: i64) -> Self {
		Value::Enum {
			type_name: type_name.into(),
			discriminant,
		}
	}

	fn kind(&self) -> &'static str {
		match self {
			Value::Null => "NULL",
			Value::Bool(_) => "bool",
			Value::TinyInt(_)
			| Value::SmallInt(_)
			| Value::Int(_)
			| Value::BigInt(_)
			| Value::TinyUnsigned(_)
			| Value::SmallUnsigned(_)
			| Value::Unsigned(_)
			| Value::BigUnsigned(_) => "integer",
			Value::Float(_) | Value::Double(_) => "float",
			Value::Decimal(_) => "decimal",
			Value::Char(_) => "char",
			Value::String(_) => "string",
			Value::Bytes(_) => "bytes",
			Value::Date(_) => "date",
			Value::Time(_) => "time",
			Value::DateTime(_) => "datetime",
			Value::DateTimeOffset(_) => "datetimeoffset",
			Value::Uuid(_) => "uuid",
			Value::Enum { .. } => "enum",
			Value::TypeName(_) => "type name",
			Value::Json(_) => "json",
		}
	}
}

/// Logical column type, independent of any dialect.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
	Bool,
	TinyInt,
	SmallInt,
	Int,
	BigInt,
	TinyUnsigned,
	SmallUnsigned,
	Unsigned,
	BigUnsigned,
	Float,
	Double,
	Decimal,
	Char,
	String,
	Bytes,
	Date,
	Time,
	DateTime,
	DateTimeOffset,
	Uuid,
	Enum,
	Json,
	/// A Rust type with no relational counterpart, e.g. a tuple
	Other(String),
}

impl ColumnType {
	/// Whether the type is any integer kind
	pub fn is_integer(&self) -> bool {
		matches!(
			self,
			ColumnType::TinyInt
				| ColumnType::SmallInt
				| ColumnType::Int
				| ColumnType::BigInt
				| ColumnType::TinyUnsigned
				| ColumnType::SmallUnsigned
				| ColumnType::Unsigned
				| ColumnType::BigUnsigned
				| ColumnType::Enum
		)
	}

	/// Whether the type is text
	pub fn is_text(&self) -> bool {
		matches!(self, ColumnType::String | ColumnType::Char)
	}

	/// Whether the type carries a date or time component
	pub fn is_temporal(&self) -> bool {
		matches!(
			self,
			ColumnType::Date | ColumnType::Time | ColumnType::DateTime | ColumnType::DateTimeOffset
		)
	}
}

impl fmt::Display for ColumnType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ColumnType::Other(name) => f.write_str(name),
			other => write!(f, "{:?}", other),
		}
	}
}

/// Rust types that map onto a column.
///
/// `Option<T>` maps to the same column type as `T` and is nullable.
pub trait SqlType {
	fn column_type() -> ColumnType;

	fn is_nullable() -> bool {
		false
	}
}

impl<T: SqlType> SqlType for Option<T> {
	fn column_type() -> ColumnType {
		T::column_type()
	}

	fn is_nullable() -> bool {
		true
	}
}

macro_rules! impl_sql_type {
	($($ty:ty => $column:ident),* $(,)?) => {
		$(
			impl SqlType for $ty {
				fn column_type() -> ColumnType {
					ColumnType::$column
				}
			}
		)*
	};
}

impl_sql_type! {
	bool => Bool,
	i8 => TinyInt,
	i16 => SmallInt,
	i32 => Int,
	i64 => BigInt,
	u8 => TinyUnsigned,
	u16 => SmallUnsigned,
	u32 => Unsigned,
	u64 => BigUnsigned,
	f32 => Float,
	f64 => Double,
	Decimal => Decimal,
	char => Char,
	String => String,
	Vec<u8> => Bytes,
	NaiveDate => Date,
	NaiveTime => Time,
	NaiveDateTime => DateTime,
	DateTime<FixedOffset> => DateTimeOffset,
	Uuid => Uuid,
	serde_json::Value => Json,
}

macro_rules! impl_from_for_value {
	($($ty:ty => $variant:ident),* $(,)?) => {
		$(
			impl From<$ty> for Value {
				fn from(value: $ty) -> Self {
					Value::$variant(value)
				}
			}
		)*
	};
}

impl_from_for_value! {
	bool => Bool,
	i8 => TinyInt,
	i16 => SmallInt,
	i32 => Int,
	i64 => BigInt,
	u8 => TinyUnsigned,
	u16 => SmallUnsigned,
	u32 => Unsigned,
	u64 => BigUnsigned,
	f32 => Float,
	f64 => Double,
	Decimal => Decimal,
	char => Char,
	String => String,
	Vec<u8> => Bytes,
	NaiveDate => Date,
	NaiveTime => Time,
	NaiveDateTime => DateTime,
	DateTime<FixedOffset> => DateTimeOffset,
	Uuid => Uuid,
	serde_json::Value => Json,
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::String(value.to_string())
	}
}

impl From<&[u8]> for Value {
	fn from(value: &[u8]) -> Self {
		Value::Bytes(value.to_vec())
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

/// Conversion from a [`Value`] read back from the database.
///
/// Conversions are lenient about the storage representation: an `i32` field
/// accepts any integer value in range, and date/time fields accept the text
/// forms engines without native temporal types return.
pub trait FromValue: Sized {
	fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: &str, value: &Value) -> Result<T> {
	Err(QueryError::InvalidExpression(format!(
		"cannot convert {} value to {}",
		value.kind(),
		expected
	)))
}

macro_rules! impl_from_value_integer {
	($($ty:ty),* $(,)?) => {
		$(
			impl FromValue for $ty {
				fn from_value(value: Value) -> Result<Self> {
					if let Value::BigUnsigned(v) = value {
						return <$ty>::try_from(v)
							.or_else(|_| mismatch(stringify!($ty), &value));
					}
					match value.as_i64() {
						Some(v) => <$ty>::try_from(v).or_else(|_| mismatch(stringify!($ty), &value)),
						None => mismatch(stringify!($ty), &value),
					}
				}
			}
		)*
	};
}

impl_from_value_integer!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for bool {
	fn from_value(value: Value) -> Result<Self> {
		match value.as_i64() {
			Some(v) => Ok(v != 0),
			None => mismatch("bool", &value),
		}
	}
}

impl FromValue for f64 {
	fn from_value(value: Value) -> Result<Self> {
		match value {
			Value::Double(v) => Ok(v),
			Value::Float(v) => Ok(f64::from(v)),
			Value::Decimal(v) => v.to_string().parse().or_else(|_| mismatch("f64", &value)),
			other => match other.as_i64() {
				Some(v) => Ok(v as f64),
				None => mismatch("f64", &other),
			},
		}
	}
}

impl FromValue for f32 {
	fn from_value(value: Value) -> Result<Self> {
		match value {
			Value::Float(v) => Ok(v),
			other => f64::from_value(other).map(|v| v as f32),
		}
	}
}

impl FromValue for Decimal {
	fn from_value(value: Value) -> Result<Self> {
		match &value {
			Value::Decimal(v) => Ok(*v),
			Value::String(s) => s.parse().or_else(|_| mismatch("decimal", &value)),
			Value::Double(v) => Decimal::try_from(*v).or_else(|_| mismatch("decimal", &value)),
			other => match other.as_i64() {
				Some(v) => Ok(Decimal::from(v)),
				None => mismatch("decimal", other),
			},
		}
	}
}

impl FromValue for char {
	fn from_value(value: Value) -> Result<Self> {
		match &value {
			Value::Char(c) => Ok(*c),
			Value::String(s) => {
				let mut chars = s.chars();
				match (chars.next(), chars.next()) {
					(Some(c), None) => Ok(c),
					_ => mismatch("char", &value),
				}
			}
			_ => mismatch("char", &value),
		}
	}
}

impl FromValue for String {
	fn from_value(value: Value) -> Result<Self> {
		match value {
			Value::String(s) | Value::TypeName(s) => Ok(s),
			Value::Char(c) => Ok(c.to_string()),
			Value::Json(json) => Ok(json.to_string()),
			other => mismatch("string", &other),
		}
	}
}

impl FromValue for Vec<u8> {
	fn from_value(value: Value) -> Result<Self> {
		match value {
			Value::Bytes(bytes) => Ok(bytes),
			other => mismatch("bytes", &other),
		}
	}
}

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"];

impl FromValue for NaiveDate {
	fn from_value(value: Value) -> Result<Self> {
		match &value {
			Value::Date(d) => Ok(*d),
			Value::DateTime(dt) => Ok(dt.date()),
			Value::String(s) => {
				NaiveDate::parse_from_str(s, "%Y-%m-%d").or_else(|_| mismatch("date", &value))
			}
			_ => mismatch("date", &value),
		}
	}
}

impl FromValue for NaiveTime {
	fn from_value(value: Value) -> Result<Self> {
		match &value {
			Value::Time(t) => Ok(*t),
			Value::String(s) => {
				NaiveTime::parse_from_str(s, "%H:%M:%S%.f").or_else(|_| mismatch("time", &value))
			}
			_ => mismatch("time", &value),
		}
	}
}

impl FromValue for NaiveDateTime {
	fn from_value(value: Value) -> Result<Self> {
		match &value {
			Value::DateTime(dt) => Ok(*dt),
			Value::DateTimeOffset(dt) => Ok(dt.naive_local()),
			Value::String(s) => DATE_TIME_FORMATS
				.iter()
				.find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
				.map_or_else(|| mismatch("datetime", &value), Ok),
			_ => mismatch("datetime", &value),
		}
	}
}

impl FromValue for DateTime<FixedOffset> {
	fn from_value(value: Value) -> Result<Self> {
		match &value {
			Value::DateTimeOffset(dt) => Ok(*dt),
			Value::String(s) => OFFSET_FORMATS
				.iter()
				.find_map(|format| DateTime::parse_from_str(s, format).ok())
				.map_or_else(|| mismatch("datetimeoffset", &value), Ok),
			_ => mismatch("datetimeoffset", &value),
		}
	}
}

impl FromValue for Uuid {
	fn from_value(value: Value) -> Result<Self> {
		match &value {
			Value::Uuid(id) => Ok(*id),
			Value::String(s) => Uuid::parse_str(s).or_else(|_| mismatch("uuid", &value)),
			Value::Bytes(bytes) => Uuid::from_slice(bytes).or_else(|_| mismatch("uuid", &value)),
			_ => mismatch("uuid", &value),
		}
	}
}

impl FromValue for serde_json::Value {
	fn from_value(value: Value) -> Result<Self> {
		match value {
			Value::Json(json) => Ok(json),
			Value::String(s) => serde_json::from_str(&s)
				.map_err(|e| QueryError::InvalidExpression(format!("invalid json: {}", e))),
			other => mismatch("json", &other),
		}
	}
}

impl<T: FromValue> FromValue for Option<T> {
	fn from_value(value: Value) -> Result<Self> {
		if value.is_null() {
			Ok(None)
		} else {
			T::from_value(value).map(Some)
		}
	}
}

impl FromValue for Value {
	fn from_value(value: Value) -> Result<Self> {
		Ok(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Value::TinyInt(7))]
	#[case(Value::BigInt(7))]
	#[case(Value::Unsigned(7))]
	#[case(Value::BigUnsigned(7))]
	fn test_integer_conversion_accepts_any_width(#[case] value: Value) {
		assert_eq!(i32::from_value(value).unwrap(), 7);
	}

	#[test]
	fn test_integer_conversion_rejects_out_of_range() {
		assert!(i8::from_value(Value::BigInt(1_000)).is_err());
	}

	#[test]
	fn test_option_maps_null_to_none() {
		assert_eq!(Option::<String>::from_value(Value::Null).unwrap(), None);
		assert_eq!(Value::from(None::<i32>), Value::Null);
		assert_eq!(Value::from(Some(3i32)), Value::Int(3));
	}

	#[test]
	fn test_datetime_from_text() {
		let parsed = NaiveDateTime::from_value(Value::String("2024-02-29 13:45:10.250".into())).unwrap();
		assert_eq!(parsed.to_string(), "2024-02-29 13:45:10.250");
	}

	#[test]
	fn test_sql_type_for_option() {
		assert_eq!(<Option<i64> as SqlType>::column_type(), ColumnType::BigInt);
		assert!(<Option<i64> as SqlType>::is_nullable());
		assert!(!<i64 as SqlType>::is_nullable());
	}
}
