use crate::backend::SqlWriter;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::expr::{DatePart, Expression};
use crate::value::ColumnType;

use super::ExpressionVisitor;

/// MySQL visitor.
#[derive(Debug)]
pub struct MySqlExpressionVisitor<'d> {
	dialect: &'d Dialect,
	writer: SqlWriter,
}

impl<'d> MySqlExpressionVisitor<'d> {
	pub fn new(dialect: &'d Dialect) -> Self {
		Self {
			dialect,
			writer: SqlWriter::new(),
		}
	}
}

impl<'d> ExpressionVisitor<'d> for MySqlExpressionVisitor<'d> {
	fn dialect(&self) -> &'d Dialect {
		self.dialect
	}

	fn writer(&mut self) -> &mut SqlWriter {
		&mut self.writer
	}

	fn into_writer(self: Box<Self>) -> SqlWriter {
		self.writer
	}

	fn visit_date_part(&mut self, part: DatePart, operand: &Expression) -> Result<()> {
		let format = match part {
			DatePart::Year => "%Y",
			DatePart::Month => "%m",
			DatePart::Day => "%d",
			DatePart::Hour => "%H",
			DatePart::Minute => "%i",
			DatePart::Second => "%s",
			DatePart::DayOfYear => "%j",
			DatePart::DayOfWeek => "%w",
			DatePart::Millisecond => {
				self.push("FLOOR(CAST(DATE_FORMAT(");
				self.visit(operand)?;
				self.push(", '%f') AS SIGNED) / 1000)");
				return Ok(());
			}
			DatePart::Date | DatePart::TimeOfDay => {
				self.push(if part == DatePart::Date { "DATE(" } else { "TIME(" });
				self.visit(operand)?;
				self.push(")");
				return Ok(());
			}
		};
		self.push("CAST(DATE_FORMAT(");
		self.visit(operand)?;
		self.push(", '");
		self.push(format);
		self.push("') AS SIGNED)");
		Ok(())
	}

	fn visit_concat(&mut self, parts: &[Expression]) -> Result<()> {
		self.push("CONCAT(");
		self.visit_separated(parts, ", ")?;
		self.push(")");
		Ok(())
	}

	fn visit_position(&mut self, needle: &Expression, haystack: &Expression) -> Result<()> {
		self.push("LOCATE(");
		self.visit(needle)?;
		self.push(", ");
		self.visit(haystack)?;
		self.push(")");
		Ok(())
	}

	/// `CAST` accepts a narrower set of targets than column definitions do.
	fn cast_target(&self, column_type: &ColumnType) -> Result<String> {
		let target = match column_type {
			ColumnType::Bool
			| ColumnType::TinyInt
			| ColumnType::SmallInt
			| ColumnType::Int
			| ColumnType::BigInt
			| ColumnType::Enum => "SIGNED",
			ColumnType::TinyUnsigned
			| ColumnType::SmallUnsigned
			| ColumnType::Unsigned
			| ColumnType::BigUnsigned => "UNSIGNED",
			ColumnType::Char | ColumnType::String => "CHAR",
			ColumnType::Decimal => "DECIMAL(18, 2)",
			ColumnType::Float | ColumnType::Double => "DOUBLE",
			ColumnType::Date => "DATE",
			ColumnType::DateTime | ColumnType::DateTimeOffset => "DATETIME(6)",
			ColumnType::Time => "TIME(6)",
			ColumnType::Bytes => "BINARY",
			ColumnType::Json => "JSON",
			ColumnType::Uuid => "CHAR(36)",
			ColumnType::Other(_) => return Err(self.dialect.type_mapper().unsupported(column_type)),
		};
		Ok(target.to_string())
	}
}
