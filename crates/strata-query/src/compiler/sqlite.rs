use crate::backend::SqlWriter;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::expr::{DatePart, Expression};

use super::ExpressionVisitor;

/// SQLite visitor.
#[derive(Debug)]
pub struct SqliteExpressionVisitor<'d> {
	dialect: &'d Dialect,
	writer: SqlWriter,
}

impl<'d> SqliteExpressionVisitor<'d> {
	pub fn new(dialect: &'d Dialect) -> Self {
		Self {
			dialect,
			writer: SqlWriter::new(),
		}
	}
}

impl<'d> ExpressionVisitor<'d> for SqliteExpressionVisitor<'d> {
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
			DatePart::Minute => "%M",
			DatePart::Second => "%S",
			DatePart::DayOfYear => "%j",
			DatePart::DayOfWeek => "%w",
			// %f is SS.SSS
			DatePart::Millisecond => {
				self.push("(CAST(strftime('%f', ");
				self.visit(operand)?;
				self.push(") * 1000 AS INTEGER) % 1000)");
				return Ok(());
			}
			DatePart::Date | DatePart::TimeOfDay => {
				self.push(if part == DatePart::Date { "date(" } else { "time(" });
				self.visit(operand)?;
				self.push(")");
				return Ok(());
			}
		};
		self.push("CAST(strftime('");
		self.push(format);
		self.push("', ");
		self.visit(operand)?;
		self.push(") AS INTEGER)");
		Ok(())
	}

	fn visit_position(&mut self, needle: &Expression, haystack: &Expression) -> Result<()> {
		self.push("INSTR(");
		self.visit(haystack)?;
		self.push(", ");
		self.visit(needle)?;
		self.push(")");
		Ok(())
	}

	fn visit_length(&mut self, operand: &Expression) -> Result<()> {
		self.push("LENGTH(");
		self.visit(operand)?;
		self.push(")");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::expr::TypeOwner;
	use rstest::rstest;

	fn compile(expression: &Expression) -> String {
		Dialect::sqlite().compile(expression).unwrap().sql
	}

	#[rstest]
	#[case(DatePart::Year, "CAST(strftime('%Y', d) AS INTEGER)")]
	#[case(DatePart::Millisecond, "(CAST(strftime('%f', d) * 1000 AS INTEGER) % 1000)")]
	#[case(DatePart::Date, "date(d)")]
	fn test_date_part(#[case] part: DatePart, #[case] expected: &str) {
		let expression = Expression::DatePart {
			part,
			operand: Box::new(Expression::fragment("d")),
		};

		assert_eq!(compile(&expression), expected);
	}

	#[test]
	fn test_today() {
		let expression = Expression::static_member(TypeOwner::DateTime, "today");

		assert_eq!(compile(&expression), "date('now')");
	}

	#[test]
	fn test_negate() {
		let expression = Expression::Unary {
			op: crate::expr::UnaryOp::Negate,
			operand: Box::new(Expression::fragment("x")),
		};

		assert_eq!(compile(&expression), "-(x)");
	}
}
