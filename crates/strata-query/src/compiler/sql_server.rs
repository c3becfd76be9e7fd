use crate::backend::SqlWriter;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::expr::{DatePart, Expression, UnaryOp};

use super::ExpressionVisitor;

/// T-SQL visitor.
#[derive(Debug)]
pub struct SqlServerExpressionVisitor<'d> {
	dialect: &'d Dialect,
	writer: SqlWriter,
}

impl<'d> SqlServerExpressionVisitor<'d> {
	pub fn new(dialect: &'d Dialect) -> Self {
		Self {
			dialect,
			writer: SqlWriter::new(),
		}
	}
}

// T-SQL has no boolean type, so a predicate cannot be projected directly
fn is_predicate(expression: &Expression) -> bool {
	match expression {
		Expression::Binary { op, .. } => op.is_comparison() || op.is_logical(),
		Expression::Unary { op: UnaryOp::Not, .. } | Expression::Like { .. } => true,
		_ => false,
	}
}

impl<'d> ExpressionVisitor<'d> for SqlServerExpressionVisitor<'d> {
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
		let datepart = match part {
			DatePart::Year => "year",
			DatePart::Month => "month",
			DatePart::Day => "day",
			DatePart::Hour => "hour",
			DatePart::Minute => "minute",
			DatePart::Second => "second",
			DatePart::Millisecond => "millisecond",
			DatePart::DayOfYear => "dayofyear",
			DatePart::DayOfWeek => {
				self.push("(DATEPART(weekday, ");
				self.visit(operand)?;
				self.push(") - 1)");
				return Ok(());
			}
			DatePart::Date | DatePart::TimeOfDay => {
				self.push(if part == DatePart::Date {
					"CONVERT(date, "
				} else {
					"CONVERT(time, "
				});
				self.visit(operand)?;
				self.push(")");
				return Ok(());
			}
		};
		self.push("DATEPART(");
		self.push(datepart);
		self.push(", ");
		self.visit(operand)?;
		self.push(")");
		Ok(())
	}

	fn visit_concat(&mut self, parts: &[Expression]) -> Result<()> {
		self.push("(");
		self.visit_separated(parts, " + ")?;
		self.push(")");
		Ok(())
	}

	fn visit_position(&mut self, needle: &Expression, haystack: &Expression) -> Result<()> {
		self.push("CHARINDEX(");
		self.visit(needle)?;
		self.push(", ");
		self.visit(haystack)?;
		self.push(")");
		Ok(())
	}

	fn visit_length(&mut self, operand: &Expression) -> Result<()> {
		self.push("LEN(");
		self.visit(operand)?;
		self.push(")");
		Ok(())
	}

	fn visit_alias(&mut self, expression: &Expression, alias: &str) -> Result<()> {
		// calls such as `starts_with` only reveal a predicate once translated
		let translated = match expression {
			Expression::Call { .. } => self.dialect.translators().translate_method(expression),
			_ => None,
		};
		let operand = translated.as_ref().unwrap_or(expression);
		if is_predicate(operand) {
			self.push("CASE WHEN ");
			self.visit(operand)?;
			self.push(" THEN CAST(1 AS bit) ELSE CAST(0 AS bit) END");
		} else {
			self.visit(operand)?;
		}
		self.push(" AS ");
		self.push_identifier(alias)
	}
}
