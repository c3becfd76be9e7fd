//! Expression compiler.
//!
//! An [`ExpressionVisitor`] lowers one expression tree into SQL text and an
//! ordered parameter list. Visitors are created per compilation by
//! [`Dialect::create_visitor`](crate::Dialect::create_visitor) and consumed by
//! [`finish`](ExpressionVisitor::finish); the trait's default methods hold the
//! shared lowering rules and the dialect visitors override the nodes whose
//! SQL differs.

use crate::backend::{CompiledSql, SqlWriter};
use crate::dialect::Dialect;
use crate::error::{QueryError, Result};
use crate::expr::{BinaryOp, DatePart, EntityRef, Expression, PropertyRef, TypeOwner, UnaryOp};
use crate::value::{ColumnType, Value};

mod mysql;
mod sql_server;
mod sqlite;

pub use mysql::MySqlExpressionVisitor;
pub use sql_server::SqlServerExpressionVisitor;
pub use sqlite::SqliteExpressionVisitor;

impl Expression {
	/// Dispatch to the visitor method for this node kind.
	pub fn accept<'d, V>(&self, visitor: &mut V) -> Result<()>
	where
		V: ExpressionVisitor<'d> + ?Sized,
	{
		match self {
			Expression::Entity(entity) => visitor.visit_entity(entity),
			Expression::Property(property) => visitor.visit_property(property),
			Expression::Member { object, member } => visitor.visit_member(self, object, member),
			Expression::StaticMember { owner, member } => visitor.visit_static_member(self, owner, member),
			Expression::Captured { name, .. } => Err(QueryError::InvalidExpression(format!(
				"captured value `{}` used without a member",
				name
			))),
			Expression::Constant(value) => visitor.visit_constant(value),
			Expression::Parameter { name, value } => visitor.visit_parameter(name, value),
			Expression::Binary { op, left, right } => visitor.visit_binary(*op, left, right),
			Expression::Unary { op, operand } => visitor.visit_unary(*op, operand),
			Expression::Call { .. } => visitor.visit_call(self),
			Expression::Like {
				target,
				pattern,
				escape,
			} => visitor.visit_like(target, pattern, *escape),
			Expression::Function { name, arguments } => visitor.visit_function(name, arguments),
			Expression::Fragment(sql) => visitor.visit_fragment(sql),
			Expression::DatePart { part, operand } => visitor.visit_date_part(*part, operand),
			Expression::Concat(parts) => visitor.visit_concat(parts),
			Expression::Position { needle, haystack } => visitor.visit_position(needle, haystack),
			Expression::Length(operand) => visitor.visit_length(operand),
			Expression::Cast {
				operand,
				column_type,
			} => visitor.visit_cast(operand, column_type),
			Expression::Alias { expression, alias } => visitor.visit_alias(expression, alias),
			Expression::List(items) => visitor.visit_list(items),
			Expression::Order {
				expression,
				descending,
			} => visitor.visit_order(expression, *descending),
		}
	}
}

fn describe_owner(object: &Expression) -> String {
	match object {
		Expression::Captured { name, .. } => name.clone(),
		other => other
			.column_type()
			.map_or_else(|| "expression".to_string(), |t| t.to_string()),
	}
}

/// Tree-walking SQL compiler for one statement fragment.
pub trait ExpressionVisitor<'d> {
	fn dialect(&self) -> &'d Dialect;

	fn writer(&mut self) -> &mut SqlWriter;

	fn into_writer(self: Box<Self>) -> SqlWriter;

	/// Consume the visitor
	fn finish(self: Box<Self>) -> CompiledSql {
		self.into_writer().finish()
	}

	fn push(&mut self, sql: &str) {
		self.writer().push(sql);
	}

	fn push_identifier(&mut self, identifier: &str) -> Result<()> {
		let quoted = self.dialect().helper().delimit_identifier(identifier)?;
		self.push(&quoted);
		Ok(())
	}

	/// Visit a node, giving fragment translators the first chance to rewrite it.
	fn visit(&mut self, expression: &Expression) -> Result<()> {
		if let Some(rewritten) = self.dialect().translators().translate_fragment(expression) {
			return self.visit(&rewritten);
		}
		expression.accept(self)
	}

	fn visit_separated(&mut self, items: &[Expression], separator: &str) -> Result<()> {
		for (index, item) in items.iter().enumerate() {
			if index > 0 {
				self.push(separator);
			}
			self.visit(item)?;
		}
		Ok(())
	}

	fn visit_entity(&mut self, entity: &EntityRef) -> Result<()> {
		if let Some(alias) = &entity.alias {
			self.push_identifier(alias)?;
			self.push(".");
		}
		self.push("*");
		Ok(())
	}

	fn visit_property(&mut self, property: &PropertyRef) -> Result<()> {
		let column = property.entity.property(&property.property)?.column().to_string();
		if let Some(alias) = &property.alias {
			self.push_identifier(alias)?;
			self.push(".");
		}
		self.push_identifier(&column)
	}

	fn visit_member(&mut self, expression: &Expression, object: &Expression, member: &str) -> Result<()> {
		if let Some(translated) = self.dialect().translators().translate_member(expression) {
			return self.visit(&translated);
		}
		match object {
			Expression::Entity(entity) => self.visit_property(&PropertyRef {
				entity: entity.entity.clone(),
				property: member.to_string(),
				alias: entity.alias.clone(),
			}),
			Expression::Captured { name, fields } => match fields.get(member) {
				Some(value) => self.visit_constant(value),
				None => Err(QueryError::UnresolvedMember {
					owner: name.clone(),
					member: member.to_string(),
				}),
			},
			_ => Err(QueryError::UnresolvedMember {
				owner: describe_owner(object),
				member: member.to_string(),
			}),
		}
	}

	fn visit_static_member(&mut self, expression: &Expression, owner: &TypeOwner, member: &str) -> Result<()> {
		match self.dialect().translators().translate_member(expression) {
			Some(translated) => self.visit(&translated),
			None => Err(QueryError::UnresolvedMember {
				owner: owner.to_string(),
				member: member.to_string(),
			}),
		}
	}

	fn visit_constant(&mut self, value: &Value) -> Result<()> {
		let literal = self.dialect().helper().escape_literal(value);
		self.push(&literal);
		Ok(())
	}

	fn visit_parameter(&mut self, name: &str, value: &Value) -> Result<()> {
		let helper = self.dialect().helper();
		self.writer().push_parameter(name, value, helper)
	}

	fn visit_binary(&mut self, op: BinaryOp, left: &Expression, right: &Expression) -> Result<()> {
		if matches!(op, BinaryOp::Equal | BinaryOp::NotEqual) && (left.is_null_constant() || right.is_null_constant()) {
			let operand = if left.is_null_constant() { right } else { left };
			self.visit(operand)?;
			self.push(if op == BinaryOp::Equal { " IS NULL" } else { " IS NOT NULL" });
			return Ok(());
		}
		if op == BinaryOp::Add
			&& (left.column_type().is_some_and(|t| t.is_text()) || right.column_type().is_some_and(|t| t.is_text()))
		{
			return self.visit_concat(&[left.clone(), right.clone()]);
		}
		let parenthesized = !op.is_comparison();
		if parenthesized {
			self.push("(");
		}
		self.visit(left)?;
		self.push(" ");
		self.push(op.as_sql());
		self.push(" ");
		self.visit(right)?;
		if parenthesized {
			self.push(")");
		}
		Ok(())
	}

	fn visit_unary(&mut self, op: UnaryOp, operand: &Expression) -> Result<()> {
		self.push(match op {
			UnaryOp::Not => "NOT (",
			UnaryOp::Negate => "-(",
		});
		self.visit(operand)?;
		self.push(")");
		Ok(())
	}

	fn visit_call(&mut self, expression: &Expression) -> Result<()> {
		if let Some(translated) = self.dialect().translators().translate_method(expression) {
			return self.visit(&translated);
		}
		let Expression::Call { method, arguments, .. } = expression else {
			return Err(QueryError::InvalidExpression("expected a method call".to_string()));
		};
		Err(QueryError::UnresolvedMethodCall {
			owner: method.owner.to_string(),
			method: method.name.clone(),
			arity: arguments.len(),
		})
	}

	fn visit_like(&mut self, target: &Expression, pattern: &Expression, escape: Option<char>) -> Result<()> {
		self.visit(target)?;
		self.push(" LIKE ");
		self.visit(pattern)?;
		if let Some(escape) = escape {
			let literal = self.dialect().helper().string_literal(&escape.to_string());
			self.push(" ESCAPE ");
			self.push(&literal);
		}
		Ok(())
	}

	/// Function call by name; `@@` names are system variables and take no
	/// argument list.
	fn visit_function(&mut self, name: &str, arguments: &[Expression]) -> Result<()> {
		if name.starts_with("@@") {
			self.push(name);
			return Ok(());
		}
		self.push(name);
		self.push("(");
		self.visit_separated(arguments, ", ")?;
		self.push(")");
		Ok(())
	}

	fn visit_fragment(&mut self, sql: &str) -> Result<()> {
		self.push(sql);
		Ok(())
	}

	fn visit_date_part(&mut self, part: DatePart, operand: &Expression) -> Result<()> {
		let field = match part {
			DatePart::Year => "YEAR",
			DatePart::Month => "MONTH",
			DatePart::Day => "DAY",
			DatePart::Hour => "HOUR",
			DatePart::Minute => "MINUTE",
			DatePart::Second => "SECOND",
			DatePart::Date => {
				return self.visit_cast(operand, &ColumnType::Date);
			}
			DatePart::TimeOfDay => {
				return self.visit_cast(operand, &ColumnType::Time);
			}
			DatePart::Millisecond | DatePart::DayOfYear | DatePart::DayOfWeek => {
				return Err(QueryError::UnresolvedMember {
					owner: "DateTime".to_string(),
					member: format!("{:?}", part),
				});
			}
		};
		self.push("EXTRACT(");
		self.push(field);
		self.push(" FROM ");
		self.visit(operand)?;
		self.push(")");
		Ok(())
	}

	fn visit_concat(&mut self, parts: &[Expression]) -> Result<()> {
		self.push("(");
		self.visit_separated(parts, " || ")?;
		self.push(")");
		Ok(())
	}

	fn visit_position(&mut self, needle: &Expression, haystack: &Expression) -> Result<()> {
		self.push("POSITION(");
		self.visit(needle)?;
		self.push(" IN ");
		self.visit(haystack)?;
		self.push(")");
		Ok(())
	}

	fn visit_length(&mut self, operand: &Expression) -> Result<()> {
		self.push("CHAR_LENGTH(");
		self.visit(operand)?;
		self.push(")");
		Ok(())
	}

	fn cast_target(&self, column_type: &ColumnType) -> Result<String> {
		self.dialect().type_mapper().get_mapping(column_type, None, false, true)
	}

	fn visit_cast(&mut self, operand: &Expression, column_type: &ColumnType) -> Result<()> {
		let target = self.cast_target(column_type)?;
		self.push("CAST(");
		self.visit(operand)?;
		self.push(" AS ");
		self.push(&target);
		self.push(")");
		Ok(())
	}

	fn visit_alias(&mut self, expression: &Expression, alias: &str) -> Result<()> {
		self.visit(expression)?;
		self.push(" AS ");
		self.push_identifier(alias)
	}

	fn visit_list(&mut self, items: &[Expression]) -> Result<()> {
		self.visit_separated(items, ", ")
	}

	fn visit_order(&mut self, expression: &Expression, descending: bool) -> Result<()> {
		self.visit(expression)?;
		self.push(if descending { " DESC" } else { " ASC" });
		Ok(())
	}
}
