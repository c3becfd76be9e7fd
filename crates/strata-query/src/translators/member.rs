use crate::expr::{DatePart, Expression, TypeOwner};
use crate::value::Value;

use super::{MemberTranslator, TranslatorRegistry};

/// `value.year`, `value.date`, ... on a temporal value -> `DatePart`.
pub fn translate_date_member(expression: &Expression) -> Option<Expression> {
	let Expression::Member { object, member } = expression else {
		return None;
	};
	let part = DatePart::from_member(member)?;
	if !object.column_type()?.is_temporal() {
		return None;
	}
	Some(Expression::DatePart {
		part,
		operand: object.clone(),
	})
}

/// `text.length` -> `Length`.
pub fn translate_string_length(expression: &Expression) -> Option<Expression> {
	match expression {
		Expression::Member { object, member }
			if member == "length" && object.column_type().is_some_and(|t| t.is_text()) =>
		{
			Some(Expression::Length(object.clone()))
		}
		_ => None,
	}
}

/// `DateTime::now`, `DateTime::utc_now` and `DateTime::today`.
#[derive(Debug, Clone)]
pub struct DateTimeNowTranslator {
	now: Expression,
	utc_now: Expression,
	today: Expression,
}

impl DateTimeNowTranslator {
	pub fn new(now: Expression, utc_now: Expression, today: Expression) -> Self {
		Self { now, utc_now, today }
	}
}

impl MemberTranslator for DateTimeNowTranslator {
	fn translate(&self, expression: &Expression) -> Option<Expression> {
		let Expression::StaticMember {
			owner: TypeOwner::DateTime,
			member,
		} = expression
		else {
			return None;
		};
		match member.as_str() {
			"now" => Some(self.now.clone()),
			"utc_now" => Some(self.utc_now.clone()),
			"today" => Some(self.today.clone()),
			_ => None,
		}
	}
}

fn call(name: &str) -> Expression {
	Expression::function(name, Vec::new())
}

pub(super) fn sql_server(registry: TranslatorRegistry) -> TranslatorRegistry {
	registry.with_member(DateTimeNowTranslator::new(
		call("GETDATE"),
		call("GETUTCDATE"),
		Expression::function("CONVERT", vec![Expression::fragment("date"), call("GETDATE")]),
	))
}

pub(super) fn mysql(registry: TranslatorRegistry) -> TranslatorRegistry {
	registry.with_member(DateTimeNowTranslator::new(
		Expression::function("NOW", vec![Expression::constant(6i32)]),
		Expression::function("UTC_TIMESTAMP", vec![Expression::constant(6i32)]),
		call("CURDATE"),
	))
}

pub(super) fn sqlite(registry: TranslatorRegistry) -> TranslatorRegistry {
	let now = Expression::Constant(Value::from("now"));
	registry.with_member(DateTimeNowTranslator::new(
		Expression::function("datetime", vec![now.clone(), Expression::constant("localtime")]),
		Expression::function("datetime", vec![now.clone()]),
		Expression::function("date", vec![now]),
	))
}
