use crate::expr::{Expression, Method, TypeOwner};
use crate::value::ColumnType;

use super::{FunctionTranslator, Rule, TranslatorRegistry, match_call};

fn convert_target(method: &str) -> Option<ColumnType> {
	let column_type = match method {
		"to_bool" => ColumnType::Bool,
		"to_i16" => ColumnType::SmallInt,
		"to_i32" => ColumnType::Int,
		"to_i64" => ColumnType::BigInt,
		"to_f32" => ColumnType::Float,
		"to_f64" => ColumnType::Double,
		"to_decimal" => ColumnType::Decimal,
		"to_string" => ColumnType::String,
		"to_date" => ColumnType::Date,
		"to_datetime" => ColumnType::DateTime,
		"to_uuid" => ColumnType::Uuid,
		_ => return None,
	};
	Some(column_type)
}

/// `Convert::to_i32(x)` and friends -> `Cast`.
pub fn translate_convert(expression: &Expression) -> Option<Expression> {
	let Expression::Call {
		object: None,
		method,
		arguments,
	} = expression
	else {
		return None;
	};
	if method.owner != TypeOwner::Convert {
		return None;
	}
	let [operand] = arguments.as_slice() else {
		return None;
	};
	Some(Expression::Cast {
		operand: Box::new(operand.clone()),
		column_type: convert_target(&method.name)?,
	})
}

/// `a.equals(b)` on any owner -> `a = b`.
pub fn translate_equals(expression: &Expression) -> Option<Expression> {
	match expression {
		Expression::Call {
			object: Some(left),
			method,
			arguments,
		} if method.name == "equals" && arguments.len() == 1 => {
			Some(left.as_ref().clone().eq(arguments[0].clone()))
		}
		_ => None,
	}
}

fn sqlite_new_uuid(expression: &Expression) -> Option<Expression> {
	let (None, []) = match_call(expression, &TypeOwner::Uuid, "new_v4")? else {
		return None;
	};
	let random = Expression::function("randomblob", vec![Expression::constant(16i32)]);
	Some(Expression::function(
		"lower",
		vec![Expression::function("hex", vec![random])],
	))
}

pub(super) fn sql_server(registry: TranslatorRegistry) -> TranslatorRegistry {
	registry.with_method(FunctionTranslator::new(
		Method::new(TypeOwner::Uuid, "new_v4"),
		"NEWID",
	))
}

pub(super) fn mysql(registry: TranslatorRegistry) -> TranslatorRegistry {
	registry.with_method(FunctionTranslator::new(
		Method::new(TypeOwner::Uuid, "new_v4"),
		"UUID",
	))
}

pub(super) fn sqlite(registry: TranslatorRegistry) -> TranslatorRegistry {
	registry.with_method(Rule::new("new_uuid", sqlite_new_uuid))
}
