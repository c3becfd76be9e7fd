use crate::expr::{Expression, Method, TypeOwner};
use crate::value::ColumnType;

use super::{MethodCallTranslator, Rule, TranslatorRegistry, match_call};

/// Maps a method call onto a SQL function taking the receiver (if any)
/// followed by the call arguments and any fixed trailing arguments.
#[derive(Debug, Clone)]
pub struct FunctionTranslator {
	method: Method,
	function: &'static str,
	arity: Option<usize>,
	trailing: Vec<Expression>,
}

impl FunctionTranslator {
	pub fn new(method: Method, function: &'static str) -> Self {
		Self {
			method,
			function,
			arity: None,
			trailing: Vec::new(),
		}
	}

	pub fn string(method: &str, function: &'static str) -> Self {
		Self::new(Method::string(method), function)
	}

	pub fn math(method: &str, function: &'static str) -> Self {
		Self::new(Method::math(method), function)
	}

	/// Only match calls with exactly `arity` arguments.
	pub fn arity(mut self, arity: usize) -> Self {
		self.arity = Some(arity);
		self
	}

	pub fn trailing(mut self, arguments: Vec<Expression>) -> Self {
		self.trailing = arguments;
		self
	}
}

impl MethodCallTranslator for FunctionTranslator {
	fn translate(&self, expression: &Expression) -> Option<Expression> {
		let (object, arguments) = match_call(expression, &self.method.owner, &self.method.name)?;
		let count = arguments.len() + usize::from(object.is_some());
		if self.arity.is_some_and(|arity| arity != count) {
			return None;
		}
		let mut call_arguments: Vec<Expression> = object.into_iter().cloned().collect();
		call_arguments.extend(arguments.iter().cloned());
		call_arguments.extend(self.trailing.iter().cloned());
		Some(Expression::function(self.function, call_arguments))
	}
}

fn zero() -> Expression {
	Expression::constant(0i32)
}

pub(super) fn sql_server(registry: TranslatorRegistry) -> TranslatorRegistry {
	registry
		.with_method(FunctionTranslator::math("ceiling", "CEILING"))
		.with_method(FunctionTranslator::math("round", "ROUND").arity(1).trailing(vec![zero()]))
		.with_method(FunctionTranslator::math("round", "ROUND").arity(2))
		// ROUND with a non-zero third argument truncates
		.with_method(
			FunctionTranslator::math("truncate", "ROUND")
				.arity(1)
				.trailing(vec![zero(), Expression::constant(1i32)]),
		)
}

pub(super) fn mysql(registry: TranslatorRegistry) -> TranslatorRegistry {
	registry
		.with_method(FunctionTranslator::math("ceiling", "CEILING"))
		.with_method(FunctionTranslator::math("round", "ROUND"))
		.with_method(FunctionTranslator::math("truncate", "TRUNCATE").arity(1).trailing(vec![zero()]))
}

fn sqlite_truncate(expression: &Expression) -> Option<Expression> {
	let (None, [value]) = match_call(expression, &TypeOwner::Math, "truncate")? else {
		return None;
	};
	Some(Expression::Cast {
		operand: Box::new(value.clone()),
		column_type: ColumnType::BigInt,
	})
}

pub(super) fn sqlite(registry: TranslatorRegistry) -> TranslatorRegistry {
	registry
		.with_method(FunctionTranslator::math("ceiling", "CEIL"))
		.with_method(FunctionTranslator::math("round", "ROUND"))
		.with_method(Rule::new("truncate", sqlite_truncate))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_function_translator_static_call() {
		let call = Expression::static_call(Method::math("abs"), vec![Expression::fragment("x")]);
		let translated = FunctionTranslator::math("abs", "ABS").translate(&call);

		assert_eq!(
			translated,
			Some(Expression::function("ABS", vec![Expression::fragment("x")]))
		);
	}

	#[test]
	fn test_function_translator_respects_arity() {
		let call = Expression::static_call(
			Method::math("round"),
			vec![Expression::fragment("x"), Expression::constant(2i32)],
		);

		assert!(
			FunctionTranslator::math("round", "ROUND")
				.arity(1)
				.translate(&call)
				.is_none()
		);
	}
}
