use crate::expr::{BinaryOp, Expression, Method, TypeOwner};
use crate::value::Value;

use super::{FunctionTranslator, MethodCallTranslator, Rule, TranslatorRegistry, match_call};

/// Escape LIKE wildcards of a literal pattern for `ESCAPE '\'`.
///
/// `[` is escaped as well since SQL Server treats it as a character class.
pub fn escape_like_pattern(pattern: &str) -> String {
	let mut escaped = String::with_capacity(pattern.len());
	for c in pattern.chars() {
		if matches!(c, '%' | '_' | '[' | '\\') {
			escaped.push('\\');
		}
		escaped.push(c);
	}
	escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
	StartsWith,
	EndsWith,
	Contains,
}

impl PatternKind {
	fn method(&self) -> &'static str {
		match self {
			PatternKind::StartsWith => "starts_with",
			PatternKind::EndsWith => "ends_with",
			PatternKind::Contains => "contains",
		}
	}

	fn like_pattern(&self, escaped: &str) -> String {
		match self {
			PatternKind::StartsWith => format!("{}%", escaped),
			PatternKind::EndsWith => format!("%{}", escaped),
			PatternKind::Contains => format!("%{}%", escaped),
		}
	}
}

/// `starts_with`, `ends_with` and `contains` on text.
///
/// A constant pattern becomes a `LIKE` with its wildcards escaped; the empty
/// constant is always true. A non-constant pattern cannot be escaped, so the
/// `LIKE` is paired with an exact check of the anchored end: a position of 1
/// for `starts_with`, the trailing substring for `ends_with`. `pattern = ''`
/// covers the empty pattern.
#[derive(Debug, Clone, Copy)]
pub struct PatternMatchTranslator {
	kind: PatternKind,
}

impl PatternMatchTranslator {
	pub fn new(kind: PatternKind) -> Self {
		Self { kind }
	}

	fn constant(&self, target: &Expression, pattern: &str) -> Expression {
		if pattern.is_empty() {
			return Expression::always_true();
		}
		let like = self.kind.like_pattern(&escape_like_pattern(pattern));
		Expression::Like {
			target: Box::new(target.clone()),
			pattern: Box::new(Expression::constant(like)),
			escape: Some('\\'),
		}
	}

	fn dynamic(&self, target: &Expression, pattern: &Expression) -> Expression {
		let wildcard = || Expression::constant("%");
		let position = || Expression::Position {
			needle: Box::new(pattern.clone()),
			haystack: Box::new(target.clone()),
		};
		let matched = match self.kind {
			PatternKind::StartsWith => target
				.clone()
				.like(Expression::Concat(vec![pattern.clone(), wildcard()]))
				.and(position().eq(1i32)),
			PatternKind::EndsWith => {
				let length = || Expression::Length(Box::new(pattern.clone()));
				let start = Expression::Length(Box::new(target.clone())).binary(BinaryOp::Subtract, length());
				let tail = target
					.clone()
					.call(Method::string("substring"), vec![start, length()]);
				target
					.clone()
					.like(Expression::Concat(vec![wildcard(), pattern.clone()]))
					.and(tail.eq(pattern.clone()))
			}
			PatternKind::Contains => position().gt(0i32),
		};
		matched.or(pattern.clone().eq(""))
	}
}

impl MethodCallTranslator for PatternMatchTranslator {
	fn translate(&self, expression: &Expression) -> Option<Expression> {
		let (Some(target), [pattern]) = match_call(expression, &TypeOwner::String, self.kind.method())? else {
			return None;
		};
		let translated = match pattern.as_constant() {
			Some(Value::String(text)) => self.constant(target, text),
			Some(Value::Char(c)) => self.constant(target, &c.to_string()),
			_ => self.dynamic(target, pattern),
		};
		Some(translated)
	}
}

/// `String::is_null_or_empty(x)` -> `(x IS NULL OR x = '')`.
pub fn translate_is_null_or_empty(expression: &Expression) -> Option<Expression> {
	let value = match match_call(expression, &TypeOwner::String, "is_null_or_empty")? {
		(None, [value]) | (Some(value), []) => value,
		_ => return None,
	};
	Some(
		value
			.clone()
			.eq(Value::Null)
			.or(value.clone().eq("")),
	)
}

/// `x.substring(start[, length])` with a 0-based start.
fn substring(function: &'static str, expression: &Expression, length_required: bool) -> Option<Expression> {
	let (Some(target), arguments) = match_call(expression, &TypeOwner::String, "substring")? else {
		return None;
	};
	let start = match arguments.first()? {
		Expression::Constant(value) => match value.as_i64() {
			Some(n) => Expression::constant(n + 1),
			None => return None,
		},
		other => other.clone().binary(BinaryOp::Add, 1i32),
	};
	let length = match arguments {
		[_] if length_required => Some(Expression::Length(Box::new(target.clone()))),
		[_] => None,
		[_, length] => Some(length.clone()),
		_ => return None,
	};
	let mut call_arguments = vec![target.clone(), start];
	call_arguments.extend(length);
	Some(Expression::function(function, call_arguments))
}

fn sql_server_substring(expression: &Expression) -> Option<Expression> {
	substring("SUBSTRING", expression, true)
}

fn mysql_substring(expression: &Expression) -> Option<Expression> {
	substring("SUBSTRING", expression, false)
}

fn sqlite_substring(expression: &Expression) -> Option<Expression> {
	substring("SUBSTR", expression, false)
}

// LTRIM(RTRIM(x)) works on every SQL Server version; TRIM needs 2017
fn sql_server_trim(expression: &Expression) -> Option<Expression> {
	let (Some(target), []) = match_call(expression, &TypeOwner::String, "trim")? else {
		return None;
	};
	Some(Expression::function(
		"LTRIM",
		vec![Expression::function("RTRIM", vec![target.clone()])],
	))
}

pub(super) fn sql_server(registry: TranslatorRegistry) -> TranslatorRegistry {
	registry
		.with_method(Rule::new("substring", sql_server_substring))
		.with_method(Rule::new("trim", sql_server_trim))
}

pub(super) fn mysql(registry: TranslatorRegistry) -> TranslatorRegistry {
	registry
		.with_method(Rule::new("substring", mysql_substring))
		.with_method(FunctionTranslator::string("trim", "TRIM"))
}

pub(super) fn sqlite(registry: TranslatorRegistry) -> TranslatorRegistry {
	registry
		.with_method(Rule::new("substring", sqlite_substring))
		.with_method(FunctionTranslator::string("trim", "TRIM"))
}
