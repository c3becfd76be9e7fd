//! Member, method-call and fragment translators.
//!
//! A translator receives one node and returns a replacement node, or `None`
//! when it does not apply. [`TranslatorRegistry`] keeps three ordered lists
//! and returns the first match. Each dialect's registry is the portable base
//! plus that dialect's rules.

use std::fmt;

use crate::backend::DatabaseKind;
use crate::expr::Expression;

mod fragment;
mod math;
mod member;
mod misc;
mod string;

pub use fragment::rewrite_compare;
pub use math::FunctionTranslator;
pub use member::{DateTimeNowTranslator, translate_date_member, translate_string_length};
pub use misc::{translate_convert, translate_equals};
pub use string::{PatternKind, PatternMatchTranslator, escape_like_pattern, translate_is_null_or_empty};

/// Rewrites a `Member` or `StaticMember` node.
pub trait MemberTranslator: Send + Sync + fmt::Debug {
	fn translate(&self, expression: &Expression) -> Option<Expression>;
}

/// Rewrites a `Call` node.
pub trait MethodCallTranslator: Send + Sync + fmt::Debug {
	fn translate(&self, expression: &Expression) -> Option<Expression>;
}

/// Rewrites any node before it is visited.
pub trait FragmentTranslator: Send + Sync + fmt::Debug {
	fn translate(&self, expression: &Expression) -> Option<Expression>;
}

/// A translator backed by a plain function.
#[derive(Clone, Copy)]
pub struct Rule {
	name: &'static str,
	rewrite: fn(&Expression) -> Option<Expression>,
}

impl Rule {
	pub const fn new(name: &'static str, rewrite: fn(&Expression) -> Option<Expression>) -> Self {
		Self { name, rewrite }
	}
}

impl fmt::Debug for Rule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Rule").field(&self.name).finish()
	}
}

impl MemberTranslator for Rule {
	fn translate(&self, expression: &Expression) -> Option<Expression> {
		(self.rewrite)(expression)
	}
}

impl MethodCallTranslator for Rule {
	fn translate(&self, expression: &Expression) -> Option<Expression> {
		(self.rewrite)(expression)
	}
}

impl FragmentTranslator for Rule {
	fn translate(&self, expression: &Expression) -> Option<Expression> {
		(self.rewrite)(expression)
	}
}

/// Ordered translator lists.
#[derive(Debug, Default)]
pub struct TranslatorRegistry {
	members: Vec<Box<dyn MemberTranslator>>,
	methods: Vec<Box<dyn MethodCallTranslator>>,
	fragments: Vec<Box<dyn FragmentTranslator>>,
}

impl TranslatorRegistry {
	/// An empty registry
	pub fn new() -> Self {
		Self::default()
	}

	/// Rules whose output every dialect can render.
	pub fn portable() -> Self {
		Self::new()
			.with_member(Rule::new("date_member", translate_date_member))
			.with_member(Rule::new("string_length", translate_string_length))
			.with_method(PatternMatchTranslator::new(PatternKind::StartsWith))
			.with_method(PatternMatchTranslator::new(PatternKind::EndsWith))
			.with_method(PatternMatchTranslator::new(PatternKind::Contains))
			.with_method(Rule::new("is_null_or_empty", translate_is_null_or_empty))
			.with_method(FunctionTranslator::string("replace", "REPLACE"))
			.with_method(FunctionTranslator::string("to_upper", "UPPER"))
			.with_method(FunctionTranslator::string("to_lower", "LOWER"))
			.with_method(FunctionTranslator::string("trim_start", "LTRIM"))
			.with_method(FunctionTranslator::string("trim_end", "RTRIM"))
			.with_method(FunctionTranslator::math("abs", "ABS"))
			.with_method(FunctionTranslator::math("floor", "FLOOR"))
			.with_method(FunctionTranslator::math("pow", "POWER"))
			.with_method(FunctionTranslator::math("sign", "SIGN"))
			.with_method(FunctionTranslator::math("sqrt", "SQRT"))
			.with_method(Rule::new("convert", translate_convert))
			.with_method(Rule::new("equals", translate_equals))
			.with_fragment(Rule::new("compare", rewrite_compare))
	}

	/// Portable rules plus the rules of `kind`.
	pub fn for_kind(kind: DatabaseKind) -> Self {
		let registry = Self::portable();
		match kind {
			DatabaseKind::SqlServer => {
				misc::sql_server(math::sql_server(string::sql_server(member::sql_server(registry))))
			}
			DatabaseKind::MySql => misc::mysql(math::mysql(string::mysql(member::mysql(registry)))),
			DatabaseKind::Sqlite => misc::sqlite(math::sqlite(string::sqlite(member::sqlite(registry)))),
		}
	}

	pub fn with_member(mut self, translator: impl MemberTranslator + 'static) -> Self {
		self.members.push(Box::new(translator));
		self
	}

	pub fn with_method(mut self, translator: impl MethodCallTranslator + 'static) -> Self {
		self.methods.push(Box::new(translator));
		self
	}

	pub fn with_fragment(mut self, translator: impl FragmentTranslator + 'static) -> Self {
		self.fragments.push(Box::new(translator));
		self
	}

	pub fn translate_member(&self, expression: &Expression) -> Option<Expression> {
		self.members.iter().find_map(|t| t.translate(expression))
	}

	pub fn translate_method(&self, expression: &Expression) -> Option<Expression> {
		self.methods.iter().find_map(|t| t.translate(expression))
	}

	pub fn translate_fragment(&self, expression: &Expression) -> Option<Expression> {
		self.fragments.iter().find_map(|t| t.translate(expression))
	}
}

/// Object and arguments of a call to `method_name` on `owner`.
pub(crate) fn match_call<'e>(
	expression: &'e Expression,
	owner: &crate::expr::TypeOwner,
	method_name: &str,
) -> Option<(Option<&'e Expression>, &'e [Expression])> {
	match expression {
		Expression::Call {
			object,
			method,
			arguments,
		} if method.is(owner, method_name) => Some((object.as_deref(), arguments.as_slice())),
		_ => None,
	}
}
