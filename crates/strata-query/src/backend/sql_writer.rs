//! SQL buffer used by the compiler and the statement generators.
//!
//! `SqlWriter` accumulates SQL text together with the ordered list of named
//! parameters the text refers to.

use crate::error::{QueryError, Result};
use crate::value::Value;

use super::SqlHelper;

/// A named bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
	pub name: String,
	pub value: Value,
}

impl Parameter {
	pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
		}
	}
}

/// SQL text plus the parameters it binds, in first-use order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledSql {
	pub sql: String,
	pub parameters: Vec<Parameter>,
}

impl CompiledSql {
	pub fn new(sql: impl Into<String>, parameters: Vec<Parameter>) -> Self {
		Self {
			sql: sql.into(),
			parameters,
		}
	}

	pub fn parameter(&self, name: &str) -> Option<&Value> {
		self.parameters.iter().find(|p| p.name == name).map(|p| &p.value)
	}
}

/// SQL Writer for constructing SQL strings
#[derive(Debug, Clone, Default)]
pub struct SqlWriter {
	sql: String,
	parameters: Vec<Parameter>,
}

impl SqlWriter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Push a string to SQL
	pub fn push(&mut self, s: &str) {
		self.sql.push_str(s);
	}

	pub fn push_char(&mut self, c: char) {
		self.sql.push(c);
	}

	/// Push a space unless the buffer is empty or already ends with one
	pub fn push_space(&mut self) {
		if !self.sql.is_empty() && !self.sql.ends_with([' ', '\n', '(']) {
			self.sql.push(' ');
		}
	}

	/// Push a keyword with automatic spacing
	pub fn push_keyword(&mut self, keyword: &str) {
		self.push_space();
		self.sql.push_str(keyword);
	}

	pub fn push_comma(&mut self) {
		self.sql.push_str(", ");
	}

	/// Push a quoted identifier
	pub fn push_identifier(&mut self, ident: &str, helper: &dyn SqlHelper) -> Result<()> {
		let quoted = helper.delimit_identifier(ident)?;
		self.sql.push_str(&quoted);
		Ok(())
	}

	/// Push a value rendered as a literal
	pub fn push_literal(&mut self, value: &Value, helper: &dyn SqlHelper) {
		let literal = helper.escape_literal(value);
		self.sql.push_str(&literal);
	}

	/// Push a parameter placeholder and record its value.
	///
	/// A name that is already recorded is bound once; reusing it with a
	/// different value is an error.
	pub fn push_parameter(&mut self, name: &str, value: &Value, helper: &dyn SqlHelper) -> Result<()> {
		self.add_parameter(Parameter::new(name, value.clone()))?;
		self.sql.push_str(&helper.parameterized(name));
		Ok(())
	}

	/// Record a parameter without writing a placeholder.
	pub fn add_parameter(&mut self, parameter: Parameter) -> Result<()> {
		match self.parameters.iter().find(|p| p.name == parameter.name) {
			Some(existing) if existing.value == parameter.value => Ok(()),
			Some(_) => Err(QueryError::InvalidExpression(format!(
				"parameter `{}` bound to two different values",
				parameter.name
			))),
			None => {
				self.parameters.push(parameter);
				Ok(())
			}
		}
	}

	pub fn extend_parameters<I>(&mut self, parameters: I) -> Result<()>
	where
		I: IntoIterator<Item = Parameter>,
	{
		for parameter in parameters {
			self.add_parameter(parameter)?;
		}
		Ok(())
	}

	/// Push a list of items with a separator
	pub fn push_list<I, T, F>(&mut self, items: I, separator: &str, mut f: F) -> Result<()>
	where
		I: IntoIterator<Item = T>,
		F: FnMut(&mut Self, T) -> Result<()>,
	{
		let mut first = true;
		for item in items {
			if !first {
				self.sql.push_str(separator);
			}
			f(self, item)?;
			first = false;
		}
		Ok(())
	}

	pub fn sql(&self) -> &str {
		&self.sql
	}

	pub fn parameters(&self) -> &[Parameter] {
		&self.parameters
	}

	pub fn is_empty(&self) -> bool {
		self.sql.is_empty()
	}

	/// Consume the writer
	pub fn finish(self) -> CompiledSql {
		CompiledSql {
			sql: self.sql,
			parameters: self.parameters,
		}
	}
}
