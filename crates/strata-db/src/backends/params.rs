//! Named placeholder expansion and script splitting.

use strata_query::{Parameter, Value};

fn is_name_start(c: char) -> bool {
	c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_'
}

/// Copy a quoted section starting at `chars[start]`, returning the index
/// after its closing quote. A doubled closing quote is an escaped quote.
fn copy_quoted(chars: &[char], start: usize, close: char, out: &mut String) -> usize {
	out.push(chars[start]);
	let mut i = start + 1;
	while i < chars.len() {
		let c = chars[i];
		out.push(c);
		i += 1;
		if c == close {
			if chars.get(i) == Some(&close) {
				out.push(close);
				i += 1;
			} else {
				break;
			}
		}
	}
	i
}

fn closing_quote(c: char) -> Option<char> {
	match c {
		'\'' => Some('\''),
		'"' => Some('"'),
		'`' => Some('`'),
		'[' => Some(']'),
		_ => None,
	}
}

/// Rewrite `<prefix>name` placeholders into positional `?`.
///
/// Only names present in `parameters` are rewritten; other tokens with the
/// same prefix (session variables such as `@move_current_order`, `@@ERROR`)
/// pass through. String literals and quoted identifiers are never scanned.
/// A parameter used several times is bound once per occurrence.
pub fn expand_named_parameters(sql: &str, prefix: char, parameters: &[Parameter]) -> (String, Vec<Value>) {
	let chars: Vec<char> = sql.chars().collect();
	let mut out = String::with_capacity(sql.len());
	let mut values = Vec::new();
	let mut i = 0;
	while i < chars.len() {
		let c = chars[i];
		if let Some(close) = closing_quote(c) {
			i = copy_quoted(&chars, i, close, &mut out);
			continue;
		}
		if c == prefix && chars.get(i + 1) == Some(&prefix) {
			// `@@IDENTITY` and friends
			out.push(c);
			out.push(c);
			i += 2;
			while i < chars.len() && is_name_char(chars[i]) {
				out.push(chars[i]);
				i += 1;
			}
			continue;
		}
		if c == prefix && chars.get(i + 1).is_some_and(|&n| is_name_start(n)) {
			let end = (i + 1..chars.len())
				.find(|&j| !is_name_char(chars[j]))
				.unwrap_or(chars.len());
			let name: String = chars[i + 1..end].iter().collect();
			match parameters.iter().find(|p| p.name == name) {
				Some(parameter) => {
					out.push('?');
					values.push(parameter.value.clone());
				}
				None => {
					out.push(c);
					out.push_str(&name);
				}
			}
			i = end;
			continue;
		}
		out.push(c);
		i += 1;
	}
	(out, values)
}

/// Split a script into statements at `;` outside quotes.
///
/// Each statement keeps its terminator; blank remainders are dropped.
pub fn split_statements(script: &str) -> Vec<String> {
	let chars: Vec<char> = script.chars().collect();
	let mut statements = Vec::new();
	let mut current = String::new();
	let mut i = 0;
	while i < chars.len() {
		let c = chars[i];
		if let Some(close) = closing_quote(c) {
			i = copy_quoted(&chars, i, close, &mut current);
			continue;
		}
		current.push(c);
		i += 1;
		if c == ';' {
			let statement = current.trim();
			if statement != ";" {
				statements.push(statement.to_string());
			}
			current.clear();
		}
	}
	if !current.trim().is_empty() {
		statements.push(current.trim().to_string());
	}
	statements
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn params() -> Vec<Parameter> {
		vec![Parameter::new("p", "x"), Parameter::new("id", 1i64)]
	}

	#[rstest]
	#[case("a = @p AND b = @id", "a = ? AND b = ?", 2)]
	#[case("a = @p OR @p = ''", "a = ? OR ? = ''", 2)]
	#[case("a = '@p'", "a = '@p'", 0)]
	#[case("a = 'it''s @p'", "a = 'it''s @p'", 0)]
	#[case("[@p] = @p", "[@p] = ?", 1)]
	#[case("\"@p\" = @p", "\"@p\" = ?", 1)]
	#[case("SELECT @@IDENTITY, @MoveCurrentOrder", "SELECT @@IDENTITY, @MoveCurrentOrder", 0)]
	#[case("a = @pp", "a = @pp", 0)]
	fn test_expand_named_parameters(#[case] sql: &str, #[case] expected: &str, #[case] bound: usize) {
		let (expanded, values) = expand_named_parameters(sql, '@', &params());

		assert_eq!(expanded, expected);
		assert_eq!(values.len(), bound);
	}

	#[test]
	fn test_expand_binds_in_occurrence_order() {
		let (_, values) = expand_named_parameters("@id, @p, @id", '@', &params());

		assert_eq!(
			values,
			vec![Value::BigInt(1), Value::from("x"), Value::BigInt(1)]
		);
	}

	#[test]
	fn test_expand_mysql_prefix_leaves_session_variables() {
		let (expanded, values) = expand_named_parameters("SET @a = ?p;", '?', &params());

		assert_eq!(expanded, "SET @a = ?;");
		assert_eq!(values.len(), 1);
	}

	#[test]
	fn test_split_statements() {
		let statements = split_statements("SET @a = 1;\nSELECT ';' FROM `x;y`;\n\nCOMMIT;\n");

		assert_eq!(statements, vec!["SET @a = 1;", "SELECT ';' FROM `x;y`;", "COMMIT;"]);
	}

	#[test]
	fn test_split_statements_keeps_unterminated_tail() {
		assert_eq!(split_statements("SELECT 1; SELECT 2"), vec!["SELECT 1;", "SELECT 2"]);
	}
}
