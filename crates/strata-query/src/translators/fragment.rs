use crate::expr::{Expression, TypeOwner};

/// `compare(a, b) <op> 0` -> `a <op> b`.
///
/// Matches both `String::compare(a, b)` and `a.compare_to(b)`.
pub fn rewrite_compare(expression: &Expression) -> Option<Expression> {
	let Expression::Binary { op, left, right } = expression else {
		return None;
	};
	if !op.is_comparison() || right.as_constant().and_then(|v| v.as_i64()) != Some(0) {
		return None;
	}
	let Expression::Call {
		object,
		method,
		arguments,
	} = left.as_ref()
	else {
		return None;
	};
	let (a, b) = match (object.as_deref(), arguments.as_slice(), method.name.as_str()) {
		(None, [a, b], "compare") if method.owner == TypeOwner::String => (a, b),
		(Some(a), [b], "compare_to") => (a, b),
		_ => return None,
	};
	Some(a.clone().binary(*op, b.clone()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::expr::{BinaryOp, Method};

	#[test]
	fn test_rewrite_compare() {
		let compare = Expression::static_call(
			Method::string("compare"),
			vec![Expression::fragment("a"), Expression::fragment("b")],
		);
		let expression = compare.binary(BinaryOp::GreaterThan, 0i32);

		assert_eq!(
			rewrite_compare(&expression),
			Some(Expression::fragment("a").gt(Expression::fragment("b")))
		);
	}

	#[test]
	fn test_rewrite_compare_ignores_non_zero() {
		let compare = Expression::fragment("a").call(Method::string("compare_to"), vec![Expression::fragment("b")]);

		assert!(rewrite_compare(&compare.eq(1i32)).is_none());
	}
}
