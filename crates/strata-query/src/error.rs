//! Error types for metadata lookup, dialect rules and SQL compilation.

use thiserror::Error;

/// Errors raised while describing entities or compiling SQL.
///
/// All of these are programmer errors: they surface before any statement
/// reaches the database and are never downgraded to best-effort SQL.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
	/// A member access that no translator accepts and that does not resolve
	/// to an entity column or a captured value.
	#[error("unresolved member `{member}` on {owner}")]
	UnresolvedMember { owner: String, member: String },

	/// A method call that no translator accepts.
	#[error("unresolved method call `{owner}::{method}` with {arity} argument(s)")]
	UnresolvedMethodCall {
		owner: String,
		method: String,
		arity: usize,
	},

	/// A logical column type with no mapping in the active dialect.
	#[error("column type `{column_type}` is not supported by {dialect}")]
	UnsupportedColumnType { column_type: String, dialect: String },

	/// An identifier was rejected before quoting.
	#[error("invalid identifier `{identifier}`: {reason}")]
	IdentifierValidation { identifier: String, reason: String },

	/// A property name that does not exist on the entity.
	#[error("entity `{entity}` has no property `{property}`")]
	UnknownProperty { entity: String, property: String },

	/// An operation needs a primary key but the entity declares none.
	#[error("entity `{entity}` has no primary key")]
	MissingPrimaryKey { entity: String },

	/// A structurally invalid expression or value conversion.
	#[error("invalid expression: {0}")]
	InvalidExpression(String),
}

impl QueryError {
	pub(crate) fn identifier(identifier: &str, reason: impl Into<String>) -> Self {
		Self::IdentifierValidation {
			identifier: identifier.to_string(),
			reason: reason.into(),
		}
	}
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QueryError>;
