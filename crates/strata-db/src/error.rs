//! Error types for execution and migrations.

use std::time::Duration;

use strata_query::QueryError;
use thiserror::Error;

/// Errors raised by executors.
#[derive(Debug, Error)]
pub enum DatabaseError {
	#[error("database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("transaction timed out after {0:?}")]
	Timeout(Duration),

	#[error("operation cancelled")]
	Cancelled,

	#[error("column `{0}` not found")]
	ColumnNotFound(String),

	#[error("type error: {0}")]
	TypeError(String),

	#[error("configuration error: {0}")]
	Configuration(String),

	#[error(transparent)]
	Query(#[from] QueryError),
}

/// Errors raised while generating or running migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
	#[error(transparent)]
	Query(#[from] QueryError),

	#[error(transparent)]
	Database(#[from] DatabaseError),

	/// The dialect cannot express the operation.
	#[error("{operation} is not supported by {dialect}")]
	UnsupportedOperation { operation: String, dialect: String },

	/// The operation is malformed, e.g. both a default value and default SQL.
	#[error("invalid migration operation: {0}")]
	InvalidOperation(String),

	/// The bookkeeping row does not match the requested transition.
	#[error("migration `{id}` conflicts with its bookkeeping row: {reason}")]
	MigrationConflict { id: String, reason: String },

	#[error("migration cancelled")]
	Cancelled,
}

impl MigrationError {
	pub(crate) fn unsupported(operation: impl Into<String>, dialect: impl ToString) -> Self {
		Self::UnsupportedOperation {
			operation: operation.into(),
			dialect: dialect.to_string(),
		}
	}
}

impl From<sqlx::Error> for MigrationError {
	fn from(error: sqlx::Error) -> Self {
		Self::Database(DatabaseError::Sqlx(error))
	}
}

/// Result alias for executor operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
