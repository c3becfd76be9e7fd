//! # Executors
//!
//! The transactional SQL executor contract and its sqlx implementations.
//!
//! Statements arrive as produced by `strata-query`: named placeholders in the
//! dialect's syntax (`@name`, `?name`) and table names carrying the
//! [`PREFIX_PLACEHOLDER`](strata_query::PREFIX_PLACEHOLDER) marker. Before a
//! statement is sent, the executor substitutes the configured table prefix and
//! rewrites each named placeholder into a positional `?`, binding the
//! parameter's value once per occurrence.
//!
//! | Engine | Feature | Executor |
//! |--------|---------|----------|
//! | SQLite | `sqlite` (default) | [`SqliteExecutor`] |
//! | MySQL | `mysql` | [`MySqlExecutor`] |
//!
//! SQL Server statements are generated by `strata-query` but there is no
//! executor for it in this crate.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use strata_query::{DatabaseKind, MoveOutcome, MoveStatement, Parameter, PagedSql, Value, apply_prefix};

use crate::error::{DatabaseError, Result};

mod params;
mod row;

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use params::{expand_named_parameters, split_statements};
pub use row::Row;

#[cfg(feature = "mysql")]
pub use mysql::{MySqlExecutor, MySqlTransaction};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteExecutor, SqliteTransaction};

/// A statement ready for the driver: prefix applied, positional placeholders
/// and one value per placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
	pub sql: String,
	pub values: Vec<Value>,
}

impl PreparedStatement {
	pub fn new(kind: DatabaseKind, table_prefix: &str, sql: &str, parameters: &[Parameter]) -> Self {
		let prefix = match kind {
			DatabaseKind::MySql => '?',
			DatabaseKind::SqlServer | DatabaseKind::Sqlite => '@',
		};
		let sql = apply_prefix(sql, table_prefix);
		let (sql, values) = expand_named_parameters(&sql, prefix, parameters);
		Self { sql, values }
	}
}

/// Database executor
#[async_trait]
pub trait Executor: Send + Sync {
	fn kind(&self) -> DatabaseKind;

	/// Physical prefix substituted for the table-name marker.
	fn table_prefix(&self) -> &str;

	fn prepare(&self, sql: &str, parameters: &[Parameter]) -> PreparedStatement {
		PreparedStatement::new(self.kind(), self.table_prefix(), sql, parameters)
	}

	/// Run a statement, returning the affected row count.
	async fn execute(&self, sql: &str, parameters: &[Parameter]) -> Result<u64>;

	/// First column of the first row, `Value::Null` when there is none.
	async fn execute_scalar(&self, sql: &str, parameters: &[Parameter]) -> Result<Value>;

	async fn fetch_all(&self, sql: &str, parameters: &[Parameter]) -> Result<Vec<Row>>;

	async fn begin(&self) -> Result<Box<dyn Transaction>>;

	/// Run a multi-statement script on one connection and return the scalar
	/// selected by its last statement.
	///
	/// Session state (variables) carries across the statements.
	async fn execute_script_scalar(&self, sql: &str, parameters: &[Parameter]) -> Result<Value>;

	/// Page data and total count, executed back-to-back in that order.
	async fn page(&self, paged: &PagedSql) -> Result<(Vec<Row>, i64)> {
		let rows = self.fetch_all(&paged.data.sql, &paged.data.parameters).await?;
		let count = self
			.execute_scalar(&paged.count.sql, &paged.count.parameters)
			.await?;
		let count = count
			.as_i64()
			.ok_or_else(|| DatabaseError::TypeError(format!("count returned {:?}", count)))?;
		Ok((rows, count))
	}

	/// Run a reorder statement; `true` when two rows were swapped.
	///
	/// Engine errors are logged and reported as `false`; the statement or the
	/// executor has already rolled the swap back.
	async fn move_rows(&self, statement: &MoveStatement) -> Result<bool> {
		let outcome = match statement.outcome {
			MoveOutcome::RowsAffected(expected) => self
				.execute(&statement.sql, &statement.parameters)
				.await
				.map(|affected| affected == expected),
			MoveOutcome::Scalar => self
				.execute_script_scalar(&statement.sql, &statement.parameters)
				.await
				.map(|value| value.as_i64().is_some_and(|v| v != 0)),
		};
		match outcome {
			Err(DatabaseError::Sqlx(e)) => {
				tracing::error!(error = %e, "reorder failed and was rolled back");
				Ok(false)
			}
			other => other,
		}
	}
}

/// An open transaction. Dropping it without [`commit`](Transaction::commit)
/// rolls it back.
#[async_trait]
pub trait Transaction: Send {
	async fn execute(&mut self, sql: &str, parameters: &[Parameter]) -> Result<u64>;

	async fn execute_scalar(&mut self, sql: &str, parameters: &[Parameter]) -> Result<Value>;

	async fn fetch_all(&mut self, sql: &str, parameters: &[Parameter]) -> Result<Vec<Row>>;

	async fn commit(self: Box<Self>) -> Result<()>;

	async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Run `f` inside a transaction bounded by `timeout`.
///
/// Commits when `f` succeeds; rolls back when it fails or the timeout
/// elapses. A failed rollback is logged and the original error returned.
///
/// # Examples
///
/// ```rust,ignore
/// use futures::FutureExt;
/// use strata_db::backends::in_transaction;
///
/// let affected = in_transaction(executor.as_ref(), Duration::from_secs(30), |tx| {
///     async move { tx.execute("DELETE FROM \"$pre:log\";", &[]).await.map_err(Into::into) }.boxed()
/// })
/// .await?;
/// ```
pub async fn in_transaction<T, E, F>(executor: &dyn Executor, timeout: Duration, f: F) -> std::result::Result<T, E>
where
	F: for<'t> FnOnce(&'t mut dyn Transaction) -> BoxFuture<'t, std::result::Result<T, E>> + Send,
	E: From<DatabaseError>,
{
	let mut tx = executor.begin().await?;
	let outcome = tokio::time::timeout(timeout, f(tx.as_mut())).await;
	match outcome {
		Ok(Ok(value)) => {
			tx.commit().await?;
			Ok(value)
		}
		Ok(Err(e)) => {
			rollback_quietly(tx).await;
			Err(e)
		}
		Err(_) => {
			rollback_quietly(tx).await;
			Err(DatabaseError::Timeout(timeout).into())
		}
	}
}

async fn rollback_quietly(tx: Box<dyn Transaction>) {
	if let Err(e) = tx.rollback().await {
		tracing::warn!(error = %e, "rollback failed");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_prepared_statement_applies_prefix_and_positions() {
		let prepared = PreparedStatement::new(
			DatabaseKind::Sqlite,
			"app_",
			"SELECT * FROM \"$pre:users\" WHERE \"id\" = @id OR \"parent\" = @id;",
			&[Parameter::new("id", 3i64)],
		);

		assert_eq!(
			prepared.sql,
			"SELECT * FROM \"app_users\" WHERE \"id\" = ? OR \"parent\" = ?;"
		);
		assert_eq!(prepared.values, vec![Value::BigInt(3), Value::BigInt(3)]);
	}

	#[test]
	fn test_prepared_statement_mysql_placeholders() {
		let prepared = PreparedStatement::new(
			DatabaseKind::MySql,
			"",
			"SELECT `a` FROM `$pre:t` WHERE `k` = ?k INTO @move_current_order;",
			&[Parameter::new("k", "x")],
		);

		assert_eq!(
			prepared.sql,
			"SELECT `a` FROM `t` WHERE `k` = ? INTO @move_current_order;"
		);
		assert_eq!(prepared.values, vec![Value::from("x")]);
	}
}
