//! SQLite executor

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use strata_query::{DatabaseKind, Parameter, Value};

use super::{Executor, PreparedStatement, Row, Transaction, split_statements};
use crate::error::{DatabaseError, Result};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

// Text forms match the literals SqliteSqlHelper renders, so bound values and
// embedded literals compare equal.
fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
	match value {
		Value::Null => query.bind(None::<i64>),
		Value::Bool(v) => query.bind(*v),
		Value::TinyInt(v) => query.bind(i64::from(*v)),
		Value::SmallInt(v) => query.bind(i64::from(*v)),
		Value::Int(v) => query.bind(i64::from(*v)),
		Value::BigInt(v) => query.bind(*v),
		Value::TinyUnsigned(v) => query.bind(i64::from(*v)),
		Value::SmallUnsigned(v) => query.bind(i64::from(*v)),
		Value::Unsigned(v) => query.bind(i64::from(*v)),
		Value::BigUnsigned(v) => match i64::try_from(*v) {
			Ok(v) => query.bind(v),
			Err(_) => query.bind(v.to_string()),
		},
		Value::Float(v) => query.bind(f64::from(*v)),
		Value::Double(v) => query.bind(*v),
		Value::Decimal(v) => query.bind(v.to_string()),
		Value::Enum { discriminant, .. } => query.bind(*discriminant),
		Value::Char(c) => query.bind(c.to_string()),
		Value::String(s) | Value::TypeName(s) => query.bind(s.clone()),
		Value::Json(json) => query.bind(json.to_string()),
		Value::Bytes(bytes) => query.bind(bytes.clone()),
		Value::Date(d) => query.bind(d.format("%Y-%m-%d").to_string()),
		Value::Time(t) => query.bind(t.format("%H:%M:%S%.6f").to_string()),
		Value::DateTime(dt) => query.bind(dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
		Value::DateTimeOffset(dt) => query.bind(dt.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()),
		Value::Uuid(id) => query.bind(id.hyphenated().to_string()),
	}
}

fn build(prepared: &PreparedStatement) -> SqliteQuery<'_> {
	prepared.values.iter().fold(sqlx::query(&prepared.sql), bind_value)
}

/// Decode by the storage class of the value actually stored.
fn decode_value(row: &SqliteRow, index: usize) -> Result<Value> {
	let raw = row.try_get_raw(index)?;
	if raw.is_null() {
		return Ok(Value::Null);
	}
	let storage = raw.type_info().name().to_ascii_uppercase();
	let value = match storage.as_str() {
		"INTEGER" | "BOOLEAN" => Value::BigInt(row.try_get::<i64, _>(index)?),
		"REAL" | "NUMERIC" => Value::Double(row.try_get::<f64, _>(index)?),
		"BLOB" => Value::Bytes(row.try_get::<Vec<u8>, _>(index)?),
		_ => Value::String(row.try_get::<String, _>(index)?),
	};
	Ok(value)
}

fn convert_row(sqlite_row: &SqliteRow) -> Result<Row> {
	let mut row = Row::new();
	for column in sqlite_row.columns() {
		row.push(column.name(), decode_value(sqlite_row, column.ordinal())?);
	}
	Ok(row)
}

fn first_value(row: Option<SqliteRow>) -> Result<Value> {
	match row {
		Some(row) if !row.is_empty() => decode_value(&row, 0),
		_ => Ok(Value::Null),
	}
}

/// SQLite executor over a sqlx pool.
///
/// In-memory databases live as long as their connection, so they get a
/// single connection that is never recycled.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
	pool: SqlitePool,
	table_prefix: String,
}

impl SqliteExecutor {
	pub async fn connect(url: &str, table_prefix: impl Into<String>, max_connections: u32) -> Result<Self> {
		let in_memory = url.contains(":memory:") || url.contains("mode=memory");
		let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
		let mut pool_options = SqlitePoolOptions::new();
		pool_options = if in_memory {
			pool_options.max_connections(1).idle_timeout(None).max_lifetime(None)
		} else {
			pool_options.max_connections(max_connections.max(1))
		};
		let pool = pool_options.connect_with(options).await?;
		tracing::debug!(url, in_memory, "connected to SQLite");
		Ok(Self::from_pool(pool, table_prefix))
	}

	/// Private in-memory database
	pub async fn in_memory(table_prefix: impl Into<String>) -> Result<Self> {
		Self::connect("sqlite::memory:", table_prefix, 1).await
	}

	pub fn from_pool(pool: SqlitePool, table_prefix: impl Into<String>) -> Self {
		Self {
			pool,
			table_prefix: table_prefix.into(),
		}
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}
}

#[async_trait]
impl Executor for SqliteExecutor {
	fn kind(&self) -> DatabaseKind {
		DatabaseKind::Sqlite
	}

	fn table_prefix(&self) -> &str {
		&self.table_prefix
	}

	async fn execute(&self, sql: &str, parameters: &[Parameter]) -> Result<u64> {
		let prepared = self.prepare(sql, parameters);
		tracing::debug!(sql = %prepared.sql, "execute");
		let result = build(&prepared).execute(&self.pool).await?;
		Ok(result.rows_affected())
	}

	async fn execute_scalar(&self, sql: &str, parameters: &[Parameter]) -> Result<Value> {
		let prepared = self.prepare(sql, parameters);
		tracing::debug!(sql = %prepared.sql, "execute_scalar");
		let row = build(&prepared).fetch_optional(&self.pool).await?;
		first_value(row)
	}

	async fn fetch_all(&self, sql: &str, parameters: &[Parameter]) -> Result<Vec<Row>> {
		let prepared = self.prepare(sql, parameters);
		tracing::debug!(sql = %prepared.sql, "fetch_all");
		let rows = build(&prepared).fetch_all(&self.pool).await?;
		rows.iter().map(convert_row).collect()
	}

	async fn begin(&self) -> Result<Box<dyn Transaction>> {
		let tx = self.pool.begin().await?;
		Ok(Box::new(SqliteTransaction {
			tx: Some(tx),
			table_prefix: self.table_prefix.clone(),
		}))
	}

	async fn execute_script_scalar(&self, sql: &str, parameters: &[Parameter]) -> Result<Value> {
		let mut conn = self.pool.acquire().await?;
		let mut last = Value::Null;
		for statement in split_statements(sql) {
			let prepared = self.prepare(&statement, parameters);
			tracing::debug!(sql = %prepared.sql, "script statement");
			let row = build(&prepared).fetch_optional(&mut *conn).await?;
			last = first_value(row)?;
		}
		Ok(last)
	}
}

/// SQLite transaction
pub struct SqliteTransaction {
	tx: Option<sqlx::Transaction<'static, Sqlite>>,
	table_prefix: String,
}

impl SqliteTransaction {
	fn tx(&mut self) -> Result<&mut sqlx::Transaction<'static, Sqlite>> {
		self.tx
			.as_mut()
			.ok_or_else(|| DatabaseError::Configuration("transaction already consumed".to_string()))
	}

	fn prepare(&self, sql: &str, parameters: &[Parameter]) -> PreparedStatement {
		PreparedStatement::new(DatabaseKind::Sqlite, &self.table_prefix, sql, parameters)
	}
}

#[async_trait]
impl Transaction for SqliteTransaction {
	async fn execute(&mut self, sql: &str, parameters: &[Parameter]) -> Result<u64> {
		let prepared = self.prepare(sql, parameters);
		tracing::debug!(sql = %prepared.sql, "execute in transaction");
		let tx = self.tx()?;
		let result = build(&prepared).execute(&mut **tx).await?;
		Ok(result.rows_affected())
	}

	async fn execute_scalar(&mut self, sql: &str, parameters: &[Parameter]) -> Result<Value> {
		let prepared = self.prepare(sql, parameters);
		let tx = self.tx()?;
		let row = build(&prepared).fetch_optional(&mut **tx).await?;
		first_value(row)
	}

	async fn fetch_all(&mut self, sql: &str, parameters: &[Parameter]) -> Result<Vec<Row>> {
		let prepared = self.prepare(sql, parameters);
		let tx = self.tx()?;
		let rows = build(&prepared).fetch_all(&mut **tx).await?;
		rows.iter().map(convert_row).collect()
	}

	async fn commit(mut self: Box<Self>) -> Result<()> {
		let tx = self
			.tx
			.take()
			.ok_or_else(|| DatabaseError::Configuration("transaction already consumed".to_string()))?;
		tx.commit().await?;
		Ok(())
	}

	async fn rollback(mut self: Box<Self>) -> Result<()> {
		let tx = self
			.tx
			.take()
			.ok_or_else(|| DatabaseError::Configuration("transaction already consumed".to_string()))?;
		tx.rollback().await?;
		Ok(())
	}
}
