//! MySQL executor

use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{Column, Executor as _, MySql, Row as _, TypeInfo, ValueRef};
use strata_query::{DatabaseKind, Parameter, Value};

use super::{Executor, PreparedStatement, Row, Transaction, split_statements};
use crate::error::{DatabaseError, Result};

type MySqlQuery<'q> = sqlx::query::Query<'q, MySql, MySqlArguments>;

fn bind_value<'q>(query: MySqlQuery<'q>, value: &Value) -> MySqlQuery<'q> {
	match value {
		Value::Null => query.bind(None::<i32>),
		Value::Bool(v) => query.bind(*v),
		Value::TinyInt(v) => query.bind(*v),
		Value::SmallInt(v) => query.bind(*v),
		Value::Int(v) => query.bind(*v),
		Value::BigInt(v) => query.bind(*v),
		Value::TinyUnsigned(v) => query.bind(*v),
		Value::SmallUnsigned(v) => query.bind(*v),
		Value::Unsigned(v) => query.bind(*v),
		Value::BigUnsigned(v) => query.bind(*v),
		Value::Float(v) => query.bind(*v),
		Value::Double(v) => query.bind(*v),
		Value::Decimal(v) => query.bind(*v),
		Value::Enum { discriminant, .. } => query.bind(*discriminant),
		Value::Char(c) => query.bind(c.to_string()),
		Value::String(s) | Value::TypeName(s) => query.bind(s.clone()),
		Value::Json(json) => query.bind(json.to_string()),
		Value::Bytes(bytes) => query.bind(bytes.clone()),
		Value::Date(d) => query.bind(*d),
		Value::Time(t) => query.bind(*t),
		Value::DateTime(dt) => query.bind(*dt),
		// datetime(6) has no zone; store the UTC instant
		Value::DateTimeOffset(dt) => query.bind(dt.naive_utc()),
		Value::Uuid(id) => query.bind(id.hyphenated().to_string()),
	}
}

fn build(prepared: &PreparedStatement) -> MySqlQuery<'_> {
	prepared.values.iter().fold(sqlx::query(&prepared.sql), bind_value)
}

fn decode_text(row: &MySqlRow, index: usize) -> Result<Value> {
	if let Ok(text) = row.try_get::<String, _>(index) {
		return Ok(Value::String(text));
	}
	// binary collations come back as blobs
	let bytes = row.try_get::<Vec<u8>, _>(index)?;
	Ok(match String::from_utf8(bytes) {
		Ok(text) => Value::String(text),
		Err(e) => Value::Bytes(e.into_bytes()),
	})
}

fn decode_value(row: &MySqlRow, index: usize) -> Result<Value> {
	let raw = row.try_get_raw(index)?;
	if raw.is_null() {
		return Ok(Value::Null);
	}
	let type_name = raw.type_info().name().to_ascii_uppercase();
	let value = match type_name.as_str() {
		"BOOLEAN" => Value::Bool(row.try_get::<bool, _>(index)?),
		"TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
			Value::BigInt(row.try_get::<i64, _>(index)?)
		}
		name if name.ends_with("UNSIGNED") => Value::BigUnsigned(row.try_get::<u64, _>(index)?),
		"FLOAT" => Value::Float(row.try_get::<f32, _>(index)?),
		"DOUBLE" => Value::Double(row.try_get::<f64, _>(index)?),
		"DECIMAL" => Value::Decimal(row.try_get(index)?),
		"DATE" => Value::Date(row.try_get(index)?),
		"TIME" => Value::Time(row.try_get(index)?),
		"DATETIME" | "TIMESTAMP" => Value::DateTime(row.try_get(index)?),
		"BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
			Value::Bytes(row.try_get::<Vec<u8>, _>(index)?)
		}
		_ => decode_text(row, index)?,
	};
	Ok(value)
}

fn convert_row(mysql_row: &MySqlRow) -> Result<Row> {
	let mut row = Row::new();
	for column in mysql_row.columns() {
		row.push(column.name(), decode_value(mysql_row, column.ordinal())?);
	}
	Ok(row)
}

fn first_value(row: Option<MySqlRow>) -> Result<Value> {
	match row {
		Some(row) if !row.is_empty() => decode_value(&row, 0),
		_ => Ok(Value::Null),
	}
}

/// MySQL executor over a sqlx pool.
#[derive(Debug, Clone)]
pub struct MySqlExecutor {
	pool: MySqlPool,
	table_prefix: String,
}

impl MySqlExecutor {
	pub async fn connect(url: &str, table_prefix: impl Into<String>, max_connections: u32) -> Result<Self> {
		let pool = MySqlPoolOptions::new()
			.max_connections(max_connections.max(1))
			.connect(url)
			.await?;
		tracing::debug!("connected to MySQL");
		Ok(Self::from_pool(pool, table_prefix))
	}

	pub fn from_pool(pool: MySqlPool, table_prefix: impl Into<String>) -> Self {
		Self {
			pool,
			table_prefix: table_prefix.into(),
		}
	}

	pub fn pool(&self) -> &MySqlPool {
		&self.pool
	}

	async fn run_script(
		&self,
		conn: &mut PoolConnection<MySql>,
		sql: &str,
		parameters: &[Parameter],
	) -> Result<Value> {
		let mut last = Value::Null;
		for statement in split_statements(sql) {
			let prepared = self.prepare(&statement, parameters);
			tracing::debug!(sql = %prepared.sql, "script statement");
			// Transaction control is not preparable; send bare statements as text.
			let row = if prepared.values.is_empty() {
				(&mut **conn).fetch_optional(prepared.sql.as_str()).await?
			} else {
				build(&prepared).fetch_optional(&mut **conn).await?
			};
			last = first_value(row)?;
		}
		Ok(last)
	}
}

#[async_trait]
impl Executor for MySqlExecutor {
	fn kind(&self) -> DatabaseKind {
		DatabaseKind::MySql
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
		Ok(Box::new(MySqlTransaction {
			tx: Some(tx),
			table_prefix: self.table_prefix.clone(),
		}))
	}

	/// A failing statement rolls back whatever the script had opened on the
	/// connection before the error is returned.
	async fn execute_script_scalar(&self, sql: &str, parameters: &[Parameter]) -> Result<Value> {
		let mut conn = self.pool.acquire().await?;
		match self.run_script(&mut conn, sql, parameters).await {
			Ok(value) => Ok(value),
			Err(e) => {
				if let Err(rollback) = (&mut *conn).execute("ROLLBACK").await {
					tracing::warn!(error = %rollback, "rollback after script failure failed");
					// the connection's session state is unknown
					conn.close_on_drop();
				}
				Err(e)
			}
		}
	}
}

/// MySQL transaction
pub struct MySqlTransaction {
	tx: Option<sqlx::Transaction<'static, MySql>>,
	table_prefix: String,
}

impl MySqlTransaction {
	fn tx(&mut self) -> Result<&mut sqlx::Transaction<'static, MySql>> {
		self.tx
			.as_mut()
			.ok_or_else(|| DatabaseError::Configuration("transaction already consumed".to_string()))
	}

	fn prepare(&self, sql: &str, parameters: &[Parameter]) -> PreparedStatement {
		PreparedStatement::new(DatabaseKind::MySql, &self.table_prefix, sql, parameters)
	}
}

#[async_trait]
impl Transaction for MySqlTransaction {
	async fn execute(&mut self, sql: &str, parameters: &[Parameter]) -> Result<u64> {
		let prepared = self.prepare(sql, parameters);
		tracing::debug!(sql = %prepared.sql, "execute in transaction");
		let tx = self.tx()?;
		let result = if prepared.values.is_empty() {
			// DDL goes over the text protocol
			(&mut **tx).execute(prepared.sql.as_str()).await?
		} else {
			build(&prepared).execute(&mut **tx).await?
		};
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
