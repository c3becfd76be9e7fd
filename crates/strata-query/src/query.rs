//! Query SQL generation.
//!
//! [`QuerySql`] describes a `SELECT` whose clauses are already compiled; the
//! [`QuerySqlGenerator`] of a dialect turns it into ready-to-execute SQL, each
//! statement carrying its terminator. Most statements share one shape; the
//! dialect generators override the paging idiom, the row limit and the
//! reorder script.

use std::fmt;
use std::sync::Arc;

use crate::backend::{CompiledSql, Parameter, SqlHelper, SqlWriter, TypeMapper};
use crate::error::{QueryError, Result};
use crate::metadata::{EntityType, Property};
use crate::value::Value;

mod builder;
mod mysql;
mod sql_server;
mod sqlite;

pub use builder::{JoinKind, QueryBuilder};
pub use mysql::MySqlQuerySqlGenerator;
pub use sql_server::SqlServerQuerySqlGenerator;
pub use sqlite::SqliteQuerySqlGenerator;

/// Page size used when a paged query leaves it unset.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Compiled clauses of a `SELECT`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySql {
	pub fields: String,
	pub from: String,
	pub where_clause: Option<String>,
	pub order_by: Option<String>,
	pub distinct: bool,
	/// Operand of `COUNT(..)` in the count statement of a paged query.
	pub aggregation: String,
	/// 1-based
	pub page_index: usize,
	pub page_size: usize,
	/// Row cap for [`QuerySqlGenerator::size_query`].
	pub size: usize,
	pub parameters: Vec<Parameter>,
}

impl QuerySql {
	pub fn new(from: impl Into<String>) -> Self {
		Self {
			fields: "*".to_string(),
			from: from.into(),
			where_clause: None,
			order_by: None,
			distinct: false,
			aggregation: "1".to_string(),
			page_index: 1,
			page_size: DEFAULT_PAGE_SIZE,
			size: 0,
			parameters: Vec::new(),
		}
	}

	pub fn effective_page_size(&self) -> usize {
		if self.page_size == 0 {
			DEFAULT_PAGE_SIZE
		} else {
			self.page_size
		}
	}

	pub fn offset(&self) -> usize {
		self.page_index.saturating_sub(1).saturating_mul(self.effective_page_size())
	}

	/// Counting the constant marker under `DISTINCT` would always yield 1.
	pub fn count_distinct(&self) -> bool {
		self.distinct && !matches!(self.aggregation.trim(), "1" | "*")
	}
}

/// Page data and total-count statements of a paged query.
///
/// Both must be executed back-to-back and read in this order.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedSql {
	pub data: CompiledSql,
	pub count: CompiledSql,
}

/// Side of the adjacent row in a reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
	/// Swap with the next higher ordering value.
	Up,
	/// Swap with the next lower ordering value.
	Down,
}

impl MoveDirection {
	pub fn comparison(&self) -> &'static str {
		match self {
			MoveDirection::Up => ">",
			MoveDirection::Down => "<",
		}
	}

	/// Ordering that puts the adjacent row first.
	pub fn ordering(&self) -> &'static str {
		match self {
			MoveDirection::Up => "ASC",
			MoveDirection::Down => "DESC",
		}
	}
}

/// Reorder request: swap the ordering value of the row identified by `key`
/// with its neighbour in `direction`.
#[derive(Debug, Clone)]
pub struct MoveRequest {
	pub entity: Arc<EntityType>,
	pub direction: MoveDirection,
	/// Property holding the ordering value.
	pub order_property: String,
	/// Primary-key value of the row to move, bound under its own name.
	pub key: Parameter,
	/// Restricts the neighbour search, e.g. to rows of the same parent.
	pub grouping: Option<CompiledSql>,
}

impl MoveRequest {
	pub fn new(
		entity: Arc<EntityType>,
		direction: MoveDirection,
		order_property: impl Into<String>,
		key: Parameter,
	) -> Self {
		Self {
			entity,
			direction,
			order_property: order_property.into(),
			key,
			grouping: None,
		}
	}

	pub fn grouping(mut self, grouping: CompiledSql) -> Self {
		self.grouping = Some(grouping);
		self
	}
}

/// How the executor reads the result of a reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
	/// The script selects 1 when rows were swapped, 0 otherwise.
	Scalar,
	/// A single statement; the swap happened when this many rows changed.
	RowsAffected(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveStatement {
	pub sql: String,
	pub parameters: Vec<Parameter>,
	pub outcome: MoveOutcome,
}

/// Delimited names used by a reorder.
pub(crate) struct MoveTarget<'a> {
	pub table: String,
	pub key: String,
	pub order: String,
	pub key_property: &'a Property,
	pub order_property: &'a Property,
}

impl<'a> MoveTarget<'a> {
	pub(crate) fn resolve(request: &'a MoveRequest, helper: &dyn SqlHelper) -> Result<Self> {
		let entity = request.entity.as_ref();
		let key = entity.require_primary_key()?;
		let [key_property] = key.properties() else {
			return Err(QueryError::InvalidExpression(format!(
				"reordering `{}` requires a single-column primary key",
				entity.type_name()
			)));
		};
		let order_property = entity.property(&request.order_property)?;
		Ok(Self {
			table: helper.delimit_identifier(entity.table())?,
			key: helper.delimit_identifier(key_property.column())?,
			order: helper.delimit_identifier(order_property.column())?,
			key_property,
			order_property,
		})
	}

	/// `AND (<grouping>)`, or nothing.
	pub(crate) fn grouping_clause(request: &MoveRequest) -> String {
		match &request.grouping {
			Some(grouping) => format!(" AND ({})", grouping.sql),
			None => String::new(),
		}
	}

	pub(crate) fn parameters(request: &MoveRequest) -> Result<Vec<Parameter>> {
		let mut writer = SqlWriter::new();
		writer.add_parameter(request.key.clone())?;
		if let Some(grouping) = &request.grouping {
			writer.extend_parameters(grouping.parameters.iter().cloned())?;
		}
		Ok(writer.finish().parameters)
	}
}

/// Statement shapes over [`QuerySql`] and entity metadata.
pub trait QuerySqlGenerator: Send + Sync + fmt::Debug {
	fn helper(&self) -> &dyn SqlHelper;

	fn type_mapper(&self) -> &dyn TypeMapper;

	/// Row cap placed after `SELECT`, e.g. `TOP 10`.
	fn top_clause(&self, _count: usize) -> Option<String> {
		None
	}

	/// Row cap placed at the end of the statement, e.g. `LIMIT 10`.
	fn limit_clause(&self, count: usize) -> Option<String> {
		Some(format!("LIMIT {}", count))
	}

	/// Ordering and window of a page.
	fn paging_clause(&self, order_by: Option<&str>, offset: usize, size: usize) -> String {
		match order_by {
			Some(order_by) => format!("ORDER BY {} LIMIT {}, {}", order_by, offset, size),
			None => format!("LIMIT {}, {}", offset, size),
		}
	}

	/// `SELECT [DISTINCT] [TOP n] fields FROM .. [WHERE ..]`
	fn select_head(&self, writer: &mut SqlWriter, sql: &QuerySql, limit: Option<usize>) {
		writer.push("SELECT");
		if sql.distinct {
			writer.push_keyword("DISTINCT");
		}
		if let Some(limit) = limit
			&& let Some(top) = self.top_clause(limit)
		{
			writer.push_keyword(&top);
		}
		writer.push_keyword(&sql.fields);
		writer.push_keyword("FROM");
		writer.push_keyword(&sql.from);
		if let Some(where_clause) = &sql.where_clause {
			writer.push_keyword("WHERE");
			writer.push_keyword(where_clause);
		}
	}

	fn select(&self, sql: &QuerySql, limit: Option<usize>) -> Result<CompiledSql> {
		let mut writer = SqlWriter::new();
		self.select_head(&mut writer, sql, limit);
		if let Some(order_by) = &sql.order_by {
			writer.push_keyword("ORDER BY");
			writer.push_keyword(order_by);
		}
		if let Some(limit) = limit
			&& let Some(clause) = self.limit_clause(limit)
		{
			writer.push_keyword(&clause);
		}
		writer.push(self.helper().statement_terminator());
		writer.extend_parameters(sql.parameters.iter().cloned())?;
		Ok(writer.finish())
	}

	/// Whether `entity` has any row.
	fn any(&self, entity: &EntityType) -> Result<CompiledSql> {
		let mut sql = QuerySql::new(self.helper().delimit_identifier(entity.table())?);
		sql.fields = "1".to_string();
		self.select(&sql, Some(1))
	}

	/// Whether any row of `entity` matches `predicate`.
	fn any_where(&self, entity: &EntityType, predicate: &CompiledSql) -> Result<CompiledSql> {
		let mut sql = QuerySql::new(self.helper().delimit_identifier(entity.table())?);
		sql.fields = "1".to_string();
		sql.where_clause = Some(predicate.sql.clone());
		sql.parameters = predicate.parameters.clone();
		self.select(&sql, Some(1))
	}

	fn query(&self, sql: &QuerySql) -> Result<CompiledSql> {
		self.select(sql, None)
	}

	fn page_query(&self, sql: &QuerySql) -> Result<PagedSql> {
		let mut data = SqlWriter::new();
		self.select_head(&mut data, sql, None);
		data.push_keyword(&self.paging_clause(
			sql.order_by.as_deref(),
			sql.offset(),
			sql.effective_page_size(),
		));
		data.push(self.helper().statement_terminator());
		data.extend_parameters(sql.parameters.iter().cloned())?;

		let mut count = SqlWriter::new();
		count.push("SELECT COUNT(");
		if sql.count_distinct() {
			count.push("DISTINCT ");
		}
		count.push(&sql.aggregation);
		count.push(") FROM ");
		count.push(&sql.from);
		if let Some(where_clause) = &sql.where_clause {
			count.push_keyword("WHERE");
			count.push_keyword(where_clause);
		}
		count.push(self.helper().statement_terminator());
		count.extend_parameters(sql.parameters.iter().cloned())?;

		Ok(PagedSql {
			data: data.finish(),
			count: count.finish(),
		})
	}

	/// Fails when no row cap is set; a zero cap would select nothing.
	fn size_query(&self, sql: &QuerySql) -> Result<CompiledSql> {
		if sql.size == 0 {
			return Err(QueryError::InvalidExpression(
				"size query requires a row cap greater than zero".to_string(),
			));
		}
		self.select(sql, Some(sql.size))
	}

	/// `SELECT *` of one row by primary key, `key` in key order.
	fn select_by_key(&self, entity: &EntityType, key: &[Value]) -> Result<CompiledSql> {
		let helper = self.helper();
		let properties = entity.require_primary_key()?.properties();
		if properties.len() != key.len() {
			return Err(QueryError::InvalidExpression(format!(
				"`{}` has a {}-column primary key, {} values given",
				entity.type_name(),
				properties.len(),
				key.len()
			)));
		}
		let mut writer = SqlWriter::new();
		writer.push("SELECT * FROM ");
		writer.push_identifier(entity.table(), helper)?;
		writer.push(" WHERE ");
		writer.push_list(properties.iter().zip(key), " AND ", |w, (property, value)| {
			w.push_identifier(property.column(), helper)?;
			w.push(" = ");
			w.push_parameter(property.name(), value, helper)
		})?;
		writer.push(helper.statement_terminator());
		Ok(writer.finish())
	}

	/// `INSERT` of one row; `values` follows `entity.properties()`.
	///
	/// Identity and row-version columns are generated by the engine and
	/// skipped.
	fn insert(&self, entity: &EntityType, values: &[Value]) -> Result<CompiledSql> {
		let helper = self.helper();
		let columns: Vec<_> = entity
			.properties()
			.iter()
			.zip(values)
			.filter(|(p, _)| !p.is_identity() && !p.is_row_version())
			.collect();
		let mut writer = SqlWriter::new();
		writer.push("INSERT INTO ");
		writer.push_identifier(entity.table(), helper)?;
		writer.push(" (");
		writer.push_list(columns.iter(), ", ", |w, (property, _)| {
			w.push_identifier(property.column(), helper)
		})?;
		writer.push(") VALUES (");
		writer.push_list(columns.iter(), ", ", |w, (property, value)| {
			w.push_parameter(property.name(), value, helper)
		})?;
		writer.push(")");
		writer.push(helper.statement_terminator());
		Ok(writer.finish())
	}

	/// `UPDATE` of one row by primary key; non-updatable columns are skipped.
	fn update(&self, entity: &EntityType, values: &[Value]) -> Result<CompiledSql> {
		let helper = self.helper();
		let key = entity.require_primary_key()?;
		let is_key = |name: &str| key.properties().iter().any(|k| k.name() == name);
		let rows: Vec<_> = entity.properties().iter().zip(values).collect();
		let assignments: Vec<_> = rows
			.iter()
			.filter(|(p, _)| p.is_updatable() && !is_key(p.name()))
			.collect();
		if assignments.is_empty() {
			return Err(QueryError::InvalidExpression(format!(
				"`{}` has no updatable columns",
				entity.type_name()
			)));
		}
		let mut writer = SqlWriter::new();
		writer.push("UPDATE ");
		writer.push_identifier(entity.table(), helper)?;
		writer.push(" SET ");
		writer.push_list(assignments, ", ", |w, (property, value)| {
			w.push_identifier(property.column(), helper)?;
			w.push(" = ");
			w.push_parameter(property.name(), value, helper)
		})?;
		writer.push(" WHERE ");
		writer.push_list(rows.iter().filter(|(p, _)| is_key(p.name())), " AND ", |w, (property, value)| {
			w.push_identifier(property.column(), helper)?;
			w.push(" = ");
			w.push_parameter(property.name(), value, helper)
		})?;
		writer.push(helper.statement_terminator());
		Ok(writer.finish())
	}

	/// `DELETE` of one row by primary key.
	fn delete(&self, entity: &EntityType, values: &[Value]) -> Result<CompiledSql> {
		let helper = self.helper();
		let key = entity.require_primary_key()?;
		let mut writer = SqlWriter::new();
		writer.push("DELETE FROM ");
		writer.push_identifier(entity.table(), helper)?;
		writer.push(" WHERE ");
		let key_columns = entity
			.properties()
			.iter()
			.zip(values)
			.filter(|(p, _)| key.properties().iter().any(|k| k.name() == p.name()));
		writer.push_list(key_columns, " AND ", |w, (property, value)| {
			w.push_identifier(property.column(), helper)?;
			w.push(" = ");
			w.push_parameter(property.name(), value, helper)
		})?;
		writer.push(helper.statement_terminator());
		Ok(writer.finish())
	}

	/// Reorder-by-adjacent-swap.
	fn move_rows(&self, request: &MoveRequest) -> Result<MoveStatement>;
}
