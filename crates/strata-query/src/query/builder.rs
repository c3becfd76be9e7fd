use std::sync::Arc;

use crate::backend::{CompiledSql, SqlWriter};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::expr::{EntityRef, Expression};
use crate::metadata::{Entity, EntityType, get_entity_type};

use super::{PagedSql, QuerySql};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
	Inner,
	Left,
}

impl JoinKind {
	fn as_sql(&self) -> &'static str {
		match self {
			JoinKind::Inner => "INNER JOIN",
			JoinKind::Left => "LEFT JOIN",
		}
	}
}

#[derive(Debug, Clone)]
struct Join {
	kind: JoinKind,
	entity: Arc<EntityType>,
	alias: String,
	on: Expression,
}

/// Fluent builder for a [`QuerySql`] over one entity.
///
/// Every clause is compiled with the builder's dialect when [`build`] runs;
/// parameters of all clauses are merged into one list.
///
/// [`build`]: QueryBuilder::build
#[derive(Debug, Clone)]
pub struct QueryBuilder<'d> {
	dialect: &'d Dialect,
	entity: Arc<EntityType>,
	alias: Option<String>,
	fields: Vec<Expression>,
	filter: Option<Expression>,
	joins: Vec<Join>,
	order_by: Vec<Expression>,
	distinct: bool,
	aggregation: Option<Expression>,
	page_index: usize,
	page_size: usize,
	size: usize,
}

impl<'d> QueryBuilder<'d> {
	pub fn new(dialect: &'d Dialect, entity: Arc<EntityType>) -> Self {
		Self {
			dialect,
			entity,
			alias: None,
			fields: Vec::new(),
			filter: None,
			joins: Vec::new(),
			order_by: Vec::new(),
			distinct: false,
			aggregation: None,
			page_index: 1,
			page_size: 0,
			size: 0,
		}
	}

	/// Alias of the root table, needed when joining.
	pub fn alias(mut self, alias: impl Into<String>) -> Self {
		self.alias = Some(alias.into());
		self
	}

	/// Add a projection item; with none, all columns are selected.
	pub fn select(mut self, field: Expression) -> Self {
		self.fields.push(field);
		self
	}

	/// Add a predicate, combined with earlier ones by `AND`.
	pub fn filter(mut self, predicate: Expression) -> Self {
		self.filter = Some(match self.filter.take() {
			Some(existing) => existing.and(predicate),
			None => predicate,
		});
		self
	}

	/// Join `E` by an equality predicate.
	pub fn join<E: Entity>(mut self, kind: JoinKind, alias: impl Into<String>, on: Expression) -> Self {
		self.joins.push(Join {
			kind,
			entity: get_entity_type::<E>(),
			alias: alias.into(),
			on,
		});
		self
	}

	/// Add an ordering key; plain expressions sort ascending.
	pub fn order_by(mut self, order: Expression) -> Self {
		let order = match order {
			Expression::Order { .. } => order,
			other => other.asc(),
		};
		self.order_by.push(order);
		self
	}

	pub fn distinct(mut self) -> Self {
		self.distinct = true;
		self
	}

	/// Operand of the count statement of a paged query.
	pub fn aggregate(mut self, aggregation: Expression) -> Self {
		self.aggregation = Some(aggregation);
		self
	}

	pub fn page(mut self, page_index: usize, page_size: usize) -> Self {
		self.page_index = page_index;
		self.page_size = page_size;
		self
	}

	/// Row cap for [`size_query`](Self::size_query).
	pub fn size(mut self, size: usize) -> Self {
		self.size = size;
		self
	}

	fn compile_into(&self, expression: &Expression, parameters: &mut SqlWriter) -> Result<String> {
		let CompiledSql { sql, parameters: bound } = self.dialect.compile(expression)?;
		parameters.extend_parameters(bound)?;
		Ok(sql)
	}

	fn compile_from(&self, parameters: &mut SqlWriter) -> Result<String> {
		let helper = self.dialect.helper();
		let mut from = SqlWriter::new();
		from.push_identifier(self.entity.table(), helper)?;
		if let Some(alias) = &self.alias {
			from.push(" AS ");
			from.push_identifier(alias, helper)?;
		}
		for join in &self.joins {
			from.push_keyword(join.kind.as_sql());
			from.push_space();
			from.push_identifier(join.entity.table(), helper)?;
			from.push(" AS ");
			from.push_identifier(&join.alias, helper)?;
			from.push(" ON ");
			let on = self.compile_into(&join.on, parameters)?;
			from.push(&on);
		}
		Ok(from.finish().sql)
	}

	/// Compile every clause into a [`QuerySql`].
	pub fn build(&self) -> Result<QuerySql> {
		let mut parameters = SqlWriter::new();
		let fields = if self.fields.is_empty() {
			Expression::Entity(EntityRef {
				entity: self.entity.clone(),
				alias: self.alias.clone(),
			})
		} else {
			Expression::List(self.fields.clone())
		};
		let mut sql = QuerySql::new(String::new());
		sql.fields = self.compile_into(&fields, &mut parameters)?;
		sql.from = self.compile_from(&mut parameters)?;
		if let Some(filter) = &self.filter {
			sql.where_clause = Some(self.compile_into(filter, &mut parameters)?);
		}
		if !self.order_by.is_empty() {
			let order = Expression::List(self.order_by.clone());
			sql.order_by = Some(self.compile_into(&order, &mut parameters)?);
		}
		if let Some(aggregation) = &self.aggregation {
			sql.aggregation = self.compile_into(aggregation, &mut parameters)?;
		}
		sql.distinct = self.distinct;
		sql.page_index = self.page_index;
		sql.page_size = self.page_size;
		sql.size = self.size;
		sql.parameters = parameters.finish().parameters;
		Ok(sql)
	}

	pub fn query(&self) -> Result<CompiledSql> {
		self.dialect.query(&self.build()?)
	}

	pub fn page_query(&self) -> Result<PagedSql> {
		self.dialect.page_query(&self.build()?)
	}

	pub fn size_query(&self) -> Result<CompiledSql> {
		self.dialect.size_query(&self.build()?)
	}
}
