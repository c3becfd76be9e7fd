//! Dialect composition.
//!
//! A [`Dialect`] is selected once (usually from [`DatabaseKind`]) and bundles
//! everything dialect-specific: SQL helper, type mapper, translator registry,
//! visitor factory and query generator. It is cheap to clone.

use std::sync::Arc;

use crate::backend::{
	CompiledSql, DatabaseKind, MySqlSqlHelper, MySqlTypeMapper, SqlHelper, SqlServerSqlHelper,
	SqlServerTypeMapper, SqliteSqlHelper, SqliteTypeMapper, TypeMapper,
};
use crate::compiler::{
	ExpressionVisitor, MySqlExpressionVisitor, SqlServerExpressionVisitor, SqliteExpressionVisitor,
};
use crate::error::Result;
use crate::expr::Expression;
use crate::metadata::{Entity, EntityType, get_entity_type};
use crate::query::{
	MoveRequest, MoveStatement, MySqlQuerySqlGenerator, PagedSql, QueryBuilder, QuerySql,
	QuerySqlGenerator, SqlServerQuerySqlGenerator, SqliteQuerySqlGenerator,
};
use crate::translators::TranslatorRegistry;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Dialect {
	kind: DatabaseKind,
	helper: Arc<dyn SqlHelper>,
	type_mapper: Arc<dyn TypeMapper>,
	translators: Arc<TranslatorRegistry>,
	query_generator: Arc<dyn QuerySqlGenerator>,
}

impl Dialect {
	pub fn sql_server() -> Self {
		Self {
			kind: DatabaseKind::SqlServer,
			helper: Arc::new(SqlServerSqlHelper),
			type_mapper: Arc::new(SqlServerTypeMapper),
			translators: Arc::new(TranslatorRegistry::for_kind(DatabaseKind::SqlServer)),
			query_generator: Arc::new(SqlServerQuerySqlGenerator::new()),
		}
	}

	pub fn mysql() -> Self {
		Self {
			kind: DatabaseKind::MySql,
			helper: Arc::new(MySqlSqlHelper),
			type_mapper: Arc::new(MySqlTypeMapper),
			translators: Arc::new(TranslatorRegistry::for_kind(DatabaseKind::MySql)),
			query_generator: Arc::new(MySqlQuerySqlGenerator::new()),
		}
	}

	pub fn sqlite() -> Self {
		Self {
			kind: DatabaseKind::Sqlite,
			helper: Arc::new(SqliteSqlHelper),
			type_mapper: Arc::new(SqliteTypeMapper),
			translators: Arc::new(TranslatorRegistry::for_kind(DatabaseKind::Sqlite)),
			query_generator: Arc::new(SqliteQuerySqlGenerator::new()),
		}
	}

	pub fn for_kind(kind: DatabaseKind) -> Self {
		match kind {
			DatabaseKind::SqlServer => Self::sql_server(),
			DatabaseKind::MySql => Self::mysql(),
			DatabaseKind::Sqlite => Self::sqlite(),
		}
	}

	/// Replace the translator registry, e.g. to register application rules.
	pub fn with_translators(mut self, translators: TranslatorRegistry) -> Self {
		self.translators = Arc::new(translators);
		self
	}

	pub fn kind(&self) -> DatabaseKind {
		self.kind
	}

	pub fn helper(&self) -> &dyn SqlHelper {
		self.helper.as_ref()
	}

	pub fn type_mapper(&self) -> &dyn TypeMapper {
		self.type_mapper.as_ref()
	}

	pub fn translators(&self) -> &TranslatorRegistry {
		&self.translators
	}

	pub fn query_generator(&self) -> &dyn QuerySqlGenerator {
		self.query_generator.as_ref()
	}

	/// A fresh visitor for one compilation.
	pub fn create_visitor(&self) -> Box<dyn ExpressionVisitor<'_> + '_> {
		match self.kind {
			DatabaseKind::SqlServer => Box::new(SqlServerExpressionVisitor::new(self)),
			DatabaseKind::MySql => Box::new(MySqlExpressionVisitor::new(self)),
			DatabaseKind::Sqlite => Box::new(SqliteExpressionVisitor::new(self)),
		}
	}

	/// Compile an expression into SQL text and its ordered parameters.
	pub fn compile(&self, expression: &Expression) -> Result<CompiledSql> {
		let mut visitor = self.create_visitor();
		visitor.visit(expression)?;
		Ok(visitor.finish())
	}

	/// Start a `SELECT` over `E`.
	pub fn select<E: Entity>(&self) -> QueryBuilder<'_> {
		QueryBuilder::new(self, get_entity_type::<E>())
	}

	pub fn any(&self, entity: &EntityType, predicate: Option<&Expression>) -> Result<CompiledSql> {
		match predicate {
			Some(predicate) => {
				let predicate = self.compile(predicate)?;
				self.query_generator.any_where(entity, &predicate)
			}
			None => self.query_generator.any(entity),
		}
	}

	pub fn query(&self, sql: &QuerySql) -> Result<CompiledSql> {
		self.query_generator.query(sql)
	}

	pub fn page_query(&self, sql: &QuerySql) -> Result<PagedSql> {
		self.query_generator.page_query(sql)
	}

	pub fn size_query(&self, sql: &QuerySql) -> Result<CompiledSql> {
		self.query_generator.size_query(sql)
	}

	pub fn move_rows(&self, request: &MoveRequest) -> Result<MoveStatement> {
		self.query_generator.move_rows(request)
	}

	pub fn select_by_key<E: Entity>(&self, key: &[Value]) -> Result<CompiledSql> {
		self.query_generator.select_by_key(&get_entity_type::<E>(), key)
	}

	pub fn insert<E: Entity>(&self, entity: &E) -> Result<CompiledSql> {
		let entity_type = get_entity_type::<E>();
		self.query_generator.insert(&entity_type, &row_values(&entity_type, entity))
	}

	pub fn update<E: Entity>(&self, entity: &E) -> Result<CompiledSql> {
		let entity_type = get_entity_type::<E>();
		self.query_generator.update(&entity_type, &row_values(&entity_type, entity))
	}

	pub fn delete<E: Entity>(&self, entity: &E) -> Result<CompiledSql> {
		let entity_type = get_entity_type::<E>();
		self.query_generator.delete(&entity_type, &row_values(&entity_type, entity))
	}
}

/// Current values of `entity`, in property order.
pub fn row_values<E: Entity>(entity_type: &EntityType, entity: &E) -> Vec<Value> {
	entity_type
		.properties()
		.iter()
		.map(|p| p.get(entity).unwrap_or(Value::Null))
		.collect()
}
