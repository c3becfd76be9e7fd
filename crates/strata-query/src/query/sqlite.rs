use crate::backend::{SqlHelper, SqliteSqlHelper, SqliteTypeMapper, TypeMapper};
use crate::error::Result;

use super::{MoveOutcome, MoveRequest, MoveStatement, MoveTarget, QuerySqlGenerator};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteQuerySqlGenerator {
	helper: SqliteSqlHelper,
	type_mapper: SqliteTypeMapper,
}

impl SqliteQuerySqlGenerator {
	pub fn new() -> Self {
		Self::default()
	}
}

impl QuerySqlGenerator for SqliteQuerySqlGenerator {
	fn helper(&self) -> &dyn SqlHelper {
		&self.helper
	}

	fn type_mapper(&self) -> &dyn TypeMapper {
		&self.type_mapper
	}

	/// One statement, so the swap is atomic without a script: it changes two
	/// rows when a neighbour exists and none otherwise.
	fn move_rows(&self, request: &MoveRequest) -> Result<MoveStatement> {
		let target = MoveTarget::resolve(request, &self.helper)?;
		let key = self.helper.parameterized(&request.key.name);
		let MoveTarget {
			table,
			key: key_column,
			order,
			..
		} = &target;
		let comparison = request.direction.comparison();
		let ordering = request.direction.ordering();
		let grouping = MoveTarget::grouping_clause(request);

		let sql = format!(
			"WITH \"move_current\" AS MATERIALIZED (SELECT {key_column} AS \"move_key\", {order} AS \"move_order\" \
			 FROM {table} WHERE {key_column} = {key}), \
			 \"move_adjacent\" AS MATERIALIZED (SELECT {key_column} AS \"move_key\", {order} AS \"move_order\" \
			 FROM {table} WHERE {order} {comparison} (SELECT \"move_order\" FROM \"move_current\"){grouping} \
			 ORDER BY {order} {ordering} LIMIT 1) \
			 UPDATE {table} SET {order} = CASE {key_column} \
			 WHEN (SELECT \"move_key\" FROM \"move_current\") THEN (SELECT \"move_order\" FROM \"move_adjacent\") \
			 ELSE (SELECT \"move_order\" FROM \"move_current\") END \
			 WHERE {key_column} IN (SELECT \"move_key\" FROM \"move_current\" UNION ALL SELECT \"move_key\" FROM \"move_adjacent\") \
			 AND EXISTS (SELECT 1 FROM \"move_adjacent\");"
		);
		Ok(MoveStatement {
			sql,
			parameters: MoveTarget::parameters(request)?,
			outcome: MoveOutcome::RowsAffected(2),
		})
	}
}
