use crate::backend::{MySqlSqlHelper, MySqlTypeMapper, SqlHelper, TypeMapper};
use crate::error::Result;

use super::{MoveOutcome, MoveRequest, MoveStatement, MoveTarget, QuerySqlGenerator};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlQuerySqlGenerator {
	helper: MySqlSqlHelper,
	type_mapper: MySqlTypeMapper,
}

impl MySqlQuerySqlGenerator {
	pub fn new() -> Self {
		Self::default()
	}
}

impl QuerySqlGenerator for MySqlQuerySqlGenerator {
	fn helper(&self) -> &dyn SqlHelper {
		&self.helper
	}

	fn type_mapper(&self) -> &dyn TypeMapper {
		&self.type_mapper
	}

	/// Session variables carry state between the statements; the executor
	/// runs them on one connection and rolls back if any fails.
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
			"SET @move_current_order = NULL, @move_adjacent_key = NULL, @move_adjacent_order = NULL;\n\
			 SELECT {order} FROM {table} WHERE {key_column} = {key} INTO @move_current_order;\n\
			 SELECT {key_column}, {order} FROM {table} WHERE {order} {comparison} @move_current_order{grouping} \
			 ORDER BY {order} {ordering} LIMIT 1 INTO @move_adjacent_key, @move_adjacent_order;\n\
			 START TRANSACTION;\n\
			 UPDATE {table} SET {order} = @move_adjacent_order WHERE {key_column} = {key} AND @move_adjacent_key IS NOT NULL;\n\
			 UPDATE {table} SET {order} = @move_current_order WHERE {key_column} = @move_adjacent_key;\n\
			 COMMIT;\n\
			 SELECT @move_adjacent_key IS NOT NULL;"
		);
		Ok(MoveStatement {
			sql,
			parameters: MoveTarget::parameters(request)?,
			outcome: MoveOutcome::Scalar,
		})
	}
}
