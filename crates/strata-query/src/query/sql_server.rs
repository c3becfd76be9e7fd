use crate::backend::{SqlHelper, SqlServerSqlHelper, SqlServerTypeMapper, TypeMapper};
use crate::error::Result;

use super::{MoveOutcome, MoveRequest, MoveStatement, MoveTarget, QuerySqlGenerator};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerQuerySqlGenerator {
	helper: SqlServerSqlHelper,
	type_mapper: SqlServerTypeMapper,
}

impl SqlServerQuerySqlGenerator {
	pub fn new() -> Self {
		Self::default()
	}
}

impl QuerySqlGenerator for SqlServerQuerySqlGenerator {
	fn helper(&self) -> &dyn SqlHelper {
		&self.helper
	}

	fn type_mapper(&self) -> &dyn TypeMapper {
		&self.type_mapper
	}

	fn top_clause(&self, count: usize) -> Option<String> {
		Some(format!("TOP {}", count))
	}

	fn limit_clause(&self, _count: usize) -> Option<String> {
		None
	}

	// OFFSET requires an ORDER BY
	fn paging_clause(&self, order_by: Option<&str>, offset: usize, size: usize) -> String {
		format!(
			"ORDER BY {} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
			order_by.unwrap_or("(SELECT 1)"),
			offset,
			size
		)
	}

	fn move_rows(&self, request: &MoveRequest) -> Result<MoveStatement> {
		let target = MoveTarget::resolve(request, &self.helper)?;
		let key_type = self.type_mapper.get_mapping(
			target.key_property.column_type(),
			target.key_property.max_length(),
			false,
			true,
		)?;
		let order_type = self.type_mapper.get_mapping(
			target.order_property.column_type(),
			target.order_property.max_length(),
			false,
			true,
		)?;
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
		let rollback = "\tIF @@ERROR <> 0\n\tBEGIN\n\t\tROLLBACK TRANSACTION;\n\t\tSELECT 0;\n\t\tRETURN;\n\tEND\n";

		let sql = format!(
			"DECLARE @MoveCurrentOrder {order_type};\n\
			 DECLARE @MoveAdjacentKey {key_type};\n\
			 DECLARE @MoveAdjacentOrder {order_type};\n\
			 SELECT @MoveCurrentOrder = {order} FROM {table} WHERE {key_column} = {key};\n\
			 SELECT TOP 1 @MoveAdjacentKey = {key_column}, @MoveAdjacentOrder = {order} FROM {table} \
			 WHERE {order} {comparison} @MoveCurrentOrder{grouping} ORDER BY {order} {ordering};\n\
			 IF @MoveAdjacentKey IS NOT NULL\n\
			 BEGIN\n\
			 \tBEGIN TRANSACTION;\n\
			 \tUPDATE {table} SET {order} = @MoveAdjacentOrder WHERE {key_column} = {key};\n\
			 {rollback}\
			 \tUPDATE {table} SET {order} = @MoveCurrentOrder WHERE {key_column} = @MoveAdjacentKey;\n\
			 {rollback}\
			 \tCOMMIT TRANSACTION;\n\
			 \tSELECT 1;\n\
			 \tRETURN;\n\
			 END\n\
			 SELECT 0;"
		);
		Ok(MoveStatement {
			sql,
			parameters: MoveTarget::parameters(request)?,
			outcome: MoveOutcome::Scalar,
		})
	}
}
