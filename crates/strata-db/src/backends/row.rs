use strata_query::{Entity, FromValue, Value, get_entity_type};

use crate::error::{DatabaseError, Result};

/// One result row, decoded into [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
	columns: Vec<String>,
	values: Vec<Value>,
}

impl Row {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, column: impl Into<String>, value: Value) {
		self.columns.push(column.into());
		self.values.push(value);
	}

	pub fn columns(&self) -> &[String] {
		&self.columns
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Value of `column`; names compare case-insensitively.
	pub fn value(&self, column: &str) -> Option<&Value> {
		self.columns
			.iter()
			.position(|c| c.eq_ignore_ascii_case(column))
			.map(|i| &self.values[i])
	}

	pub fn value_at(&self, index: usize) -> Option<&Value> {
		self.values.get(index)
	}

	pub fn get<T: FromValue>(&self, column: &str) -> Result<T> {
		let value = self
			.value(column)
			.ok_or_else(|| DatabaseError::ColumnNotFound(column.to_string()))?;
		T::from_value(value.clone()).map_err(|e| DatabaseError::TypeError(format!("column `{}`: {}", column, e)))
	}

	/// Materialize an entity from the columns its properties map to.
	///
	/// Columns without a matching property are ignored; properties without a
	/// column keep their default value.
	pub fn into_entity<E: Entity + Default>(self) -> Result<E> {
		let entity_type = get_entity_type::<E>();
		let mut entity = E::default();
		for (column, value) in self.columns.into_iter().zip(self.values) {
			let Some(property) = entity_type
				.properties()
				.iter()
				.find(|p| p.column().eq_ignore_ascii_case(&column))
			else {
				continue;
			};
			property
				.set(&mut entity, value)
				.map_err(|e| DatabaseError::TypeError(format!("column `{}`: {}", column, e)))?;
		}
		Ok(entity)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn row() -> Row {
		let mut row = Row::new();
		row.push("Id", Value::BigInt(4));
		row.push("name", Value::from("ada"));
		row
	}

	#[test]
	fn test_get_is_case_insensitive() {
		assert_eq!(row().get::<i32>("id").unwrap(), 4);
		assert_eq!(row().get::<String>("NAME").unwrap(), "ada");
	}

	#[test]
	fn test_get_missing_column() {
		assert!(matches!(
			row().get::<i64>("email"),
			Err(DatabaseError::ColumnNotFound(_))
		));
	}

	#[test]
	fn test_get_type_error() {
		assert!(matches!(
			row().get::<i64>("name"),
			Err(DatabaseError::TypeError(_))
		));
	}
}
