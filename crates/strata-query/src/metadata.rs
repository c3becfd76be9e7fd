//! Entity metadata model.
//!
//! An [`EntityType`] is built once per Rust type from the [`Entity`]
//! implementation (usually produced by `#[derive(Entity)]`) and cached for the
//! process lifetime. Repeated lookups return the same `Arc`.

mod cache;
mod entity;
mod model;

pub use cache::get_entity_type;
pub use entity::{Entity, EntityDescriptor, PropertyDescriptor};
pub use model::{EntityType, Key, Property};

/// Marker written in front of every logical table name; executors replace it
/// with the configured table prefix before sending SQL.
pub const PREFIX_PLACEHOLDER: &str = "$pre:";

/// Logical table name with the prefix marker applied exactly once.
pub fn prefixed(name: &str) -> String {
	if name.starts_with(PREFIX_PLACEHOLDER) {
		name.to_string()
	} else {
		format!("{}{}", PREFIX_PLACEHOLDER, name)
	}
}

/// Replace the prefix marker with a physical prefix.
pub fn apply_prefix(sql: &str, prefix: &str) -> String {
	sql.replace(PREFIX_PLACEHOLDER, prefix)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_prefixed_is_idempotent() {
		assert_eq!(prefixed("users"), "$pre:users");
		assert_eq!(prefixed(&prefixed("users")), "$pre:users");
	}

	#[test]
	fn test_apply_prefix() {
		assert_eq!(
			apply_prefix("SELECT 1 FROM [$pre:users];", "app_"),
			"SELECT 1 FROM [app_users];"
		);
		assert_eq!(apply_prefix("[$pre:users]", ""), "[users]");
	}
}
