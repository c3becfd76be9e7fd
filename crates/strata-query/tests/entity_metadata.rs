//! Entity metadata cache and derive integration tests

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use common::{Post, Tag, User, UserSummary};
use rstest::rstest;
use strata_query::prelude::*;

#[test]
fn test_entity_type_is_cached() {
	let first = get_entity_type::<User>();
	let second = get_entity_type::<User>();

	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(first.table(), second.table());
}

#[test]
fn test_concurrent_first_access_builds_once() {
	let types: Vec<Arc<EntityType>> = std::thread::scope(|scope| {
		let handles: Vec<_> = (0..8)
			.map(|_| scope.spawn(get_entity_type::<Tag>))
			.collect();
		handles.into_iter().map(|h| h.join().unwrap()).collect()
	});

	assert!(types.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[rstest]
#[case(get_entity_type::<User>(), "$pre:users")]
#[case(get_entity_type::<Post>(), "$pre:posts")]
#[case(get_entity_type::<Tag>(), "$pre:Tag")]
#[case(get_entity_type::<UserSummary>(), "$pre:users")]
fn test_table_name(#[case] entity: Arc<EntityType>, #[case] expected: &str) {
	assert_eq!(entity.table(), expected);
}

#[test]
fn test_properties_follow_declaration_order() {
	let user = get_entity_type::<User>();
	let names: Vec<_> = user.properties().iter().map(Property::name).collect();

	assert_eq!(names, ["id", "email", "name", "created_at", "sort_order"]);
}

#[test]
fn test_property_annotations() {
	let user = get_entity_type::<User>();

	let id = user.property("id").unwrap();
	assert!(id.is_identity());
	assert!(!id.is_updatable());
	assert_eq!(id.column_type(), &ColumnType::BigInt);

	let email = user.property("email").unwrap();
	assert_eq!(email.max_length(), Some(100));
	assert!(!email.is_nullable());

	let name = user.property("name").unwrap();
	assert_eq!(name.column(), "display_name");
	assert_eq!(name.display_name(), "Display name");
	assert!(name.is_nullable());
	assert_eq!(name.column_type(), &ColumnType::String);

	assert!(user.find_property("cached").is_none());
}

#[test]
fn test_keys() {
	let user = get_entity_type::<User>();
	assert_eq!(user.identity().map(Property::name), Some("id"));
	let key: Vec<_> = user.require_primary_key().unwrap().properties().iter().map(Property::name).collect();
	assert_eq!(key, ["id"]);
	let (group, unique) = &user.unique_keys()[0];
	assert_eq!(group, "ux_users_email");
	assert_eq!(unique.properties()[0].name(), "email");

	let tag = get_entity_type::<Tag>();
	let key: Vec<_> = tag.require_primary_key().unwrap().properties().iter().map(Property::name).collect();
	assert_eq!(key, ["tenant", "name"]);
	assert!(!tag.property("created_by").unwrap().is_updatable());

	let post = get_entity_type::<Post>();
	assert_eq!(post.row_version().map(Property::name), Some("version"));
}

#[test]
fn test_property_get_and_set() {
	let entity = get_entity_type::<User>();
	let mut user = User {
		email: "a@example.com".to_string(),
		..User::default()
	};

	let email = entity.property("email").unwrap();
	assert_eq!(email.get(&user), Some(Value::from("a@example.com")));

	let created = NaiveDate::from_ymd_opt(2024, 3, 1)
		.unwrap()
		.and_hms_opt(9, 30, 0)
		.unwrap();
	entity
		.property("created_at")
		.unwrap()
		.set(&mut user, Value::from("2024-03-01 09:30:00.000000"))
		.unwrap();
	assert_eq!(user.created_at, created);

	entity.property("name").unwrap().set(&mut user, Value::Null).unwrap();
	assert_eq!(user.name, None);
}

#[test]
fn test_property_of_another_type_is_rejected() {
	let post_title = get_entity_type::<Post>();
	let title = post_title.property("title").unwrap();
	let user = User::default();

	assert_eq!(title.get(&user), None);
}

#[test]
fn test_unknown_property() {
	let result = Expression::property::<User>("missing");

	assert_eq!(
		result,
		Err(QueryError::UnknownProperty {
			entity: "User".to_string(),
			property: "missing".to_string(),
		})
	);
}

#[test]
fn test_set_value_unknown_property() {
	let mut user = User::default();

	assert!(user.set_value("cached", Value::Bool(true)).is_err());
}
