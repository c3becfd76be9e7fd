//! Entities shared by the integration tests

// Each test binary compiles common.rs separately, causing unused code warnings.
#![allow(dead_code, unreachable_pub)]

use chrono::NaiveDateTime;
use strata_macros::Entity;

#[derive(Entity, Debug, Default, Clone, PartialEq)]
#[entity(table = "users")]
pub struct User {
	#[column(key, identity)]
	pub id: i64,
	#[column(size = 100, unique = "ux_users_email")]
	pub email: String,
	#[column(name = "display_name", display = "Display name")]
	pub name: Option<String>,
	pub created_at: NaiveDateTime,
	pub sort_order: i32,
	#[column(ignore)]
	pub cached: bool,
}

#[derive(Entity, Debug, Default, Clone)]
#[entity(table = "posts")]
pub struct Post {
	#[column(key)]
	pub id: i64,
	pub user_id: i64,
	#[column(size = 200)]
	pub title: String,
	#[column(row_version)]
	pub version: Vec<u8>,
}

/// Maps onto the `users` table of [`User`].
#[derive(Entity, Debug, Default, Clone)]
#[entity(target = User)]
pub struct UserSummary {
	#[column(key)]
	pub id: i64,
	pub email: String,
}

#[derive(Entity, Debug, Default, Clone)]
pub struct Tag {
	#[column(key)]
	pub tenant: i32,
	#[column(key, size = 50)]
	pub name: String,
	#[column(not_updated)]
	pub created_by: String,
}
