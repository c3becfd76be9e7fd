#![allow(dead_code)]

use chrono::NaiveDate;

#[derive(strata_macros::Entity, Debug, Default, Clone, PartialEq)]
#[entity(table = "tasks")]
pub struct Task {
	#[column(key, identity)]
	pub id: i64,
	#[column(size = 100)]
	pub title: String,
	pub sort_order: i32,
	pub done: bool,
	pub due: Option<NaiveDate>,
}

impl Task {
	pub fn new(title: impl Into<String>, sort_order: i32) -> Self {
		Self {
			title: title.into(),
			sort_order,
			..Default::default()
		}
	}
}

#[derive(strata_macros::Entity, Debug, Default, Clone, PartialEq)]
#[entity(table = "labels")]
pub struct Label {
	#[column(key, size = 40)]
	pub code: String,
	#[column(unique = "name")]
	pub name: String,
	#[column(row_version)]
	pub version: Vec<u8>,
}
