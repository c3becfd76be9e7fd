//! Versioned data migrations run at startup.

use tokio_util::sync::CancellationToken;

use super::builder::MigrationBuilder;
use super::repository::{Migration, MigrationRepository};
use crate::error::MigrationError;

/// A schema change with numbered steps.
///
/// Version 1 is [`create`](Self::create). Each later version `n` is reached
/// by [`up(n)`](Self::up) and left again by [`down(n)`](Self::down);
/// `down(1)` undoes `create`.
pub trait DataMigration: Send + Sync {
	fn id(&self) -> &str;

	/// Lower runs first.
	fn priority(&self) -> i32 {
		0
	}

	fn latest_version(&self) -> i32 {
		1
	}

	fn create(&self, builder: &mut MigrationBuilder);

	fn up(&self, _version: i32, _builder: &mut MigrationBuilder) {}

	fn down(&self, _version: i32, _builder: &mut MigrationBuilder) {}
}

/// Runs registered migrations one after another.
pub struct Migrator {
	repository: MigrationRepository,
	migrations: Vec<Box<dyn DataMigration>>,
}

impl Migrator {
	pub fn new(repository: MigrationRepository) -> Self {
		Self {
			repository,
			migrations: Vec::new(),
		}
	}

	pub fn register(&mut self, migration: impl DataMigration + 'static) -> &mut Self {
		self.migrations.push(Box::new(migration));
		self
	}

	pub fn repository(&self) -> &MigrationRepository {
		&self.repository
	}

	/// Bring every migration to its latest version.
	///
	/// Stops at the first step that fails to apply and returns `false`.
	pub async fn migrate(&self, cancel: &CancellationToken) -> Result<bool, MigrationError> {
		self.repository.ensure_migration_table_exists_async(cancel).await?;
		let mut ordered: Vec<&dyn DataMigration> = self.migrations.iter().map(|m| m.as_ref()).collect();
		ordered.sort_by_key(|m| m.priority());

		for migration in ordered {
			let current = self
				.repository
				.find_migration_async(migration.id(), cancel)
				.await?
				.map_or(0, |m| m.version);
			let latest = migration.latest_version();
			if current >= latest {
				tracing::debug!(migration = migration.id(), version = current, "up to date");
				continue;
			}
			for version in (current + 1)..=latest {
				let mut builder = MigrationBuilder::new();
				if version == 1 {
					migration.create(&mut builder);
				} else {
					migration.up(version, &mut builder);
				}
				let record = Migration::new(migration.id(), version);
				if !self
					.repository
					.execute_async(&record, builder.operations(), cancel)
					.await?
				{
					tracing::error!(migration = migration.id(), version, "migration stopped");
					return Ok(false);
				}
			}
		}
		Ok(true)
	}

	/// Step migration `id` down to removal.
	pub async fn revert(&self, id: &str, cancel: &CancellationToken) -> Result<bool, MigrationError> {
		let migration = self
			.migrations
			.iter()
			.find(|m| m.id() == id)
			.ok_or_else(|| MigrationError::InvalidOperation(format!("migration `{}` is not registered", id)))?;
		let Some(recorded) = self.repository.find_migration_async(id, cancel).await? else {
			tracing::debug!(migration = id, "not applied; nothing to revert");
			return Ok(true);
		};

		for version in (1..=recorded.version).rev() {
			let mut builder = MigrationBuilder::new();
			migration.down(version, &mut builder);
			let record = Migration::new(id, version - 1);
			if !self
				.repository
				.execute_async(&record, builder.operations(), cancel)
				.await?
			{
				tracing::error!(migration = id, version, "revert stopped");
				return Ok(false);
			}
		}
		Ok(true)
	}
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::backends::{Executor, SqliteExecutor};
	use crate::migrations::{ColumnDefinition, PrimaryKeyDefinition};
	use strata_query::ColumnType;

	struct Notes;

	impl DataMigration for Notes {
		fn id(&self) -> &str {
			"notes"
		}

		fn latest_version(&self) -> i32 {
			2
		}

		fn create(&self, builder: &mut MigrationBuilder) {
			builder
				.create_table_named("notes")
				.column(ColumnDefinition::new("id", ColumnType::BigInt).identity())
				.column(ColumnDefinition::new("title", ColumnType::String).max_length(80))
				.primary_key(PrimaryKeyDefinition::new("PK_notes", vec!["id".into()]));
		}

		fn up(&self, version: i32, builder: &mut MigrationBuilder) {
			if version == 2 {
				builder.add_column("notes", ColumnDefinition::new("body", ColumnType::String).nullable());
			}
		}

		fn down(&self, version: i32, builder: &mut MigrationBuilder) {
			match version {
				2 => {
					builder.drop_column("notes", "body");
				}
				1 => {
					builder.drop_table("notes");
				}
				_ => {}
			}
		}
	}

	/// Depends on `notes` existing.
	struct SeedNotes;

	impl DataMigration for SeedNotes {
		fn id(&self) -> &str {
			"seed-notes"
		}

		fn priority(&self) -> i32 {
			10
		}

		fn create(&self, builder: &mut MigrationBuilder) {
			builder.sql("INSERT INTO \"$pre:notes\" (\"title\") VALUES ('welcome');");
		}

		fn down(&self, _version: i32, builder: &mut MigrationBuilder) {
			builder.sql("DELETE FROM \"$pre:notes\" WHERE \"title\" = 'welcome';");
		}
	}

	async fn migrator() -> (Migrator, Arc<dyn Executor>) {
		let executor: Arc<dyn Executor> = Arc::new(SqliteExecutor::in_memory("").await.unwrap());
		let mut migrator = Migrator::new(MigrationRepository::new(Arc::clone(&executor)));
		migrator.register(SeedNotes).register(Notes);
		(migrator, executor)
	}

	async fn count(executor: &Arc<dyn Executor>, sql: &str) -> i64 {
		executor.execute_scalar(sql, &[]).await.unwrap().as_i64().unwrap()
	}

	#[tokio::test]
	async fn test_migrate_runs_in_priority_order_to_latest_version() {
		let (migrator, executor) = migrator().await;
		let cancel = CancellationToken::new();

		assert!(migrator.migrate(&cancel).await.unwrap());

		let recorded = migrator.repository().find_migrations_async(&cancel).await.unwrap();
		let versions: Vec<(&str, i32)> = recorded.iter().map(|m| (m.id.as_str(), m.version)).collect();
		assert_eq!(versions, vec![("notes", 2), ("seed-notes", 1)]);
		assert_eq!(count(&executor, "SELECT COUNT(*) FROM \"notes\" WHERE \"body\" IS NULL;").await, 1);
	}

	#[tokio::test]
	async fn test_migrate_twice_applies_nothing_new() {
		let (migrator, executor) = migrator().await;
		let cancel = CancellationToken::new();

		assert!(migrator.migrate(&cancel).await.unwrap());
		assert!(migrator.migrate(&cancel).await.unwrap());

		assert_eq!(count(&executor, "SELECT COUNT(*) FROM \"notes\";").await, 1);
	}

	#[tokio::test]
	async fn test_revert_steps_down_to_removal() {
		let (migrator, executor) = migrator().await;
		let cancel = CancellationToken::new();
		migrator.migrate(&cancel).await.unwrap();

		assert!(migrator.revert("seed-notes", &cancel).await.unwrap());
		assert!(migrator.revert("notes", &cancel).await.unwrap());

		assert!(migrator.repository().find_migrations_async(&cancel).await.unwrap().is_empty());
		assert_eq!(
			count(
				&executor,
				"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'notes';"
			)
			.await,
			0
		);
	}

	#[tokio::test]
	async fn test_revert_unknown_migration_is_invalid() {
		let (migrator, _) = migrator().await;

		let result = migrator.revert("missing", &CancellationToken::new()).await;

		assert!(matches!(result, Err(MigrationError::InvalidOperation(_))));
	}
}
