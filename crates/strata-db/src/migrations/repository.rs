//! Migration bookkeeping
//!
//! One row per applied migration in `__strata_migrations`. A migration's
//! commands and its bookkeeping change run in one transaction, so the row is
//! the durable record that the schema change happened.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use futures::FutureExt;
use strata_query::{CompiledSql, Dialect, get_entity_type};
use tokio_util::sync::CancellationToken;

use super::builder::MigrationBuilder;
use super::generator::{MigrationsSqlGenerator, generator_for};
use super::operations::MigrationOperation;
use crate::backends::{Executor, in_transaction};
use crate::conf::DatabaseSettings;
use crate::error::{DatabaseError, MigrationError};

type Result<T> = std::result::Result<T, MigrationError>;

/// Default bound on one migration transaction.
pub const DEFAULT_MIGRATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Bookkeeping row.
///
/// `version` drives [`MigrationRepository::execute_async`]: `0` removes the
/// row, `1` records a newly applied migration, any other value records an
/// upgrade to that version.
#[derive(strata_macros::Entity, Debug, Default, Clone, PartialEq)]
#[entity(table = "__strata_migrations")]
pub struct Migration {
	#[column(key, size = 150)]
	pub id: String,
	pub version: i32,
	pub applied_at: NaiveDateTime,
}

impl Migration {
	pub fn new(id: impl Into<String>, version: i32) -> Self {
		Self {
			id: id.into(),
			version,
			applied_at: Utc::now().naive_utc(),
		}
	}
}

/// How the bookkeeping row changes once the commands have run.
enum Bookkeeping {
	Insert(CompiledSql),
	Update(CompiledSql),
	Delete(CompiledSql),
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
	if cancel.is_cancelled() {
		return Err(MigrationError::Cancelled);
	}
	Ok(())
}

/// Applies migrations and maintains their bookkeeping rows.
pub struct MigrationRepository {
	executor: Arc<dyn Executor>,
	dialect: Dialect,
	generator: Box<dyn MigrationsSqlGenerator>,
	timeout: Duration,
}

impl MigrationRepository {
	pub fn new(executor: Arc<dyn Executor>) -> Self {
		let dialect = Dialect::for_kind(executor.kind());
		Self {
			generator: generator_for(dialect.clone()),
			executor,
			dialect,
			timeout: DEFAULT_MIGRATION_TIMEOUT,
		}
	}

	/// Connect with `settings` and take its migration timeout.
	pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self> {
		let executor = settings.connect().await?;
		Ok(Self::new(executor).with_timeout(settings.migration_timeout()))
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn executor(&self) -> &Arc<dyn Executor> {
		&self.executor
	}

	pub fn dialect(&self) -> &Dialect {
		&self.dialect
	}

	pub fn generator(&self) -> &dyn MigrationsSqlGenerator {
		self.generator.as_ref()
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Create the bookkeeping table unless it exists; `true` when created.
	pub async fn ensure_migration_table_exists_async(&self, cancel: &CancellationToken) -> Result<bool> {
		check_cancelled(cancel)?;
		let table = get_entity_type::<Migration>();
		let probe = self.generator.table_exists_sql(table.table())?;
		let exists = self.executor.execute_scalar(&probe, &[]).await?;
		if exists.as_i64().is_some_and(|count| count != 0) {
			tracing::debug!(table = %table.table(), "migration table already exists");
			return Ok(false);
		}

		let mut builder = MigrationBuilder::new();
		builder.create_table::<Migration>();
		for command in self.generator.generate(builder.operations())? {
			check_cancelled(cancel)?;
			self.executor.execute(&command.sql, &[]).await?;
		}
		tracing::info!(table = %table.table(), "created migration table");
		Ok(true)
	}

	pub async fn find_migration_async(&self, id: &str, cancel: &CancellationToken) -> Result<Option<Migration>> {
		check_cancelled(cancel)?;
		let lookup = self.dialect.select_by_key::<Migration>(&[id.into()])?;
		let rows = self.executor.fetch_all(&lookup.sql, &lookup.parameters).await?;
		match rows.into_iter().next() {
			Some(row) => Ok(Some(row.into_entity()?)),
			None => Ok(None),
		}
	}

	/// Every bookkeeping row, ordered by id.
	pub async fn find_migrations_async(&self, cancel: &CancellationToken) -> Result<Vec<Migration>> {
		check_cancelled(cancel)?;
		let table = get_entity_type::<Migration>();
		let id = table.property("id")?;
		let helper = self.dialect.helper();
		let sql = format!(
			"SELECT * FROM {} ORDER BY {}{}",
			helper.delimit_identifier(table.table())?,
			helper.delimit_identifier(id.column())?,
			helper.statement_terminator()
		);
		let rows = self.executor.fetch_all(&sql, &[]).await?;
		rows.into_iter()
			.map(|row| row.into_entity::<Migration>().map_err(MigrationError::from))
			.collect()
	}

	/// Run `operations` and record `migration`, all in one transaction.
	///
	/// Returns `Ok(false)` after rolling back when a command fails or the
	/// bookkeeping row does not allow the transition. Operations that cannot
	/// be rendered are an `Err` and nothing runs.
	pub async fn execute_async(
		&self,
		migration: &Migration,
		operations: &[MigrationOperation],
		cancel: &CancellationToken,
	) -> Result<bool> {
		check_cancelled(cancel)?;
		let commands = self.generator.generate(operations)?;
		let lookup = self.dialect.select_by_key::<Migration>(&[migration.id.as_str().into()])?;
		let row = Migration {
			applied_at: Utc::now().naive_utc(),
			..migration.clone()
		};
		let insert = self.dialect.insert(&row)?;
		let update = self.dialect.update(&row)?;
		let delete = self.dialect.delete(&row)?;
		let id = migration.id.clone();
		let version = migration.version;
		let token = cancel.clone();

		tracing::info!(migration = %id, version, commands = commands.len(), "applying migration");
		let outcome = in_transaction(self.executor.as_ref(), self.timeout, move |tx| {
			async move {
				let existing = !tx.fetch_all(&lookup.sql, &lookup.parameters).await?.is_empty();
				let bookkeeping = match (version, existing) {
					(0, true) => Bookkeeping::Delete(delete),
					(1, false) => Bookkeeping::Insert(insert),
					(_, true) => Bookkeeping::Update(update),
					(_, false) => {
						return Err(MigrationError::MigrationConflict {
							id,
							reason: format!("no bookkeeping row to move to version {}", version),
						});
					}
				};
				for command in &commands {
					check_cancelled(&token)?;
					tx.execute(&command.sql, &[]).await?;
				}
				let (statement, expected) = match &bookkeeping {
					Bookkeeping::Insert(sql) => (sql, "insert"),
					Bookkeeping::Update(sql) => (sql, "update"),
					Bookkeeping::Delete(sql) => (sql, "delete"),
				};
				let affected = tx.execute(&statement.sql, &statement.parameters).await?;
				if affected != 1 {
					return Err(MigrationError::MigrationConflict {
						id,
						reason: format!("bookkeeping {} touched {} rows", expected, affected),
					});
				}
				Ok(())
			}
			.boxed()
		})
		.await;

		match outcome {
			Ok(()) => {
				tracing::info!(migration = %migration.id, version, "migration applied");
				Ok(true)
			}
			Err(error @ MigrationError::MigrationConflict { .. })
			| Err(error @ MigrationError::Database(DatabaseError::Sqlx(_)))
			| Err(error @ MigrationError::Database(DatabaseError::Timeout(_))) => {
				tracing::error!(migration = %migration.id, version, error = %error, "migration rolled back");
				Ok(false)
			}
			Err(error) => Err(error),
		}
	}
}

/// Blocking twin of [`MigrationRepository`], driving it on its own runtime.
///
/// Must not be used from inside an async context.
pub struct BlockingMigrationRepository {
	inner: MigrationRepository,
	runtime: tokio::runtime::Runtime,
}

impl BlockingMigrationRepository {
	pub fn new(inner: MigrationRepository) -> io::Result<Self> {
		let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
		Ok(Self::with_runtime(inner, runtime))
	}

	/// Use `runtime`, e.g. the one the executor's pool was created on.
	pub fn with_runtime(inner: MigrationRepository, runtime: tokio::runtime::Runtime) -> Self {
		Self { inner, runtime }
	}

	pub fn inner(&self) -> &MigrationRepository {
		&self.inner
	}

	pub fn ensure_migration_table_exists(&self) -> Result<bool> {
		self.runtime
			.block_on(self.inner.ensure_migration_table_exists_async(&CancellationToken::new()))
	}

	pub fn find_migration(&self, id: &str) -> Result<Option<Migration>> {
		self.runtime
			.block_on(self.inner.find_migration_async(id, &CancellationToken::new()))
	}

	pub fn find_migrations(&self) -> Result<Vec<Migration>> {
		self.runtime
			.block_on(self.inner.find_migrations_async(&CancellationToken::new()))
	}

	pub fn execute(&self, migration: &Migration, operations: &[MigrationOperation]) -> Result<bool> {
		self.runtime
			.block_on(self.inner.execute_async(migration, operations, &CancellationToken::new()))
	}
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
	use super::*;
	use crate::backends::SqliteExecutor;
	use rstest::{fixture, rstest};

	#[fixture]
	async fn repository() -> MigrationRepository {
		let executor = SqliteExecutor::in_memory("app_").await.unwrap();
		MigrationRepository::new(Arc::new(executor))
	}

	fn sql(statement: &str) -> Vec<MigrationOperation> {
		let mut builder = MigrationBuilder::new();
		builder.sql(statement);
		builder.into_operations()
	}

	#[rstest]
	#[tokio::test]
	async fn test_ensure_migration_table_exists_is_idempotent(#[future] repository: MigrationRepository) {
		let repository = repository.await;
		let cancel = CancellationToken::new();

		assert!(repository.ensure_migration_table_exists_async(&cancel).await.unwrap());
		assert!(!repository.ensure_migration_table_exists_async(&cancel).await.unwrap());
	}

	#[rstest]
	#[tokio::test]
	async fn test_bookkeeping_transitions(#[future] repository: MigrationRepository) {
		let repository = repository.await;
		let cancel = CancellationToken::new();
		repository.ensure_migration_table_exists_async(&cancel).await.unwrap();

		assert!(repository
			.execute_async(&Migration::new("seed", 1), &[], &cancel)
			.await
			.unwrap());
		assert_eq!(
			repository.find_migration_async("seed", &cancel).await.unwrap().map(|m| m.version),
			Some(1)
		);

		assert!(repository
			.execute_async(&Migration::new("seed", 3), &[], &cancel)
			.await
			.unwrap());
		assert_eq!(
			repository.find_migration_async("seed", &cancel).await.unwrap().map(|m| m.version),
			Some(3)
		);

		assert!(repository
			.execute_async(&Migration::new("seed", 0), &[], &cancel)
			.await
			.unwrap());
		assert!(repository.find_migration_async("seed", &cancel).await.unwrap().is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_update_without_row_is_a_conflict(#[future] repository: MigrationRepository) {
		let repository = repository.await;
		let cancel = CancellationToken::new();
		repository.ensure_migration_table_exists_async(&cancel).await.unwrap();

		let applied = repository
			.execute_async(
				&Migration::new("missing", 2),
				&sql("CREATE TABLE \"$pre:side_effect\" (\"id\" INTEGER);"),
				&cancel,
			)
			.await
			.unwrap();

		assert!(!applied);
		let tables = repository
			.executor()
			.execute_scalar(
				"SELECT COUNT(*) FROM sqlite_master WHERE name = 'app_side_effect';",
				&[],
			)
			.await
			.unwrap();
		assert_eq!(tables.as_i64(), Some(0));
	}

	#[rstest]
	#[tokio::test]
	async fn test_failing_command_rolls_back_everything(#[future] repository: MigrationRepository) {
		let repository = repository.await;
		let cancel = CancellationToken::new();
		repository.ensure_migration_table_exists_async(&cancel).await.unwrap();
		let mut builder = MigrationBuilder::new();
		builder
			.sql("CREATE TABLE \"$pre:partial\" (\"id\" INTEGER);")
			.sql("INSERT INTO \"$pre:nowhere\" VALUES (1);");

		let applied = repository
			.execute_async(&Migration::new("broken", 1), builder.operations(), &cancel)
			.await
			.unwrap();

		assert!(!applied);
		assert!(repository.find_migration_async("broken", &cancel).await.unwrap().is_none());
		assert!(repository.find_migrations_async(&cancel).await.unwrap().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_unrenderable_operations_are_errors(#[future] repository: MigrationRepository) {
		let repository = repository.await;
		let cancel = CancellationToken::new();
		let mut builder = MigrationBuilder::new();
		builder.drop_primary_key("users", "PK_users");

		let result = repository
			.execute_async(&Migration::new("keys", 1), builder.operations(), &cancel)
			.await;

		assert!(matches!(result, Err(MigrationError::UnsupportedOperation { .. })));
	}

	#[rstest]
	#[tokio::test]
	async fn test_cancelled_token_stops_before_probe(#[future] repository: MigrationRepository) {
		let repository = repository.await;
		let cancel = CancellationToken::new();
		cancel.cancel();

		let result = repository.ensure_migration_table_exists_async(&cancel).await;

		assert!(matches!(result, Err(MigrationError::Cancelled)));
	}

	#[test]
	fn test_blocking_twin() {
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.unwrap();
		let executor = runtime.block_on(SqliteExecutor::in_memory("")).unwrap();
		let blocking =
			BlockingMigrationRepository::with_runtime(MigrationRepository::new(Arc::new(executor)), runtime);

		assert!(blocking.ensure_migration_table_exists().unwrap());
		assert!(blocking.execute(&Migration::new("a", 1), &sql("SELECT 1;")).unwrap());
		assert_eq!(
			blocking.find_migrations().unwrap().iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
			vec!["a"]
		);
	}
}
