//! Database settings
//!
//! Settings come from the `[database]` table of a TOML file and may be
//! overridden from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `STRATA_DATABASE_PROVIDER` | `provider` |
//! | `STRATA_DATABASE_URL` | `connection_string` |
//! | `STRATA_TABLE_PREFIX` | `table_prefix` |

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strata_query::{DatabaseKind, Dialect};

use crate::backends::Executor;
use crate::error::{DatabaseError, Result};

pub const PROVIDER_ENV: &str = "STRATA_DATABASE_PROVIDER";
pub const URL_ENV: &str = "STRATA_DATABASE_URL";
pub const TABLE_PREFIX_ENV: &str = "STRATA_TABLE_PREFIX";

fn default_migration_timeout_secs() -> u64 {
	300
}

fn default_max_connections() -> u32 {
	5
}

/// Connection settings for one database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
	/// Engine; parsed case-insensitively (`sqlite`, `mysql`, `sqlserver`)
	pub provider: DatabaseKind,

	/// sqlx connection URL
	pub connection_string: String,

	/// Prefix prepended to every logical table name
	#[serde(default)]
	pub table_prefix: String,

	/// Upper bound for one migration transaction
	#[serde(default = "default_migration_timeout_secs")]
	pub migration_timeout_secs: u64,

	#[serde(default = "default_max_connections")]
	pub max_connections: u32,
}

#[derive(Deserialize)]
struct SettingsFile {
	database: DatabaseSettings,
}

impl DatabaseSettings {
	pub fn new(provider: DatabaseKind, connection_string: impl Into<String>) -> Self {
		Self {
			provider,
			connection_string: connection_string.into(),
			table_prefix: String::new(),
			migration_timeout_secs: default_migration_timeout_secs(),
			max_connections: default_max_connections(),
		}
	}

	/// SQLite settings
	///
	/// # Examples
	///
	/// ```
	/// use strata_db::conf::DatabaseSettings;
	///
	/// let settings = DatabaseSettings::sqlite("sqlite::memory:").with_table_prefix("app_");
	///
	/// assert_eq!(settings.table_prefix, "app_");
	/// assert_eq!(settings.migration_timeout_secs, 300);
	/// ```
	pub fn sqlite(connection_string: impl Into<String>) -> Self {
		Self::new(DatabaseKind::Sqlite, connection_string)
	}

	pub fn mysql(connection_string: impl Into<String>) -> Self {
		Self::new(DatabaseKind::MySql, connection_string)
	}

	pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.table_prefix = prefix.into();
		self
	}

	pub fn with_migration_timeout(mut self, timeout: Duration) -> Self {
		self.migration_timeout_secs = timeout.as_secs();
		self
	}

	/// Parse the `[database]` table of a settings document.
	///
	/// # Examples
	///
	/// ```
	/// use strata_db::conf::DatabaseSettings;
	///
	/// let settings = DatabaseSettings::from_toml_str(
	///     r#"
	///     [database]
	///     provider = "MySql"
	///     connection_string = "mysql://localhost/app"
	///     "#,
	/// )
	/// .unwrap();
	///
	/// assert_eq!(settings.provider.name(), "MySql");
	/// assert!(settings.table_prefix.is_empty());
	/// ```
	pub fn from_toml_str(document: &str) -> Result<Self> {
		let file: SettingsFile =
			toml::from_str(document).map_err(|e| DatabaseError::Configuration(e.to_string()))?;
		Ok(file.database)
	}

	/// Load from a TOML file, then apply environment overrides.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let document = std::fs::read_to_string(path)
			.map_err(|e| DatabaseError::Configuration(format!("{}: {}", path.display(), e)))?;
		let mut settings = Self::from_toml_str(&document)?;
		settings.apply_env()?;
		Ok(settings)
	}

	/// Build settings from the environment alone.
	pub fn from_env() -> Result<Self> {
		let provider = std::env::var(PROVIDER_ENV)
			.map_err(|_| DatabaseError::Configuration(format!("{} is not set", PROVIDER_ENV)))?;
		let url = std::env::var(URL_ENV)
			.map_err(|_| DatabaseError::Configuration(format!("{} is not set", URL_ENV)))?;
		let provider = provider.parse().map_err(DatabaseError::Configuration)?;
		let mut settings = Self::new(provider, url);
		settings.apply_env()?;
		Ok(settings)
	}

	/// Override fields from `STRATA_*` variables that are set.
	pub fn apply_env(&mut self) -> Result<()> {
		if let Ok(provider) = std::env::var(PROVIDER_ENV) {
			self.provider = provider.parse().map_err(DatabaseError::Configuration)?;
		}
		if let Ok(url) = std::env::var(URL_ENV) {
			self.connection_string = url;
		}
		if let Ok(prefix) = std::env::var(TABLE_PREFIX_ENV) {
			self.table_prefix = prefix;
		}
		Ok(())
	}

	pub fn dialect(&self) -> Dialect {
		Dialect::for_kind(self.provider)
	}

	pub fn migration_timeout(&self) -> Duration {
		Duration::from_secs(self.migration_timeout_secs)
	}

	/// Open the executor matching `provider`.
	pub async fn connect(&self) -> Result<Arc<dyn Executor>> {
		tracing::debug!(provider = %self.provider, prefix = %self.table_prefix, "connecting");
		match self.provider {
			#[cfg(feature = "sqlite")]
			DatabaseKind::Sqlite => {
				let executor = crate::backends::SqliteExecutor::connect(
					&self.connection_string,
					self.table_prefix.clone(),
					self.max_connections,
				)
				.await?;
				Ok(Arc::new(executor))
			}
			#[cfg(feature = "mysql")]
			DatabaseKind::MySql => {
				let executor = crate::backends::MySqlExecutor::connect(
					&self.connection_string,
					self.table_prefix.clone(),
					self.max_connections,
				)
				.await?;
				Ok(Arc::new(executor))
			}
			other => Err(DatabaseError::Configuration(format!(
				"no executor is available for {}",
				other
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serial_test::serial;
	use std::io::Write;

	fn clear_env() {
		// SAFETY: tests touching the environment are serialized
		unsafe {
			std::env::remove_var(PROVIDER_ENV);
			std::env::remove_var(URL_ENV);
			std::env::remove_var(TABLE_PREFIX_ENV);
		}
	}

	#[test]
	fn test_from_toml_str_defaults() {
		let settings = DatabaseSettings::from_toml_str(
			r#"
			[database]
			provider = "sqlite"
			connection_string = "sqlite::memory:"
			"#,
		)
		.unwrap();

		assert_eq!(settings.provider, DatabaseKind::Sqlite);
		assert_eq!(settings.table_prefix, "");
		assert_eq!(settings.migration_timeout(), Duration::from_secs(300));
		assert_eq!(settings.max_connections, 5);
	}

	#[test]
	fn test_from_toml_str_rejects_unknown_provider() {
		let result = DatabaseSettings::from_toml_str(
			r#"
			[database]
			provider = "oracle"
			connection_string = "x"
			"#,
		);

		assert!(matches!(result, Err(DatabaseError::Configuration(_))));
	}

	#[test]
	#[serial]
	fn test_from_file_applies_env_overrides() {
		clear_env();
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			"[database]\nprovider = \"MySql\"\nconnection_string = \"mysql://db/app\"\ntable_prefix = \"a_\"\nmigration_timeout_secs = 30"
		)
		.unwrap();
		// SAFETY: serialized
		unsafe {
			std::env::set_var(TABLE_PREFIX_ENV, "b_");
		}

		let settings = DatabaseSettings::from_file(file.path()).unwrap();
		clear_env();

		assert_eq!(settings.provider, DatabaseKind::MySql);
		assert_eq!(settings.table_prefix, "b_");
		assert_eq!(settings.migration_timeout_secs, 30);
		assert_eq!(settings.dialect().kind(), DatabaseKind::MySql);
	}

	#[test]
	#[serial]
	fn test_from_env() {
		clear_env();
		// SAFETY: serialized
		unsafe {
			std::env::set_var(PROVIDER_ENV, "SQLITE");
			std::env::set_var(URL_ENV, "sqlite::memory:");
		}

		let settings = DatabaseSettings::from_env().unwrap();
		clear_env();

		assert_eq!(settings.provider, DatabaseKind::Sqlite);
		assert_eq!(settings.connection_string, "sqlite::memory:");
	}

	#[test]
	#[serial]
	fn test_from_env_requires_provider() {
		clear_env();

		assert!(matches!(
			DatabaseSettings::from_env(),
			Err(DatabaseError::Configuration(_))
		));
	}

	#[tokio::test]
	async fn test_connect_without_sql_server_executor() {
		let settings = DatabaseSettings::new(DatabaseKind::SqlServer, "mssql://localhost");

		assert!(matches!(
			settings.connect().await,
			Err(DatabaseError::Configuration(_))
		));
	}

	#[cfg(feature = "sqlite")]
	#[tokio::test]
	async fn test_connect_sqlite() {
		let settings = DatabaseSettings::sqlite("sqlite::memory:").with_table_prefix("t_");

		let executor = settings.connect().await.unwrap();

		assert_eq!(executor.kind(), DatabaseKind::Sqlite);
		assert_eq!(executor.table_prefix(), "t_");
	}
}
