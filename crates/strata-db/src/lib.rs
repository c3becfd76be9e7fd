//! # strata-db
//!
//! The execution half of Strata: the transactional executor contract and its
//! sqlx implementations, database settings and schema migrations.
//!
//! ## Architecture
//!
//! - [`backends`]: [`Executor`] and [`Transaction`], statement preparation
//!   (prefix substitution, positional placeholders) and the SQLite and MySQL
//!   executors
//! - [`conf`]: [`DatabaseSettings`] from TOML and the environment
//! - [`migrations`]: operation model, builder, per-dialect DDL generators,
//!   bookkeeping repository and migrator
//! - [`error`]: [`DatabaseError`] and [`MigrationError`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata_db::conf::DatabaseSettings;
//! use strata_db::migrations::{MigrationBuilder, MigrationRepository, Migration};
//! use tokio_util::sync::CancellationToken;
//!
//! let settings = DatabaseSettings::sqlite("sqlite::memory:").with_table_prefix("app_");
//! let repository = MigrationRepository::from_settings(&settings).await?;
//! let cancel = CancellationToken::new();
//! repository.ensure_migration_table_exists_async(&cancel).await?;
//!
//! let mut builder = MigrationBuilder::new();
//! builder.create_table::<User>();
//! repository
//!     .execute_async(&Migration::new("create-users", 1), builder.operations(), &cancel)
//!     .await?;
//! ```

pub mod backends;
pub mod conf;
pub mod error;
pub mod migrations;

pub use backends::{Executor, PreparedStatement, Row, Transaction, in_transaction};
pub use conf::DatabaseSettings;
pub use error::{DatabaseError, MigrationError, Result};

#[cfg(feature = "mysql")]
pub use backends::MySqlExecutor;
#[cfg(feature = "sqlite")]
pub use backends::SqliteExecutor;
