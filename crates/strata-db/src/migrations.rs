//! # Schema migrations
//!
//! Operations are declared with a [`MigrationBuilder`], rendered per dialect
//! by a [`MigrationsSqlGenerator`] and executed, together with their
//! bookkeeping row, by the [`MigrationRepository`]. [`Migrator`] drives
//! versioned [`DataMigration`]s at startup.
//!
//! ```rust,ignore
//! use strata_db::migrations::{DataMigration, MigrationBuilder, MigrationRepository, Migrator};
//!
//! struct CreateUsers;
//!
//! impl DataMigration for CreateUsers {
//!     fn id(&self) -> &str {
//!         "create-users"
//!     }
//!
//!     fn create(&self, builder: &mut MigrationBuilder) {
//!         builder.create_table::<User>();
//!     }
//! }
//!
//! let mut migrator = Migrator::new(MigrationRepository::new(executor));
//! migrator.register(CreateUsers);
//! migrator.migrate(&CancellationToken::new()).await?;
//! ```

pub mod builder;
pub mod generator;
pub mod migrator;
pub mod operations;
pub mod repository;

pub use builder::{CreateTableBuilder, MigrationBuilder};
pub use generator::{
	CommandList, MigrationCommand, MigrationsSqlGenerator, MySqlMigrationsSqlGenerator,
	SqlServerMigrationsSqlGenerator, SqliteMigrationsSqlGenerator, generator_for,
};
pub use migrator::{DataMigration, Migrator};
pub use operations::{
	Annotations, ColumnDefinition, CreateTableOperation, ForeignKeyDefinition, IndexDefinition,
	MigrationOperation, PrimaryKeyDefinition, ReferentialAction, SequenceDefinition,
	UniqueConstraintDefinition,
};
pub use repository::{BlockingMigrationRepository, Migration, MigrationRepository};
