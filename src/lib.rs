//! # Strata
//!
//! A multi-dialect data-access core: typed predicate and projection trees
//! compiled to parameterized SQL, declarative schema changes rendered as
//! dialect DDL, and transactional execution with bookkeeping.
//!
//! ## Crates
//!
//! - [`query`] (`strata-query`): entity metadata, value model, dialects,
//!   expression compiler and query SQL generator. No I/O.
//! - [`db`] (`strata-db`, feature `db`): executors, settings, migrations.
//! - [`Entity`](macro@Entity) (`strata-macros`, feature `macros`): the derive
//!   that describes a record type. Through this facade, derive with
//!   `#[entity(crate = "strata::query")]`.
//!
//! ## Feature Flags
//!
//! - `db` (default): executors, settings and migrations
//! - `macros` (default): `#[derive(Entity)]`
//! - `sqlite` (default): the SQLite executor
//! - `mysql`: the MySQL executor
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use strata::prelude::*;
//!
//! #[derive(Entity, Debug, Default)]
//! #[entity(table = "users", crate = "strata::query")]
//! struct User {
//!     #[column(key, identity)]
//!     id: i64,
//!     #[column(size = 100)]
//!     email: String,
//! }
//!
//! let dialect = Dialect::sql_server();
//! let email = Expression::property::<User>("email")?;
//! let sql = dialect
//!     .select::<User>()
//!     .filter(email.ends_with("@example.com"))
//!     .page(1, 20)
//!     .page_query()?;
//! ```

pub use strata_query as query;

#[cfg(feature = "db")]
pub use strata_db as db;

#[cfg(feature = "macros")]
pub use strata_macros::Entity;

pub mod prelude {
	pub use strata_query::prelude::*;

	#[cfg(feature = "db")]
	pub use strata_db::migrations::{DataMigration, Migration, MigrationBuilder, MigrationRepository, Migrator};
	#[cfg(feature = "db")]
	pub use strata_db::{DatabaseError, DatabaseSettings, Executor, MigrationError, Transaction};

	#[cfg(feature = "macros")]
	pub use strata_macros::Entity;
}
