//! # strata-query
//!
//! The compiler half of Strata: entity metadata, the value model, per-dialect
//! SQL rules and the expression and query SQL generators. Nothing in this crate
//! performs I/O; executors live in `strata-db`.
//!
//! ## Architecture
//!
//! - [`metadata`]: process-wide cache of [`EntityType`] descriptions, built
//!   once per type from the [`Entity`] trait
//! - [`value`]: [`Value`] and the logical [`ColumnType`]
//! - [`backend`]: [`SqlHelper`] and [`TypeMapper`] for SQL Server, MySQL and
//!   SQLite, plus the [`SqlWriter`] buffer
//! - [`translators`]: ordered member, method-call and fragment rewrite rules
//! - [`compiler`]: the [`ExpressionVisitor`] and its dialect overrides
//! - [`query`]: [`QuerySql`], [`QueryBuilder`] and the [`QuerySqlGenerator`]s
//!   (`any`, `query`, `page_query`, `size_query`, `move_rows`)
//! - [`dialect`]: [`Dialect`], which bundles all of the above per engine
//!
//! ## Quick Start
//!
//! ```rust
//! use strata_query::prelude::*;
//!
//! let dialect = Dialect::sqlite();
//! let predicate = Expression::fragment("\"name\"").starts_with("ab");
//! let compiled = dialect.compile(&predicate).unwrap();
//!
//! assert_eq!(compiled.sql, r#""name" LIKE 'ab%' ESCAPE '\'"#);
//! ```
//!
//! ## Dialect Differences
//!
//! | Feature | SQL Server | MySQL | SQLite |
//! |---------|------------|-------|--------|
//! | Identifier quoting | `[name]` | `` `name` `` | `"name"` |
//! | Placeholder | `@name` | `?name` | `@name` |
//! | Paging | `OFFSET .. FETCH NEXT` | `LIMIT offset, size` | `LIMIT offset, size` |
//! | Row cap | `TOP n` | `LIMIT n` | `LIMIT n` |
//! | Reorder | T-SQL script | session-variable script | single `UPDATE` |
//!
//! Table names carry the [`PREFIX_PLACEHOLDER`] marker; executors replace it
//! with the configured table prefix before sending SQL.

pub mod backend;
pub mod compiler;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod metadata;
pub mod query;
pub mod translators;
pub mod value;

/// Prelude module for convenient imports.
pub mod prelude {
	pub use crate::backend::{
		CompiledSql, DatabaseKind, Parameter, SqlHelper, SqlWriter, TypeMapper,
	};
	pub use crate::compiler::ExpressionVisitor;
	pub use crate::dialect::Dialect;
	pub use crate::error::{QueryError, Result};
	pub use crate::expr::{BinaryOp, DatePart, Expression, Method, TypeOwner, UnaryOp};
	pub use crate::metadata::{
		Entity, EntityDescriptor, EntityType, Key, PREFIX_PLACEHOLDER, Property, PropertyDescriptor,
		apply_prefix, get_entity_type, prefixed,
	};
	pub use crate::query::{
		JoinKind, MoveDirection, MoveOutcome, MoveRequest, MoveStatement, PagedSql, QueryBuilder,
		QuerySql, QuerySqlGenerator,
	};
	pub use crate::translators::TranslatorRegistry;
	pub use crate::value::{ColumnType, FromValue, SqlType, Value};
}

pub use prelude::*;
