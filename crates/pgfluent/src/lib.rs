//! # pgfluent
//!
//! A schema-declared, fluent PostgreSQL query builder for Rust.
//!
//! ## Features
//!
//! - **Declared schemas**: tables are registered once as immutable [`Table`]
//!   descriptors with typed columns
//! - **Fluent statements**: SELECT / UPDATE / DELETE / CREATE TABLE built by
//!   method chaining, compiled to one parameterized statement
//! - **Operator conditions**: columns produce [`Condition`] leaves, combined
//!   with `&` / `|` and parenthesized explicitly
//! - **Fail fast**: unknown columns, bad identifiers, and unsafe statements
//!   are `Validation` errors before any SQL reaches the database
//! - **Transaction-friendly**: pass a transaction anywhere a
//!   [`GenericClient`] is expected
//! - **Safe defaults**: DELETE requires WHERE (or an explicit opt-out),
//!   UPDATE requires SET
//!
//! ## Example
//!
//! ```ignore
//! use pgfluent::Table;
//!
//! let pokemon = Table::builder("Pokemon")
//!     .varchar("name", 50)
//!     .varchar("trainer", 50)
//!     .integer("power")
//!     .build()?;
//!
//! let name = pokemon.column("name")?.clone();
//! let power = pokemon.column("power")?.clone();
//!
//! let rows = pokemon
//!     .select(&["name", "trainer"])
//!     .where_(power.lte(1000) & name.like("%chu"))
//!     .order_by("name")
//!     .fetch(&client)
//!     .await?;
//! ```

pub mod client;
pub mod column;
pub mod condition;
pub mod error;
pub mod query;
pub mod table;
pub mod value;

mod ident;

pub use client::GenericClient;
pub use column::{Column, ColumnType};
pub use condition::Condition;
pub use error::{QueryError, QueryResult};
pub use query::{Query, QueryKind, QueryOutput};
pub use table::{Meta, Table, TableBuilder};
pub use value::{Record, Value};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};
