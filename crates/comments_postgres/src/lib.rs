//! comments_postgres: PostgreSQL adapter for comments_core.

pub mod sqlx_types;
pub mod store;

pub use store::{PgStore, PgUnitOfWork};
