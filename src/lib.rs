//! Persistence layer of the ticket service: tickets and their satellites, panels and forms,
//! support teams, custom integrations, entitlements, settings and the analytics views, all
//! on PostgreSQL through diesel-async.
//!
//! Repositories live under [`services`] as free functions taking `&mut AsyncPgConnection`.
//! [`Database`] owns the pool and runs multi statement operations in transactions.

mod sql_enum;

pub mod db;
pub mod error;
pub mod interval;
pub mod schema;
pub mod services;
pub mod snowflake;

pub use db::{Database, DatabaseConfig};
pub use error::{DbError, Result};
pub use snowflake::Snowflake;
