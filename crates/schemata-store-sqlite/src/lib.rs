//! SQLite backend for the Schemata registry.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Conditional writes run inside a single
//! `IMMEDIATE` transaction, which makes the precondition check and the
//! mutation one atomic step.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
