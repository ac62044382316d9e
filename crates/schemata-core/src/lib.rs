//! Core types and trait definitions for the Schemata log-type registry.
//!
//! This crate has no HTTP or database dependencies. Storage
//! backends implement [`store::SchemaStore`]; the external capabilities the
//! registry consumes (validation, release feeds, catalog notification) are
//! expressed as traits in [`collab`] and implemented by the server binary.

// Trait methods spell out `impl Future + Send`; implementors may use `async fn`.
#![allow(async_fn_in_trait)]

pub mod collab;
pub mod error;
pub mod record;
pub mod registry;
pub mod release;
pub mod store;
pub mod write;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Error, Result};
pub use registry::Registry;
