//! The `SchemaStore` trait and its conditional-write vocabulary.
//!
//! The trait is implemented by storage backends (e.g. `schemata-store-sqlite`).
//! A backend carries no business meaning: it shapes the precondition of a
//! single-item write, evaluates it atomically together with the mutation, and
//! hands back the stored item when the precondition does not hold.

use std::future::Future;

use chrono::{DateTime, Utc};
use futures::Stream;

use crate::record::{Ownership, RecordId, SchemaFields, SchemaRecord};

// ─── Conditional write ───────────────────────────────────────────────────────

/// What a conditional write changes once its precondition holds.
#[derive(Debug, Clone)]
pub enum Mutation {
  /// Overwrite the content fields and set `revision = expected + 1`.
  ///
  /// With `expected_revision == 0` the item must be absent; it is created
  /// with `name`, `managed` and `created_at` taken from the request. Those
  /// three are never touched by an update.
  Put(SchemaFields),
  /// Flip the soft-delete flag. Requires an existing item and leaves the
  /// revision unchanged.
  SetDisabled(bool),
}

/// A single-item write guarded by "absent, or (`managed == guard` and
/// `revision == expected_revision`)".
#[derive(Debug, Clone)]
pub struct WriteRequest {
  pub id:                RecordId,
  /// Original-case name, stored only on creation.
  pub name:              String,
  pub guard:             Ownership,
  pub expected_revision: u64,
  pub mutation:          Mutation,
  /// Becomes `updated_at`, and `created_at` on creation.
  pub now:               DateTime<Utc>,
}

/// Result of a conditional write.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
  /// The precondition held; this is the stored state after the write.
  Committed(SchemaRecord),
  /// The precondition failed. Carries the current stored item, or `None` if
  /// nothing is stored under the id.
  Rejected(Option<SchemaRecord>),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a transactional key-value backend holding schema records.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`). Dropping a future
/// cancels the call; a conditional write is either fully applied or not at
/// all.
pub trait SchemaStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Strongly consistent point read. `None` if nothing is stored.
  fn get(
    &self,
    id: RecordId,
  ) -> impl Future<Output = Result<Option<SchemaRecord>, Self::Error>> + Send + '_;

  /// Lazily scan every schema record, restricted server-side to the schema
  /// record kind. Each record is yielded once; there is no cross-item
  /// snapshot. Dropping the stream stops the scan.
  fn scan(
    &self,
  ) -> impl Stream<Item = Result<SchemaRecord, Self::Error>> + Send + '_;

  /// Apply `request` if and only if its precondition holds, atomically.
  fn conditional_write(
    &self,
    request: WriteRequest,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;
}
