//! Error types for `schemata-core`.

use thiserror::Error;

use crate::record::Ownership;

/// Boxed error used for storage and collaborator failures whose concrete type
/// is owned by another crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// No record (or no record at the requested revision) exists for the id.
  #[error("schema record {id:?} not found at revision {revision}")]
  NotFound { id: String, revision: u64 },

  /// The write's ownership guard does not match the stored record.
  #[error("schema record {id:?} exists as a {stored} record")]
  OwnershipConflict { id: String, stored: Ownership },

  /// The stored revision is not the one the caller expected. `actual` is `0`
  /// when no record exists.
  #[error("schema record {id:?} is at revision {actual}, not {expected}")]
  RevisionConflict { id: String, expected: u64, actual: u64 },

  /// A managed release targets an id owned by a user-defined record.
  #[error("schema record {0:?} exists and is not managed")]
  AlreadyExists(String),

  #[error("invalid schema {id:?}: {message}")]
  ValidationFailed { id: String, message: String },

  #[error(
    "manifest entry {id:?} declares release {entry}, but the batch is {batch}"
  )]
  ManifestInconsistent { id: String, entry: String, batch: String },

  #[error("log type {0:?} is in use")]
  InUse(String),

  #[error("invalid release tag {0:?}")]
  InvalidRelease(String),

  /// An external capability failed.
  #[error("{operation} failed for {id:?}: {source}")]
  Collaborator {
    operation: &'static str,
    id:        String,
    #[source]
    source:    BoxError,
  },

  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  /// `true` for the conflicts a client resolves by re-reading and retrying.
  pub fn is_conflict(&self) -> bool {
    matches!(
      self,
      Self::OwnershipConflict { .. }
        | Self::RevisionConflict { .. }
        | Self::AlreadyExists(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
