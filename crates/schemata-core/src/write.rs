//! Optimistic-concurrency write protocol.
//!
//! Every mutation of a record goes through [`SchemaStore::conditional_write`].
//! When the store rejects a write, the snapshot it returns is decoded into a
//! [`Rejection`] so the caller learns which precondition failed. Nothing here
//! retries: the content of a retried write depends on the new base, which only
//! the caller can recompute.

use chrono::Utc;
use tracing::{info, warn};

use crate::{
  Error, Result,
  record::{Ownership, RecordId, SchemaFields, SchemaRecord},
  store::{Mutation, SchemaStore, WriteOutcome, WriteRequest},
};

// ─── Rejection ───────────────────────────────────────────────────────────────

/// Why a conditional write was rejected, decoded from the store's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
  /// The stored record belongs to the other ownership class.
  OwnershipMismatch { stored: Ownership },
  /// Ownership matches but the stored revision differs. `actual` is `0` when
  /// nothing is stored.
  RevisionMismatch { actual: u64 },
}

impl Rejection {
  pub fn classify(guard: Ownership, snapshot: Option<&SchemaRecord>) -> Self {
    match snapshot {
      Some(current) if current.ownership() != guard => {
        Self::OwnershipMismatch { stored: current.ownership() }
      }
      Some(current) => Self::RevisionMismatch { actual: current.revision },
      None => Self::RevisionMismatch { actual: 0 },
    }
  }

  pub fn into_error(self, id: &RecordId, expected: u64) -> Error {
    match self {
      Self::OwnershipMismatch { stored } => {
        Error::OwnershipConflict { id: id.to_string(), stored }
      }
      Self::RevisionMismatch { actual } => Error::RevisionConflict {
        id: id.to_string(),
        expected,
        actual,
      },
    }
  }
}

// ─── Put ─────────────────────────────────────────────────────────────────────

/// Create or update the record named `name`.
///
/// `expected_revision` is the revision the caller believes is stored; `0`
/// means "create, the record must not exist". On success the record is at
/// `expected_revision + 1`.
#[tracing::instrument(skip(store, content))]
pub async fn put<S: SchemaStore>(
  store: &S,
  name: &str,
  guard: Ownership,
  expected_revision: u64,
  content: SchemaFields,
) -> Result<SchemaRecord> {
  let id = RecordId::new(name);
  let fields = normalize_fields(&id, guard, content)?;

  let request = WriteRequest {
    id: id.clone(),
    name: name.trim().to_owned(),
    guard,
    expected_revision,
    mutation: Mutation::Put(fields),
    now: Utc::now(),
  };

  match store.conditional_write(request).await.map_err(Error::store)? {
    WriteOutcome::Committed(record) => {
      info!(revision = record.revision, "schema record committed");
      Ok(record)
    }
    WriteOutcome::Rejected(snapshot) => {
      let rejection = Rejection::classify(guard, snapshot.as_ref());
      warn!(?rejection, expected_revision, "schema write rejected");
      Err(rejection.into_error(&id, expected_revision))
    }
  }
}

/// Managed writes must carry a parseable release; user writes never store one.
fn normalize_fields(
  id: &RecordId,
  guard: Ownership,
  mut fields: SchemaFields,
) -> Result<SchemaFields> {
  match guard {
    Ownership::Managed => match fields.release.as_deref() {
      Some(tag) if crate::release::parse_release(tag).is_some() => Ok(fields),
      Some(tag) => Err(Error::InvalidRelease(tag.to_owned())),
      None => Err(Error::InvalidRelease(format!("<missing for {id}>"))),
    },
    Ownership::User => {
      fields.release = None;
      Ok(fields)
    }
  }
}

// ─── Toggle ──────────────────────────────────────────────────────────────────

/// Set the soft-delete flag of `current`, guarded on its ownership and
/// revision. The revision is not bumped.
#[tracing::instrument(skip(store, current), fields(id = %current.id, revision = current.revision))]
pub async fn toggle<S: SchemaStore>(
  store: &S,
  current: &SchemaRecord,
  disabled: bool,
) -> Result<SchemaRecord> {
  let request = WriteRequest {
    id:                current.id.clone(),
    name:              current.name.clone(),
    guard:             current.ownership(),
    expected_revision: current.revision,
    mutation:          Mutation::SetDisabled(disabled),
    now:               Utc::now(),
  };

  match store.conditional_write(request).await.map_err(Error::store)? {
    WriteOutcome::Committed(record) => {
      info!(disabled, "schema record toggled");
      Ok(record)
    }
    WriteOutcome::Rejected(None) => Err(Error::NotFound {
      id:       current.id.to_string(),
      revision: current.revision,
    }),
    WriteOutcome::Rejected(Some(snapshot)) => {
      let rejection = Rejection::classify(current.ownership(), Some(&snapshot));
      warn!(?rejection, "schema toggle rejected");
      Err(rejection.into_error(&current.id, current.revision))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::record;

  #[test]
  fn ownership_mismatch_wins_over_revision() {
    let stored = record("Custom.Foo", 7, false);
    let r = Rejection::classify(Ownership::Managed, Some(&stored));
    assert_eq!(r, Rejection::OwnershipMismatch { stored: Ownership::User });
  }

  #[test]
  fn revision_mismatch_reports_actual() {
    let stored = record("Custom.Foo", 2, false);
    let r = Rejection::classify(Ownership::User, Some(&stored));
    assert_eq!(r, Rejection::RevisionMismatch { actual: 2 });

    let err = r.into_error(&stored.id, 1);
    assert!(matches!(
      err,
      Error::RevisionConflict { expected: 1, actual: 2, .. }
    ));
  }

  #[test]
  fn absent_snapshot_is_revision_zero() {
    let r = Rejection::classify(Ownership::User, None);
    assert_eq!(r, Rejection::RevisionMismatch { actual: 0 });
  }

  #[test]
  fn managed_fields_require_release() {
    let id = RecordId::new("AWS.ALB");
    let err = normalize_fields(&id, Ownership::Managed, SchemaFields::default())
      .unwrap_err();
    assert!(matches!(err, Error::InvalidRelease(_)));

    let err = normalize_fields(
      &id,
      Ownership::Managed,
      SchemaFields::managed("latest", Default::default()),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidRelease(tag) if tag == "latest"));
  }

  #[test]
  fn user_fields_drop_release() {
    let id = RecordId::new("Custom.Foo");
    let fields = normalize_fields(
      &id,
      Ownership::User,
      SchemaFields::managed("v1.0.0", Default::default()),
    )
    .unwrap();
    assert!(fields.release.is_none());
  }
}
