//! ETag computation for schema records.
//!
//! ETags are SHA-256 hashes over the record's key, revision, disabled flag
//! and `updated_at`. Toggling a record changes its ETag even though the
//! revision stays the same.

use schemata_core::record::SchemaRecord;
use sha2::{Digest, Sha256};

/// Compute a quoted strong ETag for `record`.
pub fn compute_etag(record: &SchemaRecord) -> String {
  let mut hasher = Sha256::new();
  hasher.update(record.id.as_str().as_bytes());
  hasher.update(record.revision.to_le_bytes());
  hasher.update([u8::from(record.disabled)]);
  hasher.update(record.updated_at.timestamp_micros().to_le_bytes());
  let hash = hasher.finalize();
  format!("\"{}\"", hex::encode(hash))
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use schemata_core::testing::record;

  use super::*;

  #[test]
  fn etag_is_stable_and_quoted() {
    let r = record("Custom.Foo", 3, false);
    let a = compute_etag(&r);
    assert_eq!(a, compute_etag(&r.clone()));
    assert!(a.starts_with('"') && a.ends_with('"'));
    assert_eq!(a.len(), 64 + 2);
  }

  #[test]
  fn etag_tracks_revision_and_toggle() {
    let r = record("Custom.Foo", 3, false);
    let base = compute_etag(&r);

    let bumped = record("Custom.Foo", 4, false);
    assert_ne!(compute_etag(&bumped), base);

    let mut toggled = r.clone();
    toggled.disabled = true;
    toggled.updated_at = r.updated_at + Duration::seconds(1);
    assert_ne!(compute_etag(&toggled), base);
  }
}
