//! The schema record, the unit of storage in the registry.
//!
//! A record is addressed by a case-normalised [`RecordId`]. Every accepted
//! content write bumps its `revision` by exactly one. Ownership (`managed`)
//! and `created_at` are fixed when the record is first written; deletion is a
//! soft toggle of `disabled`.

use std::fmt;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::release::parse_release;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Normalised record key. Lookups through it are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
  pub fn new(name: &str) -> Self { Self(name.trim().to_uppercase()) }

  pub fn as_str(&self) -> &str { &self.0 }

  /// Wrap an already-normalised key read back from storage.
  pub fn from_normalized(key: String) -> Self { Self(key) }
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Ownership ───────────────────────────────────────────────────────────────

/// Which party authors a record's content. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
  /// Sourced from an external release feed.
  Managed,
  /// Authored by a user.
  User,
}

impl Ownership {
  pub fn from_managed(managed: bool) -> Self {
    if managed { Self::Managed } else { Self::User }
  }

  pub fn is_managed(self) -> bool { matches!(self, Self::Managed) }
}

impl fmt::Display for Ownership {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Managed => "managed",
      Self::User => "user-defined",
    })
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A stored log-type schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRecord {
  pub id:            RecordId,
  /// The name as first written, before normalisation.
  pub name:          String,
  pub revision:      u64,
  pub managed:       bool,
  pub disabled:      bool,
  /// Release tag that last wrote a managed record. Always `None` for
  /// user-defined records.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub release:       Option<String>,
  pub description:   String,
  #[serde(rename = "referenceURL")]
  pub reference_url: String,
  pub spec:          String,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl SchemaRecord {
  /// User-defined and not disabled.
  pub fn is_custom(&self) -> bool { !self.managed && !self.disabled }

  pub fn is_managed(&self) -> bool { self.managed }

  pub fn ownership(&self) -> Ownership { Ownership::from_managed(self.managed) }

  /// The stored release parsed as a semantic version, if it is one.
  pub fn release_version(&self) -> Option<Version> {
    self.release.as_deref().and_then(parse_release)
  }
}

// ─── Write input ─────────────────────────────────────────────────────────────

/// Content fields a user supplies when creating or updating a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaUpdate {
  #[serde(default)]
  pub description:   String,
  #[serde(default, rename = "referenceURL")]
  pub reference_url: String,
  pub spec:          String,
}

/// Everything a content write overwrites. `release` must be set for managed
/// writes and is discarded for user-defined ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFields {
  pub release: Option<String>,
  pub update:  SchemaUpdate,
}

impl SchemaFields {
  pub fn user(update: SchemaUpdate) -> Self { Self { release: None, update } }

  pub fn managed(release: impl Into<String>, update: SchemaUpdate) -> Self {
    Self { release: Some(release.into()), update }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::record;

  #[test]
  fn record_id_is_case_insensitive() {
    assert_eq!(RecordId::new("Custom.Foo"), RecordId::new("CUSTOM.foo"));
    assert_eq!(RecordId::new(" Custom.Foo ").as_str(), "CUSTOM.FOO");
  }

  #[test]
  fn custom_excludes_managed_and_disabled() {
    let mut r = record("Custom.Foo", 1, false);
    assert!(r.is_custom());
    assert!(!r.is_managed());

    r.disabled = true;
    assert!(!r.is_custom());

    let m = record("AWS.CloudTrail", 1, true);
    assert!(!m.is_custom());
    assert!(m.is_managed());
    assert_eq!(m.ownership(), Ownership::Managed);
  }

  #[test]
  fn user_record_hides_release_in_json() {
    let r = record("Custom.Foo", 1, false);
    let json = serde_json::to_value(&r).unwrap();
    assert!(json.get("release").is_none());
    assert_eq!(json["referenceURL"], "");
  }
}
