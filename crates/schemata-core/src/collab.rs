//! Capabilities the registry consumes but does not implement.
//!
//! Schema content is opaque to the registry: parsing, validation and
//! compatibility checks belong to a [`SchemaValidator`]. Release manifests,
//! the release feed, the in-use lookup and catalog notification are likewise
//! supplied from outside. The server binary wires concrete implementations;
//! tests use `schemata_core::testing::StubCollaborators`.

use std::{collections::HashSet, future::Future};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  error::BoxError,
  release::{ManifestEntry, Release},
};

// ─── Validation ──────────────────────────────────────────────────────────────

/// A rejected schema definition or schema change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// A named, typed field of a parsed schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
  pub name: String,
  #[serde(rename = "type")]
  pub kind: String,
}

/// The validator's structured view of a schema definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSchema {
  #[serde(default)]
  pub description:   Option<String>,
  #[serde(default, rename = "referenceURL")]
  pub reference_url: Option<String>,
  pub fields:        Vec<FieldSpec>,
}

/// One difference between two versions of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum SchemaChange {
  Added(FieldSpec),
  Removed(FieldSpec),
  Retyped { name: String, from: String, to: String },
}

pub trait SchemaValidator: Send + Sync {
  /// Parse and validate a schema definition.
  fn validate(&self, name: &str, spec: &str) -> Result<ParsedSchema, ValidationError>;

  /// List the changes that turn `old` into `new`.
  fn diff(
    &self,
    old: &ParsedSchema,
    new: &ParsedSchema,
  ) -> Result<Vec<SchemaChange>, ValidationError>;

  /// Reject a change that would break readers of existing data.
  fn check_change_compatible(&self, change: &SchemaChange) -> Result<(), ValidationError>;
}

// ─── In-use lookup ───────────────────────────────────────────────────────────

pub trait InUseSource: Send + Sync {
  /// Names of the log types currently referenced elsewhere in the system.
  fn log_types_in_use(
    &self,
  ) -> impl Future<Output = Result<HashSet<String>, BoxError>> + Send + '_;
}

// ─── Catalog notification ────────────────────────────────────────────────────

/// Field changes of one log type, as sent to the downstream data catalog.
/// `None` on both sides means the log type was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogUpdate {
  pub name:       String,
  pub old_fields: Option<Vec<FieldSpec>>,
  pub new_fields: Option<Vec<FieldSpec>>,
}

pub trait CatalogNotifier: Send + Sync {
  /// Queue `update` for the catalog. Success means the update was accepted
  /// for delivery, not that it was applied.
  fn notify_catalog(
    &self,
    update: CatalogUpdate,
  ) -> impl Future<Output = Result<(), BoxError>> + Send + '_;
}

// ─── Releases ────────────────────────────────────────────────────────────────

pub trait ManifestSource: Send + Sync {
  fn fetch_release_manifest(
    &self,
    url: String,
  ) -> impl Future<Output = Result<Vec<ManifestEntry>, BoxError>> + Send + '_;
}

pub trait ReleaseFeed: Send + Sync {
  /// Releases published after `since` (all releases when `None`).
  fn release_feed(
    &self,
    since: Option<String>,
  ) -> impl Future<Output = Result<Vec<Release>, BoxError>> + Send + '_;
}

/// Every capability a [`crate::Registry`] needs, bundled.
pub trait Collaborators:
  SchemaValidator + InUseSource + CatalogNotifier + ManifestSource + ReleaseFeed
{
}

impl<T> Collaborators for T where
  T: SchemaValidator + InUseSource + CatalogNotifier + ManifestSource + ReleaseFeed
{
}
