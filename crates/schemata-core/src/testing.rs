//! Fixtures shared by the test suites of this workspace.
//!
//! Compiled for this crate's own tests and, through the `testing` feature,
//! for downstream crates' dev-dependencies.

use std::{
  collections::{HashMap, HashSet},
  sync::Mutex,
};

use chrono::{TimeZone, Utc};

use crate::{
  collab::{
    CatalogNotifier, CatalogUpdate, FieldSpec, InUseSource, ManifestSource,
    ParsedSchema, ReleaseFeed, SchemaChange, SchemaValidator, ValidationError,
  },
  error::BoxError,
  record::{RecordId, SchemaRecord},
  release::{ManifestEntry, Release},
};

// ─── Records ─────────────────────────────────────────────────────────────────

/// A stored record with fixed timestamps.
pub fn record(name: &str, revision: u64, managed: bool) -> SchemaRecord {
  let ts = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
  SchemaRecord {
    id: RecordId::new(name),
    name: name.to_owned(),
    revision,
    managed,
    disabled: false,
    release: managed.then(|| "v1.0.0".to_owned()),
    description: String::new(),
    reference_url: String::new(),
    spec: "ts: timestamp\n".to_owned(),
    created_at: ts,
    updated_at: ts,
  }
}

pub fn managed_record(name: &str, release: &str) -> SchemaRecord {
  SchemaRecord { release: Some(release.to_owned()), ..record(name, 1, true) }
}

/// A spec in the stub validator's `field: type` line format.
pub fn spec(fields: &[(&str, &str)]) -> String {
  fields.iter().map(|(name, kind)| format!("{name}: {kind}\n")).collect()
}

// ─── Collaborators ───────────────────────────────────────────────────────────

/// In-memory stand-ins for every external capability.
///
/// Specs are parsed as one `field: type` pair per line. Removing or retyping
/// a field is incompatible; adding one is not.
#[derive(Debug, Default)]
pub struct StubCollaborators {
  pub in_use:        HashSet<String>,
  /// Manifests by URL.
  pub manifests:     HashMap<String, Vec<ManifestEntry>>,
  pub releases:      Vec<Release>,
  fail_notify:       bool,
  notifications:     Mutex<Vec<CatalogUpdate>>,
  feed_watermarks:   Mutex<Vec<Option<String>>>,
}

impl StubCollaborators {
  pub fn new() -> Self { Self::default() }

  pub fn with_in_use(mut self, name: &str) -> Self {
    self.in_use.insert(name.to_owned());
    self
  }

  pub fn with_manifest(mut self, url: &str, entries: Vec<ManifestEntry>) -> Self {
    self.manifests.insert(url.to_owned(), entries);
    self
  }

  pub fn with_releases(mut self, releases: Vec<Release>) -> Self {
    self.releases = releases;
    self
  }

  /// Make every catalog notification fail.
  pub fn with_failing_catalog(mut self) -> Self {
    self.fail_notify = true;
    self
  }

  /// Catalog updates received so far, oldest first.
  pub fn notifications(&self) -> Vec<CatalogUpdate> {
    self.notifications.lock().unwrap().clone()
  }

  /// The `since` argument of every release-feed call so far.
  pub fn feed_watermarks(&self) -> Vec<Option<String>> {
    self.feed_watermarks.lock().unwrap().clone()
  }
}

impl SchemaValidator for StubCollaborators {
  fn validate(&self, _name: &str, spec: &str) -> Result<ParsedSchema, ValidationError> {
    let mut fields = Vec::new();
    for line in spec.lines().map(str::trim).filter(|l| !l.is_empty()) {
      let (name, kind) = line
        .split_once(':')
        .ok_or_else(|| ValidationError(format!("malformed field line {line:?}")))?;
      let (name, kind) = (name.trim(), kind.trim());
      if name.is_empty() || kind.is_empty() {
        return Err(ValidationError(format!("malformed field line {line:?}")));
      }
      fields.push(FieldSpec { name: name.to_owned(), kind: kind.to_owned() });
    }
    if fields.is_empty() {
      return Err(ValidationError("schema has no fields".into()));
    }
    Ok(ParsedSchema { fields, ..Default::default() })
  }

  fn diff(
    &self,
    old: &ParsedSchema,
    new: &ParsedSchema,
  ) -> Result<Vec<SchemaChange>, ValidationError> {
    let mut changes = Vec::new();
    for f in &old.fields {
      match new.fields.iter().find(|n| n.name == f.name) {
        None => changes.push(SchemaChange::Removed(f.clone())),
        Some(n) if n.kind != f.kind => changes.push(SchemaChange::Retyped {
          name: f.name.clone(),
          from: f.kind.clone(),
          to:   n.kind.clone(),
        }),
        Some(_) => {}
      }
    }
    for n in &new.fields {
      if !old.fields.iter().any(|f| f.name == n.name) {
        changes.push(SchemaChange::Added(n.clone()));
      }
    }
    Ok(changes)
  }

  fn check_change_compatible(&self, change: &SchemaChange) -> Result<(), ValidationError> {
    match change {
      SchemaChange::Added(_) => Ok(()),
      SchemaChange::Removed(f) => {
        Err(ValidationError(format!("field {:?} was removed", f.name)))
      }
      SchemaChange::Retyped { name, from, to } => Err(ValidationError(format!(
        "field {name:?} changed type from {from} to {to}"
      ))),
    }
  }
}

impl InUseSource for StubCollaborators {
  async fn log_types_in_use(&self) -> Result<HashSet<String>, BoxError> {
    Ok(self.in_use.clone())
  }
}

impl CatalogNotifier for StubCollaborators {
  async fn notify_catalog(&self, update: CatalogUpdate) -> Result<(), BoxError> {
    if self.fail_notify {
      return Err("catalog queue unavailable".into());
    }
    self.notifications.lock().unwrap().push(update);
    Ok(())
  }
}

impl ManifestSource for StubCollaborators {
  async fn fetch_release_manifest(
    &self,
    url: String,
  ) -> Result<Vec<ManifestEntry>, BoxError> {
    self
      .manifests
      .get(&url)
      .cloned()
      .ok_or_else(|| format!("no manifest at {url}").into())
  }
}

impl ReleaseFeed for StubCollaborators {
  async fn release_feed(&self, since: Option<String>) -> Result<Vec<Release>, BoxError> {
    self.feed_watermarks.lock().unwrap().push(since);
    Ok(self.releases.clone())
  }
}
