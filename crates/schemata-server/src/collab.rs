//! Concrete collaborators wired into the registry by the server binary.
//!
//! - [`JsonSpecValidator`] reads schema definitions written as JSON.
//! - [`HttpReleaseSource`] fetches the release feed and manifests over HTTP.
//! - [`CatalogWebhook`] posts catalog updates to a webhook, or only logs them
//!   when none is configured.
//! - [`StaticInUse`] reports a fixed set of in-use log types from config.

use std::collections::HashSet;

use schemata_core::{
  collab::{
    CatalogNotifier, CatalogUpdate, FieldSpec, InUseSource, ManifestSource,
    ParsedSchema, ReleaseFeed, SchemaChange, SchemaValidator, ValidationError,
  },
  error::BoxError,
  release::{ManifestEntry, Release},
};
use tracing::{debug, info};

use crate::{ServerConfig, error::Error};

/// Field types a schema definition may use.
pub const FIELD_TYPES: &[&str] =
  &["string", "int", "bigint", "float", "boolean", "timestamp", "object", "array"];

// ─── Validator ───────────────────────────────────────────────────────────────

/// Validates schema definitions of the form
/// `{"description": "...", "referenceURL": "...", "fields": [{"name": "...", "type": "..."}]}`.
///
/// Adding fields is compatible. Removing a field or changing its type is not,
/// except widening `int` to `bigint`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSpecValidator;

impl SchemaValidator for JsonSpecValidator {
  fn validate(&self, name: &str, spec: &str) -> Result<ParsedSchema, ValidationError> {
    let parsed: ParsedSchema = serde_json::from_str(spec)
      .map_err(|e| ValidationError(format!("{name}: malformed schema: {e}")))?;

    if parsed.fields.is_empty() {
      return Err(ValidationError(format!("{name}: schema has no fields")));
    }
    let mut seen = HashSet::new();
    for field in &parsed.fields {
      if field.name.trim().is_empty() {
        return Err(ValidationError(format!("{name}: field with empty name")));
      }
      if !seen.insert(field.name.as_str()) {
        return Err(ValidationError(format!("{name}: duplicate field {:?}", field.name)));
      }
      if !FIELD_TYPES.contains(&field.kind.as_str()) {
        return Err(ValidationError(format!(
          "{name}: field {:?} has unknown type {:?}",
          field.name, field.kind
        )));
      }
    }
    Ok(parsed)
  }

  fn diff(
    &self,
    old: &ParsedSchema,
    new: &ParsedSchema,
  ) -> Result<Vec<SchemaChange>, ValidationError> {
    let find = |fields: &[FieldSpec], name: &str| {
      fields.iter().find(|f| f.name == name).cloned()
    };

    let mut changes = Vec::new();
    for before in &old.fields {
      match find(new.fields.as_slice(), &before.name) {
        None => changes.push(SchemaChange::Removed(before.clone())),
        Some(after) if after.kind != before.kind => changes.push(SchemaChange::Retyped {
          name: before.name.clone(),
          from: before.kind.clone(),
          to:   after.kind,
        }),
        Some(_) => {}
      }
    }
    changes.extend(
      new
        .fields
        .iter()
        .filter(|f| find(old.fields.as_slice(), &f.name).is_none())
        .cloned()
        .map(SchemaChange::Added),
    );
    Ok(changes)
  }

  fn check_change_compatible(&self, change: &SchemaChange) -> Result<(), ValidationError> {
    match change {
      SchemaChange::Added(_) => Ok(()),
      SchemaChange::Retyped { from, to, .. } if from == "int" && to == "bigint" => Ok(()),
      SchemaChange::Retyped { name, from, to } => Err(ValidationError(format!(
        "field {name:?} cannot change type from {from} to {to}"
      ))),
      SchemaChange::Removed(f) => {
        Err(ValidationError(format!("field {:?} cannot be removed", f.name)))
      }
    }
  }
}

// ─── Releases ────────────────────────────────────────────────────────────────

/// Release feed and manifest fetcher over HTTP.
///
/// The feed URL answers `GET ?since=<tag>` with a JSON array of releases;
/// each manifest URL answers `GET` with a JSON array of manifest entries.
#[derive(Clone)]
pub struct HttpReleaseSource {
  client:   reqwest::Client,
  feed_url: String,
}

impl HttpReleaseSource {
  pub fn new(client: reqwest::Client, feed_url: impl Into<String>) -> Self {
    Self { client, feed_url: feed_url.into() }
  }
}

impl ReleaseFeed for HttpReleaseSource {
  async fn release_feed(&self, since: Option<String>) -> Result<Vec<Release>, BoxError> {
    let mut req = self.client.get(&self.feed_url);
    if let Some(since) = &since {
      req = req.query(&[("since", since)]);
    }
    let releases: Vec<Release> = req.send().await?.error_for_status()?.json().await?;
    debug!(count = releases.len(), ?since, "fetched release feed");
    Ok(releases)
  }
}

impl ManifestSource for HttpReleaseSource {
  async fn fetch_release_manifest(
    &self,
    url: String,
  ) -> Result<Vec<ManifestEntry>, BoxError> {
    let entries: Vec<ManifestEntry> = self
      .client
      .get(&url)
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;
    debug!(count = entries.len(), %url, "fetched release manifest");
    Ok(entries)
  }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Sends catalog updates as JSON `POST`s to `url`, or logs them when unset.
#[derive(Clone)]
pub struct CatalogWebhook {
  client: reqwest::Client,
  url:    Option<String>,
}

impl CatalogWebhook {
  pub fn new(client: reqwest::Client, url: Option<String>) -> Self { Self { client, url } }
}

impl CatalogNotifier for CatalogWebhook {
  async fn notify_catalog(&self, update: CatalogUpdate) -> Result<(), BoxError> {
    let Some(url) = &self.url else {
      info!(
        name = %update.name,
        removed = update.new_fields.is_none(),
        "catalog update (no webhook configured)"
      );
      return Ok(());
    };
    self
      .client
      .post(url)
      .json(&update)
      .send()
      .await?
      .error_for_status()?;
    debug!(name = %update.name, "catalog update delivered");
    Ok(())
  }
}

// ─── In use ──────────────────────────────────────────────────────────────────

/// A fixed set of log types reported as in use.
#[derive(Debug, Default, Clone)]
pub struct StaticInUse(pub HashSet<String>);

impl InUseSource for StaticInUse {
  async fn log_types_in_use(&self) -> Result<HashSet<String>, BoxError> {
    Ok(self.0.clone())
  }
}

// ─── Bundle ──────────────────────────────────────────────────────────────────

/// Every collaborator the registry needs, built from [`ServerConfig`].
#[derive(Clone)]
pub struct ServerCollaborators {
  pub validator: JsonSpecValidator,
  pub releases:  HttpReleaseSource,
  pub catalog:   CatalogWebhook,
  pub in_use:    StaticInUse,
}

impl ServerCollaborators {
  pub fn from_config(config: &ServerConfig) -> Result<Self, Error> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("schemata/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self {
      validator: JsonSpecValidator,
      releases:  HttpReleaseSource::new(client.clone(), &config.release_feed_url),
      catalog:   CatalogWebhook::new(client, config.catalog_webhook_url.clone()),
      in_use:    StaticInUse(config.in_use.iter().cloned().collect()),
    })
  }
}

impl SchemaValidator for ServerCollaborators {
  fn validate(&self, name: &str, spec: &str) -> Result<ParsedSchema, ValidationError> {
    self.validator.validate(name, spec)
  }

  fn diff(
    &self,
    old: &ParsedSchema,
    new: &ParsedSchema,
  ) -> Result<Vec<SchemaChange>, ValidationError> {
    self.validator.diff(old, new)
  }

  fn check_change_compatible(&self, change: &SchemaChange) -> Result<(), ValidationError> {
    self.validator.check_change_compatible(change)
  }
}

impl InUseSource for ServerCollaborators {
  async fn log_types_in_use(&self) -> Result<HashSet<String>, BoxError> {
    self.in_use.log_types_in_use().await
  }
}

impl CatalogNotifier for ServerCollaborators {
  async fn notify_catalog(&self, update: CatalogUpdate) -> Result<(), BoxError> {
    self.catalog.notify_catalog(update).await
  }
}

impl ManifestSource for ServerCollaborators {
  async fn fetch_release_manifest(
    &self,
    url: String,
  ) -> Result<Vec<ManifestEntry>, BoxError> {
    self.releases.fetch_release_manifest(url).await
  }
}

impl ReleaseFeed for ServerCollaborators {
  async fn release_feed(&self, since: Option<String>) -> Result<Vec<Release>, BoxError> {
    self.releases.release_feed(since).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn spec(fields: &[(&str, &str)]) -> String {
    let fields: Vec<_> = fields
      .iter()
      .map(|(name, kind)| serde_json::json!({ "name": name, "type": kind }))
      .collect();
    serde_json::json!({ "description": "test", "fields": fields }).to_string()
  }

  fn parse(fields: &[(&str, &str)]) -> ParsedSchema {
    JsonSpecValidator.validate("Custom.T", &spec(fields)).unwrap()
  }

  #[test]
  fn accepts_well_formed_schema() {
    let parsed = JsonSpecValidator
      .validate(
        "Custom.T",
        r#"{"description":"d","referenceURL":"https://x","fields":[{"name":"ts","type":"timestamp"}]}"#,
      )
      .unwrap();
    assert_eq!(parsed.description.as_deref(), Some("d"));
    assert_eq!(parsed.reference_url.as_deref(), Some("https://x"));
    assert_eq!(parsed.fields.len(), 1);
  }

  #[test]
  fn rejects_bad_schemas() {
    let v = JsonSpecValidator;
    assert!(v.validate("T", "not json").is_err());
    assert!(v.validate("T", r#"{"fields":[]}"#).is_err());
    assert!(v.validate("T", &spec(&[("a", "string"), ("a", "int")])).is_err());
    assert!(v.validate("T", &spec(&[("a", "uuid")])).is_err());
    assert!(v.validate("T", &spec(&[(" ", "string")])).is_err());
  }

  #[test]
  fn diff_lists_every_change() {
    let old = parse(&[("a", "string"), ("b", "int"), ("c", "float")]);
    let new = parse(&[("a", "string"), ("b", "bigint"), ("d", "boolean")]);
    let changes = JsonSpecValidator.diff(&old, &new).unwrap();
    assert_eq!(changes.len(), 3);
    assert!(changes.contains(&SchemaChange::Retyped {
      name: "b".into(),
      from: "int".into(),
      to:   "bigint".into(),
    }));
    assert!(changes.iter().any(|c| matches!(c, SchemaChange::Removed(f) if f.name == "c")));
    assert!(changes.iter().any(|c| matches!(c, SchemaChange::Added(f) if f.name == "d")));
  }

  #[test]
  fn only_additions_and_widening_are_compatible() {
    let v = JsonSpecValidator;
    let field = |name: &str, kind: &str| FieldSpec { name: name.into(), kind: kind.into() };

    assert!(v.check_change_compatible(&SchemaChange::Added(field("x", "string"))).is_ok());
    assert!(
      v.check_change_compatible(&SchemaChange::Retyped {
        name: "x".into(),
        from: "int".into(),
        to:   "bigint".into(),
      })
      .is_ok()
    );
    assert!(
      v.check_change_compatible(&SchemaChange::Retyped {
        name: "x".into(),
        from: "bigint".into(),
        to:   "int".into(),
      })
      .is_err()
    );
    assert!(v.check_change_compatible(&SchemaChange::Removed(field("x", "string"))).is_err());
  }

  #[tokio::test]
  async fn catalog_without_webhook_only_logs() {
    let catalog = CatalogWebhook::new(reqwest::Client::new(), None);
    let update = CatalogUpdate { name: "Custom.T".into(), old_fields: None, new_fields: None };
    assert!(catalog.notify_catalog(update).await.is_ok());
  }

  #[tokio::test]
  async fn static_in_use_reports_configured_names() {
    let in_use = StaticInUse(["Custom.A".to_owned()].into_iter().collect());
    let names = in_use.log_types_in_use().await.unwrap();
    assert!(names.contains("Custom.A"));
    assert_eq!(names.len(), 1);
  }
}
