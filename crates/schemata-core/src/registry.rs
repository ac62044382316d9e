//! The registry facade: the operation set exposed to callers.
//!
//! [`Registry`] composes the write protocol in [`crate::write`] with the
//! external capabilities in [`crate::collab`]. It holds no mutable state of
//! its own; the store's conditional write is the only synchronisation between
//! concurrent callers.

use futures::{Stream, TryStreamExt as _, future};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  Error, Result,
  collab::{CatalogUpdate, Collaborators, ParsedSchema, ValidationError},
  error::BoxError,
  record::{Ownership, RecordId, SchemaFields, SchemaRecord, SchemaUpdate},
  release::{self, ManifestEntry, Release, compare_releases, parse_release},
  store::SchemaStore,
  write,
};

/// Names of user-defined log types must start with this prefix.
pub const CUSTOM_LOG_PREFIX: &str = "Custom.";

// ─── Supporting types ────────────────────────────────────────────────────────

/// Which records a scan yields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanFilter {
  #[default]
  All,
  /// User-defined, not disabled.
  Custom,
  Managed,
  /// Not disabled, any ownership.
  Active,
}

impl ScanFilter {
  pub fn matches(self, record: &SchemaRecord) -> bool {
    match self {
      Self::All => true,
      Self::Custom => record.is_custom(),
      Self::Managed => record.is_managed(),
      Self::Active => !record.disabled,
    }
  }
}

/// What applying one manifest entry did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "record", rename_all = "lowercase")]
pub enum ApplyOutcome {
  /// The record was created or updated to the entry's release.
  Applied(SchemaRecord),
  /// The stored release was already at or past the entry's; nothing changed.
  Skipped(SchemaRecord),
}

impl ApplyOutcome {
  pub fn record(&self) -> &SchemaRecord {
    match self {
      Self::Applied(r) | Self::Skipped(r) => r,
    }
  }

  pub fn is_skipped(&self) -> bool { matches!(self, Self::Skipped(_)) }
}

fn collaborator(operation: &'static str, id: &str) -> impl FnOnce(BoxError) -> Error {
  let id = id.to_owned();
  move |source| Error::Collaborator { operation, id, source }
}

// ─── Registry ────────────────────────────────────────────────────────────────

pub struct Registry<S, C> {
  store:  S,
  collab: C,
}

impl<S, C> Registry<S, C>
where
  S: SchemaStore,
  C: Collaborators,
{
  pub fn new(store: S, collab: C) -> Self { Self { store, collab } }

  pub fn store(&self) -> &S { &self.store }

  pub fn collaborators(&self) -> &C { &self.collab }

  async fn load(&self, name: &str) -> Result<Option<SchemaRecord>> {
    self.store.get(RecordId::new(name)).await.map_err(Error::store)
  }

  // ── Generic record operations ─────────────────────────────────────────────

  /// Fetch a record. `revision == 0` means the latest; any other value must
  /// match the stored revision. Disabled records are returned.
  #[tracing::instrument(skip(self))]
  pub async fn get_schema(&self, name: &str, revision: u64) -> Result<SchemaRecord> {
    let record = self
      .load(name)
      .await?
      .filter(|r| revision == 0 || r.revision == revision);
    debug!(found = record.is_some(), "schema lookup");
    record.ok_or_else(|| Error::NotFound { id: RecordId::new(name).to_string(), revision })
  }

  /// Compare-and-swap write; see [`write::put`].
  pub async fn put_schema(
    &self,
    name: &str,
    guard: Ownership,
    expected_revision: u64,
    fields: SchemaFields,
  ) -> Result<SchemaRecord> {
    write::put(&self.store, name, guard, expected_revision, fields).await
  }

  /// Enable or soft-delete a record. Revision and content are unchanged.
  #[tracing::instrument(skip(self))]
  pub async fn toggle_schema(&self, name: &str, enabled: bool) -> Result<()> {
    let current = self.load(name).await?.ok_or_else(|| Error::NotFound {
      id:       RecordId::new(name).to_string(),
      revision: 0,
    })?;
    write::toggle(&self.store, &current, !enabled).await?;
    Ok(())
  }

  /// Lazily scan records matching `filter`. Dropping the stream ends the scan.
  pub fn scan_schemas(
    &self,
    filter: ScanFilter,
  ) -> impl Stream<Item = Result<SchemaRecord>> + Send + '_ {
    self
      .store
      .scan()
      .map_err(Error::store)
      .try_filter(move |r| future::ready(filter.matches(r)))
  }

  // ── Release synchronisation ───────────────────────────────────────────────

  /// The earliest release applied to any managed record.
  #[tracing::instrument(skip(self))]
  pub async fn min_applied_release(&self) -> Result<Option<String>> {
    release::min_applied_release(self.store.scan().map_err(Error::store)).await
  }

  /// Releases newer than [`Self::min_applied_release`], oldest first.
  #[tracing::instrument(skip(self))]
  pub async fn list_pending_releases(&self) -> Result<Vec<Release>> {
    let since = self.min_applied_release().await?;
    let releases = self
      .collab
      .release_feed(since.clone())
      .await
      .map_err(collaborator("release_feed", since.as_deref().unwrap_or("")))?;
    Ok(release::newer_than(since.as_deref(), releases))
  }

  /// Apply one manifest entry belonging to `batch_release`.
  #[tracing::instrument(skip(self, entry), fields(name = %entry.name, release = %entry.release))]
  pub async fn apply_release(
    &self,
    batch_release: &str,
    entry: ManifestEntry,
  ) -> Result<ApplyOutcome> {
    if entry.release != batch_release {
      return Err(Error::ManifestInconsistent {
        id:    entry.name,
        entry: entry.release,
        batch: batch_release.to_owned(),
      });
    }
    if parse_release(&entry.release).is_none() {
      return Err(Error::InvalidRelease(entry.release));
    }

    let parsed = self.validate(&entry.name, &entry.spec)?;
    let update = SchemaUpdate {
      description:   parsed.description.unwrap_or_default(),
      reference_url: parsed.reference_url.unwrap_or_default(),
      spec:          entry.spec,
    };

    let expected_revision = match self.load(&entry.name).await? {
      None => 0,
      Some(current) if !current.is_managed() => {
        return Err(Error::AlreadyExists(current.id.to_string()));
      }
      Some(current) => {
        let stored = current.release.as_deref().unwrap_or("");
        if compare_releases(stored, &entry.release).is_ge() {
          info!(stored, "managed schema already at or past release, skipping");
          return Ok(ApplyOutcome::Skipped(current));
        }
        current.revision
      }
    };

    let fields = SchemaFields::managed(entry.release, update);
    match write::put(&self.store, &entry.name, Ownership::Managed, expected_revision, fields)
      .await
    {
      Ok(record) => Ok(ApplyOutcome::Applied(record)),
      Err(Error::OwnershipConflict { id, .. }) => Err(Error::AlreadyExists(id)),
      Err(e) => Err(e),
    }
  }

  /// Fetch the manifest at `manifest_url` and apply every entry of it.
  ///
  /// The whole manifest is checked for consistency before anything is
  /// written. Entries are applied in order and the first failure stops the
  /// batch; entries already applied stay applied.
  #[tracing::instrument(skip(self))]
  pub async fn update_managed_schemas(
    &self,
    release: &str,
    manifest_url: &str,
  ) -> Result<Vec<ApplyOutcome>> {
    let entries = self
      .collab
      .fetch_release_manifest(manifest_url.to_owned())
      .await
      .map_err(collaborator("fetch_release_manifest", manifest_url))?;

    if let Some(bad) = entries.iter().find(|e| e.release != release) {
      return Err(Error::ManifestInconsistent {
        id:    bad.name.clone(),
        entry: bad.release.clone(),
        batch: release.to_owned(),
      });
    }

    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in entries {
      outcomes.push(self.apply_release(release, entry).await?);
    }
    info!(
      applied = outcomes.iter().filter(|o| !o.is_skipped()).count(),
      skipped = outcomes.iter().filter(|o| o.is_skipped()).count(),
      "managed schemas updated"
    );
    Ok(outcomes)
  }

  // ── Custom logs ───────────────────────────────────────────────────────────

  /// A user-defined, enabled record; `revision == 0` means the latest.
  #[tracing::instrument(skip(self))]
  pub async fn get_custom_log(&self, name: &str, revision: u64) -> Result<SchemaRecord> {
    self
      .load(name)
      .await?
      .filter(|r| r.is_custom() && (revision == 0 || r.revision == revision))
      .ok_or_else(|| Error::NotFound { id: RecordId::new(name).to_string(), revision })
  }

  /// Create (`revision == 0`) or update a user-defined log type, then tell
  /// the catalog about its fields.
  ///
  /// Updates must be backward compatible with the stored schema.
  #[tracing::instrument(skip(self, update))]
  pub async fn put_custom_log(
    &self,
    name: &str,
    revision: u64,
    update: SchemaUpdate,
  ) -> Result<SchemaRecord> {
    if !name.starts_with(CUSTOM_LOG_PREFIX) {
      return Err(Error::ValidationFailed {
        id:      name.to_owned(),
        message: format!("custom log types must start with {CUSTOM_LOG_PREFIX:?}"),
      });
    }
    let parsed = self.validate(name, &update.spec)?;

    let (record, old_fields) = if revision == 0 {
      let record =
        write::put(&self.store, name, Ownership::User, 0, SchemaFields::user(update))
          .await?;
      (record, None)
    } else {
      let current = match self.get_custom_log(name, 0).await {
        Err(Error::NotFound { id, .. }) => return Err(Error::NotFound { id, revision }),
        other => other?,
      };
      if current.revision != revision {
        return Err(Error::RevisionConflict {
          id:       current.id.to_string(),
          expected: revision,
          actual:   current.revision,
        });
      }
      let current_parsed = self.validate(name, &current.spec)?;
      self.check_update(name, &current_parsed, &parsed)?;

      let record = write::put(
        &self.store,
        name,
        Ownership::User,
        current.revision,
        SchemaFields::user(update),
      )
      .await?;
      (record, Some(current_parsed.fields))
    };

    self
      .collab
      .notify_catalog(CatalogUpdate {
        name:       name.to_owned(),
        old_fields,
        new_fields: Some(parsed.fields),
      })
      .await
      .map_err(collaborator("notify_catalog", name))?;
    Ok(record)
  }

  /// Soft-delete a user-defined log type that nothing references.
  #[tracing::instrument(skip(self))]
  pub async fn del_custom_log(&self, name: &str) -> Result<()> {
    let in_use = self
      .collab
      .log_types_in_use()
      .await
      .map_err(collaborator("log_types_in_use", name))?;
    let id = RecordId::new(name);
    if in_use.iter().any(|used| RecordId::new(used) == id) {
      return Err(Error::InUse(name.to_owned()));
    }

    let current = self.get_custom_log(name, 0).await?;
    write::toggle(&self.store, &current, true).await?;

    self
      .collab
      .notify_catalog(CatalogUpdate {
        name:       name.to_owned(),
        old_fields: None,
        new_fields: None,
      })
      .await
      .map_err(collaborator("notify_catalog", name))?;
    Ok(())
  }

  /// Every user-defined, enabled record.
  pub async fn list_custom_logs(&self) -> Result<Vec<SchemaRecord>> {
    self.scan_schemas(ScanFilter::Custom).try_collect().await
  }

  // ── Validation helpers ────────────────────────────────────────────────────

  fn validate(&self, name: &str, spec: &str) -> Result<ParsedSchema> {
    self.collab.validate(name, spec).map_err(|e| Error::ValidationFailed {
      id:      name.to_owned(),
      message: e.0,
    })
  }

  /// Every change from `old` to `new` must be compatible; all offending
  /// changes are reported together.
  fn check_update(&self, name: &str, old: &ParsedSchema, new: &ParsedSchema) -> Result<()> {
    let invalid = |e: ValidationError| Error::ValidationFailed {
      id:      name.to_owned(),
      message: format!("schema update is not backwards compatible: {e}"),
    };
    let problems: Vec<String> = self
      .collab
      .diff(old, new)
      .map_err(invalid)?
      .iter()
      .filter_map(|c| self.collab.check_change_compatible(c).err())
      .map(|e| e.0)
      .collect();
    if problems.is_empty() {
      Ok(())
    } else {
      Err(invalid(ValidationError(problems.join("; "))))
    }
  }
}
