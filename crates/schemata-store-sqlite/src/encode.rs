//! Encoding and decoding helpers between schema records and the plain-text
//! and integer representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Revisions are stored as
//! SQLite integers and converted with range checks. The release column is
//! never NULL; user-defined rows store an empty string.

use chrono::{DateTime, Utc};
use schemata_core::record::{RecordId, SchemaRecord};

use crate::{Error, Result};

/// Column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str = "record_id, name, revision, managed, disabled, \
                                  release, description, reference_url, spec, \
                                  created_at, updated_at";

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Revision ────────────────────────────────────────────────────────────────

pub fn encode_revision(id: &RecordId, revision: u64) -> Result<i64> {
  i64::try_from(revision).map_err(|_| Error::Decode {
    id:      id.to_string(),
    message: format!("revision {revision} exceeds the storable range"),
  })
}

fn decode_revision(id: &str, revision: i64) -> Result<u64> {
  u64::try_from(revision).map_err(|_| Error::Decode {
    id:      id.to_owned(),
    message: format!("negative revision {revision}"),
  })
}

// ─── Release ─────────────────────────────────────────────────────────────────

pub fn encode_release(release: Option<&str>) -> String {
  release.unwrap_or_default().to_owned()
}

fn decode_release(release: String) -> Option<String> {
  (!release.is_empty()).then_some(release)
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw values read directly from a `records` row.
pub struct RawRecord {
  pub record_id:     String,
  pub name:          String,
  pub revision:      i64,
  pub managed:       bool,
  pub disabled:      bool,
  pub release:       String,
  pub description:   String,
  pub reference_url: String,
  pub spec:          String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:     row.get(0)?,
      name:          row.get(1)?,
      revision:      row.get(2)?,
      managed:       row.get(3)?,
      disabled:      row.get(4)?,
      release:       row.get(5)?,
      description:   row.get(6)?,
      reference_url: row.get(7)?,
      spec:          row.get(8)?,
      created_at:    row.get(9)?,
      updated_at:    row.get(10)?,
    })
  }

  pub fn into_record(self) -> Result<SchemaRecord> {
    let revision = decode_revision(&self.record_id, self.revision)?;
    let created_at = decode_dt(&self.created_at)?;
    let updated_at = decode_dt(&self.updated_at)?;
    // User rows never carry a release, whatever the column holds.
    let release = if self.managed { decode_release(self.release) } else { None };

    Ok(SchemaRecord {
      id: RecordId::from_normalized(self.record_id),
      name: self.name,
      revision,
      managed: self.managed,
      disabled: self.disabled,
      release,
      description: self.description,
      reference_url: self.reference_url,
      spec: self.spec,
      created_at,
      updated_at,
    })
  }
}
