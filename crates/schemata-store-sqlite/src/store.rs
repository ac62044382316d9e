//! [`SqliteStore`], the SQLite implementation of [`SchemaStore`].

use std::path::Path;

use futures::{Stream, TryStreamExt as _, stream};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::debug;

use schemata_core::{
  record::{RecordId, SchemaFields, SchemaRecord, SchemaUpdate},
  store::{Mutation, SchemaStore, WriteOutcome, WriteRequest},
};

use crate::{
  Error, Result,
  encode::{RECORD_COLUMNS, RawRecord, encode_dt, encode_release, encode_revision},
  schema::{RECORD_KIND, SCHEMA},
};

/// Rows fetched per scan round trip unless overridden.
pub const DEFAULT_PAGE_SIZE: usize = 100;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A schema store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  page_size:       usize,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, page_size: DEFAULT_PAGE_SIZE };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, page_size: DEFAULT_PAGE_SIZE };
    store.init_schema().await?;
    Ok(store)
  }

  /// Set how many rows a scan fetches per round trip (at least one).
  pub fn with_page_size(mut self, page_size: usize) -> Self {
    self.page_size = page_size.max(1);
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// One page of schema rows with ids strictly after `after`, in id order.
  async fn scan_page(&self, after: Option<String>) -> Result<Vec<SchemaRecord>> {
    let limit = i64::try_from(self.page_size).unwrap_or(i64::MAX);

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM records
           WHERE record_kind = ?1 AND (?2 IS NULL OR record_id > ?2)
           ORDER BY record_id
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![RECORD_KIND, after, limit], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

/// The statement a conditional write runs, with owned parameters.
enum Op {
  Create { name: String, release: String, update: SchemaUpdate },
  Update { next: i64, release: String, update: SchemaUpdate },
  SetDisabled(bool),
}

impl Op {
  fn from_request(request: WriteRequest) -> Result<Self> {
    Ok(match request.mutation {
      Mutation::Put(SchemaFields { release, update }) => {
        let release = encode_release(release.as_deref());
        if request.expected_revision == 0 {
          Self::Create { name: request.name, release, update }
        } else {
          let next = encode_revision(
            &request.id,
            request.expected_revision.saturating_add(1),
          )?;
          Self::Update { next, release, update }
        }
      }
      Mutation::SetDisabled(disabled) => Self::SetDisabled(disabled),
    })
  }
}

// ─── SchemaStore impl ────────────────────────────────────────────────────────

impl SchemaStore for SqliteStore {
  type Error = Error;

  async fn get(&self, id: RecordId) -> Result<Option<SchemaRecord>> {
    let id_str = id.to_string();

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RECORD_COLUMNS} FROM records
                 WHERE record_id = ?1 AND record_kind = ?2"
              ),
              rusqlite::params![id_str, RECORD_KIND],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  fn scan(&self) -> impl Stream<Item = Result<SchemaRecord>> + Send + '_ {
    // State: `None` once the last page was short, otherwise the cursor.
    stream::try_unfold(Some(None::<String>), move |cursor| async move {
      let Some(after) = cursor else {
        return Ok::<_, Error>(None);
      };
      let page = self.scan_page(after).await?;
      let next = if page.len() < self.page_size {
        None
      } else {
        page.last().map(|r| Some(r.id.to_string()))
      };
      Ok(Some((page, next)))
    })
    .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, Error>)))
    .try_flatten()
  }

  async fn conditional_write(&self, request: WriteRequest) -> Result<WriteOutcome> {
    // No stored row can sit at a revision whose successor overflows the column.
    if i64::try_from(request.expected_revision.saturating_add(1)).is_err() {
      debug!(
        id = %request.id,
        expected = request.expected_revision,
        "expected revision beyond storable range"
      );
      return Ok(WriteOutcome::Rejected(self.get(request.id).await?));
    }

    let id_str = request.id.to_string();
    let managed = request.guard.is_managed();
    let expected = encode_revision(&request.id, request.expected_revision)?;
    let now = encode_dt(request.now);
    let op = Op::from_request(request)?;

    let key = id_str.clone();
    let (changed, raw): (usize, Option<RawRecord>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = match op {
          Op::Create { name, release, update } => tx.execute(
            "INSERT INTO records (
               record_id, record_kind, name, revision, managed, disabled,
               release, description, reference_url, spec, created_at, updated_at
             ) VALUES (?1, ?2, ?3, 1, ?4, 0, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT (record_id, record_kind) DO NOTHING",
            rusqlite::params![
              key,
              RECORD_KIND,
              name,
              managed,
              release,
              update.description,
              update.reference_url,
              update.spec,
              now,
            ],
          )?,
          Op::Update { next, release, update } => tx.execute(
            "UPDATE records
             SET revision = ?5, release = ?6, description = ?7,
                 reference_url = ?8, spec = ?9, updated_at = ?10
             WHERE record_id = ?1 AND record_kind = ?2
               AND managed = ?3 AND revision = ?4",
            rusqlite::params![
              key,
              RECORD_KIND,
              managed,
              expected,
              next,
              release,
              update.description,
              update.reference_url,
              update.spec,
              now,
            ],
          )?,
          Op::SetDisabled(disabled) => tx.execute(
            "UPDATE records SET disabled = ?5, updated_at = ?6
             WHERE record_id = ?1 AND record_kind = ?2
               AND managed = ?3 AND revision = ?4",
            rusqlite::params![key, RECORD_KIND, managed, expected, disabled, now],
          )?,
        };

        let raw = tx
          .query_row(
            &format!(
              "SELECT {RECORD_COLUMNS} FROM records
               WHERE record_id = ?1 AND record_kind = ?2"
            ),
            rusqlite::params![key, RECORD_KIND],
            RawRecord::from_row,
          )
          .optional()?;

        tx.commit()?;
        Ok((changed, raw))
      })
      .await?;

    let snapshot = raw.map(RawRecord::into_record).transpose()?;
    if changed == 0 {
      debug!(id = %id_str, "conditional write precondition failed");
      return Ok(WriteOutcome::Rejected(snapshot));
    }
    snapshot
      .map(WriteOutcome::Committed)
      .ok_or(Error::MissingAfterWrite(id_str))
  }
}
