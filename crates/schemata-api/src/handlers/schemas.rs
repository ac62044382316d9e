//! Handlers for `/schemas` endpoints: direct access to every record,
//! managed or user-defined.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/schemas` | Optional `?filter=all\|custom\|managed\|active` |
//! | `GET`  | `/schemas/{id}` | Optional `?revision=N`; disabled records included |
//! | `PUT`  | `/schemas/{id}` | Compare-and-swap write |
//! | `POST` | `/schemas/{id}/toggle` | Body: `{"enabled":false}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use futures::TryStreamExt as _;
use schemata_core::{
  Registry,
  collab::Collaborators,
  record::{Ownership, SchemaFields, SchemaRecord, SchemaUpdate},
  registry::ScanFilter,
  store::SchemaStore,
};
use serde::Deserialize;

use super::{RevisionParams, with_etag};
use crate::error::ApiError;

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub filter: ScanFilter,
}

/// `GET /schemas[?filter=<filter>]`
pub async fn list<S, C>(
  State(registry): State<Arc<Registry<S, C>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<SchemaRecord>>, ApiError>
where
  S: SchemaStore,
  C: Collaborators,
{
  let records = registry.scan_schemas(params.filter).try_collect().await?;
  Ok(Json(records))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /schemas/{id}[?revision=N]`
pub async fn get_one<S, C>(
  State(registry): State<Arc<Registry<S, C>>>,
  Path(id): Path<String>,
  Query(params): Query<RevisionParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchemaStore,
  C: Collaborators,
{
  let record = registry.get_schema(&id, params.revision).await?;
  Ok(with_etag(record))
}

// ─── Put ─────────────────────────────────────────────────────────────────────

/// Body of `PUT /schemas/{id}`.
#[derive(Debug, Deserialize)]
pub struct PutBody {
  /// Ownership guard the stored record must match.
  #[serde(default)]
  pub managed:  bool,
  /// Revision the client last saw; `0` creates.
  #[serde(default)]
  pub revision: u64,
  /// Required when `managed` is set.
  #[serde(default)]
  pub release:  Option<String>,
  #[serde(flatten)]
  pub update:   SchemaUpdate,
}

/// `PUT /schemas/{id}`: `201 Created` for a new record, `200 OK` otherwise.
pub async fn put_one<S, C>(
  State(registry): State<Arc<Registry<S, C>>>,
  Path(id): Path<String>,
  Json(body): Json<PutBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchemaStore,
  C: Collaborators,
{
  let guard = Ownership::from_managed(body.managed);
  let status = if body.revision == 0 { StatusCode::CREATED } else { StatusCode::OK };
  let fields = SchemaFields { release: body.release, update: body.update };
  let record = registry.put_schema(&id, guard, body.revision, fields).await?;
  Ok((status, with_etag(record)))
}

// ─── Toggle ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
  pub enabled: bool,
}

/// `POST /schemas/{id}/toggle`, body: `{"enabled":true|false}`
pub async fn toggle<S, C>(
  State(registry): State<Arc<Registry<S, C>>>,
  Path(id): Path<String>,
  Json(body): Json<ToggleBody>,
) -> Result<StatusCode, ApiError>
where
  S: SchemaStore,
  C: Collaborators,
{
  registry.toggle_schema(&id, body.enabled).await?;
  Ok(StatusCode::NO_CONTENT)
}
