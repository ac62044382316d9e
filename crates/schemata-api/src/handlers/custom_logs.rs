//! Handlers for `/custom-logs` endpoints: user-defined log types only.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/custom-logs` | Enabled user-defined records |
//! | `GET`    | `/custom-logs/{id}` | Optional `?revision=N` |
//! | `PUT`    | `/custom-logs/{id}` | `revision: 0` creates; updates must stay compatible |
//! | `DELETE` | `/custom-logs/{id}` | `409` while the log type is in use |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use schemata_core::{
  Registry,
  collab::Collaborators,
  record::{SchemaRecord, SchemaUpdate},
  store::SchemaStore,
};
use serde::Deserialize;

use super::{RevisionParams, with_etag};
use crate::error::ApiError;

/// `GET /custom-logs`
pub async fn list<S, C>(
  State(registry): State<Arc<Registry<S, C>>>,
) -> Result<Json<Vec<SchemaRecord>>, ApiError>
where
  S: SchemaStore,
  C: Collaborators,
{
  Ok(Json(registry.list_custom_logs().await?))
}

/// `GET /custom-logs/{id}[?revision=N]`
pub async fn get_one<S, C>(
  State(registry): State<Arc<Registry<S, C>>>,
  Path(id): Path<String>,
  Query(params): Query<RevisionParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchemaStore,
  C: Collaborators,
{
  let record = registry.get_custom_log(&id, params.revision).await?;
  Ok(with_etag(record))
}

#[derive(Debug, Deserialize)]
pub struct PutBody {
  #[serde(default)]
  pub revision: u64,
  #[serde(flatten)]
  pub update:   SchemaUpdate,
}

/// `PUT /custom-logs/{id}`
pub async fn put_one<S, C>(
  State(registry): State<Arc<Registry<S, C>>>,
  Path(id): Path<String>,
  Json(body): Json<PutBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchemaStore,
  C: Collaborators,
{
  let record = registry.put_custom_log(&id, body.revision, body.update).await?;
  let status = if body.revision == 0 { StatusCode::CREATED } else { StatusCode::OK };
  Ok((status, with_etag(record)))
}

/// `DELETE /custom-logs/{id}`
pub async fn delete_one<S, C>(
  State(registry): State<Arc<Registry<S, C>>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: SchemaStore,
  C: Collaborators,
{
  registry.del_custom_log(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}
