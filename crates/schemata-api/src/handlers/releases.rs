//! Handlers for `/releases` endpoints.

use std::sync::Arc;

use axum::{Json, extract::State};
use schemata_core::{
  Registry,
  collab::Collaborators,
  registry::ApplyOutcome,
  release::Release,
  store::SchemaStore,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct MinApplied {
  /// `null` when no managed record carries a valid release.
  pub release: Option<String>,
}

/// `GET /releases/min-applied`
pub async fn min_applied<S, C>(
  State(registry): State<Arc<Registry<S, C>>>,
) -> Result<Json<MinApplied>, ApiError>
where
  S: SchemaStore,
  C: Collaborators,
{
  let release = registry.min_applied_release().await?;
  Ok(Json(MinApplied { release }))
}

/// `GET /releases/pending`: releases newer than the applied watermark.
pub async fn pending<S, C>(
  State(registry): State<Arc<Registry<S, C>>>,
) -> Result<Json<Vec<Release>>, ApiError>
where
  S: SchemaStore,
  C: Collaborators,
{
  Ok(Json(registry.list_pending_releases().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyBody {
  pub release:      String,
  #[serde(alias = "manifest_url")]
  pub manifest_url: String,
}

/// `POST /releases/apply`, body: `{"release":"v1.2.0","manifestUrl":"…"}`
pub async fn apply<S, C>(
  State(registry): State<Arc<Registry<S, C>>>,
  Json(body): Json<ApplyBody>,
) -> Result<Json<Vec<ApplyOutcome>>, ApiError>
where
  S: SchemaStore,
  C: Collaborators,
{
  let outcomes = registry
    .update_managed_schemas(&body.release, &body.manifest_url)
    .await?;
  Ok(Json(outcomes))
}
