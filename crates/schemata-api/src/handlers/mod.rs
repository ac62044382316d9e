//! Route handlers, one module per resource.

pub mod custom_logs;
pub mod releases;
pub mod schemas;

use axum::{http::header, response::IntoResponse};
use schemata_core::record::SchemaRecord;
use serde::Deserialize;

use crate::etag::compute_etag;

/// `?revision=N`; absent or `0` means the latest.
#[derive(Debug, Default, Deserialize)]
pub struct RevisionParams {
  #[serde(default)]
  pub revision: u64,
}

/// A single record as JSON, tagged with its ETag.
pub(crate) fn with_etag(record: SchemaRecord) -> impl IntoResponse {
  ([(header::ETAG, compute_etag(&record))], axum::Json(record))
}
