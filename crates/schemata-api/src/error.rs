//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every registry error becomes a JSON body of the form
//! `{"error": {"code": "...", "message": "..."}}`. Revision conflicts also
//! carry `actualRevision` so a client can re-read and retry.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use schemata_core::Error;
use serde_json::{Value, json};

/// An error returned by an API handler.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
  fn from(err: Error) -> Self { Self(err) }
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match &self.0 {
      Error::NotFound { .. } => StatusCode::NOT_FOUND,
      Error::OwnershipConflict { .. }
      | Error::RevisionConflict { .. }
      | Error::AlreadyExists(_)
      | Error::InUse(_) => StatusCode::CONFLICT,
      Error::ValidationFailed { .. } | Error::ManifestInconsistent { .. } => {
        StatusCode::UNPROCESSABLE_ENTITY
      }
      Error::InvalidRelease(_) => StatusCode::BAD_REQUEST,
      Error::Collaborator { .. } | Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Stable machine-readable error code.
  pub fn code(&self) -> &'static str {
    match &self.0 {
      Error::NotFound { .. } => "not_found",
      Error::OwnershipConflict { .. } => "ownership_conflict",
      Error::RevisionConflict { .. } => "revision_conflict",
      Error::AlreadyExists(_) => "already_exists",
      Error::ValidationFailed { .. } => "validation_failed",
      Error::ManifestInconsistent { .. } => "manifest_inconsistent",
      Error::InUse(_) => "in_use",
      Error::InvalidRelease(_) => "invalid_release",
      Error::Collaborator { .. } => "collaborator_failed",
      Error::Store(_) => "store_failed",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self.0, "request failed");
    }

    let mut body = json!({
      "code":    self.code(),
      "message": self.0.to_string(),
    });
    if let Error::RevisionConflict { actual, .. } = &self.0 {
      body["actualRevision"] = Value::from(*actual);
    }
    (status, Json(json!({ "error": body }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use schemata_core::record::Ownership;

  use super::*;

  #[test]
  fn conflicts_map_to_409() {
    for err in [
      Error::OwnershipConflict { id: "X".into(), stored: Ownership::User },
      Error::RevisionConflict { id: "X".into(), expected: 1, actual: 2 },
      Error::AlreadyExists("X".into()),
      Error::InUse("X".into()),
    ] {
      assert_eq!(ApiError(err).status(), StatusCode::CONFLICT);
    }
  }

  #[test]
  fn store_failure_is_500() {
    let err = ApiError(Error::Store("disk on fire".into()));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.code(), "store_failed");
  }
}
