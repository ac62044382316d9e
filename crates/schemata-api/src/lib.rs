//! JSON REST API for the Schemata registry.
//!
//! Exposes an axum [`Router`] backed by any [`Registry`]. Auth, TLS, request
//! tracing and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", schemata_api::api_router(registry.clone()))
//! ```

pub mod error;
pub mod etag;
pub mod handlers;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use schemata_core::{Registry, collab::Collaborators, store::SchemaStore};

pub use error::ApiError;
use handlers::{custom_logs, releases, schemas};

/// Build a fully-materialised API router for `registry`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(registry: Arc<Registry<S, C>>) -> Router<()>
where
  S: SchemaStore + 'static,
  C: Collaborators + 'static,
{
  Router::new()
    // Schema records
    .route("/schemas", get(schemas::list::<S, C>))
    .route(
      "/schemas/{id}",
      get(schemas::get_one::<S, C>).put(schemas::put_one::<S, C>),
    )
    .route("/schemas/{id}/toggle", post(schemas::toggle::<S, C>))
    // Custom log types
    .route("/custom-logs", get(custom_logs::list::<S, C>))
    .route(
      "/custom-logs/{id}",
      get(custom_logs::get_one::<S, C>)
        .put(custom_logs::put_one::<S, C>)
        .delete(custom_logs::delete_one::<S, C>),
    )
    // Releases
    .route("/releases/min-applied", get(releases::min_applied::<S, C>))
    .route("/releases/pending", get(releases::pending::<S, C>))
    .route("/releases/apply", post(releases::apply::<S, C>))
    .with_state(registry)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use schemata_core::{
    release::ManifestEntry,
    testing::{StubCollaborators, spec},
  };
  use schemata_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  type TestRegistry = Arc<Registry<SqliteStore, StubCollaborators>>;

  async fn make_registry(collab: StubCollaborators) -> TestRegistry {
    let store = SqliteStore::open_in_memory().await.expect("in-memory store");
    Arc::new(Registry::new(store, collab))
  }

  async fn send(
    registry: &TestRegistry,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Option<String>, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(body) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = api_router(registry.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let etag = resp
      .headers()
      .get(header::ETAG)
      .map(|v| v.to_str().unwrap().to_owned());
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let json = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, etag, json)
  }

  #[tokio::test]
  async fn put_then_get_with_etag() {
    let registry = make_registry(StubCollaborators::new()).await;

    let (status, created_etag, body) = send(
      &registry,
      "PUT",
      "/schemas/Custom.Foo",
      Some(json!({ "revision": 0, "spec": spec(&[("a", "string")]) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["revision"], 1);
    assert_eq!(body["id"], "CUSTOM.FOO");
    assert!(body.get("release").is_none());

    let (status, etag, body) = send(&registry, "GET", "/schemas/custom.foo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(etag, created_etag);
    assert_eq!(body["name"], "Custom.Foo");
  }

  #[tokio::test]
  async fn stale_put_is_409_with_actual_revision() {
    let registry = make_registry(StubCollaborators::new()).await;
    for revision in [0, 1] {
      let (status, ..) = send(
        &registry,
        "PUT",
        "/schemas/Custom.Foo",
        Some(json!({ "revision": revision, "spec": spec(&[("a", "string")]) })),
      )
      .await;
      assert!(status.is_success());
    }

    let (status, _, body) = send(
      &registry,
      "PUT",
      "/schemas/Custom.Foo",
      Some(json!({ "revision": 1, "spec": spec(&[("a", "string")]) })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "revision_conflict");
    assert_eq!(body["error"]["actualRevision"], 2);
  }

  #[tokio::test]
  async fn missing_schema_is_404() {
    let registry = make_registry(StubCollaborators::new()).await;
    let (status, _, body) = send(&registry, "GET", "/schemas/Nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
  }

  #[tokio::test]
  async fn toggle_and_filter() {
    let registry = make_registry(StubCollaborators::new()).await;
    for name in ["Custom.A", "Custom.B"] {
      send(
        &registry,
        "PUT",
        &format!("/schemas/{name}"),
        Some(json!({ "spec": spec(&[("a", "string")]) })),
      )
      .await;
    }

    let (status, ..) = send(
      &registry,
      "POST",
      "/schemas/Custom.B/toggle",
      Some(json!({ "enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, _, all) = send(&registry, "GET", "/schemas", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
    let (_, _, active) = send(&registry, "GET", "/schemas?filter=active", None).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["id"], "CUSTOM.A");
  }

  #[tokio::test]
  async fn custom_log_endpoints() {
    let registry = make_registry(StubCollaborators::new().with_in_use("Custom.Busy")).await;

    let (status, _, body) = send(
      &registry,
      "PUT",
      "/custom-logs/NoPrefix",
      Some(json!({ "spec": spec(&[("a", "string")]) })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_failed");

    for name in ["Custom.App", "Custom.Busy"] {
      let (status, ..) = send(
        &registry,
        "PUT",
        &format!("/custom-logs/{name}"),
        Some(json!({ "revision": 0, "spec": spec(&[("a", "string")]) })),
      )
      .await;
      assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _, body) = send(&registry, "DELETE", "/custom-logs/Custom.Busy", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "in_use");

    let (status, ..) = send(&registry, "DELETE", "/custom-logs/Custom.App", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, _, list) = send(&registry, "GET", "/custom-logs", None).await;
    let names: Vec<_> = list
      .as_array()
      .unwrap()
      .iter()
      .map(|r| r["name"].as_str().unwrap().to_owned())
      .collect();
    assert_eq!(names, ["Custom.Busy"]);

    let (status, ..) = send(&registry, "GET", "/custom-logs/Custom.App", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn apply_release_then_watermark() {
    let url = "https://releases.example.com/v1.2.0.json";
    let manifest = vec![ManifestEntry {
      release: "v1.2.0".into(),
      name:    "AWS.ALB".into(),
      spec:    spec(&[("ts", "timestamp")]),
    }];
    let registry = make_registry(StubCollaborators::new().with_manifest(url, manifest)).await;

    let (_, _, body) = send(&registry, "GET", "/releases/min-applied", None).await;
    assert_eq!(body, json!({ "release": null }));

    let (status, _, body) = send(
      &registry,
      "POST",
      "/releases/apply",
      Some(json!({ "release": "v1.2.0", "manifestUrl": url })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["outcome"], "applied");
    assert_eq!(body[0]["record"]["release"], "v1.2.0");

    let (_, _, body) = send(&registry, "GET", "/releases/min-applied", None).await;
    assert_eq!(body, json!({ "release": "v1.2.0" }));

    let (status, _, body) = send(
      &registry,
      "POST",
      "/releases/apply",
      Some(json!({ "release": "v1.3.0", "manifest_url": url })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "manifest_inconsistent");
  }
}
