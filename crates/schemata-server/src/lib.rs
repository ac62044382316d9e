//! HTTP server for the Schemata registry.
//!
//! Wraps the [`schemata_api`] router with Basic auth and request tracing, and
//! supplies the concrete collaborators the registry consumes.

pub mod auth;
pub mod collab;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware};
use schemata_core::{Registry, collab::Collaborators, store::SchemaStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SCHEMATA_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  pub auth_username:       String,
  pub auth_password_hash:  String,
  pub release_feed_url:    String,
  /// Catalog updates are only logged when unset.
  #[serde(default)]
  pub catalog_webhook_url: Option<String>,
  /// Log types reported as in use; these cannot be deleted.
  #[serde(default)]
  pub in_use:              Vec<String>,
  #[serde(default = "default_scan_page_size")]
  pub scan_page_size:      usize,
}

fn default_scan_page_size() -> usize { 100 }

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state the router is built from.
pub struct AppState<S, C> {
  pub registry: Arc<Registry<S, C>>,
  pub auth:     Arc<AuthConfig>,
}

impl<S, C> Clone for AppState<S, C> {
  fn clone(&self) -> Self {
    Self { registry: self.registry.clone(), auth: self.auth.clone() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the server's [`Router`]: the JSON API under `/api`, behind Basic
/// auth, with every request traced.
pub fn router<S, C>(state: AppState<S, C>) -> Router
where
  S: SchemaStore + 'static,
  C: Collaborators + 'static,
{
  Router::new()
    .nest("/api", schemata_api::api_router(state.registry))
    .layer(middleware::from_fn_with_state(state.auth, auth::require_auth))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use schemata_core::testing::StubCollaborators;
  use schemata_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;
  use crate::auth::tests::{basic, make_auth};

  async fn make_state(password: &str) -> AppState<SqliteStore, StubCollaborators> {
    let store = SqliteStore::open_in_memory().await.expect("in-memory store");
    AppState {
      registry: Arc::new(Registry::new(store, StubCollaborators::new())),
      auth:     Arc::new(make_auth(password)),
    }
  }

  #[tokio::test]
  async fn unauthenticated_request_is_rejected() {
    let state = make_state("secret").await;
    let req = Request::builder().uri("/api/schemas").body(Body::empty()).unwrap();

    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn authenticated_request_reaches_api() {
    let state = make_state("secret").await;
    let req = Request::builder()
      .uri("/api/schemas")
      .header(header::AUTHORIZATION, basic("user", "secret"))
      .body(Body::empty())
      .unwrap();

    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    assert_eq!(&bytes[..], b"[]");
  }

  #[test]
  fn config_defaults() {
    let cfg: ServerConfig = serde_json::from_value(serde_json::json!({
      "host": "127.0.0.1",
      "port": 8080,
      "store_path": "/tmp/schemata.db",
      "auth_username": "admin",
      "auth_password_hash": "$argon2id$...",
      "release_feed_url": "https://releases.example.com/feed.json",
    }))
    .unwrap();
    assert!(cfg.catalog_webhook_url.is_none());
    assert!(cfg.in_use.is_empty());
    assert_eq!(cfg.scan_page_size, 100);
  }
}
