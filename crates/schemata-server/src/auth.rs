//! HTTP Basic-auth middleware and standalone verifier.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{self, SaltString},
};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::OsRng;

use crate::error::Error;

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Hash `password` with a fresh salt into the PHC string stored as
/// `auth_password_hash`.
pub fn hash_password(password: &str) -> password_hash::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Verify the `Authorization: Basic …` header against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  if username != config.username {
    return Err(Error::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(())
}

/// Middleware rejecting every request without valid credentials.
pub async fn require_auth(
  State(auth): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Result<Response, Error> {
  if let Err(e) = verify_auth(req.headers(), &auth) {
    tracing::debug!(path = %req.uri().path(), "rejected unauthenticated request");
    return Err(e);
  }
  Ok(next.run(req).await)
}

#[cfg(test)]
pub(crate) mod tests {
  use axum::http::header;

  use super::*;

  pub(crate) fn make_auth(password: &str) -> AuthConfig {
    let password_hash = hash_password(password).unwrap();
    AuthConfig { username: "user".to_string(), password_hash }
  }

  pub(crate) fn basic(user: &str, pass: &str) -> String {
    let encoded = B64.encode(format!("{user}:{pass}"));
    format!("Basic {encoded}")
  }

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, value.parse().unwrap());
    h
  }

  #[test]
  fn correct_credentials() {
    let auth = make_auth("secret");
    assert!(verify_auth(&headers(&basic("user", "secret")), &auth).is_ok());
  }

  #[test]
  fn wrong_password() {
    let auth = make_auth("secret");
    let res = verify_auth(&headers(&basic("user", "wrong")), &auth);
    assert!(matches!(res, Err(Error::Unauthorized)));
  }

  #[test]
  fn wrong_username() {
    let auth = make_auth("secret");
    let res = verify_auth(&headers(&basic("admin", "secret")), &auth);
    assert!(matches!(res, Err(Error::Unauthorized)));
  }

  #[test]
  fn hashes_are_salted() {
    let a = hash_password("secret").unwrap();
    let b = hash_password("secret").unwrap();
    assert_ne!(a, b);
    assert!(a.starts_with("$argon2id$"));
  }

  #[test]
  fn missing_header() {
    let auth = make_auth("secret");
    let res = verify_auth(&HeaderMap::new(), &auth);
    assert!(matches!(res, Err(Error::Unauthorized)));
  }

  #[test]
  fn invalid_base64() {
    let auth = make_auth("secret");
    let res = verify_auth(&headers("Basic !!!not-base64!!!"), &auth);
    assert!(matches!(res, Err(Error::Unauthorized)));
  }
}
