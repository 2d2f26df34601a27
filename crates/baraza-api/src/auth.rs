//! Bearer-token authentication: credential verification, an in-process
//! token registry, and the request extractor.
//!
//! Tokens are opaque 32-byte random values, hex-encoded, issued at login
//! and resolved per request. The core only ever sees the resulting
//! [`Principal`]; hashing and token mechanics stay at this boundary.

use std::{collections::HashMap, sync::RwLock};

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{extract::FromRequestParts, http::request::Parts};
use baraza_core::{store::WorkshopStore, user::Principal};
use rand_core::{OsRng, RngCore};

use crate::{AppState, error::ApiError};

/// Verify a password against an argon2 PHC string.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

// ─── Token registry ──────────────────────────────────────────────────────────

/// In-process map from bearer token to principal. Tokens live for the
/// process lifetime; restarting the server invalidates them all.
#[derive(Default)]
pub struct TokenRegistry {
  tokens: RwLock<HashMap<String, Principal>>,
}

impl TokenRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Issue a fresh opaque token for `principal`.
  pub fn issue(&self, principal: Principal) -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    self
      .tokens
      .write()
      .expect("token registry lock poisoned")
      .insert(token.clone(), principal);
    token
  }

  pub fn resolve(&self, token: &str) -> Option<Principal> {
    self
      .tokens
      .read()
      .expect("token registry lock poisoned")
      .get(token)
      .cloned()
  }
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// Present in a handler's arguments means the request carried a valid
/// bearer token; the wrapped principal identifies the caller.
pub struct Auth(pub Principal);

impl<S> FromRequestParts<AppState<S>> for Auth
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let header = parts
      .headers
      .get(axum::http::header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .ok_or(ApiError::Unauthorized)?;

    let token = header
      .strip_prefix("Bearer ")
      .ok_or(ApiError::Unauthorized)?;

    let principal =
      state.tokens.resolve(token).ok_or(ApiError::Unauthorized)?;

    Ok(Auth(principal))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{path::PathBuf, sync::Arc};

  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::http::{Request, header};
  use baraza_core::user::Role;
  use baraza_store_sqlite::SqliteStore;
  use uuid::Uuid;

  use crate::ServerConfig;

  async fn make_state() -> AppState<SqliteStore> {
    AppState {
      store:  Arc::new(SqliteStore::open_in_memory().await.unwrap()),
      tokens: Arc::new(TokenRegistry::new()),
      config: Arc::new(ServerConfig {
        host:            "127.0.0.1".to_string(),
        port:            8080,
        store_path:      PathBuf::from(":memory:"),
        bootstrap_admin: None,
      }),
    }
  }

  fn principal() -> Principal {
    Principal {
      id:   Uuid::new_v4(),
      role: Role::Participant,
      name: "Test".into(),
    }
  }

  async fn extract(
    req: Request<axum::body::Body>,
    state: &AppState<SqliteStore>,
  ) -> Result<Auth, ApiError> {
    let (mut parts, _) = req.into_parts();
    Auth::from_request_parts(&mut parts, state).await
  }

  #[tokio::test]
  async fn valid_token_resolves_principal() {
    let state = make_state().await;
    let p = principal();
    let token = state.tokens.issue(p.clone());

    let req = Request::builder()
      .header(header::AUTHORIZATION, format!("Bearer {token}"))
      .body(axum::body::Body::empty())
      .unwrap();
    let auth = extract(req, &state).await.unwrap();
    assert_eq!(auth.0.id, p.id);
  }

  #[tokio::test]
  async fn missing_header_is_unauthorized() {
    let state = make_state().await;
    let req = Request::builder().body(axum::body::Body::empty()).unwrap();
    assert!(matches!(
      extract(req, &state).await,
      Err(ApiError::Unauthorized)
    ));
  }

  #[tokio::test]
  async fn wrong_scheme_is_unauthorized() {
    let state = make_state().await;
    let token = state.tokens.issue(principal());
    let req = Request::builder()
      .header(header::AUTHORIZATION, format!("Basic {token}"))
      .body(axum::body::Body::empty())
      .unwrap();
    assert!(matches!(
      extract(req, &state).await,
      Err(ApiError::Unauthorized)
    ));
  }

  #[tokio::test]
  async fn unknown_token_is_unauthorized() {
    let state = make_state().await;
    let req = Request::builder()
      .header(header::AUTHORIZATION, "Bearer deadbeef")
      .body(axum::body::Body::empty())
      .unwrap();
    assert!(matches!(
      extract(req, &state).await,
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn password_verification_round_trips() {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(b"correct horse", &salt)
      .unwrap()
      .to_string();

    assert!(verify_password("correct horse", &hash));
    assert!(!verify_password("wrong", &hash));
    assert!(!verify_password("correct horse", "not-a-phc-string"));
  }
}
