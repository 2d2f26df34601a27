//! JSON HTTP layer for the baraza workshop backend.
//!
//! Exposes an axum [`Router`] backed by any
//! [`baraza_core::store::WorkshopStore`]. The boundary here maps typed
//! store errors onto transport statuses and attaches the authenticated
//! principal; everything else lives below it.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use baraza_core::store::WorkshopStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::TokenRegistry;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` plus
/// `BARAZA_`-prefixed environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  /// Created at startup when absent, so a fresh install has one account
  /// that can provision the rest.
  #[serde(default)]
  pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Deserialize, Clone)]
pub struct BootstrapAdmin {
  pub name:          String,
  pub email:         String,
  /// Argon2 PHC string; generate one with `server --hash-password`.
  pub password_hash: String,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: WorkshopStore> {
  pub store:  Arc<S>,
  pub tokens: Arc<TokenRegistry>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/auth/login", post(handlers::auth::login::<S>))
    // Session registry
    .route(
      "/sessions",
      post(handlers::sessions::create::<S>).get(handlers::sessions::list::<S>),
    )
    .route(
      "/sessions/{id}",
      get(handlers::sessions::get_one::<S>)
        .patch(handlers::sessions::update::<S>)
        .delete(handlers::sessions::delete::<S>),
    )
    .route("/sessions/{id}/activities", get(handlers::sessions::activities::<S>))
    // Enrollment
    .route("/sessions/join", post(handlers::enrollment::join::<S>))
    .route("/sessions/progress", post(handlers::enrollment::progress::<S>))
    .route(
      "/sessions/{id}/participants",
      get(handlers::enrollment::participants::<S>),
    )
    .route(
      "/sessions/{id}/participants/{user_id}",
      axum::routing::patch(handlers::enrollment::set_status::<S>)
        .delete(handlers::enrollment::remove::<S>),
    )
    // Quiz gate
    .route("/sessions/{id}/questions", get(handlers::quiz::questions::<S>))
    .route("/sessions/{id}/submit-test", post(handlers::quiz::submit::<S>))
    .route("/quiz/result", get(handlers::quiz::latest::<S>))
    // Voting
    .route("/sessions/submit-votes", post(handlers::voting::submit::<S>))
    .route(
      "/sessions/{id}/live-results",
      get(handlers::voting::live_results::<S>),
    )
    .route(
      "/sessions/{id}/voting-status",
      get(handlers::voting::status::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
