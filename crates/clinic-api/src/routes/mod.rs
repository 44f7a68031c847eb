//! API routes.
//!
//! # Route layout
//!
//! - `/health` - liveness
//! - `/health/ready` - readiness (checks the user directory)
//! - `POST /token` - username/password login, returns a bearer token
//! - `GET /me` - profile of the authenticated caller
//!
//! `/metrics` is attached by the binary, which owns the Prometheus handle.

pub mod auth;
pub mod health;

use std::sync::Arc;

use axum::Router;

pub use auth::{auth_router, LoginRequest, TokenResponse, UserProfile};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};

use crate::state::AppState;

/// Build the API router.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/health", health_router())
        .merge(auth_router())
}
