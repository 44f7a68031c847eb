//! Access guard for the clinical-records API.
//!
//! This crate provides:
//! - bearer-token authentication (issue, verify, extract)
//! - username/password verification against a user directory
//! - role-based and per-patient authorization as axum extractors
//! - login, current-user and health endpoints
//! - Prometheus metrics
//!
//! # Modules
//!
//! - [`auth`]: tokens, credentials, role and ownership checks
//! - [`state`]: shared application state (AppState)
//! - [`routes`]: REST endpoints
//! - [`repository`]: PostgreSQL user directory
//! - [`metrics`]: Prometheus metrics
//! - [`middleware`]: HTTP middleware

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod state;

pub use auth::{
    hash_password, verify_password, AuthError, Authentication, Authorized, CredentialVerifier,
    CurrentUser, PatientAccess, TokenCodec,
};
pub use error::ApiErrorResponse;
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use routes::create_api_router;
pub use state::AppState;
