//! Login and current-user endpoints.
//!
//! `POST /token` accepts either a JSON body or an
//! `application/x-www-form-urlencoded` form (OAuth2 password flow), both
//! with `username` and `password` fields.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use clinic_core::{Identity, Role};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::{AuthError, CurrentUser};
use crate::error::ApiErrorResponse;
use crate::state::AppState;

/// Login credentials.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Public view of an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owning_document: Option<String>,
}

impl From<&Identity> for UserProfile {
    fn from(identity: &Identity) -> Self {
        Self {
            username: identity.subject().to_string(),
            role: identity.role(),
            owning_document: identity.owning_document().map(str::to_string),
        }
    }
}

/// Successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always "bearer"
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub user: UserProfile,
}

/// Read credentials from a JSON or form body.
async fn read_credentials(request: Request) -> Result<LoginRequest, Response> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        Json::<LoginRequest>::from_request(request, &())
            .await
            .map(|Json(credentials)| credentials)
            .map_err(IntoResponse::into_response)
    } else {
        Form::<LoginRequest>::from_request(request, &())
            .await
            .map(|Form(credentials)| credentials)
            .map_err(IntoResponse::into_response)
    }
}

/// Exchange username/password for an access token.
///
/// POST /token
pub async fn login(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<TokenResponse>, Response> {
    let credentials = read_credentials(request).await?;

    let identity = state
        .verifier
        .authenticate(&credentials.username, &credentials.password)
        .await
        .into_result()
        .map_err(|failure| AuthError::from(failure).into_response())?;

    let ttl = state.codec.default_ttl();
    let access_token = state.codec.issue(&identity, ttl).map_err(|e| {
        error!(error = %e, "Failed to issue access token");
        ApiErrorResponse::new("TOKEN_ISSUE_FAILED", "could not issue access token")
            .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: ttl.num_seconds(),
        user: UserProfile::from(&identity),
    }))
}

/// Profile of the authenticated caller.
///
/// GET /me
pub async fn me(CurrentUser(identity): CurrentUser) -> Json<UserProfile> {
    Json(UserProfile::from(&identity))
}

pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/token", post(login))
        .route("/me", get(me))
}
