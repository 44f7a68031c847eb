//! Axum extractors for the guard.
//!
//! Each extractor runs the full request state machine and records the
//! resulting [`Decision`] before the handler runs.
//!
//! ```rust,ignore
//! async fn me(CurrentUser(identity): CurrentUser) -> impl IntoResponse { /* ... */ }
//!
//! async fn create_patient(user: Authorized<Registrars>) -> impl IntoResponse { /* ... */ }
//!
//! // route: /pacientes/{document}
//! async fn get_patient(access: PatientAccess) -> impl IntoResponse { /* ... */ }
//! ```

use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use clinic_core::Identity;

use super::bearer::bearer_from_headers;
use super::decision::{Decision, Requirement};
use super::error::AuthError;
use super::roles::RolePolicy;
use crate::state::AppState;

/// Any authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

/// A caller whose role is in `P::ROLES`.
#[derive(Debug, Clone)]
pub struct Authorized<P: RolePolicy> {
    identity: Identity,
    _policy: PhantomData<fn() -> P>,
}

impl<P: RolePolicy> Authorized<P> {
    pub fn into_inner(self) -> Identity {
        self.identity
    }
}

impl<P: RolePolicy> Deref for Authorized<P> {
    type Target = Identity;

    fn deref(&self) -> &Identity {
        &self.identity
    }
}

/// A caller allowed to read the patient record named by the route's single
/// path parameter.
#[derive(Debug, Clone)]
pub struct PatientAccess {
    pub identity: Identity,
    pub document: String,
}

/// Bearer token → verified identity, re-validated against the directory when
/// configured.
async fn authenticate_request(parts: &Parts, state: &AppState) -> Result<Identity, AuthError> {
    let token = bearer_from_headers(&parts.headers)?;
    let identity = state.codec.verify(token)?;

    if state.revalidate_subject {
        state.verifier.revalidate(&identity).await?;
    }

    Ok(identity)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = Arc::<AppState>::from_ref(state);
        let authenticated = authenticate_request(parts, &app).await;

        Decision::decide(authenticated, Requirement::Authenticated)
            .recorded()
            .into_result()
            .map(CurrentUser)
    }
}

impl<S, P> FromRequestParts<S> for Authorized<P>
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
    P: RolePolicy,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = Arc::<AppState>::from_ref(state);
        let authenticated = authenticate_request(parts, &app).await;

        let identity = Decision::decide(authenticated, Requirement::Roles(P::ROLES))
            .recorded()
            .into_result()?;

        Ok(Authorized {
            identity,
            _policy: PhantomData,
        })
    }
}

impl<S> FromRequestParts<S> for PatientAccess
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = Arc::<AppState>::from_ref(state);

        // authentication first: a bad path never turns a 401 into a 400
        let identity = match authenticate_request(parts, &app).await {
            Ok(identity) => identity,
            Err(reason) => Decision::decide(Err(reason), Requirement::Authenticated)
                .recorded()
                .into_result()
                .map_err(IntoResponse::into_response)?,
        };

        let Path(document) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let identity = Decision::decide(Ok(identity), Requirement::Patient(&document))
            .recorded()
            .into_result()
            .map_err(IntoResponse::into_response)?;

        Ok(PatientAccess { identity, document })
    }
}
