//! Authentication and authorization failures.
//!
//! Two classes, never conflated:
//! - 401 Unauthorized: the caller's identity could not be established
//!   (header, token, credentials, directory). Always carries
//!   `WWW-Authenticate: Bearer`.
//! - 403 Forbidden: the identity is known but lacks the role or does not own
//!   the requested record.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use clinic_core::RoleSet;

use super::bearer::BearerError;
use super::credentials::AuthFailure;
use super::jwt::TokenError;
use crate::error::ApiErrorResponse;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Header(#[from] BearerError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user not found or inactive")]
    SubjectRejected,
    #[error("authentication unavailable")]
    Unavailable,
    #[error("permission denied: requires one of: {required}")]
    RoleDenied { required: RoleSet },
    #[error("access denied: you can only access your own patient record")]
    OwnershipDenied,
}

impl From<AuthFailure> for AuthError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::InvalidCredentials => AuthError::InvalidCredentials,
            AuthFailure::Unavailable => AuthError::Unavailable,
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        if self.is_denial() {
            StatusCode::FORBIDDEN
        } else {
            StatusCode::UNAUTHORIZED
        }
    }

    /// Identity established but not allowed (403).
    pub fn is_denial(&self) -> bool {
        matches!(self, AuthError::RoleDenied { .. } | AuthError::OwnershipDenied)
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Header(BearerError::MissingHeader) => "MISSING_TOKEN",
            AuthError::Header(BearerError::MalformedScheme) => "INVALID_AUTH_HEADER",
            AuthError::Header(BearerError::MissingCredentials) => "MISSING_CREDENTIALS",
            AuthError::Token(TokenError::Expired) => "TOKEN_EXPIRED",
            AuthError::Token(TokenError::Invalid) => "INVALID_TOKEN",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::SubjectRejected => "SUBJECT_REJECTED",
            AuthError::Unavailable => "AUTH_UNAVAILABLE",
            AuthError::RoleDenied { .. } => "INSUFFICIENT_PERMISSION",
            AuthError::OwnershipDenied => "PATIENT_ACCESS_DENIED",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response =
            ApiErrorResponse::new(self.code(), self.to_string()).into_response_with(status);

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::Role;

    fn all_errors() -> Vec<AuthError> {
        vec![
            BearerError::MissingHeader.into(),
            BearerError::MalformedScheme.into(),
            BearerError::MissingCredentials.into(),
            TokenError::Expired.into(),
            TokenError::Invalid.into(),
            AuthError::InvalidCredentials,
            AuthError::SubjectRejected,
            AuthError::Unavailable,
            AuthError::RoleDenied {
                required: RoleSet::CLINICIANS,
            },
            AuthError::OwnershipDenied,
        ]
    }

    #[test]
    fn test_status_classes() {
        for error in all_errors() {
            let expected = if error.is_denial() {
                StatusCode::FORBIDDEN
            } else {
                StatusCode::UNAUTHORIZED
            };
            assert_eq!(error.status(), expected, "{:?}", error);
        }

        assert_eq!(AuthError::OwnershipDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::Header(BearerError::MalformedScheme).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_challenge_header_on_401_only() {
        for error in all_errors() {
            let denial = error.is_denial();
            let response = error.into_response();
            let challenge = response.headers().get(WWW_AUTHENTICATE);

            if denial {
                assert!(challenge.is_none());
            } else {
                assert_eq!(challenge.unwrap(), "Bearer");
            }
        }
    }

    #[test]
    fn test_codes_are_distinct() {
        let mut codes: Vec<_> = all_errors().iter().map(AuthError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all_errors().len());
    }

    #[test]
    fn test_role_denied_message() {
        let error = AuthError::RoleDenied {
            required: RoleSet::of(&[Role::Admisionista, Role::Admin]),
        };
        assert_eq!(
            error.to_string(),
            "permission denied: requires one of: admin, admisionista"
        );
    }

    #[test]
    fn test_from_auth_failure() {
        assert_eq!(
            AuthError::from(AuthFailure::InvalidCredentials),
            AuthError::InvalidCredentials
        );
        assert_eq!(AuthError::from(AuthFailure::Unavailable), AuthError::Unavailable);
    }
}
