//! Per-request access decisions.
//!
//! A request moves `Unauthenticated → Authenticated → Authorized | Denied`.
//! [`Decision`] is the terminal state; it is logged and counted once per
//! request and then either lets the handler run or becomes a 401/403.

use axum::http::StatusCode;
use clinic_core::{Identity, RoleSet};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::bearer::extract_bearer;
use super::error::AuthError;
use super::jwt::TokenCodec;
use super::ownership::authorize_patient;
use super::roles::authorize;
use crate::metrics;

/// What an endpoint requires of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement<'a> {
    /// Any valid token.
    Authenticated,
    /// A role in the set.
    Roles(RoleSet),
    /// Read access to the record of this patient document.
    Patient(&'a str),
}

impl Requirement<'_> {
    /// Check an authenticated identity against this requirement.
    pub fn check(&self, identity: &Identity) -> Result<(), AuthError> {
        match self {
            Requirement::Authenticated => Ok(()),
            Requirement::Roles(allowed) => authorize(identity, *allowed).map(|_| ()),
            Requirement::Patient(document) => authorize_patient(identity, document),
        }
    }
}

/// Audit view of a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: String,
}

/// Terminal state of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// 401
    Unauthenticated(AuthError),
    /// 403
    Denied { subject: String, reason: AuthError },
    /// Proceed to the handler.
    Authorized(Identity),
}

impl Decision {
    /// Combine the authentication outcome with the endpoint requirement.
    pub fn decide(authenticated: Result<Identity, AuthError>, requirement: Requirement<'_>) -> Self {
        match authenticated {
            Err(reason) => Decision::Unauthenticated(reason),
            Ok(identity) => match requirement.check(&identity) {
                Ok(()) => Decision::Authorized(identity),
                Err(reason) => Decision::Denied {
                    subject: identity.subject().to_string(),
                    reason,
                },
            },
        }
    }

    pub fn state(&self) -> &'static str {
        match self {
            Decision::Unauthenticated(_) => "unauthenticated",
            Decision::Denied { .. } => "denied",
            Decision::Authorized(_) => "authorized",
        }
    }

    /// Response status, `None` when the request proceeds.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Decision::Unauthenticated(_) => Some(StatusCode::UNAUTHORIZED),
            Decision::Denied { .. } => Some(StatusCode::FORBIDDEN),
            Decision::Authorized(_) => None,
        }
    }

    pub fn access_decision(&self) -> AccessDecision {
        match self {
            Decision::Authorized(_) => AccessDecision {
                allowed: true,
                reason: "authorized".to_string(),
            },
            Decision::Unauthenticated(reason) | Decision::Denied { reason, .. } => AccessDecision {
                allowed: false,
                reason: reason.to_string(),
            },
        }
    }

    /// Log and count this decision.
    #[must_use]
    pub fn recorded(self) -> Self {
        let audit = self.access_decision();
        match &self {
            Decision::Authorized(identity) => {
                debug!(
                    subject = %identity.subject(),
                    role = %identity.role(),
                    allowed = audit.allowed,
                    "Access granted"
                );
                metrics::record_access_decision(self.state(), "OK");
            }
            Decision::Denied { subject, reason } => {
                warn!(
                    subject = %subject,
                    code = reason.code(),
                    allowed = audit.allowed,
                    reason = %audit.reason,
                    "Access denied"
                );
                metrics::record_access_decision(self.state(), reason.code());
            }
            Decision::Unauthenticated(reason) => {
                info!(
                    code = reason.code(),
                    allowed = audit.allowed,
                    reason = %audit.reason,
                    "Request not authenticated"
                );
                metrics::record_access_decision(self.state(), reason.code());
            }
        }
        self
    }

    pub fn into_result(self) -> Result<Identity, AuthError> {
        match self {
            Decision::Authorized(identity) => Ok(identity),
            Decision::Unauthenticated(reason) | Decision::Denied { reason, .. } => Err(reason),
        }
    }
}

/// Header value → verified identity.
pub fn authenticate_header(header: Option<&str>, codec: &TokenCodec) -> Result<Identity, AuthError> {
    let token = extract_bearer(header)?;
    Ok(codec.verify(token)?)
}

/// Full decision for one request, without directory re-validation.
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use clinic_api::auth::{evaluate, Requirement, TokenCodec};
/// use clinic_core::{Identity, SigningAlgorithm};
///
/// let codec = TokenCodec::from_secret(b"doc-test-secret", SigningAlgorithm::Hs256, Duration::minutes(30));
/// let token = codec.issue_default(&Identity::patient("juan", "D1").unwrap()).unwrap();
/// let header = format!("Bearer {}", token);
///
/// let own = evaluate(Some(header.as_str()), &codec, Requirement::Patient("D1"));
/// assert!(own.access_decision().allowed);
///
/// let other = evaluate(Some(header.as_str()), &codec, Requirement::Patient("D2"));
/// assert_eq!(other.status(), Some(axum::http::StatusCode::FORBIDDEN));
/// ```
pub fn evaluate(header: Option<&str>, codec: &TokenCodec, requirement: Requirement<'_>) -> Decision {
    Decision::decide(authenticate_header(header, codec), requirement).recorded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{BearerError, TokenError};
    use chrono::Duration;
    use clinic_core::{Role, SigningAlgorithm};

    fn codec() -> TokenCodec {
        TokenCodec::from_secret(
            b"decision-test-secret-minimum-32-chars!!",
            SigningAlgorithm::Hs256,
            Duration::minutes(30),
        )
    }

    fn header_for(codec: &TokenCodec, identity: &Identity) -> String {
        format!("Bearer {}", codec.issue_default(identity).unwrap())
    }

    #[test]
    fn test_unauthenticated_paths() {
        let codec = codec();

        let missing = evaluate(None, &codec, Requirement::Authenticated);
        assert_eq!(
            missing,
            Decision::Unauthenticated(AuthError::Header(BearerError::MissingHeader))
        );
        assert_eq!(missing.status(), Some(StatusCode::UNAUTHORIZED));

        let garbage = evaluate(Some("Bearer garbage"), &codec, Requirement::Authenticated);
        assert_eq!(
            garbage,
            Decision::Unauthenticated(AuthError::Token(TokenError::Invalid))
        );
    }

    #[test]
    fn test_authentication_precedes_authorization() {
        // no token at all on an admin-only endpoint is 401, not 403
        let decision = evaluate(None, &codec(), Requirement::Roles(RoleSet::ADMIN_ONLY));
        assert_eq!(decision.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_role_denied() {
        let codec = codec();
        let clerk = Identity::staff("ana", Role::Resultados).unwrap();
        let header = header_for(&codec, &clerk);

        let decision = evaluate(Some(header.as_str()), &codec, Requirement::Roles(RoleSet::CLINICIANS));
        assert_eq!(decision.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(decision.state(), "denied");

        let audit = decision.access_decision();
        assert!(!audit.allowed);
        assert!(audit.reason.contains("medico"));
    }

    #[test]
    fn test_patient_ownership() {
        let codec = codec();
        let patient = Identity::patient("paciente_juan", "D1").unwrap();
        let header = header_for(&codec, &patient);

        let own = evaluate(Some(header.as_str()), &codec, Requirement::Patient("D1"));
        assert_eq!(own.clone().into_result().unwrap(), patient);
        assert_eq!(own.status(), None);

        let other = evaluate(Some(header.as_str()), &codec, Requirement::Patient("D2"));
        assert_eq!(
            other,
            Decision::Denied {
                subject: "paciente_juan".to_string(),
                reason: AuthError::OwnershipDenied,
            }
        );
    }

    #[test]
    fn test_staff_any_patient() {
        let codec = codec();
        let medico = Identity::staff("dr", Role::Medico).unwrap();
        let header = header_for(&codec, &medico);

        let decision = evaluate(Some(header.as_str()), &codec, Requirement::Patient("D2"));
        assert_eq!(decision.access_decision().reason, "authorized");
    }
}
