//! Authentication and authorization.
//!
//! Bearer-token authentication with role-based access control and a
//! per-patient ownership rule.
//!
//! # Components
//!
//! - [`extract_bearer`]: `Authorization` header → raw token
//! - [`TokenCodec`]: identity ↔ signed, time-bounded token
//! - [`CredentialVerifier`]: username/password → [`Authentication`]
//! - [`authorize`]: role-set membership (403 on failure)
//! - [`can_access`]: patient-record ownership (403 on failure)
//!
//! # Request flow
//!
//! ```text
//! Unauthenticated --(extract + verify)--> Authenticated --(role / ownership)--> Authorized
//!        |                                      |
//!        +--> 401 Unauthenticated               +--> 403 Denied
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn list_patients(user: Authorized<Staff>) -> impl IntoResponse { /* ... */ }
//!
//! async fn get_patient(PatientAccess { identity, document }: PatientAccess) -> impl IntoResponse {
//!     /* ... */
//! }
//! ```

mod bearer;
mod credentials;
mod decision;
mod directory;
mod error;
mod jwt;
mod middleware;
mod ownership;
mod password;
mod roles;

pub use bearer::{bearer_from_headers, extract_bearer, BearerError};
pub use credentials::{AuthFailure, Authentication, CredentialVerifier};
pub use decision::{authenticate_header, evaluate, AccessDecision, Decision, Requirement};
pub use directory::{DirectoryError, InMemoryUserDirectory, UserDirectory, UserRecord};
pub use error::AuthError;
pub use jwt::{Claims, IssueError, TokenCodec, TokenError};
pub use middleware::{Authorized, CurrentUser, PatientAccess};
pub use ownership::{authorize_patient, can_access};
pub use password::{hash_password, is_legacy_crypt_hash, verify_password, PasswordError};
pub use roles::{
    authorize, AdminOnly, Admissions, AnyRole, Clinicians, Registrars, Results, RolePolicy, Staff,
};
