//! Username/password verification against the user directory.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clinic_core::{Identity, Role};
use once_cell::sync::Lazy;
use tracing::{debug, info, warn};

use super::directory::{DirectoryError, UserDirectory, UserRecord};
use super::error::AuthError;
use super::password::{hash_password, is_legacy_crypt_hash, verify_password, PasswordError};
use crate::metrics;

/// Hash checked when the username does not exist, so unknown users cost the
/// same as known ones.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("no-such-user-placeholder").ok());

/// Why a login was refused.
///
/// Unknown user, wrong password and inactive account are deliberately the
/// same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("authentication unavailable")]
    Unavailable,
}

/// Outcome of [`CredentialVerifier::authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Success(Identity),
    Failure(AuthFailure),
}

impl Authentication {
    pub fn is_success(&self) -> bool {
        matches!(self, Authentication::Success(_))
    }

    pub fn into_result(self) -> Result<Identity, AuthFailure> {
        match self {
            Authentication::Success(identity) => Ok(identity),
            Authentication::Failure(failure) => Err(failure),
        }
    }
}

/// Checks credentials against a [`UserDirectory`], bounding every directory
/// call by a fixed timeout.
pub struct CredentialVerifier {
    directory: Arc<dyn UserDirectory>,
    timeout: Duration,
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CredentialVerifier {
    pub fn new(directory: Arc<dyn UserDirectory>, timeout: Duration) -> Self {
        Self { directory, timeout }
    }

    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    /// Bound applied to each directory call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Verify `username`/`secret`.
    ///
    /// Succeeds only for an existing, active user whose stored hash matches.
    /// On success the last-access time is recorded; a failure to record is
    /// logged and otherwise ignored.
    pub async fn authenticate(&self, username: &str, secret: &str) -> Authentication {
        let start = Instant::now();
        let outcome = self.check(username, secret).await;

        let label = match &outcome {
            Authentication::Success(_) => "success",
            Authentication::Failure(AuthFailure::InvalidCredentials) => "invalid_credentials",
            Authentication::Failure(AuthFailure::Unavailable) => "unavailable",
        };
        metrics::record_login(label, start.elapsed().as_secs_f64());

        outcome
    }

    async fn check(&self, username: &str, secret: &str) -> Authentication {
        let record = match self.lookup(username).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "User directory lookup failed");
                return Authentication::Failure(AuthFailure::Unavailable);
            }
        };

        if let Some(record) = &record {
            if is_legacy_crypt_hash(&record.password_hash) {
                warn!(
                    subject = %username,
                    "Stored password is a pgcrypto crypt() hash; reset it so an Argon2 hash \
                     from hash_password replaces it, until then this account cannot log in"
                );
            }
        }

        let hash = match &record {
            Some(record) => Some(record.password_hash.clone()),
            None => (*DUMMY_HASH).clone(),
        };
        let password_ok = match hash {
            Some(hash) => verify_blocking(secret.to_string(), hash).await,
            None => false,
        };

        let Some(record) = record else {
            debug!(subject = %username, "Login refused: unknown user");
            return Authentication::Failure(AuthFailure::InvalidCredentials);
        };
        if !password_ok {
            debug!(subject = %username, "Login refused: password mismatch");
            return Authentication::Failure(AuthFailure::InvalidCredentials);
        }
        if !record.active {
            info!(subject = %username, "Login refused: account inactive");
            return Authentication::Failure(AuthFailure::InvalidCredentials);
        }

        let identity = match identity_from_record(&record) {
            Ok(identity) => identity,
            Err(reason) => {
                warn!(subject = %username, %reason, "Login refused: inconsistent user record");
                return Authentication::Failure(AuthFailure::InvalidCredentials);
            }
        };

        if let Err(e) = self.record_access(record.id).await {
            warn!(subject = %username, error = %e, "Failed to record last access");
        }

        info!(subject = %identity.subject(), role = %identity.role(), "Login succeeded");
        Authentication::Success(identity)
    }

    /// Check that a token's subject still exists, is active and still holds
    /// the role and owning document the token claims.
    pub async fn revalidate(&self, identity: &Identity) -> Result<(), AuthError> {
        let record = self.lookup(identity.subject()).await.map_err(|e| {
            warn!(error = %e, "User directory lookup failed during revalidation");
            AuthError::Unavailable
        })?;

        let current = record
            .filter(|record| record.active)
            .and_then(|record| identity_from_record(&record).ok());

        match current {
            Some(current) if current == *identity => Ok(()),
            _ => {
                info!(subject = %identity.subject(), "Token subject no longer matches the directory");
                Err(AuthError::SubjectRejected)
            }
        }
    }

    async fn lookup(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError> {
        tokio::time::timeout(self.timeout, self.directory.lookup_user(username))
            .await
            .map_err(|_| DirectoryError::Timeout(self.timeout))?
    }

    async fn record_access(&self, user_id: i64) -> Result<(), DirectoryError> {
        tokio::time::timeout(self.timeout, self.directory.record_access(user_id))
            .await
            .map_err(|_| DirectoryError::Timeout(self.timeout))?
    }
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn verify_blocking(secret: String, hash: String) -> bool {
    let result = tokio::task::spawn_blocking(move || verify_password(&secret, &hash)).await;

    match result {
        Ok(Ok(())) => true,
        Ok(Err(PasswordError::InvalidHashFormat)) => {
            warn!("Stored password hash is not a valid PHC string");
            false
        }
        Ok(Err(_)) => false,
        Err(e) => {
            warn!(error = %e, "Password verification task failed");
            false
        }
    }
}

fn identity_from_record(record: &UserRecord) -> Result<Identity, String> {
    let role =
        Role::parse(&record.role).ok_or_else(|| format!("unknown role '{}'", record.role))?;

    Identity::new(
        record.username.clone(),
        role,
        record.owning_document.clone(),
        record.active,
    )
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryUserDirectory;

    fn directory() -> InMemoryUserDirectory {
        InMemoryUserDirectory::new()
            .with_user("dr_rodriguez", "medico123", "medico", None, true)
            .unwrap()
            .with_user("paciente_juan", "juan123", "paciente", Some("12345"), true)
            .unwrap()
            .with_user("retired", "retired123", "admisionista", None, false)
            .unwrap()
            .with_user("ghost_role", "ghost123", "auditor", None, true)
            .unwrap()
            .with_user("orphan", "orphan123", "paciente", None, true)
            .unwrap()
    }

    fn verifier(directory: Arc<InMemoryUserDirectory>) -> CredentialVerifier {
        CredentialVerifier::new(directory, Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_success() {
        let directory = Arc::new(directory());
        let verifier = verifier(directory.clone());

        let identity = verifier
            .authenticate("paciente_juan", "juan123")
            .await
            .into_result()
            .unwrap();

        assert_eq!(identity.role(), Role::Paciente);
        assert_eq!(identity.owning_document(), Some("12345"));
        assert_eq!(directory.access_count(), 1);
    }

    #[tokio::test]
    async fn test_uniform_failure() {
        let directory = Arc::new(directory());
        let verifier = verifier(directory.clone());

        let unknown = verifier.authenticate("nobody", "whatever").await;
        let wrong_password = verifier.authenticate("dr_rodriguez", "wrong").await;
        let inactive = verifier.authenticate("retired", "retired123").await;

        let expected = Authentication::Failure(AuthFailure::InvalidCredentials);
        assert_eq!(unknown, expected);
        assert_eq!(wrong_password, expected);
        assert_eq!(inactive, expected);
        assert_eq!(directory.access_count(), 0);
    }

    #[tokio::test]
    async fn test_inconsistent_records_rejected() {
        let verifier = verifier(Arc::new(directory()));

        assert_eq!(
            verifier.authenticate("ghost_role", "ghost123").await,
            Authentication::Failure(AuthFailure::InvalidCredentials)
        );
        assert_eq!(
            verifier.authenticate("orphan", "orphan123").await,
            Authentication::Failure(AuthFailure::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_legacy_crypt_hash_refused() {
        let directory = directory().with_record(UserRecord {
            id: 0,
            username: "dr_legacy".to_string(),
            role: "medico".to_string(),
            owning_document: None,
            active: true,
            password_hash: "$2a$06$Q1QjVdqxsJ3Rd0NlHtmNmuX9B0cV5pAzU0bH6zk7RmVfKjJpUqA5y"
                .to_string(),
        });
        let directory = Arc::new(directory);
        let verifier = verifier(directory.clone());

        assert_eq!(
            verifier.authenticate("dr_legacy", "medico123").await,
            Authentication::Failure(AuthFailure::InvalidCredentials)
        );
        assert_eq!(directory.access_count(), 0);
    }

    #[tokio::test]
    async fn test_record_access_failure_does_not_fail_login() {
        let directory = Arc::new(directory());
        directory.fail_record_access(true);
        let verifier = verifier(directory.clone());

        let outcome = verifier.authenticate("dr_rodriguez", "medico123").await;
        assert!(outcome.is_success());
        assert_eq!(directory.access_count(), 0);
    }

    #[tokio::test]
    async fn test_directory_failure_is_unavailable() {
        let directory = Arc::new(directory());
        directory.fail_lookups(true);
        let verifier = verifier(directory);

        assert_eq!(
            verifier.authenticate("dr_rodriguez", "medico123").await,
            Authentication::Failure(AuthFailure::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_directory_timeout_is_unavailable() {
        let directory = Arc::new(directory());
        directory.set_lookup_delay(Duration::from_millis(300));
        let verifier = CredentialVerifier::new(directory, Duration::from_millis(50));

        assert_eq!(
            verifier.authenticate("dr_rodriguez", "medico123").await,
            Authentication::Failure(AuthFailure::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_revalidate() {
        let directory = Arc::new(directory());
        let verifier = verifier(directory.clone());
        let medico = Identity::staff("dr_rodriguez", Role::Medico).unwrap();

        assert!(verifier.revalidate(&medico).await.is_ok());

        // role in the token no longer matches the directory
        let promoted = Identity::staff("dr_rodriguez", Role::Admin).unwrap();
        assert!(matches!(
            verifier.revalidate(&promoted).await,
            Err(AuthError::SubjectRejected)
        ));

        directory.set_active("dr_rodriguez", false).await;
        assert!(matches!(
            verifier.revalidate(&medico).await,
            Err(AuthError::SubjectRejected)
        ));

        // account deleted after the token was issued
        let paciente = Identity::patient("paciente_juan", "12345").unwrap();
        assert!(verifier.revalidate(&paciente).await.is_ok());
        assert!(directory.remove_user("paciente_juan").await);
        assert!(matches!(
            verifier.revalidate(&paciente).await,
            Err(AuthError::SubjectRejected)
        ));

        let unknown = Identity::staff("nobody", Role::Admin).unwrap();
        assert!(matches!(
            verifier.revalidate(&unknown).await,
            Err(AuthError::SubjectRejected)
        ));

        directory.fail_lookups(true);
        assert!(matches!(
            verifier.revalidate(&unknown).await,
            Err(AuthError::Unavailable)
        ));
    }
}
