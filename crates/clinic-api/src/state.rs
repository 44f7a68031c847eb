//! Application state shared by every handler.
//!
//! Built once at startup from the configuration and wrapped in `Arc`; nothing
//! in it changes afterwards.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clinic_core::AuthSettings;

use crate::auth::{CredentialVerifier, TokenCodec, UserDirectory};

#[derive(Clone)]
pub struct AppState {
    /// Token issuing and verification
    pub codec: Arc<TokenCodec>,

    /// Username/password verification and subject re-validation
    pub verifier: Arc<CredentialVerifier>,

    /// Re-check token subjects against the directory on every request
    pub revalidate_subject: bool,

    /// Directory backend name, reported by the readiness probe
    pub directory_backend: &'static str,

    /// Server start time
    pub started_at: DateTime<Utc>,

    /// API version
    pub version: String,
}

impl AppState {
    /// # Arguments
    ///
    /// * `settings` - signing and directory settings
    /// * `directory` - user directory backend
    pub fn new(settings: &AuthSettings, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            codec: Arc::new(TokenCodec::new(settings)),
            verifier: Arc::new(CredentialVerifier::new(
                directory,
                settings.directory_timeout(),
            )),
            revalidate_subject: settings.revalidate_subject,
            directory_backend: "in_memory",
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Name the directory backend for health reporting.
    #[must_use]
    pub fn with_directory_backend(mut self, name: &'static str) -> Self {
        self.directory_backend = name;
        self
    }

    pub fn uptime_secs(&self) -> i64 {
        Utc::now().signed_duration_since(self.started_at).num_seconds()
    }

    /// Whether the directory answers a ping within the directory timeout.
    pub async fn is_directory_healthy(&self) -> bool {
        let directory = self.verifier.directory();
        matches!(
            tokio::time::timeout(self.verifier.timeout(), directory.ping()).await,
            Ok(Ok(()))
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("codec", &self.codec)
            .field("revalidate_subject", &self.revalidate_subject)
            .field("directory_backend", &self.directory_backend)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// State over an in-memory directory, for unit tests.
#[cfg(test)]
pub fn create_test_state(directory: crate::auth::InMemoryUserDirectory) -> AppState {
    AppState::new(
        &AuthSettings::with_secret("unit-test-secret-key-minimum-32-characters"),
        Arc::new(directory),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryUserDirectory;

    #[tokio::test]
    async fn test_directory_health() {
        let state = create_test_state(InMemoryUserDirectory::new());
        assert!(state.is_directory_healthy().await);
        assert_eq!(state.directory_backend, "in_memory");
        assert!(state.uptime_secs() >= 0);
    }

    #[test]
    fn test_debug_hides_keys() {
        let state = create_test_state(InMemoryUserDirectory::new());
        let printed = format!("{:?}", state);
        assert!(!printed.contains("unit-test-secret-key"));
    }
}
