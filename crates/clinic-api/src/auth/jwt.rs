//! Access-token issuing and verification.
//!
//! Tokens are JWTs signed with a symmetric MAC. The algorithm is fixed by
//! configuration; a token whose header names any other algorithm (including
//! `none` or an asymmetric one) is rejected as invalid.

use chrono::{DateTime, Duration, Utc};
use clinic_core::{AuthSettings, Identity, Role, SigningAlgorithm};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Tolerated clock skew for `iat` in the future (seconds).
const CLOCK_SKEW_SECS: i64 = 60;

/// Access-token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - username
    pub sub: String,
    /// Caller role
    pub role: Role,
    /// Owning document, patients only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// JWT ID
    pub jti: String,
}

impl Claims {
    /// Claims for `identity`, valid from `now` for `ttl`.
    ///
    /// Fails with [`IssueError::TtlOutOfRange`] when `now + ttl` is not a
    /// representable instant.
    pub fn new(identity: &Identity, ttl: Duration, now: DateTime<Utc>) -> Result<Self, IssueError> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(IssueError::TtlOutOfRange)?;

        Ok(Self {
            sub: identity.subject().to_string(),
            role: identity.role(),
            doc: identity.owning_document().map(str::to_string),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Expired at `now` (expiry instant included).
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

/// Errors while issuing a token.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("token lifetime must be at least one second")]
    NonPositiveTtl,
    #[error("token lifetime is out of range")]
    TtlOutOfRange,
    #[error("token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// Errors while verifying a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired, please log in again")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Signs and verifies access tokens with one fixed key and algorithm.
///
/// Built once at startup and shared read-only; it holds no per-request state.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
    default_ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

fn jwt_algorithm(algorithm: SigningAlgorithm) -> Algorithm {
    match algorithm {
        SigningAlgorithm::Hs256 => Algorithm::HS256,
        SigningAlgorithm::Hs384 => Algorithm::HS384,
        SigningAlgorithm::Hs512 => Algorithm::HS512,
    }
}

impl TokenCodec {
    /// Codec from the configured signing settings.
    pub fn new(settings: &AuthSettings) -> Self {
        Self::from_secret(
            settings.secret_key.expose_secret().as_bytes(),
            settings.algorithm,
            // out-of-range lifetimes surface as TtlOutOfRange when issuing
            Duration::try_minutes(settings.token_ttl_minutes).unwrap_or(Duration::MAX),
        )
    }

    /// Codec from raw parts.
    pub fn from_secret(secret: &[u8], algorithm: SigningAlgorithm, default_ttl: Duration) -> Self {
        let algorithm = jwt_algorithm(algorithm);

        // expiry is checked against our own clock in `verify_at`
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            validation,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token with the configured default lifetime.
    pub fn issue_default(&self, identity: &Identity) -> Result<String, IssueError> {
        self.issue(identity, self.default_ttl)
    }

    /// Issue a token valid for `ttl` from now.
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<String, IssueError> {
        self.issue_at(identity, ttl, Utc::now())
    }

    /// Issue a token valid for `ttl` from `now`.
    pub fn issue_at(
        &self,
        identity: &Identity,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, IssueError> {
        if ttl < Duration::seconds(1) {
            return Err(IssueError::NonPositiveTtl);
        }

        let claims = Claims::new(identity, ttl, now)?;
        Ok(encode(
            &Header::new(self.algorithm),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as of `now`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Expired`] when `now >= exp`
    /// - [`TokenError::Invalid`] for a bad signature, malformed structure,
    ///   unexpected algorithm, inconsistent time window or claims that do
    ///   not form a valid identity
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let claims = self.decode_claims(token)?;
        let now = now.timestamp();

        if claims.exp <= claims.iat || claims.iat > now + CLOCK_SKEW_SECS {
            return Err(TokenError::Invalid);
        }
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Identity::new(claims.sub, claims.role, claims.doc, true).map_err(|e| {
            tracing::warn!(error = %e, "Token claims do not form a valid identity");
            TokenError::Invalid
        })
    }

    /// Check signature, algorithm and structure; time claims are not checked.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(kind = ?e.kind(), "Token rejected");
                TokenError::Invalid
            })
    }
}
