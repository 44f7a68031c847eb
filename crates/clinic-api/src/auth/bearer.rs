//! `Authorization: Bearer <token>` parsing.
//!
//! Only splits the header; the token itself is not decoded here.

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};

/// Why no bearer token could be taken from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BearerError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("invalid authentication scheme, use 'Bearer <token>'")]
    MalformedScheme,
    #[error("missing bearer token")]
    MissingCredentials,
}

/// Split a raw header value into scheme and token.
///
/// The scheme is compared case-insensitively and separated from the token by
/// the first space; the token is the remainder. A header that is present but
/// empty is a malformed scheme, not a missing header.
///
/// # Example
///
/// ```
/// use clinic_api::auth::{extract_bearer, BearerError};
///
/// assert_eq!(extract_bearer(Some("bearer abc.def.ghi")), Ok("abc.def.ghi"));
/// assert_eq!(extract_bearer(Some("Basic xyz")), Err(BearerError::MalformedScheme));
/// assert_eq!(extract_bearer(None), Err(BearerError::MissingHeader));
/// ```
pub fn extract_bearer(header: Option<&str>) -> Result<&str, BearerError> {
    let header = header.ok_or(BearerError::MissingHeader)?;

    let (scheme, credentials) = match header.split_once(' ') {
        Some((scheme, rest)) => (scheme, rest),
        None => (header, ""),
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(BearerError::MalformedScheme);
    }

    if credentials.trim().is_empty() {
        return Err(BearerError::MissingCredentials);
    }

    Ok(credentials)
}

/// [`extract_bearer`] over a request's headers.
///
/// A value that is not visible ASCII cannot carry a bearer scheme and is
/// reported as [`BearerError::MalformedScheme`].
pub fn bearer_from_headers(headers: &HeaderMap) -> Result<&str, BearerError> {
    match headers.get(AUTHORIZATION).map(HeaderValue::to_str) {
        None => Err(BearerError::MissingHeader),
        Some(Err(_)) => Err(BearerError::MalformedScheme),
        Some(Ok(value)) => extract_bearer(Some(value)),
    }
}
