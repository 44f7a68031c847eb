//! Prometheus metrics.
//!
//! HTTP request metrics plus the guard's own counters, exposed on `/metrics`.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder.
///
/// # Errors
///
/// Fails if a recorder is already installed.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .set_buckets_for_metric(
            Matcher::Full("auth_login_duration_seconds".to_string()),
            &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP
// ============================================================================

pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// Guard
// ============================================================================

/// Login attempt by outcome (`success`, `invalid_credentials`, `unavailable`).
pub fn record_login(outcome: &'static str, duration_secs: f64) {
    counter!("auth_login_attempts_total", "outcome" => outcome).increment(1);
    histogram!("auth_login_duration_seconds").record(duration_secs);
}

/// Access decision by terminal state and reason code.
pub fn record_access_decision(state: &'static str, reason: &'static str) {
    counter!("auth_access_decisions_total", "state" => state, "reason" => reason).increment(1);
}

// ============================================================================
// Path normalization
// ============================================================================

/// Replace identifier-like segments so labels stay low-cardinality.
///
/// Used when no route template matched. Patient document numbers are
/// identifiers too and must not end up in label values.
///
/// e.g. `/pacientes/12345/pdf` → `/pacientes/:id/pdf`
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let is_uuid = segment.len() == 36 && segment.chars().filter(|c| *c == '-').count() == 4;
            let has_digit = segment.chars().any(|c| c.is_ascii_digit());

            if is_uuid || has_digit {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/sessions/123e4567-e89b-12d3-a456-426614174000";
        assert_eq!(normalize_path(path), "/sessions/:id");
    }

    #[test]
    fn test_normalize_path_document() {
        assert_eq!(normalize_path("/pacientes/12345"), "/pacientes/:id");
        assert_eq!(normalize_path("/pacientes/CC1020/pdf"), "/pacientes/:id/pdf");
    }

    #[test]
    fn test_normalize_path_no_params() {
        assert_eq!(normalize_path("/health/ready"), "/health/ready");
        assert_eq!(normalize_path("/"), "/");
    }
}
