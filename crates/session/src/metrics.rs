//! Session counters
//!
//! Recorded through the `metrics` facade; the host decides whether a
//! recorder is installed. Metrics:
//!
//! - `session_logins_total` (counter): label `outcome` (completed, cancelled, rejected)
//! - `session_token_refresh_total` (counter): label `outcome` (refreshed, expired)
//! - `session_logouts_total` (counter)

/// Record the outcome of a redirect callback.
pub fn record_login(outcome: &'static str) {
    metrics::counter!("session_logins_total", "outcome" => outcome).increment(1);
}

/// Record the outcome of a token refresh.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("session_token_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_logout() {
    metrics::counter!("session_logouts_total").increment(1);
}
