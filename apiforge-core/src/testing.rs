//! Helpers for exercising vendor modules against a local mock server.
//!
//! Enabled with the `test-util` feature.

use std::time::Duration;

use crate::endpoint::EndpointTable;
use crate::http::RetryPolicy;

/// Point every endpoint of `table` at `server_uri`.
///
/// The token endpoint becomes `{server_uri}/token`, the authorization
/// endpoint `{server_uri}/authorize`, and the API base `server_uri` itself,
/// so resource paths line up with the mock's path matchers.
pub fn mock_endpoints(table: EndpointTable, server_uri: &str) -> EndpointTable {
    let base = server_uri.trim_end_matches('/');
    table
        .with_authorize_url(format!("{}/authorize", base))
        .with_token_url(format!("{}/token", base))
        .with_api_base_url(base)
}

/// A retry policy with millisecond delays, so tests exercise the schedule
/// without waiting on it.
pub fn fast_retry(retries: usize) -> RetryPolicy {
    RetryPolicy::default().with_backoff(vec![Duration::from_millis(5); retries])
}
