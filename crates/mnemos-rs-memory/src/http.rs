//! Shared reqwest plumbing for the hosted-service adapters.

use crate::error::BackendError;
use log::debug;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Build a client with a fixed per-call timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Join a base URL and a path without doubling or dropping slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/{path}")
    }
}

/// Read a response body, failing on non-2xx status.
pub(crate) async fn read_body(response: reqwest::Response) -> Result<String, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        debug!(
            "upstream rejected request (status={}, body_len={})",
            status.as_u16(),
            body.len()
        );
        return Err(BackendError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Read and decode a JSON response body, failing on non-2xx status.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let body = read_body(response).await?;
    serde_json::from_str(&body).map_err(|err| BackendError::Malformed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::join_url;
    use pretty_assertions::assert_eq;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("https://x.io/", "/query"), "https://x.io/query");
        assert_eq!(join_url("https://x.io", "query"), "https://x.io/query");
        assert_eq!(join_url("https://x.io", ""), "https://x.io/");
    }
}
