//! HTTP client for the master's state document.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::{trace, warn};

use crate::domain::{MasterEndpoint, MasterState};
use crate::error::{Error, Result};
use crate::port::observer::ClusterObserver;

/// Path of the state document relative to the master's base URL.
pub const STATE_PATH: &str = "/master/state.json";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Fetches `GET http://<host>:<port>/master/state.json`.
#[derive(Debug, Clone)]
pub struct MasterStateClient {
    http: HttpClient,
}

impl Default for MasterStateClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MasterStateClient {
    /// Short per-request timeouts so one hung request cannot eat a poll budget.
    #[must_use]
    pub fn new() -> Self {
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });
        Self { http }
    }

    #[must_use]
    pub fn state_url(endpoint: &MasterEndpoint) -> String {
        format!("{}{STATE_PATH}", endpoint.base_url())
    }
}

#[async_trait]
impl ClusterObserver for MasterStateClient {
    async fn master_state(&self, endpoint: &MasterEndpoint) -> Result<MasterState> {
        let url = Self::state_url(endpoint);
        trace!(url = %url, "Fetching master state");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::runtime("fetch master state", e))?;

        response
            .json::<MasterState>()
            .await
            .map_err(|e| Error::runtime("decode master state", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_url_targets_state_document() {
        let endpoint = MasterEndpoint::new("172.17.0.3", 5050);
        assert_eq!(
            MasterStateClient::state_url(&endpoint),
            "http://172.17.0.3:5050/master/state.json"
        );
    }

    #[tokio::test]
    async fn unreachable_master_is_an_error() {
        let client = MasterStateClient::new();
        // Port 9 (discard) on loopback is closed in test environments.
        let err = client
            .master_state(&MasterEndpoint::new("127.0.0.1", 9))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Runtime { .. }));
    }
}
