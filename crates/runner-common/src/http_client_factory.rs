// Creates the HTTP clients used for the registration API and archive
// downloads.

use crate::constants::variables;

use anyhow::{Context, Result};
use reqwest::Client;
use runner_sdk::{SetupPackage, StringUtil};
use std::time::Duration;

/// Builds `reqwest` clients with the tool's user agent and TLS settings.
///
/// Proxy settings come from the standard `HTTPS_PROXY`/`HTTP_PROXY`/`NO_PROXY`
/// environment variables, which `reqwest` reads on its own.
pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Create a client with an optional per-request timeout.
    ///
    /// If `RUNNER_SETUP_TLS_NO_VERIFY` is truthy, certificate verification is
    /// disabled.
    pub fn create_client(timeout: Option<Duration>) -> Result<Client> {
        let mut builder = Client::builder().user_agent(SetupPackage::user_agent());

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        if Self::tls_no_verify() {
            tracing::warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().context("failed to build HTTP client")
    }

    fn tls_no_verify() -> bool {
        std::env::var(variables::TLS_NO_VERIFY)
            .ok()
            .and_then(|v| StringUtil::convert_to_bool(&v))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client_with_and_without_timeout() {
        assert!(HttpClientFactory::create_client(None).is_ok());
        assert!(HttpClientFactory::create_client(Some(Duration::from_secs(5))).is_ok());
    }
}
