// RegistrationClient: exchanges the personal access token for a short-lived
// runner registration token.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use runner_common::host_context::HostContext;
use runner_common::tracing::Tracing;
use runner_sdk::TraceWriter;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use crate::configuration::validators::RepositoryRef;
use crate::errors::RegistrationError;
use crate::secret::{self, Credential, RegistrationToken};

const GITHUB_JSON: &str = "application/vnd.github+json";

/// Response from the registration-token endpoint.
#[derive(Debug, Deserialize)]
struct RegistrationTokenResponse {
    token: String,
    #[serde(default)]
    expires_at: Option<String>,
}

/// Obtains registration tokens for a repository.
#[async_trait]
pub trait RegistrationApi: Send + Sync {
    /// Spend `credential` on one registration-token request.
    async fn request_registration_token(
        &self,
        repo: &RepositoryRef,
        credential: Credential,
    ) -> Result<RegistrationToken, RegistrationError>;
}

/// REST implementation of `RegistrationApi`.
pub struct RegistrationClient {
    context: Arc<HostContext>,
    client: Client,
    api_base: String,
    trace: Tracing,
}

impl RegistrationClient {
    pub fn new(context: Arc<HostContext>, client: Client, api_base: impl Into<String>) -> Self {
        let trace = context.get_trace("RegistrationClient");
        Self {
            context,
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            trace,
        }
    }

    /// `{api_base}/repos/{owner}/{name}/actions/runners/registration-token`
    fn endpoint(&self, repo: &RepositoryRef) -> Result<Url, RegistrationError> {
        let invalid_base = |reason: String| {
            RegistrationError::Transport(format!("invalid API base URL '{}': {}", self.api_base, reason))
        };

        let mut url = Url::parse(&self.api_base).map_err(|e| invalid_base(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid_base("not a hierarchical URL".to_string()))?
            .pop_if_empty()
            .extend([
                "repos",
                repo.owner(),
                repo.name(),
                "actions",
                "runners",
                "registration-token",
            ]);
        Ok(url)
    }

    fn authorization(credential: &Credential) -> Result<HeaderValue, RegistrationError> {
        let mut raw = format!("token {}", credential.expose_secret());
        let header = HeaderValue::from_str(&raw);
        secret::wipe(&mut raw);

        let mut header = header.map_err(|_| {
            RegistrationError::Transport(
                "the access token contains characters that are not allowed in an HTTP header"
                    .to_string(),
            )
        })?;
        header.set_sensitive(true);
        Ok(header)
    }
}

#[async_trait]
impl RegistrationApi for RegistrationClient {
    async fn request_registration_token(
        &self,
        repo: &RepositoryRef,
        credential: Credential,
    ) -> Result<RegistrationToken, RegistrationError> {
        let url = self.endpoint(repo)?;
        self.trace
            .info(&format!("Requesting registration token from {}", url));

        let authorization = Self::authorization(&credential)?;
        drop(credential);

        let response = self
            .client
            .post(url.clone())
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await
            .map_err(|e| {
                RegistrationError::Transport(self.context.secret_masker.mask_secrets(&e.to_string()))
            })?;

        let status = response.status();
        self.trace
            .info(&format!("Registration endpoint returned HTTP {}", status.as_u16()));

        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            return Err(RegistrationError::AuthError {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(RegistrationError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            RegistrationError::Transport(self.context.secret_masker.mask_secrets(&e.to_string()))
        })?;

        let parsed: RegistrationTokenResponse = serde_json::from_str(&body)
            .map_err(|e| RegistrationError::ParseError(e.to_string()))?;

        let token = RegistrationToken::new(parsed.token);
        if token.is_empty() {
            return Err(RegistrationError::EmptyTokenError);
        }
        self.context.secret_masker.add_value(token.expose_secret());

        match parsed.expires_at {
            Some(expires_at) => self
                .trace
                .info(&format!("Received registration token, expires at {}", expires_at)),
            None => self.trace.info("Received registration token"),
        }

        Ok(token)
    }
}
