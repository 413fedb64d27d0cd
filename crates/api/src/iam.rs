//! API key to bearer token exchange.

use std::fmt;
use std::time::Instant;

use reqwest::{Client, RequestBuilder, header};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use vpcimage_util::http::{parse_response_json_strict, service_error_message};

use crate::{
    ApiError,
    endpoint::validate_base_url,
    http::{build_http_client, user_agent},
};

/// OAuth grant type for API key exchange.
pub const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchanges an API key for a bearer token.
///
/// The token is requested lazily on first use and reused for the lifetime of
/// the authenticator.
pub struct IamAuthenticator {
    api_key: String,
    token_url: String,
    http: Client,
    token: Mutex<Option<String>>,
}

impl fmt::Debug for IamAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamAuthenticator")
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

impl IamAuthenticator {
    /// Create an authenticator for `api_key` against the token endpoint `token_url`.
    ///
    /// Fails when the key is blank or the endpoint does not pass
    /// [`validate_base_url`].
    pub fn new(api_key: &str, token_url: &str) -> Result<Self, ApiError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ApiError::Authentication("API key is empty".into()));
        }
        validate_base_url(token_url)?;

        Ok(Self {
            api_key: api_key.to_string(),
            token_url: token_url.to_string(),
            http: build_http_client()?,
            token: Mutex::new(None),
        })
    }

    /// Attach the bearer token to `request`, fetching it first if needed.
    pub async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self.bearer_token().await?;
        Ok(request.bearer_auth(token))
    }

    /// Current bearer token.
    pub async fn bearer_token(&self) -> Result<String, ApiError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let token = self.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn request_token(&self) -> Result<String, ApiError> {
        let start = Instant::now();
        debug!(token_url = %self.token_url, "requesting IAM token");
        let response = self
            .http
            .post(&self.token_url)
            .header(header::USER_AGENT, user_agent())
            .form(&[("grant_type", APIKEY_GRANT_TYPE), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|error| {
                warn!(
                    token_url = %self.token_url,
                    error = %error,
                    duration_ms = start.elapsed().as_millis(),
                    "IAM token request failed to send"
                );
                ApiError::Transport(error)
            })?;

        let status = response.status();
        let body_text = response.text().await.map_err(|error| {
            warn!(
                token_url = %self.token_url,
                status = %status,
                error = %error,
                duration_ms = start.elapsed().as_millis(),
                "IAM token response could not be read"
            );
            ApiError::Transport(error)
        })?;
        if !status.is_success() {
            let message = parse_response_json_strict(&body_text, Some(status))
                .ok()
                .and_then(|payload| service_error_message(&payload))
                .unwrap_or_else(|| format!("token endpoint returned {status}"));
            warn!(
                token_url = %self.token_url,
                status = %status,
                duration_ms = start.elapsed().as_millis(),
                "IAM token request rejected"
            );
            return Err(ApiError::Authentication(message));
        }

        let payload = parse_response_json_strict(&body_text, Some(status))?;
        let token = serde_json::from_value::<TokenResponse>(payload)?;
        debug!(token_url = %self.token_url, duration_ms = start.elapsed().as_millis(), "IAM token issued");
        Ok(token.access_token)
    }
}
