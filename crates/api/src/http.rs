//! Shared JSON-over-HTTP plumbing for the service clients.

use std::env;
use std::time::{Duration, Instant};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, Method, RequestBuilder, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use vpcimage_util::http::{parse_response_json_strict, service_error_message, status_error_message};
use vpcimage_util::redact_sensitive;

use crate::{ApiError, endpoint::validate_base_url};

/// Characters left untouched when an identifier is placed in a URL path.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Percent-encode a single path segment.
pub(crate) fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

pub(crate) fn user_agent() -> String {
    format!("vpcimage/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS)
}

/// Build the `reqwest::Client` used by every service client.
pub(crate) fn build_http_client() -> Result<Client, ApiError> {
    let mut default_headers = header::HeaderMap::new();
    default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

    Ok(Client::builder()
        .default_headers(default_headers)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

/// A validated base URL plus a configured HTTP client.
#[derive(Debug, Clone)]
pub(crate) struct JsonHttp {
    base_url: String,
    http: Client,
    user_agent: String,
}

impl JsonHttp {
    pub(crate) fn new(base_url: &str) -> Result<Self, ApiError> {
        validate_base_url(base_url)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: build_http_client()?,
            user_agent: user_agent(),
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request for an API-relative path.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "building request");

        self.http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent)
    }

    /// Send a request and decode the JSON body.
    ///
    /// Returns `Ok(None)` for a successful response with an empty body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &Method,
        path: &str,
    ) -> Result<Option<T>, ApiError> {
        let start = Instant::now();
        debug!(method = %method, path = %path, "http request started");

        let response = request.send().await.map_err(|error| {
            warn!(
                method = %method,
                path = %path,
                error = %error,
                duration_ms = start.elapsed().as_millis(),
                "http request failed to send"
            );
            ApiError::Transport(error)
        })?;
        let status = response.status();
        let body_text = response.text().await.map_err(|error| {
            warn!(
                method = %method,
                path = %path,
                status = %status,
                error = %error,
                duration_ms = start.elapsed().as_millis(),
                "http response body could not be read"
            );
            ApiError::Transport(error)
        })?;

        if !status.is_success() {
            let message = parse_response_json_strict(&body_text, Some(status))
                .ok()
                .and_then(|payload| service_error_message(&payload))
                .or_else(|| status_error_message(status.as_u16()))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            warn!(
                method = %method,
                path = %path,
                status = %status,
                message = %redact_sensitive(&message),
                duration_ms = start.elapsed().as_millis(),
                "http request returned an error status"
            );
            return Err(ApiError::status(status.as_u16(), message));
        }

        if body_text.trim().is_empty() {
            debug!(
                method = %method,
                path = %path,
                status = %status,
                duration_ms = start.elapsed().as_millis(),
                "http request completed with empty response"
            );
            return Ok(None);
        }

        let payload = parse_response_json_strict(&body_text, Some(status)).map_err(|error| {
            warn!(
                method = %method,
                path = %path,
                status = %status,
                body_preview = %redact_sensitive(error.body_preview()),
                duration_ms = start.elapsed().as_millis(),
                "http response was not valid JSON"
            );
            ApiError::InvalidJson(error)
        })?;
        let record = serde_json::from_value::<T>(payload)?;
        debug!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "http request completed"
        );
        Ok(Some(record))
    }
}
