//! Runpod serverless providers.
//!
//! Both endpoints take `POST {endpoint}/runsync` with the API key in the
//! `Authorization` header and reply with `{"output": {...}}`.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};

pub mod runpod_uvr;
pub mod runpod_whisper;

pub use runpod_uvr::{RunpodUvr, RunpodUvrConfig};
pub use runpod_whisper::{RunpodWhisper, RunpodWhisperConfig};

use super::{ProviderConfigError, SttError};

pub(crate) fn require(
    provider: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ProviderConfigError> {
    if value.trim().is_empty() {
        return Err(ProviderConfigError::MissingField { provider, field });
    }
    Ok(())
}

/// HTTP client carrying the Runpod auth header on every request
pub(crate) fn runpod_client(
    provider: &'static str,
    api_key: &str,
) -> Result<reqwest::Client, ProviderConfigError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut auth = HeaderValue::from_str(api_key.trim())
        .map_err(|_| ProviderConfigError::InvalidField { provider, field: "api_key" })?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|source| ProviderConfigError::Client { provider, source })
}

pub(crate) fn runsync_url(endpoint: &str) -> String {
    format!("{}/runsync", endpoint.trim_end_matches('/'))
}

/// Anything but 200 is a failed inference
pub(crate) async fn ensure_ok(
    provider: &'static str,
    response: Response,
) -> Result<Response, SttError> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    tracing::warn!("{} returned status {}: {}", provider, status, body);

    Err(SttError::RemoteInference {
        provider,
        status: status.as_u16(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runsync_url_trims_trailing_slash() {
        assert_eq!(
            runsync_url("https://api.runpod.ai/v2/abc/"),
            "https://api.runpod.ai/v2/abc/runsync"
        );
        assert_eq!(runsync_url("http://127.0.0.1:9000"), "http://127.0.0.1:9000/runsync");
    }

    #[test]
    fn test_require_rejects_blank_values() {
        assert!(require("p", "api_key", "secret").is_ok());
        assert!(matches!(
            require("p", "endpoint", "  "),
            Err(ProviderConfigError::MissingField { field: "endpoint", .. })
        ));
    }

    #[test]
    fn test_api_key_must_be_a_header_value() {
        let result = runpod_client("p", "bad\nkey");
        assert!(matches!(result, Err(ProviderConfigError::InvalidField { field: "api_key", .. })));
    }
}
