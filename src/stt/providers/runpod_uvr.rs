use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{ensure_ok, require, runpod_client, runsync_url};
use crate::media::{Audio, AudioFormat};
use crate::stt::{BackgroundRemover, ProviderConfigError, SttError};

const PROVIDER: &str = "runpod-uvr";

const SUPPORTED_FORMATS: &[AudioFormat] = &[AudioFormat::Mp3, AudioFormat::Ogg, AudioFormat::Wav];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunpodUvrConfig {
    /// Filled from `RUNPOD_API_KEY` when left out
    #[serde(default)]
    pub api_key: String,
    pub endpoint: String,
}

/// Vocal isolation through a Runpod UVR worker
pub struct RunpodUvr {
    client: reqwest::Client,
    url: String,
}

impl RunpodUvr {
    pub fn new(config: &RunpodUvrConfig) -> Result<Self, ProviderConfigError> {
        require(PROVIDER, "api_key", &config.api_key)?;
        require(PROVIDER, "endpoint", &config.endpoint)?;

        Ok(Self {
            client: runpod_client(PROVIDER, &config.api_key)?,
            url: runsync_url(&config.endpoint),
        })
    }
}

#[derive(Serialize)]
struct UvrRequest {
    input: UvrInput,
}

#[derive(Serialize)]
struct UvrInput {
    audio: String,
    parts: [&'static str; 1],
}

#[derive(Deserialize)]
struct UvrResponse {
    output: UvrOutput,
}

#[derive(Deserialize)]
struct UvrOutput {
    vocals: String,
}

#[async_trait]
impl BackgroundRemover for RunpodUvr {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn supported_formats(&self) -> &'static [AudioFormat] {
        SUPPORTED_FORMATS
    }

    fn output_format(&self) -> AudioFormat {
        AudioFormat::Ogg
    }

    async fn remove_background(&self, audio: &Audio) -> Result<Vec<u8>, SttError> {
        let request = UvrRequest {
            input: UvrInput {
                audio: STANDARD.encode(audio.binary()),
                parts: ["vocals"],
            },
        };

        tracing::debug!(url = %self.url, "Sending {} bytes to Runpod UVR", audio.len());

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|source| SttError::Request { provider: PROVIDER, source })?;
        let response = ensure_ok(PROVIDER, response).await?;

        let body: UvrResponse = response.json().await.map_err(|e| SttError::MalformedResponse {
            provider: PROVIDER,
            reason: e.to_string(),
        })?;

        let vocals = STANDARD
            .decode(body.output.vocals)
            .map_err(|e| SttError::MalformedResponse {
                provider: PROVIDER,
                reason: format!("vocals are not base64: {}", e),
            })?;

        tracing::info!("Runpod UVR returned {} bytes of vocals", vocals.len());

        Ok(vocals)
    }
}
