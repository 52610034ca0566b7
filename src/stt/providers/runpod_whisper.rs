use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{ensure_ok, require, runpod_client, runsync_url};
use crate::media::{Audio, AudioFormat, Language, SubtitleFormat};
use crate::stt::{ProviderConfigError, RecognizedSpeech, SpeechToText, SttError, TranscribeOptions};

const PROVIDER: &str = "runpod-whisper";

const SUPPORTED_FORMATS: &[AudioFormat] = &[AudioFormat::Mp3, AudioFormat::Ogg, AudioFormat::Wav];

/// Runpod faster-whisper worker settings. Decoding parameters are passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunpodWhisperConfig {
    /// Filled from `RUNPOD_API_KEY` when left out
    #[serde(default)]
    pub api_key: String,
    pub endpoint: String,
    pub model: String,

    #[serde(default)]
    pub temperature: f64,

    #[serde(default = "default_best_of")]
    pub best_of: u32,

    #[serde(default = "default_beam_size")]
    pub beam_size: u32,

    #[serde(default)]
    pub patience: Option<f64>,

    #[serde(default)]
    pub length_penalty: Option<f64>,

    #[serde(default = "default_suppress_tokens")]
    pub suppress_tokens: String,

    #[serde(default = "default_true")]
    pub condition_on_previous_text: bool,

    #[serde(default = "default_temperature_increment")]
    pub temperature_increment_on_fallback: f64,

    #[serde(default = "default_compression_ratio_threshold")]
    pub compression_ratio_threshold: f64,

    #[serde(default = "default_logprob_threshold")]
    pub logprob_threshold: f64,

    #[serde(default = "default_no_speech_threshold")]
    pub no_speech_threshold: f64,
}

fn default_best_of() -> u32 {
    5
}

fn default_beam_size() -> u32 {
    5
}

fn default_suppress_tokens() -> String {
    "-1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_temperature_increment() -> f64 {
    0.2
}

fn default_compression_ratio_threshold() -> f64 {
    2.4
}

fn default_logprob_threshold() -> f64 {
    -1.0
}

fn default_no_speech_threshold() -> f64 {
    0.6
}

impl RunpodWhisperConfig {
    /// Config with the worker's default decoding parameters
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            temperature: 0.0,
            best_of: default_best_of(),
            beam_size: default_beam_size(),
            patience: None,
            length_penalty: None,
            suppress_tokens: default_suppress_tokens(),
            condition_on_previous_text: true,
            temperature_increment_on_fallback: default_temperature_increment(),
            compression_ratio_threshold: default_compression_ratio_threshold(),
            logprob_threshold: default_logprob_threshold(),
            no_speech_threshold: default_no_speech_threshold(),
        }
    }
}

/// Speech-to-text through a Runpod faster-whisper worker
pub struct RunpodWhisper {
    client: reqwest::Client,
    url: String,
    config: RunpodWhisperConfig,
}

impl RunpodWhisper {
    pub fn new(config: &RunpodWhisperConfig) -> Result<Self, ProviderConfigError> {
        require(PROVIDER, "api_key", &config.api_key)?;
        require(PROVIDER, "endpoint", &config.endpoint)?;
        require(PROVIDER, "model", &config.model)?;

        Ok(Self {
            client: runpod_client(PROVIDER, &config.api_key)?,
            url: runsync_url(&config.endpoint),
            config: config.clone(),
        })
    }
}

#[derive(Serialize)]
struct WhisperRequest<'a> {
    input: WhisperInput<'a>,
}

#[derive(Serialize)]
struct WhisperInput<'a> {
    audio_base64: String,
    model: &'a str,
    language: Option<&'static str>,
    transcription: &'static str,
    temperature: f64,
    best_of: u32,
    beam_size: u32,
    patience: Option<f64>,
    length_penalty: Option<f64>,
    suppress_tokens: &'a str,
    condition_on_previous_text: bool,
    temperature_increment_on_fallback: f64,
    compression_ratio_threshold: f64,
    logprob_threshold: f64,
    no_speech_threshold: f64,
    prompt: Option<&'a str>,
}

#[derive(Deserialize)]
struct WhisperResponse {
    output: WhisperOutput,
}

#[derive(Deserialize)]
struct WhisperOutput {
    transcription: String,
    #[serde(default)]
    detected_language: Option<String>,
}

/// Requested language wins; otherwise trust detection only for languages we support
fn resolve_language(requested: Option<Language>, detected: Option<&str>) -> Option<Language> {
    requested.or_else(|| detected.and_then(Language::from_code))
}

#[async_trait]
impl SpeechToText for RunpodWhisper {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn supported_formats(&self) -> &'static [AudioFormat] {
        SUPPORTED_FORMATS
    }

    fn output_format(&self) -> SubtitleFormat {
        SubtitleFormat::Vtt
    }

    async fn transcribe(
        &self,
        audio: &Audio,
        options: &TranscribeOptions,
    ) -> Result<RecognizedSpeech, SttError> {
        let config = &self.config;
        let request = WhisperRequest {
            input: WhisperInput {
                audio_base64: STANDARD.encode(audio.binary()),
                model: &config.model,
                language: options.language.map(|lang| lang.code()),
                transcription: SubtitleFormat::Vtt.as_str(),
                temperature: config.temperature,
                best_of: config.best_of,
                beam_size: config.beam_size,
                patience: config.patience,
                length_penalty: config.length_penalty,
                suppress_tokens: &config.suppress_tokens,
                condition_on_previous_text: config.condition_on_previous_text,
                temperature_increment_on_fallback: config.temperature_increment_on_fallback,
                compression_ratio_threshold: config.compression_ratio_threshold,
                logprob_threshold: config.logprob_threshold,
                no_speech_threshold: config.no_speech_threshold,
                prompt: options.prompt.as_deref(),
            },
        };

        tracing::debug!(
            url = %self.url,
            model = %config.model,
            "Sending {} bytes to Runpod Whisper",
            audio.len()
        );

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|source| SttError::Request { provider: PROVIDER, source })?;
        let response = ensure_ok(PROVIDER, response).await?;

        let body: WhisperResponse = response.json().await.map_err(|e| SttError::MalformedResponse {
            provider: PROVIDER,
            reason: e.to_string(),
        })?;

        let language = resolve_language(options.language, body.output.detected_language.as_deref());
        if language.is_none() {
            tracing::warn!(
                "Whisper detected unsupported language {:?}",
                body.output.detected_language
            );
        }

        tracing::info!(
            "Runpod Whisper transcription completed ({} chars)",
            body.output.transcription.len()
        );

        Ok(RecognizedSpeech {
            content: body.output.transcription,
            language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str) -> RunpodWhisperConfig {
        RunpodWhisperConfig::new("test-key", endpoint, "large-v3")
    }

    fn whisper_reply(detected: Option<&str>) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "sync-2",
            "status": "COMPLETED",
            "output": {
                "segments": [],
                "transcription": "WEBVTT\n\n00:00.000 --> 00:02.000\nannyeong",
                "model": "large-v3",
                "detected_language": detected,
                "device": "cuda"
            }
        }))
    }

    #[test]
    fn test_model_is_required() {
        let config = RunpodWhisperConfig::new("key", "https://api.runpod.ai/v2/w", "");
        let result = RunpodWhisper::new(&config);
        assert!(matches!(
            result,
            Err(ProviderConfigError::MissingField { field: "model", .. })
        ));
    }

    #[test]
    fn test_config_defaults_from_yaml() {
        let config: RunpodWhisperConfig =
            serde_yaml::from_str("api_key: k\nendpoint: https://e\nmodel: large-v3\n").unwrap();

        assert_eq!(config, RunpodWhisperConfig::new("k", "https://e", "large-v3"));
        assert_eq!(config.best_of, 5);
        assert_eq!(config.suppress_tokens, "-1");
        assert!(config.condition_on_previous_text);
    }

    #[test]
    fn test_resolve_language() {
        assert_eq!(
            resolve_language(Some(Language::Japanese), Some("ko")),
            Some(Language::Japanese)
        );
        assert_eq!(resolve_language(None, Some("ko")), Some(Language::Korean));
        assert_eq!(resolve_language(None, Some("fr")), None);
        assert_eq!(resolve_language(None, None), None);
    }

    #[tokio::test]
    async fn test_request_carries_parameters_and_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/runsync"))
            .and(header("authorization", "test-key"))
            .and(body_partial_json(json!({
                "input": {
                    "audio_base64": STANDARD.encode(b"vocals"),
                    "model": "large-v3",
                    "language": "ko",
                    "transcription": "vtt",
                    "best_of": 5,
                    "beam_size": 5,
                    "suppress_tokens": "-1",
                    "temperature_increment_on_fallback": 0.2,
                    "prompt": "song lyrics"
                }
            })))
            .respond_with(whisper_reply(Some("ko")))
            .expect(1)
            .mount(&server)
            .await;

        let whisper = RunpodWhisper::new(&config(&server.uri())).unwrap();
        let options = TranscribeOptions {
            language: Some(Language::Korean),
            prompt: Some("song lyrics".to_string()),
        };

        let speech = whisper
            .transcribe(&Audio::new(b"vocals".to_vec(), AudioFormat::Ogg), &options)
            .await
            .unwrap();

        assert_eq!(speech.language, Some(Language::Korean));
        assert!(speech.content.starts_with("WEBVTT"));
    }

    #[tokio::test]
    async fn test_detected_language_is_used_when_supported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(whisper_reply(Some("ja")))
            .mount(&server)
            .await;

        let whisper = RunpodWhisper::new(&config(&server.uri())).unwrap();
        let speech = whisper
            .transcribe(&Audio::new(b"v".to_vec(), AudioFormat::Mp3), &TranscribeOptions::default())
            .await
            .unwrap();

        assert_eq!(speech.language, Some(Language::Japanese));
    }

    #[tokio::test]
    async fn test_unsupported_detected_language_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(whisper_reply(Some("de")))
            .mount(&server)
            .await;

        let whisper = RunpodWhisper::new(&config(&server.uri())).unwrap();
        let speech = whisper
            .transcribe(&Audio::new(b"v".to_vec(), AudioFormat::Mp3), &TranscribeOptions::default())
            .await
            .unwrap();

        assert_eq!(speech.language, None);
    }

    #[tokio::test]
    async fn test_server_error_is_distinguishable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let whisper = RunpodWhisper::new(&config(&server.uri())).unwrap();
        let err = whisper
            .transcribe(&Audio::new(b"v".to_vec(), AudioFormat::Wav), &TranscribeOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SttError::RemoteInference { provider: "runpod-whisper", status: 500 }
        ));
    }
}
