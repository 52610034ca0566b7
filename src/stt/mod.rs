//! Audio capabilities backed by remote inference providers.
//!
//! A provider implements [`BackgroundRemover`] or [`SpeechToText`] and only
//! deals with the formats it lists. The wrappers [`BackgroundRemoval`] and
//! [`SpeechRecognition`] accept audio in any format: they transcode to the
//! provider's canonical (first) format when needed and tag the result with
//! the provider's declared output format.

use async_trait::async_trait;
use std::sync::Arc;

pub mod pipeline;
pub mod providers;

pub use pipeline::TranscribePipeline;
pub use providers::{RunpodUvr, RunpodUvrConfig, RunpodWhisper, RunpodWhisperConfig};

use crate::media::{
    Audio, AudioFormat, AudioTranscoder, Language, SubtitleFormat, TranscodeError, Transcription,
};

#[derive(Debug, thiserror::Error)]
pub enum SttError {
    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error("{provider} returned HTTP {status}")]
    RemoteInference { provider: &'static str, status: u16 },

    #[error("Request to {provider} failed")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Malformed response from {provider}: {reason}")]
    MalformedResponse { provider: &'static str, reason: String },
}

/// Provider configuration problems, raised when a provider is built
#[derive(Debug, thiserror::Error)]
pub enum ProviderConfigError {
    #[error("Missing provider configuration section: {0}")]
    MissingSection(&'static str),

    #[error("{provider}: `{field}` must be provided in the configuration")]
    MissingField { provider: &'static str, field: &'static str },

    #[error("{provider}: `{field}` is not a valid value")]
    InvalidField { provider: &'static str, field: &'static str },

    #[error("{0} does not declare any supported input format")]
    NoSupportedFormats(&'static str),

    #[error("Failed to build HTTP client for {provider}")]
    Client {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Optional hints passed to speech recognition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscribeOptions {
    /// Language to force; auto-detected when absent
    pub language: Option<Language>,

    /// Initial prompt biasing the recognizer (names, vocabulary)
    pub prompt: Option<String>,
}

/// Raw result of a speech-to-text provider before format tagging
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedSpeech {
    pub content: String,
    pub language: Option<Language>,
}

/// Provider able to strip background music/noise from audio
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    fn name(&self) -> &'static str;

    /// Accepted input formats, canonical conversion target first
    fn supported_formats(&self) -> &'static [AudioFormat];

    fn output_format(&self) -> AudioFormat;

    /// Provider call. `audio` is always in one of `supported_formats`.
    async fn remove_background(&self, audio: &Audio) -> Result<Vec<u8>, SttError>;
}

/// Provider able to turn speech into subtitle text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechToText: Send + Sync {
    fn name(&self) -> &'static str;

    /// Accepted input formats, canonical conversion target first
    fn supported_formats(&self) -> &'static [AudioFormat];

    fn output_format(&self) -> SubtitleFormat;

    /// Provider call. `audio` is always in one of `supported_formats`.
    async fn transcribe(
        &self,
        audio: &Audio,
        options: &TranscribeOptions,
    ) -> Result<RecognizedSpeech, SttError>;
}

/// Convert `audio` to the first of `supported` unless it is already accepted
pub async fn normalize_format(
    audio: Audio,
    supported: &[AudioFormat],
    transcoder: &dyn AudioTranscoder,
) -> Result<Audio, TranscodeError> {
    if supported.contains(&audio.format()) {
        return Ok(audio);
    }

    let Some(&canonical) = supported.first() else {
        return Ok(audio);
    };

    tracing::debug!("Converting {} audio to {} before provider call", audio.format(), canonical);
    transcoder.convert(&audio, canonical).await
}

/// Format-normalizing front for a [`BackgroundRemover`]
pub struct BackgroundRemoval {
    provider: Arc<dyn BackgroundRemover>,
    transcoder: Arc<dyn AudioTranscoder>,
}

impl BackgroundRemoval {
    pub fn new(
        provider: Arc<dyn BackgroundRemover>,
        transcoder: Arc<dyn AudioTranscoder>,
    ) -> Result<Self, ProviderConfigError> {
        if provider.supported_formats().is_empty() {
            return Err(ProviderConfigError::NoSupportedFormats(provider.name()));
        }

        Ok(Self { provider, transcoder })
    }

    pub fn supported_formats(&self) -> &'static [AudioFormat] {
        self.provider.supported_formats()
    }

    pub fn output_format(&self) -> AudioFormat {
        self.provider.output_format()
    }

    /// Remove background noise from audio in any format
    pub async fn remove_background(&self, audio: Audio) -> Result<Audio, SttError> {
        let input =
            normalize_format(audio, self.supported_formats(), self.transcoder.as_ref()).await?;

        tracing::debug!("Removing background with {}", self.provider.name());
        let binary = self.provider.remove_background(&input).await?;

        Ok(Audio::new(binary, self.output_format()))
    }
}

/// Format-normalizing front for a [`SpeechToText`] provider
pub struct SpeechRecognition {
    provider: Arc<dyn SpeechToText>,
    transcoder: Arc<dyn AudioTranscoder>,
}

impl SpeechRecognition {
    pub fn new(
        provider: Arc<dyn SpeechToText>,
        transcoder: Arc<dyn AudioTranscoder>,
    ) -> Result<Self, ProviderConfigError> {
        if provider.supported_formats().is_empty() {
            return Err(ProviderConfigError::NoSupportedFormats(provider.name()));
        }

        Ok(Self { provider, transcoder })
    }

    pub fn supported_formats(&self) -> &'static [AudioFormat] {
        self.provider.supported_formats()
    }

    pub fn output_format(&self) -> SubtitleFormat {
        self.provider.output_format()
    }

    /// Transcribe audio in any format
    pub async fn transcribe(
        &self,
        audio: Audio,
        options: &TranscribeOptions,
    ) -> Result<Transcription, SttError> {
        let input =
            normalize_format(audio, self.supported_formats(), self.transcoder.as_ref()).await?;

        tracing::debug!("Transcribing with {}", self.provider.name());
        let speech = self.provider.transcribe(&input, options).await?;

        Ok(Transcription {
            content: speech.content,
            format: self.output_format(),
            language: speech.language,
        })
    }
}
