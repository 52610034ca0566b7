use std::sync::Arc;

use super::{
    BackgroundRemoval, ProviderConfigError, RunpodUvr, RunpodWhisper, SpeechRecognition, SttError,
    TranscribeOptions,
};
use crate::config::ProvidersConfig;
use crate::media::{Audio, AudioTranscoder, Transcription};

/// Background removal followed by speech-to-text
pub struct TranscribePipeline {
    background_remover: BackgroundRemoval,
    speech_to_text: SpeechRecognition,
}

impl TranscribePipeline {
    pub fn new(background_remover: BackgroundRemoval, speech_to_text: SpeechRecognition) -> Self {
        Self {
            background_remover,
            speech_to_text,
        }
    }

    /// Build the Runpod-backed pipeline, failing on incomplete provider configuration
    pub fn from_config(
        providers: &ProvidersConfig,
        transcoder: Arc<dyn AudioTranscoder>,
    ) -> Result<Self, ProviderConfigError> {
        let uvr_config = providers
            .background_remover
            .as_ref()
            .ok_or(ProviderConfigError::MissingSection("providers.background_remover"))?;
        let whisper_config = providers
            .speech_to_text
            .as_ref()
            .ok_or(ProviderConfigError::MissingSection("providers.speech_to_text"))?;

        let background_remover =
            BackgroundRemoval::new(Arc::new(RunpodUvr::new(uvr_config)?), Arc::clone(&transcoder))?;
        let speech_to_text =
            SpeechRecognition::new(Arc::new(RunpodWhisper::new(whisper_config)?), transcoder)?;

        Ok(Self::new(background_remover, speech_to_text))
    }

    pub async fn process(&self, audio: Audio) -> Result<Transcription, SttError> {
        self.process_with(audio, &TranscribeOptions::default()).await
    }

    /// Isolate vocals, then transcribe them. Any stage failure aborts the run.
    pub async fn process_with(
        &self,
        audio: Audio,
        options: &TranscribeOptions,
    ) -> Result<Transcription, SttError> {
        tracing::info!(
            "Removing background from {} bytes of {} audio",
            audio.len(),
            audio.format()
        );
        let vocals = self.background_remover.remove_background(audio).await?;

        tracing::info!("Transcribing {} bytes of isolated vocals", vocals.len());
        self.speech_to_text.transcribe(vocals, options).await
    }
}
