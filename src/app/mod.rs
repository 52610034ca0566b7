//! Composition root: builds every component once from [`Config`].

use std::sync::Arc;

use crate::bridge::BlockingBridge;
use crate::config::Config;
use crate::extractors::{TranscriptSource, VideoExtractor, YtDlp};
use crate::ingest::{InMemoryVideoRepository, VideoIngestionService, VideoRecord};
use crate::media::{AudioTranscoder, FfmpegTranscoder, Language, Transcription};
use crate::retrieval::VideoRetrievalClient;
use crate::stt::{TranscribeOptions, TranscribePipeline};
use crate::Result;

pub struct App {
    config: Config,
    retrieval: Arc<VideoRetrievalClient>,
    repository: Arc<InMemoryVideoRepository>,
    ingestion: VideoIngestionService,
    transcoder: Arc<dyn AudioTranscoder>,
}

impl App {
    /// Wire the yt-dlp and ffmpeg backed components
    pub fn new(config: Config) -> Self {
        let ytdlp = Arc::new(YtDlp::with_path(config.tools.yt_dlp_path.clone()));
        let transcoder = Arc::new(FfmpegTranscoder::with_path(config.tools.ffmpeg_path.clone()));

        Self::with_components(config, ytdlp.clone(), ytdlp, transcoder)
    }

    pub fn with_components(
        config: Config,
        extractor: Arc<dyn VideoExtractor>,
        transcripts: Arc<dyn TranscriptSource>,
        transcoder: Arc<dyn AudioTranscoder>,
    ) -> Self {
        let bridge = BlockingBridge::new(config.app.max_blocking_tasks);
        let retrieval = Arc::new(VideoRetrievalClient::new(bridge, extractor, transcripts));
        let repository = Arc::new(InMemoryVideoRepository::new());
        let ingestion = VideoIngestionService::new(repository.clone(), Arc::clone(&retrieval));

        Self {
            config,
            retrieval,
            repository,
            ingestion,
            transcoder,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &InMemoryVideoRepository {
        &self.repository
    }

    /// Build the transcription pipeline from the configured providers
    pub fn transcribe_pipeline(&self) -> Result<TranscribePipeline> {
        Ok(TranscribePipeline::from_config(
            &self.config.providers,
            Arc::clone(&self.transcoder),
        )?)
    }

    pub async fn ingest(&self, url: &str) -> Result<VideoRecord> {
        Ok(self.ingestion.ingest(url).await?)
    }

    /// Platform subtitles, falling back to the configured default language
    pub async fn fetch_subtitle(
        &self,
        url: &str,
        language: Option<Language>,
    ) -> Result<Transcription> {
        let language = language.or(self.config.app.default_language);
        Ok(self.retrieval.fetch_subtitle(url, language).await?)
    }

    /// Download the audio of `url` and run it through `pipeline`
    pub async fn transcribe(
        &self,
        pipeline: &TranscribePipeline,
        url: &str,
        mut options: TranscribeOptions,
    ) -> Result<Transcription> {
        let identity = crate::extractors::resolve_video_url(url)?;
        options.language = options.language.or(self.config.app.default_language);

        let audio = self.retrieval.fetch_audio(&identity.canonical_url()).await?;
        Ok(pipeline.process_with(audio, &options).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{MockTranscriptSource, MockVideoExtractor, TranscriptTrack, VideoInfo};
    use crate::media::transcoder::MockAudioTranscoder;
    use crate::media::{Audio, AudioFormat, SubtitleFormat};
    use crate::stt::{
        BackgroundRemoval, MockBackgroundRemover, MockSpeechToText, RecognizedSpeech,
        SpeechRecognition,
    };
    use crate::{Error, ErrorKind};

    const ONLY_MP3: &[AudioFormat] = &[AudioFormat::Mp3];

    fn app(extractor: MockVideoExtractor, transcripts: MockTranscriptSource) -> App {
        App::with_components(
            Config::default(),
            Arc::new(extractor),
            Arc::new(transcripts),
            Arc::new(MockAudioTranscoder::new()),
        )
    }

    #[tokio::test]
    async fn test_ingest_deduplicates_across_url_forms() {
        let mut extractor = MockVideoExtractor::new();
        extractor.expect_extract_info().times(1).returning(|_| {
            Ok(VideoInfo {
                native_id: "testestest".to_string(),
                title: "Title".to_string(),
                description: String::new(),
                channel_id: String::new(),
                channel_name: String::new(),
                duration_seconds: 10,
                thumbnail_url: String::new(),
            })
        });

        let app = app(extractor, MockTranscriptSource::new());
        let a = app.ingest("https://www.youtube.com/watch?v=testestest").await.unwrap();
        let b = app.ingest("youtu.be/testestest").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(app.repository().len().await, 1);
    }

    #[tokio::test]
    async fn test_ingest_unsupported_platform_is_bad_request() {
        let app = app(MockVideoExtractor::new(), MockTranscriptSource::new());
        let err = app.ingest("https://www.naver.com").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_subtitle_uses_default_language() {
        let mut transcripts = MockTranscriptSource::new();
        transcripts.expect_list_transcripts().returning(|_| {
            Ok(vec![
                TranscriptTrack {
                    language_code: "en".to_string(),
                    generated: false,
                    format: SubtitleFormat::Vtt,
                    url: "https://example.test/en.vtt".to_string(),
                },
                TranscriptTrack {
                    language_code: "ko".to_string(),
                    generated: false,
                    format: SubtitleFormat::Vtt,
                    url: "https://example.test/ko.vtt".to_string(),
                },
            ])
        });
        transcripts
            .expect_fetch_transcript()
            .withf(|track| track.language_code == "ko")
            .returning(|_| Ok("WEBVTT".to_string()));

        let mut config = Config::default();
        config.app.default_language = Some(Language::Korean);
        let app = App::with_components(
            config,
            Arc::new(MockVideoExtractor::new()),
            Arc::new(transcripts),
            Arc::new(MockAudioTranscoder::new()),
        );

        let transcription = app.fetch_subtitle("https://youtu.be/abc", None).await.unwrap();
        assert_eq!(transcription.language, Some(Language::Korean));
    }

    #[test]
    fn test_pipeline_requires_provider_sections() {
        let app = app(MockVideoExtractor::new(), MockTranscriptSource::new());

        let err = app.transcribe_pipeline().err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_transcribe_runs_downloaded_audio_through_pipeline() {
        let mut extractor = MockVideoExtractor::new();
        extractor
            .expect_download_audio()
            .withf(|url| url == "https://www.youtube.com/watch?v=abc")
            .times(1)
            .returning(|_| Ok(Audio::new(b"aac".to_vec(), AudioFormat::Aac)));

        let mut transcoder = MockAudioTranscoder::new();
        transcoder
            .expect_convert()
            .withf(|_, target| *target == AudioFormat::Mp3)
            .times(1)
            .returning(|_, target| Ok(Audio::new(b"mp3".to_vec(), target)));
        let transcoder: Arc<dyn AudioTranscoder> = Arc::new(transcoder);

        let mut remover = MockBackgroundRemover::new();
        remover.expect_name().return_const("uvr");
        remover.expect_supported_formats().returning(|| ONLY_MP3);
        remover.expect_output_format().return_const(AudioFormat::Mp3);
        remover
            .expect_remove_background()
            .times(1)
            .returning(|_| Ok(b"vocals".to_vec()));

        let mut stt = MockSpeechToText::new();
        stt.expect_name().return_const("whisper");
        stt.expect_supported_formats().returning(|| ONLY_MP3);
        stt.expect_output_format().return_const(SubtitleFormat::Vtt);
        stt.expect_transcribe()
            .withf(|audio, options| {
                audio.binary() == b"vocals" && options.language == Some(Language::Japanese)
            })
            .times(1)
            .returning(|_, _| {
                Ok(RecognizedSpeech {
                    content: "WEBVTT".to_string(),
                    language: Some(Language::Japanese),
                })
            });

        let pipeline = TranscribePipeline::new(
            BackgroundRemoval::new(Arc::new(remover), Arc::clone(&transcoder)).unwrap(),
            SpeechRecognition::new(Arc::new(stt), Arc::clone(&transcoder)).unwrap(),
        );

        let app = App::with_components(
            Config::default(),
            Arc::new(extractor),
            Arc::new(MockTranscriptSource::new()),
            transcoder,
        );

        let options = TranscribeOptions {
            language: Some(Language::Japanese),
            prompt: None,
        };
        let transcription = app
            .transcribe(&pipeline, "https://youtu.be/abc", options)
            .await
            .unwrap();

        assert_eq!(transcription.format, SubtitleFormat::Vtt);
        assert_eq!(transcription.content, "WEBVTT");
    }
}
