//! The only component allowed to call the extraction tools.

use std::sync::Arc;

use crate::bridge::{BlockingBridge, BridgeError};
use crate::extractors::{
    resolve_video_url, ExtractorError, ResolveError, TranscriptSource, TranscriptTrack,
    VideoExtractor, VideoInfo,
};
use crate::media::{Audio, Language, Transcription};
use crate::BoxError;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("No transcript in a supported language for video {0}")]
    TranscriptNotFound(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Unknown extraction error: {0}")]
    Unknown(#[source] BoxError),
}

impl From<ExtractorError> for RetrievalError {
    fn from(err: ExtractorError) -> Self {
        match err {
            // removed, private and unreachable videos all look the same to callers
            ExtractorError::Unavailable(reason) => RetrievalError::VideoNotFound(reason),
            ExtractorError::Http(e) => RetrievalError::VideoNotFound(e.to_string()),
            other => RetrievalError::Unknown(Box::new(other)),
        }
    }
}

/// Metadata, audio and subtitle retrieval over blocking extraction tools
pub struct VideoRetrievalClient {
    bridge: BlockingBridge,
    extractor: Arc<dyn VideoExtractor>,
    transcripts: Arc<dyn TranscriptSource>,
}

impl VideoRetrievalClient {
    pub fn new(
        bridge: BlockingBridge,
        extractor: Arc<dyn VideoExtractor>,
        transcripts: Arc<dyn TranscriptSource>,
    ) -> Self {
        Self {
            bridge,
            extractor,
            transcripts,
        }
    }

    pub async fn fetch_metadata(&self, url: &str) -> Result<VideoInfo, RetrievalError> {
        let extractor = Arc::clone(&self.extractor);
        let url = url.to_owned();

        let info = self.bridge.run(move || extractor.extract_info(&url)).await??;
        tracing::info!("Extracted metadata for {} ({})", info.native_id, info.title);

        Ok(info)
    }

    pub async fn fetch_audio(&self, url: &str) -> Result<Audio, RetrievalError> {
        let extractor = Arc::clone(&self.extractor);
        let url = url.to_owned();

        let audio = self.bridge.run(move || extractor.download_audio(&url)).await??;
        tracing::info!("Downloaded {} bytes of {} audio", audio.len(), audio.format());

        Ok(audio)
    }

    /// Fetch platform subtitles in `language`, or in the first supported language available
    pub async fn fetch_subtitle(
        &self,
        url: &str,
        language: Option<Language>,
    ) -> Result<Transcription, RetrievalError> {
        let identity = resolve_video_url(url)?;
        if !identity.platform.supports_transcripts() {
            return Err(ResolveError::UnsupportedPlatform(identity.platform.to_string()).into());
        }

        let transcripts = Arc::clone(&self.transcripts);
        let native_id = identity.native_id.clone();

        let transcription = self
            .bridge
            .run(move || -> Result<Transcription, RetrievalError> {
                let tracks = transcripts.list_transcripts(&native_id)?;
                let (track, language) = select_track(&tracks, language)
                    .ok_or_else(|| RetrievalError::TranscriptNotFound(native_id.clone()))?;

                let content = transcripts.fetch_transcript(track)?;
                Ok(Transcription {
                    content,
                    format: track.format,
                    language: Some(language),
                })
            })
            .await??;

        tracing::info!(
            "Fetched {} subtitles for {}",
            transcription.language.map(|l| l.code()).unwrap_or("unknown"),
            identity
        );

        Ok(transcription)
    }
}

/// Pick a track for `requested`, or for the first language of [`Language::ALL`] that has one.
/// Uploader subtitles win over auto-generated captions in the same language.
fn select_track(
    tracks: &[TranscriptTrack],
    requested: Option<Language>,
) -> Option<(&TranscriptTrack, Language)> {
    let candidates: Vec<Language> = match requested {
        Some(lang) => vec![lang],
        None => Language::ALL.to_vec(),
    };

    candidates.into_iter().find_map(|lang| {
        let matching = || tracks.iter().filter(move |t| track_language(t) == Some(lang));
        matching()
            .find(|t| !t.generated)
            .or_else(|| matching().next())
            .map(|track| (track, lang))
    })
}

/// Language of a track, reading regional codes such as `en-US` by their primary subtag
fn track_language(track: &TranscriptTrack) -> Option<Language> {
    let primary = track.language_code.split(['-', '_']).next().unwrap_or_default();
    Language::from_code(primary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{MockTranscriptSource, MockVideoExtractor};
    use crate::media::{AudioFormat, SubtitleFormat};

    fn track(code: &str, generated: bool) -> TranscriptTrack {
        TranscriptTrack {
            language_code: code.to_string(),
            generated,
            format: SubtitleFormat::Vtt,
            url: format!("https://example.test/{}-{}.vtt", code, generated),
        }
    }

    fn client(
        extractor: MockVideoExtractor,
        transcripts: MockTranscriptSource,
    ) -> VideoRetrievalClient {
        VideoRetrievalClient::new(
            BlockingBridge::new(2),
            Arc::new(extractor),
            Arc::new(transcripts),
        )
    }

    #[test]
    fn test_select_track_prefers_requested_language() {
        let tracks = vec![track("en", false), track("ja", true), track("ja", false)];

        let (selected, lang) = select_track(&tracks, Some(Language::Japanese)).unwrap();
        assert_eq!(lang, Language::Japanese);
        assert!(!selected.generated);
    }

    #[test]
    fn test_select_track_falls_back_in_language_order() {
        let tracks = vec![track("fr", false), track("ko", false), track("ja", true)];

        let (selected, lang) = select_track(&tracks, None).unwrap();
        assert_eq!(lang, Language::Japanese);
        assert_eq!(selected.language_code, "ja");
    }

    #[test]
    fn test_select_track_reads_regional_codes() {
        let tracks = vec![track("en-GB", true), track("en-US", false)];

        let (selected, lang) = select_track(&tracks, Some(Language::English)).unwrap();
        assert_eq!(lang, Language::English);
        assert_eq!(selected.language_code, "en-US");
    }

    #[test]
    fn test_select_track_none_when_unavailable() {
        let tracks = vec![track("fr", false)];
        assert!(select_track(&tracks, None).is_none());
        assert!(select_track(&[track("en", false)], Some(Language::Korean)).is_none());
    }

    #[tokio::test]
    async fn test_unavailable_video_maps_to_not_found() {
        let mut extractor = MockVideoExtractor::new();
        extractor
            .expect_extract_info()
            .times(1)
            .returning(|_| {
                Err(ExtractorError::Unavailable(
                    "ERROR: Video unavailable".to_string(),
                ))
            });

        let err = client(extractor, MockTranscriptSource::new())
            .fetch_metadata("https://www.youtube.com/watch?v=gone")
            .await
            .unwrap_err();

        assert!(matches!(err, RetrievalError::VideoNotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_output_is_unknown_with_cause() {
        let mut extractor = MockVideoExtractor::new();
        extractor
            .expect_extract_info()
            .returning(|_| Err(ExtractorError::Malformed("not json".to_string())));

        let err = client(extractor, MockTranscriptSource::new())
            .fetch_metadata("https://www.youtube.com/watch?v=x")
            .await
            .unwrap_err();

        match err {
            RetrievalError::Unknown(source) => assert!(source.to_string().contains("not json")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_audio_returns_extractor_audio() {
        let mut extractor = MockVideoExtractor::new();
        extractor
            .expect_download_audio()
            .withf(|url| url == "https://www.youtube.com/watch?v=abc")
            .times(1)
            .returning(|_| Ok(Audio::new(b"aac".to_vec(), AudioFormat::Aac)));

        let audio = client(extractor, MockTranscriptSource::new())
            .fetch_audio("https://www.youtube.com/watch?v=abc")
            .await
            .unwrap();

        assert_eq!(audio.format(), AudioFormat::Aac);
    }

    #[tokio::test]
    async fn test_fetch_subtitle_resolves_id_and_tags_language() {
        let mut transcripts = MockTranscriptSource::new();
        transcripts
            .expect_list_transcripts()
            .withf(|id| id == "abc123")
            .times(1)
            .returning(|_| Ok(vec![track("de", false), track("ko", true)]));
        transcripts
            .expect_fetch_transcript()
            .withf(|t| t.language_code == "ko")
            .times(1)
            .returning(|_| Ok("WEBVTT\n\n00:00.000 --> 00:01.000\nannyeong".to_string()));

        let transcription = client(MockVideoExtractor::new(), transcripts)
            .fetch_subtitle("https://youtu.be/abc123", None)
            .await
            .unwrap();

        assert_eq!(transcription.language, Some(Language::Korean));
        assert_eq!(transcription.format, SubtitleFormat::Vtt);
        assert!(transcription.content.starts_with("WEBVTT"));
    }

    #[tokio::test]
    async fn test_fetch_subtitle_without_matching_language() {
        let mut transcripts = MockTranscriptSource::new();
        transcripts
            .expect_list_transcripts()
            .returning(|_| Ok(vec![track("en", false)]));
        transcripts.expect_fetch_transcript().never();

        let err = client(MockVideoExtractor::new(), transcripts)
            .fetch_subtitle("https://www.youtube.com/watch?v=abc123", Some(Language::Japanese))
            .await
            .unwrap_err();

        assert!(matches!(err, RetrievalError::TranscriptNotFound(id) if id == "abc123"));
    }

    #[tokio::test]
    async fn test_fetch_subtitle_rejects_unsupported_host() {
        let mut transcripts = MockTranscriptSource::new();
        transcripts.expect_list_transcripts().never();

        let err = client(MockVideoExtractor::new(), transcripts)
            .fetch_subtitle("https://vimeo.com/12345", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RetrievalError::Resolve(ResolveError::UnsupportedPlatform(host)) if host == "vimeo.com"
        ));
    }
}
