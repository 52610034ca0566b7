use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub mod youtube;
pub mod ytdlp;

pub use ytdlp::YtDlp;

use crate::media::{Audio, SubtitleFormat};

/// Platforms videos can be ingested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
}

impl Platform {
    pub const ALL: [Platform; 1] = [Platform::YouTube];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
        }
    }

    /// Get the display name of this platform
    pub fn platform_name(&self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
        }
    }

    /// Hosts recognised as belonging to this platform
    pub fn hosts(&self) -> &'static [&'static str] {
        match self {
            Platform::YouTube => youtube::HOSTS,
        }
    }

    pub fn from_host(host: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|platform| platform.hosts().iter().any(|known| known.eq_ignore_ascii_case(host)))
    }

    /// Whether platform-provided subtitles can be fetched
    pub fn supports_transcripts(&self) -> bool {
        match self {
            Platform::YouTube => true,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A video as its platform identifies it. Ingestion is idempotent on this pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoIdentity {
    pub platform: Platform,
    pub native_id: String,
}

impl VideoIdentity {
    pub fn new(platform: Platform, native_id: impl Into<String>) -> Self {
        Self {
            platform,
            native_id: native_id.into(),
        }
    }

    /// Canonical page URL handed to the extraction tools
    pub fn canonical_url(&self) -> String {
        match self.platform {
            Platform::YouTube => youtube::watch_url(&self.native_id),
        }
    }
}

impl fmt::Display for VideoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.native_id)
    }
}

/// Metadata of a video, as extracted from its platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub native_id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub channel_name: String,
    pub duration_seconds: u64,
    pub thumbnail_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("No video id found in URL: {0}")]
    MissingVideoId(String),
}

/// Map a video page URL to the platform and the platform's own video id.
///
/// Scheme-less input such as `youtu.be/abc` is read as https.
pub fn resolve_video_url(input: &str) -> Result<VideoIdentity, ResolveError> {
    let url = parse_url(input)?;
    let host = url.host_str().unwrap_or_default();

    let platform = Platform::from_host(host)
        .ok_or_else(|| ResolveError::UnsupportedPlatform(host.to_string()))?;

    let native_id = match platform {
        Platform::YouTube => youtube::video_id(&url),
    }
    .ok_or_else(|| ResolveError::MissingVideoId(input.to_string()))?;

    tracing::debug!("Resolved {} to {}:{}", input, platform, native_id);

    Ok(VideoIdentity { platform, native_id })
}

fn parse_url(input: &str) -> Result<Url, ResolveError> {
    let trimmed = input.trim();
    let parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", trimmed))
            .map_err(|_| ResolveError::InvalidUrl(input.to_string()))?,
        Err(_) => return Err(ResolveError::InvalidUrl(input.to_string())),
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ResolveError::InvalidUrl(input.to_string()));
    }

    Ok(parsed)
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    /// The tool ran and reported the video as missing, private or unreachable
    #[error("Video unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to run {tool}")]
    Tool {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected extractor output: {0}")]
    Malformed(String),

    #[error("Transcript download failed")]
    Http(#[from] reqwest::Error),
}

/// Blocking metadata/audio extraction. Only [`crate::retrieval`] calls this, through the bridge.
#[cfg_attr(test, mockall::automock)]
pub trait VideoExtractor: Send + Sync {
    fn extract_info(&self, url: &str) -> Result<VideoInfo, ExtractorError>;

    /// Download the best audio stream of the video
    fn download_audio(&self, url: &str) -> Result<Audio, ExtractorError>;
}

/// A subtitle track published for a video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptTrack {
    pub language_code: String,

    /// Auto-generated captions rather than uploader-provided subtitles
    pub generated: bool,

    pub format: SubtitleFormat,

    pub url: String,
}

/// Blocking access to platform subtitle tracks
#[cfg_attr(test, mockall::automock)]
pub trait TranscriptSource: Send + Sync {
    fn list_transcripts(&self, native_id: &str) -> Result<Vec<TranscriptTrack>, ExtractorError>;

    /// Download the track body, formatted as `track.format`
    fn fetch_transcript(&self, track: &TranscriptTrack) -> Result<String, ExtractorError>;
}
