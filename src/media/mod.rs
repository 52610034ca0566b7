use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod transcoder;

pub use transcoder::{AudioTranscoder, FfmpegTranscoder, TranscodeError};

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Aac,
    /// AAC in an MP4 (ISO BMFF) container
    M4a,
    Mp3,
    Ogg,
    Wav,
    Flac,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Aac => "aac",
            AudioFormat::M4a => "m4a",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }

    /// Name of the ffmpeg muxer producing this format
    pub fn ffmpeg_muxer(&self) -> &'static str {
        match self {
            // raw AAC goes out as an ADTS stream
            AudioFormat::Aac => "adts",
            AudioFormat::M4a => "ipod",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subtitle formats produced by transcription and transcript fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
}

impl SubtitleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Languages the system can request or confirm (ISO 639-1).
///
/// Declaration order is the preference order used when picking a
/// transcript without an explicit language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "ko")]
    Korean,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::English, Language::Japanese, Language::Korean];

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Japanese => "ja",
            Language::Korean => "ko",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported language: {0} (expected one of en, ja, ko)")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_code(s).ok_or_else(|| UnsupportedLanguage(s.to_string()))
    }
}

/// Encoded audio together with the format it is encoded in.
///
/// Fields are private so the tag can only change together with the bytes:
/// anything that re-encodes audio has to build a new value.
#[derive(Clone, PartialEq, Eq)]
pub struct Audio {
    binary: Vec<u8>,
    format: AudioFormat,
}

impl Audio {
    pub fn new(binary: Vec<u8>, format: AudioFormat) -> Self {
        Self { binary, format }
    }

    pub fn binary(&self) -> &[u8] {
        &self.binary
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.binary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binary.is_empty()
    }

    pub fn into_binary(self) -> Vec<u8> {
        self.binary
    }
}

impl fmt::Debug for Audio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Audio")
            .field("format", &self.format)
            .field("bytes", &self.binary.len())
            .finish()
    }
}

/// Subtitle-formatted text produced from a video or an audio track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    /// Subtitle body, already formatted as `format`
    pub content: String,

    pub format: SubtitleFormat,

    /// `None` when the backend could not confirm a supported language
    pub language: Option<Language>,
}
