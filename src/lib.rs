//! vidscribe - video ingestion, subtitle retrieval and speech-to-text transcription
//!
//! Videos are identified by platform and native id, ingested once into a
//! repository, and transcribed either from platform subtitles or by running
//! their audio through remote background-removal and speech-to-text providers.
//! Blocking extraction tools are only ever called through [`bridge::BlockingBridge`].

pub mod app;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod ingest;
pub mod media;
pub mod output;
pub mod retrieval;
pub mod stt;
pub mod utils;

pub use app::App;
pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractors::{resolve_video_url, Platform, VideoIdentity, VideoInfo};
pub use ingest::{VideoIngestionService, VideoRecord};
pub use media::{Audio, AudioFormat, Language, SubtitleFormat, Transcription};
pub use stt::TranscribePipeline;

use extractors::ResolveError;
use ingest::IngestError;
use media::TranscodeError;
use retrieval::RetrievalError;
use stt::{ProviderConfigError, SttError};

/// Opaque cause carried by "unknown" errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// How an [`Error`] should be reported to whoever asked for the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input can never succeed as given
    BadRequest,
    NotFound,
    Internal,
}

/// Errors surfaced to callers of the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("No transcript in a supported language for video {0}")]
    TranscriptNotFound(String),

    #[error("Audio conversion failed: {0}")]
    Transcode(#[source] TranscodeError),

    #[error("Remote inference failed: {0}")]
    RemoteInference(#[source] SttError),

    #[error("Invalid provider configuration: {0}")]
    Config(#[from] ProviderConfigError),

    #[error("Unknown error: {0}")]
    Unknown(#[source] BoxError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Resolve(_) => ErrorKind::BadRequest,
            Error::VideoNotFound(_) | Error::TranscriptNotFound(_) => ErrorKind::NotFound,
            Error::Transcode(_)
            | Error::RemoteInference(_)
            | Error::Config(_)
            | Error::Unknown(_) => ErrorKind::Internal,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::BadRequest => 2,
            ErrorKind::NotFound => 3,
            ErrorKind::Internal => 1,
        }
    }
}

impl From<RetrievalError> for Error {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Resolve(e) => Error::Resolve(e),
            RetrievalError::VideoNotFound(reason) => Error::VideoNotFound(reason),
            RetrievalError::TranscriptNotFound(id) => Error::TranscriptNotFound(id),
            RetrievalError::Unknown(source) => Error::Unknown(source),
            other @ RetrievalError::Bridge(_) => Error::Unknown(Box::new(other)),
        }
    }
}

impl From<IngestError> for Error {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Resolve(e) => Error::Resolve(e),
            IngestError::VideoNotFound(identity) => Error::VideoNotFound(identity.to_string()),
            IngestError::Unknown(source) => Error::Unknown(source),
        }
    }
}

impl From<SttError> for Error {
    fn from(err: SttError) -> Self {
        match err {
            SttError::Transcode(e) => Error::Transcode(e),
            other => Error::RemoteInference(other),
        }
    }
}

/// Result type used throughout the library
pub type Result<T, E = Error> = std::result::Result<T, E>;
