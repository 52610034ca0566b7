//! Idempotent video ingestion.
//!
//! `ingest(url)` walks Resolve -> Lookup -> Extract -> Save, in that order.
//! A record that already exists short-circuits before extraction; a save
//! that loses a race against a concurrent ingestion of the same video falls
//! back to the stored record. Uniqueness is enforced by the repository, not
//! by locks here, so several processes can ingest against one store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod memory;

pub use memory::InMemoryVideoRepository;

use crate::extractors::{resolve_video_url, ResolveError, VideoIdentity, VideoInfo};
use crate::retrieval::{RetrievalError, VideoRetrievalClient};
use crate::BoxError;

/// A stored video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub instance_id: u64,
    pub identity: VideoIdentity,
    pub info: VideoInfo,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("A video with this identity already exists")]
    UniqueViolation,

    #[error("Storage error: {0}")]
    Storage(#[source] BoxError),
}

/// Persistence for ingested videos
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn find_by_identity(
        &self,
        identity: &VideoIdentity,
    ) -> Result<Option<VideoRecord>, RepositoryError>;

    /// Store a new video. Fails with [`RepositoryError::UniqueViolation`] if `identity` is taken.
    async fn create(
        &self,
        identity: &VideoIdentity,
        info: &VideoInfo,
    ) -> Result<VideoRecord, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Video not found: {0}")]
    VideoNotFound(VideoIdentity),

    #[error("Unknown ingestion error: {0}")]
    Unknown(#[source] BoxError),
}

impl From<RepositoryError> for IngestError {
    fn from(err: RepositoryError) -> Self {
        IngestError::Unknown(Box::new(err))
    }
}

pub struct VideoIngestionService {
    repository: Arc<dyn VideoRepository>,
    retrieval: Arc<VideoRetrievalClient>,
}

impl VideoIngestionService {
    pub fn new(repository: Arc<dyn VideoRepository>, retrieval: Arc<VideoRetrievalClient>) -> Self {
        Self { repository, retrieval }
    }

    /// Ingest the video behind `url`, or return it if it was ingested before
    pub async fn ingest(&self, url: &str) -> Result<VideoRecord, IngestError> {
        let identity = resolve_video_url(url)?;

        if let Some(existing) = self.repository.find_by_identity(&identity).await? {
            tracing::debug!("{} already ingested as #{}", identity, existing.instance_id);
            return Ok(existing);
        }

        tracing::info!("Extracting metadata for {}", identity);
        let info = match self.retrieval.fetch_metadata(&identity.canonical_url()).await {
            Ok(info) => info,
            Err(RetrievalError::VideoNotFound(reason)) => {
                tracing::debug!("Extraction reported {} unavailable: {}", identity, reason);
                return Err(IngestError::VideoNotFound(identity));
            }
            Err(e) => return Err(IngestError::Unknown(Box::new(e))),
        };

        match self.repository.create(&identity, &info).await {
            Ok(record) => {
                tracing::info!("Saved {} as #{}", identity, record.instance_id);
                Ok(record)
            }
            Err(RepositoryError::UniqueViolation) => {
                tracing::warn!("{} was saved concurrently, returning stored record", identity);
                self.repository.find_by_identity(&identity).await?.ok_or_else(|| {
                    let message =
                        format!("{} reported as duplicate but could not be read back", identity);
                    IngestError::Unknown(message.into())
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
