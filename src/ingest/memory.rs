use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{RepositoryError, VideoRecord, VideoRepository};
use crate::extractors::{VideoIdentity, VideoInfo};

/// Process-local repository with the same uniqueness rule as a real store
#[derive(Default)]
pub struct InMemoryVideoRepository {
    inner: RwLock<Store>,
}

#[derive(Default)]
struct Store {
    next_id: u64,
    records: HashMap<VideoIdentity, VideoRecord>,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All records, oldest first
    pub async fn list(&self) -> Vec<VideoRecord> {
        let store = self.inner.read().await;
        let mut records: Vec<_> = store.records.values().cloned().collect();
        records.sort_by_key(|record| record.instance_id);
        records
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn find_by_identity(
        &self,
        identity: &VideoIdentity,
    ) -> Result<Option<VideoRecord>, RepositoryError> {
        Ok(self.inner.read().await.records.get(identity).cloned())
    }

    async fn create(
        &self,
        identity: &VideoIdentity,
        info: &VideoInfo,
    ) -> Result<VideoRecord, RepositoryError> {
        let mut store = self.inner.write().await;
        if store.records.contains_key(identity) {
            return Err(RepositoryError::UniqueViolation);
        }

        store.next_id += 1;
        let record = VideoRecord {
            instance_id: store.next_id,
            identity: identity.clone(),
            info: info.clone(),
            created_at: Utc::now(),
        };
        store.records.insert(identity.clone(), record.clone());

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::Platform;

    fn info(native_id: &str) -> VideoInfo {
        VideoInfo {
            native_id: native_id.to_string(),
            title: format!("Video {}", native_id),
            description: String::new(),
            channel_id: String::new(),
            channel_name: String::new(),
            duration_seconds: 0,
            thumbnail_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let repository = InMemoryVideoRepository::new();
        let a = VideoIdentity::new(Platform::YouTube, "a");
        let b = VideoIdentity::new(Platform::YouTube, "b");

        let first = repository.create(&a, &info("a")).await.unwrap();
        let second = repository.create(&b, &info("b")).await.unwrap();

        assert_eq!(first.instance_id, 1);
        assert_eq!(second.instance_id, 2);
        assert_eq!(repository.list().await, vec![first, second]);
    }

    #[tokio::test]
    async fn test_duplicate_identity_is_rejected() {
        let repository = InMemoryVideoRepository::new();
        let identity = VideoIdentity::new(Platform::YouTube, "dup");

        repository.create(&identity, &info("dup")).await.unwrap();
        let err = repository.create(&identity, &info("dup")).await.unwrap_err();

        assert!(matches!(err, RepositoryError::UniqueViolation));
        assert_eq!(repository.len().await, 1);
    }

    #[tokio::test]
    async fn test_find_by_identity() {
        let repository = InMemoryVideoRepository::new();
        let identity = VideoIdentity::new(Platform::YouTube, "x");

        assert!(repository.find_by_identity(&identity).await.unwrap().is_none());
        let created = repository.create(&identity, &info("x")).await.unwrap();
        assert_eq!(repository.find_by_identity(&identity).await.unwrap(), Some(created));
    }
}
