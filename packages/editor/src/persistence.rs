//! Asset registry contract and an in-memory implementation.
//!
//! Every write is guarded by an optimistic-concurrency token: the caller
//! forwards the `updated_at` it last saw, and the registry refuses the write
//! if the stored copy has moved on since.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use screenkit_model::ScreenDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;

/// Which stored asset a session edits, and the version it last synced with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetContext {
    /// `None` until the first save creates the asset
    pub asset_id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AssetContext {
    pub fn new(asset_id: impl Into<String>, updated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            asset_id: Some(asset_id.into()),
            updated_at,
        }
    }

    pub fn unsaved() -> Self {
        Self::default()
    }

    /// Track the asset and token of a stored copy
    pub(crate) fn adopt(&mut self, stored: &StoredDocument) {
        self.asset_id = Some(stored.asset_id.clone());
        self.updated_at = Some(stored.updated_at);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub asset_id: String,
    pub snapshot: ScreenDocument,
    pub updated_at: DateTime<Utc>,
    pub version: u32,
    pub published_version: Option<u32>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Asset was modified since {}", .current.updated_at)]
    VersionConflict { current: Box<StoredDocument> },

    #[error("Asset {asset_id} has no version {version}")]
    VersionNotFound { asset_id: String, version: u32 },

    #[error("Registry error: {0}")]
    Backend(String),
}

/// Storage for screen documents
#[async_trait]
pub trait AssetRegistry: Send + Sync {
    async fn get_document(&self, asset_id: &str) -> Result<StoredDocument, PersistenceError>;

    async fn create_document(&self, snapshot: &ScreenDocument) -> Result<StoredDocument, PersistenceError>;

    /// Replace the stored snapshot if `expected_updated_at` still matches
    async fn put_document(
        &self,
        asset_id: &str,
        snapshot: &ScreenDocument,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<StoredDocument, PersistenceError>;

    async fn publish(&self, asset_id: &str) -> Result<StoredDocument, PersistenceError>;

    async fn unpublish(&self, asset_id: &str) -> Result<StoredDocument, PersistenceError>;

    /// Restore an earlier version as a new version
    async fn rollback(&self, asset_id: &str, version: u32) -> Result<StoredDocument, PersistenceError>;
}

#[derive(Debug)]
struct AssetRecord {
    current: StoredDocument,

    /// Snapshot of every version, `versions[n - 1]` is version `n`
    versions: Vec<ScreenDocument>,
}

impl AssetRecord {
    fn push_version(&mut self, snapshot: ScreenDocument) -> StoredDocument {
        self.versions.push(snapshot.clone());
        self.current.snapshot = snapshot;
        self.current.version = self.versions.len() as u32;
        self.current.updated_at = next_timestamp(Some(self.current.updated_at));
        self.current.clone()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    assets: HashMap<String, AssetRecord>,
    next_id: u64,
}

/// In-process registry with version history
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    state: Mutex<MemoryState>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an asset under a chosen id
    pub async fn insert(&self, asset_id: impl Into<String>, snapshot: ScreenDocument) -> StoredDocument {
        let asset_id = asset_id.into();
        let stored = StoredDocument {
            asset_id: asset_id.clone(),
            snapshot: snapshot.clone(),
            updated_at: next_timestamp(None),
            version: 1,
            published_version: None,
        };
        let record = AssetRecord {
            current: stored.clone(),
            versions: vec![snapshot],
        };
        self.state.lock().await.assets.insert(asset_id, record);
        stored
    }

    /// Write as another client would, without a concurrency check
    pub async fn update_remote(
        &self,
        asset_id: &str,
        snapshot: ScreenDocument,
    ) -> Result<StoredDocument, PersistenceError> {
        let mut state = self.state.lock().await;
        let record = state
            .assets
            .get_mut(asset_id)
            .ok_or_else(|| PersistenceError::NotFound(asset_id.to_string()))?;
        Ok(record.push_version(snapshot))
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.assets.len()
    }
}

#[async_trait]
impl AssetRegistry for MemoryRegistry {
    async fn get_document(&self, asset_id: &str) -> Result<StoredDocument, PersistenceError> {
        let state = self.state.lock().await;
        state
            .assets
            .get(asset_id)
            .map(|record| record.current.clone())
            .ok_or_else(|| PersistenceError::NotFound(asset_id.to_string()))
    }

    async fn create_document(&self, snapshot: &ScreenDocument) -> Result<StoredDocument, PersistenceError> {
        let asset_id = {
            let mut state = self.state.lock().await;
            state.next_id += 1;
            format!("asset_{}", state.next_id)
        };
        Ok(self.insert(asset_id, snapshot.clone()).await)
    }

    async fn put_document(
        &self,
        asset_id: &str,
        snapshot: &ScreenDocument,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<StoredDocument, PersistenceError> {
        let mut state = self.state.lock().await;
        let record = state
            .assets
            .get_mut(asset_id)
            .ok_or_else(|| PersistenceError::NotFound(asset_id.to_string()))?;

        if expected_updated_at != Some(record.current.updated_at) {
            return Err(PersistenceError::VersionConflict {
                current: Box::new(record.current.clone()),
            });
        }
        Ok(record.push_version(snapshot.clone()))
    }

    async fn publish(&self, asset_id: &str) -> Result<StoredDocument, PersistenceError> {
        let mut state = self.state.lock().await;
        let record = state
            .assets
            .get_mut(asset_id)
            .ok_or_else(|| PersistenceError::NotFound(asset_id.to_string()))?;
        record.current.published_version = Some(record.current.version);
        Ok(record.current.clone())
    }

    async fn unpublish(&self, asset_id: &str) -> Result<StoredDocument, PersistenceError> {
        let mut state = self.state.lock().await;
        let record = state
            .assets
            .get_mut(asset_id)
            .ok_or_else(|| PersistenceError::NotFound(asset_id.to_string()))?;
        record.current.published_version = None;
        Ok(record.current.clone())
    }

    async fn rollback(&self, asset_id: &str, version: u32) -> Result<StoredDocument, PersistenceError> {
        let mut state = self.state.lock().await;
        let record = state
            .assets
            .get_mut(asset_id)
            .ok_or_else(|| PersistenceError::NotFound(asset_id.to_string()))?;

        let snapshot = version
            .checked_sub(1)
            .and_then(|index| record.versions.get(index as usize))
            .cloned()
            .ok_or_else(|| PersistenceError::VersionNotFound {
                asset_id: asset_id.to_string(),
                version,
            })?;
        Ok(record.push_version(snapshot))
    }
}

/// Now, or just after `previous` when the clock has not moved past it
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(previous) if now <= previous => previous + Duration::milliseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_requires_matching_token() {
        let registry = MemoryRegistry::new();
        let stored = registry
            .insert("home", ScreenDocument::new("home", "Home"))
            .await;

        let mut next = stored.snapshot.clone();
        next.display_name = "Start".to_string();

        let saved = registry
            .put_document("home", &next, Some(stored.updated_at))
            .await
            .unwrap();
        assert_eq!(saved.version, 2);
        assert!(saved.updated_at > stored.updated_at);

        let stale = registry
            .put_document("home", &next, Some(stored.updated_at))
            .await;
        match stale {
            Err(PersistenceError::VersionConflict { current }) => assert_eq!(current.version, 2),
            other => panic!("expected conflict, got {:?}", other),
        }

        let missing_token = registry.put_document("home", &next, None).await;
        assert!(matches!(missing_token, Err(PersistenceError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn test_rollback_creates_new_version() {
        let registry = MemoryRegistry::new();
        let first = registry
            .insert("home", ScreenDocument::new("home", "Home"))
            .await;
        let mut changed = first.snapshot.clone();
        changed.display_name = "Changed".to_string();
        registry.update_remote("home", changed).await.unwrap();

        let restored = registry.rollback("home", 1).await.unwrap();
        assert_eq!(restored.version, 3);
        assert_eq!(restored.snapshot.display_name, "Home");

        assert!(matches!(
            registry.rollback("home", 0).await,
            Err(PersistenceError::VersionNotFound { .. })
        ));
        assert!(matches!(
            registry.rollback("home", 9).await,
            Err(PersistenceError::VersionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_publish_tracks_version() {
        let registry = MemoryRegistry::new();
        let created = registry
            .create_document(&ScreenDocument::new("home", "Home"))
            .await
            .unwrap();
        assert_eq!(created.asset_id, "asset_1");

        let published = registry.publish(&created.asset_id).await.unwrap();
        assert_eq!(published.published_version, Some(1));
        assert_eq!(published.updated_at, created.updated_at);

        let unpublished = registry.unpublish(&created.asset_id).await.unwrap();
        assert_eq!(unpublished.published_version, None);

        assert!(matches!(
            registry.publish("nope").await,
            Err(PersistenceError::NotFound(_))
        ));
    }
}
