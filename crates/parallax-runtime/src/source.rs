//! Level data and where it comes from
//!
//! A [`LevelSource`] turns a [`LevelKey`] into the [`LevelData`] of that
//! level instance. Loads are idempotent, so results may be cached by key.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parallax_core::{EntityId, EntityRef, LevelKey, SourceError};
use parallax_visual::CameraPose;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

/// One selectable entity inside a level
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub name: String,
    /// Text revealed when the entity is selected
    pub description: String,
    /// Camera pose used when flying toward the entity
    pub approach_pose: CameraPose,
}

impl EntityRecord {
    pub fn new(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        description: impl Into<String>,
        approach_pose: CameraPose,
    ) -> Self {
        EntityRecord {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            approach_pose,
        }
    }
}

/// Immutable snapshot of one level instance's content
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub key: LevelKey,
    /// Camera pose framing the whole level
    pub home_pose: CameraPose,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

impl LevelData {
    pub fn new(key: LevelKey, home_pose: CameraPose) -> Self {
        LevelData {
            key,
            home_pose,
            entities: Vec::new(),
        }
    }

    pub fn with_entity(mut self, record: EntityRecord) -> Self {
        self.entities.push(record);
        self
    }

    pub fn entity(&self, id: &EntityId) -> Option<&EntityRecord> {
        self.entities.iter().find(|e| &e.id == id)
    }

    /// Record for `target`, or `UnknownEntity`
    pub fn resolve(&self, target: &EntityRef) -> Result<&EntityRecord, SourceError> {
        self.entity(&target.id).ok_or_else(|| SourceError::UnknownEntity {
            level: self.key.clone(),
            entity: target.id.clone(),
        })
    }

    /// Parse a level document
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        serde_json::from_str(json).map_err(|e| SourceError::Invalid(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, SourceError> {
        serde_json::to_string(self).map_err(|e| SourceError::Invalid(e.to_string()))
    }
}

/// Supplier of level data
#[async_trait]
pub trait LevelSource: Send + Sync {
    async fn load_level(&self, key: &LevelKey) -> Result<LevelData, SourceError>;
}

#[async_trait]
impl<S: LevelSource + ?Sized> LevelSource for Arc<S> {
    async fn load_level(&self, key: &LevelKey) -> Result<LevelData, SourceError> {
        (**self).load_level(key).await
    }
}

/// In-memory level source
#[derive(Debug, Default)]
pub struct StaticLevelSource {
    levels: RwLock<HashMap<LevelKey, LevelData>>,
}

impl StaticLevelSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(self, data: LevelData) -> Self {
        self.insert(data);
        self
    }

    /// Add or replace a level, keyed by its own key
    pub fn insert(&self, data: LevelData) {
        self.levels.write().insert(data.key.clone(), data);
    }

    pub fn remove(&self, key: &LevelKey) -> Option<LevelData> {
        self.levels.write().remove(key)
    }

    pub fn len(&self) -> usize {
        self.levels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.read().is_empty()
    }
}

#[async_trait]
impl LevelSource for StaticLevelSource {
    async fn load_level(&self, key: &LevelKey) -> Result<LevelData, SourceError> {
        self.levels
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(key.clone()))
    }
}

/// Caching wrapper around another source.
///
/// Each key is loaded at most once at a time: concurrent requests for the
/// same key share one load. Failed loads are not cached.
pub struct CachedLevelSource<S> {
    inner: S,
    cells: Mutex<HashMap<LevelKey, Arc<OnceCell<Arc<LevelData>>>>>,
}

impl<S: LevelSource> CachedLevelSource<S> {
    pub fn new(inner: S) -> Self {
        CachedLevelSource {
            inner,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Load through the cache, sharing the cached snapshot
    pub async fn load_shared(&self, key: &LevelKey) -> Result<Arc<LevelData>, SourceError> {
        let cell = self.cells.lock().entry(key.clone()).or_default().clone();
        let data = cell
            .get_or_try_init(|| async {
                tracing::debug!(level = %key, "level cache miss");
                self.inner.load_level(key).await.map(Arc::new)
            })
            .await?;
        Ok(data.clone())
    }

    pub fn is_cached(&self, key: &LevelKey) -> bool {
        self.cells
            .lock()
            .get(key)
            .map_or(false, |cell| cell.initialized())
    }

    /// Forget `key`; the next load goes to the inner source
    pub fn invalidate(&self, key: &LevelKey) {
        self.cells.lock().remove(key);
    }

    pub fn clear(&self) {
        self.cells.lock().clear();
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: LevelSource> LevelSource for CachedLevelSource<S> {
    async fn load_level(&self, key: &LevelKey) -> Result<LevelData, SourceError> {
        self.load_shared(key).await.map(|data| (*data).clone())
    }
}

impl<S> std::fmt::Debug for CachedLevelSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedLevelSource")
            .field("keys", &self.cells.lock().len())
            .finish()
    }
}
