//! Document store module
//!
//! One collection per entity. Every operation here touches a single document
//! atomically (or runs a single bulk statement); nothing spans documents, so
//! cross-document invariants are the repository's job.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{
    ChildKind, Exhibition, ExhibitionPatch, ExhibitionStatus, ObjectId, Room, RoomContent,
    Section, SectionContent,
};
use crate::query::ExhibitionQuery;

pub use memory::{MemoryComments, MemoryExhibitions, MemoryRooms, MemorySections, MemoryStore};
pub use postgres::{PgComments, PgExhibitions, PgRooms, PgSections};

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document could not be decoded
    #[error("Corrupt document {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn corrupt(id: impl ToString, reason: impl ToString) -> Self {
        Self::Corrupt {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Outcome of a single-document update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateResult {
    /// Documents selected by the id filter
    pub matched: u64,
    /// Documents actually changed
    pub modified: u64,
}

impl UpdateResult {
    pub fn new(matched: u64, modified: u64) -> Self {
        Self { matched, modified }
    }

    pub fn found(&self) -> bool {
        self.matched > 0
    }

    pub fn changed(&self) -> bool {
        self.modified > 0
    }
}

/// Exhibition root collection
#[async_trait]
pub trait ExhibitionCollection: Send + Sync {
    async fn insert(&self, exhibition: &Exhibition) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Exhibition>, StoreError>;

    async fn find(&self, query: &ExhibitionQuery) -> Result<Vec<Exhibition>, StoreError>;

    /// Set the fields present in the patch
    async fn update_fields(
        &self,
        id: ObjectId,
        patch: &ExhibitionPatch,
    ) -> Result<UpdateResult, StoreError>;

    async fn delete_by_id(&self, id: ObjectId) -> Result<u64, StoreError>;

    /// Add `user_id` to the like set and bump the counter, only if absent
    async fn add_like(&self, id: ObjectId, user_id: &str) -> Result<UpdateResult, StoreError>;

    /// Remove `user_id` from the like set and lower the counter, only if present
    async fn remove_like(&self, id: ObjectId, user_id: &str)
        -> Result<UpdateResult, StoreError>;

    async fn increment_visits(&self, id: ObjectId) -> Result<UpdateResult, StoreError>;

    async fn set_status(
        &self,
        id: ObjectId,
        status: ExhibitionStatus,
    ) -> Result<UpdateResult, StoreError>;

    /// Append a child id to the end of its ordered list
    async fn push_child(
        &self,
        id: ObjectId,
        kind: ChildKind,
        child_id: ObjectId,
    ) -> Result<UpdateResult, StoreError>;

    /// Remove every occurrence of a child id from its ordered list
    async fn pull_child(
        &self,
        id: ObjectId,
        kind: ChildKind,
        child_id: ObjectId,
    ) -> Result<UpdateResult, StoreError>;

    /// Set `isPublic = false` on every public exhibition whose `endDate` is
    /// before `now`; returns the number of documents modified
    async fn hide_ended(&self, now: &str) -> Result<u64, StoreError>;
}

/// Section collection
#[async_trait]
pub trait SectionCollection: Send + Sync {
    async fn insert(&self, section: &Section) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Section>, StoreError>;

    async fn find_all(&self) -> Result<Vec<Section>, StoreError>;

    async fn find_by_exhibition(&self, exhibition_id: ObjectId)
        -> Result<Vec<Section>, StoreError>;

    async fn replace_content(
        &self,
        id: ObjectId,
        content: &SectionContent,
    ) -> Result<UpdateResult, StoreError>;

    async fn delete_by_id(&self, id: ObjectId) -> Result<u64, StoreError>;
}

/// Room collection
#[async_trait]
pub trait RoomCollection: Send + Sync {
    async fn insert(&self, room: &Room) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Room>, StoreError>;

    async fn find_all(&self) -> Result<Vec<Room>, StoreError>;

    async fn find_by_exhibition(&self, exhibition_id: ObjectId) -> Result<Vec<Room>, StoreError>;

    async fn replace_content(
        &self,
        id: ObjectId,
        content: &RoomContent,
    ) -> Result<UpdateResult, StoreError>;

    async fn delete_by_id(&self, id: ObjectId) -> Result<u64, StoreError>;
}

/// External comment collection; only the exhibition link matters here
#[async_trait]
pub trait CommentCollection: Send + Sync {
    async fn count_by_exhibition(&self, exhibition_id: ObjectId) -> Result<u64, StoreError>;

    async fn delete_by_exhibition(&self, exhibition_id: ObjectId) -> Result<u64, StoreError>;
}

/// The four collections an aggregate repository works against
#[derive(Clone)]
pub struct Collections {
    pub exhibitions: Arc<dyn ExhibitionCollection>,
    pub sections: Arc<dyn SectionCollection>,
    pub rooms: Arc<dyn RoomCollection>,
    pub comments: Arc<dyn CommentCollection>,
}

impl Collections {
    /// PostgreSQL collections; comments live behind their own pool
    pub fn postgres(pool: PgPool, comment_pool: PgPool) -> Self {
        Self {
            exhibitions: Arc::new(PgExhibitions::new(pool.clone())),
            sections: Arc::new(PgSections::new(pool.clone())),
            rooms: Arc::new(PgRooms::new(pool)),
            comments: Arc::new(PgComments::new(comment_pool)),
        }
    }
}

impl From<&MemoryStore> for Collections {
    fn from(store: &MemoryStore) -> Self {
        Self {
            exhibitions: Arc::new(store.exhibitions.clone()),
            sections: Arc::new(store.sections.clone()),
            rooms: Arc::new(store.rooms.clone()),
            comments: Arc::new(store.comments.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_result_flags() {
        let untouched = UpdateResult::new(1, 0);
        assert!(untouched.found());
        assert!(!untouched.changed());

        assert!(!UpdateResult::default().found());
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::corrupt("abc", "bad status");
        assert_eq!(err.to_string(), "Corrupt document abc: bad status");
    }
}
