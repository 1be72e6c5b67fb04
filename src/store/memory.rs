//! In-memory collections
//!
//! Vec-backed collections with the same single-document semantics as the
//! PostgreSQL store. Documents keep their physical insertion order, which is
//! deliberately unrelated to any reference order on the root document.
//! Each operation holds the lock only for its own duration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::{
    ChildKind, Exhibition, ExhibitionPatch, ExhibitionStatus, ObjectId, Room, RoomContent,
    Section, SectionContent,
};
use crate::query::ExhibitionQuery;

use super::{
    CommentCollection, ExhibitionCollection, RoomCollection, SectionCollection, StoreError,
    UpdateResult,
};

/// Shared Vec guarded by a lock
#[derive(Debug)]
struct Documents<T> {
    docs: Arc<RwLock<Vec<T>>>,
    fail_deletes: Arc<AtomicBool>,
}

impl<T> Clone for Documents<T> {
    fn clone(&self) -> Self {
        Self {
            docs: Arc::clone(&self.docs),
            fail_deletes: Arc::clone(&self.fail_deletes),
        }
    }
}

impl<T> Default for Documents<T> {
    fn default() -> Self {
        Self {
            docs: Arc::new(RwLock::new(Vec::new())),
            fail_deletes: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<T> Documents<T> {
    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<T>>, StoreError> {
        self.docs.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<T>>, StoreError> {
        self.docs.write().map_err(|_| StoreError::Poisoned)
    }

    fn check_deletes(&self) -> Result<(), StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("deletes are failing".to_string()));
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }
}

// =========================================================================
// Exhibitions
// =========================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryExhibitions {
    inner: Documents<Exhibition>,
}

impl MemoryExhibitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` on the document with `id`; `f` reports whether it changed it
    fn modify<F>(&self, id: ObjectId, f: F) -> Result<UpdateResult, StoreError>
    where
        F: FnOnce(&mut Exhibition) -> bool,
    {
        let mut docs = self.inner.write()?;
        match docs.iter_mut().find(|e| e.id == id) {
            Some(doc) => {
                let changed = f(doc);
                Ok(UpdateResult::new(1, u64::from(changed)))
            }
            None => Ok(UpdateResult::default()),
        }
    }
}

fn child_list(exhibition: &mut Exhibition, kind: ChildKind) -> &mut Vec<ObjectId> {
    match kind {
        ChildKind::Section => &mut exhibition.section_ids,
        ChildKind::Room => &mut exhibition.room_ids,
    }
}

#[async_trait]
impl ExhibitionCollection for MemoryExhibitions {
    async fn insert(&self, exhibition: &Exhibition) -> Result<(), StoreError> {
        let mut docs = self.inner.write()?;
        if docs.iter().any(|e| e.id == exhibition.id) {
            return Err(StoreError::Unavailable(format!(
                "duplicate key {}",
                exhibition.id
            )));
        }
        docs.push(exhibition.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Exhibition>, StoreError> {
        Ok(self.inner.read()?.iter().find(|e| e.id == id).cloned())
    }

    async fn find(&self, query: &ExhibitionQuery) -> Result<Vec<Exhibition>, StoreError> {
        Ok(query.apply(self.inner.read()?.iter()))
    }

    async fn update_fields(
        &self,
        id: ObjectId,
        patch: &ExhibitionPatch,
    ) -> Result<UpdateResult, StoreError> {
        self.modify(id, |doc| {
            let before = doc.clone();
            doc.apply_patch(patch);
            *doc != before
        })
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<u64, StoreError> {
        self.inner.check_deletes()?;
        let mut docs = self.inner.write()?;
        let before = docs.len();
        docs.retain(|e| e.id != id);
        Ok((before - docs.len()) as u64)
    }

    async fn add_like(&self, id: ObjectId, user_id: &str) -> Result<UpdateResult, StoreError> {
        self.modify(id, |doc| {
            if doc.like_list.insert(user_id.to_string()) {
                doc.like_count += 1;
                true
            } else {
                false
            }
        })
    }

    async fn remove_like(
        &self,
        id: ObjectId,
        user_id: &str,
    ) -> Result<UpdateResult, StoreError> {
        self.modify(id, |doc| {
            if doc.like_list.remove(user_id) {
                doc.like_count = (doc.like_count - 1).max(0);
                true
            } else {
                false
            }
        })
    }

    async fn increment_visits(&self, id: ObjectId) -> Result<UpdateResult, StoreError> {
        self.modify(id, |doc| {
            doc.visited_number += 1;
            true
        })
    }

    async fn set_status(
        &self,
        id: ObjectId,
        status: ExhibitionStatus,
    ) -> Result<UpdateResult, StoreError> {
        self.modify(id, |doc| {
            let changed = doc.status != status;
            doc.status = status;
            changed
        })
    }

    async fn push_child(
        &self,
        id: ObjectId,
        kind: ChildKind,
        child_id: ObjectId,
    ) -> Result<UpdateResult, StoreError> {
        self.modify(id, |doc| {
            child_list(doc, kind).push(child_id);
            true
        })
    }

    async fn pull_child(
        &self,
        id: ObjectId,
        kind: ChildKind,
        child_id: ObjectId,
    ) -> Result<UpdateResult, StoreError> {
        self.modify(id, |doc| {
            let list = child_list(doc, kind);
            let before = list.len();
            list.retain(|c| *c != child_id);
            list.len() != before
        })
    }

    async fn hide_ended(&self, now: &str) -> Result<u64, StoreError> {
        let mut docs = self.inner.write()?;
        let mut modified = 0;
        for doc in docs.iter_mut() {
            if doc.is_public && !doc.end_date.is_empty() && doc.end_date.as_str() < now {
                doc.is_public = false;
                modified += 1;
            }
        }
        Ok(modified)
    }
}

// =========================================================================
// Sections
// =========================================================================

#[derive(Debug, Clone, Default)]
pub struct MemorySections {
    inner: Documents<Section>,
}

impl MemorySections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent delete fail until switched off again
    pub fn fail_deletes(&self, fail: bool) {
        self.inner.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SectionCollection for MemorySections {
    async fn insert(&self, section: &Section) -> Result<(), StoreError> {
        self.inner.write()?.push(section.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Section>, StoreError> {
        Ok(self.inner.read()?.iter().find(|s| s.id == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Section>, StoreError> {
        Ok(self.inner.read()?.clone())
    }

    async fn find_by_exhibition(
        &self,
        exhibition_id: ObjectId,
    ) -> Result<Vec<Section>, StoreError> {
        Ok(self
            .inner
            .read()?
            .iter()
            .filter(|s| s.exhibition_id == exhibition_id)
            .cloned()
            .collect())
    }

    async fn replace_content(
        &self,
        id: ObjectId,
        content: &SectionContent,
    ) -> Result<UpdateResult, StoreError> {
        let mut docs = self.inner.write()?;
        match docs.iter_mut().find(|s| s.id == id) {
            Some(doc) => {
                let before = doc.clone();
                doc.replace_content(content.clone());
                Ok(UpdateResult::new(1, u64::from(*doc != before)))
            }
            None => Ok(UpdateResult::default()),
        }
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<u64, StoreError> {
        self.inner.check_deletes()?;
        let mut docs = self.inner.write()?;
        let before = docs.len();
        docs.retain(|s| s.id != id);
        Ok((before - docs.len()) as u64)
    }
}

// =========================================================================
// Rooms
// =========================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryRooms {
    inner: Documents<Room>,
}

impl MemoryRooms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.inner.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoomCollection for MemoryRooms {
    async fn insert(&self, room: &Room) -> Result<(), StoreError> {
        self.inner.write()?.push(room.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Room>, StoreError> {
        Ok(self.inner.read()?.iter().find(|r| r.id == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Room>, StoreError> {
        Ok(self.inner.read()?.clone())
    }

    async fn find_by_exhibition(&self, exhibition_id: ObjectId) -> Result<Vec<Room>, StoreError> {
        Ok(self
            .inner
            .read()?
            .iter()
            .filter(|r| r.exhibition_id == exhibition_id)
            .cloned()
            .collect())
    }

    async fn replace_content(
        &self,
        id: ObjectId,
        content: &RoomContent,
    ) -> Result<UpdateResult, StoreError> {
        let mut docs = self.inner.write()?;
        match docs.iter_mut().find(|r| r.id == id) {
            Some(doc) => {
                let before = doc.clone();
                doc.replace_content(content.clone());
                Ok(UpdateResult::new(1, u64::from(*doc != before)))
            }
            None => Ok(UpdateResult::default()),
        }
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<u64, StoreError> {
        self.inner.check_deletes()?;
        let mut docs = self.inner.write()?;
        let before = docs.len();
        docs.retain(|r| r.id != id);
        Ok((before - docs.len()) as u64)
    }
}

// =========================================================================
// Comments
// =========================================================================

/// Minimal comment record; the real schema belongs to the comment service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredComment {
    pub id: ObjectId,
    pub exhibition_id: ObjectId,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryComments {
    inner: Documents<StoredComment>,
}

impl MemoryComments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a comment, standing in for the comment service
    pub fn add(&self, exhibition_id: ObjectId, text: impl Into<String>) -> ObjectId {
        let comment = StoredComment {
            id: ObjectId::new(),
            exhibition_id,
            text: text.into(),
        };
        let id = comment.id;
        if let Ok(mut docs) = self.inner.write() {
            docs.push(comment);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.inner.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CommentCollection for MemoryComments {
    async fn count_by_exhibition(&self, exhibition_id: ObjectId) -> Result<u64, StoreError> {
        Ok(self
            .inner
            .read()?
            .iter()
            .filter(|c| c.exhibition_id == exhibition_id)
            .count() as u64)
    }

    async fn delete_by_exhibition(&self, exhibition_id: ObjectId) -> Result<u64, StoreError> {
        self.inner.check_deletes()?;
        let mut docs = self.inner.write()?;
        let before = docs.len();
        docs.retain(|c| c.exhibition_id != exhibition_id);
        Ok((before - docs.len()) as u64)
    }
}

/// All four collections, sharing state with every clone
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub exhibitions: MemoryExhibitions,
    pub sections: MemorySections,
    pub rooms: MemoryRooms,
    pub comments: MemoryComments,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Layout, NewExhibition};

    fn exhibition(end: &str, public: bool) -> Exhibition {
        Exhibition::create(NewExhibition {
            name: "Night".to_string(),
            layout_used: Layout::BLOG.to_string(),
            is_public: public,
            start_date: "2024-01-01T00:00:00.000Z".to_string(),
            end_date: end.to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_add_like_is_conditional() {
        let store = MemoryExhibitions::new();
        let ex = exhibition("2024-02-01T00:00:00.000Z", true);
        store.insert(&ex).await.unwrap();

        assert_eq!(store.add_like(ex.id, "u1").await.unwrap(), UpdateResult::new(1, 1));
        assert_eq!(store.add_like(ex.id, "u1").await.unwrap(), UpdateResult::new(1, 0));
        assert_eq!(
            store.add_like(ObjectId::new(), "u1").await.unwrap(),
            UpdateResult::default()
        );

        let stored = store.find_by_id(ex.id).await.unwrap().unwrap();
        assert_eq!(stored.like_count, 1);
    }

    #[tokio::test]
    async fn test_pull_child_removes_every_occurrence() {
        let store = MemoryExhibitions::new();
        let ex = exhibition("", true);
        store.insert(&ex).await.unwrap();
        let child = ObjectId::new();

        store.push_child(ex.id, ChildKind::Room, child).await.unwrap();
        store.push_child(ex.id, ChildKind::Room, child).await.unwrap();
        let result = store.pull_child(ex.id, ChildKind::Room, child).await.unwrap();

        assert!(result.changed());
        let stored = store.find_by_id(ex.id).await.unwrap().unwrap();
        assert!(stored.room_ids.is_empty());
    }

    #[tokio::test]
    async fn test_hide_ended_skips_undated_and_private() {
        let store = MemoryExhibitions::new();
        store.insert(&exhibition("2024-02-01T00:00:00.000Z", true)).await.unwrap();
        store.insert(&exhibition("2024-02-01T00:00:00.000Z", false)).await.unwrap();
        store.insert(&exhibition("", true)).await.unwrap();

        assert_eq!(store.hide_ended("2024-06-01T00:00:00.000Z").await.unwrap(), 1);
        assert_eq!(store.hide_ended("2024-06-01T00:00:00.000Z").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failing_deletes() {
        let comments = MemoryComments::new();
        let parent = ObjectId::new();
        comments.add(parent, "nice");
        comments.fail_deletes(true);

        assert!(comments.delete_by_exhibition(parent).await.is_err());
        assert_eq!(comments.count_by_exhibition(parent).await.unwrap(), 1);
    }
}
