//! Section and room operations
//!
//! Children live in their own collections. Creating one appends its id to the
//! parent's reference list; deleting one pulls it back out.

use crate::domain::{
    parse_id, ChildKind, DomainError, EntityKind, ObjectId, Room, RoomContent, Section,
    SectionContent,
};

use super::{AggregateRepository, RepositoryError};

fn require_parent(parent: Option<ObjectId>) -> Result<ObjectId, RepositoryError> {
    parent.ok_or_else(|| {
        DomainError::BusinessRuleViolation("exhibitionID is required".to_string()).into()
    })
}

impl AggregateRepository {
    /// Undo a child insert whose parent vanished; failure only leaves an orphan
    async fn discard_child(&self, kind: ChildKind, child_id: ObjectId) {
        let result = match kind {
            ChildKind::Section => self.bounded(self.sections.delete_by_id(child_id)).await,
            ChildKind::Room => self.bounded(self.rooms.delete_by_id(child_id)).await,
        };
        if let Err(e) = result {
            tracing::warn!(
                kind = %kind,
                child_id = %child_id,
                error = %e,
                "Failed to discard child of missing exhibition"
            );
        }
    }

    /// Append a freshly inserted child to its parent, discarding it when the
    /// parent does not exist
    async fn attach_child(
        &self,
        parent: ObjectId,
        kind: ChildKind,
        child_id: ObjectId,
    ) -> Result<(), RepositoryError> {
        let result = match self
            .bounded(self.exhibitions.push_child(parent, kind, child_id))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.discard_child(kind, child_id).await;
                return Err(e);
            }
        };

        if !result.found() {
            self.discard_child(kind, child_id).await;
            return Err(RepositoryError::not_found(EntityKind::Exhibition, parent));
        }
        Ok(())
    }

    /// Pull a deleted child out of its parent; drift is left to reconciliation
    async fn detach_child(&self, parent: ObjectId, kind: ChildKind, child_id: ObjectId) {
        match self.remove_child_reference(parent, kind, child_id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(
                    exhibition_id = %parent,
                    child_id = %child_id,
                    "Parent already gone while detaching child"
                );
            }
            Err(e) => {
                tracing::warn!(
                    exhibition_id = %parent,
                    kind = %kind,
                    child_id = %child_id,
                    error = %e,
                    "Failed to remove child reference"
                );
            }
        }
    }

    // =========================================================================
    // Sections
    // =========================================================================

    pub async fn create_section(&self, content: SectionContent) -> Result<ObjectId, RepositoryError> {
        let parent = require_parent(content.exhibition_id)?;
        let section = Section::create(parent, content);

        self.bounded(self.sections.insert(&section)).await?;
        self.attach_child(parent, ChildKind::Section, section.id)
            .await?;

        tracing::info!(exhibition_id = %parent, section_id = %section.id, "Section created");
        Ok(section.id)
    }

    pub async fn get_section(&self, id: &str) -> Result<Section, RepositoryError> {
        let id = parse_id(id)?;
        self.bounded(self.sections.find_by_id(id))
            .await?
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Section, id))
    }

    pub async fn list_sections(&self) -> Result<Vec<Section>, RepositoryError> {
        self.bounded(self.sections.find_all()).await
    }

    pub async fn list_sections_by_exhibition(
        &self,
        exhibition_id: &str,
    ) -> Result<Vec<Section>, RepositoryError> {
        let exhibition_id = parse_id(exhibition_id)?;
        self.bounded(self.sections.find_by_exhibition(exhibition_id))
            .await
    }

    /// Replace a section's content; its parent link never changes
    pub async fn update_section(
        &self,
        id: &str,
        content: &SectionContent,
    ) -> Result<ObjectId, RepositoryError> {
        let id = parse_id(id)?;
        let result = self.bounded(self.sections.replace_content(id, content)).await?;

        if !result.found() {
            return Err(RepositoryError::not_found(EntityKind::Section, id));
        }
        Ok(id)
    }

    /// Delete a section, then remove it from its parent's `sectionIDs`
    pub async fn delete_section(&self, id: &str) -> Result<(), RepositoryError> {
        let id = parse_id(id)?;
        let section = self
            .bounded(self.sections.find_by_id(id))
            .await?
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Section, id))?;

        let deleted = self.bounded(self.sections.delete_by_id(id)).await?;
        if deleted == 0 {
            return Err(RepositoryError::not_found(EntityKind::Section, id));
        }

        self.detach_child(section.exhibition_id, ChildKind::Section, id)
            .await;

        tracing::info!(exhibition_id = %section.exhibition_id, section_id = %id, "Section deleted");
        Ok(())
    }

    // =========================================================================
    // Rooms
    // =========================================================================

    pub async fn create_room(&self, content: RoomContent) -> Result<ObjectId, RepositoryError> {
        let parent = require_parent(content.exhibition_id)?;
        let room = Room::create(parent, content);

        self.bounded(self.rooms.insert(&room)).await?;
        self.attach_child(parent, ChildKind::Room, room.id).await?;

        tracing::info!(exhibition_id = %parent, room_id = %room.id, "Room created");
        Ok(room.id)
    }

    pub async fn get_room(&self, id: &str) -> Result<Room, RepositoryError> {
        let id = parse_id(id)?;
        self.bounded(self.rooms.find_by_id(id))
            .await?
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Room, id))
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>, RepositoryError> {
        self.bounded(self.rooms.find_all()).await
    }

    pub async fn list_rooms_by_exhibition(
        &self,
        exhibition_id: &str,
    ) -> Result<Vec<Room>, RepositoryError> {
        let exhibition_id = parse_id(exhibition_id)?;
        self.bounded(self.rooms.find_by_exhibition(exhibition_id))
            .await
    }

    pub async fn update_room(
        &self,
        id: &str,
        content: &RoomContent,
    ) -> Result<ObjectId, RepositoryError> {
        let id = parse_id(id)?;
        let result = self.bounded(self.rooms.replace_content(id, content)).await?;

        if !result.found() {
            return Err(RepositoryError::not_found(EntityKind::Room, id));
        }
        Ok(id)
    }

    /// Delete a room, then remove it from its parent's `roomIDs`
    pub async fn delete_room(&self, id: &str) -> Result<(), RepositoryError> {
        let id = parse_id(id)?;
        let room = self
            .bounded(self.rooms.find_by_id(id))
            .await?
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Room, id))?;

        let deleted = self.bounded(self.rooms.delete_by_id(id)).await?;
        if deleted == 0 {
            return Err(RepositoryError::not_found(EntityKind::Room, id));
        }

        self.detach_child(room.exhibition_id, ChildKind::Room, id).await;

        tracing::info!(exhibition_id = %room.exhibition_id, room_id = %id, "Room deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Clock, Layout, NewExhibition, Owner};
    use crate::store::{Collections, MemoryStore};

    async fn setup() -> (MemoryStore, AggregateRepository, ObjectId) {
        let store = MemoryStore::new();
        let repo = AggregateRepository::new(Collections::from(&store), Clock::default());
        let id = repo
            .create(NewExhibition {
                name: "Rooms".to_string(),
                layout_used: Layout::LIVE.to_string(),
                owner: Owner {
                    user_id: "owner-1".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();
        (store, repo, id)
    }

    #[tokio::test]
    async fn test_create_room_appends_reference() {
        let (_store, repo, id) = setup().await;

        let room_id = repo
            .create_room(RoomContent {
                exhibition_id: Some(id),
                map_thumbnail: "map.png".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let view = repo.get_by_id(&id.to_hex(), None).await.unwrap();
        assert_eq!(view.exhibition.room_ids, vec![room_id]);
        assert_eq!(view.rooms[0].map_thumbnail, "map.png");
    }

    #[tokio::test]
    async fn test_create_child_without_parent_id_is_rejected() {
        let (store, repo, _id) = setup().await;

        let err = repo.create_section(SectionContent::default()).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Domain(DomainError::BusinessRuleViolation(_))
        ));
        assert!(store.sections.is_empty());
    }

    #[tokio::test]
    async fn test_create_child_for_missing_parent_leaves_no_orphan() {
        let (store, repo, _id) = setup().await;

        let err = repo
            .create_room(RoomContent {
                exhibition_id: Some(ObjectId::new()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(store.rooms.is_empty());
    }

    #[tokio::test]
    async fn test_update_section_keeps_parent() {
        let (_store, repo, id) = setup().await;
        let section_id = repo
            .create_section(SectionContent {
                exhibition_id: Some(id),
                title: "Before".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        repo.update_section(
            &section_id.to_hex(),
            &SectionContent {
                exhibition_id: Some(ObjectId::new()),
                title: "After".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let section = repo.get_section(&section_id.to_hex()).await.unwrap();
        assert_eq!(section.title, "After");
        assert_eq!(section.exhibition_id, id);
    }

    #[tokio::test]
    async fn test_delete_missing_room_is_not_found() {
        let (_store, repo, _id) = setup().await;
        let err = repo.delete_room(&ObjectId::new().to_hex()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
