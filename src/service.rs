//! Exhibition Service
//!
//! Stable facade over the aggregate repository for request handlers. Every
//! method forwards to the repository unchanged.

use crate::domain::{
    Exhibition, ExhibitionPatch, ExhibitionView, NewExhibition, ObjectId, Room, RoomContent,
    Section, SectionContent, SectionInfo,
};
use crate::repository::{AggregateRepository, RepositoryError};

pub type ServiceResult<T> = Result<T, RepositoryError>;

/// Service facade for the exhibition aggregate
#[derive(Clone)]
pub struct ExhibitionService {
    repository: AggregateRepository,
}

impl ExhibitionService {
    pub fn new(repository: AggregateRepository) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &AggregateRepository {
        &self.repository
    }

    // =========================================================================
    // Exhibitions
    // =========================================================================

    pub async fn get_by_id(
        &self,
        id: &str,
        caller_user_id: Option<&str>,
    ) -> ServiceResult<ExhibitionView> {
        self.repository.get_by_id(id, caller_user_id).await
    }

    pub async fn list_all(&self) -> ServiceResult<Vec<Exhibition>> {
        self.repository.list_all().await
    }

    pub async fn list_public(&self) -> ServiceResult<Vec<Exhibition>> {
        self.repository.list_public().await
    }

    pub async fn list_by_category(&self, category: &str) -> ServiceResult<Vec<Exhibition>> {
        self.repository.list_by_category(category).await
    }

    pub async fn list_by_filter(
        &self,
        category: &str,
        status: &str,
        sort_order: &str,
    ) -> ServiceResult<Vec<Exhibition>> {
        self.repository
            .list_by_filter(category, status, sort_order)
            .await
    }

    pub async fn list_by_owner(&self, owner_id: &str) -> ServiceResult<Vec<Exhibition>> {
        self.repository.list_by_owner(owner_id).await
    }

    pub async fn list_current(&self) -> ServiceResult<Vec<Exhibition>> {
        self.repository.list_current().await
    }

    pub async fn list_previous(&self) -> ServiceResult<Vec<Exhibition>> {
        self.repository.list_previous().await
    }

    pub async fn list_upcoming(&self) -> ServiceResult<Vec<Exhibition>> {
        self.repository.list_upcoming().await
    }

    pub async fn section_info(&self, id: &str) -> ServiceResult<Vec<SectionInfo>> {
        self.repository.section_info(id).await
    }

    pub async fn create(&self, request: NewExhibition) -> ServiceResult<ObjectId> {
        self.repository.create(request).await
    }

    pub async fn update(&self, id: &str, patch: &ExhibitionPatch) -> ServiceResult<ObjectId> {
        self.repository.update(id, patch).await
    }

    /// Succeeds once the root is removed; child cleanup is best-effort
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        self.repository.delete(id).await.map(|_| ())
    }

    pub async fn like(&self, id: &str, user_id: &str) -> ServiceResult<()> {
        self.repository.like(id, user_id).await.map(|_| ())
    }

    pub async fn unlike(&self, id: &str, user_id: &str) -> ServiceResult<()> {
        self.repository.unlike(id, user_id).await.map(|_| ())
    }

    pub async fn increment_visit_count(&self, id: &str) -> ServiceResult<()> {
        self.repository.increment_visits(id).await
    }

    pub async fn ban(&self, id: &str) -> ServiceResult<()> {
        self.repository.ban(id).await
    }

    // =========================================================================
    // Sections
    // =========================================================================

    pub async fn create_section(&self, content: SectionContent) -> ServiceResult<ObjectId> {
        self.repository.create_section(content).await
    }

    pub async fn get_section(&self, id: &str) -> ServiceResult<Section> {
        self.repository.get_section(id).await
    }

    pub async fn list_sections(&self) -> ServiceResult<Vec<Section>> {
        self.repository.list_sections().await
    }

    pub async fn list_sections_by_exhibition(
        &self,
        exhibition_id: &str,
    ) -> ServiceResult<Vec<Section>> {
        self.repository
            .list_sections_by_exhibition(exhibition_id)
            .await
    }

    pub async fn update_section(
        &self,
        id: &str,
        content: &SectionContent,
    ) -> ServiceResult<ObjectId> {
        self.repository.update_section(id, content).await
    }

    pub async fn delete_section(&self, id: &str) -> ServiceResult<()> {
        self.repository.delete_section(id).await
    }

    // =========================================================================
    // Rooms
    // =========================================================================

    pub async fn create_room(&self, content: RoomContent) -> ServiceResult<ObjectId> {
        self.repository.create_room(content).await
    }

    pub async fn get_room(&self, id: &str) -> ServiceResult<Room> {
        self.repository.get_room(id).await
    }

    pub async fn list_rooms(&self) -> ServiceResult<Vec<Room>> {
        self.repository.list_rooms().await
    }

    pub async fn list_rooms_by_exhibition(&self, exhibition_id: &str) -> ServiceResult<Vec<Room>> {
        self.repository.list_rooms_by_exhibition(exhibition_id).await
    }

    pub async fn update_room(&self, id: &str, content: &RoomContent) -> ServiceResult<ObjectId> {
        self.repository.update_room(id, content).await
    }

    pub async fn delete_room(&self, id: &str) -> ServiceResult<()> {
        self.repository.delete_room(id).await
    }
}
