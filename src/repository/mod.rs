//! Aggregate Repository
//!
//! Owns the exhibition collection and keeps the aggregate consistent across
//! the child collections using single-document operations only:
//! order-preserving composition, best-effort cascade delete, set-semantics
//! likes and child reference maintenance.

mod children;
mod error;
mod reconcile;

pub use error::RepositoryError;
pub use reconcile::ReconcileReport;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    parse_id, ChildKind, Clock, DomainError, EntityKind, Exhibition, ExhibitionPatch,
    ExhibitionStatus, ExhibitionView, Layout, NewExhibition, ObjectId, SectionInfo,
};
use crate::query::{DateWindow, ExhibitionQuery};
use crate::store::{
    Collections, CommentCollection, ExhibitionCollection, RoomCollection, SectionCollection,
    StoreError,
};

/// Default deadline for a single storage call
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a cascade delete
///
/// The root is always gone when this is returned; `failures` lists the
/// cleanup steps that did not complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub sections_deleted: u64,
    pub rooms_deleted: u64,
    pub comments_deleted: u64,
    pub failures: Vec<String>,
}

impl CascadeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Aggregate repository over the exhibition and child collections
#[derive(Clone)]
pub struct AggregateRepository {
    exhibitions: Arc<dyn ExhibitionCollection>,
    sections: Arc<dyn SectionCollection>,
    rooms: Arc<dyn RoomCollection>,
    comments: Arc<dyn CommentCollection>,
    clock: Clock,
    op_timeout: Duration,
}

impl AggregateRepository {
    pub fn new(collections: Collections, clock: Clock) -> Self {
        Self {
            exhibitions: collections.exhibitions,
            sections: collections.sections,
            rooms: collections.rooms,
            comments: collections.comments,
            clock,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// Override the per-call storage deadline
    pub fn with_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Run one storage call under the deadline
    async fn bounded<T, F>(&self, call: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.op_timeout, call).await {
            Ok(result) => result.map_err(RepositoryError::from),
            Err(_) => Err(RepositoryError::Timeout(self.op_timeout)),
        }
    }

    async fn load(&self, id: ObjectId) -> Result<Exhibition, RepositoryError> {
        self.bounded(self.exhibitions.find_by_id(id))
            .await?
            .ok_or_else(|| RepositoryError::not_found(EntityKind::Exhibition, id))
    }

    async fn list(&self, query: ExhibitionQuery) -> Result<Vec<Exhibition>, RepositoryError> {
        self.bounded(self.exhibitions.find(&query)).await
    }

    // =========================================================================
    // Composition
    // =========================================================================

    /// Fetch an exhibition with its children composed in reference order
    ///
    /// Children are fetched one id at a time in list order. A referenced
    /// child that does not exist aborts with `ChildNotFound`.
    pub async fn get_by_id(
        &self,
        id: &str,
        caller_user_id: Option<&str>,
    ) -> Result<ExhibitionView, RepositoryError> {
        let id = parse_id(id)?;
        let exhibition = self.load(id).await?;

        let mut sections = Vec::new();
        let mut rooms = Vec::new();

        match exhibition.layout() {
            Layout::Blog => {
                for section_id in &exhibition.section_ids {
                    let section = self
                        .bounded(self.sections.find_by_id(*section_id))
                        .await?
                        .ok_or_else(|| dangling(ChildKind::Section, id, *section_id))?;
                    sections.push(section);
                }
            }
            Layout::Live => {
                for room_id in &exhibition.room_ids {
                    let room = self
                        .bounded(self.rooms.find_by_id(*room_id))
                        .await?
                        .ok_or_else(|| dangling(ChildKind::Room, id, *room_id))?;
                    rooms.push(room);
                }
            }
            Layout::Other => {}
        }

        let is_liked = caller_user_id
            .map(|user_id| exhibition.is_liked_by(user_id))
            .unwrap_or(false);

        Ok(ExhibitionView {
            exhibition,
            is_liked,
            sections,
            rooms,
        })
    }

    /// Ordered section ids of an exhibition with their positions
    pub async fn section_info(&self, id: &str) -> Result<Vec<SectionInfo>, RepositoryError> {
        let exhibition = self.load(parse_id(id)?).await?;

        Ok(exhibition
            .section_ids
            .iter()
            .enumerate()
            .map(|(index, section_id)| SectionInfo {
                index,
                section_id: *section_id,
            })
            .collect())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn list_all(&self) -> Result<Vec<Exhibition>, RepositoryError> {
        self.list(ExhibitionQuery::all()).await
    }

    pub async fn list_public(&self) -> Result<Vec<Exhibition>, RepositoryError> {
        self.list(ExhibitionQuery::listed()).await
    }

    pub async fn list_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Exhibition>, RepositoryError> {
        self.list(ExhibitionQuery::listed().with_category(category))
            .await
    }

    pub async fn list_by_filter(
        &self,
        category: &str,
        status: &str,
        sort_order: &str,
    ) -> Result<Vec<Exhibition>, RepositoryError> {
        let now = self.clock.now_stamp();
        self.list(ExhibitionQuery::by_filter(category, status, sort_order, &now))
            .await
    }

    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Exhibition>, RepositoryError> {
        self.list(ExhibitionQuery::by_owner(owner_id)).await
    }

    pub async fn list_current(&self) -> Result<Vec<Exhibition>, RepositoryError> {
        let now = self.clock.now_stamp();
        self.list(ExhibitionQuery::listed().with_window(Some(DateWindow::Current { now })))
            .await
    }

    pub async fn list_previous(&self) -> Result<Vec<Exhibition>, RepositoryError> {
        let now = self.clock.now_stamp();
        self.list(ExhibitionQuery::listed().with_window(Some(DateWindow::Previous { now })))
            .await
    }

    pub async fn list_upcoming(&self) -> Result<Vec<Exhibition>, RepositoryError> {
        let now = self.clock.now_stamp();
        self.list(ExhibitionQuery::listed().with_window(Some(DateWindow::Upcoming { now })))
            .await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn create(&self, request: NewExhibition) -> Result<ObjectId, RepositoryError> {
        if request.owner.user_id.is_empty() {
            return Err(DomainError::BusinessRuleViolation(
                "exhibition owner is required".to_string(),
            )
            .into());
        }

        let exhibition = Exhibition::create(request);
        self.bounded(self.exhibitions.insert(&exhibition)).await?;

        tracing::info!(exhibition_id = %exhibition.id, "Exhibition created");
        Ok(exhibition.id)
    }

    /// Set the fields present in the patch; owner and likes are not patchable
    pub async fn update(
        &self,
        id: &str,
        patch: &ExhibitionPatch,
    ) -> Result<ObjectId, RepositoryError> {
        let id = parse_id(id)?;
        let result = self.bounded(self.exhibitions.update_fields(id, patch)).await?;

        if !result.found() {
            return Err(RepositoryError::not_found(EntityKind::Exhibition, id));
        }
        Ok(id)
    }

    /// Delete an exhibition and, best-effort, everything that hangs off it
    ///
    /// Only a missing root fails the call. Cleanup failures are logged and
    /// collected in the report; reconciliation picks up what is left behind.
    pub async fn delete(&self, id: &str) -> Result<CascadeReport, RepositoryError> {
        let id = parse_id(id)?;

        // Snapshot the reference lists before the root goes away
        let exhibition = self.load(id).await?;

        let deleted = self.bounded(self.exhibitions.delete_by_id(id)).await?;
        if deleted == 0 {
            return Err(RepositoryError::not_found(EntityKind::Exhibition, id));
        }

        let mut report = CascadeReport::default();

        for section_id in &exhibition.section_ids {
            match self.bounded(self.sections.delete_by_id(*section_id)).await {
                Ok(n) => report.sections_deleted += n,
                Err(e) => {
                    tracing::warn!(
                        exhibition_id = %id,
                        section_id = %section_id,
                        step = "delete_section",
                        error = %e,
                        "Cascade cleanup step failed"
                    );
                    report.failures.push(format!("section {}: {}", section_id, e));
                }
            }
        }

        for room_id in &exhibition.room_ids {
            match self.bounded(self.rooms.delete_by_id(*room_id)).await {
                Ok(n) => report.rooms_deleted += n,
                Err(e) => {
                    tracing::warn!(
                        exhibition_id = %id,
                        room_id = %room_id,
                        step = "delete_room",
                        error = %e,
                        "Cascade cleanup step failed"
                    );
                    report.failures.push(format!("room {}: {}", room_id, e));
                }
            }
        }

        match self.delete_comments(id).await {
            Ok(n) => report.comments_deleted = n,
            Err(e) => {
                tracing::warn!(
                    exhibition_id = %id,
                    step = "delete_comments",
                    error = %e,
                    "Cascade cleanup step failed"
                );
                report.failures.push(format!("comments: {}", e));
            }
        }

        tracing::info!(
            exhibition_id = %id,
            sections_deleted = report.sections_deleted,
            rooms_deleted = report.rooms_deleted,
            comments_deleted = report.comments_deleted,
            complete = report.is_complete(),
            "Exhibition deleted"
        );

        Ok(report)
    }

    async fn delete_comments(&self, id: ObjectId) -> Result<u64, RepositoryError> {
        let count = self.bounded(self.comments.count_by_exhibition(id)).await?;
        if count == 0 {
            return Ok(0);
        }
        self.bounded(self.comments.delete_by_exhibition(id)).await
    }

    /// Add the user to the like set; a repeated like changes nothing
    ///
    /// Returns whether the set changed.
    pub async fn like(&self, id: &str, user_id: &str) -> Result<bool, RepositoryError> {
        let id = parse_id(id)?;
        let result = self.bounded(self.exhibitions.add_like(id, user_id)).await?;

        if !result.found() {
            return Err(RepositoryError::not_found(EntityKind::Exhibition, id));
        }
        Ok(result.changed())
    }

    /// Remove the user from the like set; the counter never goes below zero
    pub async fn unlike(&self, id: &str, user_id: &str) -> Result<bool, RepositoryError> {
        let id = parse_id(id)?;
        let result = self.bounded(self.exhibitions.remove_like(id, user_id)).await?;

        if !result.found() {
            return Err(RepositoryError::not_found(EntityKind::Exhibition, id));
        }
        Ok(result.changed())
    }

    pub async fn increment_visits(&self, id: &str) -> Result<(), RepositoryError> {
        let id = parse_id(id)?;
        let result = self.bounded(self.exhibitions.increment_visits(id)).await?;

        if !result.found() {
            return Err(RepositoryError::not_found(EntityKind::Exhibition, id));
        }
        Ok(())
    }

    pub async fn ban(&self, id: &str) -> Result<(), RepositoryError> {
        let id = parse_id(id)?;
        let result = self
            .bounded(self.exhibitions.set_status(id, ExhibitionStatus::Banned))
            .await?;

        if !result.found() {
            return Err(RepositoryError::not_found(EntityKind::Exhibition, id));
        }

        tracing::info!(exhibition_id = %id, "Exhibition banned");
        Ok(())
    }

    /// Pull a child id out of the parent's reference list
    ///
    /// Returns whether the list changed. A missing parent is `NotFound`.
    pub async fn remove_child_reference(
        &self,
        exhibition_id: ObjectId,
        kind: ChildKind,
        child_id: ObjectId,
    ) -> Result<bool, RepositoryError> {
        let result = self
            .bounded(self.exhibitions.pull_child(exhibition_id, kind, child_id))
            .await?;

        if !result.found() {
            return Err(RepositoryError::not_found(
                EntityKind::Exhibition,
                exhibition_id,
            ));
        }
        Ok(result.changed())
    }

    // =========================================================================
    // Visibility sweep
    // =========================================================================

    /// Make every public exhibition whose end date has passed private
    ///
    /// Returns the number of exhibitions changed; a second run right after
    /// changes nothing.
    pub async fn hide_ended(&self) -> Result<u64, RepositoryError> {
        let now = self.clock.now_stamp();
        self.bounded(self.exhibitions.hide_ended(&now)).await
    }
}

fn dangling(kind: ChildKind, exhibition_id: ObjectId, child_id: ObjectId) -> RepositoryError {
    RepositoryError::Domain(DomainError::ChildNotFound {
        kind,
        exhibition_id: exhibition_id.to_hex(),
        child_id: child_id.to_hex(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Owner;
    use crate::store::MemoryStore;

    fn repository(store: &MemoryStore) -> AggregateRepository {
        AggregateRepository::new(Collections::from(store), Clock::default())
    }

    fn new_exhibition(layout: &str) -> NewExhibition {
        NewExhibition {
            name: "Harbour".to_string(),
            layout_used: layout.to_string(),
            is_public: true,
            start_date: "2024-01-01T00:00:00.000Z".to_string(),
            end_date: "2099-01-01T00:00:00.000Z".to_string(),
            owner: Owner {
                user_id: "owner-1".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_requires_owner() {
        let store = MemoryStore::new();
        let repo = repository(&store);

        let mut request = new_exhibition(Layout::BLOG);
        request.owner = Owner::default();

        let err = repo.create(request).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Domain(DomainError::BusinessRuleViolation(_))
        ));
        assert!(store.exhibitions.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_identifier_is_not_not_found() {
        let store = MemoryStore::new();
        let repo = repository(&store);

        let err = repo.get_by_id("not-an-id", None).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Domain(DomainError::InvalidIdentifier { .. })
        ));
    }

    #[tokio::test]
    async fn test_other_layout_composes_nothing() {
        let store = MemoryStore::new();
        let repo = repository(&store);
        let id = repo.create(new_exhibition("gridLayout")).await.unwrap();

        store
            .exhibitions
            .push_child(id, ChildKind::Section, ObjectId::new())
            .await
            .unwrap();

        // A dangling section id is irrelevant when sections are not composed
        let view = repo.get_by_id(&id.to_hex(), None).await.unwrap();
        assert!(view.sections.is_empty());
        assert!(view.rooms.is_empty());
    }

    #[tokio::test]
    async fn test_is_liked_is_per_caller() {
        let store = MemoryStore::new();
        let repo = repository(&store);
        let id = repo.create(new_exhibition(Layout::BLOG)).await.unwrap();
        let hex = id.to_hex();

        repo.like(&hex, "u1").await.unwrap();

        assert!(repo.get_by_id(&hex, Some("u1")).await.unwrap().is_liked);
        assert!(!repo.get_by_id(&hex, Some("u2")).await.unwrap().is_liked);
        assert!(!repo.get_by_id(&hex, None).await.unwrap().is_liked);
    }

    #[tokio::test]
    async fn test_remove_child_reference_reports_change() {
        let store = MemoryStore::new();
        let repo = repository(&store);
        let id = repo.create(new_exhibition(Layout::BLOG)).await.unwrap();
        let child = ObjectId::new();
        store
            .exhibitions
            .push_child(id, ChildKind::Section, child)
            .await
            .unwrap();

        assert!(repo
            .remove_child_reference(id, ChildKind::Section, child)
            .await
            .unwrap());
        assert!(!repo
            .remove_child_reference(id, ChildKind::Section, child)
            .await
            .unwrap());

        let err = repo
            .remove_child_reference(ObjectId::new(), ChildKind::Section, child)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
