//! Reconciliation
//!
//! Cascade deletes are best-effort, so drift accumulates: children whose
//! exhibition is gone and reference ids whose child is gone. This pass finds
//! both and repairs them one document at a time. Every candidate is re-checked
//! right before it is repaired, so work racing with the pass is left alone.

use std::collections::HashSet;

use crate::domain::{ChildKind, ObjectId};
use crate::query::ExhibitionQuery;

use super::{AggregateRepository, RepositoryError};

/// Counts from one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub orphan_sections_deleted: u64,
    pub orphan_rooms_deleted: u64,
    pub dangling_references_pruned: u64,
    pub failures: u64,
}

impl AggregateRepository {
    /// Delete orphaned children and prune dangling references
    ///
    /// Only the initial scans can fail the call; per-item failures are
    /// logged and counted.
    pub async fn reconcile(&self) -> Result<ReconcileReport, RepositoryError> {
        let mut report = ReconcileReport::default();

        let sections = self.bounded(self.sections.find_all()).await?;
        let rooms = self.bounded(self.rooms.find_all()).await?;
        let exhibitions = self
            .bounded(self.exhibitions.find(&ExhibitionQuery::all()))
            .await?;

        let parents: HashSet<ObjectId> = exhibitions.iter().map(|e| e.id).collect();

        for section in sections.iter().filter(|s| !parents.contains(&s.exhibition_id)) {
            if self.orphaned(section.exhibition_id, &mut report).await {
                match self.bounded(self.sections.delete_by_id(section.id)).await {
                    Ok(n) => report.orphan_sections_deleted += n,
                    Err(e) => {
                        tracing::warn!(section_id = %section.id, error = %e, "Failed to delete orphan section");
                        report.failures += 1;
                    }
                }
            }
        }

        for room in rooms.iter().filter(|r| !parents.contains(&r.exhibition_id)) {
            if self.orphaned(room.exhibition_id, &mut report).await {
                match self.bounded(self.rooms.delete_by_id(room.id)).await {
                    Ok(n) => report.orphan_rooms_deleted += n,
                    Err(e) => {
                        tracing::warn!(room_id = %room.id, error = %e, "Failed to delete orphan room");
                        report.failures += 1;
                    }
                }
            }
        }

        let known_sections: HashSet<ObjectId> = sections.iter().map(|s| s.id).collect();
        let known_rooms: HashSet<ObjectId> = rooms.iter().map(|r| r.id).collect();

        for exhibition in &exhibitions {
            for kind in [ChildKind::Section, ChildKind::Room] {
                let known = match kind {
                    ChildKind::Section => &known_sections,
                    ChildKind::Room => &known_rooms,
                };
                let candidates: Vec<ObjectId> = exhibition
                    .child_ids(kind)
                    .iter()
                    .filter(|id| !known.contains(*id))
                    .copied()
                    .collect();

                for child_id in candidates {
                    self.prune_reference(exhibition.id, kind, child_id, &mut report)
                        .await;
                }
            }
        }

        if report != ReconcileReport::default() {
            tracing::info!(
                orphan_sections_deleted = report.orphan_sections_deleted,
                orphan_rooms_deleted = report.orphan_rooms_deleted,
                dangling_references_pruned = report.dangling_references_pruned,
                failures = report.failures,
                "Reconciliation repaired drift"
            );
        }

        Ok(report)
    }

    /// Re-check that a child's parent is really gone
    async fn orphaned(&self, parent: ObjectId, report: &mut ReconcileReport) -> bool {
        match self.bounded(self.exhibitions.find_by_id(parent)).await {
            Ok(found) => found.is_none(),
            Err(e) => {
                tracing::warn!(exhibition_id = %parent, error = %e, "Failed to re-check parent");
                report.failures += 1;
                false
            }
        }
    }

    async fn prune_reference(
        &self,
        exhibition_id: ObjectId,
        kind: ChildKind,
        child_id: ObjectId,
        report: &mut ReconcileReport,
    ) {
        let exists = match kind {
            ChildKind::Section => self
                .bounded(self.sections.find_by_id(child_id))
                .await
                .map(|c| c.is_some()),
            ChildKind::Room => self
                .bounded(self.rooms.find_by_id(child_id))
                .await
                .map(|c| c.is_some()),
        };

        match exists {
            Ok(true) => {}
            Ok(false) => match self.remove_child_reference(exhibition_id, kind, child_id).await {
                Ok(true) => report.dangling_references_pruned += 1,
                Ok(false) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    tracing::warn!(
                        exhibition_id = %exhibition_id,
                        kind = %kind,
                        child_id = %child_id,
                        error = %e,
                        "Failed to prune dangling reference"
                    );
                    report.failures += 1;
                }
            },
            Err(e) => {
                tracing::warn!(kind = %kind, child_id = %child_id, error = %e, "Failed to re-check child");
                report.failures += 1;
            }
        }
    }
}
