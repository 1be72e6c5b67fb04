//! Exhibition query predicates
//!
//! Builds the category/status/sort predicates used by the read paths. A
//! predicate is plain data: the PostgreSQL store renders it to SQL and the
//! in-memory store evaluates it with [`ExhibitionQuery::matches`], so both
//! agree on the same string-date comparisons.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::domain::{Exhibition, ExhibitionStatus};

/// Time-window refinement over the string-encoded dates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateWindow {
    /// `startDate <= now <= endDate`
    Current { now: String },
    /// `endDate < now`
    Previous { now: String },
    /// `startDate > now`
    Upcoming { now: String },
}

impl DateWindow {
    /// Parse a status name; unknown or empty names mean no refinement
    pub fn from_status(status: &str, now: &str) -> Option<Self> {
        let now = now.to_string();
        match status {
            "current" => Some(DateWindow::Current { now }),
            "previous" => Some(DateWindow::Previous { now }),
            "upcoming" => Some(DateWindow::Upcoming { now }),
            _ => None,
        }
    }

    fn matches(&self, exhibition: &Exhibition) -> bool {
        let start = exhibition.start_date.as_str();
        let end = exhibition.end_date.as_str();
        match self {
            DateWindow::Current { now } => {
                !start.is_empty() && !end.is_empty() && start <= now.as_str() && now.as_str() <= end
            }
            DateWindow::Previous { now } => !end.is_empty() && end < now.as_str(),
            DateWindow::Upcoming { now } => !start.is_empty() && start > now.as_str(),
        }
    }
}

/// Sort direction on `startDate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `desc` sorts descending; anything else is ascending
    pub fn from_param(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Predicate plus ordering for exhibition list reads
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExhibitionQuery {
    /// Category membership
    pub category: Option<String>,
    /// `isPublic == true`
    pub public_only: bool,
    /// Exact status match
    pub status: Option<ExhibitionStatus>,
    /// Owner's user id
    pub owner_id: Option<String>,
    pub window: Option<DateWindow>,
    pub sort: SortOrder,
}

impl ExhibitionQuery {
    /// Every exhibition, ascending by start date
    pub fn all() -> Self {
        Self::default()
    }

    /// Base predicate for anything shown publicly
    pub fn listed() -> Self {
        Self {
            public_only: true,
            status: Some(ExhibitionStatus::Created),
            ..Self::default()
        }
    }

    pub fn by_owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Self::default()
        }
    }

    /// Category filter with optional status window and sort order
    pub fn by_filter(category: &str, status: &str, sort_order: &str, now: &str) -> Self {
        Self::listed()
            .with_category(category)
            .with_window(DateWindow::from_status(status, now))
            .with_sort(SortOrder::from_param(sort_order))
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_window(mut self, window: Option<DateWindow>) -> Self {
        self.window = window;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Evaluate the predicate against one document
    pub fn matches(&self, exhibition: &Exhibition) -> bool {
        if let Some(ref category) = self.category {
            if !exhibition.categories.contains(category) {
                return false;
            }
        }
        if self.public_only && !exhibition.is_public {
            return false;
        }
        if let Some(status) = self.status {
            if exhibition.status != status {
                return false;
            }
        }
        if let Some(ref owner_id) = self.owner_id {
            if &exhibition.owner.user_id != owner_id {
                return false;
            }
        }
        match self.window {
            Some(ref window) => window.matches(exhibition),
            None => true,
        }
    }

    /// Ordering of two matching documents
    ///
    /// Equal start dates fall back to ascending id in either direction.
    pub fn compare(&self, a: &Exhibition, b: &Exhibition) -> Ordering {
        let by_start = match self.sort {
            SortOrder::Asc => a.start_date.cmp(&b.start_date),
            SortOrder::Desc => b.start_date.cmp(&a.start_date),
        };
        by_start.then_with(|| a.id.cmp(&b.id))
    }

    /// Filter and sort a set of documents
    pub fn apply<'a, I>(&self, exhibitions: I) -> Vec<Exhibition>
    where
        I: IntoIterator<Item = &'a Exhibition>,
    {
        let mut matched: Vec<Exhibition> = exhibitions
            .into_iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect();
        matched.sort_by(|a, b| self.compare(a, b));
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Layout, NewExhibition, ObjectId};

    const NOW: &str = "2024-06-15T12:00:00.000Z";

    fn exhibition(category: &str, start: &str, end: &str) -> Exhibition {
        let mut ex = Exhibition::create(NewExhibition {
            name: format!("{} {}", category, start),
            layout_used: Layout::BLOG.to_string(),
            is_public: true,
            start_date: start.to_string(),
            end_date: end.to_string(),
            categories: [category.to_string()].into_iter().collect(),
            ..Default::default()
        });
        ex.owner.user_id = "owner-1".to_string();
        ex
    }

    fn past() -> Exhibition {
        exhibition("art", "2024-01-01T00:00:00.000Z", "2024-02-01T00:00:00.000Z")
    }

    fn running() -> Exhibition {
        exhibition("art", "2024-06-01T00:00:00.000Z", "2024-07-01T00:00:00.000Z")
    }

    fn future() -> Exhibition {
        exhibition("art", "2024-09-01T00:00:00.000Z", "2024-10-01T00:00:00.000Z")
    }

    #[test]
    fn test_status_windows() {
        let all = vec![past(), running(), future()];

        let current = ExhibitionQuery::by_filter("art", "current", "", NOW).apply(&all);
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].start_date, "2024-06-01T00:00:00.000Z");

        let previous = ExhibitionQuery::by_filter("art", "previous", "", NOW).apply(&all);
        assert_eq!(previous.len(), 1);
        assert_eq!(previous[0].end_date, "2024-02-01T00:00:00.000Z");

        let upcoming = ExhibitionQuery::by_filter("art", "upcoming", "", NOW).apply(&all);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].start_date, "2024-09-01T00:00:00.000Z");
    }

    #[test]
    fn test_unknown_status_means_no_window() {
        let query = ExhibitionQuery::by_filter("art", "someday", "", NOW);
        assert!(query.window.is_none());
        assert_eq!(query.apply(&[past(), running(), future()]).len(), 3);
    }

    #[test]
    fn test_base_predicate_excludes_private_banned_and_other_categories() {
        let mut private = running();
        private.is_public = false;
        let mut banned = running();
        banned.status = ExhibitionStatus::Banned;
        let other = exhibition("music", "2024-06-01T00:00:00.000Z", "2024-07-01T00:00:00.000Z");

        let result = ExhibitionQuery::by_filter("art", "", "", NOW).apply(&[private, banned, other]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_sort_order() {
        let all = vec![running(), future(), past()];

        let asc = ExhibitionQuery::by_filter("art", "", "asc", NOW).apply(&all);
        let starts: Vec<&str> = asc.iter().map(|e| e.start_date.as_str()).collect();
        assert_eq!(
            starts,
            vec![
                "2024-01-01T00:00:00.000Z",
                "2024-06-01T00:00:00.000Z",
                "2024-09-01T00:00:00.000Z"
            ]
        );

        let desc = ExhibitionQuery::by_filter("art", "", "DESC", NOW).apply(&all);
        assert_eq!(desc[0].start_date, "2024-09-01T00:00:00.000Z");
    }

    #[test]
    fn test_equal_start_dates_order_by_id() {
        let mut low = running();
        low.id = ObjectId::parse_str("000000000000000000000001").unwrap();
        let mut high = running();
        high.id = ObjectId::parse_str("ff0000000000000000000000").unwrap();
        let all = vec![high.clone(), future(), low.clone()];

        for sort in ["asc", "desc"] {
            let sorted = ExhibitionQuery::by_filter("art", "current", sort, NOW).apply(&all);
            let ids: Vec<ObjectId> = sorted.iter().map(|e| e.id).collect();
            assert_eq!(ids, vec![low.id, high.id], "sort order {}", sort);
        }

        let desc = ExhibitionQuery::by_filter("art", "", "desc", NOW).apply(&all);
        assert_eq!(desc[0].start_date, "2024-09-01T00:00:00.000Z");
        assert_eq!((desc[1].id, desc[2].id), (low.id, high.id));
    }

    #[test]
    fn test_empty_dates_never_match_windows() {
        let undated = exhibition("art", "", "");
        for status in ["current", "previous", "upcoming"] {
            let query = ExhibitionQuery::by_filter("art", status, "", NOW);
            assert!(!query.matches(&undated), "{} matched an undated exhibition", status);
        }
    }

    #[test]
    fn test_by_owner_ignores_visibility() {
        let mut mine = running();
        mine.is_public = false;
        let mut theirs = running();
        theirs.owner.user_id = "owner-2".to_string();

        let result = ExhibitionQuery::by_owner("owner-1").apply(&[mine, theirs]);
        assert_eq!(result.len(), 1);
    }
}
