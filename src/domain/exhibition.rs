//! Exhibition aggregate root
//!
//! The root document plus the read-time composed view.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ObjectId, Room, Section};

/// Layout that decides which child collection is composed on read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Composes `sectionIDs` from the section collection
    Blog,
    /// Composes `roomIDs` from the room collection
    Live,
    /// Any other layout; nothing is composed
    Other,
}

impl Layout {
    pub const BLOG: &'static str = "blogLayout";
    pub const LIVE: &'static str = "liveLayout";

    pub fn from_name(name: &str) -> Self {
        match name {
            Self::BLOG => Layout::Blog,
            Self::LIVE => Layout::Live,
            _ => Layout::Other,
        }
    }
}

/// Moderation state of an exhibition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExhibitionStatus {
    #[default]
    Created,
    Banned,
}

impl ExhibitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExhibitionStatus::Created => "created",
            ExhibitionStatus::Banned => "banned",
        }
    }
}

impl fmt::Display for ExhibitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ExhibitionStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "created" => Ok(ExhibitionStatus::Created),
            "banned" => Ok(ExhibitionStatus::Banned),
            other => Err(format!("unknown exhibition status: {}", other)),
        }
    }
}

/// Embedded descriptor of the exhibition's creator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub user_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub profile_image: String,
}

/// Exhibition root document as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exhibition {
    pub id: ObjectId,
    pub name: String,
    pub description: String,
    pub thumbnail: String,
    pub layout_used: String,
    pub status: ExhibitionStatus,
    pub is_public: bool,
    /// Date-like string, compared lexicographically
    pub start_date: String,
    /// Date-like string, compared lexicographically
    pub end_date: String,
    pub categories: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    /// Rendering order of sections
    #[serde(rename = "sectionIDs")]
    pub section_ids: Vec<ObjectId>,
    /// Rendering order of rooms, only meaningful for the live layout
    #[serde(rename = "roomIDs")]
    pub room_ids: Vec<ObjectId>,
    pub like_count: i64,
    pub like_list: BTreeSet<String>,
    pub visited_number: i64,
    pub owner: Owner,
}

impl Exhibition {
    /// Build a fresh root document from a creation request
    pub fn create(request: NewExhibition) -> Self {
        Self {
            id: ObjectId::new(),
            name: request.name,
            description: request.description,
            thumbnail: request.thumbnail,
            layout_used: request.layout_used,
            status: ExhibitionStatus::Created,
            is_public: request.is_public,
            start_date: request.start_date,
            end_date: request.end_date,
            categories: request.categories,
            tags: request.tags,
            section_ids: Vec::new(),
            room_ids: Vec::new(),
            like_count: 0,
            like_list: BTreeSet::new(),
            visited_number: 0,
            owner: request.owner,
        }
    }

    pub fn layout(&self) -> Layout {
        Layout::from_name(&self.layout_used)
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.like_list.contains(user_id)
    }

    /// Child ids for a kind, in rendering order
    pub fn child_ids(&self, kind: ChildKind) -> &[ObjectId] {
        match kind {
            ChildKind::Section => &self.section_ids,
            ChildKind::Room => &self.room_ids,
        }
    }

    /// Apply a partial update in place
    pub fn apply_patch(&mut self, patch: &ExhibitionPatch) {
        if let Some(ref v) = patch.name {
            self.name = v.clone();
        }
        if let Some(ref v) = patch.description {
            self.description = v.clone();
        }
        if let Some(ref v) = patch.thumbnail {
            self.thumbnail = v.clone();
        }
        if let Some(ref v) = patch.layout_used {
            self.layout_used = v.clone();
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.is_public {
            self.is_public = v;
        }
        if let Some(ref v) = patch.start_date {
            self.start_date = v.clone();
        }
        if let Some(ref v) = patch.end_date {
            self.end_date = v.clone();
        }
        if let Some(ref v) = patch.categories {
            self.categories = v.clone();
        }
        if let Some(ref v) = patch.tags {
            self.tags = v.clone();
        }
        if let Some(ref v) = patch.section_ids {
            self.section_ids = v.clone();
        }
        if let Some(ref v) = patch.room_ids {
            self.room_ids = v.clone();
        }
    }
}

/// Which child collection a reference list points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKind {
    Section,
    Room,
}

impl ChildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildKind::Section => "section",
            ChildKind::Room => "room",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creation request for an exhibition
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewExhibition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    pub layout_used: String,
    #[serde(default)]
    pub is_public: bool,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Filled from the authenticated caller, never from the body
    #[serde(skip)]
    pub owner: Owner,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub layout_used: Option<String>,
    pub status: Option<ExhibitionStatus>,
    pub is_public: Option<bool>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub categories: Option<BTreeSet<String>>,
    pub tags: Option<BTreeSet<String>>,
    #[serde(rename = "sectionIDs")]
    pub section_ids: Option<Vec<ObjectId>>,
    #[serde(rename = "roomIDs")]
    pub room_ids: Option<Vec<ObjectId>>,
}

impl ExhibitionPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Position of a section id within its parent's ordered list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInfo {
    pub index: usize,
    #[serde(rename = "sectionID")]
    pub section_id: ObjectId,
}

/// Root document plus composed children, as returned by `GetByID`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitionView {
    #[serde(flatten)]
    pub exhibition: Exhibition,
    /// Derived per caller at read time
    pub is_liked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rooms: Vec<Room>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Exhibition {
        Exhibition::create(NewExhibition {
            name: "Light".to_string(),
            layout_used: Layout::BLOG.to_string(),
            start_date: "2024-01-01T00:00:00.000Z".to_string(),
            end_date: "2024-02-01T00:00:00.000Z".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_create_starts_clean() {
        let ex = sample();
        assert_eq!(ex.status, ExhibitionStatus::Created);
        assert_eq!(ex.like_count, 0);
        assert!(ex.like_list.is_empty());
        assert!(ex.section_ids.is_empty());
        assert_eq!(ex.layout(), Layout::Blog);
    }

    #[test]
    fn test_layout_names() {
        assert_eq!(Layout::from_name("liveLayout"), Layout::Live);
        assert_eq!(Layout::from_name("gridLayout"), Layout::Other);
    }

    #[test]
    fn test_apply_patch_only_touches_present_fields() {
        let mut ex = sample();
        let patch = ExhibitionPatch {
            name: Some("Shadow".to_string()),
            is_public: Some(true),
            ..Default::default()
        };
        ex.apply_patch(&patch);

        assert_eq!(ex.name, "Shadow");
        assert!(ex.is_public);
        assert_eq!(ex.start_date, "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_status_round_trip_strings() {
        assert_eq!(ExhibitionStatus::try_from("banned"), Ok(ExhibitionStatus::Banned));
        assert!(ExhibitionStatus::try_from("archived").is_err());
    }

    #[test]
    fn test_view_serializes_wire_names() {
        let view = ExhibitionView {
            exhibition: sample(),
            is_liked: true,
            sections: Vec::new(),
            rooms: Vec::new(),
        };
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["isLiked"], true);
        assert!(json.get("sectionIDs").is_some());
        assert!(json.get("sections").is_none());
        assert_eq!(json["status"], "created");
    }
}
