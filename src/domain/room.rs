//! Exhibition rooms
//!
//! Spatial rooms rendered in order for the live layout. Each room has three
//! slots holding ordered preview items.

use serde::{Deserialize, Serialize};

use super::ObjectId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ContentBlock {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PreviewDetails {
    pub img: String,
    pub content: Vec<ContentBlock>,
}

/// Item shown in a room slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewItem {
    pub preview_type: String,
    pub src: String,
    pub details: PreviewDetails,
}

/// Room document as stored in its own collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: ObjectId,
    #[serde(rename = "exhibitionID")]
    pub exhibition_id: ObjectId,
    pub map_thumbnail: String,
    pub left: Vec<PreviewItem>,
    pub center: Vec<PreviewItem>,
    pub right: Vec<PreviewItem>,
}

/// Room content without identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoomContent {
    #[serde(rename = "exhibitionID")]
    pub exhibition_id: Option<ObjectId>,
    #[serde(default)]
    pub map_thumbnail: String,
    #[serde(default)]
    pub left: Vec<PreviewItem>,
    #[serde(default)]
    pub center: Vec<PreviewItem>,
    #[serde(default)]
    pub right: Vec<PreviewItem>,
}

impl Room {
    pub fn create(exhibition_id: ObjectId, content: RoomContent) -> Self {
        Self {
            id: ObjectId::new(),
            exhibition_id,
            map_thumbnail: content.map_thumbnail,
            left: content.left,
            center: content.center,
            right: content.right,
        }
    }

    pub fn replace_content(&mut self, content: RoomContent) {
        self.map_thumbnail = content.map_thumbnail;
        self.left = content.left;
        self.center = content.center;
        self.right = content.right;
    }
}
