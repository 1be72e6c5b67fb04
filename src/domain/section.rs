//! Exhibition sections
//!
//! Content blocks rendered in order for the blog layout.

use serde::{Deserialize, Serialize};

use super::ObjectId;

/// One column of a two-column section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Column {
    pub content_type: String,
    pub image: String,
    pub description: String,
    pub title: String,
    pub text: String,
}

/// Section document as stored in its own collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: ObjectId,
    /// Back-reference to the owning exhibition
    #[serde(rename = "exhibitionID")]
    pub exhibition_id: ObjectId,
    pub section_type: String,
    pub content_type: String,
    pub title: String,
    pub text: String,
    pub background: String,
    pub images: Vec<String>,
    pub left_col: Column,
    pub right_col: Column,
}

/// Section content without identity, used for creation and replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SectionContent {
    #[serde(rename = "exhibitionID")]
    pub exhibition_id: Option<ObjectId>,
    #[serde(default)]
    pub section_type: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub left_col: Column,
    #[serde(default)]
    pub right_col: Column,
}

impl Section {
    pub fn create(exhibition_id: ObjectId, content: SectionContent) -> Self {
        let mut section = Self {
            id: ObjectId::new(),
            exhibition_id,
            section_type: String::new(),
            content_type: String::new(),
            title: String::new(),
            text: String::new(),
            background: String::new(),
            images: Vec::new(),
            left_col: Column::default(),
            right_col: Column::default(),
        };
        section.replace_content(content);
        section
    }

    /// Replace every content field; the parent link is kept
    pub fn replace_content(&mut self, content: SectionContent) {
        self.section_type = content.section_type;
        self.content_type = content.content_type;
        self.title = content.title;
        self.text = content.text;
        self.background = content.background;
        self.images = content.images;
        self.left_col = content.left_col;
        self.right_col = content.right_col;
    }
}
