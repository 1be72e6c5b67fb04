//! Domain module
//!
//! Core domain types: the exhibition aggregate, its child documents,
//! identifiers and the caller context.

pub mod clock;
pub mod context;
pub mod error;
pub mod exhibition;
pub mod object_id;
pub mod room;
pub mod section;

pub use clock::Clock;
pub use context::CallerContext;
pub use error::{DomainError, EntityKind};
pub use exhibition::{
    ChildKind, Exhibition, ExhibitionPatch, ExhibitionStatus, ExhibitionView, Layout,
    NewExhibition, Owner, SectionInfo,
};
pub use object_id::{IdError, ObjectId};
pub use room::{ContentBlock, PreviewDetails, PreviewItem, Room, RoomContent};
pub use section::{Column, Section, SectionContent};

/// Decode an external identifier, mapping failures to `InvalidIdentifier`
pub fn parse_id(value: &str) -> Result<ObjectId, DomainError> {
    ObjectId::parse_str(value).map_err(|e| DomainError::invalid_identifier(value, e))
}
