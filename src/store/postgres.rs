//! PostgreSQL collections
//!
//! One table per collection, identifiers stored as their 24-character hex
//! form. Every method issues exactly one statement; conditional updates use a
//! data-modifying CTE so the match and the change are read in one round trip.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::domain::{
    ChildKind, Column, Exhibition, ExhibitionPatch, ExhibitionStatus, ObjectId, Owner,
    PreviewItem, Room, RoomContent, Section, SectionContent,
};
use crate::query::{DateWindow, ExhibitionQuery};

use super::{
    CommentCollection, ExhibitionCollection, RoomCollection, SectionCollection, StoreError,
    UpdateResult,
};

const EXHIBITION_COLUMNS: &str = "id, name, description, thumbnail, layout_used, status, \
    is_public, start_date, end_date, categories, tags, section_ids, room_ids, like_count, \
    like_list, visited_number, owner";

const SECTION_COLUMNS: &str = "id, exhibition_id, section_type, content_type, title, text, \
    background, images, left_col, right_col";

const ROOM_COLUMNS: &str = "id, exhibition_id, map_thumbnail, left_slot, center_slot, right_slot";

fn decode_id(owner: &str, value: &str) -> Result<ObjectId, StoreError> {
    ObjectId::parse_str(value).map_err(|e| StoreError::corrupt(owner, e))
}

fn decode_ids(owner: &str, values: &[String]) -> Result<Vec<ObjectId>, StoreError> {
    values.iter().map(|v| decode_id(owner, v)).collect()
}

fn encode_ids(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(ObjectId::to_hex).collect()
}

fn child_column(kind: ChildKind) -> &'static str {
    match kind {
        ChildKind::Section => "section_ids",
        ChildKind::Room => "room_ids",
    }
}

// =========================================================================
// Exhibitions
// =========================================================================

#[derive(Debug, FromRow)]
struct ExhibitionRow {
    id: String,
    name: String,
    description: String,
    thumbnail: String,
    layout_used: String,
    status: String,
    is_public: bool,
    start_date: String,
    end_date: String,
    categories: Vec<String>,
    tags: Vec<String>,
    section_ids: Vec<String>,
    room_ids: Vec<String>,
    like_count: i64,
    like_list: Vec<String>,
    visited_number: i64,
    owner: Json<Owner>,
}

impl TryFrom<ExhibitionRow> for Exhibition {
    type Error = StoreError;

    fn try_from(row: ExhibitionRow) -> Result<Self, Self::Error> {
        let id = decode_id(&row.id, &row.id)?;
        let status = ExhibitionStatus::try_from(row.status.as_str())
            .map_err(|e| StoreError::corrupt(&row.id, e))?;

        Ok(Self {
            id,
            name: row.name,
            description: row.description,
            thumbnail: row.thumbnail,
            layout_used: row.layout_used,
            status,
            is_public: row.is_public,
            start_date: row.start_date,
            end_date: row.end_date,
            categories: row.categories.into_iter().collect(),
            tags: row.tags.into_iter().collect(),
            section_ids: decode_ids(&row.id, &row.section_ids)?,
            room_ids: decode_ids(&row.id, &row.room_ids)?,
            like_count: row.like_count,
            like_list: row.like_list.into_iter().collect(),
            visited_number: row.visited_number,
            owner: row.owner.0,
        })
    }
}

/// Exhibition table
#[derive(Debug, Clone)]
pub struct PgExhibitions {
    pool: PgPool,
}

impl PgExhibitions {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply `set` to the row only when `condition` holds, reporting whether
    /// the row exists and whether it changed
    async fn conditional_update(
        &self,
        set: &str,
        condition: &str,
        id: ObjectId,
        value: &str,
    ) -> Result<UpdateResult, StoreError> {
        let sql = format!(
            r#"
            WITH target AS (
                SELECT 1 FROM exhibitions WHERE id = $1
            ),
            changed AS (
                UPDATE exhibitions SET {set}
                WHERE id = $1 AND {condition}
                RETURNING 1
            )
            SELECT (SELECT COUNT(*) FROM target), (SELECT COUNT(*) FROM changed)
            "#
        );

        let (matched, modified): (i64, i64) = sqlx::query_as(&sql)
            .bind(id.to_hex())
            .bind(value)
            .fetch_one(&self.pool)
            .await?;

        Ok(UpdateResult::new(matched as u64, modified as u64))
    }

    /// Unconditional update; PostgreSQL counts every matched row as modified
    async fn update_one(&self, sql: &str, id: ObjectId) -> Result<UpdateResult, StoreError> {
        let rows = sqlx::query(sql)
            .bind(id.to_hex())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(UpdateResult::new(rows, rows))
    }
}

fn push_window(qb: &mut QueryBuilder<'_, Postgres>, window: &DateWindow) {
    match window {
        DateWindow::Current { now } => {
            qb.push(" AND start_date <> '' AND end_date <> '' AND start_date <= ")
                .push_bind(now.clone())
                .push(" AND end_date >= ")
                .push_bind(now.clone());
        }
        DateWindow::Previous { now } => {
            qb.push(" AND end_date <> '' AND end_date < ")
                .push_bind(now.clone());
        }
        DateWindow::Upcoming { now } => {
            qb.push(" AND start_date <> '' AND start_date > ")
                .push_bind(now.clone());
        }
    }
}

#[async_trait]
impl ExhibitionCollection for PgExhibitions {
    async fn insert(&self, exhibition: &Exhibition) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO exhibitions (
                id, name, description, thumbnail, layout_used, status,
                is_public, start_date, end_date, categories, tags,
                section_ids, room_ids, like_count, like_list, visited_number, owner
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(exhibition.id.to_hex())
        .bind(&exhibition.name)
        .bind(&exhibition.description)
        .bind(&exhibition.thumbnail)
        .bind(&exhibition.layout_used)
        .bind(exhibition.status.as_str())
        .bind(exhibition.is_public)
        .bind(&exhibition.start_date)
        .bind(&exhibition.end_date)
        .bind(exhibition.categories.iter().cloned().collect::<Vec<_>>())
        .bind(exhibition.tags.iter().cloned().collect::<Vec<_>>())
        .bind(encode_ids(&exhibition.section_ids))
        .bind(encode_ids(&exhibition.room_ids))
        .bind(exhibition.like_count)
        .bind(exhibition.like_list.iter().cloned().collect::<Vec<_>>())
        .bind(exhibition.visited_number)
        .bind(Json(exhibition.owner.clone()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Exhibition>, StoreError> {
        let row: Option<ExhibitionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM exhibitions WHERE id = $1",
            EXHIBITION_COLUMNS
        ))
        .bind(id.to_hex())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Exhibition::try_from).transpose()
    }

    async fn find(&self, query: &ExhibitionQuery) -> Result<Vec<Exhibition>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM exhibitions WHERE TRUE",
            EXHIBITION_COLUMNS
        ));

        if let Some(ref category) = query.category {
            qb.push(" AND ")
                .push_bind(category.clone())
                .push(" = ANY(categories)");
        }
        if query.public_only {
            qb.push(" AND is_public = TRUE");
        }
        if let Some(status) = query.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(ref owner_id) = query.owner_id {
            qb.push(" AND owner->>'userId' = ")
                .push_bind(owner_id.clone());
        }
        if let Some(ref window) = query.window {
            push_window(&mut qb, window);
        }

        qb.push(" ORDER BY start_date ")
            .push(query.sort.as_sql())
            .push(", id COLLATE \"C\" ASC");

        let rows: Vec<ExhibitionRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        rows.into_iter().map(Exhibition::try_from).collect()
    }

    async fn update_fields(
        &self,
        id: ObjectId,
        patch: &ExhibitionPatch,
    ) -> Result<UpdateResult, StoreError> {
        if patch.is_empty() {
            let exists = self.find_by_id(id).await?.is_some();
            return Ok(UpdateResult::new(u64::from(exists), 0));
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE exhibitions SET ");
        let mut set = qb.separated(", ");

        if let Some(ref v) = patch.name {
            set.push("name = ").push_bind_unseparated(v.clone());
        }
        if let Some(ref v) = patch.description {
            set.push("description = ").push_bind_unseparated(v.clone());
        }
        if let Some(ref v) = patch.thumbnail {
            set.push("thumbnail = ").push_bind_unseparated(v.clone());
        }
        if let Some(ref v) = patch.layout_used {
            set.push("layout_used = ").push_bind_unseparated(v.clone());
        }
        if let Some(v) = patch.status {
            set.push("status = ").push_bind_unseparated(v.as_str());
        }
        if let Some(v) = patch.is_public {
            set.push("is_public = ").push_bind_unseparated(v);
        }
        if let Some(ref v) = patch.start_date {
            set.push("start_date = ").push_bind_unseparated(v.clone());
        }
        if let Some(ref v) = patch.end_date {
            set.push("end_date = ").push_bind_unseparated(v.clone());
        }
        if let Some(ref v) = patch.categories {
            set.push("categories = ")
                .push_bind_unseparated(v.iter().cloned().collect::<Vec<_>>());
        }
        if let Some(ref v) = patch.tags {
            set.push("tags = ")
                .push_bind_unseparated(v.iter().cloned().collect::<Vec<_>>());
        }
        if let Some(ref v) = patch.section_ids {
            set.push("section_ids = ").push_bind_unseparated(encode_ids(v));
        }
        if let Some(ref v) = patch.room_ids {
            set.push("room_ids = ").push_bind_unseparated(encode_ids(v));
        }

        qb.push(" WHERE id = ").push_bind(id.to_hex());

        let rows = qb.build().execute(&self.pool).await?.rows_affected();
        Ok(UpdateResult::new(rows, rows))
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM exhibitions WHERE id = $1")
            .bind(id.to_hex())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn add_like(&self, id: ObjectId, user_id: &str) -> Result<UpdateResult, StoreError> {
        self.conditional_update(
            "like_list = array_append(like_list, $2), like_count = like_count + 1",
            "NOT ($2 = ANY(like_list))",
            id,
            user_id,
        )
        .await
    }

    async fn remove_like(
        &self,
        id: ObjectId,
        user_id: &str,
    ) -> Result<UpdateResult, StoreError> {
        self.conditional_update(
            "like_list = array_remove(like_list, $2), like_count = GREATEST(like_count - 1, 0)",
            "$2 = ANY(like_list)",
            id,
            user_id,
        )
        .await
    }

    async fn increment_visits(&self, id: ObjectId) -> Result<UpdateResult, StoreError> {
        self.update_one(
            "UPDATE exhibitions SET visited_number = visited_number + 1 WHERE id = $1",
            id,
        )
        .await
    }

    async fn set_status(
        &self,
        id: ObjectId,
        status: ExhibitionStatus,
    ) -> Result<UpdateResult, StoreError> {
        self.conditional_update("status = $2", "status <> $2", id, status.as_str())
            .await
    }

    async fn push_child(
        &self,
        id: ObjectId,
        kind: ChildKind,
        child_id: ObjectId,
    ) -> Result<UpdateResult, StoreError> {
        let column = child_column(kind);
        self.conditional_update(
            &format!("{column} = array_append({column}, $2)"),
            "TRUE",
            id,
            &child_id.to_hex(),
        )
        .await
    }

    async fn pull_child(
        &self,
        id: ObjectId,
        kind: ChildKind,
        child_id: ObjectId,
    ) -> Result<UpdateResult, StoreError> {
        let column = child_column(kind);
        self.conditional_update(
            &format!("{column} = array_remove({column}, $2)"),
            &format!("$2 = ANY({column})"),
            id,
            &child_id.to_hex(),
        )
        .await
    }

    async fn hide_ended(&self, now: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE exhibitions
            SET is_public = FALSE
            WHERE is_public = TRUE
              AND end_date <> ''
              AND end_date < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// =========================================================================
// Sections
// =========================================================================

#[derive(Debug, FromRow)]
struct SectionRow {
    id: String,
    exhibition_id: String,
    section_type: String,
    content_type: String,
    title: String,
    text: String,
    background: String,
    images: Vec<String>,
    left_col: Json<Column>,
    right_col: Json<Column>,
}

impl TryFrom<SectionRow> for Section {
    type Error = StoreError;

    fn try_from(row: SectionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: decode_id(&row.id, &row.id)?,
            exhibition_id: decode_id(&row.id, &row.exhibition_id)?,
            section_type: row.section_type,
            content_type: row.content_type,
            title: row.title,
            text: row.text,
            background: row.background,
            images: row.images,
            left_col: row.left_col.0,
            right_col: row.right_col.0,
        })
    }
}

/// Section table
#[derive(Debug, Clone)]
pub struct PgSections {
    pool: PgPool,
}

impl PgSections {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SectionCollection for PgSections {
    async fn insert(&self, section: &Section) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO exhibition_sections (
                id, exhibition_id, section_type, content_type, title, text,
                background, images, left_col, right_col
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(section.id.to_hex())
        .bind(section.exhibition_id.to_hex())
        .bind(&section.section_type)
        .bind(&section.content_type)
        .bind(&section.title)
        .bind(&section.text)
        .bind(&section.background)
        .bind(&section.images)
        .bind(Json(section.left_col.clone()))
        .bind(Json(section.right_col.clone()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Section>, StoreError> {
        let row: Option<SectionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM exhibition_sections WHERE id = $1",
            SECTION_COLUMNS
        ))
        .bind(id.to_hex())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Section::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Section>, StoreError> {
        let rows: Vec<SectionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM exhibition_sections ORDER BY id",
            SECTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Section::try_from).collect()
    }

    async fn find_by_exhibition(
        &self,
        exhibition_id: ObjectId,
    ) -> Result<Vec<Section>, StoreError> {
        let rows: Vec<SectionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM exhibition_sections WHERE exhibition_id = $1 ORDER BY id",
            SECTION_COLUMNS
        ))
        .bind(exhibition_id.to_hex())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Section::try_from).collect()
    }

    async fn replace_content(
        &self,
        id: ObjectId,
        content: &SectionContent,
    ) -> Result<UpdateResult, StoreError> {
        let rows = sqlx::query(
            r#"
            UPDATE exhibition_sections
            SET section_type = $2, content_type = $3, title = $4, text = $5,
                background = $6, images = $7, left_col = $8, right_col = $9
            WHERE id = $1
            "#,
        )
        .bind(id.to_hex())
        .bind(&content.section_type)
        .bind(&content.content_type)
        .bind(&content.title)
        .bind(&content.text)
        .bind(&content.background)
        .bind(&content.images)
        .bind(Json(content.left_col.clone()))
        .bind(Json(content.right_col.clone()))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(UpdateResult::new(rows, rows))
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM exhibition_sections WHERE id = $1")
            .bind(id.to_hex())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =========================================================================
// Rooms
// =========================================================================

#[derive(Debug, FromRow)]
struct RoomRow {
    id: String,
    exhibition_id: String,
    map_thumbnail: String,
    left_slot: Json<Vec<PreviewItem>>,
    center_slot: Json<Vec<PreviewItem>>,
    right_slot: Json<Vec<PreviewItem>>,
}

impl TryFrom<RoomRow> for Room {
    type Error = StoreError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: decode_id(&row.id, &row.id)?,
            exhibition_id: decode_id(&row.id, &row.exhibition_id)?,
            map_thumbnail: row.map_thumbnail,
            left: row.left_slot.0,
            center: row.center_slot.0,
            right: row.right_slot.0,
        })
    }
}

/// Room table
#[derive(Debug, Clone)]
pub struct PgRooms {
    pool: PgPool,
}

impl PgRooms {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomCollection for PgRooms {
    async fn insert(&self, room: &Room) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO exhibition_rooms (
                id, exhibition_id, map_thumbnail, left_slot, center_slot, right_slot
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(room.id.to_hex())
        .bind(room.exhibition_id.to_hex())
        .bind(&room.map_thumbnail)
        .bind(Json(room.left.clone()))
        .bind(Json(room.center.clone()))
        .bind(Json(room.right.clone()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Room>, StoreError> {
        let row: Option<RoomRow> = sqlx::query_as(&format!(
            "SELECT {} FROM exhibition_rooms WHERE id = $1",
            ROOM_COLUMNS
        ))
        .bind(id.to_hex())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Room::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Room>, StoreError> {
        let rows: Vec<RoomRow> = sqlx::query_as(&format!(
            "SELECT {} FROM exhibition_rooms ORDER BY id",
            ROOM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Room::try_from).collect()
    }

    async fn find_by_exhibition(&self, exhibition_id: ObjectId) -> Result<Vec<Room>, StoreError> {
        let rows: Vec<RoomRow> = sqlx::query_as(&format!(
            "SELECT {} FROM exhibition_rooms WHERE exhibition_id = $1 ORDER BY id",
            ROOM_COLUMNS
        ))
        .bind(exhibition_id.to_hex())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Room::try_from).collect()
    }

    async fn replace_content(
        &self,
        id: ObjectId,
        content: &RoomContent,
    ) -> Result<UpdateResult, StoreError> {
        let rows = sqlx::query(
            r#"
            UPDATE exhibition_rooms
            SET map_thumbnail = $2, left_slot = $3, center_slot = $4, right_slot = $5
            WHERE id = $1
            "#,
        )
        .bind(id.to_hex())
        .bind(&content.map_thumbnail)
        .bind(Json(content.left.clone()))
        .bind(Json(content.center.clone()))
        .bind(Json(content.right.clone()))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(UpdateResult::new(rows, rows))
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM exhibition_rooms WHERE id = $1")
            .bind(id.to_hex())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =========================================================================
// Comments (separate database)
// =========================================================================

/// Comment table in the comment service's database
#[derive(Debug, Clone)]
pub struct PgComments {
    pool: PgPool,
}

impl PgComments {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentCollection for PgComments {
    async fn count_by_exhibition(&self, exhibition_id: ObjectId) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE exhibition_id = $1")
            .bind(exhibition_id.to_hex())
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    async fn delete_by_exhibition(&self, exhibition_id: ObjectId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE exhibition_id = $1")
            .bind(exhibition_id.to_hex())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
