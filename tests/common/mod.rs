//! Common test utilities

#![allow(dead_code)]

use axum::{body::Body, http::Response, middleware, Router};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use std::sync::{Mutex, MutexGuard};

use exhibition_service::api::{self, AppState};
use exhibition_service::domain::{
    Clock, Layout, NewExhibition, ObjectId, Owner, RoomContent, SectionContent,
};
use exhibition_service::store::{Collections, MemoryStore};
use exhibition_service::{AggregateRepository, ExhibitionService};

/// Instant every test clock is frozen at: 2024-06-15 12:00 UTC
pub fn fixed_clock() -> Clock {
    let at = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).single().unwrap_or_default();
    Clock::frozen(chrono_tz::UTC, at)
}

pub const PAST_START: &str = "2024-01-01T00:00:00.000Z";
pub const PAST_END: &str = "2024-02-01T00:00:00.000Z";
pub const FUTURE_START: &str = "2024-09-01T00:00:00.000Z";
pub const FUTURE_END: &str = "2024-10-01T00:00:00.000Z";

/// In-memory store plus a repository over it
pub struct Fixture {
    pub store: MemoryStore,
    pub repo: AggregateRepository,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let repo = AggregateRepository::new(Collections::from(&store), fixed_clock());
        Self { store, repo }
    }

    pub fn service(&self) -> ExhibitionService {
        ExhibitionService::new(self.repo.clone())
    }

    /// Router as mounted under `/api/v1`, with the caller middleware
    pub fn app(&self) -> Router {
        api::create_router()
            .layer(middleware::from_fn(api::middleware::caller_middleware))
            .with_state(AppState::new(self.service()))
    }

    pub async fn exhibition(&self, layout: &str, start: &str, end: &str) -> ObjectId {
        self.repo
            .create(new_exhibition(layout, start, end))
            .await
            .expect("create exhibition")
    }

    pub async fn section(&self, exhibition_id: ObjectId, title: &str) -> ObjectId {
        self.repo
            .create_section(SectionContent {
                exhibition_id: Some(exhibition_id),
                title: title.to_string(),
                ..Default::default()
            })
            .await
            .expect("create section")
    }

    pub async fn room(&self, exhibition_id: ObjectId, thumbnail: &str) -> ObjectId {
        self.repo
            .create_room(RoomContent {
                exhibition_id: Some(exhibition_id),
                map_thumbnail: thumbnail.to_string(),
                ..Default::default()
            })
            .await
            .expect("create room")
    }
}

pub fn owner() -> Owner {
    Owner {
        user_id: "owner-1".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lee".to_string(),
        username: "ada".to_string(),
        profile_image: String::new(),
    }
}

pub fn new_exhibition(layout: &str, start: &str, end: &str) -> NewExhibition {
    NewExhibition {
        name: format!("Exhibition {}", start),
        layout_used: layout.to_string(),
        is_public: true,
        start_date: start.to_string(),
        end_date: end.to_string(),
        categories: ["art".to_string()].into_iter().collect(),
        owner: owner(),
        ..Default::default()
    }
}

pub fn blog() -> &'static str {
    Layout::BLOG
}

pub fn live() -> &'static str {
    Layout::LIVE
}

/// Read a response body as JSON
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json body")
}

// =========================================================================
// PostgreSQL
// =========================================================================

/// Database tests share one schema, so they run one at a time
static DB_LOCK: Mutex<()> = Mutex::new(());

/// Repository over a real database, holding the database lock
pub struct PgFixture {
    pub pool: PgPool,
    pub repo: AggregateRepository,
    _guard: MutexGuard<'static, ()>,
}

/// Setup test database - apply migrations and truncate every table
///
/// Returns `None` when `DATABASE_URL` is not set, so the suite still runs
/// without a database.
pub async fn setup_test_db() -> Option<PgFixture> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
            return None;
        }
    };

    let guard = DB_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    pool.execute(include_str!("../../migrations/0001_exhibitions.sql"))
        .await
        .expect("Failed to apply exhibition schema");
    pool.execute(include_str!("../../migrations/0002_comments.sql"))
        .await
        .expect("Failed to apply comment schema");

    sqlx::query("TRUNCATE TABLE exhibitions, exhibition_sections, exhibition_rooms, comments")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    let repo = AggregateRepository::new(
        Collections::postgres(pool.clone(), pool.clone()),
        fixed_clock(),
    );

    Some(PgFixture {
        pool,
        repo,
        _guard: guard,
    })
}

impl PgFixture {
    pub async fn exhibition(&self, layout: &str, start: &str, end: &str) -> ObjectId {
        self.repo
            .create(new_exhibition(layout, start, end))
            .await
            .expect("create exhibition")
    }

    pub async fn section(&self, exhibition_id: ObjectId, title: &str) -> ObjectId {
        self.repo
            .create_section(SectionContent {
                exhibition_id: Some(exhibition_id),
                title: title.to_string(),
                ..Default::default()
            })
            .await
            .expect("create section")
    }

    /// Seed a comment row, standing in for the comment service
    pub async fn comment(&self, exhibition_id: ObjectId, content: &str) {
        sqlx::query("INSERT INTO comments (id, exhibition_id, content) VALUES ($1, $2, $3)")
            .bind(ObjectId::new().to_hex())
            .bind(exhibition_id.to_hex())
            .bind(content)
            .execute(&self.pool)
            .await
            .expect("seed comment");
    }
}
