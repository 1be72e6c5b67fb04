//! API Routes
//!
//! HTTP endpoint definitions. Handlers translate requests into service calls
//! and nothing more.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::domain::{
    CallerContext, Exhibition, ExhibitionPatch, ExhibitionView, NewExhibition, ObjectId, Room,
    RoomContent, Section, SectionContent, SectionInfo,
};
use crate::error::{AppError, AppResult};
use crate::service::ExhibitionService;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: ExhibitionService,
}

impl AppState {
    pub fn new(service: ExhibitionService) -> Self {
        Self { service }
    }
}

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: ObjectId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub sort_order: String,
}

fn require_user(caller: &CallerContext) -> AppResult<&str> {
    caller.user_id.as_deref().ok_or(AppError::Unauthorized)
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Exhibition reads
        .route("/exhibitions", get(list_all).post(create_exhibition))
        .route("/exhibitions/public", get(list_public))
        .route("/exhibitions/current", get(list_current))
        .route("/exhibitions/previous", get(list_previous))
        .route("/exhibitions/upcoming", get(list_upcoming))
        .route("/exhibitions/filter", get(list_by_filter))
        .route("/exhibitions/category/:category", get(list_by_category))
        .route("/exhibitions/owner/:owner_id", get(list_by_owner))
        // Exhibition aggregate
        .route(
            "/exhibitions/:id",
            get(get_exhibition)
                .patch(update_exhibition)
                .delete(delete_exhibition),
        )
        .route("/exhibitions/:id/like", post(like_exhibition))
        .route("/exhibitions/:id/unlike", post(unlike_exhibition))
        .route("/exhibitions/:id/ban", post(ban_exhibition))
        .route("/exhibitions/:id/section-info", get(get_section_info))
        .route("/exhibitions/:id/sections", get(list_sections_by_exhibition))
        .route("/exhibitions/:id/rooms", get(list_rooms_by_exhibition))
        // Sections
        .route("/sections", get(list_sections).post(create_section))
        .route(
            "/sections/:id",
            get(get_section).put(update_section).delete(delete_section),
        )
        // Rooms
        .route("/rooms", get(list_rooms).post(create_room))
        .route(
            "/rooms/:id",
            get(get_room).put(update_room).delete(delete_room),
        )
}

// =========================================================================
// Exhibition lists
// =========================================================================

async fn list_all(State(state): State<AppState>) -> AppResult<Json<Vec<Exhibition>>> {
    Ok(Json(state.service.list_all().await?))
}

async fn list_public(State(state): State<AppState>) -> AppResult<Json<Vec<Exhibition>>> {
    Ok(Json(state.service.list_public().await?))
}

async fn list_current(State(state): State<AppState>) -> AppResult<Json<Vec<Exhibition>>> {
    Ok(Json(state.service.list_current().await?))
}

async fn list_previous(State(state): State<AppState>) -> AppResult<Json<Vec<Exhibition>>> {
    Ok(Json(state.service.list_previous().await?))
}

async fn list_upcoming(State(state): State<AppState>) -> AppResult<Json<Vec<Exhibition>>> {
    Ok(Json(state.service.list_upcoming().await?))
}

async fn list_by_filter(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> AppResult<Json<Vec<Exhibition>>> {
    if query.category.is_empty() {
        return Err(AppError::InvalidRequest("category is required".to_string()));
    }

    let exhibitions = state
        .service
        .list_by_filter(&query.category, &query.status, &query.sort_order)
        .await?;
    Ok(Json(exhibitions))
}

async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<Json<Vec<Exhibition>>> {
    Ok(Json(state.service.list_by_category(&category).await?))
}

async fn list_by_owner(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> AppResult<Json<Vec<Exhibition>>> {
    Ok(Json(state.service.list_by_owner(&owner_id).await?))
}

// =========================================================================
// Exhibition aggregate
// =========================================================================

/// Compose an exhibition for the caller, then count the visit
async fn get_exhibition(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> AppResult<Json<ExhibitionView>> {
    let view = state
        .service
        .get_by_id(&id, caller.user_id.as_deref())
        .await?;

    if let Err(e) = state.service.increment_visit_count(&id).await {
        tracing::warn!(exhibition_id = %id, error = %e, "Failed to count visit");
    }

    Ok(Json(view))
}

async fn create_exhibition(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(mut request): Json<NewExhibition>,
) -> AppResult<(StatusCode, Json<IdResponse>)> {
    request.owner = caller.owner().ok_or(AppError::Unauthorized)?;

    let id = state.service.create(request).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn update_exhibition(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ExhibitionPatch>,
) -> AppResult<Json<IdResponse>> {
    let id = state.service.update(&id, &patch).await?;
    Ok(Json(IdResponse { id }))
}

async fn delete_exhibition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn like_exhibition(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let user_id = require_user(&caller)?;
    state.service.like(&id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unlike_exhibition(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let user_id = require_user(&caller)?;
    state.service.unlike(&id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn ban_exhibition(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    require_user(&caller)?;
    if !caller.is_admin() {
        return Err(AppError::Forbidden(
            "only administrators can ban exhibitions".to_string(),
        ));
    }

    state.service.ban(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_section_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<SectionInfo>>> {
    Ok(Json(state.service.section_info(&id).await?))
}

async fn list_sections_by_exhibition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Section>>> {
    Ok(Json(state.service.list_sections_by_exhibition(&id).await?))
}

async fn list_rooms_by_exhibition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Room>>> {
    Ok(Json(state.service.list_rooms_by_exhibition(&id).await?))
}

// =========================================================================
// Sections
// =========================================================================

async fn list_sections(State(state): State<AppState>) -> AppResult<Json<Vec<Section>>> {
    Ok(Json(state.service.list_sections().await?))
}

async fn create_section(
    State(state): State<AppState>,
    Json(content): Json<SectionContent>,
) -> AppResult<(StatusCode, Json<IdResponse>)> {
    let id = state.service.create_section(content).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn get_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Section>> {
    Ok(Json(state.service.get_section(&id).await?))
}

async fn update_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(content): Json<SectionContent>,
) -> AppResult<Json<IdResponse>> {
    let id = state.service.update_section(&id, &content).await?;
    Ok(Json(IdResponse { id }))
}

async fn delete_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.service.delete_section(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Rooms
// =========================================================================

async fn list_rooms(State(state): State<AppState>) -> AppResult<Json<Vec<Room>>> {
    Ok(Json(state.service.list_rooms().await?))
}

async fn create_room(
    State(state): State<AppState>,
    Json(content): Json<RoomContent>,
) -> AppResult<(StatusCode, Json<IdResponse>)> {
    let id = state.service.create_room(content).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn get_room(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Room>> {
    Ok(Json(state.service.get_room(&id).await?))
}

async fn update_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(content): Json<RoomContent>,
) -> AppResult<Json<IdResponse>> {
    let id = state.service.update_room(&id, &content).await?;
    Ok(Json(IdResponse { id }))
}

async fn delete_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.service.delete_room(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
