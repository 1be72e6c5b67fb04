//! API integration tests over the in-memory store

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use exhibition_service::domain::ObjectId;
use exhibition_service::store::{ExhibitionCollection, SectionCollection};

mod common;

use common::{blog, json_body, Fixture, FUTURE_END, PAST_START};

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn as_user(method: &str, uri: &str, user_id: &str, role: &str, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Request-User-Id", user_id)
        .header("X-Request-User-Role", role)
        .header("X-Request-User-Username", "ada");
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

#[tokio::test]
async fn test_exhibition_lifecycle_e2e() {
    let fx = Fixture::new();
    let app = fx.app();

    // 1. Create as an authenticated user
    let response = app
        .clone()
        .oneshot(as_user(
            "POST",
            "/exhibitions",
            "owner-9",
            "user",
            Some(json!({
                "name": "Spring show",
                "layoutUsed": "blogLayout",
                "isPublic": true,
                "startDate": PAST_START,
                "endDate": FUTURE_END,
                "categories": ["art"]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED, "Exhibition creation failed");
    let id = json_body(response).await["id"].as_str().unwrap().to_string();
    let oid = ObjectId::parse_str(&id).unwrap();

    // 2. Add two sections through the API
    for title in ["first", "second"] {
        let response = app
            .clone()
            .oneshot(as_user(
                "POST",
                "/sections",
                "owner-9",
                "user",
                Some(json!({ "exhibitionID": id, "title": title })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED, "Section creation failed");
    }

    // 3. Like it
    let response = app
        .clone()
        .oneshot(as_user("POST", &format!("/exhibitions/{}/like", id), "fan-1", "user", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // 4. Read it back as the fan
    let response = app
        .clone()
        .oneshot(as_user("GET", &format!("/exhibitions/{}", id), "fan-1", "user", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view = json_body(response).await;
    assert_eq!(view["owner"]["userId"], "owner-9");
    assert_eq!(view["isLiked"], true);
    assert_eq!(view["likeCount"], 1);
    assert_eq!(view["sections"][0]["title"], "first");
    assert_eq!(view["sections"][1]["title"], "second");

    // The read counted a visit
    let stored = fx.store.exhibitions.find_by_id(oid).await.unwrap().unwrap();
    assert_eq!(stored.visited_number, 1);

    // 5. Delete, then it is gone
    let response = app
        .clone()
        .oneshot(as_user("DELETE", &format!("/exhibitions/{}", id), "owner-9", "user", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(fx.store.sections.is_empty());

    let response = app
        .clone()
        .oneshot(get(&format!("/exhibitions/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_requires_caller() {
    let fx = Fixture::new();
    let request = Request::builder()
        .method("POST")
        .uri("/exhibitions")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "name": "Anonymous",
                "layoutUsed": "blogLayout",
                "startDate": PAST_START,
                "endDate": FUTURE_END
            })
            .to_string(),
        ))
        .unwrap();

    let response = fx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(fx.store.exhibitions.is_empty());
}

#[tokio::test]
async fn test_invalid_identifier_is_bad_request() {
    let fx = Fixture::new();
    let response = fx.app().oneshot(get("/exhibitions/not-an-id")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error_code"], "invalid_identifier");
}

#[tokio::test]
async fn test_missing_exhibition_is_not_found() {
    let fx = Fixture::new();
    let uri = format!("/exhibitions/{}", ObjectId::new().to_hex());
    let response = fx.app().oneshot(get(&uri)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error_code"], "not_found");
}

#[tokio::test]
async fn test_dangling_reference_is_conflict() {
    let fx = Fixture::new();
    let id = fx.exhibition(blog(), PAST_START, FUTURE_END).await;
    let section = fx.section(id, "lost").await;
    fx.store.sections.delete_by_id(section).await.unwrap();

    let uri = format!("/exhibitions/{}", id.to_hex());
    let response = fx.app().oneshot(get(&uri)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error_code"], "child_not_found");
    assert_eq!(body["details"], section.to_hex());
}

#[tokio::test]
async fn test_like_requires_caller() {
    let fx = Fixture::new();
    let id = fx.exhibition(blog(), PAST_START, FUTURE_END).await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/exhibitions/{}/like", id.to_hex()))
        .body(Body::empty())
        .unwrap();
    let response = fx.app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ban_is_admin_only() {
    let fx = Fixture::new();
    let app = fx.app();
    let id = fx.exhibition(blog(), PAST_START, FUTURE_END).await;
    let uri = format!("/exhibitions/{}/ban", id.to_hex());

    let response = app
        .clone()
        .oneshot(as_user("POST", &uri, "user-1", "user", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(as_user("POST", &uri, "admin-1", "admin", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Banned exhibitions drop out of public listings
    let response = app.oneshot(get("/exhibitions/public")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn test_filter_requires_category() {
    let fx = Fixture::new();
    fx.exhibition(blog(), PAST_START, FUTURE_END).await;
    let app = fx.app();

    let response = app.clone().oneshot(get("/exhibitions/filter")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get("/exhibitions/filter?category=art&status=current&sortOrder=desc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_section_without_parent_is_unprocessable() {
    let fx = Fixture::new();
    let response = fx
        .app()
        .oneshot(as_user(
            "POST",
            "/sections",
            "owner-1",
            "user",
            Some(json!({ "title": "orphan" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(fx.store.sections.is_empty());
}
