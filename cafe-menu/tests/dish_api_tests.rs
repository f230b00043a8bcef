//! Dish catalog API integration tests

mod helpers;

use axum::http::StatusCode;
use helpers::*;
use serde_json::{json, Value};

async fn create(app: &axum::Router, body: Value) -> Value {
    let (status, dish) = send(app, json_request("POST", "/api/dishes", body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", dish);
    dish
}

/// Test: Create, read, update and delete one dish
#[tokio::test]
async fn test_dish_crud_lifecycle() {
    let (app, _state) = test_app().await;

    let created = create(
        &app,
        json!({
            "name": "チーズケーキ",
            "category": "デザート",
            "price": 550,
            "keywords": ["cheesecake", "Cheesecake", "チーズ"]
        }),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["keywords"], json!(["cheesecake", "チーズ"]));
    assert_eq!(created["available"], true);

    let (status, fetched) = send(&app, get(&format!("/api/dishes/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "チーズケーキ");

    let (status, updated) = send(
        &app,
        json_request("PUT", &format!("/api/dishes/{}", id), json!({ "price": 600, "popular": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], 600);
    assert_eq!(updated["popular"], true);
    assert_eq!(updated["name"], "チーズケーキ");

    let (status, outcome) = send(&app, delete(&format!("/api/dishes/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["deleted_from_store"], true);
    assert_eq!(outcome["archived_in_cms"], false);

    let (status, _) = send(&app, get(&format!("/api/dishes/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(&app, get("/api/dishes")).await;
    assert_eq!(list["total"], 0);
}

/// Test: An explicit null clears an optional field; omitted fields stay
#[tokio::test]
async fn test_update_null_clears_optional_field() {
    let (app, _state) = test_app().await;
    let created = create(
        &app,
        json!({
            "name": "ブレンドコーヒー",
            "name_en": "Blend Coffee",
            "category": "ドリンク",
            "price": 420,
            "chef_comment": "深煎りの豆を使用"
        }),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        json_request("PUT", &format!("/api/dishes/{}", id), json!({ "name_en": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name_en"], Value::Null);
    assert_eq!(updated["price"], 420);
    assert_eq!(updated["chef_comment"], "深煎りの豆を使用");

    let (_, fetched) = send(&app, get(&format!("/api/dishes/{}", id))).await;
    assert_eq!(fetched["name_en"], Value::Null);
}

/// Test: Listing filters by category and availability
#[tokio::test]
async fn test_list_filters() {
    let (app, _state) = test_app().await;
    create(&app, json!({ "name": "ブレンドコーヒー", "category": "ドリンク" })).await;
    create(&app, json!({ "name": "抹茶ラテ", "category": "ドリンク", "available": false })).await;
    create(&app, json!({ "name": "ガトーショコラ", "category": "デザート" })).await;

    let (_, all) = send(&app, get("/api/dishes")).await;
    assert_eq!(all["total"], 3);

    let (_, drinks) = send(&app, get("/api/dishes?category=%E3%83%89%E3%83%AA%E3%83%B3%E3%82%AF")).await;
    assert_eq!(drinks["total"], 2);

    let (_, available_drinks) = send(
        &app,
        get("/api/dishes?category=%E3%83%89%E3%83%AA%E3%83%B3%E3%82%AF&available=true"),
    )
    .await;
    assert_eq!(available_drinks["total"], 1);
    assert_eq!(available_drinks["dishes"][0]["name"], "ブレンドコーヒー");
}

/// Test: Validation failures are 400s with the error body
#[tokio::test]
async fn test_create_validation() {
    let (app, _state) = test_app().await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/dishes", json!({ "name": " ", "category": "フード" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = send(
        &app,
        json_request("POST", "/api/dishes", json!({ "name": "トースト", "category": "フード", "price": -10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, json_request("POST", "/api/dishes", json!({ "name": "トースト" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Test: Only one dish may mirror a given CMS record
#[tokio::test]
async fn test_duplicate_notion_id_rejected() {
    let (app, _state) = test_app().await;
    let body = json!({ "name": "トースト", "category": "フード", "notion_id": "page-1" });

    create(&app, body.clone()).await;
    let (status, _) = send(&app, json_request("POST", "/api/dishes", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Test: Malformed ids and unknown dishes
#[tokio::test]
async fn test_bad_ids() {
    let (app, _state) = test_app().await;

    let (status, _) = send(&app, get("/api/dishes/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = uuid::Uuid::new_v4();
    let (status, body) = send(&app, get(&format!("/api/dishes/{}", missing))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(&app, delete(&format!("/api/dishes/{}", missing))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        json_request("PUT", &format!("/api/dishes/{}", missing), json!({ "price": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Test: Deleting by CMS id without a CMS removes the local row only
#[tokio::test]
async fn test_delete_by_notion_id_without_cms() {
    let (app, _state) = test_app().await;
    create(&app, json!({ "name": "トースト", "category": "フード", "notion_id": "page-9" })).await;

    let (status, outcome) = send(&app, delete("/api/dishes/notion/page-9")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["deleted_from_store"], true);
    assert_eq!(outcome["dish_name"], "トースト");

    let (status, _) = send(&app, delete("/api/dishes/notion/page-9")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Test: Search is case-insensitive, ranks by score and ignores stoplisted terms
#[tokio::test]
async fn test_search_dishes() {
    let (app, _state) = test_app().await;
    create(
        &app,
        json!({ "name": "Chocolate Cake", "category": "デザート", "keywords": ["dessert", "chocolate"] }),
    )
    .await;
    create(&app, json!({ "name": "Carrot Cake", "category": "デザート" })).await;
    create(&app, json!({ "name": "Iced Coffee", "category": "ドリンク" })).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/dishes/search", json!({ "keywords": ["CAKE", "Chocolate"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["dishes"][0]["name"], "Chocolate Cake");
    assert_eq!(body["dishes"][1]["name"], "Carrot Cake");
    assert!(body["dishes"][0]["score"].as_f64().unwrap() > body["dishes"][1]["score"].as_f64().unwrap());

    let (status, body) = send(
        &app,
        json_request("POST", "/api/dishes/search", json!({ "keywords": ["food", "plate"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

/// Test: Search needs at least one non-blank keyword
#[tokio::test]
async fn test_search_requires_keywords() {
    let (app, _state) = test_app().await;

    let (status, _) = send(
        &app,
        json_request("POST", "/api/dishes/search", json!({ "keywords": ["", "  "] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Test: The sample catalog is searchable once seeded
#[tokio::test]
async fn test_seeded_catalog_is_searchable() {
    let (app, state) = test_app().await;
    let added = cafe_menu::db::seed::seed_sample_dishes(&state.db).await.unwrap();
    assert_eq!(added, 3);

    let (_, list) = send(&app, get("/api/dishes")).await;
    assert_eq!(list["total"], 3);

    let (status, body) = send(
        &app,
        json_request("POST", "/api/dishes/search", json!({ "keywords": ["コーヒー"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dishes"][0]["name"], "ブレンドコーヒー");
}
