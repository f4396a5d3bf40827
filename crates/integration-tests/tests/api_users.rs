mod common;

use axum::http::StatusCode;
use common::{spawn_app, token};
use serde_json::json;

#[tokio::test]
async fn saving_toggles_symmetrically() {
    let app = spawn_app();
    app.seed_user("user_ann", "ann").await;
    let ann = token("user_ann", false);
    let post = app.create_post(&ann, "Bookmark me").await;
    let body = json!({ "postId": post["_id"] });

    let res = app.get("/users/saved", &ann).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!([]));

    let res = app.patch("/users/save", &ann, body.clone()).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "Post saved");
    assert_eq!(app.get("/users/saved", &ann).await.body, json!([post["_id"]]));

    let res = app.patch("/users/save", &ann, body).await;
    assert_eq!(res.body, "Post unsaved");
    assert_eq!(app.get("/users/saved", &ann).await.body, json!([]));
}

#[tokio::test]
async fn saving_an_unknown_post_is_not_found() {
    let app = spawn_app();
    app.seed_user("user_ann", "ann").await;
    let res = app
        .patch(
            "/users/save",
            &token("user_ann", false),
            json!({ "postId": uuid::Uuid::now_v7() }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_post_id_is_a_bad_request() {
    let app = spawn_app();
    app.seed_user("user_ann", "ann").await;
    let res = app
        .patch("/users/save", &token("user_ann", false), json!({ "postId": "abc" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn saved_list_needs_a_synced_user() {
    let app = spawn_app();
    let res = app.get("/users/saved", &token("user_ghost", false)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body, "User not found!");
}
