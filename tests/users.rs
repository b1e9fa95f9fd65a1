mod common;

use axum::http::StatusCode;
use common::{location, TestApp, PASSWORD};
use serde_json::json;
use time::OffsetDateTime;

#[tokio::test]
async fn registering_signs_the_user_in() {
    let app = TestApp::new().await;
    let mut client = app.client();

    let response = client.register("colt").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/campgrounds");

    let page = client.page("/campgrounds").await;
    assert_eq!(page["view"], "campgrounds/index");
    assert_eq!(page["current_user"]["username"], "colt");
    assert!(page["current_user"].get("password_hash").is_none());
    assert_eq!(page["flash"]["success"][0], "Welcome to Yelp Camp!");
}

#[tokio::test]
async fn flash_messages_show_once() {
    let app = TestApp::new().await;
    let mut client = app.signed_in("colt").await;

    let first = client.page("/campgrounds").await;
    assert_eq!(first["flash"]["success"].as_array().unwrap().len(), 1);

    let second = client.page("/campgrounds").await;
    assert!(second["flash"]["success"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn taken_username_goes_back_to_the_form() {
    let app = TestApp::new().await;
    app.signed_in("colt").await;

    let mut other = app.client();
    let response = other.register("colt").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register");

    let page = other.page("/register").await;
    assert_eq!(page["view"], "users/register");
    assert!(page["current_user"].is_null());
    assert!(page["flash"]["error"][0]
        .as_str()
        .unwrap()
        .contains("already registered"));
    assert_eq!(app.users().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn incomplete_registration_is_a_validation_error() {
    let app = TestApp::new().await;
    let mut client = app.client();

    let response = client
        .post_form("/register", &[("username", "colt"), ("password", "pw")])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = common::json(response).await;
    assert_eq!(body["view"], "error");
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["details"][0]["field"], "email");
    assert!(app.users().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn login_returns_to_the_page_that_asked_for_it() {
    let app = TestApp::new().await;
    app.signed_in("colt").await;

    let mut client = app.client();
    let response = client.get("/campgrounds/new").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let login_page = client.page("/login").await;
    assert_eq!(
        login_page["flash"]["error"][0],
        "You must be signed in first!"
    );

    let response = client.login("colt", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/campgrounds/new");

    let page = client.page("/campgrounds/new").await;
    assert_eq!(page["view"], "campgrounds/new");
    assert_eq!(page["flash"]["success"][0], "Welcome back!");
}

#[tokio::test]
async fn login_without_a_remembered_page_lands_on_the_index() {
    let app = TestApp::new().await;
    app.signed_in("colt").await;

    let mut client = app.client();
    let response = client.login("colt", PASSWORD).await;
    assert_eq!(location(&response), "/campgrounds");
}

#[tokio::test]
async fn bad_credentials_are_refused() {
    let app = TestApp::new().await;
    app.signed_in("colt").await;

    let mut client = app.client();
    for (username, password) in [("colt", "wrong"), ("nobody", PASSWORD)] {
        let response = client.login(username, password).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    let page = client.page("/login").await;
    assert!(page["current_user"].is_null());
    assert_eq!(page["flash"]["error"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn logout_forgets_the_user() {
    let app = TestApp::new().await;
    let mut client = app.signed_in("colt").await;

    let response = client.get("/logout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/campgrounds");

    let page = client.page("/campgrounds").await;
    assert!(page["current_user"].is_null());
    assert!(page["flash"]["success"]
        .as_array()
        .unwrap()
        .iter()
        .any(|message| message == "Goodbye!"));
}

#[tokio::test]
async fn home_health_and_docs_are_served() {
    let app = TestApp::new().await;
    let mut client = app.client();

    let home = client.page("/").await;
    assert_eq!(home["view"], "home");

    let health = client.get("/healthz").await;
    assert_eq!(health.status(), StatusCode::OK);
    assert!(health.headers().contains_key("x-request-id"));

    let docs = client.page("/docs/openapi.json").await;
    assert!(docs["paths"]["/campgrounds/{id}/reviews/{review_id}"]["delete"].is_object());
    assert!(docs["paths"]["/register"]["post"].is_object());
}

#[tokio::test]
async fn unknown_routes_render_the_error_view() {
    let app = TestApp::new().await;
    let response = app.client().get("/nowhere").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = common::json(response).await;
    assert_eq!(body["error"]["message"], "Page Not Found");
}

#[tokio::test]
async fn an_unreadable_session_is_anonymous_and_can_sign_in_again() {
    let app = TestApp::new().await;
    let mut client = app.signed_in("colt").await;
    app.rewrite_sessions(|_| json!({"garbage": 1})).await;

    let response = client.get("/campgrounds/new").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = client.login("colt", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/campgrounds/new");
    let page = client.page("/campgrounds/new").await;
    assert_eq!(page["current_user"]["username"], "colt");

    app.rewrite_sessions(|_| json!({"garbage": 1})).await;
    let page = client.page("/campgrounds").await;
    assert!(page["current_user"].is_null());
}

#[tokio::test]
async fn an_expired_session_is_anonymous() {
    let app = TestApp::new().await;
    let mut client = app.signed_in("colt").await;
    app.rewrite_sessions(|mut document| {
        document["expires_at"] = json!(OffsetDateTime::now_utc().unix_timestamp() - 60);
        document
    })
    .await;

    let response = client.get("/campgrounds/new").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn a_tampered_session_cookie_is_anonymous() {
    let app = TestApp::new().await;
    let mut client = app.signed_in("colt").await;
    let mut cookie = client.cookie().unwrap().to_string();
    let last = cookie.pop().unwrap();
    cookie.push(if last == 'A' { 'B' } else { 'A' });
    client.set_cookie(cookie);

    let page = client.page("/campgrounds").await;
    assert!(page["current_user"].is_null());

    let response = client.get("/campgrounds/new").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}
