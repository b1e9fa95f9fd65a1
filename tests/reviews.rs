mod common;

use axum::http::StatusCode;
use common::{json, location, Client, MultipartForm, TestApp};

async fn review(client: &mut Client, campground_id: &str, body: &str, rating: &str) -> String {
    let response = client
        .post_form(
            &format!("/campgrounds/{}/reviews", campground_id),
            &[("body", body), ("rating", rating)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    location(&response)
}

#[tokio::test]
async fn reviews_appear_on_the_campground_page() {
    let app = TestApp::new().await;
    let mut host = app.signed_in("colt").await;
    let id = host
        .create_campground(MultipartForm::campground("Ridge Camp"))
        .await;

    let mut guest = app.signed_in("sam").await;
    let target = review(&mut guest, &id, "Quiet and clean", "4").await;
    assert_eq!(target, format!("/campgrounds/{}", id));

    let page = guest.page(&target).await;
    let reviews = page["campground"]["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["body"], "Quiet and clean");
    assert_eq!(reviews[0]["rating"], 4);
    assert_eq!(reviews[0]["author"]["username"], "sam");
    assert!(page["flash"]["success"]
        .as_array()
        .unwrap()
        .iter()
        .any(|message| message == "Created new review!"));

    let camp = app.campgrounds().get(&id).await.unwrap().unwrap();
    assert_eq!(camp.reviews.len(), 1);
}

#[tokio::test]
async fn nested_field_names_are_accepted() {
    let app = TestApp::new().await;
    let mut client = app.signed_in("colt").await;
    let id = client
        .create_campground(MultipartForm::campground("Ridge Camp"))
        .await;

    let response = client
        .post_form(
            &format!("/campgrounds/{}/reviews", id),
            &[("review[body]", "Windy"), ("review[rating]", "2")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.reviews().list().await.unwrap()[0].rating, 2);
}

#[tokio::test]
async fn invalid_reviews_are_rejected() {
    let app = TestApp::new().await;
    let mut client = app.signed_in("colt").await;
    let id = client
        .create_campground(MultipartForm::campground("Ridge Camp"))
        .await;

    for (body, rating) in [("", "3"), ("Too good", "6"), ("Meh", "2.5")] {
        let response = client
            .post_form(
                &format!("/campgrounds/{}/reviews", id),
                &[("body", body), ("rating", rating)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}/{rating}");
    }

    assert!(app.reviews().list().await.unwrap().is_empty());
    let camp = app.campgrounds().get(&id).await.unwrap().unwrap();
    assert!(camp.reviews.is_empty());
}

#[tokio::test]
async fn reviewing_a_missing_campground_is_not_found() {
    let app = TestApp::new().await;
    let mut client = app.signed_in("colt").await;

    let response = client
        .post_form(
            "/campgrounds/missing/reviews",
            &[("body", "Hello"), ("rating", "3")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.reviews().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn anonymous_reviews_go_to_login() {
    let app = TestApp::new().await;
    let mut host = app.signed_in("colt").await;
    let id = host
        .create_campground(MultipartForm::campground("Ridge Camp"))
        .await;

    let response = app
        .client()
        .post_form(
            &format!("/campgrounds/{}/reviews", id),
            &[("body", "Sneaky"), ("rating", "5")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert!(app.reviews().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn review_author_or_campground_author_may_delete() {
    let app = TestApp::new().await;
    let mut host = app.signed_in("colt").await;
    let id = host
        .create_campground(MultipartForm::campground("Ridge Camp"))
        .await;
    let mut guest = app.signed_in("sam").await;
    let mut stranger = app.signed_in("mallory").await;

    review(&mut guest, &id, "First visit", "5").await;
    review(&mut guest, &id, "Second visit", "3").await;
    let camp = app.campgrounds().get(&id).await.unwrap().unwrap();
    let (first, second) = (camp.reviews[0].clone(), camp.reviews[1].clone());

    let response = stranger
        .delete(&format!("/campgrounds/{}/reviews/{}", id, first))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json(response).await;
    assert_eq!(body["error"]["code"], "forbidden");
    assert_eq!(app.reviews().list().await.unwrap().len(), 2);

    let response = guest
        .delete(&format!("/campgrounds/{}/reviews/{}", id, first))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = host
        .delete(&format!("/campgrounds/{}/reviews/{}", id, second))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    assert!(app.reviews().list().await.unwrap().is_empty());
    let camp = app.campgrounds().get(&id).await.unwrap().unwrap();
    assert!(camp.reviews.is_empty());
}

#[tokio::test]
async fn reviews_are_scoped_to_their_campground() {
    let app = TestApp::new().await;
    let mut host = app.signed_in("colt").await;
    let reviewed = host
        .create_campground(MultipartForm::campground("Ridge Camp"))
        .await;
    let other = host
        .create_campground(MultipartForm::campground("Lake Camp"))
        .await;

    review(&mut host, &reviewed, "Nice", "4").await;
    let review_id = app.reviews().list().await.unwrap()[0].id.clone();

    let response = host
        .delete(&format!("/campgrounds/{}/reviews/{}", other, review_id))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.reviews().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_reviews_are_not_found_before_ownership_is_checked() {
    let app = TestApp::new().await;
    let mut host = app.signed_in("colt").await;
    let id = host
        .create_campground(MultipartForm::campground("Ridge Camp"))
        .await;
    review(&mut host, &id, "Nice", "4").await;
    let mut stranger = app.signed_in("mallory").await;

    let response = stranger
        .delete(&format!("/campgrounds/{}/reviews/missing", id))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json(response).await;
    assert_eq!(body["error"]["message"], "Cannot find that review!");

    let response = stranger.delete("/campgrounds/missing/reviews/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(app.reviews().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn anonymous_review_deletion_goes_to_login() {
    let app = TestApp::new().await;
    let mut host = app.signed_in("colt").await;
    let id = host
        .create_campground(MultipartForm::campground("Ridge Camp"))
        .await;
    review(&mut host, &id, "Nice", "4").await;
    let review_id = app.reviews().list().await.unwrap()[0].id.clone();

    let response = app
        .client()
        .delete(&format!("/campgrounds/{}/reviews/{}", id, review_id))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    assert_eq!(app.reviews().list().await.unwrap().len(), 1);
    let camp = app.campgrounds().get(&id).await.unwrap().unwrap();
    assert_eq!(camp.reviews, vec![review_id]);
}
