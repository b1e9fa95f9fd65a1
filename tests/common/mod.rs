#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    middleware::map_request,
    response::Response,
    Router,
};
use serde_json::Value;
use tower::{Layer, ServiceExt};
use yelpcamp::modules::campgrounds::models::Campground;
use yelpcamp::modules::reviews::models::Review;
use yelpcamp::modules::users::models::User;
use yelpcamp::{images::MemoryImageStore, AppState};
use yelpcamp_db::{Collection, DocumentStore, MemoryStore, SESSIONS_COLLECTION};
use yelpcamp_http::method_override::rewrite_method;
use yelpcamp_kernel::settings::Settings;

pub const PASSWORD: &str = "correct horse battery staple";

/// The full application over in-memory backends
pub struct TestApp {
    router: Router,
    pub store: Arc<dyn DocumentStore>,
    pub images: Arc<MemoryImageStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let images = Arc::new(MemoryImageStore::new());
        let state = AppState::new(store.clone(), images.clone());
        let app = yelpcamp::build(state, &Settings::default()).await.unwrap();
        Self {
            router: app.router,
            store,
            images,
        }
    }

    /// A browser with its own cookie jar
    pub fn client(&self) -> Client {
        Client {
            router: self.router.clone(),
            cookie: None,
        }
    }

    pub fn campgrounds(&self) -> Collection<Campground> {
        Collection::new(self.store.clone())
    }

    pub fn reviews(&self) -> Collection<Review> {
        Collection::new(self.store.clone())
    }

    pub fn users(&self) -> Collection<User> {
        Collection::new(self.store.clone())
    }

    pub async fn user_id(&self, username: &str) -> String {
        self.users()
            .find_by("username", username)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    /// Overwrite every stored session document with `rewrite(document)`
    pub async fn rewrite_sessions(&self, rewrite: impl Fn(Value) -> Value) {
        for document in self.store.list(SESSIONS_COLLECTION).await.unwrap() {
            let id = document["id"].as_str().unwrap().to_string();
            self.store
                .replace(SESSIONS_COLLECTION, &id, rewrite(document))
                .await
                .unwrap();
        }
    }

    /// A client already registered (and so signed in) as `username`
    pub async fn signed_in(&self, username: &str) -> Client {
        let mut client = self.client();
        let response = client.register(username).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        client
    }
}

pub struct Client {
    router: Router,
    cookie: Option<String>,
}

impl Client {
    /// The `name=value` session cookie pair currently held
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn set_cookie(&mut self, cookie: impl Into<String>) {
        self.cookie = Some(cookie.into());
    }

    /// Send through method override like the real server, keeping the session cookie
    pub async fn send(&mut self, mut request: Request<Body>) -> Response {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let service = map_request(rewrite_method).layer(self.router.clone());
        let response = service.oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        response
    }

    pub async fn get(&mut self, uri: &str) -> Response {
        self.send(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// GET a page and return its view document
    pub async fn page(&mut self, uri: &str) -> Value {
        let response = self.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
        json(response).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response {
        self.form(Method::POST, uri, fields).await
    }

    pub async fn form(&mut self, method: Method, uri: &str, fields: &[(&str, &str)]) -> Response {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    pub async fn multipart(&mut self, method: Method, uri: &str, form: MultipartForm) -> Response {
        let (content_type, body) = form.finish();
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&mut self, uri: &str) -> Response {
        self.send(
            Request::builder()
                .method(Method::DELETE)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn register(&mut self, username: &str) -> Response {
        let email = format!("{}@example.com", username);
        self.post_form(
            "/register",
            &[
                ("username", username),
                ("email", email.as_str()),
                ("password", PASSWORD),
            ],
        )
        .await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Response {
        self.post_form("/login", &[("username", username), ("password", password)])
            .await
    }

    /// Create a campground and return its id
    pub async fn create_campground(&mut self, form: MultipartForm) -> String {
        let response = self.multipart(Method::POST, "/campgrounds", form).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        location(&response)
            .strip_prefix("/campgrounds/")
            .unwrap()
            .to_string()
    }
}

fn encode(value: &str) -> String {
    let mut out = String::new();
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `multipart/form-data` body builder
pub struct MultipartForm {
    boundary: &'static str,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: "yelpcamp-test-boundary",
            body: Vec::new(),
        }
    }

    /// A complete, valid listing
    pub fn campground(title: &str) -> Self {
        Self::new()
            .text("title", title)
            .text("location", "Moab, Utah")
            .text("price", "25")
            .text("description", "Red rock views")
            .text("longitude", "-109.55")
            .text("latitude", "38.57")
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                self.boundary, name, filename
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}
