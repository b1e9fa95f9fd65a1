//! Router builder for the YelpCamp HTTP server

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::Request,
    handler::Handler,
    http::{header, HeaderName, HeaderValue},
    response::IntoResponse,
    routing::{get, Route},
    Router,
};
use tower::{Layer, Service};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::{Timestamp, Uuid};

use yelpcamp_kernel::ModuleRegistry;

/// Builder for constructing the main HTTP router
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router at `path`; `"/"` merges it into the root
    pub fn mount_module(mut self, path: &str, module_router: Router) -> Self {
        if path.is_empty() || path == "/" {
            self.router = self.router.merge(module_router);
        } else {
            self.router = self.router.nest(path, module_router);
        }
        self
    }

    /// Serve files from `dir` under `path`
    pub fn with_static_dir(mut self, path: &str, dir: &str) -> Self {
        self.router = self.router.nest_service(path, ServeDir::new(dir));
        self
    }

    /// Handler for requests no route matched
    pub fn with_fallback<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.router = self.router.fallback(handler);
        self
    }

    /// Wrap every route registered so far in `layer`
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.router = self.router.layer(layer);
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add request ID middleware; the id is echoed back on the response
    pub fn with_request_id(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self
            .router
            .layer(TimeoutLayer::new(Duration::from_millis(timeout_ms)));
        self
    }

    /// Conservative security headers on every response
    pub fn with_security_headers(mut self) -> Self {
        let headers = [
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
            (header::REFERRER_POLICY, "no-referrer"),
            (HeaderName::from_static("cross-origin-opener-policy"), "same-origin"),
        ];
        for (name, value) in headers {
            self.router = self.router.layer(SetResponseHeaderLayer::if_not_present(
                name,
                HeaderValue::from_static(value),
            ));
        }
        self
    }

    /// Add OpenAPI documentation by collecting specs from all modules
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi_spec = merged_openapi(registry);

        // Deserialize our JSON spec into a proper utoipa OpenApi object
        // so SwaggerUI can serve it
        let openapi_obj: utoipa::openapi::OpenApi = serde_json::from_value(openapi_spec.clone())
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "merged OpenAPI document is invalid; serving a stub");
                utoipa::openapi::OpenApiBuilder::new()
                    .info(
                        utoipa::openapi::InfoBuilder::new()
                            .title("YelpCamp")
                            .version("1.0.0")
                            .build(),
                    )
                    .build()
            });

        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi_obj),
        );

        // Also serve the raw JSON spec for external consumers
        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(openapi_spec.clone()) }),
        );

        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Base document plus every module's paths (prefixed with its mount path) and schemas
pub fn merged_openapi(registry: &ModuleRegistry) -> serde_json::Value {
    let mut openapi_spec = serde_json::json!({
        "openapi": "3.0.0",
        "info": {
            "title": "YelpCamp",
            "version": "1.0.0",
            "description": "Campground listings and reviews"
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    openapi_spec["components"]["schemas"]["ErrorView"] = serde_json::json!({
        "type": "object",
        "properties": {
            "view": { "type": "string" },
            "status": { "type": "integer" },
            "error": {
                "type": "object",
                "properties": {
                    "code": { "type": "string" },
                    "message": { "type": "string" },
                    "details": { "type": "array", "items": {} },
                    "trace_id": { "type": "string" },
                    "timestamp": { "type": "string" }
                },
                "required": ["code", "message", "trace_id", "timestamp"]
            }
        },
        "required": ["view", "error"]
    });

    openapi_spec["paths"]["/healthz"] = serde_json::json!({
        "get": {
            "summary": "Health check",
            "responses": {
                "200": {
                    "description": "OK",
                    "content": { "text/plain": { "schema": { "type": "string" } } }
                }
            }
        }
    });

    for module in registry.modules() {
        let Some(module_spec) = module.openapi() else {
            continue;
        };

        let mount_path = module.mount_path();
        let prefix = mount_path.trim_end_matches('/');

        if let Some(paths_obj) = module_spec.get("paths").and_then(|p| p.as_object()) {
            for (path, path_item) in paths_obj {
                let prefixed_path = if path == "/" && !prefix.is_empty() {
                    prefix.to_string()
                } else {
                    format!("{}{}", prefix, path)
                };
                openapi_spec["paths"][prefixed_path] = path_item.clone();
            }
        }

        if let Some(schemas_obj) = module_spec
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.as_object())
        {
            for (schema_name, schema_def) in schemas_obj {
                openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }
    }

    openapi_spec
}

/// Time-ordered request ids
#[derive(Clone)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let timestamp = Timestamp::now(uuid::NoContext);
        let request_id = Uuid::new_v7(timestamp)
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use tower::ServiceExt;
    use yelpcamp_kernel::Module;

    struct DocModule {
        name: &'static str,
        mount: &'static str,
    }

    #[async_trait]
    impl Module for DocModule {
        fn name(&self) -> &'static str {
            self.name
        }

        fn mount_path(&self) -> String {
            self.mount.to_string()
        }

        fn openapi(&self) -> Option<serde_json::Value> {
            Some(serde_json::json!({
                "paths": { "/": { "get": {} }, "/{id}": { "get": {} } },
                "components": { "schemas": { "Thing": { "type": "object" } } }
            }))
        }
    }

    async fn get_status(router: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap) {
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        (response.status(), response.headers().clone())
    }

    #[tokio::test]
    async fn test_module_mounting_nests_and_merges() {
        let nested = Router::new().route("/", get(|| async { "index" }));
        let merged = Router::new().route("/login", get(|| async { "login" }));

        let router = RouterBuilder::new()
            .mount_module("/campgrounds", nested)
            .mount_module("/", merged)
            .build();

        assert_eq!(get_status(router.clone(), "/campgrounds").await.0, StatusCode::OK);
        assert_eq!(get_status(router, "/login").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_chain_sets_headers() {
        let router = RouterBuilder::new()
            .route("/healthz", get(|| async { "ok" }))
            .with_security_headers()
            .with_tracing()
            .with_request_id()
            .with_timeout(5000)
            .build();

        let (status, headers) = get_status(router, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_fallback_handles_unknown_routes() {
        let router = RouterBuilder::new()
            .with_fallback(crate::error::not_found)
            .build();
        assert_eq!(get_status(router, "/nowhere").await.0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_openapi_paths_are_prefixed_with_mount_path() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(DocModule {
            name: "campgrounds",
            mount: "/campgrounds",
        }));
        registry.register(Arc::new(DocModule {
            name: "users",
            mount: "/",
        }));

        let spec = merged_openapi(&registry);
        let paths = spec["paths"].as_object().unwrap();
        assert!(paths.contains_key("/campgrounds"));
        assert!(paths.contains_key("/campgrounds/{id}"));
        assert!(paths.contains_key("/"));
        assert!(paths.contains_key("/{id}"));
        assert!(paths.contains_key("/healthz"));
        assert!(spec["components"]["schemas"]["Thing"].is_object());
    }
}
