pub mod models;
pub mod routes;

use async_trait::async_trait;
use axum::{
    routing::{delete, post},
    Router,
};
use serde_json::json;
use yelpcamp_kernel::{InitCtx, Module};

use crate::state::AppState;

/// Reviews, nested under the campground they belong to
pub struct ReviewsModule {
    state: AppState,
}

impl ReviewsModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for ReviewsModule {
    fn name(&self) -> &'static str {
        "reviews"
    }

    fn mount_path(&self) -> String {
        "/campgrounds/{id}/reviews".to_string()
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", post(routes::create))
            .route("/{review_id}", delete(routes::destroy))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "post": {
                        "summary": "Review a campground",
                        "tags": ["Reviews"],
                        "parameters": [
                            { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } }
                        ],
                        "requestBody": {
                            "content": {
                                "application/x-www-form-urlencoded": {
                                    "schema": { "$ref": "#/components/schemas/ReviewForm" }
                                }
                            }
                        },
                        "responses": {
                            "303": { "description": "Created; redirect to the campground" },
                            "400": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorView" }
                                    }
                                }
                            },
                            "404": { "description": "Campground not found" }
                        }
                    }
                },
                "/{review_id}": {
                    "delete": {
                        "summary": "Delete a review",
                        "description": "Allowed for the review's author and the campground's author",
                        "tags": ["Reviews"],
                        "parameters": [
                            { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } },
                            { "name": "review_id", "in": "path", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "303": { "description": "Deleted; redirect to the campground" },
                            "403": { "description": "Neither review author nor campground author" },
                            "404": { "description": "Campground or review not found" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "ReviewForm": {
                        "type": "object",
                        "properties": {
                            "body": { "type": "string" },
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 }
                        },
                        "required": ["body", "rating"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module started");
        Ok(())
    }
}

/// Create a new instance of the reviews module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(ReviewsModule::new(state))
}
