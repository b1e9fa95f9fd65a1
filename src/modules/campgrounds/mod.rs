pub mod form;
pub mod models;
pub mod routes;

use async_trait::async_trait;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use serde_json::json;
use yelpcamp_kernel::{InitCtx, Module};

use crate::state::AppState;

/// Upper bound for one campground form including its images
const MAX_FORM_BYTES: usize = 20 * 1024 * 1024;

/// Campground listings
pub struct CampgroundsModule {
    state: AppState,
}

impl CampgroundsModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorView" }
            }
        }
    })
}

#[async_trait]
impl Module for CampgroundsModule {
    fn name(&self) -> &'static str {
        "campgrounds"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            images = %ctx.settings.images.dir,
            "campgrounds module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(routes::index).post(routes::create))
            .route("/new", get(routes::new_form))
            .route(
                "/{id}",
                get(routes::show).put(routes::update).delete(routes::destroy),
            )
            .route("/{id}/edit", get(routes::edit_form))
            .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        });
        let form_body = json!({
            "content": {
                "multipart/form-data": {
                    "schema": { "$ref": "#/components/schemas/CampgroundForm" }
                }
            }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List campgrounds",
                        "tags": ["Campgrounds"],
                        "responses": {
                            "200": {
                                "description": "campgrounds/index view",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "campgrounds": {
                                                    "type": "array",
                                                    "items": { "$ref": "#/components/schemas/Campground" }
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a campground",
                        "tags": ["Campgrounds"],
                        "requestBody": form_body,
                        "responses": {
                            "303": { "description": "Created; redirect to the new campground" },
                            "400": error_response("Validation error")
                        }
                    }
                },
                "/new": {
                    "get": {
                        "summary": "Creation form",
                        "tags": ["Campgrounds"],
                        "responses": {
                            "200": { "description": "campgrounds/new view" },
                            "303": { "description": "Not signed in; redirect to /login" }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Show a campground with its reviews",
                        "tags": ["Campgrounds"],
                        "parameters": [id_param],
                        "responses": {
                            "200": { "description": "campgrounds/show view" },
                            "404": error_response("Campground not found")
                        }
                    },
                    "put": {
                        "summary": "Update a campground",
                        "tags": ["Campgrounds"],
                        "parameters": [id_param],
                        "requestBody": form_body,
                        "responses": {
                            "303": { "description": "Updated; redirect to the campground" },
                            "400": error_response("Validation error"),
                            "403": error_response("Not the author"),
                            "404": error_response("Campground not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a campground, its reviews and images",
                        "tags": ["Campgrounds"],
                        "parameters": [id_param],
                        "responses": {
                            "303": { "description": "Deleted; redirect to /campgrounds" },
                            "403": error_response("Not the author"),
                            "404": error_response("Campground not found")
                        }
                    }
                },
                "/{id}/edit": {
                    "get": {
                        "summary": "Edit form",
                        "tags": ["Campgrounds"],
                        "parameters": [id_param],
                        "responses": {
                            "200": { "description": "campgrounds/edit view" },
                            "403": error_response("Not the author"),
                            "404": error_response("Campground not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Campground": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "price": { "type": "number", "minimum": 0 },
                            "description": { "type": "string" },
                            "location": { "type": "string" },
                            "geometry": {
                                "type": "object",
                                "properties": {
                                    "type": { "type": "string", "enum": ["Point"] },
                                    "coordinates": {
                                        "type": "array",
                                        "items": { "type": "number" },
                                        "minItems": 2,
                                        "maxItems": 2
                                    }
                                }
                            },
                            "images": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "url": { "type": "string" },
                                        "filename": { "type": "string" }
                                    }
                                }
                            },
                            "author": { "type": "string" },
                            "reviews": { "type": "array", "items": { "type": "string" } }
                        },
                        "required": ["id", "title", "price", "description", "location", "geometry", "author"]
                    },
                    "CampgroundForm": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "location": { "type": "string" },
                            "price": { "type": "number", "minimum": 0 },
                            "description": { "type": "string" },
                            "longitude": { "type": "number", "minimum": -180, "maximum": 180 },
                            "latitude": { "type": "number", "minimum": -90, "maximum": 90 },
                            "image": {
                                "type": "array",
                                "items": { "type": "string", "format": "binary" }
                            },
                            "deleteImages": { "type": "array", "items": { "type": "string" } }
                        },
                        "required": ["title", "location", "price", "description", "longitude", "latitude"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "campgrounds module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "campgrounds module stopped");
        Ok(())
    }
}

/// Create a new instance of the campgrounds module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(CampgroundsModule::new(state))
}
