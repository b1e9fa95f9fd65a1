pub mod models;
pub mod routes;

use async_trait::async_trait;
use axum::{routing::get, Router};
use serde_json::json;
use yelpcamp_db::Document;
use yelpcamp_kernel::{IndexDefinition, InitCtx, Module};

use crate::state::AppState;

/// Accounts: registration, login and logout, mounted at the root
pub struct UsersModule {
    state: AppState,
}

impl UsersModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    fn mount_path(&self) -> String {
        "/".to_string()
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "users module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route(
                "/register",
                get(routes::register_form).post(routes::register),
            )
            .route("/login", get(routes::login_form).post(routes::login))
            .route("/logout", get(routes::logout))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/register": {
                    "get": {
                        "summary": "Registration page",
                        "tags": ["Users"],
                        "responses": {
                            "200": { "description": "users/register view" }
                        }
                    },
                    "post": {
                        "summary": "Register and sign in",
                        "tags": ["Users"],
                        "requestBody": {
                            "content": {
                                "application/x-www-form-urlencoded": {
                                    "schema": { "$ref": "#/components/schemas/RegisterForm" }
                                }
                            }
                        },
                        "responses": {
                            "303": { "description": "Signed in; redirect to the remembered page" },
                            "400": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorView" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/login": {
                    "get": {
                        "summary": "Login page",
                        "tags": ["Users"],
                        "responses": {
                            "200": { "description": "users/login view" }
                        }
                    },
                    "post": {
                        "summary": "Sign in",
                        "tags": ["Users"],
                        "requestBody": {
                            "content": {
                                "application/x-www-form-urlencoded": {
                                    "schema": { "$ref": "#/components/schemas/LoginForm" }
                                }
                            }
                        },
                        "responses": {
                            "303": { "description": "Redirect to the remembered page, or back to /login" }
                        }
                    }
                },
                "/logout": {
                    "get": {
                        "summary": "Sign out",
                        "tags": ["Users"],
                        "responses": {
                            "303": { "description": "Redirect to /campgrounds" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "RegisterForm": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string" },
                            "email": { "type": "string", "format": "email" },
                            "password": { "type": "string", "format": "password" }
                        },
                        "required": ["username", "email", "password"]
                    },
                    "LoginForm": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string" },
                            "password": { "type": "string", "format": "password" }
                        },
                        "required": ["username", "password"]
                    },
                    "User": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "username": { "type": "string" },
                            "email": { "type": "string", "format": "email" }
                        },
                        "required": ["id", "username", "email"]
                    }
                }
            }
        }))
    }

    fn indexes(&self) -> Vec<IndexDefinition> {
        vec![
            IndexDefinition::unique(models::User::COLLECTION, "username"),
            IndexDefinition::unique(models::User::COLLECTION, "email"),
        ]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "users module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "users module stopped");
        Ok(())
    }
}

/// Create a new instance of the users module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(UsersModule::new(state))
}
