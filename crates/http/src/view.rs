//! Rendered pages.
//!
//! A [`View`] is the JSON document a template would have been rendered from:
//! the view name, the request locals (`current_user`, `flash`) and the page
//! data, flattened into one object.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::flash::FlashMessages;

#[derive(Debug, Clone)]
pub struct View {
    name: &'static str,
    status: StatusCode,
    current_user: Value,
    flash: FlashMessages,
    data: Map<String, Value>,
}

impl View {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            status: StatusCode::OK,
            current_user: Value::Null,
            flash: FlashMessages::default(),
            data: Map::new(),
        }
    }

    /// Attach one piece of page data
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|error| {
            tracing::error!(view = self.name, key, %error, "view data failed to serialize");
            Value::Null
        });
        self.data.insert(key.to_string(), value);
        self
    }

    /// Attach the per-request locals every page shows
    pub fn locals(mut self, current_user: Option<Value>, flash: FlashMessages) -> Self {
        self.current_user = current_user.unwrap_or(Value::Null);
        self.flash = flash;
        self
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert("view".to_string(), Value::from(self.name));
        body.insert("current_user".to_string(), self.current_user);
        body.insert(
            "flash".to_string(),
            serde_json::to_value(self.flash).unwrap_or_default(),
        );
        for (key, value) in self.data {
            body.entry(key).or_insert(value);
        }

        (self.status, Json(Value::Object(body))).into_response()
    }
}
