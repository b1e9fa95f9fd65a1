//! One-shot notifications carried across a redirect in the session.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::AppError;

const FLASH_KEY: &str = "flash";

/// Messages waiting to be shown on the next rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessages {
    #[serde(default)]
    pub success: Vec<String>,
    #[serde(default)]
    pub error: Vec<String>,
}

impl FlashMessages {
    pub fn is_empty(&self) -> bool {
        self.success.is_empty() && self.error.is_empty()
    }
}

/// Flash access for a request, backed by its session
#[derive(Clone)]
pub struct Flash(Session);

impl Flash {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    pub async fn success(&self, message: impl Into<String>) -> Result<(), AppError> {
        self.push(|messages| &mut messages.success, message.into())
            .await
    }

    pub async fn error(&self, message: impl Into<String>) -> Result<(), AppError> {
        self.push(|messages| &mut messages.error, message.into())
            .await
    }

    /// Drain pending messages. Read failures are logged and yield nothing.
    pub async fn take(&self) -> FlashMessages {
        match self.0.remove::<FlashMessages>(FLASH_KEY).await {
            Ok(messages) => messages.unwrap_or_default(),
            Err(error) => {
                tracing::warn!(%error, "discarding unreadable flash messages");
                FlashMessages::default()
            }
        }
    }

    async fn push<F>(&self, slot: F, message: String) -> Result<(), AppError>
    where
        F: FnOnce(&mut FlashMessages) -> &mut Vec<String>,
    {
        let mut messages = self
            .0
            .get::<FlashMessages>(FLASH_KEY)
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        slot(&mut messages).push(message);
        self.0.insert(FLASH_KEY, messages).await?;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, message)| AppError::Internal(anyhow::anyhow!(message)))?;
        Ok(Self(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn flash() -> Flash {
        Flash::new(Session::new(None, Arc::new(MemoryStore::default()), None))
    }

    #[tokio::test]
    async fn messages_are_read_once() {
        let flash = flash();
        flash.success("Successfully made a new campground!").await.unwrap();
        flash.error("Cannot find that campground!").await.unwrap();
        flash.success("Welcome back!").await.unwrap();

        let messages = flash.take().await;
        assert_eq!(
            messages.success,
            vec!["Successfully made a new campground!", "Welcome back!"]
        );
        assert_eq!(messages.error, vec!["Cannot find that campground!"]);

        assert!(flash.take().await.is_empty());
    }

    #[tokio::test]
    async fn empty_session_has_no_messages() {
        assert_eq!(flash().take().await, FlashMessages::default());
    }
}
