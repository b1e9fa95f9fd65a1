//! Session-backed identity.
//!
//! [`attach_identity`] resolves the user id stored in the session once per
//! request and leaves the result in the request extensions, where
//! [`RequireUser`] and [`Locals`] pick it up.

use anyhow::anyhow;
use axum::{
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{request::Parts, Method},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tower_sessions::Session;
use yelpcamp_http::{AppError, Flash, FlashMessages, View};

use crate::modules::users::models::User;
use crate::state::AppState;

/// Session key holding the signed-in user's id
pub const USER_ID_KEY: &str = "user_id";

/// Session key holding the page to return to after logging in
pub const RETURN_TO_KEY: &str = "return_to";

/// Where a login lands when nothing was remembered
pub const DEFAULT_RETURN_TO: &str = "/campgrounds";

const SIGN_IN_FIRST: &str = "You must be signed in first!";

/// The resolved user for the current request, if any
#[derive(Debug, Clone, Default)]
pub struct Identity(pub Option<User>);

/// Resolve the session's user and store it as an [`Identity`] extension.
///
/// A session naming a user that no longer exists is treated as anonymous.
pub async fn attach_identity(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let user = resolve_user(&state, &session).await;
    request.extensions_mut().insert(Identity(user));
    next.run(request).await
}

async fn resolve_user(state: &AppState, session: &Session) -> Option<User> {
    let user_id = match session.get::<String>(USER_ID_KEY).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => return None,
        Err(error) => {
            tracing::warn!(%error, "unreadable session; starting a fresh one");
            if let Err(error) = session.flush().await {
                tracing::warn!(%error, "failed to discard unreadable session");
            }
            return None;
        }
    };

    match state.users.get(&user_id).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            tracing::warn!(%user_id, "session refers to a missing user");
            None
        }
        Err(error) => {
            tracing::error!(%user_id, %error, "failed to load session user");
            None
        }
    }
}

fn identity(parts: &Parts) -> Identity {
    parts.extensions.get::<Identity>().cloned().unwrap_or_default()
}

/// A signed-in user. Anonymous requests are sent to the login page.
///
/// For page loads the requested URL is remembered so a successful login can
/// bring the visitor back to it.
#[derive(Debug, Clone)]
pub struct RequireUser(pub User);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = identity(parts).0 {
            return Ok(Self(user));
        }

        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, message)| AppError::Internal(anyhow!(message)))?;
        let target = (parts.method == Method::GET).then(|| {
            parts
                .extensions
                .get::<OriginalUri>()
                .map(|uri| uri.0.to_string())
                .unwrap_or_else(|| parts.uri.to_string())
        });
        // the redirect to the login page does not depend on these writes
        if let Err(error) = remember_login_target(session, target).await {
            tracing::warn!(%error, "failed to record login redirect in session");
        }

        Err(AppError::login_required(SIGN_IN_FIRST))
    }
}

async fn remember_login_target(session: Session, target: Option<String>) -> Result<(), AppError> {
    if let Some(target) = target {
        session.insert(RETURN_TO_KEY, target).await?;
    }
    Flash::new(session).error(SIGN_IN_FIRST).await
}

/// Per-request values every rendered page carries
pub struct Locals {
    current_user: Option<User>,
    flash: FlashMessages,
}

impl Locals {
    /// Start a page, draining any pending flash messages into it
    pub fn view(self, name: &'static str) -> View {
        let current_user = current_user_value(self.current_user.as_ref());
        View::new(name).locals(Some(current_user), self.flash)
    }
}

impl<S> FromRequestParts<S> for Locals
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let flash = Flash::from_request_parts(parts, state).await?;
        Ok(Self {
            current_user: identity(parts).0,
            flash: flash.take().await,
        })
    }
}

/// Sign `user` in and return where to send them next.
///
/// The session id is rotated so a pre-login cookie cannot ride along.
pub async fn log_in(session: &Session, user: &User) -> Result<String, AppError> {
    let return_to = session
        .remove::<String>(RETURN_TO_KEY)
        .await?
        .filter(|target| is_local_path(target))
        .unwrap_or_else(|| DEFAULT_RETURN_TO.to_string());

    session.cycle_id().await?;
    session.insert(USER_ID_KEY, &user.id).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user signed in");
    Ok(return_to)
}

/// Forget the signed-in user, keeping the session for the flash that follows
pub async fn log_out(session: &Session) -> Result<(), AppError> {
    if let Some(user_id) = session.remove::<String>(USER_ID_KEY).await? {
        tracing::info!(%user_id, "user signed out");
    }
    Ok(())
}

fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

/// JSON for a page's `current_user` slot
pub fn current_user_value(user: Option<&User>) -> Value {
    user.and_then(|user| serde_json::to_value(user.public()).ok())
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn user() -> User {
        User::new("colt", "colt@example.com", "$argon2id$stub")
    }

    #[test]
    fn only_local_paths_are_returned_to() {
        assert!(is_local_path("/campgrounds/new"));
        assert!(!is_local_path("//evil.example"));
        assert!(!is_local_path("https://evil.example"));
        assert!(!is_local_path("/\\evil.example"));
    }

    #[tokio::test]
    async fn login_uses_remembered_page_once() {
        let session = session();
        session
            .insert(RETURN_TO_KEY, "/campgrounds/new")
            .await
            .unwrap();
        let user = user();

        assert_eq!(log_in(&session, &user).await.unwrap(), "/campgrounds/new");
        assert_eq!(
            session.get::<String>(USER_ID_KEY).await.unwrap(),
            Some(user.id.clone())
        );
        assert!(session
            .get::<String>(RETURN_TO_KEY)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn login_without_remembered_page_goes_to_index() {
        let session = session();
        session
            .insert(RETURN_TO_KEY, "https://evil.example")
            .await
            .unwrap();
        assert_eq!(log_in(&session, &user()).await.unwrap(), DEFAULT_RETURN_TO);
    }

    #[tokio::test]
    async fn logout_clears_the_user() {
        let session = session();
        log_in(&session, &user()).await.unwrap();
        log_out(&session).await.unwrap();
        assert!(session.get::<String>(USER_ID_KEY).await.unwrap().is_none());
    }

    #[test]
    fn current_user_value_hides_the_hash() {
        let user = user();
        let value = current_user_value(Some(&user));
        assert_eq!(value["username"], "colt");
        assert!(value.get("password_hash").is_none());
        assert_eq!(current_user_value(None), Value::Null);
    }
}
