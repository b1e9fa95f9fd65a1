use anyhow::Context;
use axum::{extract::State, response::Redirect, Form};
use tower_sessions::Session;
use yelpcamp_db::DbError;
use yelpcamp_http::{AppError, Flash, View};

use super::models::{LoginForm, RegisterForm, User};
use crate::auth::{self, password, Locals};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Password or username is incorrect";

/// Registration page
pub async fn register_form(locals: Locals) -> View {
    locals.view("users/register")
}

/// Create an account and sign it in
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, AppError> {
    let flash = Flash::new(session.clone());
    let new_user = form.validate()?;

    let password_hash = password::hash_blocking(new_user.password).await?;
    let user = User::new(new_user.username, new_user.email, password_hash);

    match state.users.insert(&user).await {
        Ok(()) => {}
        Err(DbError::UniqueViolation { field, .. }) => {
            tracing::info!(%field, "registration refused: already taken");
            flash
                .error(format!("A user with the given {} is already registered", field))
                .await?;
            return Ok(Redirect::to("/register"));
        }
        Err(error) => return Err(anyhow::Error::new(error).context("failed to save user").into()),
    }

    let target = auth::log_in(&session, &user).await?;
    flash.success("Welcome to Yelp Camp!").await?;
    Ok(Redirect::to(&target))
}

/// Login page
pub async fn login_form(locals: Locals) -> View {
    locals.view("users/login")
}

/// Check credentials; on success return to the remembered page
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, AppError> {
    let flash = Flash::new(session.clone());

    let user = state
        .users
        .find_by("username", form.username.trim())
        .await
        .context("failed to look up user")?;

    let stored = user
        .as_ref()
        .map(|user| user.password_hash.clone())
        .unwrap_or_else(|| password::UNKNOWN_USER_HASH.to_string());
    let verified = password::verify_blocking(form.password, stored).await? && user.is_some();

    let Some(user) = user.filter(|_| verified) else {
        tracing::info!(username = %form.username.trim(), "login refused");
        flash.error(INVALID_CREDENTIALS).await?;
        return Ok(Redirect::to("/login"));
    };

    let target = auth::log_in(&session, &user).await?;
    flash.success("Welcome back!").await?;
    Ok(Redirect::to(&target))
}

/// Sign out and go back to the listings
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    auth::log_out(&session).await?;
    Flash::new(session).success("Goodbye!").await?;
    Ok(Redirect::to("/campgrounds"))
}
