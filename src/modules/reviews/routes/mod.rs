use anyhow::Context;
use axum::{
    extract::{Path, State},
    response::Redirect,
    Form,
};
use serde::Deserialize;
use yelpcamp_authz::ensure_owner_or_parent_owner;
use yelpcamp_http::{AppError, Flash};

use super::models::{Review, ReviewForm};
use crate::auth::{self, RequireUser};
use crate::modules::campgrounds::routes::{find_campground, save_campground};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CampgroundPath {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewPath {
    pub id: String,
    pub review_id: String,
}

/// Add a review to a campground
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(path): Path<CampgroundPath>,
    flash: Flash,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect, AppError> {
    let mut campground = find_campground(&state, &path.id).await?;
    let details = form.validate()?;

    let review = Review::new(details, &user.id);
    state
        .reviews
        .insert(&review)
        .await
        .context("failed to save review")?;
    campground.reviews.push(review.id.clone());
    if let Err(error) = save_campground(&state, &campground).await {
        if let Err(cleanup) = state.reviews.delete(&review.id).await {
            tracing::warn!(
                review_id = %review.id,
                error = %cleanup,
                "failed to remove unattached review"
            );
        }
        return Err(error);
    }

    tracing::info!(campground_id = %campground.id, review_id = %review.id, "review created");
    flash.success("Created new review!").await?;
    Ok(Redirect::to(&format!("/campgrounds/{}", campground.id)))
}

/// Remove a review; allowed for its author and the campground's author
pub async fn destroy(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(path): Path<ReviewPath>,
    flash: Flash,
) -> Result<Redirect, AppError> {
    let mut campground = find_campground(&state, &path.id).await?;
    let review = state
        .reviews
        .get(&path.review_id)
        .await
        .context("failed to load review")?
        .filter(|review| campground.reviews.contains(&review.id))
        .ok_or_else(|| AppError::not_found("Cannot find that review!"))?;
    ensure_owner_or_parent_owner(&user.id, &review, &campground).map_err(auth::forbidden)?;

    campground.reviews.retain(|id| id != &review.id);
    save_campground(&state, &campground).await?;
    state
        .reviews
        .delete(&review.id)
        .await
        .context("failed to delete review")?;

    tracing::info!(campground_id = %campground.id, review_id = %review.id, "review deleted");
    flash.success("Successfully deleted review").await?;
    Ok(Redirect::to(&format!("/campgrounds/{}", campground.id)))
}
