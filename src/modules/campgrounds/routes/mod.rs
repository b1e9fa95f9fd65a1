use anyhow::Context;
use axum::{
    extract::{Multipart, Path, State},
    response::Redirect,
};
use serde_json::Value;
use yelpcamp_authz::ensure_owner;
use yelpcamp_db::DbError;
use yelpcamp_http::{AppError, Flash, View};

use super::form::CampgroundForm;
use super::models::Campground;
use crate::auth::{self, Locals, RequireUser};
use crate::images::{ImageUpload, StoredImage};
use crate::modules::reviews::models::PopulatedReview;
use crate::state::AppState;

const NOT_FOUND: &str = "Cannot find that campground!";

/// Load a campground or answer 404
pub(crate) async fn find_campground(state: &AppState, id: &str) -> Result<Campground, AppError> {
    state
        .campgrounds
        .get(id)
        .await
        .context("failed to load campground")?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

/// Write back a loaded campground. One deleted in the meantime stays deleted
/// and the write answers 404.
pub(crate) async fn save_campground(
    state: &AppState,
    campground: &Campground,
) -> Result<(), AppError> {
    match state.campgrounds.replace(campground).await {
        Ok(()) => Ok(()),
        Err(DbError::NotFound { .. }) => {
            tracing::warn!(campground_id = %campground.id, "campground deleted before write");
            Err(AppError::not_found(NOT_FOUND))
        }
        Err(error) => Err(anyhow::Error::new(error)
            .context("failed to save campground")
            .into()),
    }
}

/// Store uploads in order. If one fails, the ones already stored are removed.
async fn upload_all(
    state: &AppState,
    uploads: Vec<ImageUpload>,
) -> Result<Vec<StoredImage>, AppError> {
    let mut stored = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match state.images.upload(upload).await {
            Ok(image) => stored.push(image),
            Err(error) => {
                discard_images(state, &stored).await;
                return Err(anyhow::Error::new(error)
                    .context("failed to store uploaded image")
                    .into());
            }
        }
    }
    Ok(stored)
}

/// Remove stored files; failures leave an orphaned file and are only logged
async fn discard_images(state: &AppState, images: &[StoredImage]) {
    for image in images {
        if let Err(error) = state.images.delete(&image.filename).await {
            tracing::warn!(filename = %image.filename, %error, "failed to remove image");
        }
    }
}

/// The campground as the show page needs it: author and reviews resolved
async fn populate(state: &AppState, campground: &Campground) -> Result<Value, AppError> {
    let author = state
        .users
        .get(&campground.author)
        .await
        .context("failed to load campground author")?
        .map(|user| user.author());

    let mut reviews = Vec::with_capacity(campground.reviews.len());
    for review_id in &campground.reviews {
        let Some(review) = state
            .reviews
            .get(review_id)
            .await
            .context("failed to load review")?
        else {
            tracing::warn!(campground_id = %campground.id, %review_id, "dangling review reference");
            continue;
        };
        let author = state
            .users
            .get(&review.author)
            .await
            .context("failed to load review author")?
            .map(|user| user.author());
        reviews.push(PopulatedReview::new(review, author));
    }

    let mut page = serde_json::to_value(campground).context("failed to render campground")?;
    page["author"] = serde_json::to_value(author).context("failed to render author")?;
    page["reviews"] = serde_json::to_value(reviews).context("failed to render reviews")?;
    Ok(page)
}

/// All campgrounds
pub async fn index(State(state): State<AppState>, locals: Locals) -> Result<View, AppError> {
    let campgrounds = state
        .campgrounds
        .list()
        .await
        .context("failed to list campgrounds")?;
    Ok(locals
        .view("campgrounds/index")
        .with("campgrounds", campgrounds))
}

/// Empty creation form
pub async fn new_form(RequireUser(_user): RequireUser, locals: Locals) -> View {
    locals.view("campgrounds/new")
}

/// Create a listing owned by the signed-in user
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    flash: Flash,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let form = CampgroundForm::read(multipart).await?;
    let details = form.validate()?;

    let images = upload_all(&state, form.images).await?;
    let campground = Campground::new(details, &user.id, images);
    if let Err(error) = state.campgrounds.insert(&campground).await {
        discard_images(&state, &campground.images).await;
        return Err(anyhow::Error::new(error)
            .context("failed to save campground")
            .into());
    }

    tracing::info!(campground_id = %campground.id, author = %user.id, "campground created");
    flash.success("Successfully made a new campground!").await?;
    Ok(Redirect::to(&format!("/campgrounds/{}", campground.id)))
}

/// One campground with its reviews
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
    locals: Locals,
) -> Result<View, AppError> {
    let campground = find_campground(&state, &id).await?;
    let page = populate(&state, &campground).await?;
    Ok(locals.view("campgrounds/show").with("campground", page))
}

/// Edit form, owner only
pub async fn edit_form(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    locals: Locals,
) -> Result<View, AppError> {
    let campground = find_campground(&state, &id).await?;
    ensure_owner(&user.id, &campground).map_err(auth::forbidden)?;
    Ok(locals.view("campgrounds/edit").with("campground", campground))
}

/// Update fields, append new images and remove the selected ones
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    flash: Flash,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut campground = find_campground(&state, &id).await?;
    ensure_owner(&user.id, &campground).map_err(auth::forbidden)?;

    let form = CampgroundForm::read(multipart).await?;
    let details = form.validate()?;

    let uploaded = upload_all(&state, form.images).await?;
    campground.apply(details);
    campground.images.extend(uploaded.iter().cloned());
    let removed = campground.remove_images(&form.delete_images);

    if let Err(error) = save_campground(&state, &campground).await {
        discard_images(&state, &uploaded).await;
        return Err(error);
    }
    discard_images(&state, &removed).await;

    tracing::info!(
        campground_id = %campground.id,
        added = uploaded.len(),
        removed = removed.len(),
        "campground updated"
    );
    flash.success("Successfully updated campground!").await?;
    Ok(Redirect::to(&format!("/campgrounds/{}", campground.id)))
}

/// Delete a listing together with its reviews and images
pub async fn destroy(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    flash: Flash,
) -> Result<Redirect, AppError> {
    let campground = find_campground(&state, &id).await?;
    ensure_owner(&user.id, &campground).map_err(auth::forbidden)?;

    state
        .campgrounds
        .delete(&campground.id)
        .await
        .context("failed to delete campground")?;
    for review_id in &campground.reviews {
        state
            .reviews
            .delete(review_id)
            .await
            .context("failed to delete review")?;
    }
    discard_images(&state, &campground.images).await;

    tracing::info!(
        campground_id = %campground.id,
        reviews = campground.reviews.len(),
        images = campground.images.len(),
        "campground deleted"
    );
    flash.success("Successfully deleted campground").await?;
    Ok(Redirect::to("/campgrounds"))
}
