use serde::{Deserialize, Serialize};
use uuid::Uuid;
use yelpcamp_authz::Owned;
use yelpcamp_db::Document;
use yelpcamp_http::AppError;

use crate::modules::users::models::Author;
use crate::utils::FieldErrors;

/// A rating left on a campground
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub body: String,
    /// 1 to 5
    pub rating: u8,
    /// Id of the user who wrote it
    pub author: String,
}

impl Document for Review {
    const COLLECTION: &'static str = "reviews";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Owned for Review {
    const KIND: &'static str = "review";

    fn resource_id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.author
    }
}

impl Review {
    pub fn new(details: ReviewDetails, author: &str) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            body: details.body,
            rating: details.rating,
            author: author.to_string(),
        }
    }
}

/// A review with its author resolved, as the campground page shows it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulatedReview {
    pub id: String,
    pub body: String,
    pub rating: u8,
    pub author: Option<Author>,
}

impl PopulatedReview {
    pub fn new(review: Review, author: Option<Author>) -> Self {
        Self {
            id: review.id,
            body: review.body,
            rating: review.rating,
            author,
        }
    }
}

/// Review form; `review[body]` style names are accepted too
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewForm {
    #[serde(default, alias = "review[body]")]
    pub body: String,
    #[serde(default, alias = "review[rating]")]
    pub rating: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDetails {
    pub body: String,
    pub rating: u8,
}

impl ReviewForm {
    pub fn validate(&self) -> Result<ReviewDetails, AppError> {
        let mut errors = FieldErrors::new();
        let body = errors.required("body", &self.body);
        let rating = errors.integer_in("rating", &self.rating, 1, 5);
        errors.finish(ReviewDetails {
            body,
            rating: u8::try_from(rating).unwrap_or(1),
        })
    }
}
