use std::sync::Arc;

use yelpcamp_db::{Collection, DocumentStore};

use crate::images::ImageStore;
use crate::modules::campgrounds::models::Campground;
use crate::modules::reviews::models::Review;
use crate::modules::users::models::User;

/// Shared handles every route module works with
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub users: Collection<User>,
    pub campgrounds: Collection<Campground>,
    pub reviews: Collection<Review>,
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, images: Arc<dyn ImageStore>) -> Self {
        Self {
            users: Collection::new(store.clone()),
            campgrounds: Collection::new(store.clone()),
            reviews: Collection::new(store.clone()),
            store,
            images,
        }
    }
}
