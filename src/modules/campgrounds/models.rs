use serde::{Deserialize, Serialize};
use uuid::Uuid;
use yelpcamp_authz::Owned;
use yelpcamp_db::Document;

use crate::images::StoredImage;

/// GeoJSON point, `[longitude, latitude]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl Geometry {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
        }
    }
}

/// A campground listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campground {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub description: String,
    pub location: String,
    pub geometry: Geometry,
    /// In upload order
    #[serde(default)]
    pub images: Vec<StoredImage>,
    /// Id of the user who created the listing
    pub author: String,
    /// Review ids, oldest first
    #[serde(default)]
    pub reviews: Vec<String>,
}

impl Document for Campground {
    const COLLECTION: &'static str = "campgrounds";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Owned for Campground {
    const KIND: &'static str = "campground";

    fn resource_id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.author
    }
}

/// Validated listing fields shared by create and update
#[derive(Debug, Clone, PartialEq)]
pub struct CampgroundDetails {
    pub title: String,
    pub location: String,
    pub price: f64,
    pub description: String,
    pub geometry: Geometry,
}

impl Campground {
    pub fn new(details: CampgroundDetails, author: &str, images: Vec<StoredImage>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            title: details.title,
            price: details.price,
            description: details.description,
            location: details.location,
            geometry: details.geometry,
            images,
            author: author.to_string(),
            reviews: Vec::new(),
        }
    }

    /// Overwrite the editable fields; images, author and reviews are untouched
    pub fn apply(&mut self, details: CampgroundDetails) {
        self.title = details.title;
        self.location = details.location;
        self.price = details.price;
        self.description = details.description;
        self.geometry = details.geometry;
    }

    /// Drop the images named in `filenames`, returning the ones removed.
    /// Names that are not attached to this campground are ignored.
    pub fn remove_images(&mut self, filenames: &[String]) -> Vec<StoredImage> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.images)
            .into_iter()
            .partition(|image| filenames.contains(&image.filename));
        self.images = kept;
        removed
    }
}
