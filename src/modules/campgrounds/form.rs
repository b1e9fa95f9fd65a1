//! Multipart campground form: reading the parts and validating them.

use axum::extract::{multipart::MultipartError, Multipart};
use yelpcamp_http::AppError;

use super::models::{CampgroundDetails, Geometry};
use crate::images::{ImageUpload, ALLOWED_EXTENSIONS};
use crate::utils::FieldErrors;

/// Raw create/update submission
#[derive(Debug, Clone, Default)]
pub struct CampgroundForm {
    pub title: String,
    pub location: String,
    pub price: String,
    pub description: String,
    pub longitude: String,
    pub latitude: String,
    /// File parts, in submission order
    pub images: Vec<ImageUpload>,
    /// Filenames of attached images to remove (update only)
    pub delete_images: Vec<String>,
}

fn malformed(error: MultipartError) -> AppError {
    AppError::bad_request(error.body_text())
}

/// `campground[title]` and `title` name the same field
fn field_key(name: &str) -> &str {
    name.strip_prefix("campground[")
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(name)
}

impl CampgroundForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();
            match field_key(&name) {
                "image" | "images" => {
                    let original_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(malformed)?;
                    // an untouched file input still submits an empty, nameless part
                    if original_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.images.push(ImageUpload {
                        original_name,
                        content_type,
                        bytes,
                    });
                }
                "deleteImages" | "deleteImages[]" => {
                    form.delete_images.push(field.text().await.map_err(malformed)?);
                }
                key @ ("title" | "location" | "price" | "description" | "longitude"
                | "latitude") => {
                    let key = key.to_string();
                    let value = field.text().await.map_err(malformed)?;
                    form.set(&key, value);
                }
                other => {
                    tracing::debug!(field = other, "ignoring unknown campground form field");
                }
            }
        }

        Ok(form)
    }

    fn set(&mut self, key: &str, value: String) {
        let slot = match key {
            "title" => &mut self.title,
            "location" => &mut self.location,
            "price" => &mut self.price,
            "description" => &mut self.description,
            "longitude" => &mut self.longitude,
            "latitude" => &mut self.latitude,
            _ => return,
        };
        *slot = value;
    }

    /// Check every field and file, reporting all problems at once
    pub fn validate(&self) -> Result<CampgroundDetails, AppError> {
        let mut errors = FieldErrors::new();

        let title = errors.required("title", &self.title);
        let location = errors.required("location", &self.location);
        let price = errors.number_in("price", &self.price, 0.0, f64::MAX);
        let description = errors.required("description", &self.description);
        let longitude = errors.number_in("longitude", &self.longitude, -180.0, 180.0);
        let latitude = errors.number_in("latitude", &self.latitude, -90.0, 90.0);

        for upload in &self.images {
            if !upload.has_allowed_extension() {
                errors.add(
                    "image",
                    "file_type",
                    format!(
                        "\"{}\" must be one of {}",
                        upload.original_name,
                        ALLOWED_EXTENSIONS.join(", ")
                    ),
                );
            }
            if upload.bytes.is_empty() {
                errors.add(
                    "image",
                    "file_empty",
                    format!("\"{}\" is empty", upload.original_name),
                );
            }
        }

        errors.finish(CampgroundDetails {
            title,
            location,
            price,
            description,
            geometry: Geometry::point(longitude, latitude),
        })
    }
}
