//! YelpCamp: campground listings with images and reviews.
//!
//! Route groups live in [`modules`] and are mounted through the kernel's
//! module registry by [`app::build`].

pub mod app;
pub mod auth;
pub mod images;
pub mod modules;
pub mod state;
pub mod utils;

pub use app::{build, run, Application};
pub use state::AppState;
