//! Core traits, settings, and the module registry shared by every YelpCamp crate.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{IndexDefinition, InitCtx, Module};
pub use registry::ModuleRegistry;
