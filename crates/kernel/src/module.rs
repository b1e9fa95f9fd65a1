use async_trait::async_trait;
use axum::Router;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Index a module needs on one of its collections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub collection: &'static str,
    pub field: &'static str,
    pub unique: bool,
}

impl IndexDefinition {
    pub const fn unique(collection: &'static str, field: &'static str) -> Self {
        Self {
            collection,
            field,
            unique: true,
        }
    }
}

/// Route group trait implemented by the users, campgrounds and reviews modules
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Path the module's router is mounted under.
    /// `"/"` merges the routes at the root instead of nesting them.
    fn mount_path(&self) -> String {
        format!("/{}", self.name())
    }

    /// Initialize the module with the provided context
    /// Called during application startup before indexes are applied
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes, state already applied
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON
    /// Will be merged with other modules' specs
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Indexes the document store must enforce for this module
    fn indexes(&self) -> Vec<IndexDefinition> {
        vec![]
    }

    /// Called after indexes are in place
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and clean up resources
    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
