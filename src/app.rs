//! Application assembly: module registry, indexes, middleware stack.

use std::sync::Arc;

use anyhow::Context;
use axum::{middleware::from_fn_with_state, routing::get, Router};
use time::Duration;
use yelpcamp_db::{DocumentSessionStore, DocumentStore};
use yelpcamp_http::{error::not_found, health_check, session::session_layer, RouterBuilder, View};
use yelpcamp_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::auth::{attach_identity, Locals};
use crate::images::LocalImageStore;
use crate::modules;
use crate::state::AppState;

/// A ready-to-serve router and the modules behind it
pub struct Application {
    pub router: Router,
    pub registry: ModuleRegistry,
}

/// Landing page
async fn home(locals: Locals) -> View {
    locals.view("home")
}

/// Register modules, run their init hooks, apply their indexes, start them
/// and assemble the router.
pub async fn build(state: AppState, settings: &Settings) -> anyhow::Result<Application> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &state);

    let ctx = InitCtx { settings };
    registry.init_modules(&ctx).await?;
    apply_indexes(&registry, state.store.as_ref()).await?;
    registry.start_modules(&ctx).await?;

    let router = router(&registry, state, settings);
    Ok(Application { router, registry })
}

async fn apply_indexes(registry: &ModuleRegistry, store: &dyn DocumentStore) -> anyhow::Result<()> {
    for index in registry.collect_indexes() {
        if !index.unique {
            continue;
        }
        store
            .ensure_unique_index(index.collection, index.field)
            .await
            .with_context(|| {
                format!(
                    "failed to apply unique index on {}.{}",
                    index.collection, index.field
                )
            })?;
        tracing::info!(
            collection = index.collection,
            field = index.field,
            "unique index applied"
        );
    }
    Ok(())
}

fn router(registry: &ModuleRegistry, state: AppState, settings: &Settings) -> Router {
    let session_store = DocumentSessionStore::new(
        state.store.clone(),
        Duration::seconds(settings.session.touch_after_secs),
    );

    let mut builder = RouterBuilder::new().route("/", get(home));
    for module in registry.modules() {
        builder = builder.mount_module(&module.mount_path(), module.routes());
    }

    builder
        .with_fallback(not_found)
        .layer(from_fn_with_state(state, attach_identity))
        .layer(session_layer(session_store, &settings.session))
        .with_static_dir(&settings.images.public_path, &settings.images.dir)
        .route("/healthz", get(health_check))
        .with_openapi(registry)
        .with_security_headers()
        .with_tracing()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .build()
}

/// Connect the configured backends and serve until shutdown
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "yelpcamp starting"
    );

    let store = yelpcamp_db::connect(&settings.database.url)
        .with_context(|| format!("failed to open database {}", settings.database.url))?;
    let images = Arc::new(LocalImageStore::new(
        &settings.images.dir,
        &settings.images.public_path,
    ));
    let state = AppState::new(store, images);

    let Application { router, registry } = build(state, &settings).await?;
    let served = yelpcamp_http::start_server(router, &settings).await;

    registry.stop_modules().await?;
    served
}
