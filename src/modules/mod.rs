pub mod campgrounds;
pub mod reviews;
pub mod users;

use yelpcamp_kernel::ModuleRegistry;

use crate::state::AppState;

/// Register every route module; order is mount and startup order
pub fn register_all(registry: &mut ModuleRegistry, state: &AppState) {
    registry.register(users::create_module(state.clone()));
    registry.register(campgrounds::create_module(state.clone()));
    registry.register(reviews::create_module(state.clone()));
}
