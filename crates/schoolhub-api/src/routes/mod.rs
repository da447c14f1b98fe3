//! API routes

mod health;
pub mod management;
pub mod metrics;
mod pages;

use axum::{Router, middleware};
use schoolhub_auth::gatekeeper_middleware;
use std::sync::Arc;

use crate::state::{AppState, MetricsHandle};

/// Create the main router
///
/// The gatekeeper wraps every route, so page navigation is checked before
/// any handler runs. Exempt paths (sign-in, health, metrics, API when so
/// configured) pass straight through.
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let gate = state.gate.clone();

    let mut router = Router::new()
        // Health check
        .merge(health::routes())
        // Landing, sign-in and dashboard pages
        .merge(pages::routes())
        // Management API
        .merge(management::routes())
        .with_state(state);

    // Add metrics endpoint if handle is provided
    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router.layer(middleware::from_fn_with_state(gate, gatekeeper_middleware))
}
