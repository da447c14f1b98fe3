//! Management API routes
//!
//! Sign-in and sign-out, the current session, platform administration
//! for super admins and user administration for school admins.

pub mod auth;
pub mod schools;
pub mod types;
pub mod users;

use axum::Router;

use crate::state::AppState;

pub use auth::{RequireSession, RequireSuperAdmin};

/// Create management API routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(schools::routes())
        .merge(users::routes())
}
