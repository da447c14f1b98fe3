//! SchoolHub HTTP API
//!
//! Axum router for the sign-in flow, the session gate over page
//! navigation, the platform and school management API, and the page
//! shells each role lands on.

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use extract::ApiJson;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
