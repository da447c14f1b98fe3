//! Application state

use schoolhub_auth::{CredentialVerifier, Gatekeeper, RoutePolicy, SessionManager};
use schoolhub_db::{SchoolRepository, UserRepository};
use std::sync::Arc;

/// Prometheus handle rendered by `/metrics`
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub schools: Arc<dyn SchoolRepository>,
    pub sessions: Arc<SessionManager>,
    pub credentials: CredentialVerifier,
    pub gate: Gatekeeper,
    /// Mark session cookies `Secure`
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        schools: Arc<dyn SchoolRepository>,
        sessions: Arc<SessionManager>,
        policy: RoutePolicy,
        secure_cookies: bool,
    ) -> Self {
        let credentials = CredentialVerifier::new(users.clone());
        let gate = Gatekeeper::new(sessions.clone(), Arc::new(policy));
        Self {
            users,
            schools,
            sessions,
            credentials,
            gate,
            secure_cookies,
        }
    }
}
