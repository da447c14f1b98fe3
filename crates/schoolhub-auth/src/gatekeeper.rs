//! Request gatekeeper for Axum
//!
//! Every page navigation passes through here before a handler runs.
//! Exempt paths go straight through; everything else needs a valid
//! session, and role-restricted paths need the right role. Any refusal
//! redirects to `/`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use schoolhub_db::Role;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cookie::session_token;
use crate::error::AuthError;
use crate::policy::RoutePolicy;
use crate::session::{SessionClaims, SessionManager};

/// Outcome of a successful authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Path needs no session
    Exempt,
    /// Session verified and role permitted
    Granted(SessionClaims),
}

/// Session verification plus path policy
#[derive(Clone)]
pub struct Gatekeeper {
    sessions: Arc<SessionManager>,
    policy: Arc<RoutePolicy>,
}

impl Gatekeeper {
    pub fn new(sessions: Arc<SessionManager>, policy: Arc<RoutePolicy>) -> Self {
        Self { sessions, policy }
    }

    /// Decide whether a request for `path` carrying `token` may proceed.
    ///
    /// Errors are `InvalidSession` (no token, or it failed verification)
    /// and `Forbidden` (valid session, wrong role).
    pub fn authorize(&self, path: &str, token: Option<&str>) -> Result<Access, AuthError> {
        // Routing matches percent-decoded segments, so the policy must too
        let path = decode_path(path);
        let path = path.as_ref();

        if self.policy.is_exempt(path) {
            return Ok(Access::Exempt);
        }

        let token = token.ok_or(AuthError::InvalidSession)?;
        let claims = self.sessions.verify(token)?;

        if !self.policy.permits(path, claims.role) {
            return Err(AuthError::Forbidden);
        }

        Ok(Access::Granted(claims))
    }

    /// Whether `role` may open `path` under the role rules, ignoring exemptions
    pub fn permits(&self, path: &str, role: Role) -> bool {
        self.policy.permits(&decode_path(path), role)
    }
}

fn decode_path(path: &str) -> Cow<'_, str> {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Owned(
            String::from_utf8_lossy(&urlencoding::decode_binary(path.as_bytes())).into_owned(),
        ),
    }
}

/// Gatekeeper middleware
///
/// On success the verified claims are added to the request extensions and
/// the request is otherwise forwarded untouched.
pub async fn gatekeeper_middleware(
    State(gate): State<Gatekeeper>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let token = session_token(request.headers());

    match gate.authorize(&path, token.as_deref()) {
        Ok(Access::Exempt) => next.run(request).await,
        Ok(Access::Granted(claims)) => {
            debug!("Gate passed {} for user {} ({})", path, claims.user_id, claims.role);
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            let reason = match (&err, token.is_some()) {
                (AuthError::Forbidden, _) => "forbidden",
                (_, false) => "no_session",
                _ => "invalid_session",
            };
            warn!("Gate denied {}: {}", path, reason);
            metrics::counter!("schoolhub_gate_denials_total", "reason" => reason).increment(1);
            Redirect::to("/").into_response()
        }
    }
}
