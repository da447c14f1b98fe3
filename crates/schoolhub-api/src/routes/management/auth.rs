//! Authentication extractors and routes

use axum::{
    Form, Json, Router,
    extract::{FromRef, FromRequestParts, State},
    http::{
        StatusCode,
        header::{AUTHORIZATION, SET_COOKIE},
        request::Parts,
    },
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
};
use schoolhub_auth::{
    AuthError, IssuedSession, SessionClaims, clear_session_cookie, hash_password, session_cookie,
    session_token, verify_password,
};
use schoolhub_db::Role;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

use super::types::{
    ChangePasswordRequest, LoginForm, LoginRequest, LoginResponse, MeResponse, SessionUser,
};

// ==================== Auth Extractors ====================

/// Extractor for a signed-in user (required)
///
/// Reuses the claims the gatekeeper already verified when present, otherwise
/// reads the session cookie or an `Authorization: Bearer` header.
pub struct RequireSession(pub SessionClaims);

impl<S> FromRequestParts<S> for RequireSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<SessionClaims>() {
            return Ok(RequireSession(claims.clone()));
        }

        let app_state = AppState::from_ref(state);

        let token = session_token(&parts.headers)
            .or_else(|| {
                parts
                    .headers
                    .get(AUTHORIZATION)
                    .and_then(|h| h.to_str().ok())
                    .and_then(|h| h.strip_prefix("Bearer "))
                    .map(str::to_string)
            })
            .ok_or(ApiError::Unauthorized)?;

        let claims = app_state
            .sessions
            .verify(&token)
            .map_err(|_| ApiError::Unauthorized)?;

        debug!("Authenticated user: {} ({})", claims.user_id, claims.role);
        Ok(RequireSession(claims))
    }
}

/// Extractor for a platform administrator (required)
pub struct RequireSuperAdmin(pub SessionClaims);

impl<S> FromRequestParts<S> for RequireSuperAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireSession(claims) = RequireSession::from_request_parts(parts, state).await?;

        if claims.role != Role::SuperAdmin {
            return Err(ApiError::Forbidden);
        }

        Ok(RequireSuperAdmin(claims))
    }
}

/// Super admins manage every school; a school admin only their own
pub(crate) fn ensure_school_admin(claims: &SessionClaims, school_id: &str) -> Result<(), ApiError> {
    match claims.role {
        Role::SuperAdmin => Ok(()),
        Role::SchoolAdmin if claims.school_id.as_deref() == Some(school_id) => Ok(()),
        _ => Err(ApiError::Forbidden),
    }
}

// ==================== Input Validation ====================

/// Maximum allowed password length (prevent DoS with very large passwords)
pub(crate) const MAX_PASSWORD_LENGTH: usize = 256;
/// Minimum length for newly chosen passwords
pub(crate) const MIN_PASSWORD_LENGTH: usize = 8;

/// Validate a newly chosen password
pub(crate) fn validate_new_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

// ==================== Sign-in ====================

/// Verify credentials and mint a session. Shared by the form and JSON entry points.
async fn authenticate(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> Result<IssuedSession, AuthError> {
    if password.len() > MAX_PASSWORD_LENGTH {
        metrics::counter!("schoolhub_logins_total", "outcome" => "invalid_credentials")
            .increment(1);
        return Err(AuthError::InvalidCredentials);
    }

    let result = async {
        let user = state.credentials.verify(identifier, password).await?;
        state.sessions.issue(&user)
    }
    .await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(AuthError::MissingFields) => "missing_fields",
        Err(AuthError::InvalidCredentials) => "invalid_credentials",
        Err(_) => "error",
    };
    metrics::counter!("schoolhub_logins_total", "outcome" => outcome).increment(1);

    if let Ok(issued) = &result {
        info!(
            "User {} signed in as {}",
            issued.claims.user_id, issued.claims.role
        );
    }

    result
}

/// Login page to send a failed sign-in back to.
///
/// A recognised role hint returns to that role's page; anything else to
/// the generic one.
fn login_error_url(role_hint: Option<&str>, err: &AuthError) -> String {
    let page = match role_hint.and_then(|hint| hint.parse::<Role>().ok()) {
        Some(role) => format!("/login/{}", role.slug()),
        None => "/login".to_string(),
    };
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("error", &err.public_message())
        .finish();
    format!("{}?{}", page, query)
}

fn log_ignored_hint(hint: Option<&str>, claims: &SessionClaims) {
    if let Some(hint) = hint
        && hint.parse::<Role>().ok() != Some(claims.role)
    {
        debug!(
            "Ignoring role hint {:?} for user {} ({})",
            hint, claims.user_id, claims.role
        );
    }
}

/// POST /login (form)
///
/// Success and credential failures both answer with 303; only a broken
/// store or signer produces an error status.
async fn login_form(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match authenticate(&state, &form.identifier, &form.password).await {
        Ok(issued) => {
            log_ignored_hint(form.role.as_deref(), &issued.claims);
            let cookie = session_cookie(
                &issued.token,
                state.sessions.lifetime(),
                state.secure_cookies,
            );
            (
                [(SET_COOKIE, cookie)],
                Redirect::to(&issued.claims.dashboard_path()),
            )
                .into_response()
        }
        Err(err) if err.status().is_server_error() => ApiError::Auth(err).into_response(),
        Err(err) => {
            warn!("Sign-in failed: {}", err);
            Redirect::to(&login_error_url(form.role.as_deref(), &err)).into_response()
        }
    }
}

/// POST /api/auth/login
async fn login_json(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let issued = authenticate(&state, &request.identifier, &request.password).await?;
    log_ignored_hint(request.role.as_deref(), &issued.claims);

    let cookie = session_cookie(
        &issued.token,
        state.sessions.lifetime(),
        state.secure_cookies,
    );

    let body = LoginResponse {
        message: "Login successful".to_string(),
        redirect: issued.claims.dashboard_path(),
        role: issued.claims.role,
        expires_in: state.sessions.lifetime().num_seconds(),
        user: SessionUser::from(&issued.claims),
        token: issued.token,
    };

    Ok((StatusCode::OK, [(SET_COOKIE, cookie)], Json(body)).into_response())
}

// ==================== Sign-out ====================

/// POST /api/auth/logout
async fn logout_json(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_session_cookie(state.secure_cookies))],
    )
}

/// POST /logout (form)
async fn logout_form(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(SET_COOKIE, clear_session_cookie(state.secure_cookies))],
        Redirect::to("/"),
    )
}

// ==================== Session ====================

/// GET /api/auth/me
async fn me(RequireSession(claims): RequireSession) -> Json<MeResponse> {
    Json(MeResponse {
        user: SessionUser::from(&claims),
        dashboard: claims.dashboard_path(),
        expires_at: claims.exp,
    })
}

/// PUT /api/auth/password
///
/// Existing sessions stay valid until they expire.
async fn change_password(
    RequireSession(claims): RequireSession,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    validate_new_password(&request.new_password)?;

    let user = state
        .users
        .get_user_by_id(claims.user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if request.current_password.len() > MAX_PASSWORD_LENGTH
        || !verify_password(&request.current_password, &user.password_hash)?
    {
        return Err(AuthError::InvalidCredentials.into());
    }

    let password_hash = hash_password(&request.new_password)?;
    if !state
        .users
        .update_user_password(user.id, &password_hash)
        .await?
    {
        return Err(ApiError::NotFound(format!("User: {}", user.id)));
    }

    info!("User {} changed their password", user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login_form))
        .route("/logout", post(logout_form))
        .route("/api/auth/login", post(login_json))
        .route("/api/auth/logout", post(logout_json))
        .route("/api/auth/me", get(me))
        .route("/api/auth/password", put(change_password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_url_uses_known_role_page() {
        let url = login_error_url(Some("school-admin"), &AuthError::InvalidCredentials);
        assert_eq!(url, "/login/school-admin?error=Invalid+credentials");

        let url = login_error_url(Some("STUDENT"), &AuthError::InvalidCredentials);
        assert!(url.starts_with("/login/student?error="));
    }

    #[test]
    fn test_login_error_url_falls_back_to_generic_page() {
        for hint in [None, Some(""), Some("janitor"), Some("../../etc")] {
            let url = login_error_url(hint, &AuthError::MissingFields);
            assert!(url.starts_with("/login?error="), "{}", url);
        }
    }

    fn claims(role: Role, school_id: Option<&str>) -> SessionClaims {
        SessionClaims {
            user_id: 1,
            email: "a@x.com".to_string(),
            username: None,
            name: "A".to_string(),
            role,
            school_id: school_id.map(str::to_string),
            iat: 0,
            exp: 0,
        }
    }

    #[test]
    fn test_school_admin_scope() {
        assert!(ensure_school_admin(&claims(Role::SuperAdmin, None), "s1").is_ok());
        assert!(ensure_school_admin(&claims(Role::SchoolAdmin, Some("s1")), "s1").is_ok());
        assert!(matches!(
            ensure_school_admin(&claims(Role::SchoolAdmin, Some("s2")), "s1"),
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            ensure_school_admin(&claims(Role::Lecturer, Some("s1")), "s1"),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn test_validate_new_password() {
        assert!(validate_new_password("longenough").is_ok());
        assert!(validate_new_password("short").is_err());
        assert!(validate_new_password(&"x".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }
}
