//! School user management routes

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};
use schoolhub_auth::hash_password;
use schoolhub_db::{NewUser, utils::normalize_email};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

use super::auth::{RequireSession, ensure_school_admin, validate_new_password};
use super::schools::load_school;
use super::types::{CreateUserRequest, UserListQuery, UserResponse};

// ==================== Input Validation ====================

/// Maximum allowed username length
const MAX_USERNAME_LENGTH: usize = 64;
/// Maximum allowed email length
const MAX_EMAIL_LENGTH: usize = 254;
/// Maximum allowed full name length
const MAX_FULL_NAME_LENGTH: usize = 200;

/// Validate username format and length
fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username cannot be empty".to_string()));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Username exceeds maximum length of {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    // Only allow alphanumeric characters, underscores, and hyphens
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ApiError::BadRequest(
            "Username can only contain alphanumeric characters, underscores, and hyphens"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Email exceeds maximum length of {} characters",
            MAX_EMAIL_LENGTH
        )));
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(ApiError::BadRequest(format!("Invalid email: {}", email))),
    }
}

fn validate_full_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::BadRequest("Full name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_FULL_NAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Full name exceeds maximum length of {} characters",
            MAX_FULL_NAME_LENGTH
        )));
    }
    Ok(())
}

// ==================== User Routes ====================

/// GET /api/schools/{id}/users?role=
async fn list_users(
    RequireSession(claims): RequireSession,
    State(state): State<AppState>,
    Path(school_id): Path<String>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    ensure_school_admin(&claims, &school_id)?;
    load_school(&state, &school_id).await?;

    let users = state.users.list_users(Some(&school_id), query.role).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// POST /api/schools/{id}/users
async fn create_user(
    RequireSession(claims): RequireSession,
    State(state): State<AppState>,
    Path(school_id): Path<String>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    ensure_school_admin(&claims, &school_id)?;

    if !request.role.is_tenant_scoped() {
        return Err(ApiError::BadRequest(format!(
            "Role {} cannot belong to a school",
            request.role
        )));
    }

    let email = normalize_email(&request.email);
    validate_email(&email)?;
    let full_name = request.full_name.trim().to_string();
    validate_full_name(&full_name)?;
    let username = request
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    if let Some(username) = &username {
        validate_username(username)?;
    }
    validate_new_password(&request.password)?;

    let school = load_school(&state, &school_id).await?;
    if !school.is_active {
        return Err(ApiError::BadRequest(format!(
            "School {} is deactivated",
            school.id
        )));
    }

    debug!("Creating {} {} in school {}", request.role, email, school.id);

    let password_hash = hash_password(&request.password)?;
    let user = state
        .users
        .insert_user(NewUser {
            email,
            username,
            full_name,
            password_hash,
            role: request.role,
            school_id: Some(school.id),
        })
        .await?;

    info!(
        "User {} created {} {} in school {}",
        claims.user_id,
        user.role,
        user.id,
        school_id
    );
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// DELETE /api/schools/{id}/users/{user_id}
async fn delete_user(
    RequireSession(claims): RequireSession,
    State(state): State<AppState>,
    Path((school_id, user_id)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    ensure_school_admin(&claims, &school_id)?;

    if user_id == claims.user_id {
        return Err(ApiError::BadRequest("Cannot delete your own account".to_string()));
    }

    let user = state
        .users
        .get_user_by_id(user_id)
        .await?
        .filter(|u| u.school_id.as_deref() == Some(school_id.as_str()))
        .ok_or_else(|| ApiError::NotFound(format!("User: {}", user_id)))?;

    if !state.users.delete_user(user.id).await? {
        return Err(ApiError::NotFound(format!("User: {}", user_id)));
    }

    info!(
        "User {} deleted user {} from school {}",
        claims.user_id, user_id, school_id
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Create user routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/schools/{id}/users",
            get(list_users).post(create_user),
        )
        .route("/api/schools/{id}/users/{user_id}", delete(delete_user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a b@x.com").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("admin_springfield").is_ok());
        assert!(validate_username("a-b").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("a@b").is_err());
        assert!(validate_username(&"u".repeat(MAX_USERNAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_full_name() {
        assert!(validate_full_name("Ada Obi").is_ok());
        assert!(validate_full_name("").is_err());
    }
}
