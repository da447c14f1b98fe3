//! Platform and school management routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use schoolhub_db::{NewSchool, PlatformStats, Role, School, SchoolStats, SchoolSummary};
use tracing::info;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

use super::auth::{RequireSession, RequireSuperAdmin, ensure_school_admin};
use super::types::{CreateSchoolRequest, UpdateSchoolStatusRequest};

/// Maximum allowed school name length
const MAX_SCHOOL_NAME_LENGTH: usize = 200;
/// Maximum allowed school id length
const MAX_SCHOOL_ID_LENGTH: usize = 64;

fn validate_school_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::BadRequest("School name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_SCHOOL_NAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "School name exceeds maximum length of {} characters",
            MAX_SCHOOL_NAME_LENGTH
        )));
    }
    Ok(())
}

/// School ids appear as the first path segment of tenant pages
fn validate_school_id(id: &str) -> Result<(), ApiError> {
    if id.is_empty() || id.len() > MAX_SCHOOL_ID_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "School id must be 1 to {} characters",
            MAX_SCHOOL_ID_LENGTH
        )));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ApiError::BadRequest(
            "School id can only contain letters, digits, underscores, and hyphens".to_string(),
        ));
    }
    // Would shadow the platform's own top-level pages
    if matches!(id, "api" | "login" | "logout" | "super-admin" | "health" | "healthz" | "metrics") {
        return Err(ApiError::BadRequest(format!("School id {} is reserved", id)));
    }
    Ok(())
}

pub(crate) async fn load_school(state: &AppState, id: &str) -> Result<School, ApiError> {
    state
        .schools
        .get_school(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("School: {}", id)))
}

/// GET /api/platform/stats (Super admin only)
async fn platform_stats(
    _admin: RequireSuperAdmin,
    State(state): State<AppState>,
) -> Result<Json<PlatformStats>, ApiError> {
    Ok(Json(state.schools.platform_stats().await?))
}

/// GET /api/schools (Super admin only)
async fn list_schools(
    _admin: RequireSuperAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<SchoolSummary>>, ApiError> {
    Ok(Json(state.schools.list_schools().await?))
}

/// POST /api/schools (Super admin only)
async fn create_school(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateSchoolRequest>,
) -> Result<(StatusCode, Json<School>), ApiError> {
    let name = request.name.trim().to_string();
    validate_school_name(&name)?;

    let id = request
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    if let Some(id) = &id {
        validate_school_id(id)?;
    }

    let address = request
        .address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    let school = state
        .schools
        .insert_school(NewSchool { id, name, address })
        .await?;

    info!("User {} created school {} ({})", admin.user_id, school.id, school.name);
    Ok((StatusCode::CREATED, Json(school)))
}

/// PUT /api/schools/{id}/status (Super admin only)
async fn update_school_status(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateSchoolStatusRequest>,
) -> Result<Json<School>, ApiError> {
    if !state.schools.set_school_active(&id, request.is_active).await? {
        return Err(ApiError::NotFound(format!("School: {}", id)));
    }

    info!(
        "User {} set school {} active={}",
        admin.user_id, id, request.is_active
    );
    Ok(Json(load_school(&state, &id).await?))
}

/// GET /api/schools/{id}/stats (Super admin or that school's admin)
async fn school_stats(
    RequireSession(claims): RequireSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SchoolStats>, ApiError> {
    ensure_school_admin(&claims, &id)?;
    load_school(&state, &id).await?;

    let scope = Some(id.as_str());
    Ok(Json(SchoolStats {
        total_students: state.users.count_users(scope, Some(Role::Student)).await?,
        total_lecturers: state.users.count_users(scope, Some(Role::Lecturer)).await?,
        total_staff: state.users.count_users(scope, Some(Role::Staff)).await?,
    }))
}

/// Create school routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/platform/stats", get(platform_stats))
        .route("/api/schools", get(list_schools).post(create_school))
        .route("/api/schools/{id}/status", put(update_school_status))
        .route("/api/schools/{id}/stats", get(school_stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_school_id() {
        assert!(validate_school_id("s1").is_ok());
        assert!(validate_school_id("springfield-high_2").is_ok());
        assert!(validate_school_id("").is_err());
        assert!(validate_school_id("has space").is_err());
        assert!(validate_school_id("a/b").is_err());
        assert!(validate_school_id("super-admin").is_err());
        assert!(validate_school_id("login").is_err());
        assert!(validate_school_id(&"x".repeat(MAX_SCHOOL_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_school_name() {
        assert!(validate_school_name("Springfield High").is_ok());
        assert!(validate_school_name("").is_err());
        assert!(validate_school_name(&"n".repeat(MAX_SCHOOL_NAME_LENGTH + 1)).is_err());
    }
}
