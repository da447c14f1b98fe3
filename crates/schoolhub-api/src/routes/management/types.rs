//! Request/Response DTOs for the management API

use schoolhub_auth::SessionClaims;
use schoolhub_db::{Role, User};
use serde::{Deserialize, Serialize};

// ==================== Auth Types ====================

/// Sign-in form posted by the login pages
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
    /// Role page the form was submitted from. Only used to pick the error URL.
    #[serde(default)]
    pub role: Option<String>,
}

/// JSON login request. `email` is accepted as an alias of `identifier`.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "email", alias = "username")]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Public view of the signed-in user
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i64,
    pub email: String,
    pub username: Option<String>,
    pub name: String,
    pub role: Role,
    pub school_id: Option<String>,
}

impl From<&SessionClaims> for SessionUser {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            id: claims.user_id,
            email: claims.email.clone(),
            username: claims.username.clone(),
            name: claims.name.clone(),
            role: claims.role,
            school_id: claims.school_id.clone(),
        }
    }
}

/// JSON login response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub role: Role,
    /// Dashboard the client should navigate to
    pub redirect: String,
    /// Seconds until the session expires
    pub expires_in: i64,
    pub user: SessionUser,
}

/// `GET /api/auth/me` response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: SessionUser,
    pub dashboard: String,
    pub expires_at: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// ==================== School Types ====================

#[derive(Deserialize)]
pub struct CreateSchoolRequest {
    pub id: Option<String>,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchoolStatusRequest {
    pub is_active: bool,
}

// ==================== User Types ====================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub username: Option<String>,
    pub full_name: String,
    pub password: String,
    pub role: Role,
}

/// `?role=` filter on user listings
#[derive(Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
}

/// User response (without password)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: Option<String>,
    pub full_name: String,
    pub role: Role,
    pub school_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
            school_id: user.school_id,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}
