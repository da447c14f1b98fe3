//! Database models

use crate::utils::parse_datetime_or_now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

/// Error type for parsing models from strings
#[derive(Debug, Clone)]
pub enum ParseError {
    InvalidUserRole(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidUserRole(s) => write!(f, "Invalid user role: {}", s),
        }
    }
}

impl std::error::Error for ParseError {}

/// User role. Every user holds exactly one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    SchoolAdmin,
    Lecturer,
    Student,
    Staff,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::SchoolAdmin,
        Role::Lecturer,
        Role::Student,
        Role::Staff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::SchoolAdmin => "SCHOOL_ADMIN",
            Role::Lecturer => "LECTURER",
            Role::Student => "STUDENT",
            Role::Staff => "STAFF",
        }
    }

    /// Lowercase form used in login URLs (`/login/school-admin`)
    pub fn slug(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super-admin",
            Role::SchoolAdmin => "school-admin",
            Role::Lecturer => "lecturer",
            Role::Student => "student",
            Role::Staff => "staff",
        }
    }

    /// Every role except the platform super admin belongs to a school
    pub fn is_tenant_scoped(&self) -> bool {
        !matches!(self, Role::SuperAdmin)
    }

    /// Root of the dashboard a freshly logged-in user is sent to
    pub fn dashboard_path(&self, school_id: Option<&str>) -> String {
        let section = match self {
            Role::SuperAdmin => return "/super-admin".to_string(),
            Role::SchoolAdmin => "admin",
            Role::Lecturer => "lecturer",
            Role::Student => "student",
            Role::Staff => "staff",
        };

        match school_id {
            Some(id) if !id.is_empty() => format!("/{}/{}", id, section),
            _ => "/".to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    /// Accepts both `SCHOOL_ADMIN` and `school-admin` spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            "SCHOOL_ADMIN" | "ADMIN" => Ok(Role::SchoolAdmin),
            "LECTURER" => Ok(Role::Lecturer),
            "STUDENT" => Ok(Role::Student),
            "STAFF" => Ok(Role::Staff),
            _ => Err(ParseError::InvalidUserRole(s.to_string())),
        }
    }
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: Option<String>,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub school_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name shown in dashboards: full name, then username, then email
    pub fn display_name(&self) -> &str {
        if !self.full_name.is_empty() {
            &self.full_name
        } else if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            username
        } else {
            &self.email
        }
    }
}

/// New user (for insertion)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: Option<String>,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
    pub school_id: Option<String>,
}

/// School (tenant)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// New school (for insertion). A `None` id gets a fresh UUID.
#[derive(Debug, Clone)]
pub struct NewSchool {
    pub id: Option<String>,
    pub name: String,
    pub address: Option<String>,
}

/// School together with the number of users attached to it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolSummary {
    #[serde(flatten)]
    pub school: School,
    pub user_count: i64,
}

/// Platform-wide counters for the super-admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_schools: i64,
    pub active_schools: i64,
    pub total_users: i64,
}

/// Per-school head counts for the school-admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolStats {
    pub total_students: i64,
    pub total_lecturers: i64,
    pub total_staff: i64,
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&sqlx::sqlite::SqliteRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let role_str: String = row.try_get("role")?;
        let role = Role::from_str(&role_str).map_err(|e| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: Box::new(e),
        })?;
        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            full_name: row.try_get("full_name")?,
            password_hash: row.try_get("password_hash")?,
            role,
            school_id: row.try_get("school_id")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for School {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(School {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            is_active: row.try_get("is_active")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
        })
    }
}
