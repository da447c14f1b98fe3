//! In-memory store
//!
//! Implements the same repository traits as [`Database`](crate::Database)
//! over plain vectors. Used for demos and tests; nothing survives a restart.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::DbError;
use crate::models::{NewSchool, NewUser, PlatformStats, Role, School, SchoolSummary, User};
use crate::repository::{SchoolRepository, UserRepository};
use crate::utils::normalize_email;

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    schools: Vec<School>,
    next_user_id: i64,
}

/// Cloneable handle to a shared in-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(user: &User, school_id: Option<&str>, role: Option<Role>) -> bool {
        school_id.is_none_or(|id| user.school_id.as_deref() == Some(id))
            && role.is_none_or(|r| user.role == r)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, DbError> {
        let email = normalize_email(identifier);
        let inner = self.inner.read();
        let found = inner
            .users
            .iter()
            .find(|u| u.email == email)
            .or_else(|| {
                inner
                    .users
                    .iter()
                    .find(|u| u.username.as_deref() == Some(identifier))
            });
        Ok(found.cloned())
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        Ok(self.inner.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let email = normalize_email(&user.email);
        let mut inner = self.inner.write();

        if inner.users.iter().any(|u| u.email == email) {
            return Err(DbError::Duplicate(format!("User '{}' already exists", email)));
        }
        if let Some(username) = &user.username
            && inner.users.iter().any(|u| u.username.as_ref() == Some(username))
        {
            return Err(DbError::Duplicate(format!("Username '{}' is taken", username)));
        }
        if let Some(school_id) = &user.school_id
            && !inner.schools.iter().any(|s| &s.id == school_id)
        {
            return Err(DbError::NotFound(format!("School: {}", school_id)));
        }

        inner.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: inner.next_user_id,
            email,
            username: user.username,
            full_name: user.full_name,
            password_hash: user.password_hash,
            role: user.role,
            school_id: user.school_id,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn list_users(
        &self,
        school_id: Option<&str>,
        role: Option<Role>,
    ) -> Result<Vec<User>, DbError> {
        let inner = self.inner.read();
        // Newest first, matching the SQL ordering
        Ok(inner
            .users
            .iter()
            .rev()
            .filter(|u| Self::matches(u, school_id, role))
            .cloned()
            .collect())
    }

    async fn count_users(
        &self,
        school_id: Option<&str>,
        role: Option<Role>,
    ) -> Result<i64, DbError> {
        let inner = self.inner.read();
        Ok(inner
            .users
            .iter()
            .filter(|u| Self::matches(u, school_id, role))
            .count() as i64)
    }

    async fn update_user_password(&self, id: i64, password_hash: &str) -> Result<bool, DbError> {
        let mut inner = self.inner.write();
        match inner.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: i64) -> Result<bool, DbError> {
        let mut inner = self.inner.write();
        let before = inner.users.len();
        inner.users.retain(|u| u.id != id);
        Ok(inner.users.len() < before)
    }
}

#[async_trait]
impl SchoolRepository for MemoryStore {
    async fn insert_school(&self, school: NewSchool) -> Result<School, DbError> {
        let id = school
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut inner = self.inner.write();

        if inner.schools.iter().any(|s| s.id == id) {
            return Err(DbError::Duplicate(format!("School '{}' already exists", id)));
        }

        let school = School {
            id,
            name: school.name,
            address: school.address,
            is_active: true,
            created_at: Utc::now(),
        };
        inner.schools.push(school.clone());
        Ok(school)
    }

    async fn get_school(&self, id: &str) -> Result<Option<School>, DbError> {
        Ok(self.inner.read().schools.iter().find(|s| s.id == id).cloned())
    }

    async fn list_schools(&self) -> Result<Vec<SchoolSummary>, DbError> {
        let inner = self.inner.read();
        Ok(inner
            .schools
            .iter()
            .rev()
            .map(|school| SchoolSummary {
                user_count: inner
                    .users
                    .iter()
                    .filter(|u| u.school_id.as_deref() == Some(school.id.as_str()))
                    .count() as i64,
                school: school.clone(),
            })
            .collect())
    }

    async fn set_school_active(&self, id: &str, is_active: bool) -> Result<bool, DbError> {
        let mut inner = self.inner.write();
        match inner.schools.iter_mut().find(|s| s.id == id) {
            Some(school) => {
                school.is_active = is_active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn platform_stats(&self) -> Result<PlatformStats, DbError> {
        let inner = self.inner.read();
        Ok(PlatformStats {
            total_schools: inner.schools.len() as i64,
            active_schools: inner.schools.iter().filter(|s| s.is_active).count() as i64,
            total_users: inner.users.len() as i64,
        })
    }
}
