//! Database repository implementation

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use crate::error::DbError;
use crate::models::{NewSchool, NewUser, PlatformStats, Role, School, SchoolSummary, User};

// Submodules
mod schools;
mod users;

/// User persistence, injected into the authentication components
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find the user whose email or username equals `identifier`.
    /// An email match takes precedence over a username match.
    async fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, DbError>;

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, DbError>;

    /// List users, optionally narrowed to a school and/or a role
    async fn list_users(
        &self,
        school_id: Option<&str>,
        role: Option<Role>,
    ) -> Result<Vec<User>, DbError>;

    async fn count_users(&self, school_id: Option<&str>, role: Option<Role>)
    -> Result<i64, DbError>;

    async fn update_user_password(&self, id: i64, password_hash: &str) -> Result<bool, DbError>;

    async fn delete_user(&self, id: i64) -> Result<bool, DbError>;

    async fn has_users(&self) -> Result<bool, DbError> {
        Ok(self.count_users(None, None).await? > 0)
    }
}

/// School (tenant) persistence
#[async_trait]
pub trait SchoolRepository: Send + Sync {
    async fn insert_school(&self, school: NewSchool) -> Result<School, DbError>;

    async fn get_school(&self, id: &str) -> Result<Option<School>, DbError>;

    /// All schools, newest first, with their user counts
    async fn list_schools(&self) -> Result<Vec<SchoolSummary>, DbError>;

    async fn set_school_active(&self, id: &str, is_active: bool) -> Result<bool, DbError>;

    async fn platform_stats(&self) -> Result<PlatformStats, DbError>;
}

/// Database connection and operations
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(database_url: &str) -> Result<Self, DbError> {
        info!("Connecting to database: {}", database_url);

        // Every connection to `:memory:` opens its own empty database
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect(database_url)
                .await?
        } else {
            SqlitePool::connect(database_url).await?
        };

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Get the underlying pool for advanced usage
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schools (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                address TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                username TEXT UNIQUE,
                full_name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                school_id TEXT REFERENCES schools(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_users_school_role ON users(school_id, role)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

        info!("Database migrations completed");
        Ok(())
    }
}
