//! School (tenant) operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{NewSchool, PlatformStats, School, SchoolSummary};
use crate::repository::{Database, SchoolRepository};

#[async_trait]
impl SchoolRepository for Database {
    async fn insert_school(&self, school: NewSchool) -> Result<School, DbError> {
        let now = Utc::now();
        let id = school
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if self.get_school(&id).await?.is_some() {
            return Err(DbError::Duplicate(format!("School '{}' already exists", id)));
        }

        sqlx::query(
            r#"
            INSERT INTO schools (id, name, address, is_active, created_at)
            VALUES (?, ?, ?, 1, ?)
            "#,
        )
        .bind(&id)
        .bind(&school.name)
        .bind(&school.address)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_write(e, &format!("School '{}'", id)))?;

        Ok(School {
            id,
            name: school.name,
            address: school.address,
            is_active: true,
            created_at: now,
        })
    }

    async fn get_school(&self, id: &str) -> Result<Option<School>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, name, address, is_active, created_at
            FROM schools
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| School::try_from(&row).map_err(DbError::from)).transpose()
    }

    async fn list_schools(&self) -> Result<Vec<SchoolSummary>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.name, s.address, s.is_active, s.created_at,
                   (SELECT COUNT(*) FROM users u WHERE u.school_id = s.id) AS user_count
            FROM schools s
            ORDER BY s.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SchoolSummary {
                    school: School::try_from(row)?,
                    user_count: row.try_get("user_count")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(DbError::from)
    }

    async fn set_school_active(&self, id: &str, is_active: bool) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE schools SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn platform_stats(&self) -> Result<PlatformStats, DbError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM schools) AS total_schools,
                (SELECT COUNT(*) FROM schools WHERE is_active = 1) AS active_schools,
                (SELECT COUNT(*) FROM users) AS total_users
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PlatformStats {
            total_schools: row.try_get("total_schools")?,
            active_schools: row.try_get("active_schools")?,
            total_users: row.try_get("total_users")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_school(id: Option<&str>, name: &str) -> NewSchool {
        NewSchool {
            id: id.map(str::to_string),
            name: name.to_string(),
            address: Some("742 Evergreen Terrace".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_get_and_toggle() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let school = db.insert_school(new_school(None, "Xavier Institute")).await.unwrap();
        assert!(school.is_active);
        assert!(uuid::Uuid::parse_str(&school.id).is_ok());

        let fetched = db.get_school(&school.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Xavier Institute");

        assert!(db.set_school_active(&school.id, false).await.unwrap());
        let fetched = db.get_school(&school.id).await.unwrap().unwrap();
        assert!(!fetched.is_active);

        assert!(!db.set_school_active("missing", true).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.insert_school(new_school(Some("s1"), "A")).await.unwrap();
        let result = db.insert_school(new_school(Some("s1"), "B")).await;
        assert!(matches!(result, Err(DbError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_platform_stats_and_summaries() {
        use crate::models::{NewUser, Role};
        use crate::repository::UserRepository;

        let db = Database::new("sqlite::memory:").await.unwrap();
        db.insert_school(new_school(Some("s1"), "A")).await.unwrap();
        db.insert_school(new_school(Some("s2"), "B")).await.unwrap();
        db.set_school_active("s2", false).await.unwrap();
        db.insert_user(NewUser {
            email: "a@x.com".to_string(),
            username: None,
            full_name: "A".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Student,
            school_id: Some("s1".to_string()),
        })
        .await
        .unwrap();

        let stats = db.platform_stats().await.unwrap();
        assert_eq!(
            stats,
            PlatformStats {
                total_schools: 2,
                active_schools: 1,
                total_users: 1,
            }
        );

        let summaries = db.list_schools().await.unwrap();
        assert_eq!(summaries.len(), 2);
        let s1 = summaries.iter().find(|s| s.school.id == "s1").unwrap();
        assert_eq!(s1.user_count, 1);
    }
}
