//! User operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{NewUser, Role, User};
use crate::repository::{Database, UserRepository};
use crate::utils::normalize_email;

const USER_COLUMNS: &str =
    "id, email, username, full_name, password_hash, role, school_id, created_at, updated_at";

impl Database {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let result = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let result = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }
}

#[async_trait]
impl UserRepository for Database {
    async fn find_user_by_identifier(&self, identifier: &str) -> Result<Option<User>, DbError> {
        let result = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM users
            WHERE email = ? OR username = ?
            ORDER BY CASE WHEN email = ? THEN 0 ELSE 1 END
            LIMIT 1
            "#,
            USER_COLUMNS
        ))
        .bind(normalize_email(identifier))
        .bind(identifier)
        .bind(normalize_email(identifier))
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        let result = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let now = Utc::now();
        let email = normalize_email(&user.email);

        if self.get_user_by_email(&email).await?.is_some() {
            return Err(DbError::Duplicate(format!("User '{}' already exists", email)));
        }
        if let Some(username) = &user.username
            && self.get_user_by_username(username).await?.is_some()
        {
            return Err(DbError::Duplicate(format!("Username '{}' is taken", username)));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, username, full_name, password_hash, role, school_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&email)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.school_id)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_write(e, &format!("User '{}'", email)))?;

        let id: i64 = result.get("id");

        Ok(User {
            id,
            email,
            username: user.username,
            full_name: user.full_name,
            password_hash: user.password_hash,
            role: user.role,
            school_id: user.school_id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn list_users(
        &self,
        school_id: Option<&str>,
        role: Option<Role>,
    ) -> Result<Vec<User>, DbError> {
        let role = role.map(|r| r.as_str());
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM users
            WHERE (? IS NULL OR school_id = ?) AND (? IS NULL OR role = ?)
            ORDER BY created_at DESC, id DESC
            "#,
            USER_COLUMNS
        ))
        .bind(school_id)
        .bind(school_id)
        .bind(role)
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| User::try_from(row).map_err(DbError::from))
            .collect()
    }

    async fn count_users(
        &self,
        school_id: Option<&str>,
        role: Option<Role>,
    ) -> Result<i64, DbError> {
        let role = role.map(|r| r.as_str());
        let result = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM users
            WHERE (? IS NULL OR school_id = ?) AND (? IS NULL OR role = ?)
            "#,
        )
        .bind(school_id)
        .bind(school_id)
        .bind(role)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(result.get("count"))
    }

    async fn update_user_password(&self, id: i64, password_hash: &str) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(password_hash)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSchool;
    use crate::repository::SchoolRepository;

    async fn test_db() -> Database {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.insert_school(NewSchool {
            id: Some("s1".to_string()),
            name: "Springfield High".to_string(),
            address: None,
        })
        .await
        .unwrap();
        db
    }

    fn new_user(email: &str, username: Option<&str>, role: Role) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: username.map(str::to_string),
            full_name: "Test User".to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            role,
            school_id: Some("s1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_by_identifier() {
        let db = test_db().await;
        let user = db
            .insert_user(new_user("A@X.com", Some("ayo"), Role::SchoolAdmin))
            .await
            .unwrap();
        assert_eq!(user.email, "a@x.com");

        let by_email = db.find_user_by_identifier("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.role, Role::SchoolAdmin);
        assert_eq!(by_email.school_id.as_deref(), Some("s1"));

        let by_username = db.find_user_by_identifier("ayo").await.unwrap().unwrap();
        assert_eq!(by_username.id, user.id);

        assert!(db.find_user_by_identifier("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicates_rejected() {
        let db = test_db().await;
        db.insert_user(new_user("a@x.com", Some("ayo"), Role::Student))
            .await
            .unwrap();

        let dup_email = db.insert_user(new_user("a@x.com", None, Role::Student)).await;
        assert!(matches!(dup_email, Err(DbError::Duplicate(_))));

        let dup_username = db
            .insert_user(new_user("b@x.com", Some("ayo"), Role::Student))
            .await;
        assert!(matches!(dup_username, Err(DbError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_list_and_count_filters() {
        let db = test_db().await;
        db.insert_user(new_user("s1@x.com", None, Role::Student)).await.unwrap();
        db.insert_user(new_user("s2@x.com", None, Role::Student)).await.unwrap();
        db.insert_user(new_user("l1@x.com", None, Role::Lecturer)).await.unwrap();

        assert_eq!(db.count_users(None, None).await.unwrap(), 3);
        assert_eq!(db.count_users(Some("s1"), Some(Role::Student)).await.unwrap(), 2);
        assert_eq!(db.count_users(Some("other"), None).await.unwrap(), 0);

        let lecturers = db.list_users(Some("s1"), Some(Role::Lecturer)).await.unwrap();
        assert_eq!(lecturers.len(), 1);
        assert_eq!(lecturers[0].email, "l1@x.com");
        assert!(db.has_users().await.unwrap());
    }

    #[tokio::test]
    async fn test_update_password_and_delete() {
        let db = test_db().await;
        let user = db
            .insert_user(new_user("a@x.com", None, Role::Staff))
            .await
            .unwrap();

        assert!(db.update_user_password(user.id, "new-hash").await.unwrap());
        let reloaded = db.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash, "new-hash");

        assert!(db.delete_user(user.id).await.unwrap());
        assert!(!db.delete_user(user.id).await.unwrap());
        assert!(db.get_user_by_id(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_school_is_not_found() {
        let db = test_db().await;
        let mut user = new_user("a@x.com", None, Role::Student);
        user.school_id = Some("nowhere".to_string());

        assert!(matches!(db.insert_user(user).await, Err(DbError::NotFound(_))));
        assert!(!db.has_users().await.unwrap());
    }

    #[tokio::test]
    async fn test_unique_violation_is_duplicate() {
        let db = test_db().await;
        db.insert_user(new_user("a@x.com", None, Role::Student))
            .await
            .unwrap();

        // A concurrent insert that passed the pre-check hits the constraint instead
        let err = sqlx::query(
            r#"
            INSERT INTO users (email, full_name, password_hash, role, created_at, updated_at)
            VALUES ('a@x.com', 'Late Writer', 'hash', 'STUDENT', 'now', 'now')
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap_err();

        assert!(matches!(
            DbError::from_write(err, "User 'a@x.com'"),
            DbError::Duplicate(_)
        ));
    }
}
