use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{password, ROLE_ADMIN};
use crate::config::AdminConfig;

/// User record in the database. Soft-deleted rows are filtered out by every
/// query here.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE username = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(db)
        .await
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, username, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_optional(db)
        .await
    }

    pub async fn update_role(db: &PgPool, id: Uuid, role: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = $2, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, username, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(role)
        .fetch_optional(db)
        .await
    }

    pub async fn soft_delete(db: &PgPool, id: Uuid) -> sqlx::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Paginated listing with an optional username/email keyword filter.
    pub async fn list(
        db: &PgPool,
        keyword: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<User>> {
        match keyword {
            Some(kw) => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, username, email, password_hash, role, created_at, updated_at
                    FROM users
                    WHERE deleted_at IS NULL
                      AND (username ILIKE $1 OR email ILIKE $1)
                    ORDER BY created_at
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(format!("%{kw}%"))
                .bind(limit)
                .bind(offset)
                .fetch_all(db)
                .await
            }
            None => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, username, email, password_hash, role, created_at, updated_at
                    FROM users
                    WHERE deleted_at IS NULL
                    ORDER BY created_at
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(db)
                .await
            }
        }
    }

    pub async fn count(db: &PgPool, keyword: Option<&str>) -> sqlx::Result<i64> {
        match keyword {
            Some(kw) => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*) FROM users
                    WHERE deleted_at IS NULL
                      AND (username ILIKE $1 OR email ILIKE $1)
                    "#,
                )
                .bind(format!("%{kw}%"))
                .fetch_one(db)
                .await
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    r#"SELECT COUNT(*) FROM users WHERE deleted_at IS NULL"#,
                )
                .fetch_one(db)
                .await
            }
        }
    }

    pub async fn count_admins(db: &PgPool) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM users WHERE role = $1 AND deleted_at IS NULL"#,
        )
        .bind(ROLE_ADMIN)
        .fetch_one(db)
        .await
    }

    /// Create the default administrator account when none exists yet.
    pub async fn ensure_admin(db: &PgPool, admin: &AdminConfig) -> anyhow::Result<()> {
        if Self::count_admins(db).await? > 0 {
            tracing::debug!("administrator account already present");
            return Ok(());
        }

        let hash = password::hash_password(&admin.password)?;
        let user = Self::create(db, &admin.username, &admin.email, &hash, ROLE_ADMIN).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "created default administrator account");
        Ok(())
    }
}
