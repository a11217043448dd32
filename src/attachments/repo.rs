use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Attachment record. `filepath` is relative to the store root and never
/// leaves the backend.
#[derive(Debug, Clone, FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub note_id: Option<Uuid>,
    pub user_id: Uuid,
    pub filename: String,
    pub filepath: String,
    pub filetype: String,
    pub filesize: i64,
    pub is_temp: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewAttachment<'a> {
    pub note_id: Option<Uuid>,
    pub user_id: Uuid,
    pub filename: &'a str,
    pub filepath: &'a str,
    pub filetype: &'a str,
    pub filesize: i64,
    pub is_temp: bool,
}

const ATTACHMENT_COLUMNS: &str =
    "id, note_id, user_id, filename, filepath, filetype, filesize, is_temp, created_at, updated_at";

/// Day-bucket expression for the library view, defined once. Attachment
/// timestamps are TIMESTAMPTZ, so bucketing pins them to UTC days.
const DAY_BUCKET: &str = "(a.created_at AT TIME ZONE 'UTC')::date";

impl Attachment {
    pub async fn insert(db: &PgPool, new: NewAttachment<'_>) -> sqlx::Result<Attachment> {
        sqlx::query_as::<_, Attachment>(&format!(
            r#"
            INSERT INTO attachments (note_id, user_id, filename, filepath, filetype, filesize, is_temp)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ATTACHMENT_COLUMNS}
            "#
        ))
        .bind(new.note_id)
        .bind(new.user_id)
        .bind(new.filename)
        .bind(new.filepath)
        .bind(new.filetype)
        .bind(new.filesize)
        .bind(new.is_temp)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Attachment>> {
        sqlx::query_as::<_, Attachment>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn list_by_note(db: &PgPool, note_id: Uuid) -> sqlx::Result<Vec<Attachment>> {
        sqlx::query_as::<_, Attachment>(&format!(
            r#"
            SELECT {ATTACHMENT_COLUMNS}
            FROM attachments
            WHERE note_id = $1 AND deleted_at IS NULL
            ORDER BY created_at
            "#
        ))
        .bind(note_id)
        .fetch_all(db)
        .await
    }

    pub async fn list_for_notes(db: &PgPool, note_ids: &[Uuid]) -> sqlx::Result<Vec<Attachment>> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Attachment>(&format!(
            r#"
            SELECT {ATTACHMENT_COLUMNS}
            FROM attachments
            WHERE note_id = ANY($1) AND deleted_at IS NULL
            ORDER BY created_at
            "#
        ))
        .bind(note_ids)
        .fetch_all(db)
        .await
    }

    /// Bind a temporary attachment to a note. The guard in the WHERE clause
    /// keeps the whole precondition check and the flip in one statement, so
    /// a lost race shows up as zero rows.
    pub async fn bind_to_note(db: &PgPool, id: Uuid, note_id: Uuid) -> sqlx::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE attachments
            SET note_id = $2, is_temp = FALSE, updated_at = now()
            WHERE id = $1 AND is_temp = TRUE AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(note_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete(db: &PgPool, id: Uuid) -> sqlx::Result<u64> {
        let result =
            sqlx::query("UPDATE attachments SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(db)
                .await?;
        Ok(result.rows_affected())
    }

    /// Remove the row entirely. Used to undo an insert whose staged file
    /// could not be moved into place.
    pub async fn hard_delete(db: &PgPool, id: Uuid) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    /// One page of the user's bound attachments, newest first, optionally
    /// narrowed to a MIME-type prefix.
    pub async fn library_page(
        db: &PgPool,
        user_id: Uuid,
        filetype: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<Attachment>> {
        sqlx::query_as::<_, Attachment>(
            r#"
            SELECT a.id, a.note_id, a.user_id, a.filename, a.filepath, a.filetype,
                   a.filesize, a.is_temp, a.created_at, a.updated_at
            FROM attachments a
            JOIN notes n ON n.id = a.note_id
            WHERE n.user_id = $1 AND a.deleted_at IS NULL AND n.deleted_at IS NULL
              AND ($2::text IS NULL OR a.filetype LIKE $2 || '%')
            ORDER BY a.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(filetype)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn library_count(
        db: &PgPool,
        user_id: Uuid,
        filetype: Option<&str>,
    ) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM attachments a
            JOIN notes n ON n.id = a.note_id
            WHERE n.user_id = $1 AND a.deleted_at IS NULL AND n.deleted_at IS NULL
              AND ($2::text IS NULL OR a.filetype LIKE $2 || '%')
            "#,
        )
        .bind(user_id)
        .bind(filetype)
        .fetch_one(db)
        .await
    }

    /// Upload-day histogram for the library sidebar, newest day first.
    pub async fn date_groups(
        db: &PgPool,
        user_id: Uuid,
        filetype: Option<&str>,
    ) -> sqlx::Result<Vec<(Date, i64)>> {
        sqlx::query_as::<_, (Date, i64)>(&format!(
            r#"
            SELECT {DAY_BUCKET} AS date, COUNT(a.id) AS count
            FROM attachments a
            JOIN notes n ON n.id = a.note_id
            WHERE n.user_id = $1 AND a.deleted_at IS NULL AND n.deleted_at IS NULL
              AND ($2::text IS NULL OR a.filetype LIKE $2 || '%')
            GROUP BY 1
            ORDER BY 1 DESC
            "#
        ))
        .bind(user_id)
        .bind(filetype)
        .fetch_all(db)
        .await
    }
}
