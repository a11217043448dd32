use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::tags::repo::Tag;

#[derive(Debug, Clone, FromRow)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub is_public: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// One row per (note, tag) pair, used to hydrate note listings in bulk.
#[derive(Debug, Clone, FromRow)]
pub struct NoteTagRow {
    pub note_id: Uuid,
    pub id: Uuid,
    pub name: String,
}

const NOTE_COLUMNS: &str = "id, user_id, title, content, summary, is_public, created_at, updated_at";

impl Note {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Note>> {
        sqlx::query_as::<_, Note>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Insert the note and its tag links in one transaction. Tag names are
    /// created on demand.
    pub async fn create_with_tags(
        db: &PgPool,
        user_id: Uuid,
        title: &str,
        content: &str,
        is_public: bool,
        tags: &[String],
    ) -> sqlx::Result<Note> {
        let mut tx = db.begin().await?;
        let note = sqlx::query_as::<_, Note>(&format!(
            r#"
            INSERT INTO notes (user_id, title, content, is_public)
            VALUES ($1, $2, $3, $4)
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(title)
        .bind(content)
        .bind(is_public)
        .fetch_one(&mut *tx)
        .await?;

        link_tags(&mut tx, note.id, tags).await?;
        tx.commit().await?;
        Ok(note)
    }

    /// Replace title, content, visibility and the full tag set in one
    /// transaction.
    pub async fn update_with_tags(
        db: &PgPool,
        id: Uuid,
        title: &str,
        content: &str,
        is_public: bool,
        tags: &[String],
    ) -> sqlx::Result<Option<Note>> {
        let mut tx = db.begin().await?;
        let Some(note) = sqlx::query_as::<_, Note>(&format!(
            r#"
            UPDATE notes
            SET title = $2, content = $3, is_public = $4, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(title)
        .bind(content)
        .bind(is_public)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM note_tags WHERE note_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_tags(&mut tx, id, tags).await?;
        tx.commit().await?;
        Ok(Some(note))
    }

    /// Soft-delete the note and its attachments, drop its tag links, and
    /// return the filepaths of the attachments that went down with it.
    pub async fn delete_cascade(db: &PgPool, id: Uuid) -> sqlx::Result<Vec<String>> {
        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM note_tags WHERE note_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let paths = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE attachments
            SET deleted_at = now()
            WHERE note_id = $1 AND deleted_at IS NULL
            RETURNING filepath
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        sqlx::query("UPDATE notes SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(paths)
    }

    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<Note>> {
        sqlx::query_as::<_, Note>(&format!(
            r#"
            SELECT {NOTE_COLUMNS}
            FROM notes
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn count_by_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notes WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(db)
        .await
    }

    pub async fn list_by_user_and_tag(
        db: &PgPool,
        user_id: Uuid,
        tag_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<Note>> {
        sqlx::query_as::<_, Note>(
            r#"
            SELECT n.id, n.user_id, n.title, n.content, n.summary, n.is_public,
                   n.created_at, n.updated_at
            FROM notes n
            JOIN note_tags nt ON nt.note_id = n.id
            WHERE n.user_id = $1 AND nt.tag_id = $2 AND n.deleted_at IS NULL
            ORDER BY n.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(tag_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn count_by_user_and_tag(
        db: &PgPool,
        user_id: Uuid,
        tag_id: Uuid,
    ) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM notes n
            JOIN note_tags nt ON nt.note_id = n.id
            WHERE n.user_id = $1 AND nt.tag_id = $2 AND n.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(tag_id)
        .fetch_one(db)
        .await
    }

    /// Case-insensitive substring search over title and content.
    pub async fn search(
        db: &PgPool,
        user_id: Uuid,
        keyword: &str,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<Note>> {
        sqlx::query_as::<_, Note>(&format!(
            r#"
            SELECT {NOTE_COLUMNS}
            FROM notes
            WHERE user_id = $1 AND deleted_at IS NULL
              AND (title ILIKE $2 OR content ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id)
        .bind(format!("%{keyword}%"))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn count_search(db: &PgPool, user_id: Uuid, keyword: &str) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM notes
            WHERE user_id = $1 AND deleted_at IS NULL
              AND (title ILIKE $2 OR content ILIKE $2)
            "#,
        )
        .bind(user_id)
        .bind(format!("%{keyword}%"))
        .fetch_one(db)
        .await
    }

    pub async fn list_public(db: &PgPool, limit: i64, offset: i64) -> sqlx::Result<Vec<Note>> {
        sqlx::query_as::<_, Note>(&format!(
            r#"
            SELECT {NOTE_COLUMNS}
            FROM notes
            WHERE is_public = TRUE AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn count_public(db: &PgPool) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notes WHERE is_public = TRUE AND deleted_at IS NULL",
        )
        .fetch_one(db)
        .await
    }

    pub async fn set_summary(db: &PgPool, id: Uuid, summary: &str) -> sqlx::Result<u64> {
        let result = sqlx::query(
            "UPDATE notes SET summary = $2, updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(summary)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn tags_for_notes(db: &PgPool, note_ids: &[Uuid]) -> sqlx::Result<Vec<NoteTagRow>> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, NoteTagRow>(
            r#"
            SELECT nt.note_id, t.id, t.name
            FROM note_tags nt
            JOIN tags t ON t.id = nt.tag_id
            WHERE nt.note_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(note_ids)
        .fetch_all(db)
        .await
    }
}

async fn link_tags(
    tx: &mut Transaction<'_, Postgres>,
    note_id: Uuid,
    tags: &[String],
) -> sqlx::Result<()> {
    for name in tags {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let tag = Tag::get_or_create_tx(tx, name).await?;
        sqlx::query(
            "INSERT INTO note_tags (note_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(note_id)
        .bind(tag.id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
