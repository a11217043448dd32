use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct TagWithCount {
    pub id: Uuid,
    pub name: String,
    pub note_count: i64,
}

impl Tag {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Tag>> {
        sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_name(db: &PgPool, name: &str) -> sqlx::Result<Option<Tag>> {
        sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(db)
            .await
    }

    /// Upsert by name. The no-op DO UPDATE makes RETURNING yield the row in
    /// both the insert and the conflict case, so concurrent callers all get
    /// the same tag.
    pub async fn get_or_create(db: &PgPool, name: &str) -> sqlx::Result<Tag> {
        sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(db)
        .await
    }

    pub async fn get_or_create_tx(
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
    ) -> sqlx::Result<Tag> {
        sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&mut **tx)
        .await
    }

    /// All tags, each with the number of the given user's live notes that
    /// carry it. The user filter sits in the join so unused tags still show
    /// up with a zero count.
    pub async fn list_with_counts(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<TagWithCount>> {
        sqlx::query_as::<_, TagWithCount>(
            r#"
            SELECT t.id, t.name, COUNT(n.id) AS note_count
            FROM tags t
            LEFT JOIN note_tags nt ON nt.tag_id = t.id
            LEFT JOIN notes n ON n.id = nt.note_id AND n.deleted_at IS NULL AND n.user_id = $1
            GROUP BY t.id, t.name
            ORDER BY t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn delete_cascade(db: &PgPool, id: Uuid) -> sqlx::Result<u64> {
        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM note_tags WHERE tag_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    pub async fn attach_to_note(db: &PgPool, note_id: Uuid, tag_id: Uuid) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO note_tags (note_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(note_id)
        .bind(tag_id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn detach_from_note(db: &PgPool, note_id: Uuid, tag_id: Uuid) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM note_tags WHERE note_id = $1 AND tag_id = $2")
            .bind(note_id)
            .bind(tag_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
