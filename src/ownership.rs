//! Access checks shared by the note, attachment and AI handlers.

use sqlx::PgPool;
use uuid::Uuid;

use crate::attachments::repo::Attachment;
use crate::error::AppError;
use crate::notes::repo::Note;

pub fn assert_note_ownership(user_id: Uuid, note: &Note) -> Result<(), AppError> {
    if note.user_id != user_id {
        return Err(AppError::forbidden("No permission to access this note"));
    }
    Ok(())
}

/// A temporary attachment can only be bound by its uploader, and only while
/// it is still temporary.
pub fn assert_bindable(user_id: Uuid, attachment: &Attachment) -> Result<(), AppError> {
    if !attachment.is_temp || attachment.user_id != user_id {
        return Err(AppError::forbidden("No permission to bind this attachment"));
    }
    Ok(())
}

/// An attachment bound to a note inherits the note's ownership; an unbound
/// temporary attachment belongs to whoever uploaded it.
pub async fn assert_attachment_access(
    db: &PgPool,
    user_id: Uuid,
    attachment: &Attachment,
) -> Result<(), AppError> {
    match attachment.note_id {
        Some(note_id) => {
            let note = Note::find_by_id(db, note_id)
                .await?
                .ok_or_else(|| AppError::forbidden("No permission to access this attachment"))?;
            assert_note_ownership(user_id, &note)
                .map_err(|_| AppError::forbidden("No permission to access this attachment"))
        }
        None => {
            if attachment.user_id != user_id {
                return Err(AppError::forbidden(
                    "No permission to access this attachment",
                ));
            }
            Ok(())
        }
    }
}
