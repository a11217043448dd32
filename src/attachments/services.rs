use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{error, warn};
use uuid::Uuid;

use crate::attachments::repo::{Attachment, NewAttachment};
use crate::attachments::store::{disk_name, random_token, DiskStore};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Staged-write ingestion: stage the bytes, insert the row, then rename the
/// file into place. A failure in a later step undoes the earlier ones, so
/// neither an orphan file nor a row without a file survives.
pub async fn store_attachment(
    state: &AppState,
    user_id: Uuid,
    note_id: Option<Uuid>,
    upload: UploadedFile,
    is_temp: bool,
) -> Result<Attachment, AppError> {
    let ts = OffsetDateTime::now_utc().unix_timestamp();
    let name = disk_name(&upload.filename, &upload.content_type, ts, &random_token());
    let rel = state.store.rel_path(user_id, is_temp, &name);

    let staged = state.store.stage(&upload.data).await?;

    let inserted = Attachment::insert(
        &state.db,
        NewAttachment {
            note_id,
            user_id,
            filename: &upload.filename,
            filepath: &rel,
            filetype: &upload.content_type,
            filesize: upload.data.len() as i64,
            is_temp,
        },
    )
    .await;

    let attachment = match inserted {
        Ok(attachment) => attachment,
        Err(e) => {
            if let Err(cleanup) = state.store.discard(&staged).await {
                warn!(error = %cleanup, "failed to discard staged upload");
            }
            return Err(e.into());
        }
    };

    if let Err(e) = state.store.commit(&staged, &rel).await {
        error!(attachment_id = %attachment.id, error = %e, "failed to move staged upload into place");
        if let Err(cleanup) = Attachment::hard_delete(&state.db, attachment.id).await {
            error!(attachment_id = %attachment.id, error = %cleanup, "failed to remove row after commit failure");
        }
        if let Err(cleanup) = state.store.discard(&staged).await {
            warn!(error = %cleanup, "failed to discard staged upload");
        }
        return Err(e.into());
    }

    Ok(attachment)
}

/// File first, then the record. A file already gone from disk still counts
/// as removed; any other filesystem error leaves the record in place.
pub async fn delete_attachment(state: &AppState, attachment: &Attachment) -> Result<(), AppError> {
    state.store.remove(&attachment.filepath).await?;
    Attachment::soft_delete(&state.db, attachment.id).await?;
    Ok(())
}

/// Remove files whose records are already gone. Failures are logged, not
/// surfaced.
pub async fn remove_files_best_effort(store: &DiskStore, paths: &[String]) {
    for path in paths {
        if let Err(e) = store.remove(path).await {
            warn!(path, error = %e, "failed to remove attachment file");
        }
    }
}
