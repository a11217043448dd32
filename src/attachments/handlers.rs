use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS,
};
use axum::http::{HeaderMap, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use time::OffsetDateTime;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

use crate::attachments::dto::{
    AssociateData, AssociateRequest, AttachmentDto, DateGroupDto, LibraryData, LibraryParams,
    TempUploadData,
};
use crate::attachments::repo::Attachment;
use crate::attachments::services::{delete_attachment, store_attachment, UploadedFile};
use crate::auth::jwt::AuthUser;
use crate::error::AppError;
use crate::extract::{page_window, AppJson, AppPath, AppQuery};
use crate::notes::repo::Note;
use crate::ownership::{assert_attachment_access, assert_bindable, assert_note_ownership};
use crate::response::ApiResponse;
use crate::state::AppState;

const UPLOAD_BODY_LIMIT: usize = 20 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/attachments", post(upload_attachment))
        .route("/attachments/temp", post(upload_temp_attachment))
        .route("/attachments/library", get(library))
        .route(
            "/attachments/:id",
            get(download_attachment).delete(remove_attachment),
        )
        .route("/attachments/:id/associate", post(associate_attachment))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

#[instrument(skip(state, mp))]
async fn upload_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    mp: Multipart,
) -> Result<ApiResponse<AttachmentDto>, AppError> {
    let form = read_upload_form(mp).await?;
    let note_id = form
        .note_id
        .ok_or_else(|| AppError::bad_request("note_id is required"))?;
    let upload = form
        .file
        .ok_or_else(|| AppError::bad_request("file is required"))?;

    let note = Note::find_by_id(&state.db, note_id)
        .await?
        .ok_or_else(|| AppError::not_found("Note not found"))?;
    assert_note_ownership(auth.id, &note)?;

    let attachment = store_attachment(&state, auth.id, Some(note.id), upload, false).await?;
    tracing::info!(attachment_id = %attachment.id, note_id = %note.id, "uploaded attachment");

    Ok(ApiResponse::created(
        AttachmentDto::from(attachment),
        "Attachment uploaded",
    ))
}

#[instrument(skip(state, mp))]
async fn upload_temp_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    mp: Multipart,
) -> Result<ApiResponse<TempUploadData>, AppError> {
    let form = read_upload_form(mp).await?;
    let upload = form
        .file
        .ok_or_else(|| AppError::bad_request("file is required"))?;

    let attachment = store_attachment(&state, auth.id, None, upload, true).await?;
    tracing::info!(attachment_id = %attachment.id, user_id = %auth.id, "uploaded temporary attachment");

    let data = TempUploadData {
        id: attachment.id,
        url: format!("/api/attachments/{}", attachment.id),
        filename: attachment.filename,
        filetype: attachment.filetype,
        filesize: attachment.filesize,
        success: true,
    };
    Ok(ApiResponse::created(data, "Temporary attachment uploaded"))
}

#[instrument(skip(state))]
async fn download_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<(HeaderMap, Body), AppError> {
    let attachment = Attachment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Attachment not found"))?;
    assert_attachment_access(&state.db, auth.id, &attachment).await?;

    // Stream from disk instead of buffering; files run up to the upload cap.
    let (file, size) = match state.store.open(&attachment.filepath).await {
        Ok(opened) => opened,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(attachment_id = %attachment.id, "attachment record has no file on disk");
            return Err(AppError::not_found("File not found"));
        }
        Err(e) => return Err(e.into()),
    };

    let mut headers = download_headers(&attachment);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
    Ok((headers, Body::from_stream(ReaderStream::new(file))))
}

#[instrument(skip(state))]
async fn remove_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    let attachment = Attachment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Attachment not found"))?;
    assert_attachment_access(&state.db, auth.id, &attachment).await?;

    delete_attachment(&state, &attachment).await?;
    tracing::info!(attachment_id = %attachment.id, "deleted attachment");

    Ok(ApiResponse::message("Attachment deleted"))
}

#[instrument(skip(state, payload))]
async fn associate_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<AssociateRequest>,
) -> Result<ApiResponse<AssociateData>, AppError> {
    let note = Note::find_by_id(&state.db, payload.note_id)
        .await?
        .ok_or_else(|| AppError::not_found("Note not found"))?;
    assert_note_ownership(auth.id, &note)?;

    let attachment = Attachment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Attachment not found"))?;
    assert_bindable(auth.id, &attachment)?;

    let bound = Attachment::bind_to_note(&state.db, attachment.id, note.id).await?;
    if bound == 0 {
        // Lost a race against another bind or a delete.
        return Err(AppError::forbidden("No permission to bind this attachment"));
    }
    tracing::info!(attachment_id = %attachment.id, note_id = %note.id, "bound temporary attachment");

    Ok(ApiResponse::ok(
        AssociateData {
            id: attachment.id,
            url: format!("/api/attachments/{}", attachment.id),
            filename: attachment.filename,
            note_id: note.id,
            success: true,
        },
        "Attachment bound to note",
    ))
}

#[instrument(skip(state))]
async fn library(
    State(state): State<AppState>,
    auth: AuthUser,
    AppQuery(params): AppQuery<LibraryParams>,
) -> Result<ApiResponse<LibraryData>, AppError> {
    let (page, size, offset) = page_window(params.page, params.page_size);
    let filetype = params.filetype.as_deref().filter(|s| !s.is_empty());

    let attachments = Attachment::library_page(&state.db, auth.id, filetype, size, offset).await?;
    let total = Attachment::library_count(&state.db, auth.id, filetype).await?;
    let groups = Attachment::date_groups(&state.db, auth.id, filetype).await?;

    let today = OffsetDateTime::now_utc().date();
    let date_groups = groups
        .into_iter()
        .map(|(date, count)| DateGroupDto::new(date, count, today))
        .collect();

    Ok(ApiResponse::ok(
        LibraryData {
            attachments: attachments.into_iter().map(AttachmentDto::from).collect(),
            date_groups,
            total,
            page,
            page_size: size,
        },
        "Library retrieved",
    ))
}

// --- multipart plumbing ---

struct UploadForm {
    note_id: Option<Uuid>,
    file: Option<UploadedFile>,
}

async fn read_upload_form(mut mp: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm {
        note_id: None,
        file: None,
    };
    while let Some(field) = mp.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("note_id") => {
                let raw = field.text().await.map_err(multipart_error)?;
                let id = raw
                    .trim()
                    .parse::<Uuid>()
                    .map_err(|_| AppError::bad_request("Invalid note id"))?;
                form.note_id = Some(id);
            }
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "file".to_string());
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(UploadedFile {
                    filename,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }
    Ok(form)
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::bad_request(format!("Invalid multipart body: {e}"))
}

// --- download headers ---

fn download_headers(attachment: &Attachment) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let content_type = HeaderValue::from_str(&attachment.filetype)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    headers.insert(CONTENT_TYPE, content_type);

    let is_image = attachment.filetype.starts_with("image/");
    let kind = if is_image { "inline" } else { "attachment" };
    let fallback = ascii_fallback(&attachment.filename);
    let encoded = urlencoding::encode(&attachment.filename);
    let disposition = format!("{kind}; filename=\"{fallback}\"; filename*=UTF-8''{encoded}");
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );

    // Images are content-addressed-ish (name carries a token), safe to cache
    // hard; everything else stays out of shared caches.
    let cache = if is_image {
        "public, max-age=31536000"
    } else {
        "private, no-store, no-transform, must-revalidate"
    };
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(cache));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

    headers
}

/// ASCII stand-in for the quoted filename parameter; the exact name rides
/// in the RFC 5987 `filename*`.
fn ascii_fallback(name: &str) -> String {
    name.chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(filename: &str, filetype: &str) -> Attachment {
        Attachment {
            id: Uuid::new_v4(),
            note_id: None,
            user_id: Uuid::new_v4(),
            filename: filename.into(),
            filepath: "u/f".into(),
            filetype: filetype.into(),
            filesize: 1,
            is_temp: false,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn ascii_fallback_replaces_non_ascii_and_quotes() {
        assert_eq!(ascii_fallback("report.pdf"), "report.pdf");
        assert_eq!(ascii_fallback("my notes.txt"), "my notes.txt");
        assert_eq!(ascii_fallback("式样书.pdf"), "___.pdf");
        assert_eq!(ascii_fallback("a\"b\\c.txt"), "a_b_c.txt");
    }

    #[test]
    fn images_are_inline_and_cacheable() {
        let headers = download_headers(&attachment("photo.png", "image/png"));
        let disposition = headers.get(CONTENT_DISPOSITION).unwrap().to_str().unwrap();
        assert!(disposition.starts_with("inline;"));
        assert_eq!(
            headers.get(CACHE_CONTROL).unwrap(),
            "public, max-age=31536000"
        );
        assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    }

    #[test]
    fn documents_are_attachments_and_uncached() {
        let headers = download_headers(&attachment("scan.pdf", "application/pdf"));
        let disposition = headers.get(CONTENT_DISPOSITION).unwrap().to_str().unwrap();
        assert!(disposition.starts_with("attachment;"));
        assert_eq!(
            headers.get(CACHE_CONTROL).unwrap(),
            "private, no-store, no-transform, must-revalidate"
        );
    }

    #[test]
    fn disposition_carries_rfc5987_name_for_unicode() {
        let headers = download_headers(&attachment("式样书.pdf", "application/pdf"));
        let disposition = headers.get(CONTENT_DISPOSITION).unwrap().to_str().unwrap();
        assert!(disposition.contains("filename=\"___.pdf\""));
        assert!(disposition.contains("filename*=UTF-8''%E5%BC%8F%E6%A0%B7%E4%B9%A6.pdf"));
    }

    #[test]
    fn unparsable_filetype_falls_back_to_octet_stream() {
        let headers = download_headers(&attachment("x", "bad\nvalue"));
        assert_eq!(
            headers.get(CONTENT_TYPE).unwrap(),
            "application/octet-stream"
        );
    }
}
