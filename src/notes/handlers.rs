use axum::extract::State;
use axum::routing::get;
use axum::Router;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::attachments::dto::AttachmentDto;
use crate::attachments::repo::Attachment;
use crate::attachments::services::remove_files_best_effort;
use crate::auth::jwt::AuthUser;
use crate::error::AppError;
use crate::extract::{page_window, AppJson, AppPath, AppQuery};
use crate::notes::dto::{NoteDto, NoteListData, NoteListParams, NoteRequest, SearchParams};
use crate::notes::repo::Note;
use crate::ownership::assert_note_ownership;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::tags::dto::TagDto;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/search", get(search_notes))
        .route("/notes/public", get(list_public_notes))
        .route(
            "/notes/:id",
            get(get_note).put(update_note).delete(delete_note),
        )
        .route("/notes/:id/attachments", get(list_note_attachments))
}

#[instrument(skip(state))]
async fn list_notes(
    State(state): State<AppState>,
    auth: AuthUser,
    AppQuery(params): AppQuery<NoteListParams>,
) -> Result<ApiResponse<NoteListData>, AppError> {
    let (page, size, offset) = page_window(params.page, params.page_size);

    let (notes, total) = match params.tag {
        Some(tag_id) => (
            Note::list_by_user_and_tag(&state.db, auth.id, tag_id, size, offset).await?,
            Note::count_by_user_and_tag(&state.db, auth.id, tag_id).await?,
        ),
        None => (
            Note::list_by_user(&state.db, auth.id, size, offset).await?,
            Note::count_by_user(&state.db, auth.id).await?,
        ),
    };

    let notes = hydrate(&state.db, notes).await?;
    Ok(ApiResponse::ok(
        NoteListData {
            notes,
            total,
            page,
            size,
        },
        "Notes retrieved",
    ))
}

#[instrument(skip(state, payload))]
async fn create_note(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<NoteRequest>,
) -> Result<ApiResponse<NoteDto>, AppError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("Title is required"));
    }

    let note = Note::create_with_tags(
        &state.db,
        auth.id,
        title,
        &payload.content,
        payload.is_public,
        &payload.tags,
    )
    .await?;
    tracing::info!(note_id = %note.id, user_id = %auth.id, "created note");

    let dto = hydrate_one(&state.db, note).await?;
    Ok(ApiResponse::created(dto, "Note created"))
}

#[instrument(skip(state))]
async fn get_note(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<ApiResponse<NoteDto>, AppError> {
    let note = Note::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Note not found"))?;
    assert_note_ownership(auth.id, &note)?;

    let dto = hydrate_one(&state.db, note).await?;
    Ok(ApiResponse::ok(dto, "Note retrieved"))
}

#[instrument(skip(state, payload))]
async fn update_note(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<NoteRequest>,
) -> Result<ApiResponse<NoteDto>, AppError> {
    let note = Note::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Note not found"))?;
    assert_note_ownership(auth.id, &note)?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("Title is required"));
    }

    let note = Note::update_with_tags(
        &state.db,
        note.id,
        title,
        &payload.content,
        payload.is_public,
        &payload.tags,
    )
    .await?
    .ok_or_else(|| AppError::not_found("Note not found"))?;

    let dto = hydrate_one(&state.db, note).await?;
    Ok(ApiResponse::ok(dto, "Note updated"))
}

#[instrument(skip(state))]
async fn delete_note(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    let note = Note::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Note not found"))?;
    assert_note_ownership(auth.id, &note)?;

    let orphaned_files = Note::delete_cascade(&state.db, note.id).await?;
    remove_files_best_effort(&state.store, &orphaned_files).await;
    tracing::info!(note_id = %note.id, user_id = %auth.id, "deleted note");

    Ok(ApiResponse::message("Note deleted"))
}

#[instrument(skip(state))]
async fn search_notes(
    State(state): State<AppState>,
    auth: AuthUser,
    AppQuery(params): AppQuery<SearchParams>,
) -> Result<ApiResponse<NoteListData>, AppError> {
    let keyword = params.keyword.as_deref().map(str::trim).unwrap_or_default();
    if keyword.is_empty() {
        return Err(AppError::bad_request("Please provide a search keyword"));
    }

    let (page, size, offset) = page_window(params.page, params.page_size);

    let notes = Note::search(&state.db, auth.id, keyword, size, offset).await?;
    let total = Note::count_search(&state.db, auth.id, keyword).await?;

    let notes = hydrate(&state.db, notes).await?;
    Ok(ApiResponse::ok(
        NoteListData {
            notes,
            total,
            page,
            size,
        },
        "Search results retrieved",
    ))
}

/// Listing of public notes across all users. Requires a login but not
/// ownership; the `tag` filter does not apply here.
#[instrument(skip(state))]
async fn list_public_notes(
    State(state): State<AppState>,
    _auth: AuthUser,
    AppQuery(params): AppQuery<NoteListParams>,
) -> Result<ApiResponse<NoteListData>, AppError> {
    let (page, size, offset) = page_window(params.page, params.page_size);

    let notes = Note::list_public(&state.db, size, offset).await?;
    let total = Note::count_public(&state.db).await?;

    let notes = hydrate(&state.db, notes).await?;
    Ok(ApiResponse::ok(
        NoteListData {
            notes,
            total,
            page,
            size,
        },
        "Public notes retrieved",
    ))
}

#[instrument(skip(state))]
async fn list_note_attachments(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<ApiResponse<Vec<AttachmentDto>>, AppError> {
    let note = Note::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Note not found"))?;
    assert_note_ownership(auth.id, &note)?;

    let attachments = Attachment::list_by_note(&state.db, note.id)
        .await?
        .into_iter()
        .map(AttachmentDto::from)
        .collect();
    Ok(ApiResponse::ok(attachments, "Attachments retrieved"))
}

async fn hydrate(db: &PgPool, notes: Vec<Note>) -> Result<Vec<NoteDto>, AppError> {
    let ids: Vec<Uuid> = notes.iter().map(|note| note.id).collect();
    let tag_rows = Note::tags_for_notes(db, &ids).await?;
    let attachments = Attachment::list_for_notes(db, &ids).await?;
    Ok(NoteDto::assemble(notes, tag_rows, attachments))
}

async fn hydrate_one(db: &PgPool, note: Note) -> Result<NoteDto, AppError> {
    let tags = Note::tags_for_notes(db, &[note.id])
        .await?
        .into_iter()
        .map(|row| TagDto {
            id: row.id,
            name: row.name,
        })
        .collect();
    let attachments = Attachment::list_by_note(db, note.id)
        .await?
        .into_iter()
        .map(AttachmentDto::from)
        .collect();
    Ok(NoteDto::from_parts(note, tags, attachments))
}
