use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::Router;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::jwt::AuthUser;
use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::notes::repo::Note;
use crate::ownership::assert_note_ownership;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::tags::dto::{TagDto, TagRequest, TagWithCountDto};
use crate::tags::repo::Tag;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/:id", delete(delete_tag))
        .route(
            "/tags/:id/notes/:note_id",
            post(add_tag_to_note).delete(remove_tag_from_note),
        )
}

#[instrument(skip(state))]
async fn list_tags(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Vec<TagWithCountDto>>, AppError> {
    let tags = Tag::list_with_counts(&state.db, auth.id)
        .await?
        .into_iter()
        .map(TagWithCountDto::from)
        .collect();
    Ok(ApiResponse::ok(tags, "Tags retrieved"))
}

#[instrument(skip(state, payload))]
async fn create_tag(
    State(state): State<AppState>,
    _auth: AuthUser,
    AppJson(payload): AppJson<TagRequest>,
) -> Result<ApiResponse<TagDto>, AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Tag name is required"));
    }

    if let Some(tag) = Tag::find_by_name(&state.db, name).await? {
        return Ok(ApiResponse::ok(TagDto::from(tag), "Tag already exists"));
    }

    let tag = Tag::get_or_create(&state.db, name).await?;
    tracing::info!(tag_id = %tag.id, name = %tag.name, "created tag");
    Ok(ApiResponse::created(TagDto::from(tag), "Tag created"))
}

#[instrument(skip(state))]
async fn delete_tag(
    State(state): State<AppState>,
    _auth: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    let removed = Tag::delete_cascade(&state.db, id).await?;
    if removed == 0 {
        return Err(AppError::not_found("Tag not found"));
    }
    tracing::info!(tag_id = %id, "deleted tag");
    Ok(ApiResponse::message("Tag deleted"))
}

#[instrument(skip(state))]
async fn add_tag_to_note(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath((tag_id, note_id)): AppPath<(Uuid, Uuid)>,
) -> Result<ApiResponse<TagDto>, AppError> {
    let tag = Tag::find_by_id(&state.db, tag_id)
        .await?
        .ok_or_else(|| AppError::not_found("Tag not found"))?;
    let note = Note::find_by_id(&state.db, note_id)
        .await?
        .ok_or_else(|| AppError::not_found("Note not found"))?;
    assert_note_ownership(auth.id, &note)?;

    Tag::attach_to_note(&state.db, note.id, tag.id).await?;
    Ok(ApiResponse::ok(TagDto::from(tag), "Tag added to note"))
}

#[instrument(skip(state))]
async fn remove_tag_from_note(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath((tag_id, note_id)): AppPath<(Uuid, Uuid)>,
) -> Result<ApiResponse<()>, AppError> {
    let tag = Tag::find_by_id(&state.db, tag_id)
        .await?
        .ok_or_else(|| AppError::not_found("Tag not found"))?;
    let note = Note::find_by_id(&state.db, note_id)
        .await?
        .ok_or_else(|| AppError::not_found("Note not found"))?;
    assert_note_ownership(auth.id, &note)?;

    Tag::detach_from_note(&state.db, note.id, tag.id).await?;
    Ok(ApiResponse::message("Tag removed from note"))
}
