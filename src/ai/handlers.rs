use axum::extract::State;
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::ai::keywords::{extract_keywords, generate_summary};
use crate::auth::jwt::AuthUser;
use crate::error::AppError;
use crate::extract::{AppJson, AppQuery};
use crate::notes::repo::Note;
use crate::ownership::assert_note_ownership;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ai/tags", post(suggest_tags))
        .route("/ai/summary", post(summarize))
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct TagSuggestionsData {
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryData {
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub note_id: Option<Uuid>,
}

#[instrument(skip(payload))]
async fn suggest_tags(
    _auth: AuthUser,
    AppJson(payload): AppJson<GenerateRequest>,
) -> Result<ApiResponse<TagSuggestionsData>, AppError> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::bad_request("Content is required"));
    }

    let tags = extract_keywords(content);
    let message = if tags.is_empty() {
        "No keywords could be extracted"
    } else {
        "Tags generated"
    };
    Ok(ApiResponse::ok(TagSuggestionsData { tags }, message))
}

/// Summarize the posted content; with `?note_id=` the result is also stored
/// on the caller's note.
#[instrument(skip(state, payload))]
async fn summarize(
    State(state): State<AppState>,
    auth: AuthUser,
    AppQuery(params): AppQuery<SummaryParams>,
    AppJson(payload): AppJson<GenerateRequest>,
) -> Result<ApiResponse<SummaryData>, AppError> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::bad_request("Content is required"));
    }

    let summary = generate_summary(content);

    if let Some(note_id) = params.note_id {
        let note = Note::find_by_id(&state.db, note_id)
            .await?
            .ok_or_else(|| AppError::not_found("Note not found"))?;
        assert_note_ownership(auth.id, &note)?;
        if Note::set_summary(&state.db, note.id, &summary).await? == 0 {
            return Err(AppError::not_found("Note not found"));
        }
        tracing::info!(note_id = %note.id, "saved generated summary");
        return Ok(ApiResponse::ok(
            SummaryData { summary },
            "Summary generated and saved",
        ));
    }

    Ok(ApiResponse::ok(SummaryData { summary }, "Summary generated"))
}
