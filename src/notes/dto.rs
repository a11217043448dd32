use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::attachments::dto::AttachmentDto;
use crate::attachments::repo::Attachment;
use crate::notes::repo::{Note, NoteTagRow};
use crate::tags::dto::TagDto;

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Serialize)]
pub struct NoteDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub is_public: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub tags: Vec<TagDto>,
    pub attachments: Vec<AttachmentDto>,
}

impl NoteDto {
    pub fn from_parts(note: Note, tags: Vec<TagDto>, attachments: Vec<AttachmentDto>) -> NoteDto {
        NoteDto {
            id: note.id,
            user_id: note.user_id,
            title: note.title,
            content: note.content,
            summary: note.summary,
            is_public: note.is_public,
            created_at: note.created_at,
            updated_at: note.updated_at,
            tags,
            attachments,
        }
    }

    /// Join notes with their tag and attachment rows. Notes without a match
    /// get empty lists.
    pub fn assemble(
        notes: Vec<Note>,
        tag_rows: Vec<NoteTagRow>,
        attachments: Vec<Attachment>,
    ) -> Vec<NoteDto> {
        let mut tags_by_note: HashMap<Uuid, Vec<TagDto>> = HashMap::new();
        for row in tag_rows {
            tags_by_note.entry(row.note_id).or_default().push(TagDto {
                id: row.id,
                name: row.name,
            });
        }

        let mut attachments_by_note: HashMap<Uuid, Vec<AttachmentDto>> = HashMap::new();
        for attachment in attachments {
            if let Some(note_id) = attachment.note_id {
                attachments_by_note
                    .entry(note_id)
                    .or_default()
                    .push(AttachmentDto::from(attachment));
            }
        }

        notes
            .into_iter()
            .map(|note| {
                let tags = tags_by_note.remove(&note.id).unwrap_or_default();
                let attachments = attachments_by_note.remove(&note.id).unwrap_or_default();
                NoteDto::from_parts(note, tags, attachments)
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct NoteListParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: i64,
    pub tag: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: i64,
    pub keyword: Option<String>,
}

fn default_page() -> i64 {
    1
}
fn default_page_size() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct NoteListData {
    pub notes: Vec<NoteDto>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note(id: Uuid, user_id: Uuid) -> Note {
        Note {
            id,
            user_id,
            title: "a note".into(),
            content: "body".into(),
            summary: None,
            is_public: false,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn assemble_groups_tags_and_attachments_per_note() {
        let user = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let tag_rows = vec![
            NoteTagRow {
                note_id: first,
                id: Uuid::new_v4(),
                name: "rust".into(),
            },
            NoteTagRow {
                note_id: first,
                id: Uuid::new_v4(),
                name: "web".into(),
            },
        ];
        let attachments = vec![Attachment {
            id: Uuid::new_v4(),
            note_id: Some(second),
            user_id: user,
            filename: "diagram.png".into(),
            filepath: format!("{user}/diagram.png"),
            filetype: "image/png".into(),
            filesize: 10,
            is_temp: false,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }];

        let dtos = NoteDto::assemble(
            vec![note(first, user), note(second, user)],
            tag_rows,
            attachments,
        );

        assert_eq!(dtos[0].tags.len(), 2);
        assert!(dtos[0].attachments.is_empty());
        assert!(dtos[1].tags.is_empty());
        assert_eq!(dtos[1].attachments.len(), 1);
    }

    #[test]
    fn note_dto_serializes_rfc3339_and_never_exposes_filepath() {
        let dtos = NoteDto::assemble(vec![note(Uuid::new_v4(), Uuid::new_v4())], vec![], vec![]);
        let value = serde_json::to_value(&dtos[0]).unwrap();
        assert!(value["created_at"].as_str().unwrap().contains('T'));
        assert!(value.get("filepath").is_none());
    }

    #[test]
    fn list_params_fill_defaults_and_honor_page_size_key() {
        let params: NoteListParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 10);
        assert!(params.tag.is_none());

        let params: NoteListParams = serde_json::from_value(json!({"pageSize": 5})).unwrap();
        assert_eq!(params.page_size, 5);
    }
}
