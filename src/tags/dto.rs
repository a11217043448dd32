use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tags::repo::{Tag, TagWithCount};

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagDto {
    pub id: Uuid,
    pub name: String,
}

impl From<Tag> for TagDto {
    fn from(tag: Tag) -> Self {
        TagDto {
            id: tag.id,
            name: tag.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagWithCountDto {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "noteCount")]
    pub note_count: i64,
}

impl From<TagWithCount> for TagWithCountDto {
    fn from(tag: TagWithCount) -> Self {
        TagWithCountDto {
            id: tag.id,
            name: tag.name,
            note_count: tag.note_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_count_serializes_camel_case() {
        let dto = TagWithCountDto {
            id: Uuid::new_v4(),
            name: "rust".into(),
            note_count: 3,
        };
        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(value["noteCount"], 3);
        assert!(value.get("note_count").is_none());
    }
}
