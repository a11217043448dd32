use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::attachments::repo::Attachment;

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentDto {
    pub id: Uuid,
    pub note_id: Option<Uuid>,
    pub user_id: Uuid,
    pub filename: String,
    pub file_url: String,
    pub filetype: String,
    pub filesize: i64,
    pub is_temp: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Attachment> for AttachmentDto {
    fn from(attachment: Attachment) -> Self {
        AttachmentDto {
            file_url: format!("/api/attachments/{}", attachment.id),
            id: attachment.id,
            note_id: attachment.note_id,
            user_id: attachment.user_id,
            filename: attachment.filename,
            filetype: attachment.filetype,
            filesize: attachment.filesize,
            is_temp: attachment.is_temp,
            created_at: attachment.created_at,
            updated_at: attachment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TempUploadData {
    pub id: Uuid,
    pub url: String,
    pub filename: String,
    pub filetype: String,
    pub filesize: i64,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssociateRequest {
    #[serde(rename = "noteId")]
    pub note_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct AssociateData {
    pub id: Uuid,
    pub url: String,
    pub filename: String,
    #[serde(rename = "noteId")]
    pub note_id: Uuid,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct LibraryParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(rename = "pageSize", default = "default_library_page_size")]
    pub page_size: i64,
    pub filetype: Option<String>,
}

fn default_page() -> i64 {
    1
}
fn default_library_page_size() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct DateGroupDto {
    pub date: String,
    pub count: i64,
    #[serde(rename = "displayDate")]
    pub display_date: String,
}

impl DateGroupDto {
    pub fn new(date: Date, count: i64, today: Date) -> Self {
        DateGroupDto {
            date: date.to_string(),
            count,
            display_date: format_display_date(date, today),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LibraryData {
    pub attachments: Vec<AttachmentDto>,
    #[serde(rename = "dateGroups")]
    pub date_groups: Vec<DateGroupDto>,
    pub total: i64,
    pub page: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
}

/// "Today", "Yesterday", short month + day within the current year, full
/// ISO date otherwise.
pub fn format_display_date(date: Date, today: Date) -> String {
    if date == today {
        return "Today".to_string();
    }
    if Some(date) == today.previous_day() {
        return "Yesterday".to_string();
    }
    if date.year() == today.year() {
        let format = format_description!("[month repr:short] [day]");
        if let Ok(formatted) = date.format(&format) {
            return formatted;
        }
    }
    date.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn display_date_recognizes_today_and_yesterday() {
        let today = date!(2024 - 03 - 10);
        assert_eq!(format_display_date(date!(2024 - 03 - 10), today), "Today");
        assert_eq!(
            format_display_date(date!(2024 - 03 - 09), today),
            "Yesterday"
        );
    }

    #[test]
    fn display_date_shortens_within_current_year() {
        let today = date!(2024 - 03 - 10);
        assert_eq!(format_display_date(date!(2024 - 01 - 05), today), "Jan 05");
    }

    #[test]
    fn display_date_falls_back_to_iso_for_other_years() {
        let today = date!(2024 - 03 - 10);
        assert_eq!(
            format_display_date(date!(2023 - 12 - 31), today),
            "2023-12-31"
        );
    }

    #[test]
    fn yesterday_handles_year_boundary() {
        let today = date!(2024 - 01 - 01);
        assert_eq!(
            format_display_date(date!(2023 - 12 - 31), today),
            "Yesterday"
        );
    }

    #[test]
    fn attachment_dto_builds_url_and_never_exposes_filepath() {
        let attachment = Attachment {
            id: Uuid::new_v4(),
            note_id: None,
            user_id: Uuid::new_v4(),
            filename: "scan.pdf".into(),
            filepath: "temp/u/scan_1_abc.pdf".into(),
            filetype: "application/pdf".into(),
            filesize: 9,
            is_temp: true,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let id = attachment.id;

        let value = serde_json::to_value(AttachmentDto::from(attachment)).unwrap();
        assert_eq!(value["file_url"], format!("/api/attachments/{id}"));
        assert!(value.get("filepath").is_none());
    }

    #[test]
    fn associate_request_reads_camel_case_note_id() {
        let id = Uuid::new_v4();
        let parsed: AssociateRequest =
            serde_json::from_value(serde_json::json!({"noteId": id})).unwrap();
        assert_eq!(parsed.note_id, id);
    }
}
