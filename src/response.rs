use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Uniform JSON wrapper returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    body: Envelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: &str) -> Self {
        Self::with_status(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: &str) -> Self {
        Self::with_status(StatusCode::CREATED, data, message)
    }

    fn with_status(status: StatusCode, data: T, message: &str) -> Self {
        Self {
            status,
            body: Envelope {
                success: true,
                data: Some(data),
                message: Some(message.to_string()),
                error: None,
            },
        }
    }
}

impl ApiResponse<()> {
    /// Success response carrying a message but no data.
    pub fn message(message: &str) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope {
                success: true,
                data: None,
                message: Some(message.to_string()),
                error: None,
            },
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_carries_data_and_message() {
        let response = ApiResponse::ok(json!({"id": 1}), "Fetched");
        let value = serde_json::to_value(&response.body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["id"], 1);
        assert_eq!(value["message"], "Fetched");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn message_envelope_omits_data() {
        let response = ApiResponse::message("Deleted");
        let value = serde_json::to_value(&response.body).unwrap();
        assert_eq!(value["success"], true);
        assert!(value.get("data").is_none());
        assert_eq!(value["message"], "Deleted");
    }

    #[test]
    fn created_uses_201() {
        let response = ApiResponse::created(json!({}), "Created");
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(
            ApiResponse::ok(json!({}), "Ok").status,
            StatusCode::OK
        );
    }
}
