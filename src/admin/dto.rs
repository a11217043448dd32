use serde::{Deserialize, Serialize};

use crate::auth::dto::UserDto;

#[derive(Debug, Deserialize)]
pub struct UserListParams {
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

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct PaginationDto {
    pub page: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
    pub total: i64,
    #[serde(rename = "totalPage")]
    pub total_page: i64,
}

#[derive(Debug, Serialize)]
pub struct UserListData {
    pub users: Vec<UserDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize)]
pub struct UserDetailData {
    pub user: UserDto,
    #[serde(rename = "noteCount")]
    pub note_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pagination_serializes_camel_case_keys() {
        let dto = PaginationDto {
            page: 2,
            page_size: 10,
            total: 21,
            total_page: 3,
        };
        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(value["pageSize"], 10);
        assert_eq!(value["totalPage"], 3);
    }

    #[test]
    fn list_params_default_to_first_page_of_ten() {
        let params: UserListParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 10);
        assert!(params.keyword.is_none());
    }
}
