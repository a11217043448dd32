use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for profile updates. Every field is optional; a password
/// change requires both the current and the new password.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "currentPassword")]
    pub current_password: Option<String>,
    #[serde(rename = "newPassword")]
    pub new_password: Option<String>,
}

/// Public part of a user returned to the client. The password hash never
/// leaves the repo layer.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthData {
    pub user: UserDto,
    pub token: String,
}

/// Response returned after a profile update.
#[derive(Debug, Serialize)]
pub struct ProfileData {
    pub user: UserDto,
    #[serde(rename = "passwordChanged")]
    pub password_changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_dto_serializes_rfc3339_timestamps() {
        let now = OffsetDateTime::now_utc();
        let dto = UserDto {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            role: "user".into(),
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(value["username"], "alice");
        assert_eq!(value["role"], "user");
        let created = value["created_at"].as_str().unwrap();
        assert!(created.contains('T'));
        assert!(value.get("password_hash").is_none());
    }

    #[test]
    fn profile_data_uses_camel_case_flag() {
        let now = OffsetDateTime::now_utc();
        let data = ProfileData {
            user: UserDto {
                id: Uuid::new_v4(),
                username: "bob".into(),
                email: "bob@example.com".into(),
                role: "user".into(),
                created_at: now,
                updated_at: now,
            },
            password_changed: true,
        };

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["passwordChanged"], true);
    }
}
