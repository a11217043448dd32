use axum::Router;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;
use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

pub fn router() -> Router<AppState> {
    handlers::router()
}

pub fn is_valid_role(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_USER
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Field rules shared by registration and admin user creation.
pub(crate) fn validate_new_user(
    username: &str,
    password: &str,
    email: &str,
) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(AppError::bad_request(
            "Username must be between 3 and 50 characters",
        ));
    }
    if password.len() < 6 {
        return Err(AppError::bad_request(
            "Password must be at least 6 characters",
        ));
    }
    if !is_valid_email(email) {
        return Err(AppError::bad_request("Invalid email address"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.io"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }

    #[test]
    fn role_validation() {
        assert!(is_valid_role(ROLE_ADMIN));
        assert!(is_valid_role(ROLE_USER));
        assert!(!is_valid_role("superuser"));
        assert!(!is_valid_role(""));
    }

    #[test]
    fn new_user_field_rules() {
        assert!(validate_new_user("alice", "secret1", "a@example.com").is_ok());
        assert!(matches!(
            validate_new_user("ab", "secret1", "a@example.com"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_new_user(&"x".repeat(51), "secret1", "a@example.com"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_new_user("alice", "short", "a@example.com"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_new_user("alice", "secret1", "bad-email"),
            Err(AppError::BadRequest(_))
        ));
    }
}
