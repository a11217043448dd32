use axum::extract::{FromRef, State};
use axum::routing::{get, post};
use axum::Router;
use tracing::instrument;

use crate::auth::dto::{
    AuthData, LoginRequest, ProfileData, RegisterRequest, UpdateProfileRequest, UserDto,
};
use crate::auth::jwt::{AuthUser, JwtKeys};
use crate::auth::repo::User;
use crate::auth::{is_valid_email, password, validate_new_user, ROLE_USER};
use crate::error::AppError;
use crate::extract::AppJson;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/user", get(get_current_user).put(update_profile))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<ApiResponse<AuthData>, AppError> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    validate_new_user(&username, &payload.password, &email)?;

    if User::find_by_username(&state.db, &username).await?.is_some() {
        return Err(AppError::bad_request("Username already exists"));
    }
    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::bad_request("Email already exists"));
    }

    let hash = password::hash_password(&payload.password)?;
    let user = User::create(&state.db, &username, &email, &hash, ROLE_USER).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.role)?;
    tracing::info!(user_id = %user.id, username = %user.username, "registered new user");

    Ok(ApiResponse::created(
        AuthData {
            user: UserDto::from(user),
            token,
        },
        "Registration successful",
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<ApiResponse<AuthData>, AppError> {
    let username = payload.username.trim();

    let user = match User::find_by_username(&state.db, username).await? {
        Some(user) => user,
        None => {
            tracing::warn!(username, "login attempt for unknown user");
            return Err(AppError::unauthorized("Invalid credentials"));
        }
    };

    if !password::verify_password(&payload.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "login attempt with wrong password");
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.role)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(ApiResponse::ok(
        AuthData {
            user: UserDto::from(user),
            token,
        },
        "Login successful",
    ))
}

#[instrument(skip(state))]
async fn get_current_user(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<UserDto>, AppError> {
    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    Ok(ApiResponse::ok(UserDto::from(user), "User retrieved"))
}

#[instrument(skip(state, payload))]
async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<ApiResponse<ProfileData>, AppError> {
    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    let mut username = user.username.clone();
    let mut email = user.email.clone();
    let mut password_hash = user.password_hash.clone();
    let mut password_changed = false;

    if let Some(new_username) = payload.username.as_deref().map(str::trim) {
        if !new_username.is_empty() && new_username != user.username {
            let len = new_username.chars().count();
            if !(3..=50).contains(&len) {
                return Err(AppError::bad_request(
                    "Username must be between 3 and 50 characters",
                ));
            }
            if let Some(existing) = User::find_by_username(&state.db, new_username).await? {
                if existing.id != user.id {
                    return Err(AppError::bad_request("Username already exists"));
                }
            }
            username = new_username.to_string();
        }
    }

    if let Some(new_email) = payload.email.as_deref() {
        let new_email = new_email.trim().to_lowercase();
        if !new_email.is_empty() && new_email != user.email {
            if !is_valid_email(&new_email) {
                return Err(AppError::bad_request("Invalid email address"));
            }
            if let Some(existing) = User::find_by_email(&state.db, &new_email).await? {
                if existing.id != user.id {
                    return Err(AppError::bad_request("Email already exists"));
                }
            }
            email = new_email;
        }
    }

    let current = payload.current_password.as_deref().unwrap_or_default();
    let new = payload.new_password.as_deref().unwrap_or_default();
    if !current.is_empty() && !new.is_empty() {
        if !password::verify_password(current, &user.password_hash)? {
            return Err(AppError::bad_request("Current password is incorrect"));
        }
        if new.len() < 6 {
            return Err(AppError::bad_request(
                "Password must be at least 6 characters",
            ));
        }
        password_hash = password::hash_password(new)?;
        password_changed = true;
    }

    let updated = User::update_profile(&state.db, user.id, &username, &email, &password_hash)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;
    tracing::info!(user_id = %updated.id, password_changed, "updated profile");

    let message = if password_changed {
        "Password updated, please sign in again"
    } else {
        "Profile updated"
    };

    Ok(ApiResponse::ok(
        ProfileData {
            user: UserDto::from(updated),
            password_changed,
        },
        message,
    ))
}
