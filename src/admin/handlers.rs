use axum::extract::State;
use axum::routing::{get, put};
use axum::Router;
use tracing::instrument;
use uuid::Uuid;

use crate::admin::dto::{
    CreateUserRequest, PaginationDto, UpdateRoleRequest, UserDetailData, UserListData,
    UserListParams,
};
use crate::auth::dto::UserDto;
use crate::auth::jwt::AdminUser;
use crate::auth::repo::User;
use crate::auth::{is_valid_role, password, validate_new_user};
use crate::error::AppError;
use crate::extract::{page_window, AppJson, AppPath, AppQuery};
use crate::notes::repo::Note;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users).post(create_user))
        .route("/admin/users/:id", get(get_user).delete(delete_user))
        .route("/admin/users/:id/role", put(update_role))
}

#[instrument(skip(state))]
async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppQuery(params): AppQuery<UserListParams>,
) -> Result<ApiResponse<UserListData>, AppError> {
    let (page, size, offset) = page_window(params.page, params.page_size);
    let keyword = params
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let users = User::list(&state.db, keyword, size, offset).await?;
    let total = User::count(&state.db, keyword).await?;

    Ok(ApiResponse::ok(
        UserListData {
            users: users.into_iter().map(UserDto::from).collect(),
            pagination: PaginationDto {
                page,
                page_size: size,
                total,
                total_page: (total + size - 1) / size,
            },
        },
        "Users retrieved",
    ))
}

#[instrument(skip(state))]
async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<ApiResponse<UserDetailData>, AppError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let note_count = Note::count_by_user(&state.db, user.id).await?;

    Ok(ApiResponse::ok(
        UserDetailData {
            user: UserDto::from(user),
            note_count,
        },
        "User retrieved",
    ))
}

#[instrument(skip(state, payload))]
async fn create_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<ApiResponse<UserDto>, AppError> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    validate_new_user(&username, &payload.password, &email)?;
    if !is_valid_role(&payload.role) {
        return Err(AppError::bad_request("Invalid role"));
    }

    if User::find_by_username(&state.db, &username).await?.is_some() {
        return Err(AppError::bad_request("Username already exists"));
    }
    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::bad_request("Email already exists"));
    }

    let hash = password::hash_password(&payload.password)?;
    let user = User::create(&state.db, &username, &email, &hash, &payload.role).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "admin created user");

    Ok(ApiResponse::created(UserDto::from(user), "User created"))
}

#[instrument(skip(state, payload))]
async fn update_role(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateRoleRequest>,
) -> Result<ApiResponse<UserDto>, AppError> {
    if !is_valid_role(&payload.role) {
        return Err(AppError::bad_request("Invalid role"));
    }

    let user = User::update_role(&state.db, id, &payload.role)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    tracing::info!(user_id = %user.id, role = %user.role, "updated user role");

    Ok(ApiResponse::ok(UserDto::from(user), "User role updated"))
}

#[instrument(skip(state))]
async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    if admin_id == id {
        return Err(AppError::bad_request(
            "Administrators cannot delete their own account",
        ));
    }

    let removed = User::soft_delete(&state.db, id).await?;
    if removed == 0 {
        return Err(AppError::not_found("User not found"));
    }
    tracing::info!(user_id = %id, "admin deleted user");

    Ok(ApiResponse::message("User deleted"))
}
