//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        enums::Role,
        user::{RegisterUser, User},
    },
    AppState,
};

use super::{ApiResponse, AuthenticatedUser, ValidatedJson};

/// Login request
#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response with token and profile
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

/// Profile of the authenticated user
#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub active_loans: i64,
}

/// Login with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let (token, user) = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;

    Ok(Json(ApiResponse::success(
        "Login successful",
        LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: state.services.users.token_lifetime_secs(),
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        },
    )))
}

/// Register a new member account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid input, or username/email already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterUser>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let user = state.services.users.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User registered successfully", user)),
    ))
}

/// Create the default administrator if it does not exist yet
#[utoipa::path(
    post,
    path = "/auth/init",
    tag = "auth",
    responses(
        (status = 200, description = "Default administrator created or already present")
    )
)]
pub async fn init_default_user(State(state): State<AppState>) -> AppResult<Json<ApiResponse<()>>> {
    let message = match state.services.users.create_default_admin().await? {
        Some(_) => "Default user created successfully",
        None => "Default user already exists",
    };
    Ok(Json(ApiResponse::message(message)))
}

/// Current user profile
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<MeResponse>>> {
    let user = state.services.users.get_by_id(claims.user_id).await?;
    let active_loans = state
        .services
        .loans
        .count_active_issues_for_user(claims.user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Current user",
        MeResponse { user, active_loans },
    )))
}
