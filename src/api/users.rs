//! User management endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        transaction::TransactionDetails,
        user::{CreateUser, UpdateUser, User, UserQuery, UserShort},
    },
    repository::page_bounds,
    AppState,
};

use super::{ApiResponse, AuthenticatedUser, PaginatedResponse, Path, Query, ValidatedJson};

/// List users with search and pagination
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "Page of users", body = UserPage),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Librarian access required")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<UserShort>>>> {
    claims.require_staff()?;

    let (users, total) = state.services.users.search_users(&query).await?;
    let (page, per_page, _) = page_bounds(query.page, query.per_page);

    Ok(Json(ApiResponse::success(
        "Users retrieved successfully",
        PaginatedResponse {
            items: users,
            total,
            page,
            per_page,
        },
    )))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Not allowed to read this user"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<User>>> {
    claims.require_self_or_staff(id)?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(ApiResponse::success("User retrieved successfully", user)))
}

/// Create a new user with any role
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input, or username/email already in use"),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(user): ValidatedJson<CreateUser>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    claims.require_admin()?;

    let created = state.services.users.create_user(user).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User created successfully", created)),
    ))
}

/// Update an existing user
///
/// Users may edit their own profile; changing a role, or anyone else's
/// profile, needs an administrator.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid input, or username/email already in use"),
        (status = 403, description = "Admin privileges required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(user): ValidatedJson<UpdateUser>,
) -> AppResult<Json<ApiResponse<User>>> {
    if claims.user_id != id || user.role.is_some() {
        claims.require_admin()?;
    }

    let updated = state.services.users.update_user(id, user).await?;
    Ok(Json(ApiResponse::success("User updated successfully", updated)))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "User has active loans, or is the caller"),
        (status = 403, description = "Admin privileges required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    claims.require_admin()?;

    if claims.user_id == id {
        return Err(AppError::BusinessRule(
            "You cannot delete your own account".to_string(),
        ));
    }

    state.services.users.delete_user(id).await?;
    Ok(Json(ApiResponse::message("User deleted successfully")))
}

/// Borrowing history of a user, most recent first
#[utoipa::path(
    get,
    path = "/users/{id}/transactions",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Transactions for the user", body = [TransactionDetails]),
        (status = 403, description = "Not allowed to read this user"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_transactions(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<TransactionDetails>>>> {
    claims.require_self_or_staff(id)?;

    let history = state.services.loans.history_for_user(id).await?;
    Ok(Json(ApiResponse::success(
        "Transactions retrieved successfully",
        history,
    )))
}

/// Books a user currently holds
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Active loans for the user", body = [TransactionDetails]),
        (status = 403, description = "Not allowed to read this user"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<TransactionDetails>>>> {
    claims.require_self_or_staff(id)?;

    let loans = state.services.loans.active_issues_for_user(id).await?;
    Ok(Json(ApiResponse::success("Active loans retrieved successfully", loans)))
}
