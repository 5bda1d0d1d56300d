//! Loan ledger endpoints: issue, return, overdue and history

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        enums::TransactionStatus,
        transaction::{IssueBook, Transaction, TransactionDetails},
    },
    repository::page_bounds,
    AppState,
};

use super::{ApiResponse, AuthenticatedUser, PaginatedResponse, Path, Query, ValidatedJson};

/// Ledger listing parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    /// `ACTIVE` or `CLOSED`
    pub status: Option<TransactionStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Lend a book
///
/// `user_id` defaults to the caller; lending to someone else needs a librarian.
#[utoipa::path(
    post,
    path = "/transactions/issue",
    tag = "transactions",
    security(("bearer_auth" = [])),
    request_body = IssueBook,
    responses(
        (status = 201, description = "Book issued", body = TransactionDetails),
        (status = 400, description = "No copies available, or the user already holds this book"),
        (status = 403, description = "Librarian access required to issue for another user"),
        (status = 404, description = "User or book not found")
    )
)]
pub async fn issue_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<IssueBook>,
) -> AppResult<(StatusCode, Json<ApiResponse<TransactionDetails>>)> {
    let user_id = request.user_id.unwrap_or(claims.user_id);
    claims.require_self_or_staff(user_id)?;

    let transaction = state.services.loans.issue(user_id, request.book_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Book issued successfully", transaction)),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/transactions/{id}/return",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Issue transaction ID")),
    responses(
        (status = 200, description = "Book returned", body = TransactionDetails),
        (status = 400, description = "Transaction is not an active issue"),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<TransactionDetails>>> {
    if !claims.is_staff() {
        let transaction = state.services.loans.get(id).await?;
        require_borrower(&claims, &transaction)?;
    }

    let transaction = state.services.loans.return_book(id).await?;
    Ok(Json(ApiResponse::success("Book returned successfully", transaction)))
}

/// Active loans past their due date
#[utoipa::path(
    get,
    path = "/transactions/overdue",
    tag = "transactions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue loans", body = [TransactionDetails]),
        (status = 403, description = "Librarian access required")
    )
)]
pub async fn list_overdue(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Vec<TransactionDetails>>>> {
    claims.require_staff()?;

    let overdue = state.services.loans.list_overdue(Utc::now()).await?;
    Ok(Json(ApiResponse::success(
        "Overdue transactions retrieved successfully",
        overdue,
    )))
}

/// Whole ledger, most recent first
#[utoipa::path(
    get,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(TransactionQuery),
    responses(
        (status = 200, description = "Page of transactions", body = TransactionPage),
        (status = 403, description = "Librarian access required")
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<TransactionDetails>>>> {
    claims.require_staff()?;

    let (transactions, total) = state
        .services
        .loans
        .list(query.status, query.page, query.per_page)
        .await?;
    let (page, per_page, _) = page_bounds(query.page, query.per_page);

    Ok(Json(ApiResponse::success(
        "Transactions retrieved successfully",
        PaginatedResponse {
            items: transactions,
            total,
            page,
            per_page,
        },
    )))
}

/// One ledger entry
#[utoipa::path(
    get,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction details", body = TransactionDetails),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<TransactionDetails>>> {
    if !claims.is_staff() {
        let transaction = state.services.loans.get(id).await?;
        require_borrower(&claims, &transaction)?;
    }

    let transaction = state.services.loans.get_details(id).await?;
    Ok(Json(ApiResponse::success(
        "Transaction retrieved successfully",
        transaction,
    )))
}

fn require_borrower(
    claims: &crate::models::user::UserClaims,
    transaction: &Transaction,
) -> AppResult<()> {
    match transaction.user_id {
        Some(user_id) => claims.require_self_or_staff(user_id),
        None => claims.require_staff(),
    }
}
