//! Book catalog endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        transaction::TransactionDetails,
    },
    repository::page_bounds,
    AppState,
};

use super::{ApiResponse, AuthenticatedUser, PaginatedResponse, Path, Query, ValidatedJson};

/// Search the catalog with pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Page of books", body = BookPage),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<ApiResponse<PaginatedResponse<Book>>>> {
    let (books, total) = state.services.catalog.search_books(&query).await?;
    let (page, per_page, _) = page_bounds(query.page, query.per_page);

    Ok(Json(ApiResponse::success(
        "Books retrieved successfully",
        PaginatedResponse {
            items: books,
            total,
            page,
            per_page,
        },
    )))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(ApiResponse::success("Book retrieved successfully", book)))
}

/// Look a book up by its barcode
#[utoipa::path(
    get,
    path = "/books/barcode/{barcode}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("barcode" = String, Path, description = "Book barcode")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_by_barcode(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(barcode): Path<String>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let book = state.services.catalog.get_book_by_barcode(&barcode).await?;
    Ok(Json(ApiResponse::success("Book retrieved successfully", book)))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input or duplicate barcode"),
        (status = 403, description = "Librarian access required")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(book): ValidatedJson<CreateBook>,
) -> AppResult<(StatusCode, Json<ApiResponse<Book>>)> {
    claims.require_staff()?;

    let created = state.services.catalog.create_book(book).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Book created successfully", created)),
    ))
}

/// Update a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input, or fewer copies than are on loan"),
        (status = 403, description = "Librarian access required"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    ValidatedJson(book): ValidatedJson<UpdateBook>,
) -> AppResult<Json<ApiResponse<Book>>> {
    claims.require_staff()?;

    let updated = state.services.catalog.update_book(id, book).await?;
    Ok(Json(ApiResponse::success("Book updated successfully", updated)))
}

/// Remove a book from the catalog
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 400, description = "Book has active loans"),
        (status = 403, description = "Librarian access required"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    claims.require_staff()?;

    state.services.catalog.delete_book(id).await?;
    Ok(Json(ApiResponse::message("Book deleted successfully")))
}

/// Ledger entries for a book, most recent first
#[utoipa::path(
    get,
    path = "/books/{id}/transactions",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Transactions for the book", body = [TransactionDetails]),
        (status = 403, description = "Librarian access required"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_transactions(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<TransactionDetails>>>> {
    claims.require_staff()?;

    let history = state.services.loans.history_for_book(id).await?;
    Ok(Json(ApiResponse::success(
        "Transactions retrieved successfully",
        history,
    )))
}
