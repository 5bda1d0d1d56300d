//! Loan ledger repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        enums::{TransactionStatus, TransactionType},
        transaction::{Transaction, TransactionDetails},
    },
};

use super::page_bounds;

/// Ledger rows joined with borrower and book; `is_overdue` is relative to NOW()
const DETAILS_SELECT: &str = r#"
    SELECT t.id, t.user_id, u.username, u.full_name AS user_full_name,
           t.book_id, b.title AS book_title, b.barcode AS book_barcode,
           t.transaction_type, t.status, t.transaction_date,
           t.issue_date, t.due_date, t.return_date,
           (t.transaction_type = 'ISSUE' AND t.status = 'ACTIVE' AND t.due_date < NOW()) AS is_overdue
    FROM transactions t
    LEFT JOIN users u ON u.id = t.user_id
    LEFT JOIN books b ON b.id = t.book_id
"#;

const ACTIVE_ISSUE: &str = "t.transaction_type = 'ISSUE' AND t.status = 'ACTIVE'";

const MOST_RECENT_FIRST: &str = "ORDER BY t.transaction_date DESC, t.id DESC";

#[derive(Clone)]
pub struct TransactionsRepository {
    pool: Pool<Postgres>,
}

impl TransactionsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get ledger row by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Transaction> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))
    }

    /// Get ledger row with borrower and book details
    pub async fn get_details(&self, id: i32) -> AppResult<TransactionDetails> {
        sqlx::query_as::<_, TransactionDetails>(&format!("{} WHERE t.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))
    }

    /// Whole ledger, most recent first, optionally filtered by status
    pub async fn list(
        &self,
        status: Option<TransactionStatus>,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<TransactionDetails>, i64)> {
        let (_, per_page, offset) = page_bounds(page, per_page);

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions t WHERE ($1::TEXT IS NULL OR t.status = $1)")
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

        let transactions = sqlx::query_as::<_, TransactionDetails>(&format!(
            "{} WHERE ($1::TEXT IS NULL OR t.status = $1) {} LIMIT $2 OFFSET $3",
            DETAILS_SELECT, MOST_RECENT_FIRST
        ))
        .bind(status)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((transactions, total))
    }

    /// All ledger rows for a user, most recent first
    pub async fn history_for_user(&self, user_id: i32) -> AppResult<Vec<TransactionDetails>> {
        let transactions = sqlx::query_as::<_, TransactionDetails>(&format!(
            "{} WHERE t.user_id = $1 {}",
            DETAILS_SELECT, MOST_RECENT_FIRST
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// All ledger rows for a book, most recent first
    pub async fn history_for_book(&self, book_id: i32) -> AppResult<Vec<TransactionDetails>> {
        let transactions = sqlx::query_as::<_, TransactionDetails>(&format!(
            "{} WHERE t.book_id = $1 {}",
            DETAILS_SELECT, MOST_RECENT_FIRST
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Books a user currently has out, oldest due date first
    pub async fn active_issues_for_user(&self, user_id: i32) -> AppResult<Vec<TransactionDetails>> {
        let transactions = sqlx::query_as::<_, TransactionDetails>(&format!(
            "{} WHERE t.user_id = $1 AND {} ORDER BY t.due_date, t.id",
            DETAILS_SELECT, ACTIVE_ISSUE
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Number of books a user currently has out
    pub async fn count_active_issues_for_user(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM transactions t WHERE t.user_id = $1 AND {}",
            ACTIVE_ISSUE
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Active issues whose due date precedes `now`
    pub async fn overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<TransactionDetails>> {
        let transactions = sqlx::query_as::<_, TransactionDetails>(&format!(
            "{} WHERE {} AND t.due_date < $1 ORDER BY t.due_date, t.id",
            DETAILS_SELECT, ACTIVE_ISSUE
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Lend one copy of `book_id` to `user_id`.
    ///
    /// The book row is locked for the duration of the database transaction,
    /// so the availability check and the decrement happen atomically.
    pub async fn issue(
        &self,
        user_id: i32,
        book_id: i32,
        issue_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1 FOR SHARE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;

        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        let copies = book.copies().issue()?;

        let already_issued: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM transactions t WHERE t.user_id = $1 AND t.book_id = $2 AND {})",
            ACTIVE_ISSUE
        ))
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_issued {
            return Err(AppError::BusinessRule(
                "User already has an active loan for this book".to_string(),
            ));
        }

        sqlx::query("UPDATE books SET available_copies = $2, updated_at = NOW() WHERE id = $1")
            .bind(book_id)
            .bind(copies.available)
            .execute(&mut *tx)
            .await?;

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (user_id, book_id, transaction_type, status,
                                      transaction_date, issue_date, due_date)
            VALUES ($1, $2, $3, $4, $5, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(TransactionType::Issue)
        .bind(TransactionStatus::Active)
        .bind(issue_date)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::unique_violation_or(e, "User already has an active loan for this book"))?;

        tx.commit().await?;

        tracing::info!(
            transaction_id = transaction.id,
            user_id,
            book_id,
            available = copies.available,
            "Book issued"
        );

        Ok(transaction)
    }

    /// Close an active issue and put the copy back on the shelf.
    ///
    /// The return event is appended to the ledger as a CLOSED RETURN row.
    pub async fn return_issue(&self, id: i32, return_date: DateTime<Utc>) -> AppResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))?;

        if current.transaction_type != TransactionType::Issue {
            return Err(AppError::BusinessRule(
                "Only issue transactions can be returned".to_string(),
            ));
        }
        if current.status != TransactionStatus::Active {
            return Err(AppError::BusinessRule("Transaction is not active".to_string()));
        }

        let closed = sqlx::query_as::<_, Transaction>(
            "UPDATE transactions SET status = $2, return_date = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(TransactionStatus::Closed)
        .bind(return_date)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(book_id) = current.book_id {
            let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
                .bind(book_id)
                .fetch_optional(&mut *tx)
                .await?;

            if let Some(book) = book {
                let copies = book.copies().restore();
                sqlx::query("UPDATE books SET available_copies = $2, updated_at = NOW() WHERE id = $1")
                    .bind(book_id)
                    .bind(copies.available)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (user_id, book_id, transaction_type, status,
                                      transaction_date, issue_date, due_date, return_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $5)
            "#,
        )
        .bind(current.user_id)
        .bind(current.book_id)
        .bind(TransactionType::Return)
        .bind(TransactionStatus::Closed)
        .bind(return_date)
        .bind(current.issue_date)
        .bind(current.due_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(transaction_id = id, book_id = ?current.book_id, "Book returned");

        Ok(closed)
    }
}
