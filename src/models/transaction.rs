//! Loan ledger (transaction) model and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{TransactionStatus, TransactionType};

/// Ledger row from database
///
/// `user_id` and `book_id` become NULL when the user or book is deleted;
/// the row itself is kept.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Transaction {
    pub id: i32,
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    /// When the ledger row was written
    pub transaction_date: DateTime<Utc>,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

impl Transaction {
    /// An ISSUE not yet closed by a return
    pub fn is_active_issue(&self) -> bool {
        self.transaction_type == TransactionType::Issue && self.status == TransactionStatus::Active
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active_issue() && self.due_date < now
    }
}

/// Due date of a loan started at `issue_date`
pub fn due_date_for(issue_date: DateTime<Utc>, loan_period_days: u32) -> DateTime<Utc> {
    issue_date + Duration::days(i64::from(loan_period_days))
}

/// Transaction with borrower and book details for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TransactionDetails {
    pub id: i32,
    pub user_id: Option<i32>,
    pub username: Option<String>,
    pub user_full_name: Option<String>,
    pub book_id: Option<i32>,
    pub book_title: Option<String>,
    pub book_barcode: Option<String>,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub transaction_date: DateTime<Utc>,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub is_overdue: bool,
}

/// Issue request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IssueBook {
    #[validate(range(min = 1, message = "Book id must be positive"))]
    pub book_id: i32,
    /// Borrower; defaults to the authenticated user
    #[validate(range(min = 1, message = "User id must be positive"))]
    pub user_id: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(due_in_days: i64, status: TransactionStatus) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: 1,
            user_id: Some(1),
            book_id: Some(1),
            transaction_type: TransactionType::Issue,
            status,
            transaction_date: now,
            issue_date: now - Duration::days(14),
            due_date: now + Duration::days(due_in_days),
            return_date: None,
        }
    }

    #[test]
    fn test_overdue_requires_active_issue_past_due() {
        let now = Utc::now();
        assert!(issue(-1, TransactionStatus::Active).is_overdue(now));
        assert!(!issue(1, TransactionStatus::Active).is_overdue(now));
        assert!(!issue(-1, TransactionStatus::Closed).is_overdue(now));

        let mut returned = issue(-1, TransactionStatus::Closed);
        returned.transaction_type = TransactionType::Return;
        assert!(!returned.is_overdue(now));
    }

    #[test]
    fn test_due_exactly_now_is_not_overdue() {
        let mut tx = issue(0, TransactionStatus::Active);
        let now = tx.due_date;
        assert!(!tx.is_overdue(now));
        tx.due_date = now - Duration::seconds(1);
        assert!(tx.is_overdue(now));
    }

    #[test]
    fn test_due_date_adds_loan_period() {
        let start = Utc::now();
        assert_eq!(due_date_for(start, 14) - start, Duration::days(14));
        assert_eq!(due_date_for(start, 0), start);
    }
}
