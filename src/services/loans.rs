//! Loan ledger service

use chrono::{DateTime, Utc};

use crate::{
    config::LoansConfig,
    error::AppResult,
    models::{
        enums::TransactionStatus,
        transaction::{due_date_for, Transaction, TransactionDetails},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LoansConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    /// Lend a copy of a book to a user, due after the configured loan period
    pub async fn issue(&self, user_id: i32, book_id: i32) -> AppResult<TransactionDetails> {
        let issue_date = Utc::now();
        let due_date = due_date_for(issue_date, self.config.loan_period_days);

        let transaction = self
            .repository
            .transactions
            .issue(user_id, book_id, issue_date, due_date)
            .await?;

        self.repository.transactions.get_details(transaction.id).await
    }

    /// Close an active issue
    pub async fn return_book(&self, transaction_id: i32) -> AppResult<TransactionDetails> {
        self.repository
            .transactions
            .return_issue(transaction_id, Utc::now())
            .await?;

        self.repository.transactions.get_details(transaction_id).await
    }

    /// Raw ledger row, used for ownership checks
    pub async fn get(&self, transaction_id: i32) -> AppResult<Transaction> {
        self.repository.transactions.get_by_id(transaction_id).await
    }

    pub async fn get_details(&self, transaction_id: i32) -> AppResult<TransactionDetails> {
        self.repository.transactions.get_details(transaction_id).await
    }

    pub async fn list(
        &self,
        status: Option<TransactionStatus>,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<TransactionDetails>, i64)> {
        self.repository.transactions.list(status, page, per_page).await
    }

    /// Active issues due before `now`
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<TransactionDetails>> {
        self.repository.transactions.overdue(now).await
    }

    /// Every ledger row of a user, most recent first
    pub async fn history_for_user(&self, user_id: i32) -> AppResult<Vec<TransactionDetails>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.transactions.history_for_user(user_id).await
    }

    /// Every ledger row of a book, most recent first
    pub async fn history_for_book(&self, book_id: i32) -> AppResult<Vec<TransactionDetails>> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository.transactions.history_for_book(book_id).await
    }

    /// Books a user currently has out
    pub async fn active_issues_for_user(&self, user_id: i32) -> AppResult<Vec<TransactionDetails>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.transactions.active_issues_for_user(user_id).await
    }

    pub async fn count_active_issues_for_user(&self, user_id: i32) -> AppResult<i64> {
        self.repository.transactions.count_active_issues_for_user(user_id).await
    }
}
