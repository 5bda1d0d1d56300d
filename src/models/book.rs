//! Book (catalog item) model and copy accounting

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};

/// Full book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub barcode: String,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub description: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn copies(&self) -> CopyCounts {
        CopyCounts {
            total: self.total_copies,
            available: self.available_copies,
        }
    }
}

/// Copy budget of a book. Always `0 <= available <= total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyCounts {
    pub total: i32,
    pub available: i32,
}

impl CopyCounts {
    pub fn new(total: i32) -> AppResult<Self> {
        if total < 0 {
            return Err(AppError::Validation(
                "Total copies cannot be negative".to_string(),
            ));
        }
        Ok(Self {
            total,
            available: total,
        })
    }

    /// Copies currently out on loan
    pub fn on_loan(&self) -> i32 {
        self.total - self.available
    }

    /// Take one copy off the shelf
    pub fn issue(self) -> AppResult<Self> {
        if self.available <= 0 {
            return Err(AppError::BusinessRule(
                "No copies of this book are available".to_string(),
            ));
        }
        Ok(Self {
            available: self.available - 1,
            ..self
        })
    }

    /// Put one copy back, never above the total
    pub fn restore(self) -> Self {
        Self {
            available: (self.available + 1).min(self.total),
            ..self
        }
    }

    /// Change the total, shifting availability by the same delta.
    ///
    /// Fails when the new total would not cover the copies on loan.
    pub fn resize(self, total: i32) -> AppResult<Self> {
        if total < 0 {
            return Err(AppError::Validation(
                "Total copies cannot be negative".to_string(),
            ));
        }
        let on_loan = self.on_loan();
        if total < on_loan {
            return Err(AppError::BusinessRule(format!(
                "Cannot reduce total copies to {}: {} copies are on loan",
                total, on_loan
            )));
        }
        Ok(Self {
            total,
            available: total - on_loan,
        })
    }
}

static ISBN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{9}[\dXx]|\d{13})$").expect("valid ISBN regex"));

/// Accepts ISBN-10 or ISBN-13, ignoring hyphens and spaces
fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    let compact: String = isbn.chars().filter(|c| *c != '-' && *c != ' ').collect();
    if ISBN_RE.is_match(&compact) {
        Ok(())
    } else {
        let mut err = ValidationError::new("isbn");
        err.message = Some("ISBN must have 10 or 13 digits".into());
        Err(err)
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 50, message = "Barcode is required"))]
    pub barcode: String,
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author is required"))]
    pub author: String,
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    #[validate(range(min = 0, max = 9999, message = "Publication year is out of range"))]
    pub publication_year: Option<i32>,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 10000, message = "Total copies must be between 0 and 10000"))]
    pub total_copies: i32,
}

/// Update book request; absent fields are left untouched
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 50, message = "Barcode cannot be empty"))]
    pub barcode: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Author cannot be empty"))]
    pub author: Option<String>,
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    #[validate(range(min = 0, max = 9999, message = "Publication year is out of range"))]
    pub publication_year: Option<i32>,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 10000, message = "Total copies must be between 0 and 10000"))]
    pub total_copies: Option<i32>,
}

/// Book search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive match on title, author, ISBN or barcode
    pub q: Option<String>,
    /// Only books with at least one copy on the shelf
    pub available: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_fails_when_no_copy_available() {
        let counts = CopyCounts {
            total: 2,
            available: 0,
        };
        assert!(matches!(counts.issue(), Err(AppError::BusinessRule(_))));

        let empty = CopyCounts::new(0).unwrap();
        assert!(empty.issue().is_err());
    }

    #[test]
    fn test_issue_then_restore_is_identity() {
        let before = CopyCounts::new(3).unwrap();
        let after = before.issue().unwrap().restore();
        assert_eq!(before, after);

        let partly_out = CopyCounts {
            total: 5,
            available: 2,
        };
        assert_eq!(partly_out.issue().unwrap().restore(), partly_out);
    }

    #[test]
    fn test_counts_stay_in_bounds() {
        let mut counts = CopyCounts::new(2).unwrap();
        counts = counts.issue().unwrap();
        counts = counts.issue().unwrap();
        assert_eq!(counts.available, 0);
        assert!(counts.issue().is_err());

        for _ in 0..5 {
            counts = counts.restore();
            assert!(counts.available >= 0 && counts.available <= counts.total);
        }
        assert_eq!(counts.available, 2);
    }

    #[test]
    fn test_resize_keeps_loans_covered() {
        let counts = CopyCounts {
            total: 5,
            available: 2,
        };
        assert_eq!(counts.on_loan(), 3);

        let grown = counts.resize(8).unwrap();
        assert_eq!(grown, CopyCounts { total: 8, available: 5 });

        let shrunk = counts.resize(3).unwrap();
        assert_eq!(shrunk, CopyCounts { total: 3, available: 0 });

        assert!(counts.resize(2).is_err());
        assert!(counts.resize(-1).is_err());
    }

    #[test]
    fn test_negative_total_rejected() {
        assert!(CopyCounts::new(-1).is_err());
    }

    #[test]
    fn test_isbn_validation() {
        assert!(validate_isbn("9780132350884").is_ok());
        assert!(validate_isbn("978-0-13-235088-4").is_ok());
        assert!(validate_isbn("020163361X").is_ok());
        assert!(validate_isbn("12345").is_err());
        assert!(validate_isbn("97801323508AB").is_err());
    }

    #[test]
    fn test_create_book_validation() {
        let book = CreateBook {
            barcode: "BOOK001".to_string(),
            title: "Clean Code".to_string(),
            author: "Robert C. Martin".to_string(),
            isbn: Some("9780132350884".to_string()),
            publisher: None,
            publication_year: Some(2008),
            description: None,
            total_copies: 3,
        };
        assert!(book.validate().is_ok());

        let bad = CreateBook {
            total_copies: -1,
            isbn: Some("abc".to_string()),
            publication_year: Some(12000),
            ..book
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("total_copies"));
        assert!(fields.contains_key("isbn"));
        assert!(fields.contains_key("publication_year"));
    }
}
