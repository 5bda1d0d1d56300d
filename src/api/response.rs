//! Response envelope shared by every endpoint

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{book::Book, transaction::TransactionDetails, user::UserShort};

/// `{ success, message, data }` wrapper around every JSON body
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Paginated list payload
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    BookPage = PaginatedResponse<Book>,
    UserPage = PaginatedResponse<UserShort>,
    TransactionPage = PaginatedResponse<TransactionDetails>
)]
pub struct PaginatedResponse<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total number of matching items
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub per_page: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::success("ok", vec![1, 2])).unwrap();
        assert_eq!(body, json!({ "success": true, "message": "ok", "data": [1, 2] }));

        let body = serde_json::to_value(ApiResponse::message("done")).unwrap();
        assert_eq!(body, json!({ "success": true, "message": "done", "data": null }));
    }
}
