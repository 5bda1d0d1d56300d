//! Data models for Athenaeum

pub mod book;
pub mod enums;
pub mod transaction;
pub mod user;

// Re-export commonly used types
pub use book::{Book, CopyCounts};
pub use enums::{Role, TransactionStatus, TransactionType};
pub use transaction::{Transaction, TransactionDetails};
pub use user::{User, UserClaims, UserShort};
