//! Error types for the lending server

use axum::{
    http::{header::RETRY_AFTER, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Stable numeric codes exposed in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 2,
    StoreBusy = 3,
    BadValue = 10,
    DuplicateIsbn = 11,
    DuplicateEmail = 12,
    UnknownTool = 13,
    NoSuchBook = 20,
    NoSuchMember = 21,
    NoSuchLoan = 22,
    MemberInactive = 30,
    DuplicateActiveLoan = 31,
    InventoryExhausted = 32,
    InventoryOverflow = 33,
    CopiesOnLoan = 34,
    LoanAlreadyClosed = 35,
    HasOpenLoans = 36,
    HasUnpaidFines = 37,
    HasActiveReferences = 38,
}

/// Coarse classification used by callers to decide how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Transient,
    Internal,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Book with id {0} not found")]
    BookNotFound(i32),

    #[error("Member with id {0} not found")]
    MemberNotFound(i32),

    #[error("Book {book_id} is not currently borrowed by member {member_id}")]
    LoanNotFound { book_id: i32, member_id: i32 },

    #[error("Loan with id {0} not found")]
    LoanIdNotFound(i32),

    #[error("Member {0} is not active")]
    MemberInactive(i32),

    #[error("Member {member_id} already has an open loan for book {book_id}")]
    DuplicateActiveLoan { book_id: i32, member_id: i32 },

    #[error("No copies of book {0} are available")]
    InventoryExhausted(i32),

    #[error("Book {0} already has all of its copies on the shelf")]
    InventoryOverflow(i32),

    #[error("Book {book_id} has {on_loan} copies on loan, more than the requested total")]
    CopiesOnLoan { book_id: i32, on_loan: i32 },

    #[error("Loan {0} is already closed")]
    LoanAlreadyClosed(i32),

    #[error("Member {member_id} has {count} open loan(s)")]
    HasOpenLoans { member_id: i32, count: i64 },

    #[error("Member {member_id} has unpaid fines of {amount}")]
    HasUnpaidFines { member_id: i32, amount: Decimal },

    #[error("{entity} {id} is still referenced by {count} loan(s)")]
    HasActiveReferences {
        entity: &'static str,
        id: i32,
        count: i64,
    },

    #[error("A book with ISBN {0} already exists")]
    DuplicateIsbn(String),

    #[error("A member with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Store is busy, retry later")]
    StoreBusy,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::BookNotFound(_)
            | AppError::MemberNotFound(_)
            | AppError::LoanNotFound { .. }
            | AppError::LoanIdNotFound(_) => ErrorKind::NotFound,
            AppError::MemberInactive(_)
            | AppError::DuplicateActiveLoan { .. }
            | AppError::InventoryExhausted(_)
            | AppError::InventoryOverflow(_)
            | AppError::CopiesOnLoan { .. }
            | AppError::LoanAlreadyClosed(_)
            | AppError::HasOpenLoans { .. }
            | AppError::HasUnpaidFines { .. }
            | AppError::HasActiveReferences { .. } => ErrorKind::Conflict,
            AppError::DuplicateIsbn(_)
            | AppError::DuplicateEmail(_)
            | AppError::Validation(_)
            | AppError::UnknownTool(_) => ErrorKind::Validation,
            AppError::StoreBusy => ErrorKind::Transient,
            AppError::Database(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::BookNotFound(_) => ErrorCode::NoSuchBook,
            AppError::MemberNotFound(_) => ErrorCode::NoSuchMember,
            AppError::LoanNotFound { .. } | AppError::LoanIdNotFound(_) => ErrorCode::NoSuchLoan,
            AppError::MemberInactive(_) => ErrorCode::MemberInactive,
            AppError::DuplicateActiveLoan { .. } => ErrorCode::DuplicateActiveLoan,
            AppError::InventoryExhausted(_) => ErrorCode::InventoryExhausted,
            AppError::InventoryOverflow(_) => ErrorCode::InventoryOverflow,
            AppError::CopiesOnLoan { .. } => ErrorCode::CopiesOnLoan,
            AppError::LoanAlreadyClosed(_) => ErrorCode::LoanAlreadyClosed,
            AppError::HasOpenLoans { .. } => ErrorCode::HasOpenLoans,
            AppError::HasUnpaidFines { .. } => ErrorCode::HasUnpaidFines,
            AppError::HasActiveReferences { .. } => ErrorCode::HasActiveReferences,
            AppError::DuplicateIsbn(_) => ErrorCode::DuplicateIsbn,
            AppError::DuplicateEmail(_) => ErrorCode::DuplicateEmail,
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::UnknownTool(_) => ErrorCode::UnknownTool,
            AppError::StoreBusy => ErrorCode::StoreBusy,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    /// Whether the caller may retry the same operation unchanged
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let busy = match &err {
            sqlx::Error::PoolTimedOut => true,
            // lock_not_available, serialization_failure, deadlock_detected
            sqlx::Error::Database(db) => {
                matches!(db.code().as_deref(), Some("55P03" | "40001" | "40P01"))
            }
            _ => false,
        };
        if busy {
            AppError::StoreBusy
        } else {
            AppError::Database(err)
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorResponse {
    pub fn from_error(err: &AppError) -> Self {
        let message = match err {
            AppError::Database(_) => "Database error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let code = err.code();
        Self {
            code: code as u32,
            error: format!("{:?}", code),
            kind: err.kind(),
            message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match &self {
            AppError::Database(e) => tracing::error!("Database error: {:?}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            AppError::StoreBusy => tracing::warn!("Store busy, asking client to retry"),
            _ => {}
        }

        let body = Json(ErrorResponse::from_error(&self));

        if self.is_transient() {
            return (status, [(RETRY_AFTER, "1")], body).into_response();
        }
        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
