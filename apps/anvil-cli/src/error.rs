//! # Command Errors
//!
//! Every command returns `Result<_, AppError>`. The error carries a
//! machine-readable code (printed in `--json` mode) and a message for the
//! person at the counter.
//!
//! ```text
//! DbError / CoreError / ExportError / ConfigError
//!        │
//!        ▼
//!   AppError { code, message } ──► stderr (or JSON) ──► exit status
//! ```
//!
//! Internal failures are logged in full and shown with a generic message.

use serde::Serialize;

use anvil_core::CoreError;
use anvil_db::DbError;
use anvil_export::ExportError;

use crate::config::ConfigError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    InsufficientStock,
    CartError,
    PaymentError,
    DatabaseError,
    ExportError,
    ConfigError,
    Locked,
    Internal,
}

impl ErrorCode {
    /// Process exit status for the code.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCode::NotFound
            | ErrorCode::ValidationError
            | ErrorCode::InsufficientStock
            | ErrorCode::CartError
            | ErrorCode::PaymentError => 2,
            ErrorCode::Locked => 3,
            ErrorCode::ConfigError => 4,
            ErrorCode::DatabaseError | ErrorCode::ExportError | ErrorCode::Internal => 1,
        }
    }
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        AppError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn locked() -> Self {
        AppError::new(ErrorCode::Locked, "Shop is locked")
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => AppError::not_found(&entity, id),
            DbError::UniqueViolation { field, value } => {
                AppError::validation(format!("{} '{}' already exists", field, value))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                AppError::validation("Invalid reference")
            }
            DbError::Rejected(e) => e.into(),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                AppError::new(ErrorCode::DatabaseError, "Database is busy, try again")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_) => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::EmptyCart
            | CoreError::CartTooLarge { .. }
            | CoreError::LineOutOfRange { .. } => ErrorCode::CartError,
            CoreError::InvalidPaymentAmount { .. } => ErrorCode::PaymentError,
            CoreError::QuantityTooLarge { .. } | CoreError::Validation(_) => {
                ErrorCode::ValidationError
            }
        };
        AppError::new(code, err.to_string())
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::MissingDirectory(dir) => AppError::new(
                ErrorCode::ExportError,
                format!("Export folder does not exist: {}", dir.display()),
            ),
            other => {
                tracing::error!("Export failed: {}", other);
                AppError::new(ErrorCode::ExportError, format!("Export failed: {}", other))
            }
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl From<anvil_core::ValidationError> for AppError {
    fn from(err: anvil_core::ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_keep_their_message() {
        let err: AppError = DbError::from(CoreError::InsufficientStock {
            product: "Ball Valve".to_string(),
            available: 2,
            requested: 5,
        })
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(
            err.message,
            "Insufficient stock for Ball Valve: available 2, requested 5"
        );
        assert_eq!(err.code.exit_code(), 2);
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let err: AppError = DbError::QueryFailed("near \"SELEC\": syntax error".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&AppError::not_found("Sale", 9)).unwrap();
        assert_eq!(json, r#"{"code":"NOT_FOUND","message":"Sale not found: 9"}"#);
    }
}
