use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::error;

use crate::responses::RequestMeta;

pub const E_UNAUTHENTICATED: &str = "UNAUTHENTICATED";
pub const E_BAD_REQUEST: &str = "BAD_REQUEST";
pub const E_BAD_AMOUNT: &str = "BAD_AMOUNT";
pub const E_QUEST_NOT_FOUND: &str = "QUEST_NOT_FOUND";
pub const E_QUEST_ALREADY_COMPLETED: &str = "QUEST_ALREADY_COMPLETED";
pub const E_INSUFFICIENT_FUNDS: &str = "INSUFFICIENT_FUNDS";
pub const E_NO_LOCKED_BONUS: &str = "NO_LOCKED_BONUS";
pub const E_BALANCE_LIMIT: &str = "BALANCE_LIMIT";
pub const E_DB_FAILURE: &str = "DB_FAILURE";

/// Failures of the ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("amount must be a positive number of cents up to {}", crate::MAX_BALANCE)]
    InvalidAmount,
    #[error("operation would take the balance above {}", crate::MAX_BALANCE)]
    BalanceLimitExceeded,
    #[error("quest {0} not found")]
    QuestNotFound(i64),
    #[error("quest {0} already completed")]
    QuestAlreadyCompleted(i64),
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },
    #[error("no locked bonus to stake")]
    NoLockedBonus,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(anyhow::Error),
}

#[derive(Debug)]
pub struct ApiErrorWithMeta {
    error: ApiError,
    meta: RequestMeta,
    code: Option<String>,
}

impl ApiError {
    pub fn with_meta(self, meta: RequestMeta) -> ApiErrorWithMeta {
        ApiErrorWithMeta {
            error: self,
            meta,
            code: None,
        }
    }
}

impl ApiErrorWithMeta {
    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }
}

impl LedgerError {
    /// Maps the error onto its client-facing kind and stable code.
    pub fn with_meta(self, meta: RequestMeta) -> ApiErrorWithMeta {
        let message = self.to_string();
        let (error, code) = match self {
            LedgerError::InvalidAmount => (ApiError::BadRequest(message), E_BAD_AMOUNT),
            LedgerError::QuestNotFound(_) => (ApiError::NotFound(message), E_QUEST_NOT_FOUND),
            LedgerError::QuestAlreadyCompleted(_) => {
                (ApiError::Conflict(message), E_QUEST_ALREADY_COMPLETED)
            }
            LedgerError::InsufficientFunds { .. } => {
                (ApiError::BadRequest(message), E_INSUFFICIENT_FUNDS)
            }
            LedgerError::NoLockedBonus => (ApiError::BadRequest(message), E_NO_LOCKED_BONUS),
            LedgerError::BalanceLimitExceeded => (ApiError::BadRequest(message), E_BALANCE_LIMIT),
            LedgerError::Store(e) => (ApiError::Internal(e), E_DB_FAILURE),
        };
        error.with_meta(meta).with_code(code)
    }
}

impl IntoResponse for ApiErrorWithMeta {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.error {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(e) => {
                error!(request_id = %self.meta.request_id, "internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let mut body = json!({
            "request_id": self.meta.request_id,
            "error": error_message,
        });
        if let Some(code) = self.code {
            body["code"] = json!(code);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responses::new_meta;

    #[test]
    fn ledger_errors_map_to_distinct_statuses() {
        let cases = [
            (LedgerError::InvalidAmount, StatusCode::BAD_REQUEST),
            (LedgerError::QuestNotFound(7), StatusCode::NOT_FOUND),
            (LedgerError::QuestAlreadyCompleted(7), StatusCode::CONFLICT),
            (
                LedgerError::InsufficientFunds {
                    requested: Decimal::from(10),
                    available: Decimal::from(5),
                },
                StatusCode::BAD_REQUEST,
            ),
            (LedgerError::NoLockedBonus, StatusCode::BAD_REQUEST),
            (LedgerError::BalanceLimitExceeded, StatusCode::BAD_REQUEST),
            (
                LedgerError::Store(anyhow::anyhow!("connection reset")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = err.with_meta(new_meta()).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
