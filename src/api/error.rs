use actix_web::{HttpResponse, ResponseError};
use std::fmt;
use tracing::{error, warn};

use crate::api::validation::ErrorResponse;
use crate::chain::pubkey::Pubkey;
use crate::chain::transaction::TransactionError;

/// Service-level errors
#[derive(Debug)]
pub enum ServiceError {
    /// No wallet identity (or no signer) where one is required
    Unauthenticated,

    /// Filter values that cannot be interpreted
    InvalidCriteria(String),

    /// Request failed validation
    ValidationError(String),

    /// Account not found
    NotFound(Pubkey),

    /// Account store unreachable or returned data that could not be decoded
    RemoteFetch(String),

    /// Transaction was rejected or never confirmed
    Transaction(TransactionError),

    /// Wallet session cannot be connected
    WalletUnavailable(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Unauthenticated => write!(f, "Wallet not connected"),
            ServiceError::InvalidCriteria(msg) => write!(f, "Invalid criteria: {}", msg),
            ServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ServiceError::NotFound(address) => write!(f, "Account not found: {}", address),
            ServiceError::RemoteFetch(msg) => write!(f, "Remote fetch failed: {}", msg),
            ServiceError::Transaction(e) => write!(f, "Transaction failed: {}", e),
            ServiceError::WalletUnavailable(msg) => write!(f, "Wallet unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<TransactionError> for ServiceError {
    fn from(e: TransactionError) -> Self {
        ServiceError::Transaction(e)
    }
}

impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::Unauthenticated => {
                warn!("Rejected request without connected wallet");
                HttpResponse::Unauthorized().json(ErrorResponse {
                    error: "Unauthenticated".to_string(),
                    fields: serde_json::json!({"message": "Connect a wallet first"}),
                })
            }
            ServiceError::InvalidCriteria(msg) => {
                warn!("Invalid criteria: {}", msg);
                HttpResponse::BadRequest().json(ErrorResponse {
                    error: "Invalid criteria".to_string(),
                    fields: serde_json::json!({"message": msg}),
                })
            }
            ServiceError::ValidationError(msg) => {
                warn!("Validation error: {}", msg);
                HttpResponse::BadRequest().json(ErrorResponse {
                    error: "Validation failed".to_string(),
                    fields: serde_json::json!({"message": msg}),
                })
            }
            ServiceError::NotFound(address) => {
                warn!("Account not found: {}", address);
                HttpResponse::NotFound().json(ErrorResponse {
                    error: "Not found".to_string(),
                    fields: serde_json::json!({"message": format!("No account at {}", address)}),
                })
            }
            ServiceError::RemoteFetch(msg) => {
                error!("Remote fetch failed: {}", msg);
                HttpResponse::BadGateway().json(ErrorResponse {
                    error: "Failed to reach account store".to_string(),
                    fields: serde_json::json!({"message": "Remote fetch failed"}),
                })
            }
            ServiceError::Transaction(e) => {
                error!("Transaction failed: {}", e);
                HttpResponse::BadGateway().json(ErrorResponse {
                    error: "Transaction failed".to_string(),
                    fields: serde_json::json!({"message": e.to_string()}),
                })
            }
            ServiceError::WalletUnavailable(msg) => {
                warn!("Wallet unavailable: {}", msg);
                HttpResponse::Conflict().json(ErrorResponse {
                    error: "Wallet unavailable".to_string(),
                    fields: serde_json::json!({"message": msg}),
                })
            }
        }
    }
}
