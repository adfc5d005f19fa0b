//! Error taxonomy for the matching engine

use thiserror::Error;

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Order-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Order already exists: {order_id}")]
    Duplicate { order_id: String },

    #[error("Order not found: {order_id}")]
    NotFound { order_id: String },

    #[error("Invalid modification: {0}")]
    InvalidModify(String),

    #[error("Self-trade prevented for user {user_id}")]
    SelfTrade { user_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_error_display() {
        let err = OrderError::InvalidPrice("must be positive".to_string());
        assert_eq!(err.to_string(), "Invalid price: must be positive");
    }

    #[test]
    fn test_engine_error_from_order_error() {
        let order_err = OrderError::NotFound {
            order_id: "abc".to_string(),
        };
        let engine_err: EngineError = order_err.into();
        assert!(matches!(engine_err, EngineError::Order(_)));
    }

    #[test]
    fn test_persistence_error_message() {
        let err = EngineError::Persistence {
            message: "journal write failed".to_string(),
        };
        assert!(err.to_string().contains("journal write failed"));
    }
}
