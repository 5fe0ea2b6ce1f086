use serde::Serialize;

use crate::coupons::CouponRejection;

/// Crate-wide error type for the checkout subsystem.
///
/// Adapters never surface this to the orchestrator directly — terminal
/// payment results are normalized to [`crate::payments::PaymentOutcome`]
/// first. Everything else (cart persistence, coupon lookup, order creation,
/// configuration) propagates as a `CheckoutError`.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum CheckoutError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Coupon rejected: {0}")]
    Coupon(#[from] CouponRejection),

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Payment session error: {0}")]
    PaymentSession(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for CheckoutError {
    fn from(err: validator::ValidationErrors) -> Self {
        CheckoutError::ValidationError(err.to_string())
    }
}

impl From<reqwest::Error> for CheckoutError {
    fn from(err: reqwest::Error) -> Self {
        CheckoutError::ExternalServiceError(err.to_string())
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(err: serde_json::Error) -> Self {
        CheckoutError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for CheckoutError {
    fn from(err: std::io::Error) -> Self {
        CheckoutError::StorageError(err.to_string())
    }
}

impl CheckoutError {
    /// True when the caller may simply retry the same action (transient
    /// network/backend failures, per the error taxonomy).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::ExternalServiceError(_) | CheckoutError::PaymentSession(_)
        )
    }

    /// Message suitable for buyer-facing surfaces. Internal errors are
    /// collapsed to a generic message so implementation details never leak
    /// into the storefront.
    pub fn buyer_message(&self) -> String {
        match self {
            Self::SerializationError(_) | Self::StorageError(_) | Self::InternalError(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            Self::ExternalServiceError(_) => {
                "We could not reach the payment service. Please try again.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_retryable_classification() {
        assert!(CheckoutError::ExternalServiceError("timeout".into()).is_retryable());
        assert!(!CheckoutError::EmptyCart.is_retryable());
        assert!(!CheckoutError::Coupon(CouponRejection::InvalidCode).is_retryable());
    }

    #[test]
    fn test_buyer_message_hides_internals() {
        let err = CheckoutError::StorageError("open /tmp/cart.json: permission denied".into());
        assert!(!err.buyer_message().contains("/tmp"));
    }

    #[test]
    fn test_coupon_rejection_message_passthrough() {
        let err = CheckoutError::Coupon(CouponRejection::MinimumNotMet {
            minimum: dec!(1000),
            shortfall: dec!(250),
        });
        let msg = err.buyer_message();
        assert!(msg.contains("250"));
    }
}
