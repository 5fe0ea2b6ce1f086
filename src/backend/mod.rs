//! Typed interfaces to the hosted commerce backend, one per entity, plus the
//! two implementations: [`HttpBackend`] for production and
//! [`InMemoryBackend`] for tests and demos.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::CheckoutError;
use crate::models::{
    Coupon, DirectTransferSession, GatewayOrder, GatewayOrderRequest, GatewayVerification, Order,
    PaymentStatus,
};

pub mod http;
pub mod memory;

pub use http::HttpBackend;
pub use memory::{InMemoryBackend, ManualVerifyMode};

/// Read-only coupon lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Finds a coupon by its (already-normalized) code. `None` when no such
    /// code exists.
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, CheckoutError>;
}

/// Order records in the hosted backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order(&self, order: &Order) -> Result<(), CheckoutError>;

    async fn get_order(&self, order_id: Uuid) -> Result<Order, CheckoutError>;

    /// Convenience read used by the payment-status poll.
    async fn payment_status(&self, order_id: Uuid) -> Result<PaymentStatus, CheckoutError> {
        Ok(self.get_order(order_id).await?.payment_status)
    }
}

/// Direct-transfer (UPI) payment endpoints.
///
/// `create_session` also stamps the order's payment method and resets its
/// payment status to pending on the backend side.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectTransferBackend: Send + Sync {
    async fn create_session(
        &self,
        order_id: Uuid,
        amount: Decimal,
    ) -> Result<DirectTransferSession, CheckoutError>;

    /// Verifies a payment claim. `Ok(true)`/`Ok(false)` is the backend's
    /// definitive answer; transport failures surface as `Err` and are
    /// retryable.
    async fn verify_payment(
        &self,
        order_id: Uuid,
        transaction_ref: &str,
    ) -> Result<bool, CheckoutError>;
}

/// Hosted-gateway payment endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GatewayBackend: Send + Sync {
    async fn create_gateway_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, CheckoutError>;

    async fn verify_gateway_payment(
        &self,
        verification: &GatewayVerification,
    ) -> Result<bool, CheckoutError>;
}
