use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::errors::CheckoutError;
use crate::models::{
    Coupon, DeepLinks, DirectTransferSession, GatewayOrder, GatewayOrderRequest,
    GatewayVerification, Order, PaymentMethod, PaymentStatus,
};
use crate::payments::upi::uri::{self, PaymentUriParams};

use super::{CouponRepository, DirectTransferBackend, GatewayBackend, OrderRepository};

/// How [`InMemoryBackend::verify_payment`] answers a manual confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManualVerifyMode {
    /// Confirm only when the order is already recorded as paid.
    AcceptIfPaid,
    /// Confirm unconditionally (and mark the order paid).
    AlwaysAccept,
    /// Definitive rejection.
    AlwaysReject,
    /// Simulate a transport failure.
    Unavailable,
}

/// In-process backend holding coupons and orders in concurrent maps.
///
/// Used by tests and demos, and doubling as the reference implementation of
/// the backend's semantics — e.g. `create_session` re-stamps the order's
/// payment method and status exactly as the hosted endpoint does.
pub struct InMemoryBackend {
    coupons: DashMap<String, Coupon>,
    orders: DashMap<Uuid, Order>,
    payee_vpa: String,
    payee_name: String,
    currency: String,
    gateway_key_id: String,
    manual_verify_mode: Mutex<ManualVerifyMode>,
    gateway_verify_accepts: Mutex<bool>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            coupons: DashMap::new(),
            orders: DashMap::new(),
            payee_vpa: "vastra@okaxis".to_string(),
            payee_name: "Vastra".to_string(),
            currency: "INR".to_string(),
            gateway_key_id: "rzp_test_key".to_string(),
            manual_verify_mode: Mutex::new(ManualVerifyMode::AcceptIfPaid),
            gateway_verify_accepts: Mutex::new(true),
        }
    }

    pub fn with_payee(mut self, vpa: &str, name: &str) -> Self {
        self.payee_vpa = vpa.to_string();
        self.payee_name = name.to_string();
        self
    }

    /// Seeds a coupon, keyed by its uppercase code.
    pub fn insert_coupon(&self, coupon: Coupon) {
        self.coupons.insert(coupon.code.to_uppercase(), coupon);
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Marks an order paid, as the buyer's bank transfer would.
    pub fn mark_paid(&self, order_id: Uuid) {
        if let Some(mut order) = self.orders.get_mut(&order_id) {
            order.payment_status = PaymentStatus::Completed;
        }
    }

    pub fn set_manual_verify_mode(&self, mode: ManualVerifyMode) {
        *self
            .manual_verify_mode
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = mode;
    }

    pub fn set_gateway_verify_accepts(&self, accepts: bool) {
        *self
            .gateway_verify_accepts
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = accepts;
    }

    fn manual_verify_mode(&self) -> ManualVerifyMode {
        *self
            .manual_verify_mode
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CouponRepository for InMemoryBackend {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, CheckoutError> {
        Ok(self.coupons.get(code).map(|c| c.clone()))
    }
}

#[async_trait]
impl OrderRepository for InMemoryBackend {
    async fn create_order(&self, order: &Order) -> Result<(), CheckoutError> {
        self.orders.insert(order.id, order.clone());
        info!("Stored order {}", order.order_number);
        Ok(())
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Order, CheckoutError> {
        self.orders
            .get(&order_id)
            .map(|o| o.clone())
            .ok_or_else(|| CheckoutError::NotFound(format!("Order {} not found", order_id)))
    }
}

#[async_trait]
impl DirectTransferBackend for InMemoryBackend {
    async fn create_session(
        &self,
        order_id: Uuid,
        amount: Decimal,
    ) -> Result<DirectTransferSession, CheckoutError> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| CheckoutError::NotFound(format!("Order {} not found", order_id)))?;
        order.payment_method = PaymentMethod::DirectTransfer;
        order.payment_status = PaymentStatus::Pending;

        let note = format!("Order {}", order.order_number);
        let params = PaymentUriParams {
            payee_vpa: &self.payee_vpa,
            payee_name: &self.payee_name,
            amount,
            note: &note,
            currency: &self.currency,
        };
        let payment_uri = uri::payment_uri(&params);
        let deep_links: DeepLinks = uri::deep_links(&params);
        let qr_image = format!(
            "https://api.qrserver.com/v1/create-qr-code/?size=240x240&data={}",
            urlencode(&payment_uri)
        );

        Ok(DirectTransferSession {
            order_id,
            amount,
            payment_uri,
            qr_image,
            deep_links,
            payee_vpa: self.payee_vpa.clone(),
        })
    }

    async fn verify_payment(
        &self,
        order_id: Uuid,
        _transaction_ref: &str,
    ) -> Result<bool, CheckoutError> {
        match self.manual_verify_mode() {
            ManualVerifyMode::AcceptIfPaid => {
                let order = self.get_order(order_id).await?;
                Ok(order.payment_status == PaymentStatus::Completed)
            }
            ManualVerifyMode::AlwaysAccept => {
                self.mark_paid(order_id);
                Ok(true)
            }
            ManualVerifyMode::AlwaysReject => Ok(false),
            ManualVerifyMode::Unavailable => Err(CheckoutError::ExternalServiceError(
                "verification endpoint unavailable".to_string(),
            )),
        }
    }
}

#[async_trait]
impl GatewayBackend for InMemoryBackend {
    async fn create_gateway_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, CheckoutError> {
        Ok(GatewayOrder {
            gateway_order_id: format!("order_{}", Uuid::new_v4().simple()),
            amount: request.amount,
            currency: request.currency.clone(),
            key_id: self.gateway_key_id.clone(),
        })
    }

    async fn verify_gateway_payment(
        &self,
        verification: &GatewayVerification,
    ) -> Result<bool, CheckoutError> {
        let accepts = *self
            .gateway_verify_accepts
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if accepts && !verification.signature.is_empty() {
            self.mark_paid(verification.order_id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order {
            id: Uuid::new_v4(),
            order_number: "VST-TEST0001".to_string(),
            items: vec![],
            subtotal: dec!(1000),
            discount_percent: 0,
            discount_total: Decimal::ZERO,
            shipping_total: dec!(200),
            total: dec!(1200),
            currency: "INR".to_string(),
            shipping: crate::models::ShippingDetails {
                full_name: "Asha Rao".to_string(),
                phone: "9876543210".to_string(),
                email: "asha@example.com".to_string(),
                address_line1: "14 MG Road".to_string(),
                address_line2: None,
                city: "Bengaluru".to_string(),
                state: "Karnataka".to_string(),
                postal_code: "560001".to_string(),
            },
            payment_method: PaymentMethod::DirectTransfer,
            payment_status: PaymentStatus::Pending,
            fulfillment_status: crate::models::FulfillmentStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_session_stamps_order() {
        let backend = InMemoryBackend::new();
        let o = order();
        backend.create_order(&o).await.unwrap();

        let session = backend.create_session(o.id, o.total).await.unwrap();
        assert!(session.payment_uri.starts_with("upi://pay?"));
        assert!(session.qr_image.contains("qr-code"));

        let stored = backend.get_order(o.id).await.unwrap();
        assert_eq!(stored.payment_method, PaymentMethod::DirectTransfer);
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_session_for_unknown_order_fails() {
        let backend = InMemoryBackend::new();
        let result = backend.create_session(Uuid::new_v4(), dec!(100)).await;
        assert!(matches!(result, Err(CheckoutError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_manual_verify_accepts_only_paid_orders_by_default() {
        let backend = InMemoryBackend::new();
        let o = order();
        backend.create_order(&o).await.unwrap();

        assert!(!backend.verify_payment(o.id, "TXN123").await.unwrap());
        backend.mark_paid(o.id);
        assert!(backend.verify_payment(o.id, "TXN123").await.unwrap());
    }

    #[tokio::test]
    async fn test_gateway_verify_marks_order_paid() {
        let backend = InMemoryBackend::new();
        let o = order();
        backend.create_order(&o).await.unwrap();

        let gateway_order = backend
            .create_gateway_order(&GatewayOrderRequest {
                amount: o.total,
                currency: "INR".to_string(),
                receipt: o.order_number.clone(),
                notes: serde_json::json!({ "order_id": o.id }),
            })
            .await
            .unwrap();

        let accepted = backend
            .verify_gateway_payment(&GatewayVerification {
                gateway_order_id: gateway_order.gateway_order_id,
                gateway_payment_id: "pay_123".to_string(),
                signature: "sig".to_string(),
                order_id: o.id,
            })
            .await
            .unwrap();
        assert!(accepted);
        assert_eq!(
            backend.get_order(o.id).await.unwrap().payment_status,
            PaymentStatus::Completed
        );
    }
}
