use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::backend::OrderRepository;
use crate::errors::CheckoutError;
use crate::events::{Event, EventSender};
use crate::models::{
    Cart, FulfillmentStatus, Order, OrderItem, PaymentMethod, PaymentStatus, ShippingDetails,
};

/// Creates order records in the hosted backend from a cart snapshot.
///
/// Prices and display attributes are frozen at order time; later catalog
/// changes never affect an existing order. Creation triggers the
/// confirmation notification without awaiting it — notification failure
/// never fails the order.
#[derive(Clone)]
pub struct OrderWriter {
    repo: Arc<dyn OrderRepository>,
    notifier: Arc<dyn crate::notifications::NotificationDispatcher>,
    events: EventSender,
    currency: String,
}

impl OrderWriter {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        notifier: Arc<dyn crate::notifications::NotificationDispatcher>,
        events: EventSender,
        currency: String,
    ) -> Self {
        Self {
            repo,
            notifier,
            events,
            currency,
        }
    }

    /// Creates one order (and its line items) for the given cart and
    /// shipping details. The caller is responsible for invoking this at most
    /// once per checkout attempt.
    #[instrument(skip(self, shipping, cart), fields(items = cart.items.len()))]
    pub async fn create(
        &self,
        shipping: ShippingDetails,
        cart: &Cart,
        payment_method: PaymentMethod,
    ) -> Result<Order, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let order = Order {
            id: order_id,
            order_number: format!(
                "VST-{}",
                order_id.to_string()[..8].to_uppercase()
            ),
            items: cart
                .items
                .iter()
                .map(|line| OrderItem {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    image_url: line.image_url.clone(),
                    size: line.size.clone(),
                    color: line.color.clone(),
                    unit_price: line.unit_price,
                    quantity: line.quantity,
                    line_total: line.line_total(),
                })
                .collect(),
            subtotal: cart.subtotal,
            discount_percent: cart.coupon.as_ref().map_or(0, |c| c.discount_percent),
            discount_total: cart.discount_total,
            shipping_total: cart.shipping_total,
            total: cart.total,
            currency: self.currency.clone(),
            shipping,
            payment_method,
            payment_status: PaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.repo.create_order(&order).await?;
        self.events.send_or_log(Event::OrderCreated(order_id)).await;
        info!("Created order {} for {}", order.order_number, order.total);

        // Fire-and-forget confirmation; failures are logged only.
        let notifier = self.notifier.clone();
        let snapshot = order.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.order_confirmation(&snapshot).await {
                warn!(
                    "Order confirmation dispatch failed for {}: {}",
                    snapshot.order_number, e
                );
            }
        });

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::models::{AppliedCoupon, CartItem};
    use crate::notifications::LogDispatcher;
    use rust_decimal_macros::dec;

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            full_name: "Asha Rao".to_string(),
            phone: "9876543210".to_string(),
            email: "asha@example.com".to_string(),
            address_line1: "14 MG Road".to_string(),
            address_line2: None,
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            postal_code: "560001".to_string(),
        }
    }

    fn cart() -> Cart {
        let mut cart = Cart {
            items: vec![CartItem {
                product_id: Uuid::new_v4(),
                name: "Silk Dupatta".to_string(),
                image_url: Some("https://cdn.vastra.shop/dupatta.jpg".to_string()),
                size: None,
                color: Some("Rust".to_string()),
                unit_price: dec!(1899),
                quantity: 2,
            }],
            coupon: Some(AppliedCoupon {
                code: "SAVE20".to_string(),
                discount_percent: 20,
                min_order_amount: dec!(1000),
            }),
            ..Cart::default()
        };
        cart.recalculate(&crate::config::PricingConfig::default());
        cart
    }

    #[tokio::test]
    async fn test_create_freezes_cart_snapshot() {
        let backend = Arc::new(InMemoryBackend::new());
        let (events, _rx) = EventSender::channel(16);
        let writer = OrderWriter::new(
            backend.clone(),
            Arc::new(LogDispatcher),
            events,
            "INR".to_string(),
        );

        let cart = cart();
        let order = writer
            .create(shipping(), &cart, PaymentMethod::DirectTransfer)
            .await
            .unwrap();

        assert!(order.order_number.starts_with("VST-"));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].line_total, dec!(3798));
        assert_eq!(order.subtotal, cart.subtotal);
        assert_eq!(order.discount_percent, 20);
        assert_eq!(order.total, cart.total);
        assert_eq!(order.payment_status, PaymentStatus::Pending);

        let stored = backend.get_order(order.id).await.unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn test_notification_failure_never_fails_order() {
        struct FailingDispatcher;

        #[async_trait::async_trait]
        impl crate::notifications::NotificationDispatcher for FailingDispatcher {
            async fn order_confirmation(
                &self,
                _order: &Order,
            ) -> Result<(), crate::notifications::NotificationError> {
                Err(crate::notifications::NotificationError::Rejected(
                    "mail relay down".to_string(),
                ))
            }
        }

        let backend = Arc::new(InMemoryBackend::new());
        let (events, _rx) = EventSender::channel(16);
        let writer = OrderWriter::new(
            backend.clone(),
            Arc::new(FailingDispatcher),
            events,
            "INR".to_string(),
        );

        let order = writer
            .create(shipping(), &cart(), PaymentMethod::CashOnDelivery)
            .await
            .expect("order must be created even when notification fails");
        assert!(backend.get_order(order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_cart() {
        let backend = Arc::new(InMemoryBackend::new());
        let (events, _rx) = EventSender::channel(16);
        let writer = OrderWriter::new(backend, Arc::new(LogDispatcher), events, "INR".to_string());

        let result = writer
            .create(shipping(), &Cart::default(), PaymentMethod::CashOnDelivery)
            .await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    }
}
