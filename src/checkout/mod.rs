use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::cart::CartStore;
use crate::coupons::{CouponApproval, CouponValidator};
use crate::errors::CheckoutError;
use crate::events::{Event, EventSender};
use crate::models::{Order, PaymentMethod, ShippingDetails};
use crate::orders::OrderWriter;
use crate::payments::{PaymentAdapters, PaymentOutcome};

/// Wizard position. Shipping collects and validates contact details without
/// touching the backend; Payment re-exposes the coupon control and the
/// method selector, then places the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckoutStep {
    Shipping,
    Payment,
}

/// Result of one `place_order` call: the (single) order created for this
/// attempt, and the adapter's terminal outcome.
#[derive(Clone, Debug)]
pub struct CheckoutResult {
    pub order_id: Uuid,
    pub outcome: PaymentOutcome,
}

/// Sequences one checkout attempt: shipping → payment → adapter handoff.
///
/// The orchestrator holds the created order id as part of its own state, so a
/// second `place_order` on the same attempt (double-click, retry after a
/// failed payment) deterministically reuses the existing order instead of
/// creating a duplicate — independent of any UI button state. It is also the
/// only component that clears the cart, and does so only on a successful
/// outcome.
pub struct CheckoutOrchestrator {
    cart: Arc<Mutex<CartStore>>,
    writer: OrderWriter,
    adapters: PaymentAdapters,
    validator: CouponValidator,
    events: EventSender,
    step: CheckoutStep,
    shipping: Option<ShippingDetails>,
    placed_order: Option<Order>,
}

impl CheckoutOrchestrator {
    /// Starts a checkout attempt. Refused for an empty cart — checkout is
    /// unreachable with nothing to buy; the UI redirects away on this error.
    pub async fn begin(
        cart: Arc<Mutex<CartStore>>,
        writer: OrderWriter,
        adapters: PaymentAdapters,
        validator: CouponValidator,
        events: EventSender,
    ) -> Result<Self, CheckoutError> {
        let cart_total = {
            let guard = cart.lock().await;
            if guard.is_empty() {
                return Err(CheckoutError::EmptyCart);
            }
            guard.total()
        };
        events
            .send_or_log(Event::CheckoutStarted { cart_total })
            .await;

        Ok(Self {
            cart,
            writer,
            adapters,
            validator,
            events,
            step: CheckoutStep::Shipping,
            shipping: None,
            placed_order: None,
        })
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn placed_order_id(&self) -> Option<Uuid> {
        self.placed_order.as_ref().map(|o| o.id)
    }

    /// Validates and stores the shipping details (typed in or chosen from a
    /// pre-saved address), advancing to the payment step. No backend call is
    /// made here.
    #[instrument(skip(self, details))]
    pub fn submit_shipping(&mut self, details: ShippingDetails) -> Result<(), CheckoutError> {
        details.validate()?;
        self.shipping = Some(details);
        self.step = CheckoutStep::Payment;
        Ok(())
    }

    /// Applies (or changes) a coupon — available up to the moment of
    /// payment. Delegates to the cart store; a rejection leaves the existing
    /// discount untouched.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&mut self, code: &str) -> Result<CouponApproval, CheckoutError> {
        self.cart
            .lock()
            .await
            .apply_coupon(&self.validator, code)
            .await
    }

    /// Places the order and runs the selected payment adapter to a terminal
    /// outcome.
    ///
    /// The order is created exactly once per checkout attempt; any retry —
    /// after a cancelled gateway, a failed session, a double-click — reuses
    /// the already-created order id. The cart is cleared only on success, so
    /// a failed or cancelled payment leaves the buyer's items intact.
    #[instrument(skip(self))]
    pub async fn place_order(
        &mut self,
        method: PaymentMethod,
    ) -> Result<CheckoutResult, CheckoutError> {
        if self.step != CheckoutStep::Payment {
            return Err(CheckoutError::InvalidOperation(
                "Shipping details are required before payment".to_string(),
            ));
        }

        let order = match &self.placed_order {
            Some(existing) => {
                info!(
                    "Reusing order {} for payment retry",
                    existing.order_number
                );
                existing.clone()
            }
            None => {
                let cart_snapshot = {
                    let guard = self.cart.lock().await;
                    if guard.is_empty() {
                        return Err(CheckoutError::EmptyCart);
                    }
                    guard.cart().clone()
                };
                let shipping = self.shipping.clone().ok_or_else(|| {
                    CheckoutError::InvalidOperation(
                        "Shipping details are required before payment".to_string(),
                    )
                })?;

                let order = self.writer.create(shipping, &cart_snapshot, method).await?;
                self.placed_order = Some(order.clone());
                order
            }
        };

        let adapter = self.adapters.for_method(method);
        let outcome = adapter.pay(&order).await;

        if outcome.is_success() {
            // Idempotent: clearing an already-empty cart is a no-op.
            self.cart.lock().await.clear();
            self.events
                .send_or_log(Event::CheckoutCompleted { order_id: order.id })
                .await;
            info!("Checkout completed for order {}", order.order_number);
        }

        Ok(CheckoutResult {
            order_id: order.id,
            outcome,
        })
    }
}
