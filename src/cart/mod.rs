use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::PricingConfig;
use crate::coupons::{CouponApproval, CouponValidator};
use crate::errors::CheckoutError;
use crate::events::{Event, EventSender};
use crate::models::{Cart, CartItem};

pub mod storage;

pub use storage::{CartStorage, InMemoryCartStorage, JsonFileCartStorage};

/// The cart store: owns the [`Cart`], applies mutations, and keeps the
/// derived totals and the persisted snapshot current.
///
/// All mutations are synchronous and immediately re-derive
/// subtotal/shipping/discount/total, then write the serialized cart to
/// durable storage — the derived totals can never be stale for longer than
/// one mutation. Coupon application is the one async operation because it
/// consults the hosted coupon records.
pub struct CartStore {
    cart: Cart,
    pricing: PricingConfig,
    storage: Arc<dyn CartStorage>,
    events: EventSender,
}

impl CartStore {
    /// Loads the persisted cart (empty if missing or corrupt) and re-derives
    /// its totals under the current pricing rules.
    pub fn load(pricing: PricingConfig, storage: Arc<dyn CartStorage>, events: EventSender) -> Self {
        let mut cart = storage.load();
        cart.recalculate(&pricing);
        Self {
            cart,
            pricing,
            storage,
            events,
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn subtotal(&self) -> Decimal {
        self.cart.subtotal
    }

    pub fn total(&self) -> Decimal {
        self.cart.total
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    /// Adds an item, merging into an existing line for the same product
    /// (quantities are summed) or appending a new one.
    #[instrument(skip(self, item), fields(product_id = %item.product_id))]
    pub fn add(&mut self, item: CartItem) {
        let product_id = item.product_id;
        let quantity = item.quantity.max(1);
        match self
            .cart
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            Some(line) => line.quantity += quantity,
            None => self.cart.items.push(CartItem { quantity, ..item }),
        }

        self.after_mutation();
        self.events.emit(Event::CartItemAdded {
            product_id,
            quantity,
        });
        info!("Added {} x{} to cart", product_id, quantity);
    }

    /// Removes the line for `product_id`. Removing an absent line is a no-op.
    #[instrument(skip(self))]
    pub fn remove(&mut self, product_id: Uuid) {
        let before = self.cart.items.len();
        self.cart.items.retain(|line| line.product_id != product_id);
        if self.cart.items.len() == before {
            return;
        }

        self.after_mutation();
        self.events.emit(Event::CartItemRemoved { product_id });
    }

    /// Sets the quantity for a line. A quantity of zero removes the line.
    #[instrument(skip(self))]
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id);
            return;
        }

        let Some(line) = self
            .cart
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
        else {
            return;
        };
        line.quantity = quantity;

        self.after_mutation();
        self.events.emit(Event::CartQuantityChanged {
            product_id,
            quantity,
        });
    }

    /// Validates `code` against the current subtotal and, on success, stores
    /// the resolved discount (replacing any previously applied coupon). On
    /// rejection the existing discount is left unchanged and the rejection
    /// reason is returned.
    #[instrument(skip(self, validator))]
    pub async fn apply_coupon(
        &mut self,
        validator: &CouponValidator,
        code: &str,
    ) -> Result<CouponApproval, CheckoutError> {
        let approval = validator.validate(code, self.cart.subtotal).await?;

        self.cart.coupon = Some(approval.coupon.clone());
        self.after_mutation();
        self.events.emit(Event::CouponApplied {
            code: approval.coupon.code.clone(),
            discount_percent: approval.coupon.discount_percent,
        });
        Ok(approval)
    }

    /// Empties the cart and drops any applied coupon. Clearing an empty cart
    /// is a no-op.
    #[instrument(skip(self))]
    pub fn clear(&mut self) {
        if self.cart.is_empty() && self.cart.coupon.is_none() {
            return;
        }
        self.cart.items.clear();
        self.cart.coupon = None;

        self.after_mutation();
        self.events.emit(Event::CartCleared);
        info!("Cart cleared");
    }

    /// Re-derives totals, drops a coupon whose minimum the cart no longer
    /// meets, and persists the snapshot.
    fn after_mutation(&mut self) {
        self.cart.recalculate(&self.pricing);

        if let Some(coupon) = &self.cart.coupon {
            if self.cart.subtotal < coupon.min_order_amount {
                let code = coupon.code.clone();
                self.cart.coupon = None;
                self.cart.recalculate(&self.pricing);
                self.events.emit(Event::CouponRemoved {
                    code: code.clone(),
                    reason: "Cart no longer meets the coupon minimum".to_string(),
                });
                info!("Dropped coupon {}: minimum no longer met", code);
            }
        }

        if let Err(e) = self.storage.save(&self.cart) {
            // Persistence failure must not fail the mutation; the in-memory
            // cart stays authoritative for this session.
            warn!("Failed to persist cart: {}", e);
        }
    }
}
