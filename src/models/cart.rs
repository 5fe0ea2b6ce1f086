use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PricingConfig;

/// One line of the shopping cart. The unit price is frozen at add time and
/// does not follow later catalog price changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A coupon resolved against the cart. The percent is the durable quantity;
/// the minimum is kept alongside so the constraint can be re-checked locally
/// when the subtotal changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount_percent: u32,
    pub min_order_amount: Decimal,
}

/// The shopping cart with its derived totals.
///
/// Totals are re-derived by [`Cart::recalculate`] on every mutation, so they
/// are never stale for longer than one mutation. Invariants:
/// `discount_total = floor(discount_percent/100 × subtotal)`,
/// `shipping_total = 0` when the subtotal is strictly above the free-shipping
/// threshold, and `total = subtotal + shipping_total − discount_total ≥ 0`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub coupon: Option<AppliedCoupon>,
    pub subtotal: Decimal,
    pub shipping_total: Decimal,
    pub discount_total: Decimal,
    pub total: Decimal,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, product_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Re-derives subtotal, shipping, discount, and total from the items and
    /// the applied coupon.
    pub fn recalculate(&mut self, pricing: &PricingConfig) {
        self.subtotal = self.items.iter().map(CartItem::line_total).sum();

        // Free shipping strictly above the threshold; nothing to ship on an
        // empty cart.
        self.shipping_total = if self.subtotal > pricing.free_shipping_threshold {
            Decimal::ZERO
        } else if self.subtotal > Decimal::ZERO {
            pricing.flat_shipping_fee
        } else {
            Decimal::ZERO
        };

        self.discount_total = match &self.coupon {
            Some(coupon) => {
                (Decimal::from(coupon.discount_percent) * self.subtotal / Decimal::from(100))
                    .floor()
            }
            None => Decimal::ZERO,
        };

        self.total = self.subtotal + self.shipping_total - self.discount_total;
    }
}
