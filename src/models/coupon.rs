use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A discount coupon as stored in the hosted backend. Read-only from the
/// storefront's perspective.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    /// Unique, case-insensitive; stored uppercase.
    pub code: String,
    /// Percentage discount, 1–100.
    pub discount_percent: u32,
    /// Minimum qualifying subtotal; zero means no minimum.
    pub min_order_amount: Decimal,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Coupon {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
