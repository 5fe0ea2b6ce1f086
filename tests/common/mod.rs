//! Shared builders for the integration tests.
#![allow(dead_code)]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

use vastra_checkout::backend::InMemoryBackend;
use vastra_checkout::models::{CartItem, Coupon, ShippingDetails};

pub fn shipping_details() -> ShippingDetails {
    ShippingDetails {
        full_name: "Asha Rao".to_string(),
        phone: "9876543210".to_string(),
        email: "asha@example.com".to_string(),
        address_line1: "14 MG Road".to_string(),
        address_line2: Some("Near Trinity Metro".to_string()),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        postal_code: "560001".to_string(),
    }
}

pub fn cart_item(name: &str, unit_price: Decimal, quantity: u32) -> CartItem {
    CartItem {
        product_id: Uuid::new_v4(),
        name: name.to_string(),
        image_url: Some(format!(
            "https://cdn.vastra.shop/{}.jpg",
            name.to_lowercase().replace(' ', "-")
        )),
        size: Some("M".to_string()),
        color: None,
        unit_price,
        quantity,
    }
}

pub fn save20() -> Coupon {
    Coupon {
        id: Uuid::new_v4(),
        code: "SAVE20".to_string(),
        discount_percent: 20,
        min_order_amount: dec!(1000),
        expires_at: Utc::now() + Duration::days(30),
        is_active: true,
    }
}

/// Backend pre-seeded with the SAVE20 coupon.
pub fn seeded_backend() -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_coupon(save20());
    backend
}
