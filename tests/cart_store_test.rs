//! Integration tests for the cart store.
//!
//! Tests cover:
//! - Mutation semantics (merge, remove, quantity update, clear)
//! - Derived totals and the shipping boundary
//! - Coupon application and the reference pricing scenario
//! - Durable persistence across restarts (JSON file storage)

mod common;

use common::{cart_item, seeded_backend, shipping_details};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use test_case::test_case;

use vastra_checkout::cart::{CartStore, CartStorage, JsonFileCartStorage};
use vastra_checkout::config::PricingConfig;
use vastra_checkout::coupons::CouponValidator;
use vastra_checkout::events::EventSender;
use vastra_checkout::models::PaymentMethod;
use vastra_checkout::notifications::LogDispatcher;
use vastra_checkout::orders::OrderWriter;

fn store_with(storage: Arc<dyn CartStorage>) -> CartStore {
    let (events, _rx) = EventSender::channel(64);
    CartStore::load(PricingConfig::default(), storage, events)
}

// ==================== Shipping Boundary Tests ====================

#[test_case(dec!(1999), dec!(200) ; "below threshold pays flat fee")]
#[test_case(dec!(2000), dec!(200) ; "exactly at threshold still pays")]
#[test_case(dec!(2001), Decimal::ZERO ; "strictly above threshold ships free")]
fn test_shipping_boundary(subtotal: Decimal, expected_shipping: Decimal) {
    let storage: Arc<dyn CartStorage> =
        Arc::new(vastra_checkout::cart::InMemoryCartStorage::new());
    let mut store = store_with(storage);
    store.add(cart_item("Cotton Kurta", subtotal, 1));

    assert_eq!(store.cart().shipping_total, expected_shipping);
    assert_eq!(
        store.total(),
        subtotal + expected_shipping - store.cart().discount_total
    );
}

// ==================== Reference Scenario ====================

#[tokio::test]
async fn test_reference_pricing_scenario() {
    // ₹12,999 + ₹2,000 = ₹14,999 subtotal; SAVE20 (20%, min ₹1,000) gives a
    // floored discount of ₹2,999; free shipping above ₹2,000; total ₹12,000.
    let backend = seeded_backend();
    let validator = CouponValidator::new(backend.clone());
    let storage: Arc<dyn CartStorage> =
        Arc::new(vastra_checkout::cart::InMemoryCartStorage::new());
    let mut store = store_with(storage);

    store.add(cart_item("Banarasi Saree", dec!(12999), 1));
    store.add(cart_item("Silk Cushion Cover", dec!(2000), 1));
    assert_eq!(store.subtotal(), dec!(14999));

    let approval = store.apply_coupon(&validator, "SAVE20").await.unwrap();
    assert_eq!(approval.coupon.discount_percent, 20);

    let cart = store.cart();
    assert_eq!(cart.discount_total, dec!(2999));
    assert_eq!(cart.shipping_total, Decimal::ZERO);
    assert_eq!(cart.total, dec!(12000));

    // The invariant holds after the coupon too.
    assert_eq!(
        cart.total,
        cart.subtotal + cart.shipping_total - cart.discount_total
    );

    // And the order snapshot carries the same numbers.
    let (events, _rx) = EventSender::channel(16);
    let writer = OrderWriter::new(
        backend,
        Arc::new(LogDispatcher),
        events,
        "INR".to_string(),
    );
    let order = writer
        .create(shipping_details(), cart, PaymentMethod::DirectTransfer)
        .await
        .unwrap();
    assert_eq!(order.total, dec!(12000));
    assert_eq!(order.discount_percent, 20);
    assert_eq!(order.items.len(), 2);
}

// ==================== No-op Edge Cases ====================

#[test]
fn test_noop_mutations() {
    let storage: Arc<dyn CartStorage> =
        Arc::new(vastra_checkout::cart::InMemoryCartStorage::new());
    let mut store = store_with(storage);

    // Clearing an empty cart and removing an absent line change nothing.
    store.clear();
    store.remove(uuid::Uuid::new_v4());
    store.set_quantity(uuid::Uuid::new_v4(), 3);

    assert!(store.is_empty());
    assert_eq!(store.total(), Decimal::ZERO);
}

// ==================== Persistence Tests ====================

#[test]
fn test_cart_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cart.json");

    {
        let storage: Arc<dyn CartStorage> = Arc::new(JsonFileCartStorage::new(&path));
        let mut store = store_with(storage);
        store.add(cart_item("Ajrakh Shirt", dec!(1799), 2));
    }

    let storage: Arc<dyn CartStorage> = Arc::new(JsonFileCartStorage::new(&path));
    let reloaded = store_with(storage);
    assert_eq!(reloaded.cart().items.len(), 1);
    assert_eq!(reloaded.subtotal(), dec!(3598));
    assert_eq!(reloaded.total(), dec!(3598));
}

#[test]
fn test_corrupt_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cart.json");
    std::fs::write(&path, "{\"items\": [broken").unwrap();

    let storage: Arc<dyn CartStorage> = Arc::new(JsonFileCartStorage::new(&path));
    let store = store_with(storage);
    assert!(store.is_empty());
}
