//! Integration tests for coupon validation against the backend.
//!
//! Tests cover:
//! - The rejection taxonomy (unknown, inactive, expired, below minimum)
//! - Code normalization
//! - Replacement semantics (no stacking)

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::{cart_item, seeded_backend};
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

use vastra_checkout::backend::InMemoryBackend;
use vastra_checkout::cart::{CartStore, InMemoryCartStorage};
use vastra_checkout::config::PricingConfig;
use vastra_checkout::coupons::{CouponRejection, CouponValidator};
use vastra_checkout::errors::CheckoutError;
use vastra_checkout::events::EventSender;
use vastra_checkout::models::Coupon;

fn full_backend() -> Arc<InMemoryBackend> {
    let backend = seeded_backend();
    backend.insert_coupon(Coupon {
        id: Uuid::new_v4(),
        code: "FESTIVE10".to_string(),
        discount_percent: 10,
        min_order_amount: Decimal::ZERO,
        expires_at: Utc::now() - Duration::hours(1),
        is_active: true,
    });
    backend.insert_coupon(Coupon {
        id: Uuid::new_v4(),
        code: "RETIRED".to_string(),
        discount_percent: 25,
        min_order_amount: Decimal::ZERO,
        expires_at: Utc::now() + Duration::days(30),
        is_active: false,
    });
    backend
}

// ==================== Rejection Taxonomy ====================

#[rstest]
#[case::unknown("MYSTERY", CouponRejection::InvalidCode)]
#[case::inactive("RETIRED", CouponRejection::InvalidCode)]
#[case::expired("FESTIVE10", CouponRejection::Expired)]
#[tokio::test]
async fn test_rejection_reasons(#[case] code: &str, #[case] expected: CouponRejection) {
    let validator = CouponValidator::new(full_backend());
    let err = validator.validate(code, dec!(5000)).await.unwrap_err();
    assert_matches!(err, CheckoutError::Coupon(rejection) if rejection == expected);
}

#[tokio::test]
async fn test_below_minimum_includes_shortfall() {
    let validator = CouponValidator::new(full_backend());
    let err = validator.validate("SAVE20", dec!(640)).await.unwrap_err();
    assert_matches!(
        err,
        CheckoutError::Coupon(CouponRejection::MinimumNotMet { minimum, shortfall })
            if minimum == dec!(1000) && shortfall == dec!(360)
    );
}

// ==================== Normalization ====================

#[rstest]
#[case("save20")]
#[case("  SAVE20  ")]
#[case("Save20")]
#[tokio::test]
async fn test_code_normalization(#[case] raw: &str) {
    let validator = CouponValidator::new(full_backend());
    let approval = validator.validate(raw, dec!(5000)).await.unwrap();
    assert_eq!(approval.coupon.code, "SAVE20");
}

// ==================== No Stacking ====================

#[tokio::test]
async fn test_new_coupon_replaces_previous() {
    let backend = full_backend();
    backend.insert_coupon(Coupon {
        id: Uuid::new_v4(),
        code: "FLAT5".to_string(),
        discount_percent: 5,
        min_order_amount: Decimal::ZERO,
        expires_at: Utc::now() + Duration::days(30),
        is_active: true,
    });
    let validator = CouponValidator::new(backend);

    let (events, _rx) = EventSender::channel(64);
    let mut store = CartStore::load(
        PricingConfig::default(),
        Arc::new(InMemoryCartStorage::new()),
        events,
    );
    store.add(cart_item("Pashmina Shawl", dec!(8000), 1));

    store.apply_coupon(&validator, "SAVE20").await.unwrap();
    assert_eq!(store.cart().discount_total, dec!(1600));

    // Applying another code replaces, never stacks.
    store.apply_coupon(&validator, "FLAT5").await.unwrap();
    assert_eq!(store.cart().coupon.as_ref().unwrap().code, "FLAT5");
    assert_eq!(store.cart().discount_total, dec!(400));
}
