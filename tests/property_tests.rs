//! Property-based tests for cart pricing invariants.
//!
//! For any sequence of add/remove/quantity-update/clear operations:
//! - `total == subtotal + shipping - discount` and `total >= 0`
//! - shipping follows the strict free-shipping threshold
//! - the floored percentage discount never exceeds the subtotal

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use vastra_checkout::cart::{CartStore, InMemoryCartStorage};
use vastra_checkout::config::PricingConfig;
use vastra_checkout::events::EventSender;
use vastra_checkout::models::{AppliedCoupon, Cart, CartItem};

#[derive(Clone, Debug)]
enum CartOp {
    Add { slot: usize, price_paise: u32, quantity: u32 },
    Remove { slot: usize },
    SetQuantity { slot: usize, quantity: u32 },
    Clear,
}

fn cart_op() -> impl Strategy<Value = CartOp> {
    prop_oneof![
        (0..8usize, 100..2_000_000u32, 1..5u32)
            .prop_map(|(slot, price_paise, quantity)| CartOp::Add {
                slot,
                price_paise,
                quantity
            }),
        (0..8usize).prop_map(|slot| CartOp::Remove { slot }),
        (0..8usize, 0..6u32)
            .prop_map(|(slot, quantity)| CartOp::SetQuantity { slot, quantity }),
        Just(CartOp::Clear),
    ]
}

fn item_for(slot: &Uuid, price_paise: u32, quantity: u32) -> CartItem {
    CartItem {
        product_id: *slot,
        name: "Printed Kurta".to_string(),
        image_url: None,
        size: None,
        color: None,
        unit_price: Decimal::new(i64::from(price_paise), 2),
        quantity,
    }
}

fn check_invariants(cart: &Cart, pricing: &PricingConfig) {
    assert_eq!(
        cart.total,
        cart.subtotal + cart.shipping_total - cart.discount_total
    );
    assert!(cart.total >= Decimal::ZERO);
    assert!(cart.discount_total <= cart.subtotal);

    let expected_shipping = if cart.subtotal > pricing.free_shipping_threshold {
        Decimal::ZERO
    } else if cart.subtotal > Decimal::ZERO {
        pricing.flat_shipping_fee
    } else {
        Decimal::ZERO
    };
    assert_eq!(cart.shipping_total, expected_shipping);

    let expected_subtotal: Decimal = cart.items.iter().map(|i| i.line_total()).sum();
    assert_eq!(cart.subtotal, expected_subtotal);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn cart_invariants_hold_under_any_mutation_sequence(ops in prop::collection::vec(cart_op(), 1..40)) {
        let pricing = PricingConfig::default();
        let (events, _rx) = EventSender::channel(4096);
        let mut store = CartStore::load(
            pricing.clone(),
            Arc::new(InMemoryCartStorage::new()),
            events,
        );
        let slots: Vec<Uuid> = (0..8).map(|_| Uuid::new_v4()).collect();

        for op in ops {
            match op {
                CartOp::Add { slot, price_paise, quantity } => {
                    store.add(item_for(&slots[slot], price_paise, quantity));
                }
                CartOp::Remove { slot } => store.remove(slots[slot]),
                CartOp::SetQuantity { slot, quantity } => {
                    store.set_quantity(slots[slot], quantity)
                }
                CartOp::Clear => store.clear(),
            }
            check_invariants(store.cart(), &pricing);
        }
    }

    #[test]
    fn discount_is_floored_percentage(
        price_paise in 100..5_000_000u32,
        quantity in 1..4u32,
        percent in 1..=100u32,
    ) {
        let pricing = PricingConfig::default();
        let mut cart = Cart {
            items: vec![item_for(&Uuid::new_v4(), price_paise, quantity)],
            coupon: Some(AppliedCoupon {
                code: "PROP".to_string(),
                discount_percent: percent,
                min_order_amount: Decimal::ZERO,
            }),
            ..Cart::default()
        };
        cart.recalculate(&pricing);

        let expected =
            (Decimal::from(percent) * cart.subtotal / Decimal::from(100)).floor();
        prop_assert_eq!(cart.discount_total, expected);
        prop_assert!(cart.total >= Decimal::ZERO);
        check_invariants(&cart, &pricing);
    }
}
