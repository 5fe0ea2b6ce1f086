use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// How the buyer chose to pay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum PaymentMethod {
    #[serde(rename = "gateway")]
    #[strum(serialize = "gateway")]
    Gateway,
    #[serde(rename = "direct-transfer")]
    #[strum(serialize = "direct-transfer")]
    DirectTransfer,
    #[serde(rename = "cod")]
    #[strum(serialize = "cod")]
    CashOnDelivery,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FulfillmentStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// Shipping contact collected by the checkout wizard (or chosen from a
/// pre-saved address). Validated locally; the shipping step never calls the
/// backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ShippingDetails {
    #[validate(length(min = 1, message = "Name is required"))]
    pub full_name: String,

    #[validate(length(min = 10, message = "A valid phone number is required"))]
    pub phone: String,

    #[validate(email(message = "A valid email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address_line1: String,

    pub address_line2: Option<String>,

    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,

    #[validate(length(min = 4, max = 10, message = "A valid postal code is required"))]
    pub postal_code: String,
}

/// One line of an order. Prices and display attributes are snapshotted from
/// the cart at order time, independent of later catalog changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// An order record in the hosted backend. Created once per checkout attempt;
/// payment and fulfillment statuses are mutated later by the payment adapters
/// or administrative action. Never deleted by the storefront.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub discount_percent: u32,
    pub discount_total: Decimal,
    pub shipping_total: Decimal,
    /// Final amount payable.
    pub total: Decimal,
    pub currency: String,
    pub shipping: ShippingDetails,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
