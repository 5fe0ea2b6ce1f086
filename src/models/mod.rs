pub mod cart;
pub mod coupon;
pub mod order;
pub mod payment;

pub use cart::{AppliedCoupon, Cart, CartItem};
pub use coupon::Coupon;
pub use order::{
    FulfillmentStatus, Order, OrderItem, PaymentMethod, PaymentStatus, ShippingDetails,
};
pub use payment::{
    DeepLinks, DirectTransferSession, GatewayOrder, GatewayOrderRequest, GatewayVerification,
    USER_CONFIRMED_REF,
};
