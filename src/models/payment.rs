use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction reference sent to the verification endpoint when the buyer
/// confirms manually without supplying one.
pub const USER_CONFIRMED_REF: &str = "USER_CONFIRMED";

/// Per-app deep links for the direct-transfer payment URI. Each variant uses
/// the app's own URI scheme with the same query parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLinks {
    pub gpay: String,
    pub phonepe: String,
    pub paytm: String,
    pub generic: String,
}

/// Artifacts of one direct-transfer payment attempt, as returned by the
/// backend's session endpoint. Ephemeral; discarded when the session reaches
/// a terminal state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectTransferSession {
    pub order_id: Uuid,
    pub amount: Decimal,
    /// Generic `upi://pay` URI.
    pub payment_uri: String,
    /// Scannable-code image (data URI or hosted image URL).
    pub qr_image: String,
    pub deep_links: DeepLinks,
    pub payee_vpa: String,
}

/// Request for a signed hosted-gateway order token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayOrderRequest {
    pub amount: Decimal,
    pub currency: String,
    pub receipt: String,
    pub notes: serde_json::Value,
}

/// Signed order token minted by the backend for the hosted payment UI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub gateway_order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub key_id: String,
}

/// Callback payload relayed to the gateway verification endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayVerification {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
    pub order_id: Uuid,
}
