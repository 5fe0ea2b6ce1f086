use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{Order, PaymentMethod};

pub mod cod;
pub mod gateway;
pub mod upi;

pub use cod::CodAdapter;
pub use gateway::{GatewayAdapter, GatewayCheckout, GatewayUiResult, HostedGatewayUi};
pub use upi::session::{
    PaymentSession, SessionCommand, SessionHandle, SessionSnapshot, SessionState, SessionTiming,
};
pub use upi::DirectTransferAdapter;

/// Terminal result of one payment attempt, as reported to the checkout
/// orchestrator. Adapters normalize every outcome to one of these; the
/// orchestrator alone decides navigation and cart clearing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success,
    /// The buyer backed out (dismissed the hosted UI, abandoned the
    /// session). Not an error; the cart is preserved for a retry.
    Cancelled,
    Failed {
        reason: String,
    },
}

impl PaymentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PaymentOutcome::Success)
    }
}

/// One payment strategy. Implementations must be idempotence-safe: invoking
/// the terminal side effects (events, status updates) at most once per
/// attempt.
#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    fn method(&self) -> PaymentMethod;

    /// Runs the payment flow for an already-created order to a terminal
    /// outcome. Never panics the checkout: all failures are folded into
    /// [`PaymentOutcome::Failed`].
    async fn pay(&self, order: &Order) -> PaymentOutcome;
}

/// The three configured adapters, selected by method at order placement.
#[derive(Clone)]
pub struct PaymentAdapters {
    gateway: Arc<GatewayAdapter>,
    direct_transfer: Arc<DirectTransferAdapter>,
    cod: Arc<CodAdapter>,
}

impl PaymentAdapters {
    pub fn new(
        gateway: Arc<GatewayAdapter>,
        direct_transfer: Arc<DirectTransferAdapter>,
        cod: Arc<CodAdapter>,
    ) -> Self {
        Self {
            gateway,
            direct_transfer,
            cod,
        }
    }

    pub fn for_method(&self, method: PaymentMethod) -> Arc<dyn PaymentAdapter> {
        match method {
            PaymentMethod::Gateway => self.gateway.clone(),
            PaymentMethod::DirectTransfer => self.direct_transfer.clone(),
            PaymentMethod::CashOnDelivery => self.cod.clone(),
        }
    }

    /// Direct access for the UI layer, which renders the live payment
    /// session (QR code, countdown, deep links).
    pub fn direct_transfer(&self) -> &Arc<DirectTransferAdapter> {
        &self.direct_transfer
    }
}
