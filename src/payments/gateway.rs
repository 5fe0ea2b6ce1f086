use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use crate::backend::GatewayBackend;
use crate::errors::CheckoutError;
use crate::events::{Event, EventSender};
use crate::models::{
    GatewayOrderRequest, GatewayVerification, Order, PaymentMethod,
};

use super::{PaymentAdapter, PaymentOutcome};

/// What the hosted payment UI reported back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayUiResult {
    /// The gateway collected payment and signed the callback.
    Completed {
        gateway_payment_id: String,
        signature: String,
    },
    /// The buyer closed the hosted UI without paying.
    Dismissed,
    Failed(String),
}

/// Everything the hosted UI needs to open a payment for one order.
#[derive(Clone, Debug)]
pub struct GatewayCheckout {
    pub key_id: String,
    pub gateway_order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub order_number: String,
}

/// The embedded hosted-payment surface. Implemented by the storefront shell
/// (webview, SDK binding); faked in tests.
#[async_trait]
pub trait HostedGatewayUi: Send + Sync {
    /// Loads the gateway script/SDK. Called lazily, once per process.
    async fn load(&self) -> Result<(), CheckoutError>;

    /// Opens the hosted UI and resolves with the buyer's result.
    async fn open(&self, checkout: &GatewayCheckout) -> GatewayUiResult;
}

/// Hosted-gateway payment flow: mint a signed order token, hand it to the
/// hosted UI, relay the signed callback to the verification endpoint.
pub struct GatewayAdapter {
    backend: Arc<dyn GatewayBackend>,
    ui: Arc<dyn HostedGatewayUi>,
    key_id: String,
    currency: String,
    events: EventSender,
    ui_loaded: OnceCell<()>,
}

impl GatewayAdapter {
    pub fn new(
        backend: Arc<dyn GatewayBackend>,
        ui: Arc<dyn HostedGatewayUi>,
        key_id: String,
        currency: String,
        events: EventSender,
    ) -> Self {
        Self {
            backend,
            ui,
            key_id,
            currency,
            events,
            ui_loaded: OnceCell::new(),
        }
    }

    async fn ensure_ui_loaded(&self) -> Result<(), CheckoutError> {
        self.ui_loaded
            .get_or_try_init(|| self.ui.load())
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PaymentAdapter for GatewayAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Gateway
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn pay(&self, order: &Order) -> PaymentOutcome {
        if let Err(e) = self.ensure_ui_loaded().await {
            warn!("Hosted gateway UI failed to load: {}", e);
            return PaymentOutcome::Failed {
                reason: "The payment window could not be loaded. Please try again.".to_string(),
            };
        }

        let gateway_order = match self
            .backend
            .create_gateway_order(&GatewayOrderRequest {
                amount: order.total,
                currency: self.currency.clone(),
                receipt: order.order_number.clone(),
                notes: json!({ "order_id": order.id }),
            })
            .await
        {
            Ok(o) => o,
            Err(e) => {
                warn!("Gateway order creation failed: {}", e);
                return PaymentOutcome::Failed {
                    reason: "Could not start the payment. Please try again.".to_string(),
                };
            }
        };

        let checkout = GatewayCheckout {
            key_id: self.key_id.clone(),
            gateway_order_id: gateway_order.gateway_order_id.clone(),
            amount: gateway_order.amount,
            currency: gateway_order.currency.clone(),
            order_number: order.order_number.clone(),
        };

        match self.ui.open(&checkout).await {
            GatewayUiResult::Completed {
                gateway_payment_id,
                signature,
            } => {
                let verification = GatewayVerification {
                    gateway_order_id: gateway_order.gateway_order_id,
                    gateway_payment_id,
                    signature,
                    order_id: order.id,
                };
                match self.backend.verify_gateway_payment(&verification).await {
                    Ok(true) => {
                        info!("Gateway payment verified for order {}", order.order_number);
                        self.events
                            .send_or_log(Event::PaymentConfirmed { order_id: order.id })
                            .await;
                        PaymentOutcome::Success
                    }
                    Ok(false) => {
                        self.events
                            .send_or_log(Event::PaymentFailed {
                                order_id: order.id,
                                reason: "signature verification rejected".to_string(),
                            })
                            .await;
                        PaymentOutcome::Failed {
                            reason: "Payment verification failed.".to_string(),
                        }
                    }
                    Err(e) => {
                        warn!("Gateway verification call failed: {}", e);
                        PaymentOutcome::Failed {
                            reason: "We could not verify the payment. Please try again."
                                .to_string(),
                        }
                    }
                }
            }
            // An explicit close is a distinct outcome, not an error — the
            // caller lets the buyer retry without alarming messaging.
            GatewayUiResult::Dismissed => {
                self.events
                    .send_or_log(Event::PaymentCancelled { order_id: order.id })
                    .await;
                PaymentOutcome::Cancelled
            }
            GatewayUiResult::Failed(reason) => {
                warn!("Hosted gateway UI failed: {}", reason);
                PaymentOutcome::Failed {
                    reason: "The payment could not be completed.".to_string(),
                }
            }
        }
    }
}
