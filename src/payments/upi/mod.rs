use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{error, instrument};

use crate::backend::{DirectTransferBackend, OrderRepository};
use crate::events::EventSender;
use crate::models::{Order, PaymentMethod};

use super::{PaymentAdapter, PaymentOutcome};

pub mod session;
pub mod uri;

use session::{PaymentSession, SessionHandle, SessionTiming};

/// Direct bank-to-bank transfer (UPI). Owns the payment session state
/// machine; `pay` drives one session to its terminal outcome while the UI
/// follows along through [`DirectTransferAdapter::active_session`].
pub struct DirectTransferAdapter {
    backend: Arc<dyn DirectTransferBackend>,
    orders: Arc<dyn OrderRepository>,
    timing: SessionTiming,
    events: EventSender,
    active: Mutex<Option<SessionHandle>>,
}

impl DirectTransferAdapter {
    pub fn new(
        backend: Arc<dyn DirectTransferBackend>,
        orders: Arc<dyn OrderRepository>,
        timing: SessionTiming,
        events: EventSender,
    ) -> Self {
        Self {
            backend,
            orders,
            timing,
            events,
            active: Mutex::new(None),
        }
    }

    /// Handle to the session currently in flight, if any. The UI uses it to
    /// render the QR code and countdown and to send manual-confirm /
    /// regenerate actions.
    pub fn active_session(&self) -> Option<SessionHandle> {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_active(&self, handle: Option<SessionHandle>) {
        *self.active.lock().unwrap_or_else(|e| e.into_inner()) = handle;
    }
}

#[async_trait]
impl PaymentAdapter for DirectTransferAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::DirectTransfer
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn pay(&self, order: &Order) -> PaymentOutcome {
        let session = PaymentSession::new(
            order.id,
            order.total,
            self.backend.clone(),
            self.orders.clone(),
            self.timing,
            self.events.clone(),
        );
        let (handle, join) = session.spawn();
        self.set_active(Some(handle));

        let outcome = match join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Payment session task ended abnormally: {}", e);
                PaymentOutcome::Failed {
                    reason: "The payment session ended unexpectedly.".to_string(),
                }
            }
        };

        // The session is terminal; its artifacts are discarded.
        self.set_active(None);
        outcome
    }
}
