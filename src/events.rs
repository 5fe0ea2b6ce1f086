use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Events emitted by the cart store, the orchestrator, and the payment
/// adapters. The presentation layer decides how to surface them (toast,
/// banner, navigation) — the core never touches the UI directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartItemAdded {
        product_id: Uuid,
        quantity: u32,
    },
    CartItemRemoved {
        product_id: Uuid,
    },
    CartQuantityChanged {
        product_id: Uuid,
        quantity: u32,
    },
    CartCleared,
    CouponApplied {
        code: String,
        discount_percent: u32,
    },
    CouponRemoved {
        code: String,
        reason: String,
    },

    // Checkout events
    CheckoutStarted {
        cart_total: Decimal,
    },
    OrderCreated(Uuid),
    CheckoutCompleted {
        order_id: Uuid,
    },

    // Payment events
    PaymentSessionStarted {
        order_id: Uuid,
    },
    PaymentSessionExpired {
        order_id: Uuid,
    },
    PaymentConfirmed {
        order_id: Uuid,
    },
    PaymentFailed {
        order_id: Uuid,
        reason: String,
    },
    PaymentCancelled {
        order_id: Uuid,
    },
}

/// Cloneable handle for publishing [`Event`]s onto the subsystem's channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a bounded event channel and the sender half wrapped for the
    /// subsystem. The receiver is handed to the presentation layer (or to
    /// [`process_events`]).
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of propagating a channel failure.
    /// Event delivery must never fail a business operation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }

    /// Non-blocking emit for synchronous call sites (cart mutations).
    /// A full or closed channel drops the event with a warning.
    pub fn emit(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Event dropped: {}", e);
        }
    }
}

// Handlers implementing this trait process events asynchronously.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: Event) -> Result<(), String>;
}

/// Drains the event channel, logging each event. A storefront embeds its own
/// loop; this one is the default used by tests and headless callers.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PaymentFailed { order_id, reason } => {
                warn!("Payment failed for order {}: {}", order_id, reason);
            }
            Event::PaymentSessionExpired { order_id } => {
                warn!("Payment session expired for order {}", order_id);
            }
            other => debug!("Event: {:?}", other),
        }
    }

    warn!("Event processing loop has ended");
}
