//! Vastra Checkout Library
//!
//! Checkout and payment orchestration for the Vastra garment storefront:
//! cart pricing with coupon discounts, the two-step checkout wizard, and the
//! three payment adapters (hosted gateway, direct transfer/UPI with its
//! time-bounded session state machine, and pay-on-delivery).
//!
//! The storefront UI is a thin caller of this crate; the hosted commerce
//! backend sits behind per-entity repository traits in [`backend`].
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod backend;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod coupons;
pub mod errors;
pub mod events;
pub mod models;
pub mod notifications;
pub mod orders;
pub mod payments;

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use backend::HttpBackend;
use cart::{CartStore, JsonFileCartStorage};
use checkout::CheckoutOrchestrator;
use config::CheckoutConfig;
use coupons::CouponValidator;
use errors::CheckoutError;
use events::{Event, EventSender};
use notifications::{LogDispatcher, NotificationDispatcher, WebhookDispatcher};
use orders::OrderWriter;
use payments::{
    CodAdapter, DirectTransferAdapter, GatewayAdapter, HostedGatewayUi, PaymentAdapters,
    SessionTiming,
};

/// The wired-up checkout subsystem: one of these is built at startup and
/// shared with the storefront UI.
#[derive(Clone)]
pub struct CheckoutServices {
    pub config: CheckoutConfig,
    pub events: EventSender,
    pub cart: Arc<Mutex<CartStore>>,
    pub coupon_validator: CouponValidator,
    pub order_writer: OrderWriter,
    pub adapters: PaymentAdapters,
}

impl CheckoutServices {
    /// Assembles the subsystem against the configured hosted backend. The
    /// hosted-gateway UI surface is provided by the embedding shell. Returns
    /// the event receiver for the presentation layer to drain.
    pub fn from_config(
        config: CheckoutConfig,
        gateway_ui: Arc<dyn HostedGatewayUi>,
    ) -> Result<(Self, mpsc::Receiver<Event>), CheckoutError> {
        let (events, event_rx) = EventSender::channel(config.event_channel_capacity);
        let backend = Arc::new(HttpBackend::new(&config.backend)?);

        let storage = Arc::new(JsonFileCartStorage::new(&config.cart_storage_path));
        let cart = Arc::new(Mutex::new(CartStore::load(
            config.pricing.clone(),
            storage,
            events.clone(),
        )));

        let notifier: Arc<dyn NotificationDispatcher> = match &config.notifications.webhook_url {
            Some(url) => Arc::new(WebhookDispatcher::new(url)),
            None => Arc::new(LogDispatcher),
        };

        let coupon_validator = CouponValidator::new(backend.clone());
        let order_writer = OrderWriter::new(
            backend.clone(),
            notifier,
            events.clone(),
            config.pricing.currency.clone(),
        );
        let adapters = PaymentAdapters::new(
            Arc::new(GatewayAdapter::new(
                backend.clone(),
                gateway_ui,
                config.gateway.key_id.clone(),
                config.pricing.currency.clone(),
                events.clone(),
            )),
            Arc::new(DirectTransferAdapter::new(
                backend.clone(),
                backend,
                SessionTiming::from_config(&config.direct_transfer),
                events.clone(),
            )),
            Arc::new(CodAdapter::new()),
        );

        Ok((
            Self {
                config,
                events,
                cart,
                coupon_validator,
                order_writer,
                adapters,
            },
            event_rx,
        ))
    }

    /// Starts a checkout attempt over the current cart.
    pub async fn begin_checkout(&self) -> Result<CheckoutOrchestrator, CheckoutError> {
        CheckoutOrchestrator::begin(
            self.cart.clone(),
            self.order_writer.clone(),
            self.adapters.clone(),
            self.coupon_validator.clone(),
            self.events.clone(),
        )
        .await
    }
}
