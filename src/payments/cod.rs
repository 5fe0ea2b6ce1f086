use async_trait::async_trait;
use tracing::{info, instrument};

use crate::models::{Order, PaymentMethod};

use super::{PaymentAdapter, PaymentOutcome};

/// Pay-on-delivery: no online step. The order stays payment-pending and the
/// attempt is immediately successful; collection happens at fulfillment.
#[derive(Default)]
pub struct CodAdapter;

impl CodAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentAdapter for CodAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::CashOnDelivery
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn pay(&self, order: &Order) -> PaymentOutcome {
        info!(
            "Order {} placed with pay-on-delivery ({} due at fulfillment)",
            order.order_number, order.total
        );
        PaymentOutcome::Success
    }
}
