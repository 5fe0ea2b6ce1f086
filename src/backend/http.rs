use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::errors::CheckoutError;
use crate::models::{
    Coupon, DirectTransferSession, GatewayOrder, GatewayOrderRequest, GatewayVerification, Order,
};

use super::{CouponRepository, DirectTransferBackend, GatewayBackend, OrderRepository};

/// JSON client for the hosted commerce backend. One instance implements all
/// four repository traits.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
struct CreateSessionRequest {
    order_id: Uuid,
    amount: Decimal,
}

#[derive(Serialize)]
struct VerifyPaymentRequest<'a> {
    order_id: Uuid,
    transaction_ref: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    success: bool,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, CheckoutError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| CheckoutError::InternalError(format!("Invalid backend URL: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CheckoutError> {
        self.base_url
            .join(path)
            .map_err(|e| CheckoutError::InternalError(format!("Invalid endpoint path: {}", e)))
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, CheckoutError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(CheckoutError::ExternalServiceError(format!(
                "Backend returned {} for {}",
                response.status(),
                response.url().path()
            )))
        }
    }
}

#[async_trait]
impl CouponRepository for HttpBackend {
    #[instrument(skip(self))]
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, CheckoutError> {
        let url = self.endpoint(&format!("v1/coupons/{}", code))?;
        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::expect_success(response).await?;
        Ok(Some(response.json::<Coupon>().await?))
    }
}

#[async_trait]
impl OrderRepository for HttpBackend {
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn create_order(&self, order: &Order) -> Result<(), CheckoutError> {
        let url = self.endpoint("v1/orders")?;
        let response = self.client.post(url).json(order).send().await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_order(&self, order_id: Uuid) -> Result<Order, CheckoutError> {
        let url = self.endpoint(&format!("v1/orders/{}", order_id))?;
        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CheckoutError::NotFound(format!(
                "Order {} not found",
                order_id
            )));
        }
        let response = Self::expect_success(response).await?;
        Ok(response.json::<Order>().await?)
    }
}

#[async_trait]
impl DirectTransferBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn create_session(
        &self,
        order_id: Uuid,
        amount: Decimal,
    ) -> Result<DirectTransferSession, CheckoutError> {
        let url = self.endpoint("v1/payments/direct-transfer/session")?;
        let response = self
            .client
            .post(url)
            .json(&CreateSessionRequest { order_id, amount })
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json::<DirectTransferSession>().await?)
    }

    #[instrument(skip(self))]
    async fn verify_payment(
        &self,
        order_id: Uuid,
        transaction_ref: &str,
    ) -> Result<bool, CheckoutError> {
        let url = self.endpoint("v1/payments/direct-transfer/verify")?;
        let response = self
            .client
            .post(url)
            .json(&VerifyPaymentRequest {
                order_id,
                transaction_ref,
            })
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json::<VerifyResponse>().await?.success)
    }
}

#[async_trait]
impl GatewayBackend for HttpBackend {
    #[instrument(skip(self, request))]
    async fn create_gateway_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, CheckoutError> {
        let url = self.endpoint("v1/payments/gateway/order")?;
        let response = self.client.post(url).json(request).send().await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json::<GatewayOrder>().await?)
    }

    #[instrument(skip(self, verification), fields(order_id = %verification.order_id))]
    async fn verify_gateway_payment(
        &self,
        verification: &GatewayVerification,
    ) -> Result<bool, CheckoutError> {
        let url = self.endpoint("v1/payments/gateway/verify")?;
        let response = self.client.post(url).json(verification).send().await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json::<VerifyResponse>().await?.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_relative_paths() {
        let backend = HttpBackend::new(&BackendConfig {
            base_url: "https://backend.vastra.shop/".to_string(),
            timeout_secs: 5,
        })
        .expect("client should build");

        let url = backend.endpoint("v1/orders").unwrap();
        assert_eq!(url.as_str(), "https://backend.vastra.shop/v1/orders");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = HttpBackend::new(&BackendConfig {
            base_url: "not a url".to_string(),
            timeout_secs: 5,
        });
        assert!(result.is_err());
    }
}
