use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::backend::CouponRepository;
use crate::errors::CheckoutError;
use crate::models::AppliedCoupon;

/// Why a coupon code was refused. The variants are evaluated in order; the
/// first matching rule wins.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum CouponRejection {
    #[error("This coupon code is not valid")]
    InvalidCode,

    #[error("This coupon has expired")]
    Expired,

    #[error("Add ₹{shortfall} more to use this coupon (minimum order ₹{minimum})")]
    MinimumNotMet {
        minimum: Decimal,
        shortfall: Decimal,
    },
}

/// A successfully validated coupon, plus a confirmation message for the UI.
/// Persisting the discount onto the cart is the caller's responsibility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CouponApproval {
    pub coupon: AppliedCoupon,
    pub message: String,
}

/// Validates coupon codes against the hosted coupon records.
#[derive(Clone)]
pub struct CouponValidator {
    repo: Arc<dyn CouponRepository>,
}

impl CouponValidator {
    pub fn new(repo: Arc<dyn CouponRepository>) -> Self {
        Self { repo }
    }

    /// Validates `code` against the current subtotal.
    ///
    /// The code is trimmed and upper-cased before lookup. Rejection rules,
    /// first match wins: unknown or inactive code, expired, subtotal below
    /// the coupon's minimum (the message carries the shortfall).
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        code: &str,
        subtotal: Decimal,
    ) -> Result<CouponApproval, CheckoutError> {
        let normalized = code.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(CouponRejection::InvalidCode.into());
        }

        let coupon = match self.repo.find_by_code(&normalized).await? {
            Some(coupon) if coupon.is_active => coupon,
            _ => {
                debug!("Coupon {} not found or inactive", normalized);
                return Err(CouponRejection::InvalidCode.into());
            }
        };

        if coupon.is_expired_at(Utc::now()) {
            warn!("Coupon {} has expired", normalized);
            return Err(CouponRejection::Expired.into());
        }

        if subtotal < coupon.min_order_amount {
            return Err(CouponRejection::MinimumNotMet {
                minimum: coupon.min_order_amount,
                shortfall: coupon.min_order_amount - subtotal,
            }
            .into());
        }

        let message = format!(
            "Coupon {} applied: {}% off",
            coupon.code, coupon.discount_percent
        );
        Ok(CouponApproval {
            coupon: AppliedCoupon {
                code: coupon.code,
                discount_percent: coupon.discount_percent,
                min_order_amount: coupon.min_order_amount,
            },
            message,
        })
    }
}
