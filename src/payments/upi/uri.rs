//! Payment URI construction for direct bank-to-bank transfers.
//!
//! The generic form is `upi://pay?pa=…&pn=…&am=…&tn=…&cu=…`; the per-app
//! variants use each app's own scheme with the same query parameters.

use rust_decimal::Decimal;
use url::Url;

use crate::models::DeepLinks;

const GENERIC_SCHEME: &str = "upi://pay";
const GPAY_SCHEME: &str = "tez://upi/pay";
const PHONEPE_SCHEME: &str = "phonepe://pay";
const PAYTM_SCHEME: &str = "paytmmp://pay";

/// Parameters shared by the generic URI and every deep link.
#[derive(Clone, Debug)]
pub struct PaymentUriParams<'a> {
    pub payee_vpa: &'a str,
    pub payee_name: &'a str,
    pub amount: Decimal,
    /// Transaction note, derived from the order id.
    pub note: &'a str,
    pub currency: &'a str,
}

fn with_params(scheme: &str, params: &PaymentUriParams<'_>) -> String {
    // The schemes above are static and well-formed; parse cannot fail.
    let mut url = Url::parse(scheme).unwrap_or_else(|_| unreachable!("static scheme"));
    url.query_pairs_mut()
        .append_pair("pa", params.payee_vpa)
        .append_pair("pn", params.payee_name)
        .append_pair("am", &format!("{:.2}", params.amount.round_dp(2)))
        .append_pair("tn", params.note)
        .append_pair("cu", params.currency);
    url.to_string()
}

/// Builds the generic `upi://pay` URI.
pub fn payment_uri(params: &PaymentUriParams<'_>) -> String {
    with_params(GENERIC_SCHEME, params)
}

/// Builds the per-app deep links alongside the generic URI.
pub fn deep_links(params: &PaymentUriParams<'_>) -> DeepLinks {
    DeepLinks {
        gpay: with_params(GPAY_SCHEME, params),
        phonepe: with_params(PHONEPE_SCHEME, params),
        paytm: with_params(PAYTM_SCHEME, params),
        generic: payment_uri(params),
    }
}
