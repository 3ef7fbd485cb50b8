//! Razorpay client.
//!
//! Only two operations are needed: creating a gateway order for a checkout
//! and verifying the signature the checkout widget returns. Verification is
//! local (HMAC-SHA256 over `order_id|payment_id` with the key secret).

use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::RazorpayConfig;

/// Outbound request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Currency for every gateway order.
pub const CURRENCY: &str = "INR";

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("gateway error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Order amount cannot be expressed in paise.
    #[error("invalid amount")]
    InvalidAmount,

    /// Endpoint URL could not be built.
    #[error("invalid gateway URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A gateway order as returned by Razorpay.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Razorpay REST client.
#[derive(Clone)]
pub struct RazorpayClient {
    client: reqwest::Client,
    key_id: String,
    key_secret: SecretString,
    api_base: Url,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("key_id", &self.key_id)
            .field("api_base", &self.api_base.as_str())
            .finish_non_exhaustive()
    }
}

impl RazorpayClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &RazorpayConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            api_base: config.api_base.clone(),
        })
    }

    /// Public key id, handed to the checkout widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create a gateway order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if the gateway rejects the request.
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        amount_paise: i64,
        receipt: &str,
    ) -> Result<GatewayOrder, PaymentError> {
        if amount_paise <= 0 {
            return Err(PaymentError::InvalidAmount);
        }

        let url = self.endpoint("orders")?;
        let response = self
            .client
            .post(url)
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&CreateOrderRequest {
                amount: amount_paise,
                currency: CURRENCY,
                receipt,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Razorpay order creation failed");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Check a checkout signature.
    #[must_use]
    pub fn verify_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> bool {
        expected_signature(
            self.key_secret.expose_secret(),
            gateway_order_id,
            gateway_payment_id,
        )
        .is_some_and(|expected| constant_time_compare(&expected, signature))
    }

    fn endpoint(&self, path: &str) -> Result<Url, PaymentError> {
        let base = self.api_base.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

/// Hex HMAC-SHA256 of `order_id|payment_id`.
///
/// Returns `None` only if the key is rejected by the MAC, which cannot
/// happen for HMAC.
#[must_use]
pub fn expected_signature(
    key_secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key_secret.as_bytes()).ok()?;
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> RazorpayClient {
        RazorpayClient::new(&RazorpayConfig {
            key_id: "rzp_test_123".to_string(),
            key_secret: SecretString::from("test-key-secret".to_string()),
            api_base: Url::parse("https://api.razorpay.com/v1").unwrap(),
        })
        .unwrap()
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_signature_matches_manual_hmac() {
        let mut mac = Hmac::<Sha256>::new_from_slice(b"test-key-secret").unwrap();
        mac.update(b"order_ABC|pay_XYZ");
        let manual = hex::encode(mac.finalize().into_bytes());

        assert_eq!(
            expected_signature("test-key-secret", "order_ABC", "pay_XYZ").unwrap(),
            manual
        );
    }

    #[test]
    fn test_verify_signature() {
        let client = client();
        let good = expected_signature("test-key-secret", "order_ABC", "pay_XYZ").unwrap();

        assert!(client.verify_signature("order_ABC", "pay_XYZ", &good));
        assert!(!client.verify_signature("order_ABC", "pay_OTHER", &good));
        assert!(!client.verify_signature("order_ABC", "pay_XYZ", "deadbeef"));
    }

    #[test]
    fn test_endpoint_joins_path() {
        let client = client();
        assert_eq!(
            client.endpoint("orders").unwrap().as_str(),
            "https://api.razorpay.com/v1/orders"
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let debug = format!("{:?}", client());
        assert!(!debug.contains("test-key-secret"));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let result = client().create_order(0, "HH20261017000001").await;
        assert!(matches!(result, Err(PaymentError::InvalidAmount)));
    }
}
