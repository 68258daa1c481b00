//! Payment-intent client for a Stripe-style provider.
//!
//! The provider takes amounts in integer minor units (pence), so the
//! basket's Decimal total goes through [`to_minor_units`] before the
//! outbound call. The API credential is injected via configuration.

use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Provider base URL, e.g. `https://api.stripe.com`. Overridable so
    /// tests and staging can point at a compatible mock.
    pub api_base: String,
    pub secret_key: String,
    pub currency: String,
}

#[derive(Clone)]
pub struct PaymentClient {
    config: PaymentConfig,
    http: Client,
}

impl PaymentClient {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    /// Creates a payment intent for `amount_minor` and returns the
    /// provider's intent, including the client-side secret the page
    /// consumes.
    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        user_id: i32,
    ) -> Result<PaymentIntent, PaymentError> {
        if amount_minor <= 0 {
            return Err(PaymentError::AmountOutOfRange(amount_minor));
        }

        let url = format!("{}/v1/payment_intents", self.config.api_base);
        let params = [
            ("amount", amount_minor.to_string()),
            ("currency", self.config.currency.clone()),
            ("metadata[userid]", user_id.to_string()),
        ];

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .json::<ProviderErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "no error detail".to_string());
            return Err(PaymentError::Provider { status, message });
        }

        Ok(response.json::<PaymentIntent>().await?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("payment provider rejected the request (status {status}): {message}")]
    Provider { status: u16, message: String },
    #[error("amount {0} is outside the provider's accepted range")]
    AmountOutOfRange(i64),
    #[error("total {0} cannot be represented in minor units")]
    UnrepresentableAmount(Decimal),
}

/// Converts a major-unit Decimal total into the provider's integer
/// minor units: ×100, rounded half away from zero. Prices carry two
/// decimal places so the rounding only guards odd data.
pub fn to_minor_units(total: Decimal) -> Result<i64, PaymentError> {
    let scaled = total
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(PaymentError::UnrepresentableAmount(total))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    scaled
        .to_i64()
        .ok_or(PaymentError::UnrepresentableAmount(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn two_decimal_totals_convert_exactly() {
        assert_eq!(to_minor_units(dec!(21.00)).unwrap(), 2100);
        assert_eq!(to_minor_units(dec!(10.99)).unwrap(), 1099);
        assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
    }

    #[test]
    fn short_fraction_totals_do_not_lose_a_digit() {
        // A total of exactly 10.0 must become 1000, not 100.
        assert_eq!(to_minor_units(dec!(10.0)).unwrap(), 1000);
        assert_eq!(to_minor_units(dec!(10)).unwrap(), 1000);
    }

    #[test]
    fn zero_total_converts_to_zero() {
        assert_eq!(to_minor_units(Decimal::ZERO).unwrap(), 0);
    }

    #[test]
    fn sub_minor_fractions_round_half_away_from_zero() {
        assert_eq!(to_minor_units(dec!(10.505)).unwrap(), 1051);
        assert_eq!(to_minor_units(dec!(10.504)).unwrap(), 1050);
    }

    #[test]
    fn oversized_totals_are_rejected() {
        assert!(matches!(
            to_minor_units(Decimal::MAX),
            Err(PaymentError::UnrepresentableAmount(_))
        ));
    }

    #[test]
    fn provider_error_body_parses() {
        let body: ProviderErrorBody = serde_json::from_str(
            r#"{"error": {"type": "invalid_request_error", "message": "Amount must be at least 30 pence"}}"#,
        )
        .unwrap();
        assert_eq!(
            body.error.message.as_deref(),
            Some("Amount must be at least 30 pence")
        );
    }

    #[test]
    fn intent_body_parses() {
        let intent: PaymentIntent = serde_json::from_str(
            r#"{"id": "pi_123", "client_secret": "pi_123_secret_abc", "amount": 2100, "currency": "gbp", "status": "requires_payment_method"}"#,
        )
        .unwrap();
        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.client_secret, "pi_123_secret_abc");
        assert_eq!(intent.amount, 2100);
    }
}
