use async_trait::async_trait;
use serde::Deserialize;

use super::{CreatedPaymentIntent, GatewayError, NewPaymentIntent, PaymentGateway};

/// Stripe REST client. The secret key is supplied per call because it lives in
/// the settings store and may change at runtime.
pub struct StripeGateway {
    api_base: String,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(api_base: String) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        secret_key: &str,
        request: &NewPaymentIntent,
    ) -> Result<CreatedPaymentIntent, GatewayError> {
        let url = format!("{}/v1/payment_intents", self.api_base);
        let amount = request.amount_minor.to_string();

        let form = [
            ("amount", amount.as_str()),
            ("currency", request.currency.as_str()),
            ("description", request.description.as_str()),
            ("automatic_payment_methods[enabled]", "true"),
            ("metadata[booking_id]", request.booking_id.as_str()),
            ("metadata[customer_email]", request.customer_email.as_str()),
            ("metadata[customer_name]", request.customer_name.as_str()),
        ];

        let mut builder = self.client.post(&url).bearer_auth(secret_key).form(&form);
        if let Some(key) = &request.idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| format!("Stripe API error ({status})"));
            return Err(GatewayError::Rejected(message));
        }

        serde_json::from_str::<CreatedPaymentIntent>(&body)
            .map_err(|e| GatewayError::Transport(format!("unexpected Stripe response: {e}")))
    }
}
