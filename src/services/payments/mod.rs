pub mod signature;
pub mod stripe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request for a new gateway payment intent. `amount_minor` is in cents.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPaymentIntent {
    pub amount_minor: i64,
    pub currency: String,
    pub description: String,
    pub booking_id: String,
    pub customer_email: String,
    pub customer_name: String,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedPaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The provider rejected the request; the message is the provider's own.
    #[error("{0}")]
    Rejected(String),

    #[error("payment gateway unreachable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        secret_key: &str,
        request: &NewPaymentIntent,
    ) -> Result<CreatedPaymentIntent, GatewayError>;
}

/// Converts a decimal currency amount to minor units, rounding to the nearest cent.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
