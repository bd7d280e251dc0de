use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Ledger row for one gateway payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub booking_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentRecordStatus,
    pub stripe_payment_intent_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentRecordStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

impl PaymentRecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentRecordStatus::Pending => "pending",
            PaymentRecordStatus::Succeeded => "succeeded",
            PaymentRecordStatus::Failed => "failed",
            PaymentRecordStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "succeeded" => PaymentRecordStatus::Succeeded,
            "failed" => PaymentRecordStatus::Failed,
            "refunded" => PaymentRecordStatus::Refunded,
            _ => PaymentRecordStatus::Pending,
        }
    }
}
