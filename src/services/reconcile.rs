//! Applying gateway webhook events to bookings and payments.
//!
//! Every update is a plain assignment keyed by the gateway payment-intent id,
//! so a redelivered event lands on the same final state. An event whose intent
//! matches nothing is acknowledged and changes nothing.

use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{PaymentRecordStatus, PaymentStatus};
use crate::services::payments::signature::{self, DEFAULT_TOLERANCE_SECS};

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventAction {
    PaymentSucceeded { intent_id: String },
    PaymentFailed { intent_id: String },
    ChargeRefunded { charge_id: String, intent_id: Option<String> },
    Ignored { kind: String },
}

impl GatewayEvent {
    pub fn action(&self) -> EventAction {
        let object = &self.data.object;
        let object_id = object["id"].as_str().unwrap_or_default().to_string();

        match self.kind.as_str() {
            "payment_intent.succeeded" if !object_id.is_empty() => {
                EventAction::PaymentSucceeded { intent_id: object_id }
            }
            "payment_intent.payment_failed" if !object_id.is_empty() => {
                EventAction::PaymentFailed { intent_id: object_id }
            }
            "charge.refunded" => {
                // Either a bare id or an expanded PaymentIntent object.
                let intent_id = object["payment_intent"]
                    .as_str()
                    .or_else(|| object["payment_intent"]["id"].as_str())
                    .map(str::to_string);
                EventAction::ChargeRefunded {
                    charge_id: object_id,
                    intent_id,
                }
            }
            other => EventAction::Ignored {
                kind: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub bookings_updated: usize,
    pub payments_updated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trust {
    Verified,
    /// No webhook secret configured; the payload was accepted as-is.
    Unverified,
}

/// Authenticates and parses a raw webhook delivery. Nothing is written here.
pub fn authenticate_event(
    body: &[u8],
    signature_header: Option<&str>,
    webhook_secret: Option<&str>,
    now: i64,
) -> Result<(GatewayEvent, Trust), AppError> {
    let header = signature_header
        .filter(|h| !h.trim().is_empty())
        .ok_or(AppError::MissingSignature)?;

    let trust = match webhook_secret {
        Some(secret) => {
            signature::verify(body, header, secret, now, DEFAULT_TOLERANCE_SECS)
                .map_err(|e| AppError::InvalidSignature(e.to_string()))?;
            Trust::Verified
        }
        None => {
            tracing::warn!(
                "no webhook secret configured, processing webhook WITHOUT signature verification"
            );
            Trust::Unverified
        }
    };

    let event: GatewayEvent = serde_json::from_slice(body).map_err(|e| match trust {
        Trust::Verified => AppError::BadRequest(format!("malformed event payload: {e}")),
        Trust::Unverified => AppError::InvalidSignature(format!("unparseable unsigned payload: {e}")),
    })?;

    Ok((event, trust))
}

fn set_status(
    conn: &Connection,
    intent_id: &str,
    booking_status: Option<PaymentStatus>,
    payment_status: PaymentRecordStatus,
) -> anyhow::Result<ReconcileOutcome> {
    let tx = conn.unchecked_transaction()?;
    let bookings_updated = match booking_status {
        Some(status) => queries::update_booking_status_by_intent(&tx, intent_id, status)?,
        None => 0,
    };
    let payments_updated = queries::update_payment_status_by_intent(&tx, intent_id, payment_status)?;
    tx.commit()?;

    Ok(ReconcileOutcome {
        bookings_updated,
        payments_updated,
    })
}

pub fn apply_event(conn: &Connection, event: &GatewayEvent) -> anyhow::Result<ReconcileOutcome> {
    let outcome = match event.action() {
        EventAction::PaymentSucceeded { intent_id } => {
            tracing::info!(event_id = %event.id, intent_id = %intent_id, "payment succeeded");
            set_status(
                conn,
                &intent_id,
                Some(PaymentStatus::Completed),
                PaymentRecordStatus::Succeeded,
            )?
        }
        EventAction::PaymentFailed { intent_id } => {
            tracing::info!(event_id = %event.id, intent_id = %intent_id, "payment failed");
            set_status(
                conn,
                &intent_id,
                Some(PaymentStatus::Failed),
                PaymentRecordStatus::Failed,
            )?
        }
        EventAction::ChargeRefunded {
            charge_id,
            intent_id: Some(intent_id),
        } => {
            // Refunds touch the ledger only; the booking keeps its status.
            tracing::info!(event_id = %event.id, charge_id = %charge_id, intent_id = %intent_id, "charge refunded");
            set_status(conn, &intent_id, None, PaymentRecordStatus::Refunded)?
        }
        EventAction::ChargeRefunded {
            charge_id,
            intent_id: None,
        } => {
            tracing::info!(event_id = %event.id, charge_id = %charge_id, "refunded charge has no payment intent");
            ReconcileOutcome::default()
        }
        EventAction::Ignored { kind } => {
            tracing::info!(event_id = %event.id, event_type = %kind, "unhandled event type");
            ReconcileOutcome::default()
        }
    };

    if outcome == ReconcileOutcome::default() {
        tracing::debug!(event_id = %event.id, "event matched no rows");
    }
    Ok(outcome)
}
