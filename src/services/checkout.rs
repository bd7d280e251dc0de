//! Starting checkout: booking row, gateway payment intent, payment ledger row.
//!
//! The booking is written before the gateway is called, so a gateway failure
//! leaves a pending booking with no intent id. Such rows are what
//! [`queries::find_orphaned_bookings`] reports. Linking the intent and writing
//! the payment row happen in one transaction.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::{AppError, FieldErrors};
use crate::models::{Booking, BookingDraft, Payment, PaymentRecordStatus, PaymentStatus};
use crate::services::gateway_settings::resolve_credentials;
use crate::services::payments::{to_minor_units, GatewayError, NewPaymentIntent};
use crate::services::validation::{validate_contact, ContactDetails};
use crate::state::AppState;

pub const NOT_CONFIGURED: &str = "Stripe is not configured. Please contact the administrator.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub amount: f64,
    pub booking_data: BookingDraft,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub client_secret: String,
    pub booking_id: String,
}

pub fn validate_request(req: &CheckoutRequest) -> Result<(), FieldErrors> {
    let draft = &req.booking_data;
    let contact = ContactDetails {
        first_name: draft.first_name.clone(),
        last_name: draft.last_name.clone(),
        email: draft.email.clone(),
        phone: draft.phone.clone(),
        message: draft.message.clone(),
    };
    let mut errors = validate_contact(&contact).err().unwrap_or_default();

    if !req.amount.is_finite() || req.amount <= 0.0 {
        errors.insert("amount".into(), "Amount must be greater than zero".into());
    }
    let required = [
        ("serviceId", &draft.service_id),
        ("serviceName", &draft.service_name),
        ("appointmentDate", &draft.appointment_date),
        ("appointmentTime", &draft.appointment_time),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.insert(field.into(), "This field is required".into());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn new_booking(draft: &BookingDraft, idempotency_key: Option<&str>) -> Booking {
    let now = Utc::now().naive_utc();
    Booking {
        id: uuid::Uuid::new_v4().to_string(),
        service_id: draft.service_id.clone(),
        service_name: draft.service_name.clone(),
        service_price: draft.service_price,
        service_duration: draft.service_duration.clone(),
        first_name: draft.first_name.trim().to_string(),
        last_name: draft.last_name.trim().to_string(),
        email: draft.email.trim().to_string(),
        phone: draft.phone.trim().to_string(),
        message: draft.message.clone().filter(|m| !m.trim().is_empty()),
        appointment_date: draft.appointment_date.clone(),
        appointment_time: draft.appointment_time.clone(),
        payment_status: PaymentStatus::Pending,
        payment_intent_id: None,
        idempotency_key: idempotency_key.map(str::to_string),
        created_at: now,
        updated_at: now,
    }
}

/// Creates (or, for a repeated idempotency key, reuses) the pending booking.
fn insert_or_reuse_booking(
    state: &AppState,
    draft: &BookingDraft,
    idempotency_key: Option<&str>,
) -> Result<Booking, AppError> {
    let conn = state.conn()?;

    if let Some(key) = idempotency_key {
        if let Some(existing) =
            queries::get_booking_by_idempotency_key(&conn, key).map_err(AppError::persistence)?
        {
            tracing::info!(booking_id = %existing.id, "reusing booking for repeated idempotency key");
            return Ok(existing);
        }
    }

    let booking = new_booking(draft, idempotency_key);
    queries::create_booking(&conn, &booking).map_err(|e| {
        tracing::error!(error = %e, "failed to create booking");
        AppError::persistence(e)
    })?;
    Ok(booking)
}

pub async fn start_checkout(
    state: &AppState,
    req: &CheckoutRequest,
    idempotency_key: Option<&str>,
) -> Result<CheckoutResponse, AppError> {
    validate_request(req).map_err(AppError::Validation)?;
    let draft = &req.booking_data;

    let secret_key = {
        let conn = state.conn()?;
        resolve_credentials(&conn, &state.config)
            .map_err(AppError::persistence)?
            .secret_key
    }
    .ok_or_else(|| AppError::Configuration(NOT_CONFIGURED.to_string()))?;

    let booking = insert_or_reuse_booking(state, draft, idempotency_key)?;

    // Describe the stored booking; on a replayed key it may differ from this request.
    let customer_name = booking.customer_name();
    let intent_request = NewPaymentIntent {
        amount_minor: to_minor_units(req.amount),
        currency: state.config.currency.clone(),
        description: format!("{} - {}", booking.service_name, customer_name),
        booking_id: booking.id.clone(),
        customer_email: booking.email.clone(),
        customer_name,
        idempotency_key: idempotency_key.map(|k| format!("checkout-{k}")),
    };

    let intent = state
        .gateway
        .create_payment_intent(&secret_key, &intent_request)
        .await
        .map_err(|e| {
            tracing::warn!(
                booking_id = %booking.id,
                error = %e,
                "payment intent creation failed, booking left pending without intent"
            );
            match e {
                GatewayError::Rejected(msg) => AppError::Gateway(msg),
                GatewayError::Transport(msg) => AppError::Gateway(msg),
            }
        })?;

    {
        let conn = state.conn()?;
        let tx = conn.unchecked_transaction()?;

        let linked = queries::set_booking_payment_intent(&tx, &booking.id, &intent.id)
            .map_err(AppError::persistence)?;
        if !linked {
            return Err(AppError::Persistence(format!(
                "booking {} disappeared before intent {} could be linked",
                booking.id, intent.id
            )));
        }

        if !queries::payment_exists_for_intent(&tx, &intent.id).map_err(AppError::persistence)? {
            let now = Utc::now().naive_utc();
            let payment = Payment {
                id: uuid::Uuid::new_v4().to_string(),
                booking_id: booking.id.clone(),
                amount: req.amount,
                currency: state.config.currency.clone(),
                status: PaymentRecordStatus::Pending,
                stripe_payment_intent_id: intent.id.clone(),
                created_at: now,
                updated_at: now,
            };
            queries::create_payment(&tx, &payment).map_err(AppError::persistence)?;
        }

        tx.commit()?;
    }

    tracing::info!(
        booking_id = %booking.id,
        intent_id = %intent.id,
        amount_minor = intent_request.amount_minor,
        "checkout started"
    );

    Ok(CheckoutResponse {
        client_secret: intent.client_secret,
        booking_id: booking.id,
    })
}
