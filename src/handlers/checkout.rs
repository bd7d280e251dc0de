use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::PaymentStatus;
use crate::services::checkout::{self, CheckoutRequest, CheckoutResponse};
use crate::state::AppState;

// POST /api/create-payment-intent
pub async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let Json(req) = payload?;
    let idempotency_key = headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());

    let response = checkout::start_checkout(&state, &req, idempotency_key).await?;
    Ok(Json(response))
}

// GET /api/bookings/:id
#[derive(Serialize)]
pub struct BookingStatusResponse {
    id: String,
    service_name: String,
    appointment_date: String,
    appointment_time: String,
    payment_status: PaymentStatus,
}

pub async fn get_booking_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingStatusResponse>, AppError> {
    let booking = {
        let conn = state.conn()?;
        queries::get_booking_by_id(&conn, &id).map_err(AppError::persistence)?
    }
    .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

    Ok(Json(BookingStatusResponse {
        id: booking.id,
        service_name: booking.service_name,
        appointment_date: booking.appointment_date,
        appointment_time: booking.appointment_time,
        payment_status: booking.payment_status,
    }))
}
