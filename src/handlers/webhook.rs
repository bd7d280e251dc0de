use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;

use crate::errors::AppError;
use crate::services::gateway_settings::resolve_credentials;
use crate::services::reconcile;
use crate::state::AppState;

// POST /api/webhooks/stripe
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or(AppError::MissingSignature)?;

    let credentials = {
        let conn = state.conn()?;
        resolve_credentials(&conn, &state.config).map_err(AppError::persistence)?
    };
    if credentials.secret_key.is_none() {
        return Err(AppError::Configuration("Stripe is not configured".to_string()));
    }

    let (event, trust) = reconcile::authenticate_event(
        &body,
        Some(signature),
        credentials.webhook_secret.as_deref(),
        Utc::now().timestamp(),
    )?;

    let outcome = {
        let conn = state.conn()?;
        reconcile::apply_event(&conn, &event).map_err(|e| {
            tracing::error!(event_id = %event.id, error = %e, "failed to apply webhook event");
            AppError::persistence(e)
        })?
    };

    tracing::info!(
        event_id = %event.id,
        event_type = %event.kind,
        ?trust,
        bookings_updated = outcome.bookings_updated,
        payments_updated = outcome.payments_updated,
        "webhook processed"
    );

    Ok(Json(serde_json::json!({"received": true})))
}
