use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::services::contact::{self, ContactMessage};
use crate::state::AppState;

// POST /api/contact
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ContactMessage>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(msg) = payload?;
    contact::validate(&msg).map_err(AppError::Validation)?;

    let email = contact::render_email(&msg, &state.config);
    let id = state
        .mailer
        .send(&email)
        .await
        .map_err(|e| AppError::Email(e.to_string()))?;

    tracing::info!(email_id = %id, "contact message sent");
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Email sent successfully"
    })))
}
