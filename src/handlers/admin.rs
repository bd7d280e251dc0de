use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{format_timestamp, queries};
use crate::errors::AppError;
use crate::models::{Booking, MaskedSettings, PaymentStatus};
use crate::services::auth::{self, AdminSession};
use crate::services::gateway_settings::{self, SettingsForm};
use crate::state::AppState;

const DEFAULT_ORPHAN_AGE_MINUTES: i64 = 30;

// POST /api/admin/login
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
    expires_at: i64,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(req) = payload?;
    if !auth::verify_credentials(&state.config, &req.email, &req.password) {
        tracing::warn!("admin login rejected");
        return Err(AppError::Unauthorized);
    }

    let session = AdminSession::new(
        &state.config.admin_email,
        Utc::now().timestamp(),
        state.config.session_ttl_hours.saturating_mul(3600),
    );
    let token = auth::encode_token(&state.config.session_secret, &session)?;
    tracing::info!(email = %session.email, "admin logged in");

    Ok(Json(LoginResponse {
        token,
        expires_at: session.expires_at,
    }))
}

#[derive(Serialize)]
pub struct BookingResponse {
    id: String,
    service_id: String,
    service_name: String,
    service_price: f64,
    service_duration: String,
    customer_name: String,
    email: String,
    phone: String,
    message: Option<String>,
    appointment_date: String,
    appointment_time: String,
    payment_status: PaymentStatus,
    payment_intent_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            customer_name: b.customer_name(),
            id: b.id,
            service_id: b.service_id,
            service_name: b.service_name,
            service_price: b.service_price,
            service_duration: b.service_duration,
            email: b.email,
            phone: b.phone,
            message: b.message,
            appointment_date: b.appointment_date,
            appointment_time: b.appointment_time,
            payment_status: b.payment_status,
            payment_intent_id: b.payment_intent_id,
            created_at: format_timestamp(&b.created_at),
            updated_at: format_timestamp(&b.updated_at),
        }
    }
}

// GET /api/admin/dashboard
#[derive(Serialize)]
pub struct DashboardResponse {
    total_bookings: i64,
    pending_payments: i64,
    completed_payments: i64,
    failed_payments: i64,
    total_revenue: f64,
    recent_bookings: Vec<BookingResponse>,
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, AppError> {
    auth::require_admin(&headers, &state.config)?;

    let stats = {
        let conn = state.conn()?;
        queries::get_dashboard_stats(&conn).map_err(AppError::persistence)?
    };

    Ok(Json(DashboardResponse {
        total_bookings: stats.counts.all,
        pending_payments: stats.counts.pending,
        completed_payments: stats.counts.completed,
        failed_payments: stats.counts.failed,
        total_revenue: stats.total_revenue,
        recent_bookings: stats.recent_bookings.into_iter().map(Into::into).collect(),
    }))
}

// GET /api/admin/bookings?status=&limit=
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct BookingsResponse {
    bookings: Vec<BookingResponse>,
    counts: queries::BookingCounts,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<BookingsResponse>, AppError> {
    auth::require_admin(&headers, &state.config)?;

    let status = match query.status.as_deref().filter(|s| !s.is_empty() && *s != "all") {
        Some(raw) => Some(
            PaymentStatus::try_parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status filter: {raw}")))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);

    let (bookings, counts) = {
        let conn = state.conn()?;
        let bookings = queries::list_bookings(&conn, status, limit).map_err(AppError::persistence)?;
        let counts = queries::count_bookings_by_status(&conn).map_err(AppError::persistence)?;
        (bookings, counts)
    };

    Ok(Json(BookingsResponse {
        bookings: bookings.into_iter().map(Into::into).collect(),
        counts,
    }))
}

// GET /api/admin/bookings/orphaned?older_than_minutes=
#[derive(Deserialize)]
pub struct OrphanedQuery {
    pub older_than_minutes: Option<i64>,
}

pub async fn get_orphaned(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<OrphanedQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    auth::require_admin(&headers, &state.config)?;

    let minutes = query.older_than_minutes.unwrap_or(if state.config.orphan_sweep_minutes > 0 {
        state.config.orphan_sweep_minutes
    } else {
        DEFAULT_ORPHAN_AGE_MINUTES
    });
    let cutoff = queries::orphan_cutoff(Utc::now().naive_utc(), minutes).ok_or_else(|| {
        AppError::BadRequest(format!(
            "older_than_minutes must be between 0 and {}",
            queries::MAX_ORPHAN_AGE_MINUTES
        ))
    })?;

    let orphans = {
        let conn = state.conn()?;
        queries::find_orphaned_bookings(&conn, &cutoff).map_err(AppError::persistence)?
    };

    Ok(Json(orphans.into_iter().map(Into::into).collect()))
}

// GET /api/admin/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MaskedSettings>, AppError> {
    auth::require_admin(&headers, &state.config)?;

    let (settings, resolved) = {
        let conn = state.conn()?;
        let settings = queries::get_settings(&conn).map_err(AppError::persistence)?;
        let resolved =
            gateway_settings::resolve_credentials(&conn, &state.config).map_err(AppError::persistence)?;
        (settings, resolved)
    };

    // Stored keys are masked; the flag also counts keys supplied by the environment.
    let mut masked = settings.masked();
    masked.has_keys_configured = resolved.has_keys_configured();
    Ok(Json(masked))
}

// POST /api/admin/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SettingsForm>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = auth::require_admin(&headers, &state.config)?;
    let Json(form) = payload?;

    {
        let conn = state.conn()?;
        gateway_settings::apply_update(&conn, &form)?;
    }
    tracing::info!(admin = %session.email, "settings saved");

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Settings saved successfully"
    })))
}
