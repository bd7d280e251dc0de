use axum::extract::{Path, Query};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{find_service, Service, CATALOG};
use crate::services::slots::SlotSchedule;

// GET /api/services
pub async fn list_services() -> Json<&'static [Service]> {
    Json(CATALOG)
}

// GET /api/services/:id
pub async fn get_service(Path(id): Path<String>) -> Result<Json<Service>, AppError> {
    find_service(&id)
        .copied()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("unknown service: {id}")))
}

// GET /api/services/:id/slots?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    service_id: &'static str,
    date: String,
    available: bool,
    slots: Vec<String>,
    next_available: Option<String>,
}

pub async fn get_slots(
    Path(id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let service =
        find_service(&id).ok_or_else(|| AppError::NotFound(format!("unknown service: {id}")))?;

    let today = Utc::now().date_naive();
    let date = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::BadRequest(format!("invalid date: {raw} (expected YYYY-MM-DD)")))?,
        None => today,
    };

    let schedule = SlotSchedule::default();
    let slots = schedule.slots_for(date, today);

    Ok(Json(SlotsResponse {
        service_id: service.id,
        date: date.format("%Y-%m-%d").to_string(),
        available: !slots.is_empty(),
        next_available: schedule
            .next_available(date.max(today))
            .map(|d| d.format("%Y-%m-%d").to_string()),
        slots,
    }))
}
