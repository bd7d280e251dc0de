use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod catalog;
pub mod checkout;
pub mod contact;
pub mod health;
pub mod webhook;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/services", get(catalog::list_services))
        .route("/api/services/:id", get(catalog::get_service))
        .route("/api/services/:id/slots", get(catalog::get_slots))
        .route(
            "/api/create-payment-intent",
            post(checkout::create_payment_intent),
        )
        .route("/api/bookings/:id", get(checkout::get_booking_status))
        .route("/api/webhooks/stripe", post(webhook::stripe_webhook))
        .route("/api/contact", post(contact::submit_contact))
        .route("/api/admin/login", post(admin::login))
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/bookings", get(admin::get_bookings))
        .route("/api/admin/bookings/orphaned", get(admin::get_orphaned))
        .route(
            "/api/admin/settings",
            get(admin::get_settings).post(admin::update_settings),
        )
        .with_state(state)
}
