use std::env;

use crate::db::queries::MAX_ORPHAN_AGE_MINUTES;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_email: String,
    pub admin_password: String,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub stripe_secret_key: String,
    pub stripe_publishable_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub currency: String,
    pub resend_api_key: String,
    pub contact_to: String,
    pub contact_from: String,
    pub orphan_sweep_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let session_secret = match env::var("SESSION_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!("SESSION_SECRET not set, admin sessions will not survive a restart");
                uuid::Uuid::new_v4().simple().to_string()
            }
        };

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "renewed.db".to_string()),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_default(),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_default(),
            session_secret,
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(12),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_publishable_key: env::var("STRIPE_PUBLISHABLE_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            resend_api_key: env::var("RESEND_API_KEY").unwrap_or_default(),
            contact_to: env::var("CONTACT_TO")
                .unwrap_or_else(|_| "admin@rnpowerinc.com".to_string()),
            contact_from: env::var("CONTACT_FROM").unwrap_or_else(|_| {
                "ReNewed Power Contact Form <contact@resend.dev>".to_string()
            }),
            orphan_sweep_minutes: sweep_minutes(env::var("ORPHAN_SWEEP_MINUTES").ok()),
        }
    }
}

/// Parses `ORPHAN_SWEEP_MINUTES`. Defaults to 30; values outside
/// `0..=MAX_ORPHAN_AGE_MINUTES` are clamped.
fn sweep_minutes(raw: Option<String>) -> i64 {
    let minutes = raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(30);
    let clamped = minutes.clamp(0, MAX_ORPHAN_AGE_MINUTES);
    if clamped != minutes {
        tracing::warn!(
            requested = minutes,
            using = clamped,
            "ORPHAN_SWEEP_MINUTES out of range, clamped"
        );
    }
    clamped
}
