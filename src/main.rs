use std::sync::{Arc, Mutex};
use std::time::Duration;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use renewed::config::AppConfig;
use renewed::db::{self, queries};
use renewed::handlers;
use renewed::services::email::resend::ResendMailer;
use renewed::services::gateway_settings::resolve_credentials;
use renewed::services::payments::stripe::StripeGateway;
use renewed::state::AppState;

/// Logs pending bookings whose checkout never finished. Nothing is modified.
async fn orphan_sweep(state: Arc<AppState>, minutes: i64) {
    let period = Duration::from_secs(minutes.unsigned_abs().saturating_mul(60));
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;

        let Some(cutoff) = queries::orphan_cutoff(chrono::Utc::now().naive_utc(), minutes) else {
            tracing::error!(minutes, "orphan sweep age out of range, sweep stopped");
            return;
        };
        let result = match state.conn() {
            Ok(conn) => queries::find_orphaned_bookings(&conn, &cutoff),
            Err(e) => Err(anyhow::anyhow!(e)),
        };

        match result {
            Ok(orphans) if orphans.is_empty() => {}
            Ok(orphans) => {
                tracing::warn!(
                    count = orphans.len(),
                    oldest = %orphans[0].id,
                    "pending bookings without a linked payment, see /api/admin/bookings/orphaned"
                );
            }
            Err(e) => tracing::error!(error = %e, "orphan sweep failed"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let credentials = resolve_credentials(&conn, &config)?;
    if credentials.secret_key.is_none() {
        tracing::warn!("no Stripe secret key configured, checkout is disabled until one is saved");
    }
    if credentials.webhook_secret.is_none() {
        tracing::warn!(
            "no Stripe webhook secret configured, webhooks will be processed WITHOUT signature verification"
        );
    }
    if config.resend_api_key.is_empty() {
        tracing::warn!("RESEND_API_KEY not set, contact form delivery will fail");
    }

    tracing::info!("using Stripe API at {}", config.stripe_api_base);
    let gateway = StripeGateway::new(config.stripe_api_base.clone());
    let mailer = ResendMailer::new(config.resend_api_key.clone());

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        gateway: Box::new(gateway),
        mailer: Box::new(mailer),
    });

    if config.orphan_sweep_minutes > 0 {
        tokio::spawn(orphan_sweep(Arc::clone(&state), config.orphan_sweep_minutes));
    }

    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
