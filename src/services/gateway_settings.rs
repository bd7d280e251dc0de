use rusqlite::Connection;

use crate::config::AppConfig;
use crate::db::queries;
use crate::errors::{AppError, FieldErrors};
use crate::models::{GatewaySettings, MASKED_PLACEHOLDER};

/// Gateway credentials after merging the settings row with environment fallbacks.
#[derive(Debug, Clone, Default)]
pub struct ResolvedCredentials {
    pub publishable_key: Option<String>,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
}

impl ResolvedCredentials {
    /// Both keys checkout needs, from either source.
    pub fn has_keys_configured(&self) -> bool {
        self.publishable_key.is_some() && self.secret_key.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn pick(stored: Option<String>, fallback: &str) -> Option<String> {
    non_empty(stored).or_else(|| non_empty(Some(fallback.to_string())))
}

pub fn resolve_credentials(
    conn: &Connection,
    config: &AppConfig,
) -> anyhow::Result<ResolvedCredentials> {
    let stored = queries::get_settings(conn)?;
    Ok(ResolvedCredentials {
        publishable_key: pick(stored.stripe_publishable_key, &config.stripe_publishable_key),
        secret_key: pick(stored.stripe_secret_key, &config.stripe_secret_key),
        webhook_secret: pick(stored.stripe_webhook_secret, &config.stripe_webhook_secret),
    })
}

/// Admin form submission. Blank fields and the masked placeholder mean "keep".
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct SettingsForm {
    pub stripe_publishable_key: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
}

fn submitted(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != MASKED_PLACEHOLDER)
        .map(str::to_string)
}

/// Checks key prefixes and turns the form into a partial update.
pub fn prepare_update(form: &SettingsForm) -> Result<GatewaySettings, FieldErrors> {
    let update = GatewaySettings {
        stripe_publishable_key: submitted(&form.stripe_publishable_key),
        stripe_secret_key: submitted(&form.stripe_secret_key),
        stripe_webhook_secret: submitted(&form.stripe_webhook_secret),
    };

    let mut errors = FieldErrors::new();
    let checks = [
        ("stripe_publishable_key", &update.stripe_publishable_key, "pk_", "publishable key"),
        ("stripe_secret_key", &update.stripe_secret_key, "sk_", "secret key"),
        ("stripe_webhook_secret", &update.stripe_webhook_secret, "whsec_", "webhook secret"),
    ];
    for (field, value, prefix, label) in checks {
        if let Some(v) = value {
            if !v.starts_with(prefix) {
                errors.insert(
                    field.to_string(),
                    format!("Invalid {label} format. Should start with {prefix}"),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(update)
    } else {
        Err(errors)
    }
}

pub fn apply_update(conn: &Connection, form: &SettingsForm) -> Result<(), AppError> {
    let update = prepare_update(form).map_err(AppError::Validation)?;
    queries::save_settings(conn, &update).map_err(AppError::persistence)?;

    tracing::info!(
        publishable_key = update.stripe_publishable_key.is_some(),
        secret_key = update.stripe_secret_key.is_some(),
        webhook_secret = update.stripe_webhook_secret.is_some(),
        "gateway settings updated"
    );
    Ok(())
}
