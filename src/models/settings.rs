use serde::{Deserialize, Serialize};

/// Well-known id of the single settings row.
pub const SETTINGS_ID: &str = "00000000-0000-0000-0000-000000000001";

/// What the admin API shows in place of a stored secret.
pub const MASKED_PLACEHOLDER: &str = "••••••••";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GatewaySettings {
    pub stripe_publishable_key: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
}

impl GatewaySettings {
    pub fn has_keys_configured(&self) -> bool {
        is_set(&self.stripe_publishable_key) && is_set(&self.stripe_secret_key)
    }

    /// Copy safe to hand to the admin UI: secrets replaced by the placeholder.
    pub fn masked(&self) -> MaskedSettings {
        MaskedSettings {
            stripe_publishable_key: self.stripe_publishable_key.clone().unwrap_or_default(),
            stripe_secret_key: mask(&self.stripe_secret_key),
            stripe_webhook_secret: mask(&self.stripe_webhook_secret),
            has_keys_configured: self.has_keys_configured(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaskedSettings {
    pub stripe_publishable_key: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    #[serde(rename = "hasKeysConfigured")]
    pub has_keys_configured: bool,
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

fn mask(value: &Option<String>) -> String {
    if is_set(value) {
        MASKED_PLACEHOLDER.to_string()
    } else {
        String::new()
    }
}
