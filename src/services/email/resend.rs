use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{Mailer, OutgoingEmail};

pub struct ResendMailer {
    api_key: String,
    client: reqwest::Client,
}

impl ResendMailer {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<String> {
        anyhow::ensure!(!self.api_key.is_empty(), "RESEND_API_KEY is not configured");

        let mut body = json!({
            "from": email.from,
            "to": email.to,
            "subject": email.subject,
            "html": email.html,
        });
        if let Some(reply_to) = &email.reply_to {
            body["reply_to"] = json!(reply_to);
        }

        let resp = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call Resend API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse Resend response")?;

        if !status.is_success() {
            anyhow::bail!("Resend API error ({}): {}", status, data);
        }

        data["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing id in Resend response"))
    }
}
