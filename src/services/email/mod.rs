pub mod resend;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one message and returns the provider's message id.
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<String>;
}
