use serde::Deserialize;

use crate::config::AppConfig;
use crate::errors::FieldErrors;
use crate::services::email::OutgoingEmail;
use crate::services::validation::is_valid_email;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
}

pub fn validate(msg: &ContactMessage) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if msg.first_name.trim().is_empty() {
        errors.insert("firstName".into(), "First name is required".into());
    }
    if msg.email.trim().is_empty() {
        errors.insert("email".into(), "Email is required".into());
    } else if !is_valid_email(msg.email.trim()) {
        errors.insert("email".into(), "Invalid email format".into());
    }
    if msg.message.trim().is_empty() {
        errors.insert("message".into(), "Message is required".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn render_email(msg: &ContactMessage, config: &AppConfig) -> OutgoingEmail {
    let last_name = optional(&msg.last_name);
    let subject = format!(
        "Contact Form Submission from {} {}",
        msg.first_name.trim(),
        last_name.unwrap_or_default()
    )
    .trim_end()
    .to_string();

    let mut html = String::from("<h2>New Contact Form Submission</h2>\n");
    html.push_str(&format!(
        "<p><strong>First Name:</strong> {}</p>\n",
        escape_html(msg.first_name.trim())
    ));
    if let Some(last) = last_name {
        html.push_str(&format!("<p><strong>Last Name:</strong> {}</p>\n", escape_html(last)));
    }
    html.push_str(&format!(
        "<p><strong>Email:</strong> {}</p>\n",
        escape_html(msg.email.trim())
    ));
    if let Some(phone) = optional(&msg.phone) {
        html.push_str(&format!("<p><strong>Phone:</strong> {}</p>\n", escape_html(phone)));
    }
    html.push_str("<p><strong>Message:</strong></p>\n");
    html.push_str(&format!(
        "<p>{}</p>\n",
        escape_html(msg.message.trim()).replace('\n', "<br>")
    ));

    OutgoingEmail {
        from: config.contact_from.clone(),
        to: vec![config.contact_to.clone()],
        subject,
        html,
        reply_to: Some(msg.email.trim().to_string()),
    }
}
