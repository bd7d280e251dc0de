use std::sync::OnceLock;

use regex::Regex;

use crate::errors::FieldErrors;

/// Contact fields collected by the booking form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub message: Option<String>,
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// At least ten digits once punctuation and spaces are stripped.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.chars().filter(|c| c.is_ascii_digit()).count() >= 10
}

/// Field names in the result use the wire (camelCase) spelling.
pub fn validate_contact(contact: &ContactDetails) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if contact.first_name.trim().is_empty() {
        errors.insert("firstName".into(), "First name is required".into());
    }

    if contact.last_name.trim().is_empty() {
        errors.insert("lastName".into(), "Last name is required".into());
    }

    if contact.email.trim().is_empty() {
        errors.insert("email".into(), "Email is required".into());
    } else if !is_valid_email(&contact.email) {
        errors.insert("email".into(), "Invalid email format".into());
    }

    if contact.phone.trim().is_empty() {
        errors.insert("phone".into(), "Phone is required".into());
    } else if !is_valid_phone(&contact.phone) {
        errors.insert("phone".into(), "Invalid phone number".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
