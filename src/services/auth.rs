//! Admin sign-in against the single configured account, and the signed
//! bearer tokens that stand in for a session.
//!
//! Token layout: `base64url("{email}|{expires_at}") "." hex(hmac_sha256(secret, first part))`.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::AppConfig;
use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq)]
pub struct AdminSession {
    pub email: String,
    pub expires_at: i64,
}

impl AdminSession {
    pub fn new(email: &str, now: i64, ttl_secs: i64) -> Self {
        Self {
            email: email.to_string(),
            expires_at: now.saturating_add(ttl_secs),
        }
    }
}

/// Plain comparison, or Argon2 verification when the configured password is a PHC hash.
pub fn verify_credentials(config: &AppConfig, email: &str, password: &str) -> bool {
    if config.admin_email.is_empty() || config.admin_password.is_empty() {
        tracing::error!("admin credentials not configured in environment");
        return false;
    }
    if email.trim() != config.admin_email {
        return false;
    }

    let stored = config.admin_password.as_str();
    if stored.starts_with("$argon2") {
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::error!(error = %e, "ADMIN_PASSWORD looks like an argon2 hash but does not parse");
                false
            }
        }
    } else {
        password == stored
    }
}

fn mac(secret: &str, payload: &str) -> Result<HmacSha256, AppError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Configuration("session secret unusable".to_string()))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

pub fn encode_token(secret: &str, session: &AdminSession) -> Result<String, AppError> {
    let payload = URL_SAFE_NO_PAD.encode(format!("{}|{}", session.email, session.expires_at));
    let sig = mac(secret, &payload)?.finalize().into_bytes();
    Ok(format!("{payload}.{}", hex::encode(sig)))
}

pub fn decode_token(secret: &str, token: &str, now: i64) -> Result<AdminSession, AppError> {
    let (payload, sig_hex) = token.split_once('.').ok_or(AppError::Unauthorized)?;
    let sig = hex::decode(sig_hex).map_err(|_| AppError::Unauthorized)?;
    mac(secret, payload)?
        .verify_slice(&sig)
        .map_err(|_| AppError::Unauthorized)?;

    let raw = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AppError::Unauthorized)?;
    let raw = String::from_utf8(raw).map_err(|_| AppError::Unauthorized)?;
    let (email, expires_at) = raw.rsplit_once('|').ok_or(AppError::Unauthorized)?;
    let expires_at: i64 = expires_at.parse().map_err(|_| AppError::Unauthorized)?;

    if expires_at <= now {
        return Err(AppError::Unauthorized);
    }

    Ok(AdminSession {
        email: email.to_string(),
        expires_at,
    })
}

/// Extracts and checks the bearer token on an admin request.
pub fn require_admin(headers: &HeaderMap, config: &AppConfig) -> Result<AdminSession, AppError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let session = decode_token(&config.session_secret, token, chrono::Utc::now().timestamp())?;
    if session.email != config.admin_email {
        return Err(AppError::Unauthorized);
    }
    Ok(session)
}
