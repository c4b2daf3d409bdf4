//! Signed session cookie carrying the local user id.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

use crate::crypto::{CryptoEngine, SignedPurpose};
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "glassfeed_session";

const SESSION_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// User id from a valid session cookie, if any.
pub fn current_user(crypto: &CryptoEngine, headers: &HeaderMap) -> Option<String> {
    let raw = cookie_value(headers, SESSION_COOKIE)?;
    crypto
        .verify(SignedPurpose::Session, &raw)
        .ok()
        .filter(|user_id| !user_id.is_empty())
}

/// `Set-Cookie` value starting a session for `user_id`.
pub fn session_cookie(crypto: &CryptoEngine, user_id: &str) -> Result<String, AppError> {
    let signed = crypto.sign(SignedPurpose::Session, user_id)?;
    Ok(format!(
        "{SESSION_COOKIE}={signed}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_MAX_AGE_SECS}"
    ))
}

/// `Set-Cookie` value ending the session.
pub fn cleared_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}
