use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// OAuth state older than this is rejected.
const STATE_MAX_AGE_SECS: i64 = 10 * 60;

fn new_hmac(key: &[u8]) -> Result<HmacSha256, AppError> {
    <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| AppError::CryptoError(format!("HMAC init failed: {e}")))
}

/// What a signed value is allowed to be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedPurpose {
    TimelineState,
    FeedState,
    Session,
}

impl SignedPurpose {
    fn tag(self) -> &'static str {
        match self {
            SignedPurpose::TimelineState => "timeline",
            SignedPurpose::FeedState => "feed",
            SignedPurpose::Session => "session",
        }
    }
}

/// Encrypts stored OAuth tokens and signs state parameters and session cookies.
pub struct CryptoEngine {
    cipher: Aes256Gcm,
    hmac_key: Vec<u8>,
}

impl CryptoEngine {
    /// Create a new CryptoEngine from base64-encoded keys.
    pub fn new(master_key_b64: &str, hmac_secret_b64: &str) -> Result<Self, AppError> {
        let master_key = base64::engine::general_purpose::STANDARD
            .decode(master_key_b64)
            .map_err(|e| AppError::CryptoError(format!("Invalid MASTER_KEY base64: {e}")))?;

        if master_key.len() != 32 {
            return Err(AppError::CryptoError(format!(
                "MASTER_KEY must be 32 bytes, got {}",
                master_key.len()
            )));
        }

        let hmac_key = base64::engine::general_purpose::STANDARD
            .decode(hmac_secret_b64)
            .map_err(|e| AppError::CryptoError(format!("Invalid HMAC_SECRET base64: {e}")))?;

        let cipher = Aes256Gcm::new_from_slice(&master_key)
            .map_err(|e| AppError::CryptoError(format!("Failed to init AES cipher: {e}")))?;

        Ok(Self { cipher, hmac_key })
    }

    /// Encrypt a token. Returns base64(nonce || ciphertext).
    pub fn seal_token(&self, token: &str) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, token.as_bytes())
            .map_err(|e| AppError::CryptoError(format!("Encryption failed: {e}")))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(&combined))
    }

    /// Decrypt a value produced by [`seal_token`](Self::seal_token).
    pub fn open_token(&self, sealed: &str) -> Result<String, AppError> {
        let combined = base64::engine::general_purpose::STANDARD
            .decode(sealed)
            .map_err(|e| AppError::CryptoError(format!("Invalid base64: {e}")))?;

        if combined.len() < 12 {
            return Err(AppError::CryptoError("Ciphertext too short".into()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(12);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| AppError::CryptoError(format!("Decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::CryptoError(format!("Invalid UTF-8 after decrypt: {e}")))
    }

    /// Sign `<purpose>:<issued_at>:<user_id>`. Returns base64url(hmac || payload).
    pub fn sign(&self, purpose: SignedPurpose, user_id: &str) -> Result<String, AppError> {
        let payload = format!("{}:{}:{}", purpose.tag(), Utc::now().timestamp(), user_id);
        self.sign_payload(&payload)
    }

    /// Verify a signed value and return the user id it carries.
    ///
    /// OAuth state values expire after ten minutes; sessions do not.
    pub fn verify(&self, purpose: SignedPurpose, signed: &str) -> Result<String, AppError> {
        let payload = self.verify_payload(signed)?;

        let mut parts = payload.splitn(3, ':');
        let (Some(tag), Some(issued_at), Some(user_id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AppError::InvalidState);
        };

        if tag != purpose.tag() {
            return Err(AppError::InvalidState);
        }

        let issued_at: i64 = issued_at.parse().map_err(|_| AppError::InvalidState)?;
        if purpose != SignedPurpose::Session
            && Utc::now().timestamp() - issued_at > STATE_MAX_AGE_SECS
        {
            return Err(AppError::BadRequest("OAuth session expired".into()));
        }

        Ok(user_id.to_string())
    }

    fn sign_payload(&self, payload: &str) -> Result<String, AppError> {
        let mut mac = new_hmac(&self.hmac_key)?;
        mac.update(payload.as_bytes());
        let signature = mac.finalize().into_bytes();

        let mut combined = signature.to_vec();
        combined.extend_from_slice(payload.as_bytes());

        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&combined))
    }

    fn verify_payload(&self, signed: &str) -> Result<String, AppError> {
        let combined = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(signed)
            .map_err(|_| AppError::InvalidState)?;

        if combined.len() < 32 {
            return Err(AppError::InvalidState);
        }

        let (signature, payload_bytes) = combined.split_at(32);

        let mut mac = new_hmac(&self.hmac_key)?;
        mac.update(payload_bytes);
        mac.verify_slice(signature)
            .map_err(|_| AppError::InvalidState)?;

        String::from_utf8(payload_bytes.to_vec()).map_err(|_| AppError::InvalidState)
    }
}
