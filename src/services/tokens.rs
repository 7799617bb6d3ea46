//! Bearer session tokens and single-use email tokens.
//!
//! Session tokens are `base64url(claims).base64url(hmac_sha256(secret, payload))`.
//! They are self-contained: nothing is stored server-side, so a token stays
//! valid until `exp` even if the user changes password or is removed.
//!
//! Single-use tokens are 160 random bits handed to the user; only the SHA-256
//! digest is persisted alongside an expiry.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_TTL_DAYS: i64 = 90;
const SINGLE_USE_TOKEN_BYTES: usize = 20;
const MAX_TOKEN_LEN: usize = 2048;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

pub struct SessionTokens {
    key: Vec<u8>,
}

impl SessionTokens {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: secret.to_vec(),
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> String {
        self.issue_at(user_id, email, Utc::now())
    }

    pub fn issue_at(&self, user_id: Uuid, email: &str, issued_at: DateTime<Utc>) -> String {
        let claims = SessionClaims {
            sub: user_id,
            email: email.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::days(SESSION_TTL_DAYS)).timestamp(),
        };
        let payload = serde_json::to_vec(&claims).expect("session claims always serialize");
        let payload_part = URL_SAFE_NO_PAD.encode(payload);
        let sig_part = URL_SAFE_NO_PAD.encode(self.sign(payload_part.as_bytes()));
        format!("{}.{}", payload_part, sig_part)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies signature first, then expiry relative to `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::Invalid);
        }
        let (payload_part, sig_part) = token.split_once('.').ok_or(TokenError::Invalid)?;
        let signature = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|_| TokenError::Invalid)?;

        let mut mac = self.mac();
        mac.update(payload_part.as_bytes());
        mac.verify_slice(&signature).map_err(|_| TokenError::Invalid)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|_| TokenError::Invalid)?;
        let claims: SessionClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Invalid)?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length")
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailConfirmation,
    PasswordReset,
}

impl TokenPurpose {
    pub fn ttl(&self) -> Duration {
        match self {
            Self::EmailConfirmation => Duration::hours(24),
            Self::PasswordReset => Duration::minutes(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SingleUseToken {
    /// Sent to the user; never stored.
    pub raw: String,
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

pub fn issue_single_use_token(purpose: TokenPurpose) -> SingleUseToken {
    issue_single_use_token_at(purpose, Utc::now())
}

pub fn issue_single_use_token_at(purpose: TokenPurpose, now: DateTime<Utc>) -> SingleUseToken {
    let mut bytes = [0u8; SINGLE_USE_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let raw = hex::encode(bytes);
    SingleUseToken {
        digest: digest_token(&raw),
        raw,
        expires_at: now + purpose.ttl(),
    }
}

pub fn digest_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> SessionTokens {
        SessionTokens::new(b"test-secret")
    }

    #[test]
    fn fresh_token_resolves_to_user() {
        let user_id = Uuid::new_v4();
        let token = tokens().issue(user_id, "a@example.com");

        let claims = tokens().verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.exp - claims.iat, Duration::days(SESSION_TTL_DAYS).num_seconds());
    }

    #[test]
    fn token_expires_after_validity_window() {
        let issued = Utc::now() - Duration::days(SESSION_TTL_DAYS + 1);
        let token = tokens().issue_at(Uuid::new_v4(), "a@example.com", issued);

        assert_eq!(tokens().verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_is_valid_just_inside_window() {
        let issued = Utc::now();
        let token = tokens().issue_at(Uuid::new_v4(), "a@example.com", issued);
        let almost = issued + Duration::days(SESSION_TTL_DAYS) - Duration::seconds(1);

        assert!(tokens().verify_at(&token, almost).is_ok());
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let token = tokens().issue(Uuid::new_v4(), "a@example.com");
        let (_, sig) = token.split_once('.').unwrap();
        let forged_claims = SessionClaims {
            sub: Uuid::new_v4(),
            email: "evil@example.com".into(),
            iat: 0,
            exp: i64::MAX,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}", forged_payload, sig);

        assert_eq!(tokens().verify(&forged), Err(TokenError::Invalid));
    }

    #[test]
    fn other_secret_is_invalid() {
        let token = SessionTokens::new(b"another").issue(Uuid::new_v4(), "a@example.com");
        assert_eq!(tokens().verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_is_invalid() {
        for token in ["", "abc", "a.b", "....", "not base64.!!"] {
            assert_eq!(tokens().verify(token), Err(TokenError::Invalid), "{token}");
        }
    }

    #[test]
    fn single_use_token_stores_only_digest() {
        let now = Utc::now();
        let token = issue_single_use_token_at(TokenPurpose::PasswordReset, now);

        assert_eq!(token.raw.len(), SINGLE_USE_TOKEN_BYTES * 2);
        assert_ne!(token.raw, token.digest);
        assert_eq!(token.digest, digest_token(&token.raw));
        assert_eq!(token.expires_at - now, Duration::minutes(10));
    }

    #[test]
    fn confirmation_tokens_last_a_day() {
        assert_eq!(TokenPurpose::EmailConfirmation.ttl(), Duration::hours(24));
    }

    #[test]
    fn single_use_tokens_are_unique() {
        let a = issue_single_use_token(TokenPurpose::EmailConfirmation);
        let b = issue_single_use_token(TokenPurpose::EmailConfirmation);
        assert_ne!(a.raw, b.raw);
    }
}
