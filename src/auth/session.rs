//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AppError;
use crate::metrics::SESSIONS_ISSUED_TOTAL;

type HmacSha256 = Hmac<Sha256>;

/// Shortest signing secret accepted at startup
pub const MIN_SECRET_BYTES: usize = 32;

/// Default validity window (30 days)
pub const DEFAULT_MAX_AGE_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Signed payload of a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Credential record identifier
    pub sub: String,
    pub email: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

/// Identity reconstructed from a valid token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub identifier: String,
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued token with its expiry
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token rejected: bad signature, malformed, or expired
///
/// Deliberately carries no detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid session")]
pub struct InvalidSession;

impl From<InvalidSession> for AppError {
    fn from(_: InvalidSession) -> Self {
        AppError::Unauthorized
    }
}

/// Mints and validates session tokens
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// The secret is fixed at construction and only read afterwards, so a
/// single instance is shared across all requests.
#[derive(Clone)]
pub struct SessionIssuer {
    secret: Vec<u8>,
    max_age: Duration,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("secret", &"<redacted>")
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl SessionIssuer {
    /// Create an issuer
    ///
    /// # Errors
    /// Returns `AppError::Config` for a secret shorter than
    /// [`MIN_SECRET_BYTES`] or a non-positive max age
    pub fn new(secret: &str, max_age_seconds: i64) -> Result<Self, AppError> {
        if secret.as_bytes().len() < MIN_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "session secret must be at least {} bytes",
                MIN_SECRET_BYTES
            )));
        }
        if max_age_seconds <= 0 {
            return Err(AppError::Config(
                "session max age must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            secret: secret.as_bytes().to_vec(),
            max_age: Duration::seconds(max_age_seconds),
        })
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Issue a token for an authenticated identity, stamped now
    pub fn issue(&self, identifier: &str, email: &str) -> Result<SessionToken, AppError> {
        self.issue_at(identifier, email, Utc::now())
    }

    /// Issue a token as of `now`
    pub fn issue_at(
        &self,
        identifier: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, AppError> {
        let expires_at = now + self.max_age;
        let claims = SessionClaims {
            sub: identifier.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let payload = serde_json::to_string(&claims).map_err(|e| AppError::Internal(e.into()))?;
        let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());
        let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(self.sign(&payload_b64)?);

        SESSIONS_ISSUED_TOTAL.inc();

        Ok(SessionToken {
            token: format!("{}.{}", payload_b64, signature_b64),
            expires_at,
        })
    }

    /// Validate a token against the current time
    pub fn validate(&self, token: &str) -> Result<Session, InvalidSession> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as of `now`
    ///
    /// Every failure collapses into [`InvalidSession`]; the cause is only
    /// logged at debug level.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Session, InvalidSession> {
        self.decode(token, now).map_err(|reason| {
            tracing::debug!(reason, "Rejected session token");
            InvalidSession
        })
    }

    fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<Session, &'static str> {
        // 1. Split token into payload and signature
        let (payload_b64, signature_b64) = token.split_once('.').ok_or("malformed")?;
        if signature_b64.contains('.') {
            return Err("malformed");
        }

        // 2. Verify HMAC signature before looking at the payload
        let signature = general_purpose::URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| "malformed signature")?;
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| "bad key")?;
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature).map_err(|_| "bad signature")?;

        // 3. Decode and deserialize payload
        let payload_bytes = general_purpose::URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| "malformed payload")?;
        let claims: SessionClaims =
            serde_json::from_slice(&payload_bytes).map_err(|_| "malformed payload")?;

        // 4. Check expiry
        if now.timestamp() >= claims.exp {
            return Err("expired");
        }

        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or("malformed payload")?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or("malformed payload")?;

        Ok(Session {
            identifier: claims.sub,
            email: claims.email,
            issued_at,
            expires_at,
        })
    }

    fn sign(&self, payload_b64: &str) -> Result<Vec<u8>, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Encryption(e.to_string()))?;
        mac.update(payload_b64.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
