//! Credential verification
//!
//! Turns an email/password pair into an [`AuthOutcome`]. The specific
//! rejection reason is kept for logs and metrics; callers at the HTTP
//! boundary collapse every rejection into one generic failure.

use std::sync::Arc;

use lazy_static::lazy_static;
use serde::Deserialize;

use super::credentials::{CredentialStore, normalize_email};
use super::password;
use crate::metrics::LOGIN_ATTEMPTS_TOTAL;

lazy_static! {
    /// Hash checked against when the identity is unknown, so that path
    /// costs the same single Argon2 verification as a bad password.
    static ref DUMMY_HASH: Option<String> = password::hash("reelgate-dummy-password").ok();
}

/// Submitted login credentials
///
/// Missing form fields deserialize as empty strings and are rejected
/// by the authenticator before the store is consulted.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Identity confirmed by a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    /// Stable identifier copied from the credential record
    pub identifier: String,
    pub email: String,
}

/// Why a login attempt was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingCredentials,
    UnknownIdentity,
    BadPassword,
    InternalError,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingCredentials => "missing_credentials",
            RejectReason::UnknownIdentity => "unknown_identity",
            RejectReason::BadPassword => "bad_password",
            RejectReason::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(AuthenticatedIdentity),
    Rejected(RejectReason),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }
}

/// Verifies credentials against a [`CredentialStore`]
///
/// Holds no mutable state; one instance serves all concurrent logins.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Verify a login attempt
    ///
    /// # Steps
    /// 1. Reject empty email or password without touching the store
    /// 2. Look up the normalized email
    /// 3. Reject unknown identities and records without a password hash
    /// 4. Verify the password against the salted hash
    ///
    /// Store failures are reported as `InternalError`.
    pub async fn authenticate(&self, credentials: &Credentials) -> AuthOutcome {
        let outcome = self.check(credentials).await;

        let label = match &outcome {
            AuthOutcome::Authenticated(identity) => {
                tracing::info!(identifier = %identity.identifier, "Login succeeded");
                "authenticated"
            }
            AuthOutcome::Rejected(reason) => {
                tracing::info!(%reason, "Login rejected");
                reason.as_str()
            }
        };
        LOGIN_ATTEMPTS_TOTAL.with_label_values(&[label]).inc();

        outcome
    }

    async fn check(&self, credentials: &Credentials) -> AuthOutcome {
        let email = normalize_email(&credentials.email);
        if email.is_empty() || credentials.password.is_empty() {
            return AuthOutcome::Rejected(RejectReason::MissingCredentials);
        }

        let record = match self.store.find_by_email(&email).await {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(%error, "Credential store lookup failed");
                return AuthOutcome::Rejected(RejectReason::InternalError);
            }
        };

        let Some((record, stored_hash)) =
            record.and_then(|r| {
                r.password_hash
                    .clone()
                    .filter(|hash| !hash.is_empty())
                    .map(|hash| (r, hash))
            })
        else {
            let _ = verify_off_thread(credentials.password.clone(), DUMMY_HASH.clone()).await;
            return AuthOutcome::Rejected(RejectReason::UnknownIdentity);
        };

        match verify_off_thread(credentials.password.clone(), Some(stored_hash)).await {
            Ok(true) => AuthOutcome::Authenticated(AuthenticatedIdentity {
                identifier: record.id,
                email: record.email,
            }),
            Ok(false) => AuthOutcome::Rejected(RejectReason::BadPassword),
            Err(error) => {
                tracing::warn!(%error, "Password verification task failed");
                AuthOutcome::Rejected(RejectReason::InternalError)
            }
        }
    }
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn verify_off_thread(
    password: String,
    stored_hash: Option<String>,
) -> Result<bool, tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || {
        stored_hash
            .as_deref()
            .map(|hash| password::verify(&password, hash))
            .unwrap_or(false)
    })
    .await
}
